//! Slippy map raster tiles under the marker overlay.

use crate::coords::{lat_lng_to_world, Viewport, MAX_ZOOM, TILE_SIZE};

/// Used unless `TILE_URL` is set at build time.
pub const DEFAULT_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Upper bound on tiles drawn for one view.
const MAX_TILES: usize = 512;

pub fn tile_url_template() -> &'static str {
    option_env!("TILE_URL").unwrap_or(DEFAULT_TILE_URL)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileId {
    pub z: u32,
    pub x: u32,
    pub y: u32,
}

/// A tile and where its top-left corner lands in the container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedTile {
    pub id: TileId,
    pub left: f64,
    pub top: f64,
    pub size: f64,
}

/// Fill a `{z}/{x}/{y}` template. `{s}` picks a subdomain by tile position.
pub fn tile_url(template: &str, id: TileId) -> String {
    let subdomain = ["a", "b", "c"][((id.x + id.y) % 3) as usize];
    template
        .replace("{s}", subdomain)
        .replace("{z}", &id.z.to_string())
        .replace("{x}", &id.x.to_string())
        .replace("{y}", &id.y.to_string())
}

/// Tiles covering the container at the view's whole zoom level.
///
/// Columns wrap around the antimeridian. Rows outside the world are skipped.
pub fn visible_tiles(viewport: &Viewport) -> Vec<PlacedTile> {
    if !(viewport.width > 0.0 && viewport.height > 0.0) {
        return Vec::new();
    }
    let z = viewport.zoom.floor().clamp(0.0, MAX_ZOOM);
    let n = 2f64.powf(z) as i64;
    let size = TILE_SIZE * 2f64.powf(viewport.zoom - z);

    let (cx, cy) = lat_lng_to_world(viewport.center.0, viewport.center.1, viewport.zoom);
    let left = cx - viewport.width / 2.0;
    let top = cy - viewport.height / 2.0;

    let first_col = (left / size).floor() as i64;
    let last_col = ((left + viewport.width) / size).ceil() as i64 - 1;
    let first_row = ((top / size).floor() as i64).max(0);
    let last_row = (((top + viewport.height) / size).ceil() as i64 - 1).min(n - 1);

    let mut tiles = Vec::new();
    for row in first_row..=last_row {
        for col in first_col..=last_col {
            if tiles.len() == MAX_TILES {
                return tiles;
            }
            tiles.push(PlacedTile {
                id: TileId {
                    z: z as u32,
                    x: col.rem_euclid(n) as u32,
                    y: row as u32,
                },
                left: col as f64 * size - left,
                top: row as f64 * size - top,
                size,
            });
        }
    }
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn covers(tiles: &[PlacedTile], x: f64, y: f64) -> bool {
        tiles
            .iter()
            .any(|t| (t.left..t.left + t.size).contains(&x) && (t.top..t.top + t.size).contains(&y))
    }

    #[test]
    fn test_tiles_cover_the_container() {
        let vp = Viewport::centered(51.515366, -0.1109577, 10.0, 800.0, 600.0);
        let tiles = visible_tiles(&vp);
        for &(x, y) in &[(0.0, 0.0), (799.9, 0.0), (0.0, 599.9), (799.9, 599.9), (400.0, 300.0)] {
            assert!(covers(&tiles, x, y), "({x}, {y}) not covered");
        }
        // 800 px needs 4 or 5 columns, 600 px 3 or 4 rows
        assert!((12..=20).contains(&tiles.len()));
        assert!(tiles.iter().all(|t| t.id.z == 10 && t.size == 256.0));
    }

    #[test]
    fn test_center_tile_matches_slippy_index() {
        let vp = Viewport::centered(51.515366, -0.1109577, 10.0, 800.0, 600.0);
        let tiles = visible_tiles(&vp);
        let center = tiles
            .iter()
            .find(|t| (t.left..t.left + t.size).contains(&400.0) && (t.top..t.top + t.size).contains(&300.0))
            .unwrap();
        assert_eq!(center.id, TileId { z: 10, x: 511, y: 340 });
    }

    #[test]
    fn test_columns_wrap_at_antimeridian() {
        let vp = Viewport::centered(0.0, 179.9, 3.0, 800.0, 600.0);
        let tiles = visible_tiles(&vp);
        assert!(tiles.iter().any(|t| t.id.x == 7));
        assert!(tiles.iter().any(|t| t.id.x == 0));
        assert!(tiles.iter().all(|t| t.id.x < 8));
        assert!(covers(&tiles, 799.9, 300.0));
    }

    #[test]
    fn test_rows_stay_inside_the_world() {
        let vp = Viewport::centered(0.0, 0.0, 0.0, 800.0, 600.0);
        let tiles = visible_tiles(&vp);
        assert!(tiles.iter().all(|t| t.id == TileId { z: 0, x: 0, y: 0 }));
        assert_eq!(tiles.len(), 5);
        assert!(covers(&tiles, 0.0, 300.0));
        assert!(!covers(&tiles, 400.0, 10.0));
    }

    #[test]
    fn test_fractional_zoom_scales_tiles() {
        let vp = Viewport::centered(0.0, 0.0, 4.5, 400.0, 400.0);
        let tiles = visible_tiles(&vp);
        assert!(tiles.iter().all(|t| t.id.z == 4));
        assert!((tiles[0].size - 256.0 * 2f64.sqrt()).abs() < 1e-9);
        assert!(covers(&tiles, 0.0, 0.0) && covers(&tiles, 399.9, 399.9));
    }

    #[test]
    fn test_empty_container_has_no_tiles() {
        let vp = Viewport::centered(0.0, 0.0, 4.0, 0.0, 600.0);
        assert!(visible_tiles(&vp).is_empty());
    }

    #[test]
    fn test_tile_url_template() {
        let id = TileId { z: 10, x: 511, y: 340 };
        assert_eq!(
            tile_url(DEFAULT_TILE_URL, id),
            "https://tile.openstreetmap.org/10/511/340.png"
        );
        assert_eq!(
            tile_url("https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}.png", id),
            "https://c.basemaps.cartocdn.com/dark_all/10/511/340.png"
        );
    }
}
