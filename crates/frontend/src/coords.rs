use std::f64::consts::PI;

/// Web Mercator tile size at zoom 0.
pub const TILE_SIZE: f64 = 256.0;
pub const MAX_ZOOM: f64 = 18.0;
/// Latitude limit of the square Mercator world.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_78;
/// Screen padding kept around fitted bounds.
pub const FIT_PADDING_PX: f64 = 40.0;

/// Project a position to world pixels at `zoom`.
pub fn lat_lng_to_world(lat: f64, lng: f64, zoom: f64) -> (f64, f64) {
    let scale = TILE_SIZE * 2f64.powf(zoom);
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    let x = (lng + 180.0) / 360.0 * scale;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * scale;
    (x, y)
}

pub fn world_to_lat_lng(x: f64, y: f64, zoom: f64) -> (f64, f64) {
    let scale = TILE_SIZE * 2f64.powf(zoom);
    let lng = x / scale * 360.0 - 180.0;
    let n = PI * (1.0 - 2.0 * y / scale);
    let lat = n.sinh().atan().to_degrees();
    (lat, lng)
}

/// What part of the world the map container shows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: (f64, f64),
    pub zoom: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn centered(lat: f64, lng: f64, zoom: f64, width: f64, height: f64) -> Self {
        Viewport {
            center: (lat, lng),
            zoom,
            width,
            height,
        }
    }

    /// Smallest whole-zoom view containing every point, with padding.
    ///
    /// A single point (or coincident points) keeps `fallback_zoom`.
    pub fn fit(points: &[(f64, f64)], width: f64, height: f64, fallback_zoom: f64) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y) = lat_lng_to_world(first.0, first.1, 0.0);
        let (mut max_x, mut max_y) = (min_x, min_y);
        for &(lat, lng) in &points[1..] {
            let (x, y) = lat_lng_to_world(lat, lng, 0.0);
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }

        let span_x = max_x - min_x;
        let span_y = max_y - min_y;
        let avail_w = (width - 2.0 * FIT_PADDING_PX).max(1.0);
        let avail_h = (height - 2.0 * FIT_PADDING_PX).max(1.0);

        let zoom = if span_x <= f64::EPSILON && span_y <= f64::EPSILON {
            fallback_zoom
        } else {
            let scale_x = if span_x > 0.0 { avail_w / span_x } else { f64::INFINITY };
            let scale_y = if span_y > 0.0 { avail_h / span_y } else { f64::INFINITY };
            scale_x.min(scale_y).log2().floor().clamp(0.0, MAX_ZOOM)
        };

        let center = world_to_lat_lng((min_x + max_x) / 2.0, (min_y + max_y) / 2.0, 0.0);
        Some(Viewport::centered(center.0, center.1, zoom, width, height))
    }

    /// Same view in a container of a new size.
    pub fn resized(self, width: f64, height: f64) -> Self {
        Viewport {
            width,
            height,
            ..self
        }
    }

    /// Container pixel position of a coordinate.
    pub fn project(&self, lat: f64, lng: f64) -> (f64, f64) {
        let (cx, cy) = lat_lng_to_world(self.center.0, self.center.1, self.zoom);
        let (x, y) = lat_lng_to_world(lat, lng, self.zoom);
        (x - cx + self.width / 2.0, y - cy + self.height / 2.0)
    }

    pub fn unproject(&self, x: f64, y: f64) -> (f64, f64) {
        let (cx, cy) = lat_lng_to_world(self.center.0, self.center.1, self.zoom);
        let (lat, lng) = world_to_lat_lng(x - self.width / 2.0 + cx, y - self.height / 2.0 + cy, self.zoom);
        (lat.clamp(-90.0, 90.0), lng.clamp(-180.0, 180.0))
    }

    /// Shift the view by a pixel delta, as when dragging the map.
    pub fn panned(self, dx: f64, dy: f64) -> Self {
        let (lat, lng) = self.unproject(self.width / 2.0 - dx, self.height / 2.0 - dy);
        Viewport {
            center: (lat, lng),
            ..self
        }
    }

    pub fn zoomed(self, delta: f64) -> Self {
        Viewport {
            zoom: (self.zoom + delta).clamp(0.0, MAX_ZOOM),
            ..self
        }
    }
}
