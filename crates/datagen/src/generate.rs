use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

use geo_recommender_shared::geo::geo_offsets;
use rand::distributions::{Distribution, WeightedError, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::error::DatagenError;
use crate::source::{
    AgeBucket, Cell, SourceDir, AGE_DISTRIBUTION_FILE, MAP_CELLS_FILE, WEIGHTED_CELLS_FILE,
};

/// Upper bound (exclusive) of the uniform offset added to each sampled age.
const AGE_JITTER: u32 = 5;

/// Points scattered around weighted cells. Each point is the cell center
/// moved by a uniform factor in [-1, 1] of the cell offset on each axis.
pub fn sample_coords<R: Rng>(
    cells: &[Cell],
    count: usize,
    rng: &mut R,
) -> Result<Vec<(f64, f64)>, WeightedError> {
    let index = WeightedIndex::new(cells.iter().map(|c| c.weight))?;
    Ok((0..count)
        .map(|_| {
            let cell = &cells[index.sample(rng)];
            let lat = cell.latitude + cell.lat_offset * rng.gen_range(-1.0..=1.0);
            let lon = cell.longitude + cell.lon_offset * rng.gen_range(-1.0..=1.0);
            (lat, lon)
        })
        .collect())
}

/// Random first names concatenated with random last names.
pub fn sample_names<R: Rng>(
    first: &[String],
    last: &[String],
    count: usize,
    rng: &mut R,
) -> Result<Vec<String>, DatagenError> {
    if first.is_empty() || last.is_empty() {
        return Err(DatagenError::NoNames);
    }
    Ok((0..count)
        .map(|_| {
            let first = &first[rng.gen_range(0..first.len())];
            let last = &last[rng.gen_range(0..last.len())];
            format!("{first}{last}")
        })
        .collect())
}

/// Ages drawn from the distribution, jittered, then shuffled.
pub fn sample_ages<R: Rng>(
    buckets: &[AgeBucket],
    count: usize,
    rng: &mut R,
) -> Result<Vec<u32>, WeightedError> {
    let index = WeightedIndex::new(buckets.iter().map(|b| b.weight))?;
    let mut ages: Vec<u32> = (0..count)
        .map(|_| buckets[index.sample(rng)].age + rng.gen_range(0..AGE_JITTER))
        .collect();
    ages.shuffle(rng);
    Ok(ages)
}

fn weights_err(path: PathBuf) -> impl FnOnce(WeightedError) -> DatagenError {
    move |source| DatagenError::Weights { path, source }
}

fn write_lines<I, T>(path: &Path, lines: I) -> Result<(), DatagenError>
where
    I: IntoIterator<Item = T>,
    T: std::fmt::Display,
{
    let write_err = |source| DatagenError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut out = BufWriter::new(File::create(path).map_err(write_err)?);
    for line in lines {
        writeln!(out, "{line}").map_err(write_err)?;
    }
    out.flush().map_err(write_err)
}

fn seeded(seed: Option<u64>, stream: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(stream)),
        None => StdRng::from_entropy(),
    }
}

/// Output paths for one dataset size.
#[derive(Debug, Clone)]
pub struct Outputs {
    pub names: PathBuf,
    pub ages: PathBuf,
    pub coords: PathBuf,
}

impl Outputs {
    pub fn for_size(dir: &Path, size: usize) -> Self {
        Self {
            names: dir.join(format!("names_{size}.txt")),
            ages: dir.join(format!("ages_{size}.txt")),
            coords: dir.join(format!("coords_{size}.txt")),
        }
    }
}

fn generate_names(source: &SourceDir, out: &Path, size: usize, seed: Option<u64>) -> Result<(), DatagenError> {
    let started = Instant::now();
    let first = source.first_names()?;
    let last = source.last_names()?;
    let names = sample_names(&first, &last, size, &mut seeded(seed, 0))?;
    write_lines(out, names)?;
    info!(path = %out.display(), elapsed_ms = started.elapsed().as_millis(), "generated names");
    Ok(())
}

fn generate_ages(source: &SourceDir, out: &Path, size: usize, seed: Option<u64>) -> Result<(), DatagenError> {
    let started = Instant::now();
    let buckets = source.age_distribution()?;
    let ages = sample_ages(&buckets, size, &mut seeded(seed, 1))
        .map_err(weights_err(source.path(AGE_DISTRIBUTION_FILE)))?;
    write_lines(out, ages)?;
    info!(path = %out.display(), elapsed_ms = started.elapsed().as_millis(), "generated ages");
    Ok(())
}

fn generate_coords(source: &SourceDir, out: &Path, size: usize, seed: Option<u64>) -> Result<(), DatagenError> {
    let started = Instant::now();
    let cells = source.weighted_cells()?;
    let coords = sample_coords(&cells, size, &mut seeded(seed, 2))
        .map_err(weights_err(source.path(WEIGHTED_CELLS_FILE)))?;
    write_lines(out, coords.into_iter().map(|(lat, lon)| format!("{lat:.6},{lon:.6}")))?;
    info!(path = %out.display(), elapsed_ms = started.elapsed().as_millis(), "generated coordinates");
    Ok(())
}

/// Write `names_N.txt`, `ages_N.txt` and `coords_N.txt`, one generator per thread.
pub fn generate(
    source: &SourceDir,
    out_dir: &Path,
    size: usize,
    seed: Option<u64>,
) -> Result<Outputs, DatagenError> {
    fs::create_dir_all(out_dir).map_err(|source| DatagenError::Write {
        path: out_dir.to_path_buf(),
        source,
    })?;
    let outputs = Outputs::for_size(out_dir, size);

    thread::scope(|s| {
        let names = s.spawn(|| generate_names(source, &outputs.names, size, seed));
        let ages = s.spawn(|| generate_ages(source, &outputs.ages, size, seed));
        let coords = s.spawn(|| generate_coords(source, &outputs.coords, size, seed));
        for handle in [names, ages, coords] {
            handle.join().map_err(|_| DatagenError::Panicked)??;
        }
        Ok::<_, DatagenError>(())
    })?;

    Ok(outputs)
}

/// Derive `coordinates_with_offsets.txt` from `filtered_map_data.txt`.
pub fn derive_offsets(source: &SourceDir) -> Result<PathBuf, DatagenError> {
    let cells = source.map_cells()?;
    let out = source.path(WEIGHTED_CELLS_FILE);
    write_lines(
        &out,
        cells.iter().map(|c| {
            let (dlat, dlon) = geo_offsets(c.latitude, c.longitude);
            format!(
                "{:.6},{:.6},{dlat:.6},{dlon:.6},{:.6}",
                c.latitude, c.longitude, c.weight
            )
        }),
    )?;
    info!(from = MAP_CELLS_FILE, rows = cells.len(), path = %out.display(), "derived offsets");
    Ok(out)
}
