use std::path::{Path, PathBuf};

use geo_recommender_shared::models::Person;
use tracing::{info, warn};

use crate::error::DataError;

/// The three generated files backing an index of `size` people.
#[derive(Debug, Clone)]
pub struct DataFiles {
    pub size: usize,
    pub ages: PathBuf,
    pub names: PathBuf,
    pub coords: PathBuf,
}

impl DataFiles {
    pub fn for_size(dir: &Path, size: usize) -> Self {
        DataFiles {
            size,
            ages: dir.join(format!("ages_{size}.txt")),
            names: dir.join(format!("names_{size}.txt")),
            coords: dir.join(format!("coords_{size}.txt")),
        }
    }

    /// Fail with an actionable message when any file is absent.
    pub fn check(&self) -> Result<(), DataError> {
        let missing: Vec<String> = [&self.ages, &self.names, &self.coords]
            .into_iter()
            .filter(|p| !p.is_file())
            .map(|p| p.display().to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(DataError::Missing {
                size: self.size,
                missing: missing.join(", "),
            })
        }
    }
}

fn read_lines(path: &Path) -> Result<Vec<(usize, String)>, DataError> {
    let content = std::fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(content
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim().to_string()))
        .filter(|(_, l)| !l.is_empty())
        .collect())
}

fn parse_error(path: &Path, line: usize, message: impl Into<String>) -> DataError {
    DataError::Parse {
        path: path.to_path_buf(),
        line,
        message: message.into(),
    }
}

pub fn load_ages(path: &Path) -> Result<Vec<u32>, DataError> {
    read_lines(path)?
        .into_iter()
        .map(|(line, text)| {
            text.parse::<u32>()
                .map_err(|e| parse_error(path, line, format!("bad age {text:?}: {e}")))
        })
        .collect()
}

pub fn load_names(path: &Path) -> Result<Vec<String>, DataError> {
    Ok(read_lines(path)?.into_iter().map(|(_, name)| name).collect())
}

pub fn load_coords(path: &Path) -> Result<Vec<(f64, f64)>, DataError> {
    read_lines(path)?
        .into_iter()
        .map(|(line, text)| {
            let (lat, lon) = text
                .split_once(',')
                .ok_or_else(|| parse_error(path, line, "expected `lat,lon`"))?;
            let lat = lat
                .trim()
                .parse::<f64>()
                .map_err(|e| parse_error(path, line, format!("bad latitude: {e}")))?;
            let lon = lon
                .trim()
                .parse::<f64>()
                .map_err(|e| parse_error(path, line, format!("bad longitude: {e}")))?;
            Ok((lat, lon))
        })
        .collect()
}

/// Zip the columns into people, truncating to the shortest column.
pub fn assemble(ages: Vec<u32>, names: Vec<String>, coords: Vec<(f64, f64)>) -> Vec<Person> {
    let rows = ages.len().min(names.len()).min(coords.len());
    if rows != ages.len() || rows != names.len() || rows != coords.len() {
        warn!(
            ages = ages.len(),
            names = names.len(),
            coords = coords.len(),
            rows,
            "data files disagree on length, truncating"
        );
    }

    ages.into_iter()
        .zip(names)
        .zip(coords)
        .take(rows)
        .enumerate()
        .map(|(id, ((age, name), (latitude, longitude)))| Person {
            id: id as u64,
            name,
            age,
            latitude,
            longitude,
        })
        .collect()
}

async fn blocking<T, F>(f: F) -> Result<T, DataError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, DataError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DataError::Task(e.to_string()))?
}

/// Read all three files, concurrently when `parallel` is set.
pub async fn load_people(files: &DataFiles, parallel: bool) -> Result<Vec<Person>, DataError> {
    files.check()?;
    info!(size = files.size, parallel, "loading data files");

    let (ages, names, coords) = if parallel {
        let (a, n, c) = (files.ages.clone(), files.names.clone(), files.coords.clone());
        tokio::try_join!(
            blocking(move || load_ages(&a)),
            blocking(move || load_names(&n)),
            blocking(move || load_coords(&c)),
        )?
    } else {
        (
            load_ages(&files.ages)?,
            load_names(&files.names)?,
            load_coords(&files.coords)?,
        )
    };

    let people = assemble(ages, names, coords);
    info!(people = people.len(), "data loaded");
    Ok(people)
}
