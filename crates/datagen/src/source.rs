//! Readers for the hand-curated source datasets.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::DatagenError;

pub const WEIGHTED_CELLS_FILE: &str = "coordinates_with_offsets.txt";
pub const MAP_CELLS_FILE: &str = "filtered_map_data.txt";
pub const FIRST_NAMES_FILE: &str = "first_names_with_commas.txt";
pub const LAST_NAMES_FILE: &str = "last_names.txt";
pub const AGE_DISTRIBUTION_FILE: &str = "world_age_distribution.txt";

/// A populated map cell with the jitter range around its center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub latitude: f64,
    pub longitude: f64,
    pub lat_offset: f64,
    pub lon_offset: f64,
    pub weight: f64,
}

/// A map cell before offsets are derived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapCell {
    pub latitude: f64,
    pub longitude: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgeBucket {
    pub age: u32,
    pub weight: f64,
}

#[derive(Debug, Clone)]
pub struct SourceDir {
    dir: PathBuf,
}

impl SourceDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    pub fn weighted_cells(&self) -> Result<Vec<Cell>, DatagenError> {
        let path = self.path(WEIGHTED_CELLS_FILE);
        let rows = parse_rows(&path, ',', 5)?;
        Ok(rows
            .into_iter()
            .map(|r| Cell {
                latitude: r[0],
                longitude: r[1],
                lat_offset: r[2],
                lon_offset: r[3],
                weight: r[4],
            })
            .collect())
    }

    pub fn map_cells(&self) -> Result<Vec<MapCell>, DatagenError> {
        let path = self.path(MAP_CELLS_FILE);
        let rows = parse_rows(&path, ',', 3)?;
        Ok(rows
            .into_iter()
            .map(|r| MapCell {
                latitude: r[0],
                longitude: r[1],
                weight: r[2],
            })
            .collect())
    }

    pub fn first_names(&self) -> Result<Vec<String>, DatagenError> {
        read_tokens(&self.path(FIRST_NAMES_FILE))
    }

    pub fn last_names(&self) -> Result<Vec<String>, DatagenError> {
        read_tokens(&self.path(LAST_NAMES_FILE))
    }

    pub fn age_distribution(&self) -> Result<Vec<AgeBucket>, DatagenError> {
        let path = self.path(AGE_DISTRIBUTION_FILE);
        let content = read(&path)?;
        let mut buckets = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            let mut fields = line.split_whitespace();
            let Some(age) = fields.next() else {
                continue;
            };
            let parse_err = |message: String| DatagenError::Parse {
                path: path.clone(),
                line: idx + 1,
                message,
            };
            let age: u32 = age
                .parse()
                .map_err(|_| parse_err(format!("invalid age {age:?}")))?;
            let weight = fields
                .next()
                .ok_or_else(|| parse_err("missing weight".to_string()))?;
            let weight: f64 = weight
                .parse()
                .map_err(|_| parse_err(format!("invalid weight {weight:?}")))?;
            buckets.push(AgeBucket { age, weight });
        }
        non_empty(buckets, &path)
    }
}

fn read(path: &Path) -> Result<String, DatagenError> {
    fs::read_to_string(path).map_err(|source| DatagenError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn non_empty<T>(items: Vec<T>, path: &Path) -> Result<Vec<T>, DatagenError> {
    if items.is_empty() {
        return Err(DatagenError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(items)
}

/// Whitespace separated tokens. The first names keep their trailing comma so
/// that concatenating with a last name yields `first,last`.
fn read_tokens(path: &Path) -> Result<Vec<String>, DatagenError> {
    let tokens = read(path)?
        .split_whitespace()
        .map(str::to_string)
        .collect();
    non_empty(tokens, path)
}

/// Delimited rows of at least `columns` floats. Blank lines are skipped.
fn parse_rows(path: &Path, delimiter: char, columns: usize) -> Result<Vec<Vec<f64>>, DatagenError> {
    let content = read(path)?;
    let mut rows = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let row = line
            .split(delimiter)
            .map(|f| f.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DatagenError::Parse {
                path: path.to_path_buf(),
                line: idx + 1,
                message: e.to_string(),
            })?;
        if row.len() < columns {
            return Err(DatagenError::Parse {
                path: path.to_path_buf(),
                line: idx + 1,
                message: format!("expected {columns} columns, found {}", row.len()),
            });
        }
        rows.push(row);
    }
    non_empty(rows, path)
}
