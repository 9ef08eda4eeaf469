use std::io;
use std::path::PathBuf;

use rand::distributions::WeightedError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatagenError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}:{line}: {message}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("{} has no usable rows", .path.display())]
    Empty { path: PathBuf },

    #[error("bad weights in {}: {source}", .path.display())]
    Weights {
        path: PathBuf,
        #[source]
        source: WeightedError,
    },

    #[error("cannot build names from an empty name list")]
    NoNames,

    #[error("generator thread panicked")]
    Panicked,
}
