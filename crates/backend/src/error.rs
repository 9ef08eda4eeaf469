use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("the index has not been built yet")]
    IndexNotBuilt,

    #[error("node {0} is referenced but missing from storage")]
    MissingNode(u64),

    #[error("a person with id {0} is already indexed")]
    DuplicateId(u64),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("failed to encode node: {0}")]
    Codec(#[from] serde_json::Error),
}

impl StoreError {
    pub fn storage(e: impl std::fmt::Display) -> Self {
        StoreError::Storage(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum DataError {
    #[error(
        "data files are missing for size {size} ({missing}); generate them with `geo-datagen generate --size {size}`"
    )]
    Missing { size: usize, missing: String },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{}:{line}: {message}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("loader task failed: {0}")]
    Task(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Error: you need latitude, longitude, and age parameters")]
    MissingQueryParams,

    #[error("Error: you need the number of loops,the number of neighbors,and the age proximity value.")]
    MissingProfileParams,

    #[error("Internal error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Task(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::MissingQueryParams | AppError::MissingProfileParams => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::IndexNotBuilt) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Store(_) | AppError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        (status, self.to_string()).into_response()
    }
}
