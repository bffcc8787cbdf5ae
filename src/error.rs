use thiserror::Error;

use crate::chart::normalize::ShapeError;

#[derive(Error, Debug)]
pub enum CoinDashError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("network failure: {0}")]
    Network(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    InvalidShape(#[from] ShapeError),
}
