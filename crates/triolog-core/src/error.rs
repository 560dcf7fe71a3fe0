//! Error types for TrioLog

use thiserror::Error;

use crate::models::PositionError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Position source unavailable: {0}")]
    UnsupportedSource(String),

    #[error("Invalid session state: {0}")]
    InvalidState(String),

    #[error("Position error: {0}")]
    Position(#[from] PositionError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;
