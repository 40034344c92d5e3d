//! Error types.
//!
//! Only two kinds of failure matter while a benchmark is running. A [`ConnectionError`] means a
//! target could not be reached when a worker opened its handle, and the whole run is abandoned. An
//! [`OperationError`] is a single failed request; it is written to the diagnostic log and the
//! worker moves on to its next request.

use std::io;
use thiserror::Error;

/// Top-level error of a benchmark run.
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("no prepared dataset for worker {0}")]
    MissingDataset(usize),
}

impl From<figment::Error> for BenchError {
    fn from(e: figment::Error) -> Self {
        BenchError::Config(e.to_string())
    }
}

/// A target could not be opened, or failed its liveness check.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("failed to connect to {endpoint}: {reason}")]
pub struct ConnectionError {
    pub endpoint: String,
    pub reason: String,
}

impl ConnectionError {
    pub fn new(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }
}

/// A single request failed.
#[derive(Error, Debug)]
pub enum OperationError {
    #[error(transparent)]
    Redis(#[from] redis::RedisError),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, BenchError>;

pub type OpResult = std::result::Result<(), OperationError>;
