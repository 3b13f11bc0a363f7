use thiserror::Error;

/// Errors raised for programmer-error inputs. Everything else (out-of-range
/// queries, unreachable targets, blocked moves) is reported through data.
#[derive(Debug, Error)]
pub enum NavError {
    #[error("cell size must be a positive, finite number (got {0})")]
    InvalidCellSize(f64),

    #[error("world size must be positive and finite (got {width}x{height})")]
    InvalidWorldSize { width: f64, height: f64 },

    #[error("target point ({x}, {y}) is not finite")]
    InvalidTarget { x: f64, y: f64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse configuration")]
    ConfigParse(#[from] serde_json::Error),
}

pub type NavResult<T> = Result<T, NavError>;
