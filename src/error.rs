//! Error handling for grid/station join operations.
//!
//! Fatal conditions (missing inputs, contract violations, unreadable files)
//! are variants of [`GridJoinError`]. Observations without a matching grid
//! timestamp are not errors; they are counted in the run statistics.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridJoinError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    Netcdf(#[from] netcdf::Error),

    #[error("Input not found at path: {path}")]
    InputMissing { path: PathBuf },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Invalid format in file: {path} - {reason}")]
    InvalidFormat { path: PathBuf, reason: String },

    #[error("Missing column '{column}' in file: {path}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("Missing variable '{variable}' in file: {path}")]
    MissingVariable { path: PathBuf, variable: String },

    #[error("Could not parse time '{value}': {reason}")]
    TimeParsing { value: String, reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Support for {feature} was not compiled in (enable the '{feature}' feature)")]
    FeatureDisabled { feature: String },

    #[error("Join task failed: {reason}")]
    TaskFailed { reason: String },

    #[error("Processing interrupted: {reason}")]
    Interrupted { reason: String },
}

impl GridJoinError {
    /// Shorthand for an [`GridJoinError::InvalidState`] error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Shorthand for a [`GridJoinError::Configuration`] error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Shorthand for a [`GridJoinError::TimeParsing`] error
    pub fn time_parsing(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TimeParsing {
            value: value.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GridJoinError>;
