//! Configuration management and validation.
//!
//! Provides the join configuration: grid coordinate naming, variable
//! selection, distance metric, extrapolation warnings, parallelism and
//! output encoding.

use crate::constants::{
    DEFAULT_CHUNK_SIZE, DEFAULT_LATITUDE_NAMES, DEFAULT_LONGITUDE_NAMES, DEFAULT_TIME_NAMES,
};
use crate::error::{GridJoinError, Result};
use crate::spatial::DistanceMetric;
use polars::prelude::ParquetCompression;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Names under which the grid file may store its coordinate variables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinateNames {
    /// Candidate names for the time coordinate, tried in order
    pub time: Vec<String>,
    pub latitude: Vec<String>,
    pub longitude: Vec<String>,
}

impl Default for CoordinateNames {
    fn default() -> Self {
        let owned = |names: &[&str]| names.iter().map(|s| s.to_string()).collect();
        Self {
            time: owned(DEFAULT_TIME_NAMES),
            latitude: owned(DEFAULT_LATITUDE_NAMES),
            longitude: owned(DEFAULT_LONGITUDE_NAMES),
        }
    }
}

/// Output table encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    #[default]
    Csv,
    Parquet,
}

impl OutputFormat {
    /// Infer the format from a file extension, defaulting to CSV
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("parquet") | Some("pq") => OutputFormat::Parquet,
            _ => OutputFormat::Csv,
        }
    }
}

/// Supported compression algorithms for parquet output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum CompressionAlgorithm {
    /// Snappy compression - good balance of speed and compression
    #[default]
    Snappy,
    /// ZSTD compression - better compression ratio, slower
    Zstd,
    /// LZ4 compression - fastest, lower compression ratio
    Lz4,
    /// No compression
    Uncompressed,
}

impl CompressionAlgorithm {
    /// Convert to polars ParquetCompression type
    pub fn to_polars_compression(&self) -> ParquetCompression {
        match self {
            CompressionAlgorithm::Snappy => ParquetCompression::Snappy,
            CompressionAlgorithm::Zstd => ParquetCompression::Zstd(None),
            CompressionAlgorithm::Lz4 => ParquetCompression::Lz4Raw,
            CompressionAlgorithm::Uncompressed => ParquetCompression::Uncompressed,
        }
    }
}

/// Output settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Explicit format; inferred from the output path when `None`
    pub format: Option<OutputFormat>,
    pub compression: CompressionAlgorithm,
}

impl OutputConfig {
    pub fn resolve_format(&self, path: &Path) -> OutputFormat {
        self.format.unwrap_or_else(|| OutputFormat::from_path(path))
    }
}

/// Global configuration for a join run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinConfig {
    pub coordinates: CoordinateNames,

    /// Grid variables to extract; every `(time, latitude, longitude)` variable when `None`
    pub variables: Option<Vec<String>>,

    pub distance_metric: DistanceMetric,

    /// Warn about matches farther than this from their grid point, in metric units
    pub extrapolation_warning: Option<f64>,

    /// Number of worker threads for the join (1 = serial)
    pub workers: usize,

    /// Observations per parallel work unit
    pub chunk_size: usize,

    pub output: OutputConfig,

    /// Show progress bars and console reports
    pub show_progress: bool,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            coordinates: CoordinateNames::default(),
            variables: None,
            distance_metric: DistanceMetric::Planar,
            extrapolation_warning: None,
            workers: num_cpus::get(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            output: OutputConfig::default(),
            show_progress: true,
        }
    }
}

impl JoinConfig {
    /// Create configuration with custom worker count
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set observations per parallel work unit
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Select the distance metric for nearest-cell matching
    pub fn with_distance_metric(mut self, metric: DistanceMetric) -> Self {
        self.distance_metric = metric;
        self
    }

    /// Warn about observations matched beyond `threshold`
    pub fn with_extrapolation_warning(mut self, threshold: f64) -> Self {
        self.extrapolation_warning = Some(threshold);
        self
    }

    /// Restrict extraction to the named grid variables
    pub fn with_variables(mut self, variables: Vec<String>) -> Self {
        self.variables = Some(variables);
        self
    }

    /// Configure output settings
    pub fn with_output(mut self, output: OutputConfig) -> Self {
        self.output = output;
        self
    }

    /// Disable progress bars and console reports
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Reject settings the join cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(GridJoinError::configuration("workers must be at least 1"));
        }
        if self.chunk_size == 0 {
            return Err(GridJoinError::configuration(
                "chunk_size must be at least 1",
            ));
        }
        if let Some(threshold) = self.extrapolation_warning {
            if !threshold.is_finite() || threshold <= 0.0 {
                return Err(GridJoinError::configuration(format!(
                    "extrapolation warning threshold must be a positive number, got {}",
                    threshold
                )));
            }
        }
        if let Some(variables) = &self.variables {
            if variables.is_empty() {
                return Err(GridJoinError::configuration(
                    "variable selection must name at least one variable",
                ));
            }
        }
        for (axis, names) in [
            ("time", &self.coordinates.time),
            ("latitude", &self.coordinates.latitude),
            ("longitude", &self.coordinates.longitude),
        ] {
            if names.is_empty() {
                return Err(GridJoinError::configuration(format!(
                    "no candidate names configured for the {} coordinate",
                    axis
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_config_is_valid() {
        let config = JoinConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.distance_metric, DistanceMetric::Planar);
        assert_eq!(config.coordinates.time, vec!["valid_time", "time"]);
    }

    #[test]
    fn test_rejects_zero_workers() {
        let config = JoinConfig::default().with_workers(0);
        assert!(matches!(
            config.validate(),
            Err(GridJoinError::Configuration { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_threshold() {
        for threshold in [0.0, -1.0, f64::NAN] {
            let config = JoinConfig::default().with_extrapolation_warning(threshold);
            assert!(config.validate().is_err(), "threshold {} accepted", threshold);
        }
    }

    #[test]
    fn test_rejects_empty_variable_selection() {
        let config = JoinConfig::default().with_variables(vec![]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_output_format_from_path() {
        assert_eq!(
            OutputFormat::from_path(&PathBuf::from("out/combined.parquet")),
            OutputFormat::Parquet
        );
        assert_eq!(
            OutputFormat::from_path(&PathBuf::from("out/combined.CSV")),
            OutputFormat::Csv
        );
        assert_eq!(
            OutputFormat::from_path(&PathBuf::from("combined")),
            OutputFormat::Csv
        );
    }

    #[test]
    fn test_explicit_format_wins() {
        let output = OutputConfig {
            format: Some(OutputFormat::Parquet),
            ..Default::default()
        };
        assert_eq!(
            output.resolve_format(&PathBuf::from("combined.csv")),
            OutputFormat::Parquet
        );
    }
}
