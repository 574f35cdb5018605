//! gridjoin library
//!
//! Joins gridded reanalysis fields onto weather station observations.
//!
//! Each observation is matched to its nearest grid cell through a kd-tree
//! over the flattened latitude/longitude grid, and to the grid hour with
//! exactly the same timestamp. Matched observations carry every grid
//! variable's value at that cell and hour; observations whose timestamp is
//! absent from the grid are counted and dropped.
//!
//! This library provides tools for:
//! - Loading grids from NetCDF (behind the `netcdf` feature) or building them in memory
//! - Reading station tables from CSV
//! - Nearest-cell lookup in planar degrees or great-circle kilometres
//! - Serial and parallel joins with identical, input-ordered output
//! - Writing the merged table to CSV or Parquet

pub mod cf_time;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod flatten;
pub mod grid_reader;
pub mod join;
pub mod models;
pub mod spatial;
pub mod stations;
pub mod temporal;

// Re-export commonly used types
pub use config::{CompressionAlgorithm, JoinConfig, OutputConfig, OutputFormat};
pub use error::{GridJoinError, Result};
pub use flatten::FlatGrid;
pub use join::assembler::MergedTable;
pub use join::engine::{JoinEngine, JoinOutcome};
pub use join::writer::TableWriter;
pub use join::{Joiner, join_observations};
pub use models::{GridDataset, GridVariable, JoinStats, MergedRecord, StationObservation};
pub use spatial::{DistanceMetric, SpatialIndex};
pub use temporal::TemporalResolver;
