//! Core data structures for the grid/station join.
//!
//! Defines the gridded dataset, station observations, per-observation
//! match results, merged output records and run statistics.

use crate::error::{GridJoinError, Result};
use chrono::NaiveDateTime;
use ndarray::Array3;
use serde::Serialize;
use std::path::PathBuf;

/// Extent of a grid along its three dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridShape {
    pub times: usize,
    pub latitudes: usize,
    pub longitudes: usize,
}

impl GridShape {
    /// Number of spatial cells (latitudes × longitudes)
    pub fn spatial_points(&self) -> usize {
        self.latitudes * self.longitudes
    }

    fn as_tuple(&self) -> (usize, usize, usize) {
        (self.times, self.latitudes, self.longitudes)
    }
}

/// A named physical variable indexed `[time, latitude, longitude]`.
///
/// Values are stored in single precision, the native width of reanalysis fields.
#[derive(Debug, Clone)]
pub struct GridVariable {
    pub name: String,
    pub values: Array3<f32>,
}

impl GridVariable {
    pub fn new(name: impl Into<String>, values: Array3<f32>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Gridded reanalysis dataset: static lat/lon axes, hourly time axis,
/// several variables sharing one `(T, LA, LO)` shape.
#[derive(Debug, Clone)]
pub struct GridDataset {
    times: Vec<NaiveDateTime>,
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
    variables: Vec<GridVariable>,
}

impl GridDataset {
    /// Build a dataset, checking that every axis is non-empty and every
    /// variable matches the axis lengths.
    pub fn new(
        times: Vec<NaiveDateTime>,
        latitudes: Vec<f64>,
        longitudes: Vec<f64>,
        variables: Vec<GridVariable>,
    ) -> Result<Self> {
        if times.is_empty() || latitudes.is_empty() || longitudes.is_empty() {
            return Err(GridJoinError::invalid_state(format!(
                "grid axes must be non-empty (time={}, latitude={}, longitude={})",
                times.len(),
                latitudes.len(),
                longitudes.len()
            )));
        }

        let dataset = Self {
            times,
            latitudes,
            longitudes,
            variables,
        };

        let expected = dataset.shape().as_tuple();
        for variable in &dataset.variables {
            if variable.values.dim() != expected {
                return Err(GridJoinError::invalid_state(format!(
                    "variable '{}' has shape {:?}, expected {:?}",
                    variable.name,
                    variable.values.dim(),
                    expected
                )));
            }
        }

        Ok(dataset)
    }

    pub fn shape(&self) -> GridShape {
        GridShape {
            times: self.times.len(),
            latitudes: self.latitudes.len(),
            longitudes: self.longitudes.len(),
        }
    }

    pub fn times(&self) -> &[NaiveDateTime] {
        &self.times
    }

    pub fn latitudes(&self) -> &[f64] {
        &self.latitudes
    }

    pub fn longitudes(&self) -> &[f64] {
        &self.longitudes
    }

    pub fn variables(&self) -> &[GridVariable] {
        &self.variables
    }

    /// Variable names in dataset order
    pub fn variable_names(&self) -> Vec<String> {
        self.variables.iter().map(|v| v.name.clone()).collect()
    }

    /// Every variable's scalar at `[time, row, column]`, in dataset order
    pub fn values_at(&self, time_index: usize, row: usize, column: usize) -> Vec<f32> {
        self.variables
            .iter()
            .map(|v| v.values[[time_index, row, column]])
            .collect()
    }
}

/// One station report at one timestamp
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationObservation {
    pub time: NaiveDateTime,
    pub station: String,
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    /// Weather condition code, absent when the station did not report one
    pub coco: Option<i32>,
}

/// Resolution of one observation against the grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    /// Row-major index of the nearest spatial cell
    pub grid_index: usize,
    pub row: usize,
    pub column: usize,
    /// Distance to the chosen cell in the metric's units
    pub distance: f64,
    /// Position on the grid time axis, `None` when no exact match exists
    pub time_index: Option<usize>,
}

/// A station observation joined with grid values at its matched cell and hour
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecord {
    pub observation: StationObservation,
    /// Grid variable values, aligned with the owning table's variable names
    pub values: Vec<f32>,
}

/// Why an observation produced no record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// The observation's timestamp is not on the grid time axis
    NoTemporalMatch,
}

/// Statistics for one join run
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct JoinStats {
    pub observations: usize,
    pub joined: usize,
    pub skipped_no_time_match: usize,
    /// Joined observations whose nearest cell lay beyond the warning threshold
    pub extrapolated: usize,
    /// Joined observations carrying a fog weather code
    pub fog_observations: usize,
    pub grid_points: usize,
    pub grid_times: usize,
    pub variables: usize,
    pub output_path: PathBuf,
    pub processing_time_ms: u128,
}

impl JoinStats {
    pub fn skipped(&self) -> usize {
        self.skipped_no_time_match
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ndarray::Array3;

    fn hour(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_grid_dataset_shape() {
        let values = Array3::from_shape_fn((2, 3, 4), |(t, r, c)| (t * 100 + r * 10 + c) as f32);
        let grid = GridDataset::new(
            vec![hour(0), hour(1)],
            vec![10.0, 20.0, 30.0],
            vec![100.0, 110.0, 120.0, 130.0],
            vec![GridVariable::new("t2m", values)],
        )
        .unwrap();

        let shape = grid.shape();
        assert_eq!(shape.times, 2);
        assert_eq!(shape.spatial_points(), 12);
        assert_eq!(grid.variable_names(), vec!["t2m".to_string()]);
        assert_eq!(grid.values_at(1, 2, 3), vec![123.0]);
    }

    #[test]
    fn test_grid_dataset_rejects_mismatched_variable() {
        let values = Array3::<f32>::zeros((2, 2, 2));
        let result = GridDataset::new(
            vec![hour(0)],
            vec![10.0, 20.0],
            vec![100.0, 110.0],
            vec![GridVariable::new("t2m", values)],
        );

        match result.unwrap_err() {
            GridJoinError::InvalidState { message } => assert!(message.contains("t2m")),
            other => panic!("Expected InvalidState error, got {:?}", other),
        }
    }

    #[test]
    fn test_grid_dataset_rejects_empty_axis() {
        let result = GridDataset::new(vec![hour(0)], vec![], vec![100.0], vec![]);
        assert!(matches!(result, Err(GridJoinError::InvalidState { .. })));
    }
}
