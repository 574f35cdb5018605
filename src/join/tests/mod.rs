//! Pipeline tests for the join module
//!
//! Exercise the full join path on small synthetic grids and station tables.


use crate::models::{GridDataset, GridVariable, StationObservation};
use chrono::{NaiveDate, NaiveDateTime};
use ndarray::Array3;

/// `2024-01-01` at the given hour
pub fn hour(h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

pub fn observation(station: &str, lat: f64, lon: f64, time: NaiveDateTime) -> StationObservation {
    StationObservation {
        time,
        station: station.to_string(),
        latitude: lat,
        longitude: lon,
        name: format!("Station {}", station),
        coco: Some(5),
    }
}

/// 2×2 grid over lat [10, 20], lon [100, 110] with `t2m` at hours 0 and 1.
///
/// `t2m[t, r, c] = 270 + 10 * t + 2 * r + c`
pub fn two_by_two_grid() -> GridDataset {
    let t2m = Array3::from_shape_fn((2, 2, 2), |(t, r, c)| {
        270.0 + 10.0 * t as f32 + 2.0 * r as f32 + c as f32
    });
    GridDataset::new(
        vec![hour(0), hour(1)],
        vec![10.0, 20.0],
        vec![100.0, 110.0],
        vec![GridVariable::new("t2m", t2m)],
    )
    .unwrap()
}
