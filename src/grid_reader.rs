//! Gridded reanalysis loading from NetCDF.
//!
//! Locates the time/latitude/longitude coordinates under the configured
//! candidate names, decodes the CF time axis and reads every data variable
//! laid out as `(time, latitude, longitude)`. Packed values are unpacked with
//! `scale_factor`/`add_offset` and fill values become NaN.
//!
//! Needs the `netcdf` cargo feature; without it loading fails with
//! [`GridJoinError::FeatureDisabled`].

use crate::config::JoinConfig;
use crate::error::{GridJoinError, Result};
use crate::models::GridDataset;
use std::path::Path;

/// Load a grid dataset from a NetCDF file
pub fn read_grid_dataset(path: &Path, config: &JoinConfig) -> Result<GridDataset> {
    if !path.exists() {
        return Err(GridJoinError::InputMissing {
            path: path.to_path_buf(),
        });
    }

    load(path, config)
}

#[cfg(feature = "netcdf")]
fn load(path: &Path, config: &JoinConfig) -> Result<GridDataset> {
    nc::read(path, config)
}

#[cfg(not(feature = "netcdf"))]
fn load(_path: &Path, _config: &JoinConfig) -> Result<GridDataset> {
    Err(GridJoinError::FeatureDisabled {
        feature: "netcdf".to_string(),
    })
}

/// Unpack stored values: fill values to NaN, then `value * scale + offset`,
/// narrowed to single precision once unpacked
pub fn unpack_values(
    raw: Vec<f64>,
    fill_values: &[f64],
    scale_factor: Option<f64>,
    add_offset: Option<f64>,
) -> Vec<f32> {
    let scale = scale_factor.unwrap_or(1.0);
    let offset = add_offset.unwrap_or(0.0);
    raw.into_iter()
        .map(|v| {
            if v.is_nan() || fill_values.contains(&v) {
                f32::NAN
            } else {
                (v * scale + offset) as f32
            }
        })
        .collect()
}

#[cfg(feature = "netcdf")]
mod nc {
    use super::unpack_values;
    use crate::cf_time::CfTimeUnits;
    use crate::config::JoinConfig;
    use crate::error::{GridJoinError, Result};
    use crate::models::{GridDataset, GridVariable};
    use ndarray::Array3;
    use netcdf::{AttributeValue, Variable};
    use std::path::Path;
    use tracing::{debug, info, warn};

    pub(super) fn read(path: &Path, config: &JoinConfig) -> Result<GridDataset> {
        let file = netcdf::open(path)?;

        let time_var = find_coordinate(&file, path, &config.coordinates.time)?;
        let lat_var = find_coordinate(&file, path, &config.coordinates.latitude)?;
        let lon_var = find_coordinate(&file, path, &config.coordinates.longitude)?;

        let dims = [
            single_dimension(&time_var, path)?,
            single_dimension(&lat_var, path)?,
            single_dimension(&lon_var, path)?,
        ];

        let units = string_attribute(&time_var, "units").ok_or_else(|| {
            GridJoinError::InvalidFormat {
                path: path.to_path_buf(),
                reason: format!("time coordinate '{}' has no units attribute", time_var.name()),
            }
        })?;
        let time_offsets: Vec<f64> = time_var.get_values::<f64, _>(..)?;
        let times = CfTimeUnits::parse(&units)?.decode_all(&time_offsets)?;
        let latitudes: Vec<f64> = lat_var.get_values::<f64, _>(..)?;
        let longitudes: Vec<f64> = lon_var.get_values::<f64, _>(..)?;

        debug!(
            "Grid axes: {} times ({}), {} latitudes, {} longitudes",
            times.len(),
            units,
            latitudes.len(),
            longitudes.len()
        );

        let coordinate_names = [time_var.name(), lat_var.name(), lon_var.name()];
        let selected: Vec<Variable> = match &config.variables {
            Some(names) => names
                .iter()
                .map(|name| {
                    let variable =
                        file.variable(name)
                            .ok_or_else(|| GridJoinError::MissingVariable {
                                path: path.to_path_buf(),
                                variable: name.clone(),
                            })?;
                    if dimension_names(&variable) != dims {
                        return Err(GridJoinError::InvalidFormat {
                            path: path.to_path_buf(),
                            reason: format!(
                                "variable '{}' has dimensions {:?}, expected {:?}",
                                name,
                                dimension_names(&variable),
                                dims
                            ),
                        });
                    }
                    Ok(variable)
                })
                .collect::<Result<_>>()?,
            None => file
                .variables()
                .filter(|v| !coordinate_names.contains(&v.name()))
                .filter(|v| dimension_names(v) == dims)
                .collect(),
        };

        if selected.is_empty() {
            warn!(
                "No variables laid out as {:?} in {}; output will carry station columns only",
                dims,
                path.display()
            );
        }

        let shape = (times.len(), latitudes.len(), longitudes.len());
        let variables = selected
            .iter()
            .map(|variable| read_variable(variable, shape, path))
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Loaded {} grid variables from {}",
            variables.len(),
            path.display()
        );

        GridDataset::new(times, latitudes, longitudes, variables)
    }

    fn find_coordinate<'f>(
        file: &'f netcdf::File,
        path: &Path,
        candidates: &[String],
    ) -> Result<Variable<'f>> {
        candidates
            .iter()
            .find_map(|name| file.variable(name))
            .ok_or_else(|| GridJoinError::MissingVariable {
                path: path.to_path_buf(),
                variable: candidates.join("|"),
            })
    }

    fn single_dimension(variable: &Variable, path: &Path) -> Result<String> {
        match variable.dimensions() {
            [dim] => Ok(dim.name()),
            other => Err(GridJoinError::InvalidFormat {
                path: path.to_path_buf(),
                reason: format!(
                    "coordinate '{}' must be one-dimensional, found {} dimensions",
                    variable.name(),
                    other.len()
                ),
            }),
        }
    }

    fn dimension_names(variable: &Variable) -> Vec<String> {
        variable.dimensions().iter().map(|d| d.name()).collect()
    }

    fn read_variable(
        variable: &Variable,
        shape: (usize, usize, usize),
        path: &Path,
    ) -> Result<GridVariable> {
        let name = variable.name();
        let raw: Vec<f64> = variable.get_values::<f64, _>(..)?;

        let fill_values: Vec<f64> = ["_FillValue", "missing_value"]
            .iter()
            .filter_map(|attr| numeric_attribute(variable, attr))
            .collect();
        let values = unpack_values(
            raw,
            &fill_values,
            numeric_attribute(variable, "scale_factor"),
            numeric_attribute(variable, "add_offset"),
        );

        let values = Array3::from_shape_vec(shape, values).map_err(|e| {
            GridJoinError::InvalidFormat {
                path: path.to_path_buf(),
                reason: format!("variable '{}' does not fit grid shape {:?}: {}", name, shape, e),
            }
        })?;

        debug!("Read grid variable '{}'", name);
        Ok(GridVariable::new(name, values))
    }

    fn string_attribute(variable: &Variable, name: &str) -> Option<String> {
        match variable.attribute(name)?.value().ok()? {
            AttributeValue::Str(value) => Some(value),
            _ => None,
        }
    }

    fn numeric_attribute(variable: &Variable, name: &str) -> Option<f64> {
        match variable.attribute(name)?.value().ok()? {
            AttributeValue::Double(v) => Some(v),
            AttributeValue::Float(v) => Some(v as f64),
            AttributeValue::Longlong(v) => Some(v as f64),
            AttributeValue::Int(v) => Some(v as f64),
            AttributeValue::Short(v) => Some(v as f64),
            AttributeValue::Schar(v) => Some(v as f64),
            AttributeValue::Uchar(v) => Some(v as f64),
            AttributeValue::Ushort(v) => Some(v as f64),
            AttributeValue::Uint(v) => Some(v as f64),
            _ => None,
        }
    }
}
