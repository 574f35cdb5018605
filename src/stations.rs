//! Station observation table loading.
//!
//! Reads the station CSV (`time, station, latitude, longitude, name, coco`)
//! with every column as text, then parses each row into a
//! [`StationObservation`]. Errors name the 1-based data record, not the
//! file line: a quoted field may span several lines.

use crate::constants::{
    COL_COCO, COL_LATITUDE, COL_LONGITUDE, COL_NAME, COL_STATION, COL_TIME, STATION_COLUMNS,
    STATION_TIME_FORMATS,
};
use crate::error::{GridJoinError, Result};
use crate::models::StationObservation;
use chrono::NaiveDateTime;
use polars::prelude::*;
use std::path::Path;
use tracing::debug;

/// Load all observations from a station CSV file
pub fn read_station_observations(path: &Path) -> Result<Vec<StationObservation>> {
    if !path.exists() {
        return Err(GridJoinError::InputMissing {
            path: path.to_path_buf(),
        });
    }

    // Schema inference off: every column is read as a string and parsed below
    let frame = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    debug!(
        "Read {} station rows with columns {:?} from {}",
        frame.height(),
        frame.get_column_names(),
        path.display()
    );

    observations_from_frame(&frame, path)
}

/// Parse a string-typed station frame into observations
pub fn observations_from_frame(frame: &DataFrame, path: &Path) -> Result<Vec<StationObservation>> {
    let available: Vec<String> = frame
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    for column in STATION_COLUMNS {
        if !available.iter().any(|name| name == column) {
            return Err(GridJoinError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            });
        }
    }

    let times = text_column(frame, COL_TIME)?;
    let stations = text_column(frame, COL_STATION)?;
    let latitudes = text_column(frame, COL_LATITUDE)?;
    let longitudes = text_column(frame, COL_LONGITUDE)?;
    let names = text_column(frame, COL_NAME)?;
    let cocos = text_column(frame, COL_COCO)?;

    let mut observations = Vec::with_capacity(frame.height());
    for row in 0..frame.height() {
        let record = row + 1;
        let invalid = |reason: String| GridJoinError::InvalidFormat {
            path: path.to_path_buf(),
            reason: format!("record {}: {}", record, reason),
        };

        let time = times
            .get(row)
            .ok_or_else(|| invalid("missing time".to_string()))
            .and_then(|value| parse_station_time(value).map_err(|e| invalid(e.to_string())))?;
        let latitude = parse_coordinate(latitudes.get(row), COL_LATITUDE).map_err(invalid)?;
        let longitude = parse_coordinate(longitudes.get(row), COL_LONGITUDE).map_err(invalid)?;
        let coco = parse_coco(cocos.get(row)).map_err(invalid)?;

        observations.push(StationObservation {
            time,
            station: stations.get(row).unwrap_or_default().trim().to_string(),
            latitude,
            longitude,
            name: names.get(row).unwrap_or_default().to_string(),
            coco,
        });
    }

    Ok(observations)
}

fn text_column<'a>(frame: &'a DataFrame, name: &str) -> Result<&'a StringChunked> {
    Ok(frame.column(name)?.as_materialized_series().str()?)
}

/// Parse a station timestamp in any of the accepted layouts
pub fn parse_station_time(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    STATION_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .ok_or_else(|| GridJoinError::time_parsing(value, "unrecognised timestamp layout"))
}

fn parse_coordinate(value: Option<&str>, column: &str) -> std::result::Result<f64, String> {
    let raw = value.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(format!("missing {}", column));
    }
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("invalid {} '{}'", column, raw))
}

/// Weather codes may be blank or written as floats (`5.0`)
fn parse_coco(value: Option<&str>) -> std::result::Result<Option<i32>, String> {
    let raw = value.map(str::trim).unwrap_or_default();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }

    let code = raw
        .parse::<f64>()
        .map_err(|_| format!("invalid coco '{}'", raw))?;
    if code.fract() != 0.0 || code < i32::MIN as f64 || code > i32::MAX as f64 {
        return Err(format!("coco '{}' is not an integer code", raw));
    }
    Ok(Some(code as i32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_parse_station_time_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(1, 0, 0)
            .unwrap();
        for value in [
            "2024-01-01 01:00:00",
            "2024-01-01T01:00:00",
            "2024-01-01 01:00",
            "2024-01-01T01:00",
        ] {
            assert_eq!(parse_station_time(value).unwrap(), expected, "{}", value);
        }
        assert!(parse_station_time("01/01/2024").is_err());
    }

    #[test]
    fn test_parse_coco() {
        assert_eq!(parse_coco(Some("5")), Ok(Some(5)));
        assert_eq!(parse_coco(Some("6.0")), Ok(Some(6)));
        assert_eq!(parse_coco(Some("")), Ok(None));
        assert_eq!(parse_coco(None), Ok(None));
        assert!(parse_coco(Some("5.5")).is_err());
        assert!(parse_coco(Some("fog")).is_err());
    }

    #[test]
    fn test_read_station_observations() {
        let file = write_csv(
            "time,station,latitude,longitude,name,coco\n\
             2024-01-01 00:00:00,54511,39.93,116.28,Beijing,5.0\n\
             2024-01-01 01:00:00,54511,39.93,116.28,Beijing,\n",
        );

        let observations = read_station_observations(file.path()).unwrap();

        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].station, "54511");
        assert_eq!(observations[0].latitude, 39.93);
        assert_eq!(observations[0].longitude, 116.28);
        assert_eq!(observations[0].name, "Beijing");
        assert_eq!(observations[0].coco, Some(5));
        assert_eq!(observations[1].coco, None);
    }

    #[test]
    fn test_columns_in_any_order() {
        let file = write_csv(
            "station,name,coco,time,longitude,latitude\n\
             ZBAA,Beijing,2,2024-01-01T00:00,116.28,39.93\n",
        );

        let observations = read_station_observations(file.path()).unwrap();
        assert_eq!(observations[0].station, "ZBAA");
        assert_eq!(observations[0].latitude, 39.93);
    }

    #[test]
    fn test_header_only_file_is_empty() {
        let file = write_csv("time,station,latitude,longitude,name,coco\n");
        let observations = read_station_observations(file.path()).unwrap();
        assert!(observations.is_empty());
    }

    #[test]
    fn test_missing_column() {
        let file = write_csv(
            "time,station,latitude,longitude,name\n\
             2024-01-01 00:00:00,54511,39.93,116.28,Beijing\n",
        );

        match read_station_observations(file.path()).unwrap_err() {
            GridJoinError::MissingColumn { column, .. } => assert_eq!(column, "coco"),
            other => panic!("Expected MissingColumn error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_latitude_reports_record() {
        let file = write_csv(
            "time,station,latitude,longitude,name,coco\n\
             2024-01-01 00:00:00,54511,39.93,116.28,Beijing,1\n\
             2024-01-01 01:00:00,54511,north,116.28,Beijing,1\n",
        );

        match read_station_observations(file.path()).unwrap_err() {
            GridJoinError::InvalidFormat { reason, .. } => {
                assert!(reason.contains("record 2"), "{}", reason);
                assert!(reason.contains("latitude"), "{}", reason);
            }
            other => panic!("Expected InvalidFormat error, got {:?}", other),
        }
    }

    #[test]
    fn test_multiline_name_does_not_shift_record_number() {
        let file = write_csv(
            "time,station,latitude,longitude,name,coco\n\
             2024-01-01 00:00:00,54511,39.93,116.28,\"Beijing\nNanjiao\",1\n\
             2024-01-01 01:00:00,54511,39.93,east,Beijing,1\n",
        );

        match read_station_observations(file.path()).unwrap_err() {
            GridJoinError::InvalidFormat { reason, .. } => {
                assert!(reason.contains("record 2"), "{}", reason);
                assert!(reason.contains("longitude"), "{}", reason);
            }
            other => panic!("Expected InvalidFormat error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        let result = read_station_observations(Path::new("/nonexistent/stations.csv"));
        assert!(matches!(result, Err(GridJoinError::InputMissing { .. })));
    }
}
