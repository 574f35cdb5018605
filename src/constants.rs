//! Application constants for gridjoin
//!
//! Column names, coordinate naming conventions, timestamp formats and
//! weather-code mappings shared across the crate.

// =============================================================================
// Station Table Columns
// =============================================================================

/// Timestamp of the observation
pub const COL_TIME: &str = "time";
/// Station identifier
pub const COL_STATION: &str = "station";
/// Station latitude in degrees north
pub const COL_LATITUDE: &str = "latitude";
/// Station longitude in degrees east
pub const COL_LONGITUDE: &str = "longitude";
/// Human readable station name
pub const COL_NAME: &str = "name";
/// Weather condition code
pub const COL_COCO: &str = "coco";

/// Station columns in output order. Grid variables follow these.
pub const STATION_COLUMNS: &[&str] = &[
    COL_TIME,
    COL_STATION,
    COL_LATITUDE,
    COL_LONGITUDE,
    COL_NAME,
    COL_COCO,
];

// =============================================================================
// Grid Coordinate Names
// =============================================================================

/// Candidate names for the grid time coordinate, tried in order
pub const DEFAULT_TIME_NAMES: &[&str] = &["valid_time", "time"];

/// Candidate names for the grid latitude coordinate
pub const DEFAULT_LATITUDE_NAMES: &[&str] = &["latitude", "lat"];

/// Candidate names for the grid longitude coordinate
pub const DEFAULT_LONGITUDE_NAMES: &[&str] = &["longitude", "lon"];

// =============================================================================
// Timestamp Formats
// =============================================================================

/// Accepted station timestamp layouts
pub const STATION_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Layout used when writing timestamps to CSV output
pub const OUTPUT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// =============================================================================
// Weather Condition Codes
// =============================================================================

/// Meteostat weather condition codes
pub mod weather_codes {
    /// Fog
    pub const FOG: i32 = 5;

    /// Freezing fog
    pub const FREEZING_FOG: i32 = 6;

    /// Codes that label an observation as foggy
    pub const FOG_CODES: &[i32] = &[FOG, FREEZING_FOG];
}

/// True when a weather condition code reports fog
pub fn is_fog_code(coco: Option<i32>) -> bool {
    coco.is_some_and(|code| weather_codes::FOG_CODES.contains(&code))
}

// =============================================================================
// Processing Defaults
// =============================================================================

/// Observations handed to a worker per parallel work unit
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Mean Earth radius used by the haversine metric, in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Default output file name, written beside the stations file
pub const DEFAULT_OUTPUT_FILE: &str = "combined_data.csv";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fog_codes() {
        assert!(is_fog_code(Some(5)));
        assert!(is_fog_code(Some(6)));
        assert!(!is_fog_code(Some(7)));
        assert!(!is_fog_code(None));
    }

    #[test]
    fn test_station_columns_order() {
        assert_eq!(
            STATION_COLUMNS,
            &["time", "station", "latitude", "longitude", "name", "coco"]
        );
    }
}
