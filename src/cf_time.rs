//! CF-convention time decoding.
//!
//! Grid files store time as numeric offsets with a units attribute such as
//! `"seconds since 1970-01-01"` or `"hours since 1900-01-01 00:00:00.0"`.
//! Decoded timestamps are naive UTC.

use crate::error::{GridJoinError, Result};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

/// Offset unit of a CF time axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    fn parse(unit: &str) -> Option<Self> {
        match unit.to_ascii_lowercase().as_str() {
            "s" | "sec" | "secs" | "second" | "seconds" => Some(TimeUnit::Seconds),
            "min" | "mins" | "minute" | "minutes" => Some(TimeUnit::Minutes),
            "h" | "hr" | "hrs" | "hour" | "hours" => Some(TimeUnit::Hours),
            "d" | "day" | "days" => Some(TimeUnit::Days),
            _ => None,
        }
    }

    fn millis(&self) -> f64 {
        match self {
            TimeUnit::Seconds => 1_000.0,
            TimeUnit::Minutes => 60_000.0,
            TimeUnit::Hours => 3_600_000.0,
            TimeUnit::Days => 86_400_000.0,
        }
    }
}

/// Parsed `"<unit> since <reference>"` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CfTimeUnits {
    pub unit: TimeUnit,
    pub reference: NaiveDateTime,
}

impl CfTimeUnits {
    pub fn parse(units: &str) -> Result<Self> {
        let trimmed = units.trim();
        let (unit, reference) = trimmed
            .split_once(" since ")
            .ok_or_else(|| GridJoinError::time_parsing(trimmed, "expected '<unit> since <date>'"))?;

        let unit = TimeUnit::parse(unit.trim()).ok_or_else(|| {
            GridJoinError::time_parsing(trimmed, format!("unsupported time unit '{}'", unit))
        })?;
        let reference = parse_reference(reference.trim())?;

        Ok(Self { unit, reference })
    }

    /// Timestamp for one stored offset, rounded to the millisecond
    pub fn decode(&self, value: f64) -> Result<NaiveDateTime> {
        if !value.is_finite() {
            return Err(GridJoinError::time_parsing(
                value.to_string(),
                "non-finite time offset",
            ));
        }

        let millis = (value * self.unit.millis()).round();
        TimeDelta::try_milliseconds(millis as i64)
            .and_then(|delta| self.reference.checked_add_signed(delta))
            .ok_or_else(|| GridJoinError::time_parsing(value.to_string(), "time offset out of range"))
    }

    pub fn decode_all(&self, values: &[f64]) -> Result<Vec<NaiveDateTime>> {
        values.iter().map(|&v| self.decode(v)).collect()
    }
}

fn parse_reference(reference: &str) -> Result<NaiveDateTime> {
    let reference = reference
        .trim_end_matches(" UTC")
        .trim_end_matches('Z')
        .trim_end_matches("+00:00")
        .trim();

    const FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];

    for format in FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(reference, format) {
            return Ok(parsed);
        }
    }

    NaiveDate::parse_from_str(reference, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| GridJoinError::time_parsing(reference, "unrecognised reference date"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datetime(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_unix_seconds() {
        let units = CfTimeUnits::parse("seconds since 1970-01-01").unwrap();
        assert_eq!(units.unit, TimeUnit::Seconds);
        assert_eq!(units.decode(1_704_067_200.0).unwrap(), datetime(2024, 1, 1, 0));
        assert_eq!(units.decode(1_704_070_800.0).unwrap(), datetime(2024, 1, 1, 1));
    }

    #[test]
    fn test_hours_since_1900() {
        let units = CfTimeUnits::parse("hours since 1900-01-01 00:00:00.0").unwrap();
        // 2024-01-01T00:00 is 45290 days after 1900-01-01
        assert_eq!(
            units.decode(45_290.0 * 24.0).unwrap(),
            datetime(2024, 1, 1, 0)
        );
    }

    #[test]
    fn test_reference_with_zone_suffix() {
        let units = CfTimeUnits::parse("days since 2024-01-01T00:00:00Z").unwrap();
        assert_eq!(units.decode(1.5).unwrap(), datetime(2024, 1, 2, 12));
    }

    #[test]
    fn test_decode_all() {
        let units = CfTimeUnits::parse("minutes since 2024-01-01 00:00").unwrap();
        let decoded = units.decode_all(&[0.0, 60.0, 120.0]).unwrap();
        assert_eq!(
            decoded,
            vec![
                datetime(2024, 1, 1, 0),
                datetime(2024, 1, 1, 1),
                datetime(2024, 1, 1, 2)
            ]
        );
    }

    #[test]
    fn test_rejects_unknown_unit() {
        assert!(matches!(
            CfTimeUnits::parse("fortnights since 2024-01-01"),
            Err(GridJoinError::TimeParsing { .. })
        ));
    }

    #[test]
    fn test_rejects_missing_since() {
        assert!(CfTimeUnits::parse("hours").is_err());
        assert!(CfTimeUnits::parse("hours since yesterday").is_err());
    }

    #[test]
    fn test_rejects_non_finite_offset() {
        let units = CfTimeUnits::parse("hours since 2024-01-01").unwrap();
        assert!(units.decode(f64::NAN).is_err());
    }
}
