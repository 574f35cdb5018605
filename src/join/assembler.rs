//! Accumulation of joined records into the output table.

use super::engine::JoinOutcome;
use crate::constants::{STATION_COLUMNS, is_fog_code};
use crate::models::{MergedRecord, SkipReason};

/// Collects join outcomes in the order they arrive
#[derive(Debug)]
pub struct ResultAssembler {
    variable_names: Vec<String>,
    records: Vec<MergedRecord>,
    observations: usize,
    skipped_no_time_match: usize,
    extrapolated: usize,
}

impl ResultAssembler {
    pub fn new(variable_names: Vec<String>) -> Self {
        Self {
            variable_names,
            records: Vec::new(),
            observations: 0,
            skipped_no_time_match: 0,
            extrapolated: 0,
        }
    }

    pub fn accept(&mut self, outcome: JoinOutcome) {
        self.observations += 1;
        match outcome {
            JoinOutcome::Joined {
                record,
                extrapolated,
                ..
            } => {
                if extrapolated {
                    self.extrapolated += 1;
                }
                self.records.push(record);
            }
            JoinOutcome::Skipped {
                reason: SkipReason::NoTemporalMatch,
                ..
            } => self.skipped_no_time_match += 1,
        }
    }

    /// Freeze the accumulated records into a table
    pub fn finish(self) -> MergedTable {
        MergedTable {
            variable_names: self.variable_names,
            records: self.records,
            observations: self.observations,
            skipped_no_time_match: self.skipped_no_time_match,
            extrapolated: self.extrapolated,
        }
    }
}

/// Ordered, immutable join output: one row per matched observation
#[derive(Debug, Clone, PartialEq)]
pub struct MergedTable {
    variable_names: Vec<String>,
    records: Vec<MergedRecord>,
    observations: usize,
    skipped_no_time_match: usize,
    extrapolated: usize,
}

impl MergedTable {
    pub fn records(&self) -> &[MergedRecord] {
        &self.records
    }

    pub fn variable_names(&self) -> &[String] {
        &self.variable_names
    }

    /// Station columns followed by grid variables
    pub fn column_names(&self) -> Vec<String> {
        STATION_COLUMNS
            .iter()
            .map(|s| s.to_string())
            .chain(self.variable_names.iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Observations seen, joined or not
    pub fn observations(&self) -> usize {
        self.observations
    }

    pub fn skipped_no_time_match(&self) -> usize {
        self.skipped_no_time_match
    }

    pub fn extrapolated(&self) -> usize {
        self.extrapolated
    }

    /// Rows whose weather code reports fog
    pub fn fog_observations(&self) -> usize {
        self.records
            .iter()
            .filter(|r| is_fog_code(r.observation.coco))
            .count()
    }

    /// Grid value of `variable` in row `row`
    pub fn value(&self, row: usize, variable: &str) -> Option<f32> {
        let position = self.variable_names.iter().position(|v| v == variable)?;
        self.records.get(row)?.values.get(position).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MatchResult, StationObservation};
    use chrono::NaiveDate;

    fn matched(time_index: Option<usize>) -> MatchResult {
        MatchResult {
            grid_index: 0,
            row: 0,
            column: 0,
            distance: 0.5,
            time_index,
        }
    }

    fn record(coco: Option<i32>, values: Vec<f32>) -> MergedRecord {
        MergedRecord {
            observation: StationObservation {
                time: NaiveDate::from_ymd_opt(2024, 12, 1)
                    .unwrap()
                    .and_hms_opt(6, 0, 0)
                    .unwrap(),
                station: "58362".to_string(),
                latitude: 31.4,
                longitude: 121.45,
                name: "Shanghai".to_string(),
                coco,
            },
            values,
        }
    }

    #[test]
    fn test_empty_assembly_is_valid() {
        let table = ResultAssembler::new(vec!["t2m".to_string()]).finish();
        assert!(table.is_empty());
        assert_eq!(table.observations(), 0);
        assert_eq!(table.column_names().len(), 7);
    }

    #[test]
    fn test_counts_and_order() {
        let mut assembler = ResultAssembler::new(vec!["t2m".to_string(), "d2m".to_string()]);
        assembler.accept(JoinOutcome::Joined {
            record: record(Some(5), vec![271.0, 270.0]),
            matched: matched(Some(0)),
            extrapolated: false,
        });
        assembler.accept(JoinOutcome::Skipped {
            reason: SkipReason::NoTemporalMatch,
            matched: matched(None),
        });
        assembler.accept(JoinOutcome::Joined {
            record: record(Some(1), vec![275.0, 268.0]),
            matched: matched(Some(1)),
            extrapolated: true,
        });

        let table = assembler.finish();
        assert_eq!(table.len(), 2);
        assert_eq!(table.observations(), 3);
        assert_eq!(table.skipped_no_time_match(), 1);
        assert_eq!(table.extrapolated(), 1);
        assert_eq!(table.fog_observations(), 1);
        assert_eq!(table.value(0, "t2m"), Some(271.0));
        assert_eq!(table.value(1, "d2m"), Some(268.0));
        assert_eq!(table.value(1, "sp"), None);
        assert_eq!(
            table.column_names(),
            vec!["time", "station", "latitude", "longitude", "name", "coco", "t2m", "d2m"]
        );
    }
}
