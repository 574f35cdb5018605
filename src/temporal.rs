//! Exact-timestamp resolution against the grid time axis.
//!
//! A timestamp resolves only if it appears verbatim on the axis. There is no
//! nearest-hour fallback.

use crate::error::{GridJoinError, Result};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use tracing::warn;

/// Hash lookup from timestamp to time-axis position
#[derive(Debug, Clone)]
pub struct TemporalResolver {
    positions: HashMap<NaiveDateTime, usize>,
    axis_len: usize,
}

impl TemporalResolver {
    /// Index the time axis. Duplicate timestamps keep their first position.
    pub fn build(axis: &[NaiveDateTime]) -> Result<Self> {
        if axis.is_empty() {
            return Err(GridJoinError::invalid_state(
                "cannot build a temporal resolver from an empty time axis",
            ));
        }

        let mut positions = HashMap::with_capacity(axis.len());
        let mut duplicates = 0usize;
        for (index, time) in axis.iter().enumerate() {
            if positions.contains_key(time) {
                duplicates += 1;
            } else {
                positions.insert(*time, index);
            }
        }

        if duplicates > 0 {
            warn!(
                "Grid time axis has {} duplicate timestamps; first occurrence used",
                duplicates
            );
        }

        Ok(Self {
            positions,
            axis_len: axis.len(),
        })
    }

    /// Position of `time` on the axis, or `None` when absent
    pub fn resolve(&self, time: &NaiveDateTime) -> Option<usize> {
        self.positions.get(time).copied()
    }

    pub fn axis_len(&self) -> usize {
        self.axis_len
    }
}
