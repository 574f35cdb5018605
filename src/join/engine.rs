//! Per-observation spatial-temporal resolution.
//!
//! The engine owns the flattened grid, the spatial index and the temporal
//! resolver, all built once and read-only afterwards. Each observation maps
//! to the nearest grid cell and, when its timestamp is on the grid time
//! axis, to a [`MergedRecord`] carrying every grid variable at that
//! `(time, row, column)`.

use super::assembler::{MergedTable, ResultAssembler};
use crate::config::JoinConfig;
use crate::error::{GridJoinError, Result};
use crate::flatten::FlatGrid;
use crate::models::{GridDataset, MatchResult, MergedRecord, SkipReason, StationObservation};
use crate::spatial::SpatialIndex;
use crate::temporal::TemporalResolver;

use futures::stream::{self, StreamExt, TryStreamExt};
use indicatif::ProgressBar;
use std::ops::Range;
use std::sync::Arc;
use tokio::task;
use tracing::debug;

/// Result of joining one observation
#[derive(Debug, Clone, PartialEq)]
pub enum JoinOutcome {
    Joined {
        record: MergedRecord,
        matched: MatchResult,
        /// Nearest cell lies beyond the configured warning distance
        extrapolated: bool,
    },
    Skipped {
        reason: SkipReason,
        matched: MatchResult,
    },
}

/// Spatial-temporal join engine over one grid dataset
#[derive(Debug)]
pub struct JoinEngine {
    grid: Arc<GridDataset>,
    flat: FlatGrid,
    index: SpatialIndex,
    resolver: TemporalResolver,
    extrapolation_warning: Option<f64>,
}

impl JoinEngine {
    /// Flatten the grid and build the spatial index and time lookup
    pub fn new(grid: Arc<GridDataset>, config: &JoinConfig) -> Result<Self> {
        let flat = FlatGrid::new(grid.latitudes(), grid.longitudes());
        let index = SpatialIndex::build(flat.points(), config.distance_metric)?;
        let resolver = TemporalResolver::build(grid.times())?;

        debug!(
            "Built join engine: {} grid points ({:?}), {} timestamps, {} variables",
            flat.len(),
            config.distance_metric,
            resolver.axis_len(),
            grid.variables().len()
        );

        Ok(Self {
            grid,
            flat,
            index,
            resolver,
            extrapolation_warning: config.extrapolation_warning,
        })
    }

    pub fn grid(&self) -> &GridDataset {
        &self.grid
    }

    pub fn flat_grid(&self) -> &FlatGrid {
        &self.flat
    }

    pub fn variable_names(&self) -> Vec<String> {
        self.grid.variable_names()
    }

    /// Nearest cell and exact time position for one observation
    pub fn resolve(&self, observation: &StationObservation) -> Result<MatchResult> {
        let nearest = self
            .index
            .nearest(observation.latitude, observation.longitude)?;
        let (row, column) = self.flat.unravel(nearest.index);

        Ok(MatchResult {
            grid_index: nearest.index,
            row,
            column,
            distance: nearest.distance,
            time_index: self.resolver.resolve(&observation.time),
        })
    }

    /// Join one observation; a missing time match is a skip, not an error
    pub fn join_observation(&self, observation: &StationObservation) -> Result<JoinOutcome> {
        let matched = self.resolve(observation)?;

        let Some(time_index) = matched.time_index else {
            return Ok(JoinOutcome::Skipped {
                reason: SkipReason::NoTemporalMatch,
                matched,
            });
        };

        let extrapolated = self
            .extrapolation_warning
            .is_some_and(|threshold| matched.distance > threshold);
        if extrapolated {
            debug!(
                "Station {} at ({}, {}) is {:.3} {} from its nearest grid point",
                observation.station,
                observation.latitude,
                observation.longitude,
                matched.distance,
                self.index.metric().units()
            );
        }

        Ok(JoinOutcome::Joined {
            record: MergedRecord {
                observation: observation.clone(),
                values: self.grid.values_at(time_index, matched.row, matched.column),
            },
            matched,
            extrapolated,
        })
    }

    /// Lazily join a sequence of observations, preserving input order
    pub fn join<'a, I>(&'a self, observations: I) -> impl Iterator<Item = Result<JoinOutcome>> + 'a
    where
        I: IntoIterator<Item = &'a StationObservation>,
        I::IntoIter: 'a,
    {
        observations
            .into_iter()
            .map(move |observation| self.join_observation(observation))
    }

    /// Serial join of every observation into a table
    pub fn run(&self, observations: &[StationObservation]) -> Result<MergedTable> {
        self.run_with_progress(observations, None)
    }

    /// Serial join advancing `progress` once per observation
    pub fn run_with_progress(
        &self,
        observations: &[StationObservation],
        progress: Option<&ProgressBar>,
    ) -> Result<MergedTable> {
        let mut assembler = ResultAssembler::new(self.variable_names());
        for outcome in self.join(observations) {
            assembler.accept(outcome?);
            if let Some(pb) = progress {
                pb.inc(1);
            }
        }
        Ok(assembler.finish())
    }

    /// Join on `workers` blocking threads in chunks of `chunk_size`.
    ///
    /// Chunks are reassembled in input order, so the table equals the
    /// serial result.
    pub async fn run_parallel(
        self: Arc<Self>,
        observations: Arc<Vec<StationObservation>>,
        workers: usize,
        chunk_size: usize,
        progress: Option<ProgressBar>,
    ) -> Result<MergedTable> {
        if workers == 0 || chunk_size == 0 {
            return Err(GridJoinError::configuration(
                "parallel join needs at least one worker and a non-zero chunk size",
            ));
        }

        let ranges: Vec<Range<usize>> = (0..observations.len())
            .step_by(chunk_size)
            .map(|start| start..(start + chunk_size).min(observations.len()))
            .collect();

        debug!(
            "Joining {} observations in {} chunks on {} workers",
            observations.len(),
            ranges.len(),
            workers
        );

        let mut assembler = ResultAssembler::new(self.variable_names());
        let mut chunks = stream::iter(ranges)
            .map(|range| {
                let engine = Arc::clone(&self);
                let observations = Arc::clone(&observations);
                async move {
                    task::spawn_blocking(move || {
                        engine
                            .join(&observations[range])
                            .collect::<Result<Vec<_>>>()
                    })
                    .await
                    .map_err(|e| GridJoinError::TaskFailed {
                        reason: e.to_string(),
                    })?
                }
            })
            .buffered(workers);

        while let Some(outcomes) = chunks.try_next().await? {
            if let Some(pb) = &progress {
                pb.inc(outcomes.len() as u64);
            }
            for outcome in outcomes {
                assembler.accept(outcome);
            }
        }

        Ok(assembler.finish())
    }
}
