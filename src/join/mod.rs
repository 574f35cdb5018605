//! Join pipeline with modular architecture.
//!
//! Orchestrates the complete run: input checks, grid and station loading,
//! engine construction, serial or parallel joining, table assembly and
//! output writing. Fatal errors abort before any output is written.

pub mod assembler;
pub mod engine;
pub mod writer;

#[cfg(test)]
pub mod tests;

use self::{assembler::MergedTable, engine::JoinEngine, writer::TableWriter};

use crate::config::JoinConfig;
use crate::constants::DEFAULT_OUTPUT_FILE;
use crate::error::{GridJoinError, Result};
use crate::grid_reader::read_grid_dataset;
use crate::models::{GridDataset, JoinStats, StationObservation};
use crate::stations::read_station_observations;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::task;
use tracing::{info, warn};

/// Main driver for joining a grid file with a station file
#[derive(Debug)]
pub struct Joiner {
    grid_path: PathBuf,
    stations_path: PathBuf,
    output_path: PathBuf,
    config: JoinConfig,
}

impl Joiner {
    /// Create a joiner; both inputs must exist
    pub fn new(
        grid_path: PathBuf,
        stations_path: PathBuf,
        output_path: Option<PathBuf>,
    ) -> Result<Self> {
        for path in [&grid_path, &stations_path] {
            if !path.exists() {
                return Err(GridJoinError::InputMissing { path: path.clone() });
            }
        }

        let output_path = output_path.unwrap_or_else(|| {
            stations_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(DEFAULT_OUTPUT_FILE)
        });

        Ok(Self {
            grid_path,
            stations_path,
            output_path,
            config: JoinConfig::default(),
        })
    }

    /// Configure the joiner
    pub fn with_config(mut self, config: JoinConfig) -> Self {
        self.config = config;
        self
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Main processing entry point
    pub async fn run(&self) -> Result<JoinStats> {
        self.config.validate()?;

        let report = self.config.show_progress;
        if report {
            println!("{}", "Starting grid/station join".bright_green().bold());
            println!("  {} {}", "Grid:".bright_cyan(), self.grid_path.display());
            println!(
                "  {} {}",
                "Stations:".bright_cyan(),
                self.stations_path.display()
            );
            println!(
                "  {} {}",
                "Output:".bright_cyan(),
                self.output_path.display()
            );
            println!("\n{}", "Loading grid dataset...".bright_yellow());
        }

        // Step 1: Load grid
        let grid_path = self.grid_path.clone();
        let config = self.config.clone();
        let grid = task::spawn_blocking(move || read_grid_dataset(&grid_path, &config))
            .await
            .map_err(|e| GridJoinError::TaskFailed {
                reason: e.to_string(),
            })??;
        let shape = grid.shape();
        info!(
            "Grid has {} times, {} latitudes, {} longitudes and {} variables",
            shape.times,
            shape.latitudes,
            shape.longitudes,
            grid.variables().len()
        );
        if report {
            println!(
                "  {} {} times × {} latitudes × {} longitudes, {} variables",
                "Grid:".bright_green(),
                shape.times.to_string().bright_white().bold(),
                shape.latitudes.to_string().bright_white().bold(),
                shape.longitudes.to_string().bright_white().bold(),
                grid.variables().len().to_string().bright_white().bold()
            );
            println!("\n{}", "Loading station observations...".bright_yellow());
        }

        // Step 2: Load station observations
        let stations_path = self.stations_path.clone();
        let observations =
            task::spawn_blocking(move || read_station_observations(&stations_path))
                .await
                .map_err(|e| GridJoinError::TaskFailed {
                    reason: e.to_string(),
                })??;
        if report {
            println!(
                "  {} {} observations",
                "Found".bright_green(),
                observations.len().to_string().bright_white().bold()
            );
        }

        self.join_and_write(grid, observations).await
    }

    /// Join already-loaded inputs and write the result
    pub async fn join_and_write(
        &self,
        grid: GridDataset,
        observations: Vec<StationObservation>,
    ) -> Result<JoinStats> {
        let start_time = Instant::now();
        self.config.validate()?;

        let shape = grid.shape();
        let engine = Arc::new(JoinEngine::new(Arc::new(grid), &self.config)?);

        // Step 3: Join
        if self.config.show_progress {
            println!("\n{}", "Joining observations...".bright_yellow());
        }
        let table = join_observations(Arc::clone(&engine), observations, &self.config).await?;

        if table.extrapolated() > 0 {
            warn!(
                "{} observations matched a grid point farther than {:?} {}",
                table.extrapolated(),
                self.config.extrapolation_warning,
                self.config.distance_metric.units()
            );
        }

        let mut stats = JoinStats {
            observations: table.observations(),
            joined: table.len(),
            skipped_no_time_match: table.skipped_no_time_match(),
            extrapolated: table.extrapolated(),
            fog_observations: table.fog_observations(),
            grid_points: shape.spatial_points(),
            grid_times: shape.times,
            variables: table.variable_names().len(),
            output_path: self.output_path.clone(),
            processing_time_ms: 0,
        };

        // Step 4: Write output
        if self.config.show_progress {
            println!("\n{}", "Writing output...".bright_yellow());
        }
        let writer = TableWriter::new(self.output_path.clone(), self.config.output.clone());
        let rows_written = task::spawn_blocking(move || writer.write(&table))
            .await
            .map_err(|e| GridJoinError::TaskFailed {
                reason: e.to_string(),
            })??;
        info!(
            "Wrote {} rows to {}",
            rows_written,
            self.output_path.display()
        );

        stats.processing_time_ms = start_time.elapsed().as_millis();
        if self.config.show_progress {
            print_summary(&stats);
        }

        Ok(stats)
    }
}

/// Join observations serially or in parallel depending on `config.workers`
pub async fn join_observations(
    engine: Arc<JoinEngine>,
    observations: Vec<StationObservation>,
    config: &JoinConfig,
) -> Result<MergedTable> {
    let progress = config
        .show_progress
        .then(|| observation_progress(observations.len() as u64));

    let table = if config.workers <= 1 || observations.len() <= config.chunk_size {
        let engine = Arc::clone(&engine);
        let progress = progress.clone();
        task::spawn_blocking(move || engine.run_with_progress(&observations, progress.as_ref()))
            .await
            .map_err(|e| GridJoinError::TaskFailed {
                reason: e.to_string(),
            })??
    } else {
        engine
            .run_parallel(
                Arc::new(observations),
                config.workers,
                config.chunk_size,
                progress.clone(),
            )
            .await?
    };

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    info!(
        "Joined {} of {} observations ({} without a grid timestamp)",
        table.len(),
        table.observations(),
        table.skipped_no_time_match()
    );

    Ok(table)
}

fn observation_progress(total: u64) -> ProgressBar {
    let progress_bar = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} observations")
    {
        progress_bar.set_style(style.progress_chars("#>-"));
    }
    progress_bar
}

fn print_summary(stats: &JoinStats) {
    println!("\n{}", "Join Summary".bright_green().bold());
    println!(
        "  {} {}ms",
        "Time elapsed:".bright_cyan(),
        stats.processing_time_ms.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Observations:".bright_cyan(),
        stats.observations.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Rows joined:".bright_cyan(),
        stats.joined.to_string().bright_white().bold()
    );
    if stats.skipped() > 0 {
        println!(
            "  {} {}",
            "Skipped (no grid timestamp):".bright_yellow(),
            stats.skipped().to_string().bright_yellow().bold()
        );
    }
    if stats.extrapolated > 0 {
        println!(
            "  {} {}",
            "Beyond warning distance:".bright_red(),
            stats.extrapolated.to_string().bright_red().bold()
        );
    }
    println!(
        "  {} {}",
        "Fog observations:".bright_cyan(),
        stats.fog_observations.to_string().bright_white()
    );
}
