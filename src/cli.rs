//! Command-line interface components.

use crate::config::{CompressionAlgorithm, JoinConfig, OutputConfig};
use crate::error::Result;
use crate::spatial::DistanceMetric;
use clap::Parser;
use std::path::PathBuf;
use tracing::debug;

/// Join gridded reanalysis fields onto weather station observations
#[derive(Parser, Debug, Clone)]
#[command(name = "gridjoin")]
#[command(about = "Attach nearest-cell reanalysis values to station observations at matching hours")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// Gridded dataset (NetCDF) with time, latitude and longitude coordinates
    #[arg(value_name = "GRID_FILE")]
    pub grid_path: PathBuf,

    /// Station observations CSV (time, station, latitude, longitude, name, coco)
    #[arg(value_name = "STATIONS_CSV")]
    pub stations_path: PathBuf,

    /// Output file; `.parquet` selects Parquet, anything else CSV
    ///
    /// Defaults to combined_data.csv next to the stations file.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Distance used for nearest-cell matching
    #[arg(long, value_enum, default_value = "planar")]
    pub metric: DistanceMetric,

    /// Warn about stations farther than this from their grid point (metric units)
    #[arg(long, value_name = "DISTANCE")]
    pub extrapolation_warning: Option<f64>,

    /// Grid variables to extract (comma-separated); all by default
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    pub variables: Option<Vec<String>>,

    /// Number of parallel join workers (defaults to the number of CPUs)
    #[arg(short = 'j', long, value_name = "COUNT")]
    pub workers: Option<usize>,

    /// Observations per parallel work unit
    #[arg(long, value_name = "ROWS")]
    pub chunk_size: Option<usize>,

    /// Parquet compression algorithm
    #[arg(long, value_enum, default_value = "snappy")]
    pub compression: CompressionAlgorithm,

    /// Print run statistics as JSON on stdout when done
    #[arg(long)]
    pub summary_json: bool,

    /// Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    /// Determine the appropriate log level based on verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Overlay command-line settings onto `config`
    pub fn apply_cli_overrides(&self, config: &mut JoinConfig) {
        config.distance_metric = self.metric;
        if let Some(threshold) = self.extrapolation_warning {
            config.extrapolation_warning = Some(threshold);
        }
        if let Some(variables) = &self.variables {
            let names: Vec<String> = variables
                .iter()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect();
            config.variables = Some(names);
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        config.output = OutputConfig {
            format: None,
            compression: self.compression,
        };
        // Progress bars would interleave with the JSON summary
        config.show_progress = !self.quiet && !self.summary_json;
    }

    /// Build a validated configuration from defaults plus command-line settings
    pub fn to_config(&self) -> Result<JoinConfig> {
        let mut config = JoinConfig::default();
        self.apply_cli_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }
}

/// Set up structured logging on stderr
pub fn setup_logging(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("gridjoin={}", log_level)));

    if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    debug!("Logging initialized at level: {}", log_level);
}
