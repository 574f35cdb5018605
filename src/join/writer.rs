//! Output writing for merged tables.
//!
//! Converts a [`MergedTable`] into a polars `DataFrame` and writes it as CSV
//! or Parquet. Output goes to a temporary file in the destination directory
//! and is renamed into place once complete, so a failed write never leaves a
//! partial file behind.

use super::assembler::MergedTable;
use crate::config::{OutputConfig, OutputFormat};
use crate::constants::{
    COL_COCO, COL_LATITUDE, COL_LONGITUDE, COL_NAME, COL_STATION, COL_TIME, OUTPUT_TIME_FORMAT,
};
use crate::error::{GridJoinError, Result};

use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Build the output frame: station columns, then one column per grid variable
pub fn table_to_dataframe(table: &MergedTable) -> Result<DataFrame> {
    let records = table.records();

    let times: Vec<i64> = records
        .iter()
        .map(|r| r.observation.time.and_utc().timestamp_millis())
        .collect();
    let time = Series::new(COL_TIME.into(), times)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;

    let mut columns: Vec<Column> = vec![
        time.into(),
        Series::new(
            COL_STATION.into(),
            records
                .iter()
                .map(|r| r.observation.station.as_str())
                .collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            COL_LATITUDE.into(),
            records
                .iter()
                .map(|r| r.observation.latitude)
                .collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            COL_LONGITUDE.into(),
            records
                .iter()
                .map(|r| r.observation.longitude)
                .collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            COL_NAME.into(),
            records
                .iter()
                .map(|r| r.observation.name.as_str())
                .collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            COL_COCO.into(),
            records
                .iter()
                .map(|r| r.observation.coco)
                .collect::<Vec<Option<i32>>>(),
        )
        .into(),
    ];

    for (position, name) in table.variable_names().iter().enumerate() {
        let values: Vec<f32> = records.iter().map(|r| r.values[position]).collect();
        columns.push(Series::new(name.as_str().into(), values).into());
    }

    Ok(DataFrame::new(columns)?)
}

/// Writes merged tables to a single output file
#[derive(Debug, Clone)]
pub struct TableWriter {
    output_path: PathBuf,
    output: OutputConfig,
}

impl TableWriter {
    pub fn new(output_path: PathBuf, output: OutputConfig) -> Self {
        Self {
            output_path,
            output,
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn format(&self) -> OutputFormat {
        self.output.resolve_format(&self.output_path)
    }

    /// Write the table, returning the number of rows written
    pub fn write(&self, table: &MergedTable) -> Result<usize> {
        let mut frame = table_to_dataframe(table)?;

        let directory = match self.output_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&directory)?;

        let mut staging = tempfile::Builder::new()
            .prefix(".gridjoin-")
            .suffix(".tmp")
            .tempfile_in(&directory)?;

        match self.format() {
            OutputFormat::Csv => {
                CsvWriter::new(staging.as_file_mut())
                    .include_header(true)
                    .with_datetime_format(Some(OUTPUT_TIME_FORMAT.to_string()))
                    .finish(&mut frame)?;
            }
            OutputFormat::Parquet => {
                ParquetWriter::new(staging.as_file_mut())
                    .with_compression(self.output.compression.to_polars_compression())
                    .finish(&mut frame)?;
            }
        }

        staging
            .persist(&self.output_path)
            .map_err(|e| GridJoinError::Io(e.error))?;

        debug!(
            "Wrote {} rows ({:?}) to {}",
            frame.height(),
            self.format(),
            self.output_path.display()
        );

        Ok(frame.height())
    }
}
