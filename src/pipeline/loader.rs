//! Feed loading and cleaning.
//!
//! Each feed arrives as a CSV with a `date` column (day-month-year), a
//! free-text `district` column and a set of numeric counters. Cleaning
//! normalizes header names, canonicalizes districts, parses dates and
//! coerces missing or malformed numerics to zero. A feed that cannot be
//! read at all is replaced by an empty, correctly-shaped frame; the caller
//! learns about it through the load report, never through an abort.

use crate::district;
use crate::error::{AnalystError, Result};
use crate::types::{FeedFrame, FeedRecord, SourceKind};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const DATE_FORMAT: &str = "%d-%m-%Y";

/// Source of the three feeds. Implementations fetch one cleaned frame per
/// source kind; failing to produce a frame is reported as an error and
/// recovered by the pipeline.
#[async_trait]
pub trait FeedReader: Send + Sync {
    async fn fetch_feed(&self, source: SourceKind) -> Result<FeedFrame>;
}

/// Reads feeds from CSV files in a data directory.
pub struct CsvFeedReader {
    data_dir: PathBuf,
    enrollment_file: String,
    biometric_file: String,
    demographic_file: String,
}

impl CsvFeedReader {
    pub fn new(config: &crate::config::DataConfig) -> Self {
        Self {
            data_dir: PathBuf::from(&config.dir),
            enrollment_file: config.enrollment_file.clone(),
            biometric_file: config.biometric_file.clone(),
            demographic_file: config.demographic_file.clone(),
        }
    }

    fn path_for(&self, source: SourceKind) -> PathBuf {
        let file = match source {
            SourceKind::Enrollment => &self.enrollment_file,
            SourceKind::Biometric => &self.biometric_file,
            SourceKind::Demographic => &self.demographic_file,
        };
        self.data_dir.join(file)
    }
}

#[async_trait]
impl FeedReader for CsvFeedReader {
    async fn fetch_feed(&self, source: SourceKind) -> Result<FeedFrame> {
        let path = self.path_for(source);
        debug!("Loading {} feed from {}", source.label(), path.display());
        read_csv_feed(source, &path)
    }
}

/// Parses one CSV feed file into a cleaned frame.
pub fn read_csv_feed(source: SourceKind, path: &Path) -> Result<FeedFrame> {
    // Flexible: a ragged row yields zeros for its missing cells instead of
    // failing the whole feed
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

    // Normalize header names once, then address fields by position
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let date_idx = headers.iter().position(|h| h == "date").ok_or_else(|| {
        AnalystError::Config(format!(
            "{} feed at {} has no 'date' column",
            source.label(),
            path.display()
        ))
    })?;
    let district_idx = headers.iter().position(|h| h == "district").ok_or_else(|| {
        AnalystError::Config(format!(
            "{} feed at {} has no 'district' column",
            source.label(),
            path.display()
        ))
    })?;

    let counter_indices: Vec<usize> = (0..headers.len())
        .filter(|&i| i != date_idx && i != district_idx)
        .collect();
    let columns: Vec<String> = counter_indices
        .iter()
        .map(|&i| headers[i].clone())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;

        let date = record
            .get(date_idx)
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok());

        let district = district::canonicalize(record.get(district_idx).unwrap_or(""));

        let mut counters = BTreeMap::new();
        for (&idx, column) in counter_indices.iter().zip(columns.iter()) {
            counters.insert(column.clone(), clean_counter(record.get(idx)));
        }

        rows.push(FeedRecord {
            date,
            district,
            counters,
        });
    }

    Ok(FeedFrame {
        source,
        columns,
        rows,
    })
}

/// Coerces a raw counter cell to a clean value: missing, malformed,
/// non-finite or negative all become zero.
fn clean_counter(raw: Option<&str>) -> f64 {
    let value = raw
        .and_then(|s| {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                s.parse::<f64>().ok()
            }
        })
        .unwrap_or(0.0);
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// In-memory feed source for development and testing.
pub struct InMemoryFeedReader {
    frames: Vec<FeedFrame>,
}

impl InMemoryFeedReader {
    pub fn new(frames: Vec<FeedFrame>) -> Self {
        Self { frames }
    }
}

#[async_trait]
impl FeedReader for InMemoryFeedReader {
    async fn fetch_feed(&self, source: SourceKind) -> Result<FeedFrame> {
        match self.frames.iter().find(|f| f.source == source) {
            Some(frame) => Ok(frame.clone()),
            None => {
                warn!("No in-memory frame registered for {}", source.label());
                Ok(FeedFrame::empty(source))
            }
        }
    }
}
