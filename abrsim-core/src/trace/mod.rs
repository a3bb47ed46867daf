//! Bandwidth traces recorded on mobile links.
//!
//! A trace is an ordered list of samples, each covering an elapsed-time
//! increment and the bytes transferred during it. The simulation asks a
//! trace for the bandwidth available at a given simulated time; the
//! answer is the bandwidth of the first sample whose cumulative end time
//! reaches that query time, or `None` once the trace is exhausted.

mod cursor;
mod parsing;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use cursor::TraceCursor;
pub use parsing::parse_trace_line;

/// Errors that occur while loading a trace.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("Failed to read trace file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Line {line}: expected at least 6 fields, found {found}")]
    TooFewFields { line: usize, found: usize },

    #[error("Line {line}: invalid {field} value '{value}'")]
    InvalidNumber {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("Line {line}: NOFIX must be given for both coordinates")]
    PartialFix { line: usize },

    #[error("Line {line}: sample covers zero elapsed time")]
    ZeroInterval { line: usize },
}

impl TraceError {
    /// Line of the offending record, if the error came from parsing.
    pub fn line(&self) -> Option<usize> {
        match self {
            TraceError::Io { .. } => None,
            TraceError::TooFewFields { line, .. }
            | TraceError::InvalidNumber { line, .. }
            | TraceError::PartialFix { line }
            | TraceError::ZeroInterval { line } => Some(*line),
        }
    }
}

/// GPS position attached to a sample. Not used by the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// One measurement of link capacity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraceSample {
    /// Wall-clock timestamp recorded with the sample.
    pub timestamp: u64,
    /// Position, `None` when the receiver had no fix.
    pub location: Option<GeoPoint>,
    /// Bytes transferred during this increment.
    pub bytes: u64,
    /// Length of this increment in milliseconds, always non-zero.
    pub elapsed_ms: u64,
}

impl TraceSample {
    /// Creates a sample without location.
    pub fn new(bytes: u64, elapsed_ms: u64) -> Self {
        Self {
            timestamp: 0,
            location: None,
            bytes,
            elapsed_ms,
        }
    }

    /// Creates a sample carrying `kbps` for `elapsed_ms`.
    pub fn with_bandwidth(kbps: u64, elapsed_ms: u64) -> Self {
        Self::new(kbps * elapsed_ms / 8, elapsed_ms)
    }

    /// Bandwidth implied by this sample. Bits per millisecond equals kbps.
    pub fn bandwidth_kbps(&self) -> u64 {
        if self.elapsed_ms == 0 {
            return 0;
        }
        self.bytes * 8 / self.elapsed_ms
    }
}

/// Kind of transport a trace was recorded on, inferred from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TraceCategory {
    Bus,
    Car,
    Ferry,
    Metro,
    Train,
    Tram,
    Other,
}

impl TraceCategory {
    /// Guesses the category from a trace label or file name.
    pub fn from_label(label: &str) -> Self {
        let lower = label.to_ascii_lowercase();
        let table = [
            ("bus", TraceCategory::Bus),
            ("car", TraceCategory::Car),
            ("ferry", TraceCategory::Ferry),
            ("metro", TraceCategory::Metro),
            ("train", TraceCategory::Train),
            ("tram", TraceCategory::Tram),
        ];
        table
            .into_iter()
            .find(|(needle, _)| lower.contains(needle))
            .map_or(TraceCategory::Other, |(_, category)| category)
    }
}

impl fmt::Display for TraceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TraceCategory::Bus => "bus",
            TraceCategory::Car => "car",
            TraceCategory::Ferry => "ferry",
            TraceCategory::Metro => "metro",
            TraceCategory::Train => "train",
            TraceCategory::Tram => "tram",
            TraceCategory::Other => "other",
        };
        f.write_str(name)
    }
}

/// Immutable, time-ordered bandwidth trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandwidthTrace {
    label: String,
    samples: Vec<TraceSample>,
}

impl BandwidthTrace {
    /// Builds a trace from samples already in time order.
    pub fn from_samples(label: impl Into<String>, samples: Vec<TraceSample>) -> Self {
        Self {
            label: label.into(),
            samples,
        }
    }

    /// Parses trace text. The whole trace is rejected on the first bad record.
    ///
    /// # Errors
    /// - `TraceError::TooFewFields` - Record with fewer than 6 fields
    /// - `TraceError::InvalidNumber` - Unparsable numeric field
    /// - `TraceError::PartialFix` - Only one coordinate marked NOFIX
    /// - `TraceError::ZeroInterval` - Sample with zero elapsed time
    pub fn parse(label: impl Into<String>, text: &str) -> Result<Self, TraceError> {
        let label = label.into();
        let samples = parsing::parse_trace_text(text)?;
        tracing::debug!(label = %label, samples = samples.len(), "Parsed bandwidth trace");
        Ok(Self { label, samples })
    }

    /// Reads and parses a trace file.
    ///
    /// # Errors
    /// - `TraceError::Io` - File could not be read
    /// - Any parse error from [`BandwidthTrace::parse`]
    pub async fn load(path: &Path) -> Result<Self, TraceError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| TraceError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse(label_for_path(path), &text)
    }

    /// Blocking variant of [`BandwidthTrace::load`].
    ///
    /// # Errors
    /// - `TraceError::Io` - File could not be read
    /// - Any parse error from [`BandwidthTrace::parse`]
    pub fn load_blocking(path: &Path) -> Result<Self, TraceError> {
        let text = std::fs::read_to_string(path).map_err(|source| TraceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(label_for_path(path), &text)
    }

    /// Name of the trace, usually the file name.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Transport category inferred from the label.
    pub fn category(&self) -> TraceCategory {
        TraceCategory::from_label(&self.label)
    }

    /// Samples in time order.
    pub fn samples(&self) -> &[TraceSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Total time covered by the trace.
    pub fn duration_ms(&self) -> u64 {
        self.samples.iter().map(|s| s.elapsed_ms).sum()
    }

    /// Time-weighted mean bandwidth over the whole trace.
    pub fn mean_bandwidth_kbps(&self) -> Option<u64> {
        let duration = self.duration_ms();
        if duration == 0 {
            return None;
        }
        let bits: u64 = self.samples.iter().map(|s| s.bytes * 8).sum();
        Some(bits / duration)
    }

    /// Bandwidth available at `time_ms`, scanning from the first sample.
    ///
    /// Returns `None` when the trace ends before `time_ms`.
    pub fn bandwidth_at(&self, time_ms: u64) -> Option<u64> {
        let mut cumulative = 0u64;
        for sample in &self.samples {
            cumulative += sample.elapsed_ms;
            if cumulative >= time_ms {
                return Some(sample.bandwidth_kbps());
            }
        }
        None
    }

    /// Forward cursor for monotonic lookups over this trace.
    pub fn cursor(&self) -> TraceCursor<'_> {
        TraceCursor::new(self)
    }
}

fn label_for_path(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
