//! Text format of recorded traces.
//!
//! One sample per line, whitespace separated:
//! `label timestamp latitude longitude bytes elapsed_ms`.
//! Latitude and longitude are either both numeric or both `NOFIX`.

use std::str::FromStr;

use super::{GeoPoint, TraceError, TraceSample};

const MIN_FIELDS: usize = 6;
const NO_FIX: &str = "NOFIX";

/// Parses all records of a trace, stopping at the first invalid one.
pub(super) fn parse_trace_text(text: &str) -> Result<Vec<TraceSample>, TraceError> {
    let mut samples = Vec::new();
    for (index, line) in text.lines().enumerate() {
        if let Some(sample) = parse_trace_line(index + 1, line)? {
            samples.push(sample);
        }
    }
    Ok(samples)
}

/// Parses one record. Blank lines yield `Ok(None)`.
///
/// # Errors
/// - `TraceError::TooFewFields` - Fewer than 6 fields
/// - `TraceError::InvalidNumber` - Unparsable timestamp, coordinate, byte count or interval
/// - `TraceError::PartialFix` - Exactly one coordinate is `NOFIX`
/// - `TraceError::ZeroInterval` - Elapsed time of zero
pub fn parse_trace_line(line_number: usize, line: &str) -> Result<Option<TraceSample>, TraceError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.is_empty() {
        return Ok(None);
    }
    if fields.len() < MIN_FIELDS {
        return Err(TraceError::TooFewFields {
            line: line_number,
            found: fields.len(),
        });
    }

    let timestamp = parse_field::<u64>(line_number, "timestamp", fields[1])?;
    let location = parse_location(line_number, fields[2], fields[3])?;
    let bytes = parse_field::<u64>(line_number, "byte count", fields[4])?;
    let elapsed_ms = parse_field::<u64>(line_number, "elapsed time", fields[5])?;

    if elapsed_ms == 0 {
        return Err(TraceError::ZeroInterval { line: line_number });
    }

    Ok(Some(TraceSample {
        timestamp,
        location,
        bytes,
        elapsed_ms,
    }))
}

fn parse_location(
    line_number: usize,
    latitude: &str,
    longitude: &str,
) -> Result<Option<GeoPoint>, TraceError> {
    match (latitude == NO_FIX, longitude == NO_FIX) {
        (true, true) => Ok(None),
        (false, false) => Ok(Some(GeoPoint {
            latitude: parse_field::<f64>(line_number, "latitude", latitude)?,
            longitude: parse_field::<f64>(line_number, "longitude", longitude)?,
        })),
        _ => Err(TraceError::PartialFix { line: line_number }),
    }
}

fn parse_field<T: FromStr>(
    line_number: usize,
    field: &'static str,
    value: &str,
) -> Result<T, TraceError> {
    value.parse().map_err(|_| TraceError::InvalidNumber {
        line: line_number,
        field,
        value: value.to_string(),
    })
}
