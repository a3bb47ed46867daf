//! Forward cursor over a shared trace.

use super::BandwidthTrace;

/// Remembers how far into the trace previous lookups went.
///
/// Gives the same answers as [`BandwidthTrace::bandwidth_at`] but resumes
/// the scan from the last matched sample, so a run over the whole trace
/// with increasing query times is linear in the trace length. A query
/// earlier than the cursor position rewinds to the start.
#[derive(Debug, Clone)]
pub struct TraceCursor<'a> {
    trace: &'a BandwidthTrace,
    /// Index of the next sample to examine.
    index: usize,
    /// Cumulative end time of the last consumed sample.
    consumed_ms: u64,
    /// Cumulative end time of the sample before that.
    previous_end_ms: u64,
}

impl<'a> TraceCursor<'a> {
    pub fn new(trace: &'a BandwidthTrace) -> Self {
        Self {
            trace,
            index: 0,
            consumed_ms: 0,
            previous_end_ms: 0,
        }
    }

    /// Number of samples the scan has stepped over so far.
    pub fn samples_consumed(&self) -> usize {
        self.index
    }

    /// Bandwidth available at `time_ms`, or `None` once the trace is exhausted.
    pub fn bandwidth_at(&mut self, time_ms: u64) -> Option<u64> {
        let samples = self.trace.samples();

        if self.index > 0 {
            // The last matched sample still covers the query.
            if time_ms > self.previous_end_ms && time_ms <= self.consumed_ms {
                return Some(samples[self.index - 1].bandwidth_kbps());
            }
            if time_ms <= self.previous_end_ms {
                self.rewind();
            }
        }

        while let Some(sample) = samples.get(self.index) {
            self.previous_end_ms = self.consumed_ms;
            self.consumed_ms += sample.elapsed_ms;
            self.index += 1;
            if self.consumed_ms >= time_ms {
                return Some(sample.bandwidth_kbps());
            }
        }
        None
    }

    /// Resets the cursor to the beginning of the trace.
    pub fn rewind(&mut self) {
        self.index = 0;
        self.consumed_ms = 0;
        self.previous_end_ms = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::TraceSample;

    fn trace() -> BandwidthTrace {
        BandwidthTrace::from_samples(
            "cursor",
            vec![
                TraceSample::with_bandwidth(800, 500),
                TraceSample::with_bandwidth(1600, 500),
                TraceSample::with_bandwidth(400, 1000),
            ],
        )
    }

    #[test]
    fn test_cursor_matches_linear_scan() {
        let trace = trace();
        let mut cursor = trace.cursor();
        for time_ms in (0..=2400).step_by(100) {
            assert_eq!(
                cursor.bandwidth_at(time_ms),
                trace.bandwidth_at(time_ms),
                "mismatch at {time_ms} ms"
            );
        }
    }

    #[test]
    fn test_cursor_consumption_is_monotonic() {
        let trace = trace();
        let mut cursor = trace.cursor();

        cursor.bandwidth_at(0);
        assert_eq!(cursor.samples_consumed(), 1);
        cursor.bandwidth_at(500);
        assert_eq!(cursor.samples_consumed(), 1);
        cursor.bandwidth_at(501);
        assert_eq!(cursor.samples_consumed(), 2);
        cursor.bandwidth_at(1999);
        assert_eq!(cursor.samples_consumed(), 3);
    }

    #[test]
    fn test_cursor_rewinds_for_earlier_query() {
        let trace = trace();
        let mut cursor = trace.cursor();

        assert_eq!(cursor.bandwidth_at(1500), Some(400));
        assert_eq!(cursor.bandwidth_at(200), Some(800));
        assert_eq!(cursor.samples_consumed(), 1);
    }

    #[test]
    fn test_cursor_reports_exhaustion_repeatedly() {
        let trace = trace();
        let mut cursor = trace.cursor();

        assert_eq!(cursor.bandwidth_at(2001), None);
        assert_eq!(cursor.bandwidth_at(2200), None);
        assert_eq!(cursor.samples_consumed(), 3);
    }
}
