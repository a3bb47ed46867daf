//! Geometric-mean capacity estimate used during warm-up.

/// Online geometric mean of observed bandwidth samples.
///
/// Mobile links are bursty and a single spike dominates an arithmetic
/// mean, so warm-up decisions use the geometric mean instead. The running
/// product is held as a sum of logarithms; a zero sample makes the sum
/// negative infinity and the estimate zero, as the product would.
#[derive(Debug, Clone, Default)]
pub struct GeometricMeanEstimator {
    log_sum: f64,
    count: u64,
}

impl GeometricMeanEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one bandwidth sample in kbps.
    pub fn observe(&mut self, kbps: u64) {
        self.log_sum += (kbps as f64).ln();
        self.count += 1;
    }

    /// Current estimate in kbps, rounded to the nearest integer. Zero before any sample.
    pub fn estimate(&self) -> u64 {
        if self.count == 0 {
            return 0;
        }
        (self.log_sum / self.count as f64).exp().round() as u64
    }

    /// Records `kbps` and returns the updated estimate.
    pub fn observe_and_estimate(&mut self, kbps: u64) -> u64 {
        self.observe(kbps);
        self.estimate()
    }

    pub fn sample_count(&self) -> u64 {
        self.count
    }
}
