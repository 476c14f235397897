//! Noise rejection for raw sample batches.
//!
//! Analog temperature readings arrive with occasional spikes from
//! supply noise. Rather than assume a distribution, the filter sorts a
//! copy of the batch and discards the lowest and highest thirds before
//! averaging. Small batches are assumed representative and averaged
//! as-is.

/// Batches at or below this length are averaged without trimming.
pub const SMALL_BATCH_LEN: usize = 5;

/// Errors from the sample filter.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("no samples to filter")]
    NoSamples,
}

/// Robust mean of a sample batch.
///
/// For more than [`SMALL_BATCH_LEN`] samples, sorts a copy ascending
/// and drops `len / 3` samples from each end, averaging the middle.
/// The input slice is never reordered, so the capture-order sequence
/// stays available to callers for audit logging.
///
/// Integer division keeps the retained slice non-empty for every
/// length: `2 * (n / 3) < n` whenever `n > SMALL_BATCH_LEN`, so a
/// batch of 6 retains exactly its middle 2 samples.
pub fn robust_mean(samples: &[f64]) -> Result<f64, FilterError> {
    if samples.is_empty() {
        return Err(FilterError::NoSamples);
    }

    let mut sorted = samples.to_vec();
    let retained: &[f64] = if sorted.len() > SMALL_BATCH_LEN {
        sorted.sort_unstable_by(f64::total_cmp);
        let cut = sorted.len() / 3;
        &sorted[cut..sorted.len() - cut]
    } else {
        &sorted
    };

    Ok(retained.iter().sum::<f64>() / retained.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch_is_rejected() {
        assert_eq!(robust_mean(&[]), Err(FilterError::NoSamples));
    }

    #[test]
    fn single_sample_passes_through() {
        assert_eq!(robust_mean(&[42.1]).unwrap(), 42.1);
    }

    #[test]
    fn small_batches_get_exact_mean() {
        assert_eq!(robust_mean(&[1.0, 2.0, 3.0]).unwrap(), 2.0);
        // Five samples is still a small batch.
        assert_eq!(robust_mean(&[10.0, 20.0, 30.0, 40.0, 50.0]).unwrap(), 30.0);
    }

    #[test]
    fn six_samples_retain_middle_two() {
        // cut = 6 / 3 = 2 from each end, leaving [20, 30].
        let samples = [1000.0, 30.0, 0.0, 20.0, 40.0, 10.0];
        assert_eq!(robust_mean(&samples).unwrap(), 25.0);
    }

    #[test]
    fn ten_samples_retain_middle_four() {
        // cut = 10 / 3 = 3 from each end, leaving [4, 5, 6, 7].
        let samples = [10.0, 1.0, 9.0, 2.0, 8.0, 3.0, 7.0, 4.0, 6.0, 5.0];
        assert_eq!(robust_mean(&samples).unwrap(), 5.5);
    }

    #[test]
    fn seven_samples_retain_middle_three() {
        // cut = 7 / 3 = 2 from each end.
        let samples = [7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0];
        assert_eq!(robust_mean(&samples).unwrap(), 4.0);
    }

    #[test]
    fn outliers_are_discarded() {
        // A supply spike and a dropout around a stable 20 C signal.
        let samples = [20.1, 19.9, 20.0, -48.0, 20.2, 95.0, 19.8, 20.0];
        let mean = robust_mean(&samples).unwrap();
        assert!((mean - 20.0).abs() < 0.2, "got {mean}");
    }

    #[test]
    fn result_is_order_independent() {
        let a = [3.0, 1.0, 4.0, 1.5, 9.0, 2.6, 5.3];
        let b = [9.0, 5.3, 2.6, 1.5, 4.0, 1.0, 3.0];
        assert_eq!(robust_mean(&a).unwrap(), robust_mean(&b).unwrap());
    }

    #[test]
    fn input_slice_is_not_reordered() {
        let samples = [5.0, 1.0, 3.0];
        let _ = robust_mean(&samples).unwrap();
        assert_eq!(samples, [5.0, 1.0, 3.0]);
    }
}
