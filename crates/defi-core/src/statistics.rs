// ── Descriptive statistics ────────────────────────────────────────────────────

/// Compute the `p`-th percentile of a **sorted** slice using linear
/// interpolation between closest ranks.
///
/// Returns `0.0` for an empty slice.
pub fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    match sorted_data.len() {
        0 => 0.0,
        1 => sorted_data[0],
        len => {
            let rank = (p / 100.0).clamp(0.0, 1.0) * (len as f64 - 1.0);
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            if lo == hi {
                return sorted_data[lo];
            }
            let frac = rank - lo as f64;
            sorted_data[lo] + frac * (sorted_data[hi] - sorted_data[lo])
        }
    }
}

/// Median of an unsorted sample. Even-sized samples average the two middle
/// values. Returns `0.0` for an empty sample.
pub fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    percentile(&sorted, 50.0)
}

/// Arithmetic mean. Returns `0.0` for an empty sample.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_empty() {
        assert_eq!(percentile(&[], 50.0), 0.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        let data = [10.0, 20.0, 30.0, 40.0];
        assert!((percentile(&data, 50.0) - 25.0).abs() < 1e-9);
        assert!((percentile(&data, 100.0) - 40.0).abs() < 1e-9);
        assert!((percentile(&data, 0.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert!((median(&[4.0, 1.0, 3.0, 2.0]) - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_median_empty() {
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn test_mean() {
        assert!((mean(&[1.0, 2.0, 6.0]) - 3.0).abs() < 1e-9);
        assert_eq!(mean(&[]), 0.0);
    }
}
