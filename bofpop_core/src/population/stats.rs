//! Summary statistics used to place selection thresholds

/// Median of `values`, the mean of the two middle values for an even count
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.)
    } else {
        Some(sorted[mid])
    }
}

/// Sample standard deviation (n - 1 denominator), undefined below two values
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let sum_sq = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
    Some((sum_sq / (n - 1.)).sqrt())
}

/// `median + std` of `values`
pub fn upper_spread(values: &[f64]) -> Option<f64> {
    Some(median(values)? + sample_std(values)?)
}

/// `median - std` of `values`
pub fn lower_spread(values: &[f64]) -> Option<f64> {
    Some(median(values)? - sample_std(values)?)
}
