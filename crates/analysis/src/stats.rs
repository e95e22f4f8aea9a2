use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
}

impl Summary {
    /// `None` for an empty sample.
    pub fn of(values: &[i64]) -> Option<Self> {
        Some(Self {
            count: values.len(),
            mean: mean(values)?,
            median: median(values)?,
        })
    }
}

pub fn mean(values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().map(|v| *v as f64).sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0
    } else {
        sorted[mid] as f64
    })
}

/// Pearson correlation of paired samples. Undefined below two pairs or when either side is
/// constant.
pub fn pearson(pairs: &[(i64, i64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| *x as f64).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| *y as f64).sum::<f64>() / n;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let dx = *x as f64 - mean_x;
        let dy = *y as f64 - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_median() {
        assert_eq!(mean(&[1, 2, 3, 10]), Some(4.0));
        assert_eq!(median(&[10, 1, 3, 2]), Some(2.5));
        assert_eq!(median(&[7, 1, 3]), Some(3.0));
        assert_eq!(Summary::of(&[]), None);
    }

    #[test]
    fn perfect_correlations() {
        let up = pearson(&[(1, 2), (2, 4), (3, 6)]).unwrap();
        assert!((up - 1.0).abs() < 1e-12);
        let down = pearson(&[(1, 6), (2, 4), (3, 2)]).unwrap();
        assert!((down + 1.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_samples_have_no_correlation() {
        assert_eq!(pearson(&[(1, 1)]), None);
        assert_eq!(pearson(&[(1, 5), (2, 5), (3, 5)]), None);
    }
}
