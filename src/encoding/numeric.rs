//! Numeric block: median imputation followed by standardization.

use serde::{Deserialize, Serialize};

/// Scales below this are treated as a constant column.
const MIN_SCALE: f64 = 1e-12;

/// Frozen imputation and scaling parameters for one numeric field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    /// Value substituted for missing entries
    pub median: f64,
    /// Mean of the imputed column
    pub mean: f64,
    /// Population standard deviation of the imputed column (1.0 if constant)
    pub scale: f64,
}

impl NumericStats {
    /// Fits the statistics. Mean and scale are computed after imputation,
    /// so they describe exactly the column the transform will see.
    pub fn fit(values: &[Option<f64>]) -> Self {
        let mut observed: Vec<f64> = values.iter().flatten().copied().collect();
        let median = median(&mut observed).unwrap_or(0.0);

        if values.is_empty() {
            return Self {
                median,
                mean: 0.0,
                scale: 1.0,
            };
        }

        let imputed: Vec<f64> = values.iter().map(|v| v.unwrap_or(median)).collect();
        let n = imputed.len() as f64;
        let mean = imputed.iter().sum::<f64>() / n;
        let variance = imputed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();

        Self {
            median,
            mean,
            scale: if std > MIN_SCALE { std } else { 1.0 },
        }
    }

    /// Imputes and standardizes one value.
    #[must_use]
    pub fn transform(&self, value: Option<f64>) -> f64 {
        (value.unwrap_or(self.median) - self.mean) / self.scale
    }
}

/// Median of the values, reordering the slice. `None` when empty.
fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&mut []), None);
    }

    #[test]
    fn test_fit_imputes_before_scaling() {
        let stats = NumericStats::fit(&[Some(1.0), None, Some(3.0)]);
        // median 2.0 fills the gap: column is [1, 2, 3]
        assert_eq!(stats.median, 2.0);
        assert!((stats.mean - 2.0).abs() < 1e-12);
        assert!((stats.scale - (2.0f64 / 3.0).sqrt()).abs() < 1e-12);

        assert_eq!(stats.transform(None), 0.0);
        assert!(stats.transform(Some(3.0)) > 0.0);
        assert!(stats.transform(Some(1.0)) < 0.0);
    }

    #[test]
    fn test_constant_column_has_unit_scale() {
        let stats = NumericStats::fit(&[Some(5.0), Some(5.0), None]);
        assert_eq!(stats.scale, 1.0);
        assert_eq!(stats.transform(Some(5.0)), 0.0);
        assert_eq!(stats.transform(Some(6.0)), 1.0);
    }

    #[test]
    fn test_all_missing_column() {
        let stats = NumericStats::fit(&[None, None]);
        assert_eq!(stats.median, 0.0);
        assert_eq!(stats.transform(None), 0.0);
    }
}
