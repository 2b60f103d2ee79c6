//! Stability Metrics over an ordered history of magnitudes.
//!
//! Five independent statistics, each a pure function that returns a
//! well-defined sentinel on degenerate input instead of failing:
//!
//! | metric                      | degenerate result |
//! |-----------------------------|-------------------|
//! | coefficient of variation    | `+inf`            |
//! | mean absolute deviation     | `+inf` (empty)    |
//! | trend stability (R²)        | `0.0`             |
//! | volatility                  | `1.0`             |
//! | outlier ratio               | `0.0`             |

use serde::Serialize;

use geowatch_core::config::HistoryConfig;

/// Values closer to zero than this are treated as zero.
pub(crate) const EPS: f64 = 1e-10;

/// Centre and steepness of the volatility squashing curve.
const VOLATILITY_CENTER: f64 = 0.3;
const VOLATILITY_STEEPNESS: f64 = 5.0;

// ── Basic statistics ──────────────────────────────────────────

/// Arithmetic mean; 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample (n − 1) standard deviation; 0.0 for fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss = values.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    (ss / (values.len() - 1) as f64).sqrt()
}

// ── The five metrics ──────────────────────────────────────────

/// Sample standard deviation over |mean|.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::INFINITY;
    }
    let m = mean(values);
    if m.abs() < EPS {
        return f64::INFINITY;
    }
    sample_std_dev(values) / m.abs()
}

/// Mean of |x − mean|.
pub fn mean_absolute_deviation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::INFINITY;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).abs()).sum::<f64>() / values.len() as f64
}

/// R² of an ordinary least-squares fit of value against index, in [0, 1].
///
/// A flat series is a perfect fit (1.0); fewer than three points give 0.0.
pub fn trend_stability(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 3 {
        return 0.0;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(values);

    let (num, den) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (i, &y)| {
            let dx = i as f64 - x_mean;
            (num + dx * (y - y_mean), den + dx * dx)
        });
    if den.abs() < EPS {
        return 0.0;
    }
    let slope = num / den;
    let intercept = y_mean - slope * x_mean;

    let (ss_res, ss_tot) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(res, tot), (i, &y)| {
            let predicted = slope * i as f64 + intercept;
            (res + (y - predicted).powi(2), tot + (y - y_mean).powi(2))
        });
    if ss_tot.abs() < EPS {
        return 1.0;
    }
    (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
}

/// Rolling normalised range, averaged and squashed into [0, 1].
///
/// Each window contributes `(max − min) / |mean|`; windows with a zero mean
/// are skipped. Higher means more volatile.
pub fn volatility_score(values: &[f64], window: usize) -> f64 {
    let window = window.max(1);
    if values.len() < window {
        return 1.0;
    }
    let ranges: Vec<f64> = values
        .windows(window)
        .filter_map(|w| {
            let m = mean(w);
            if m.abs() <= EPS {
                return None;
            }
            let hi = w.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let lo = w.iter().copied().fold(f64::INFINITY, f64::min);
            Some((hi - lo) / m.abs())
        })
        .collect();
    if ranges.is_empty() {
        return 1.0;
    }
    let avg = mean(&ranges);
    1.0 / (1.0 + (-VOLATILITY_STEEPNESS * (avg - VOLATILITY_CENTER)).exp())
}

/// Fraction of points further than `z_threshold` sample standard deviations
/// from the mean.
pub fn outlier_ratio(values: &[f64], z_threshold: f64) -> f64 {
    if values.len() < 3 {
        return 0.0;
    }
    let m = mean(values);
    let std = sample_std_dev(values);
    if std < EPS {
        return 0.0;
    }
    let outliers = values
        .iter()
        .filter(|v| (*v - m).abs() > z_threshold * std)
        .count();
    outliers as f64 / values.len() as f64
}

// ── Method selector ───────────────────────────────────────────

/// Selector over the five metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StabilityMetric {
    CoefficientOfVariation,
    MeanAbsoluteDeviation,
    TrendStability,
    Volatility,
    OutlierRatio,
}

impl StabilityMetric {
    pub const ALL: [StabilityMetric; 5] = [
        StabilityMetric::CoefficientOfVariation,
        StabilityMetric::MeanAbsoluteDeviation,
        StabilityMetric::TrendStability,
        StabilityMetric::Volatility,
        StabilityMetric::OutlierRatio,
    ];

    pub fn compute(self, values: &[f64], cfg: &HistoryConfig) -> f64 {
        match self {
            StabilityMetric::CoefficientOfVariation => coefficient_of_variation(values),
            StabilityMetric::MeanAbsoluteDeviation => mean_absolute_deviation(values),
            StabilityMetric::TrendStability => trend_stability(values),
            StabilityMetric::Volatility => volatility_score(values, cfg.volatility_window),
            StabilityMetric::OutlierRatio => outlier_ratio(values, cfg.outlier_z_threshold),
        }
    }
}

// ── Full record ───────────────────────────────────────────────

/// Every stability metric plus descriptive statistics of one history.
///
/// A `+inf` coefficient of variation serializes as JSON `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StabilityMetrics {
    pub coefficient_of_variation: f64,
    pub mean_absolute_deviation: f64,
    pub trend_stability: f64,
    pub volatility: f64,
    pub outlier_ratio: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub count: usize,
}

impl StabilityMetrics {
    pub fn compute(values: &[f64], cfg: &HistoryConfig) -> Self {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let (min, max) = if values.is_empty() { (0.0, 0.0) } else { (min, max) };
        Self {
            coefficient_of_variation: StabilityMetric::CoefficientOfVariation.compute(values, cfg),
            mean_absolute_deviation: StabilityMetric::MeanAbsoluteDeviation.compute(values, cfg),
            trend_stability: StabilityMetric::TrendStability.compute(values, cfg),
            volatility: StabilityMetric::Volatility.compute(values, cfg),
            outlier_ratio: StabilityMetric::OutlierRatio.compute(values, cfg),
            mean: mean(values),
            std_dev: sample_std_dev(values),
            min,
            max,
            range: max - min,
            count: values.len(),
        }
    }

    /// Qualitative label from CV, volatility and outlier ratio.
    pub fn label(&self) -> &'static str {
        let cv = self.coefficient_of_variation;
        let vol = self.volatility;
        let out = self.outlier_ratio;
        if cv < 0.1 && vol < 0.2 && out < 0.1 {
            "Highly stable"
        } else if cv < 0.2 && vol < 0.4 && out < 0.2 {
            "Stable"
        } else if cv < 0.3 && vol < 0.6 {
            "Moderately stable"
        } else if cv < 0.5 {
            "Somewhat unstable"
        } else {
            "Highly unstable"
        }
    }
}

/// Quick stability verdict from CV and volatility alone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StabilityAssessment {
    pub label: &'static str,
    pub coefficient_of_variation: f64,
    pub volatility: f64,
    pub count: usize,
}

/// Label a history without computing the full metric set.
pub fn assess_stability(values: &[f64], cfg: &HistoryConfig) -> StabilityAssessment {
    let cv = coefficient_of_variation(values);
    let vol = volatility_score(values, cfg.volatility_window);
    let label = if values.len() < 2 {
        "Insufficient data"
    } else if cv < 0.1 && vol < 0.2 {
        "Highly stable"
    } else if cv < 0.2 && vol < 0.4 {
        "Stable"
    } else if cv < 0.3 && vol < 0.6 {
        "Moderately stable"
    } else if cv < 0.5 {
        "Somewhat unstable"
    } else {
        "Highly unstable"
    };
    StabilityAssessment {
        label,
        coefficient_of_variation: cv,
        volatility: vol,
        count: values.len(),
    }
}
