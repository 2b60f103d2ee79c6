//! Magnitude Scaler: squashes an unbounded weighted magnitude into [0, 1].
//!
//! Each [`ScalingMethod`] dispatches to a pure curve function parameterised
//! by the domain's [`ScalingParams`]. Every curve returns a finite value in
//! the closed unit interval for every input, NaN included.

use std::f64::consts::PI;

use serde::Serialize;

use geowatch_rules::scaling_config::{MinMaxRange, ScalingParams, SigmoidParams};
use geowatch_rules::{DomainWeightStore, ScalingMethod};

/// Exponent magnitude past which the logistic curve is treated as saturated.
const SIGMOID_SATURATION: f64 = 700.0;

/// Padding added on each side of an adaptive batch range, as a fraction of
/// the batch spread.
const ADAPTIVE_PADDING: f64 = 0.1;

/// Logistic curve `1 / (1 + e^{-k(x - x0)})`.
pub fn sigmoid(x: f64, p: &SigmoidParams) -> f64 {
    let z = -p.steepness * (x - p.midpoint);
    if z > SIGMOID_SATURATION {
        return 0.0;
    }
    if z < -SIGMOID_SATURATION {
        return 1.0;
    }
    (1.0 / (1.0 + z.exp())).clamp(0.0, 1.0)
}

/// Linear map of `[low, high]` onto `[0, 1]`; 0.5 for a degenerate range.
pub fn min_max(x: f64, range: &MinMaxRange) -> f64 {
    if range.high <= range.low {
        return 0.5;
    }
    ((x - range.low) / (range.high - range.low)).clamp(0.0, 1.0)
}

/// `(tanh(s·x) + 1) / 2`.
pub fn tanh(x: f64, scale: f64) -> f64 {
    (((scale * x).tanh() + 1.0) / 2.0).clamp(0.0, 1.0)
}

/// `atan(s·x) / π + 0.5`.
pub fn arctan(x: f64, scale: f64) -> f64 {
    ((scale * x).atan() / PI + 0.5).clamp(0.0, 1.0)
}

/// `ln(1 + s·x) / ln(1 + s)`; 0 for non-positive input.
pub fn log(x: f64, scale: f64) -> f64 {
    if x <= 0.0 || scale <= 0.0 {
        return 0.0;
    }
    ((scale * x).ln_1p() / scale.ln_1p()).clamp(0.0, 1.0)
}

/// Apply `method` with the given parameters.
pub fn apply(method: ScalingMethod, x: f64, params: &ScalingParams) -> f64 {
    if x.is_nan() {
        return 0.0;
    }
    match method {
        ScalingMethod::Sigmoid => sigmoid(x, &params.sigmoid),
        ScalingMethod::MinMax => min_max(x, &params.min_max),
        ScalingMethod::Tanh => tanh(x, params.tanh_scale),
        ScalingMethod::Arctan => arctan(x, params.arctan_scale),
        ScalingMethod::Log => log(x, params.log_scale),
        ScalingMethod::None => x.clamp(0.0, 1.0),
    }
}

/// Best-effort inverse of [`apply`].
///
/// Sigmoid and min-max are inverted analytically; the other curves fall back
/// to a linear stretch over the domain's min-max ceiling.
pub fn inverse(method: ScalingMethod, y: f64, params: &ScalingParams) -> f64 {
    match method {
        ScalingMethod::None => y,
        ScalingMethod::Sigmoid => {
            let SigmoidParams { steepness, midpoint } = params.sigmoid;
            if y <= 0.0 {
                0.0
            } else if y >= 1.0 {
                midpoint * 2.0
            } else {
                (midpoint - (1.0 / y - 1.0).ln() / steepness).max(0.0)
            }
        }
        ScalingMethod::MinMax => {
            let MinMaxRange { low, high } = params.min_max;
            low + y * (high - low)
        }
        _ => y * params.min_max.high,
    }
}

/// Range spanning a batch with 10% padding, floored at zero.
///
/// `None` for an empty batch.
pub fn adaptive_range(values: &[f64]) -> Option<MinMaxRange> {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let (lo, hi) = finite.fold(None, |acc: Option<(f64, f64)>, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })?;
    let padding = (hi - lo) * ADAPTIVE_PADDING;
    Some(MinMaxRange {
        low: (lo - padding).max(0.0),
        high: hi + padding,
    })
}

/// Human-readable description of a curve.
pub fn describe(method: ScalingMethod) -> &'static str {
    match method {
        ScalingMethod::Sigmoid => "Sigmoid (S-curve) scaling for smooth transitions",
        ScalingMethod::MinMax => "Linear scaling within expected range",
        ScalingMethod::Tanh => "Hyperbolic tangent scaling for symmetric distribution",
        ScalingMethod::Arctan => "Arctangent scaling for gradual saturation",
        ScalingMethod::Log => "Logarithmic scaling for exponential values",
        ScalingMethod::None => "No scaling applied (clamp to 0-1)",
    }
}

/// Method, domain and parameters in effect for one scaling call.
#[derive(Debug, Clone, Serialize)]
pub struct ScalingInfo {
    pub method: ScalingMethod,
    pub domain: String,
    pub parameters: ScalingParams,
    pub description: &'static str,
}

/// Scaled value of one method, as returned by [`MagnitudeScaler::compare_methods`].
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MethodComparison {
    pub method: ScalingMethod,
    pub scaled: f64,
}

/// Domain-aware front end over the curve functions.
#[derive(Debug, Clone, Copy)]
pub struct MagnitudeScaler<'a> {
    store: &'a DomainWeightStore,
}

impl<'a> MagnitudeScaler<'a> {
    pub fn new(store: &'a DomainWeightStore) -> Self {
        Self { store }
    }

    /// Scale with an explicit method.
    pub fn scale(&self, value: f64, domain: &str, method: ScalingMethod) -> f64 {
        apply(method, value, &self.store.profile(domain).scaling)
    }

    /// Scale with the domain's configured scaling policy.
    pub fn scale_for_domain(&self, value: f64, domain: &str) -> f64 {
        let profile = self.store.profile(domain);
        apply(profile.scaling_method, value, &profile.scaling)
    }

    /// Scale a batch.
    ///
    /// With `adaptive` and the min-max method, the range is recomputed from
    /// the batch itself rather than taken from the domain configuration.
    pub fn batch_scale(
        &self,
        values: &[f64],
        domain: &str,
        method: ScalingMethod,
        adaptive: bool,
    ) -> Vec<f64> {
        let mut params = self.store.profile(domain).scaling.clone();
        if adaptive && method == ScalingMethod::MinMax {
            match adaptive_range(values) {
                Some(range) => params.min_max = range,
                None => return Vec::new(),
            }
        }
        values.iter().map(|&v| apply(method, v, &params)).collect()
    }

    pub fn inverse(&self, scaled: f64, domain: &str, method: ScalingMethod) -> f64 {
        inverse(method, scaled, &self.store.profile(domain).scaling)
    }

    /// Scaled value under every method except `none`.
    pub fn compare_methods(&self, value: f64, domain: &str) -> Vec<MethodComparison> {
        let params = &self.store.profile(domain).scaling;
        ScalingMethod::ALL
            .into_iter()
            .filter(|m| *m != ScalingMethod::None)
            .map(|method| MethodComparison {
                method,
                scaled: apply(method, value, params),
            })
            .collect()
    }

    pub fn scaling_info(&self, domain: &str, method: ScalingMethod) -> ScalingInfo {
        let profile = self.store.profile(domain);
        ScalingInfo {
            method,
            domain: profile.key.clone(),
            parameters: profile.scaling.clone(),
            description: describe(method),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::store;

    fn defaults() -> ScalingParams {
        ScalingParams::default()
    }

    #[test]
    fn sigmoid_midpoint_is_half() {
        let p = SigmoidParams {
            steepness: 8.0,
            midpoint: 0.15,
        };
        assert!((sigmoid(0.15, &p) - 0.5).abs() < 1e-12);
        assert!(sigmoid(0.3, &p) > 0.5);
        assert!(sigmoid(0.0, &p) < 0.5);
    }

    #[test]
    fn sigmoid_saturates_instead_of_overflowing() {
        let p = SigmoidParams {
            steepness: 1e6,
            midpoint: 0.1,
        };
        assert_eq!(sigmoid(1.0, &p), 1.0);
        assert_eq!(sigmoid(-1.0, &p), 0.0);
    }

    #[test]
    fn min_max_clamps_and_handles_degenerate_range() {
        let r = MinMaxRange { low: 0.0, high: 0.2 };
        assert_eq!(min_max(0.1, &r), 0.5);
        assert_eq!(min_max(0.5, &r), 1.0);
        assert_eq!(min_max(-0.1, &r), 0.0);
        let flat = MinMaxRange { low: 0.2, high: 0.2 };
        assert_eq!(min_max(0.7, &flat), 0.5);
    }

    #[test]
    fn tanh_and_arctan_centre_on_half() {
        assert_eq!(tanh(0.0, 5.0), 0.5);
        assert_eq!(arctan(0.0, 10.0), 0.5);
        assert!(tanh(0.1, 5.0) > 0.5);
        assert!(arctan(-0.1, 10.0) < 0.5);
    }

    #[test]
    fn log_is_zero_for_non_positive() {
        assert_eq!(log(0.0, 1.0), 0.0);
        assert_eq!(log(-3.0, 1.0), 0.0);
        assert!((log(1.0, 1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn none_is_identity_clamp() {
        let p = defaults();
        assert_eq!(apply(ScalingMethod::None, 0.3, &p), 0.3);
        assert_eq!(apply(ScalingMethod::None, 1.7, &p), 1.0);
        assert_eq!(apply(ScalingMethod::None, -0.2, &p), 0.0);
    }

    #[test]
    fn nan_input_scales_to_zero() {
        for m in ScalingMethod::ALL {
            assert_eq!(apply(m, f64::NAN, &defaults()), 0.0, "{}", m);
        }
    }

    #[test]
    fn inverse_sigmoid_and_min_max() {
        let p = defaults();
        let y = apply(ScalingMethod::Sigmoid, 0.13, &p);
        assert!((inverse(ScalingMethod::Sigmoid, y, &p) - 0.13).abs() < 1e-9);
        let y = apply(ScalingMethod::MinMax, 0.05, &p);
        assert!((inverse(ScalingMethod::MinMax, y, &p) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn inverse_edges() {
        let p = defaults();
        assert_eq!(inverse(ScalingMethod::Sigmoid, 0.0, &p), 0.0);
        assert_eq!(inverse(ScalingMethod::Sigmoid, 1.0, &p), 0.2);
        assert_eq!(inverse(ScalingMethod::None, 0.42, &p), 0.42);
        assert!((inverse(ScalingMethod::Tanh, 0.5, &p) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn adaptive_range_pads_and_floors() {
        let r = adaptive_range(&[0.08, 0.12, 0.18, 0.22, 0.35]).unwrap();
        assert!((r.low - 0.053).abs() < 1e-12);
        assert!((r.high - 0.377).abs() < 1e-12);
        let r = adaptive_range(&[0.0, 0.5]).unwrap();
        assert_eq!(r.low, 0.0);
        assert!(adaptive_range(&[]).is_none());
    }

    #[test]
    fn adaptive_batch_spans_unit_interval() {
        let store = store();
        let scaler = MagnitudeScaler::new(&store);
        let values = [0.08, 0.12, 0.18, 0.22, 0.35];
        let fixed = scaler.batch_scale(&values, "energy", ScalingMethod::MinMax, false);
        let adaptive = scaler.batch_scale(&values, "energy", ScalingMethod::MinMax, true);
        // Energy's static range tops out at 0.28.
        assert_eq!(fixed[4], 1.0);
        assert!(adaptive[4] < 1.0);
        assert!(adaptive[0] > 0.0);
        assert!(adaptive.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn adaptive_flag_ignored_for_other_methods() {
        let store = store();
        let scaler = MagnitudeScaler::new(&store);
        let values = [0.05, 0.1, 0.2];
        assert_eq!(
            scaler.batch_scale(&values, "port", ScalingMethod::Sigmoid, true),
            scaler.batch_scale(&values, "port", ScalingMethod::Sigmoid, false)
        );
    }

    #[test]
    fn domain_parameters_are_used() {
        let store = store();
        let scaler = MagnitudeScaler::new(&store);
        // Port sigmoid midpoint is 0.15; default midpoint is 0.1.
        assert!((scaler.scale(0.15, "port", ScalingMethod::Sigmoid) - 0.5).abs() < 1e-12);
        assert!((scaler.scale(0.1, "default", ScalingMethod::Sigmoid) - 0.5).abs() < 1e-12);
        // Unknown domains use the default parameters.
        assert_eq!(
            scaler.scale(0.1, "harbour", ScalingMethod::Sigmoid),
            scaler.scale(0.1, "default", ScalingMethod::Sigmoid)
        );
    }

    #[test]
    fn policy_scaling_uses_configured_method() {
        let store = store();
        let scaler = MagnitudeScaler::new(&store);
        assert_eq!(
            scaler.scale_for_domain(0.12, "farm"),
            scaler.scale(0.12, "farm", ScalingMethod::MinMax)
        );
        assert_eq!(
            scaler.scale_for_domain(0.12, "default"),
            scaler.scale(0.12, "default", ScalingMethod::Tanh)
        );
    }

    #[test]
    fn compare_methods_skips_none() {
        let store = store();
        let scaler = MagnitudeScaler::new(&store);
        let cmp = scaler.compare_methods(0.15, "mine");
        assert_eq!(cmp.len(), 5);
        assert!(cmp.iter().all(|c| c.method != ScalingMethod::None));
        assert!(cmp.iter().all(|c| (0.0..=1.0).contains(&c.scaled)));
    }

    #[test]
    fn scaling_info_reports_resolved_domain() {
        let store = store();
        let scaler = MagnitudeScaler::new(&store);
        let info = scaler.scaling_info("harbour", ScalingMethod::Arctan);
        assert_eq!(info.domain, "default");
        assert_eq!(info.description, "Arctangent scaling for gradual saturation");
        assert_eq!(info.parameters.arctan_scale, 10.0);
    }
}
