//! Two-parameter logistic growth of a variant frequency.
//!
//! ```text
//! f(t) = f0 / (f0 + (1 - f0) * exp(-s * t))
//! ```
//!
//! `t` is elapsed time (days) since the first observation, `f0` the frequency
//! at `t = 0` and `s` the per-day selective advantage.

use itertools::Itertools;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

// ----------------------------------------------------------------------------
// Model
// ----------------------------------------------------------------------------

/// Parameters of the logistic growth curve.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct LogisticModel {
    /// Growth rate (selective advantage) per day.
    pub s: f64,
    /// Frequency at `t = 0`, in `(0, 1)`.
    pub f0: f64,
}

impl LogisticModel {
    /// Returns the frequency predicted at time `t`.
    ///
    /// ```rust
    /// use vardyn_stats::LogisticModel;
    /// let model = LogisticModel { s: 0.1, f0: 0.5 };
    /// assert_eq!(model.predict(0.0), 0.5);
    /// assert!(model.predict(200.0) > 0.999);
    /// ```
    pub fn predict(&self, t: f64) -> f64 {
        let e = (-self.s * t).exp();
        self.f0 / (self.f0 + (1.0 - self.f0) * e)
    }

    /// Partial derivatives of the prediction at `t`, as `(df/ds, df/df0)`.
    fn gradient(&self, t: f64) -> (f64, f64) {
        let e = (-self.s * t).exp();
        let d = self.f0 + (1.0 - self.f0) * e;
        let d2 = d * d;
        (self.f0 * (1.0 - self.f0) * t * e / d2, e / d2)
    }

    fn rss(&self, data: &[(f64, f64)]) -> f64 {
        data.iter().map(|(t, y)| (y - self.predict(*t)).powi(2)).sum()
    }
}

// ----------------------------------------------------------------------------
// Fit
// ----------------------------------------------------------------------------

/// Settings for the Levenberg-Marquardt optimizer.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct FitOptions {
    /// Maximum number of iterations before the fit is declared not converged.
    pub max_iter: usize,
    /// Starting value of the growth rate.
    pub initial_s: f64,
    /// Relative tolerance on both the parameter step and the cost reduction.
    pub tolerance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        FitOptions { max_iter: 200, initial_s: 0.1, tolerance: 1e-10 }
    }
}

/// A converged logistic fit.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct LogisticFit {
    pub model: LogisticModel,
    /// Residual sum of squares at the solution.
    pub rss: f64,
    /// Number of iterations used.
    pub iterations: usize,
}

/// Reasons a logistic fit produced no estimate.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum FitFailure {
    /// Fewer than 2 distinct time points.
    TooFewTimePoints,
    /// No nonzero frequency to start `f0` from.
    AllZero,
    /// Input times or frequencies are NaN or infinite.
    NonFinite,
    /// Iteration limit reached before convergence.
    NotConverged { iterations: usize },
}

impl Display for FitFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FitFailure::TooFewTimePoints => "too_few_time_points",
            FitFailure::AllZero => "all_zero",
            FitFailure::NonFinite => "non_finite",
            FitFailure::NotConverged { .. } => "not_converged",
        };
        write!(f, "{label}")
    }
}

impl std::error::Error for FitFailure {}

/// Fit the logistic model to `(t, frequency)` pairs.
///
/// The starting point is fixed: `s = options.initial_s` and `f0` is the
/// smallest nonzero observed frequency. Steps that would move `f0` outside
/// `(0, 1)` are rejected.
///
/// ## Examples
///
/// ```rust
/// use vardyn_stats::logistic::{fit, FitFailure, FitOptions, LogisticModel};
///
/// let truth = LogisticModel { s: 0.08, f0: 0.01 };
/// let data: Vec<_> = (0..10).map(|w| (7.0 * w as f64, truth.predict(7.0 * w as f64))).collect();
/// let result = fit(&data, &FitOptions::default())?;
/// assert!((result.model.s - 0.08).abs() < 1e-6);
///
/// // all zero frequencies have no starting point
/// let zeros = [(0.0, 0.0), (7.0, 0.0)];
/// assert_eq!(fit(&zeros, &FitOptions::default()), Err(FitFailure::AllZero));
/// # Ok::<(), FitFailure>(())
/// ```
pub fn fit(data: &[(f64, f64)], options: &FitOptions) -> Result<LogisticFit, FitFailure> {
    if data.iter().any(|(t, y)| !t.is_finite() || !y.is_finite()) {
        return Err(FitFailure::NonFinite);
    }

    let distinct = data.iter().map(|(t, _y)| t.to_bits()).unique().count();
    if distinct < 2 {
        return Err(FitFailure::TooFewTimePoints);
    }

    let f0 = data
        .iter()
        .map(|(_t, y)| *y)
        .filter(|y| *y > 0.0)
        .min_by(|a, b| a.total_cmp(b))
        .ok_or(FitFailure::AllZero)?
        .min(1.0 - 1e-9);

    let mut model = LogisticModel { s: options.initial_s, f0 };
    let mut cost = model.rss(data);
    let mut lambda = 1e-3;
    let tol = options.tolerance;

    for iteration in 1..=options.max_iter {
        if cost < 1e-24 {
            return Ok(LogisticFit { model, rss: cost, iterations: iteration - 1 });
        }

        // normal equations: (JᵀJ + λ diag(JᵀJ)) δ = Jᵀr
        let (mut a11, mut a12, mut a22, mut g1, mut g2) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for (t, y) in data {
            let (js, jf) = model.gradient(*t);
            let r = y - model.predict(*t);
            a11 += js * js;
            a12 += js * jf;
            a22 += jf * jf;
            g1 += js * r;
            g2 += jf * r;
        }

        let d11 = a11 + lambda * a11.max(1e-12);
        let d22 = a22 + lambda * a22.max(1e-12);
        let det = d11 * d22 - a12 * a12;
        if !det.is_finite() || det <= 0.0 {
            lambda *= 10.0;
            continue;
        }
        let ds = (d22 * g1 - a12 * g2) / det;
        let df0 = (d11 * g2 - a12 * g1) / det;

        let step_small = ds.abs() <= tol * (model.s.abs() + tol)
            && df0.abs() <= tol * (model.f0.abs() + tol);

        let candidate = LogisticModel { s: model.s + ds, f0: model.f0 + df0 };
        let in_domain = candidate.s.is_finite() && candidate.f0 > 0.0 && candidate.f0 < 1.0;
        let candidate_cost = if in_domain { candidate.rss(data) } else { f64::INFINITY };

        if candidate_cost.is_finite() && candidate_cost < cost {
            let reduction = (cost - candidate_cost) / cost;
            model = candidate;
            cost = candidate_cost;
            lambda = (lambda / 10.0).max(1e-12);
            if step_small || reduction < tol {
                return Ok(LogisticFit { model, rss: cost, iterations: iteration });
            }
        } else if step_small {
            // no downhill step left at this resolution
            return Ok(LogisticFit { model, rss: cost, iterations: iteration });
        } else {
            lambda *= 10.0;
        }
    }

    Err(FitFailure::NotConverged { iterations: options.max_iter })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn synthetic(model: &LogisticModel, days: usize) -> Vec<(f64, f64)> {
        (0..days).map(|t| (t as f64, model.predict(t as f64))).collect()
    }

    #[test]
    fn recovers_noiseless_parameters() -> Result<(), FitFailure> {
        let truth = LogisticModel { s: 0.15, f0: 0.05 };
        let result = fit(&synthetic(&truth, 60), &FitOptions::default())?;
        assert!(((result.model.s - truth.s) / truth.s).abs() < 0.01);
        assert!(((result.model.f0 - truth.f0) / truth.f0).abs() < 0.01);
        Ok(())
    }

    #[test]
    fn recovers_noisy_parameters() -> Result<(), FitFailure> {
        let truth = LogisticModel { s: 0.12, f0: 0.02 };
        let mut rng = StdRng::seed_from_u64(2021);
        let data: Vec<_> = synthetic(&truth, 70)
            .into_iter()
            .map(|(t, y)| (t, (y + rng.gen_range(-0.01..0.01)).clamp(0.0, 1.0)))
            .collect();
        let options = FitOptions { max_iter: 1_000, ..Default::default() };
        let result = fit(&data, &options)?;
        assert!(((result.model.s - truth.s) / truth.s).abs() < 0.1);
        Ok(())
    }

    #[test]
    fn deterministic() -> Result<(), FitFailure> {
        let truth = LogisticModel { s: 0.2, f0: 0.001 };
        let data = synthetic(&truth, 40);
        let first = fit(&data, &FitOptions::default())?;
        let second = fit(&data, &FitOptions::default())?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn single_time_point() {
        let data = [(3.0, 0.1), (3.0, 0.2)];
        assert_eq!(fit(&data, &FitOptions::default()), Err(FitFailure::TooFewTimePoints));
    }

    #[test]
    fn iteration_limit() {
        let truth = LogisticModel { s: 0.15, f0: 0.05 };
        let options = FitOptions { max_iter: 1, ..Default::default() };
        assert_eq!(
            fit(&synthetic(&truth, 60), &options),
            Err(FitFailure::NotConverged { iterations: 1 })
        );
    }

    #[test]
    fn non_finite_input() {
        let data = [(0.0, 0.1), (1.0, f64::NAN)];
        assert_eq!(fit(&data, &FitOptions::default()), Err(FitFailure::NonFinite));
    }
}
