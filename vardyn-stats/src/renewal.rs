//! Renewal-equation estimation of the time-varying reproduction number.
//!
//! Incidence `I_t` is modeled as Poisson with mean `R_t * Λ_t`, where the
//! total infectiousness `Λ_t = Σ_{k≥1} I_{t-k} w_k` weights past incidence by
//! the discretised serial interval `w`. With a gamma prior on `R` that is
//! constant over a window, the posterior is also gamma.

use crate::Gamma;
use color_eyre::eyre::{eyre, Report, Result};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

// ----------------------------------------------------------------------------
// Serial Interval
// ----------------------------------------------------------------------------

/// A parametric (offset gamma) serial interval distribution, in days.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct SerialInterval {
    pub mean: f64,
    pub sd: f64,
}

impl SerialInterval {
    /// Returns a new [`SerialInterval`]. The mean must exceed 1 day because the
    /// distribution is offset by one day.
    ///
    /// ```rust
    /// use vardyn_stats::SerialInterval;
    /// assert!(SerialInterval::new(4.7, 2.9).is_ok());
    /// assert!(SerialInterval::new(0.8, 2.9).is_err());
    /// ```
    pub fn new(mean: f64, sd: f64) -> Result<Self, Report> {
        if !(mean.is_finite() && mean > 1.0) {
            return Err(eyre!("Serial interval mean must be greater than 1: {mean}"));
        }
        if !(sd.is_finite() && sd > 0.0) {
            return Err(eyre!("Serial interval standard deviation must be positive: {sd}"));
        }
        Ok(SerialInterval { mean, sd })
    }

    /// Probability mass of day `k`.
    ///
    /// `1 + Gamma(mean - 1, sd)`, spread over integer days by linear
    /// interpolation. Day 0 always has zero mass.
    pub fn mass(&self, k: usize) -> f64 {
        let shape = ((self.mean - 1.0) / self.sd).powi(2);
        let scale = self.sd.powi(2) / (self.mean - 1.0);
        let cdf = |x: f64, shape: f64| crate::gamma::regularized_lower(shape, x / scale);

        let k = k as f64;
        let mass = k * cdf(k, shape) + (k - 2.0) * cdf(k - 2.0, shape)
            - 2.0 * (k - 1.0) * cdf(k - 1.0, shape)
            + shape
                * scale
                * (2.0 * cdf(k - 1.0, shape + 1.0)
                    - cdf(k - 2.0, shape + 1.0)
                    - cdf(k, shape + 1.0));
        mass.max(0.0)
    }

    /// Probability masses for days `0..n`.
    ///
    /// ```rust
    /// use vardyn_stats::SerialInterval;
    /// let si = SerialInterval::new(4.7, 2.9)?;
    /// let w = si.discretise(60);
    /// assert_eq!(w[0], 0.0);
    /// assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-6);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn discretise(&self, n: usize) -> Vec<f64> {
        (0..n).map(|k| self.mass(k)).collect()
    }
}

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Window and prior settings for [`estimate`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct RenewalConfig {
    /// Days per sliding window.
    pub window: usize,
    /// Shape of the gamma prior on R.
    pub prior_shape: f64,
    /// Scale of the gamma prior on R.
    pub prior_scale: f64,
    /// Width of the credible interval.
    pub credible: f64,
}

impl Default for RenewalConfig {
    fn default() -> Self {
        RenewalConfig { window: 7, prior_shape: 1.0, prior_scale: 5.0, credible: 0.95 }
    }
}

impl RenewalConfig {
    /// Minimum series length that produces at least one window. The first
    /// day has no infectiousness and cannot start a window.
    pub fn min_length(&self) -> usize {
        self.window + 1
    }

    /// Inclusive `(start, end)` day indices of each sliding window.
    ///
    /// ```rust
    /// use vardyn_stats::RenewalConfig;
    /// let config = RenewalConfig::default();
    /// assert_eq!(config.windows(9), vec![(1, 7), (2, 8)]);
    /// assert!(config.windows(7).is_empty());
    /// ```
    pub fn windows(&self, n: usize) -> Vec<(usize, usize)> {
        if self.window == 0 || n < self.min_length() {
            return Vec::new();
        }
        (1..=n - self.window).map(|start| (start, start + self.window - 1)).collect()
    }
}

// ----------------------------------------------------------------------------
// Estimation
// ----------------------------------------------------------------------------

/// Posterior summary of R over one window of day indices.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct Posterior {
    pub start: usize,
    pub end: usize,
    pub mean: f64,
    pub std: f64,
    pub median: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RenewalError {
    /// The series cannot hold a single window.
    TooShort { length: usize, required: usize },
}

impl Display for RenewalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RenewalError::TooShort { length, required } => write!(
                f,
                "Incidence series of {length} days is too short, at least {required} days are required."
            ),
        }
    }
}

impl std::error::Error for RenewalError {}

/// Total infectiousness `Λ_t` for every day of the series.
///
/// ```rust
/// use vardyn_stats::renewal::infectiousness;
/// let w = [0.0, 0.5, 0.5];
/// assert_eq!(infectiousness(&[10, 20, 30], &w), vec![0.0, 5.0, 15.0]);
/// ```
pub fn infectiousness(incidence: &[u64], w: &[f64]) -> Vec<f64> {
    (0..incidence.len())
        .map(|t| {
            (1..=t)
                .filter(|k| *k < w.len())
                .map(|k| incidence[t - k] as f64 * w[k])
                .sum()
        })
        .collect()
}

/// Estimate R for each sliding window of a contiguous daily incidence series.
///
/// ## Examples
///
/// ```rust
/// use vardyn_stats::{renewal, RenewalConfig, SerialInterval};
///
/// let incidence = vec![100; 30];
/// let si = SerialInterval::new(4.7, 2.9)?;
/// let estimates = renewal::estimate(&incidence, &si, &RenewalConfig::default())?;
/// assert_eq!(estimates.len(), 23);
/// // constant incidence, late windows sit near R = 1
/// assert!((estimates.last().unwrap().mean - 1.0).abs() < 0.05);
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn estimate(
    incidence: &[u64],
    serial_interval: &SerialInterval,
    config: &RenewalConfig,
) -> Result<Vec<Posterior>, RenewalError> {
    let windows = config.windows(incidence.len());
    if windows.is_empty() {
        return Err(RenewalError::TooShort {
            length: incidence.len(),
            required: config.min_length(),
        });
    }

    let w = serial_interval.discretise(incidence.len());
    let lambda = infectiousness(incidence, &w);
    let tail = (1.0 - config.credible) / 2.0;

    let posteriors = windows
        .into_iter()
        .map(|(start, end)| {
            let cases: f64 = incidence[start..=end].iter().map(|i| *i as f64).sum();
            let infectious: f64 = lambda[start..=end].iter().sum();
            let shape = config.prior_shape + cases;
            let scale = 1.0 / (1.0 / config.prior_scale + infectious);
            let gamma = Gamma { shape, scale };
            Posterior {
                start,
                end,
                mean: gamma.mean(),
                std: gamma.std(),
                median: gamma.quantile(0.5),
                lower: gamma.quantile(tail),
                upper: gamma.quantile(1.0 - tail),
            }
        })
        .collect();

    Ok(posteriors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discretised_mean_is_preserved() -> Result<(), Report> {
        let si = SerialInterval::new(4.7, 2.9)?;
        let w = si.discretise(100);
        let mean: f64 = w.iter().enumerate().map(|(k, p)| k as f64 * p).sum();
        assert!((mean - 4.7).abs() < 1e-4);
        Ok(())
    }

    #[test]
    fn exponential_growth() -> Result<(), Report> {
        let (r, mu, sd) = (0.05_f64, 4.7, 2.9);
        let incidence: Vec<u64> =
            (0..60).map(|t| (10_000.0 * (r * t as f64).exp()).round() as u64).collect();
        let si = SerialInterval::new(mu, sd)?;
        let estimates = estimate(&incidence, &si, &RenewalConfig::default())?;
        let last = estimates.last().unwrap();

        // exact renewal relationship for the discretised interval
        let w = si.discretise(60);
        let exact = 1.0 / w.iter().enumerate().map(|(k, p)| p * (-r * k as f64).exp()).sum::<f64>();
        assert!((last.mean - exact).abs() / exact < 0.01);

        // and the usual approximation R ≈ exp(r μ)
        let approx = (r * mu).exp();
        assert!((last.mean - approx).abs() / approx < 0.03);
        assert!(last.lower < last.mean && last.mean < last.upper);
        Ok(())
    }

    #[test]
    fn too_short() -> Result<(), Report> {
        let si = SerialInterval::new(4.7, 2.9)?;
        let result = estimate(&[1, 2, 3, 4, 5, 6, 7], &si, &RenewalConfig::default());
        assert_eq!(result, Err(RenewalError::TooShort { length: 7, required: 8 }));
        Ok(())
    }
}
