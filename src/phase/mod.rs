//! Extraction of the [GrowthPhase] of a frequency series.

use crate::frequency::{FrequencyPoint, FrequencySeries};

use chrono::NaiveDate;
#[cfg(feature = "cli")]
use clap::ValueEnum;
use color_eyre::eyre::{eyre, Report, Result};
use color_eyre::Help;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[cfg(test)]
mod tests;

/// Number of consecutive nonzero observations that start a growth phase.
pub const MIN_RUN: usize = 3;

// ----------------------------------------------------------------------------
// End Policy
// ----------------------------------------------------------------------------

/// How the end of a growth phase is chosen, searching from its start.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub enum EndPolicy {
    /// First date of the maximum frequency.
    MaxFrequency,
    /// First date with frequency at or above the threshold, or the last date
    /// if none reaches it.
    Fixation { threshold: f64 },
}

impl Default for EndPolicy {
    fn default() -> Self {
        EndPolicy::Fixation { threshold: 0.98 }
    }
}

/// The command-line choice of [`EndPolicy`], without its parameters.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
#[cfg_attr(feature = "cli", derive(ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum EndRule {
    #[default]
    Fixation,
    MaxFrequency,
}

impl EndPolicy {
    /// Returns the policy for a rule, checking the threshold is in `(0, 1]`.
    ///
    /// ```rust
    /// use vardyn::phase::{EndPolicy, EndRule};
    /// assert_eq!(EndPolicy::new(EndRule::Fixation, 0.98)?, EndPolicy::default());
    /// assert_eq!(EndPolicy::new(EndRule::MaxFrequency, 0.0)?, EndPolicy::MaxFrequency);
    /// assert!(EndPolicy::new(EndRule::Fixation, 1.5).is_err());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn new(rule: EndRule, threshold: f64) -> Result<Self, Report> {
        match rule {
            EndRule::MaxFrequency => Ok(EndPolicy::MaxFrequency),
            EndRule::Fixation if threshold > 0.0 && threshold <= 1.0 => {
                Ok(EndPolicy::Fixation { threshold })
            }
            EndRule::Fixation => Err(eyre!("Invalid fixation threshold: {threshold}"))
                .suggestion("The threshold must be greater than 0 and at most 1."),
        }
    }

    /// Index of the end point within `points`, which must not be empty.
    fn end(&self, points: &[FrequencyPoint]) -> usize {
        match self {
            EndPolicy::MaxFrequency => {
                let mut best = 0;
                for (i, p) in points.iter().enumerate() {
                    if p.frequency > points[best].frequency {
                        best = i;
                    }
                }
                best
            }
            EndPolicy::Fixation { threshold } => points
                .iter()
                .position(|p| p.frequency >= *threshold)
                .unwrap_or(points.len().saturating_sub(1)),
        }
    }
}

// ----------------------------------------------------------------------------
// Growth Phase
// ----------------------------------------------------------------------------

/// The window in which a group's frequency is growing.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GrowthPhase<K> {
    pub group: K,
    pub start: NaiveDate,
    /// Never before `start`.
    pub end: NaiveDate,
}

/// Reasons a series has no growth phase.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub enum PhaseError {
    /// The series has no points.
    Empty,
    /// No run of [`MIN_RUN`] consecutive nonzero observations.
    NoSustainedGrowth,
}

impl Display for PhaseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PhaseError::Empty => "empty",
            PhaseError::NoSustainedGrowth => "no_sustained_growth",
        };
        write!(f, "{label}")
    }
}

impl std::error::Error for PhaseError {}

/// Find the growth phase of a group's frequency series.
///
/// The phase starts at the first of [`MIN_RUN`] consecutive nonzero
/// observations, so a single nonzero spike never starts it. The end is
/// chosen by the [`EndPolicy`] among the points from the start onwards.
///
/// ## Examples
///
/// ```rust
/// use chrono::{Days, NaiveDate};
/// use vardyn::frequency::FrequencySeries;
/// use vardyn::phase::{extract, EndPolicy};
///
/// let day0 = NaiveDate::from_ymd_opt(2021, 4, 1).unwrap();
/// let day = |i| day0 + Days::new(i);
/// let counts: [u64; 9] = [0, 0, 1, 5, 20, 50, 90, 99, 99];
/// let series = FrequencySeries::new(counts.iter().zip(0..).map(|(c, i)| (day(i), *c, 100)).collect())?;
///
/// let phase = extract("delta", &series, &EndPolicy::default())?;
/// assert_eq!((phase.start, phase.end), (day(2), day(7)));
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn extract<K>(group: K, series: &FrequencySeries, policy: &EndPolicy) -> Result<GrowthPhase<K>, PhaseError> {
    let points = series.points();
    if points.is_empty() {
        return Err(PhaseError::Empty);
    }

    let start = points
        .windows(MIN_RUN)
        .position(|run| run.iter().all(|p| p.count > 0))
        .ok_or(PhaseError::NoSustainedGrowth)?;

    let end = start + policy.end(&points[start..]);
    Ok(GrowthPhase { group, start: points[start].date, end: points[end].date })
}
