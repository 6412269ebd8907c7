//! Time-varying reproduction number of dated incidence series.

use chrono::{Days, NaiveDate};
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use vardyn_stats::{renewal, RenewalConfig, RenewalError, SerialInterval};

/// Posterior summary of R over one window of dates.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RtEstimate {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub mean_r: f64,
    pub std_r: f64,
    pub median_r: f64,
    pub lower_ci: f64,
    pub upper_ci: f64,
}

/// Reasons a dated incidence series cannot be used for Rt estimation.
#[derive(Clone, Debug, PartialEq)]
pub enum RtError {
    /// No days inside the requested range.
    Empty,
    /// The same date appears more than once.
    Duplicate { date: NaiveDate },
    /// A date is missing between its neighbours.
    Gap { date: NaiveDate },
    /// Fewer days than one window requires.
    TooShort { length: usize, required: usize },
}

impl Display for RtError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RtError::Empty => write!(f, "No incidence data in the requested date range."),
            RtError::Duplicate { date } => write!(f, "Duplicate incidence date: {date}"),
            RtError::Gap { date } => write!(f, "Missing incidence date: {date}"),
            RtError::TooShort { length, required } => {
                write!(f, "Incidence series of {length} days is too short, at least {required} days are required.")
            }
        }
    }
}

impl std::error::Error for RtError {}

impl From<RenewalError> for RtError {
    fn from(error: RenewalError) -> Self {
        match error {
            RenewalError::TooShort { length, required } => RtError::TooShort { length, required },
        }
    }
}

/// Check that a series has exactly one value per consecutive day.
///
/// The series is sorted by date first, so the reported problem is the
/// earliest one.
///
/// ```rust
/// use chrono::NaiveDate;
/// use vardyn::rt::{contiguous, RtError};
///
/// let date = |d| NaiveDate::from_ymd_opt(2021, 1, d).unwrap();
/// let series = vec![(date(2), 3), (date(1), 1), (date(4), 5)];
/// assert_eq!(contiguous(&series), Err(RtError::Gap { date: date(3) }));
/// ```
pub fn contiguous(series: &[(NaiveDate, u64)]) -> Result<Vec<(NaiveDate, u64)>, RtError> {
    let mut sorted = series.to_vec();
    sorted.sort_by_key(|(date, _)| *date);
    for pair in sorted.windows(2) {
        let (previous, next) = (pair[0].0, pair[1].0);
        if next == previous {
            return Err(RtError::Duplicate { date: next });
        }
        let expected = previous.checked_add_days(Days::new(1)).unwrap_or(previous);
        if next != expected {
            return Err(RtError::Gap { date: expected });
        }
    }
    Ok(sorted)
}

/// Estimate Rt over sliding windows of a daily incidence series, restricted
/// to `[start, end]` (both optional and inclusive).
///
/// ## Examples
///
/// ```rust
/// use chrono::{Days, NaiveDate};
/// use vardyn::rt::estimate;
/// use vardyn_stats::{RenewalConfig, SerialInterval};
///
/// let day0 = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
/// let series: Vec<_> = (0..30).map(|d| (day0 + Days::new(d), 200)).collect();
/// let si = SerialInterval::new(4.7, 2.9)?;
/// let estimates = estimate(&series, None, None, &si, &RenewalConfig::default())?;
///
/// assert_eq!(estimates.len(), 23);
/// assert_eq!(estimates[0].window_start, day0 + Days::new(1));
/// assert_eq!(estimates[0].window_end, day0 + Days::new(7));
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn estimate(
    series: &[(NaiveDate, u64)],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    serial_interval: &SerialInterval,
    config: &RenewalConfig,
) -> Result<Vec<RtEstimate>, RtError> {
    let series: Vec<_> = series
        .iter()
        .filter(|(date, _)| start.map_or(true, |start| *date >= start))
        .filter(|(date, _)| end.map_or(true, |end| *date <= end))
        .copied()
        .collect();
    if series.is_empty() {
        return Err(RtError::Empty);
    }

    let series = contiguous(&series)?;
    let incidence: Vec<u64> = series.iter().map(|(_, count)| *count).collect();
    info!("Estimating Rt from {} to {}.", series[0].0, series[series.len() - 1].0);

    let estimates = renewal::estimate(&incidence, serial_interval, config)?
        .into_iter()
        .map(|p| RtEstimate {
            window_start: series[p.start].0,
            window_end: series[p.end].0,
            mean_r: p.mean,
            std_r: p.std,
            median_r: p.median,
            lower_ci: p.lower,
            upper_ci: p.upper,
        })
        .collect();
    Ok(estimates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre::{Report, Result};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, day).unwrap()
    }

    fn si() -> Result<SerialInterval, Report> {
        SerialInterval::new(4.7, 2.9)
    }

    #[test]
    fn missing_date_fails() -> Result<(), Report> {
        let series: Vec<_> = (1..=10).filter(|d| *d != 5).map(|d| (date(d), 10)).collect();
        let result = estimate(&series, None, None, &si()?, &RenewalConfig::default());
        assert_eq!(result, Err(RtError::Gap { date: date(5) }));
        assert!(RtError::Gap { date: date(5) }.to_string().contains("2021-01-05"));
        Ok(())
    }

    #[test]
    fn duplicate_date_fails() -> Result<(), Report> {
        let mut series: Vec<_> = (1..=10).map(|d| (date(d), 10)).collect();
        series.push((date(4), 12));
        let result = estimate(&series, None, None, &si()?, &RenewalConfig::default());
        assert_eq!(result, Err(RtError::Duplicate { date: date(4) }));
        Ok(())
    }

    #[test]
    fn range_is_inclusive() -> Result<(), Report> {
        let series: Vec<_> = (1..=31).map(|d| (date(d), 50)).collect();
        let estimates = estimate(&series, Some(date(3)), Some(date(12)), &si()?, &RenewalConfig::default())?;
        // 10 days hold windows starting on the 2nd to 4th day
        assert_eq!(estimates.len(), 3);
        assert_eq!(estimates[0].window_start, date(4));
        assert_eq!(estimates[2].window_end, date(12));

        // a gap outside the range is ignored
        let gapped: Vec<_> = series.iter().filter(|(d, _)| *d != date(20)).copied().collect();
        assert!(estimate(&gapped, None, Some(date(19)), &si()?, &RenewalConfig::default()).is_ok());
        Ok(())
    }

    #[test]
    fn short_and_empty() -> Result<(), Report> {
        let series: Vec<_> = (1..=7).map(|d| (date(d), 50)).collect();
        let result = estimate(&series, None, None, &si()?, &RenewalConfig::default());
        assert_eq!(result, Err(RtError::TooShort { length: 7, required: 8 }));
        let result = estimate(&series, Some(date(20)), None, &si()?, &RenewalConfig::default());
        assert_eq!(result, Err(RtError::Empty));
        Ok(())
    }

    #[test]
    fn exponential_growth() -> Result<(), Report> {
        let (r, mu) = (0.04_f64, 4.7);
        let series: Vec<_> =
            (1..=31).map(|d| (date(d), (5000.0 * (r * d as f64).exp()).round() as u64)).collect();
        let estimates = estimate(&series, None, None, &si()?, &RenewalConfig::default())?;
        let last = estimates.last().unwrap();
        let expected = (r * mu).exp();
        assert!(((last.mean_r - expected) / expected).abs() < 0.03);
        assert!(last.lower_ci < last.median_r && last.median_r < last.upper_ci);
        Ok(())
    }
}
