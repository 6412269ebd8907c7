//! Daily incidence of the focal variant, from national cases and weekly
//! variant frequencies.

use crate::dataset::CaseCount;
use crate::frequency::FrequencySeries;

use chrono::NaiveDate;
#[cfg(feature = "cli")]
use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize};

/// Which case count column to scale.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
#[cfg_attr(feature = "cli", derive(ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum CaseColumn {
    /// Cases by specimen date.
    #[default]
    Daily,
    /// Precomputed 7-day average, days without a finite non-negative one
    /// are skipped.
    RollingAverage,
}

/// Estimated focal variant cases on one day.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct IncidenceEstimate {
    pub date: NaiveDate,
    /// Case count from the chosen [`CaseColumn`].
    pub cases: f64,
    /// Weekly date whose frequency was carried forward to `date`.
    pub matched_week: NaiveDate,
    pub frequency: f64,
    /// `cases * frequency`, rounded half away from zero.
    pub estimated_cases: u64,
}

/// Scale daily cases by the focal variant frequency of the most recent week.
///
/// Each day takes the frequency of the latest weekly date on or before it,
/// never a later one. Days before the first weekly date are dropped.
///
/// ## Examples
///
/// ```rust
/// use chrono::NaiveDate;
/// use vardyn::dataset::CaseCount;
/// use vardyn::frequency::FrequencySeries;
/// use vardyn::incidence::{estimate, CaseColumn};
///
/// let date = |d| NaiveDate::from_ymd_opt(2021, 1, d).unwrap();
/// let weekly = FrequencySeries::new(vec![(date(1), 1, 10), (date(8), 3, 10)])?;
/// let cases: Vec<_> = [5, 10]
///     .into_iter()
///     .map(|d| CaseCount { date: date(d), cases: 100, cases_avg: None })
///     .collect();
///
/// let estimates = estimate(&cases, &weekly, CaseColumn::Daily);
/// assert_eq!(estimates[0].estimated_cases, 10);
/// assert_eq!(estimates[1].estimated_cases, 30);
/// assert_eq!(estimates[1].matched_week, date(8));
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn estimate(cases: &[CaseCount], weekly: &FrequencySeries, column: CaseColumn) -> Vec<IncidenceEstimate> {
    let points = weekly.points();
    let (mut before, mut missing, mut invalid) = (0, 0, 0);

    let mut estimates: Vec<_> = cases
        .iter()
        .filter_map(|row| {
            let count = match column {
                CaseColumn::Daily => row.cases as f64,
                CaseColumn::RollingAverage => match row.cases_avg {
                    Some(avg) if avg.is_finite() && avg >= 0.0 => avg,
                    Some(_) => {
                        invalid += 1;
                        return None;
                    }
                    None => {
                        missing += 1;
                        return None;
                    }
                },
            };
            // last weekly point on or before this day
            let i = points.partition_point(|p| p.date <= row.date);
            if i == 0 {
                before += 1;
                return None;
            }
            let week = &points[i - 1];
            Some(IncidenceEstimate {
                date: row.date,
                cases: count,
                matched_week: week.date,
                frequency: week.frequency,
                estimated_cases: (count * week.frequency).round() as u64,
            })
        })
        .collect();
    estimates.sort_by_key(|e| e.date);

    if before > 0 {
        debug!("Excluded {before} case dates before the first weekly frequency.");
    }
    if missing > 0 {
        debug!("Skipped {missing} case dates without a rolling average.");
    }
    if invalid > 0 {
        debug!("Skipped {invalid} case dates with a negative or non-finite rolling average.");
    }
    estimates
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre::{Report, Result};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, day).unwrap()
    }

    fn cases(days: &[u32], count: u64) -> Vec<CaseCount> {
        days.iter().map(|d| CaseCount { date: date(*d), cases: count, cases_avg: Some(count as f64 / 2.0) }).collect()
    }

    #[test]
    fn carried_forward_never_backward() -> Result<(), Report> {
        let weekly = FrequencySeries::new(vec![(date(1), 1, 10), (date(8), 3, 10)])?;
        let estimates = estimate(&cases(&[1, 5, 7, 8, 10, 20], 100), &weekly, CaseColumn::Daily);
        let observed: Vec<_> = estimates.iter().map(|e| (e.date, e.matched_week, e.estimated_cases)).collect();
        let expected = vec![
            (date(1), date(1), 10),
            (date(5), date(1), 10),
            (date(7), date(1), 10),
            (date(8), date(8), 30),
            (date(10), date(8), 30),
            (date(20), date(8), 30),
        ];
        assert_eq!(observed, expected);
        Ok(())
    }

    #[test]
    fn dates_before_first_week_excluded() -> Result<(), Report> {
        let weekly = FrequencySeries::new(vec![(date(8), 1, 2)])?;
        let estimates = estimate(&cases(&[3, 7, 9], 100), &weekly, CaseColumn::Daily);
        assert_eq!(estimates.len(), 1);
        assert_eq!(estimates[0].date, date(9));
        Ok(())
    }

    #[test]
    fn ties_round_away_from_zero() -> Result<(), Report> {
        let weekly = FrequencySeries::new(vec![(date(1), 1, 2)])?;
        let estimates = estimate(&cases(&[2], 5), &weekly, CaseColumn::Daily);
        assert_eq!(estimates[0].estimated_cases, 3);
        Ok(())
    }

    #[test]
    fn rolling_average_column() -> Result<(), Report> {
        let weekly = FrequencySeries::new(vec![(date(1), 1, 4)])?;
        let mut input = cases(&[2, 3], 100);
        input[0].cases_avg = None;
        let estimates = estimate(&input, &weekly, CaseColumn::RollingAverage);
        assert_eq!(estimates.len(), 1);
        assert_eq!(estimates[0].cases, 50.0);
        assert_eq!(estimates[0].estimated_cases, 13);
        Ok(())
    }

    #[test]
    fn invalid_rolling_average_skipped() -> Result<(), Report> {
        let weekly = FrequencySeries::new(vec![(date(1), 1, 4)])?;
        let mut input = cases(&[2, 3, 4, 5], 100);
        input[0].cases_avg = Some(-8.0);
        input[1].cases_avg = Some(f64::NAN);
        input[2].cases_avg = Some(f64::INFINITY);
        let estimates = estimate(&input, &weekly, CaseColumn::RollingAverage);
        let dates: Vec<_> = estimates.iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![date(5)]);
        assert_eq!(estimates[0].estimated_cases, 13);
        Ok(())
    }
}
