//! Logistic fits of frequency series over their growth phases.
//!
//! Time is measured in elapsed days since the first point of the phase, so
//! weekly series fit at `t = 0, 7, 14, ...` and daily series at `t = 0, 1, 2, ...`.

use crate::frequency::FrequencySeries;
use crate::phase::GrowthPhase;

use chrono::{Days, NaiveDate};
use color_eyre::eyre::{Report, Result, WrapErr};
use log::debug;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fmt::Debug;
use vardyn_stats::{FitFailure, FitOptions, LogisticFit};

/// The logistic fit of one group, or the reason it failed.
#[derive(Clone, Debug, PartialEq)]
pub struct LogisticFitResult<K> {
    pub group: K,
    /// Date of `t = 0`.
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub outcome: Result<LogisticFit, FitFailure>,
}

impl<K> LogisticFitResult<K> {
    /// The fitted curve resampled daily over the phase, empty on failure.
    ///
    /// ```rust
    /// use chrono::NaiveDate;
    /// use vardyn::fit::LogisticFitResult;
    /// use vardyn_stats::{LogisticFit, LogisticModel};
    ///
    /// let start = NaiveDate::from_ymd_opt(2021, 5, 1).unwrap();
    /// let end = NaiveDate::from_ymd_opt(2021, 5, 15).unwrap();
    /// let model = LogisticModel { s: 0.1, f0: 0.5 };
    /// let outcome = Ok(LogisticFit { model, rss: 0.0, iterations: 1 });
    /// let result = LogisticFitResult { group: "delta", start, end, outcome };
    ///
    /// let curve = result.curve();
    /// assert_eq!(curve.len(), 15);
    /// assert_eq!(curve[0], (start, 0.5));
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn curve(&self) -> Vec<(NaiveDate, f64)> {
        let Ok(fit) = &self.outcome else {
            return Vec::new();
        };
        let days = (self.end - self.start).num_days().max(0) as u64;
        (0..=days)
            .filter_map(|t| {
                let date = self.start.checked_add_days(Days::new(t))?;
                Some((date, fit.model.predict(t as f64)))
            })
            .collect()
    }
}

/// Fit the logistic model to the points of a series inside its growth phase.
pub fn fit_phase<K>(
    series: &FrequencySeries,
    phase: &GrowthPhase<K>,
    options: &FitOptions,
) -> LogisticFitResult<K>
where
    K: Clone + Debug,
{
    let data: Vec<(f64, f64)> = series
        .window(&phase.start, &phase.end)
        .iter()
        .map(|p| ((p.date - phase.start).num_days() as f64, p.frequency))
        .collect();

    let outcome = vardyn_stats::logistic::fit(&data, options);
    match &outcome {
        Ok(fit) => debug!(
            "{:?}: s={:.4}, f0={:.4}, {} iterations",
            phase.group, fit.model.s, fit.model.f0, fit.iterations
        ),
        Err(failure) => debug!("{:?}: fit failed: {failure}", phase.group),
    }

    LogisticFitResult { group: phase.group.clone(), start: phase.start, end: phase.end, outcome }
}

/// Fit every group that has a growth phase, in parallel on `threads` threads.
///
/// Each fit only reads its own series, and the results are collected by
/// group, so the output does not depend on the thread count.
pub fn fit_all<K>(
    series: &BTreeMap<K, FrequencySeries>,
    phases: &[GrowthPhase<K>],
    options: &FitOptions,
    threads: usize,
) -> Result<BTreeMap<K, LogisticFitResult<K>>, Report>
where
    K: Clone + Debug + Ord + Send + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .wrap_err_with(|| format!("Failed to build a thread pool with {threads} threads."))?;

    let results = pool.install(|| {
        phases
            .par_iter()
            .filter_map(|phase| {
                let series = series.get(&phase.group)?;
                Some((phase.group.clone(), fit_phase(series, phase, options)))
            })
            .collect()
    });
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vardyn_stats::LogisticModel;

    fn date(day: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 4, 3).unwrap() + Days::new(day)
    }

    /// Weekly series of a logistic curve, 1000 sequences per week.
    fn weekly(model: &LogisticModel, weeks: u64) -> Result<FrequencySeries, Report> {
        let triples = (0..weeks)
            .map(|w| (date(7 * w), (1000.0 * model.predict(7.0 * w as f64)).round() as u64, 1000))
            .collect();
        FrequencySeries::new(triples)
    }

    #[test]
    fn weekly_fit_uses_elapsed_days() -> Result<(), Report> {
        let truth = LogisticModel { s: 0.1, f0: 0.01 };
        let series = weekly(&truth, 12)?;
        let phase = GrowthPhase { group: "delta", start: date(0), end: date(77) };
        let result = fit_phase(&series, &phase, &FitOptions::default());

        let fit = result.outcome.as_ref().map_err(|e| color_eyre::eyre::eyre!("{e}"))?;
        assert!((fit.model.s - truth.s).abs() < 0.005);
        assert_eq!(result.curve().len(), 78);
        Ok(())
    }

    #[test]
    fn failed_fit_has_no_curve() -> Result<(), Report> {
        let series = FrequencySeries::new(vec![(date(0), 10, 100)])?;
        let phase = GrowthPhase { group: "delta", start: date(0), end: date(0) };
        let result = fit_phase(&series, &phase, &FitOptions::default());
        assert_eq!(result.outcome, Err(FitFailure::TooFewTimePoints));
        assert!(result.curve().is_empty());
        Ok(())
    }

    #[test]
    fn parallel_matches_serial() -> Result<(), Report> {
        let groups = [("a", 0.05), ("b", 0.1), ("c", 0.15), ("d", 0.2)];
        let mut series = BTreeMap::new();
        let mut phases = Vec::new();
        for (group, s) in groups {
            series.insert(group, weekly(&LogisticModel { s, f0: 0.02 }, 10)?);
            phases.push(GrowthPhase { group, start: date(0), end: date(63) });
        }

        let serial = fit_all(&series, &phases, &FitOptions::default(), 1)?;
        let parallel = fit_all(&series, &phases, &FitOptions::default(), 4)?;
        assert_eq!(serial, parallel);
        assert_eq!(serial.keys().copied().collect::<Vec<_>>(), vec!["a", "b", "c", "d"]);
        Ok(())
    }
}
