use crate::frequency::FrequencySeries;
use crate::phase::*;

use chrono::{Days, NaiveDate};
use color_eyre::eyre::{Report, Result};

/// A series with one point per day, frequencies given in percent.
fn series(percent: &[u64]) -> Result<FrequencySeries, Report> {
    let day0 = NaiveDate::from_ymd_opt(2021, 4, 1).unwrap();
    let triples = percent.iter().zip(0..).map(|(p, i)| (day0 + Days::new(i), *p, 100)).collect();
    FrequencySeries::new(triples)
}

fn day(i: u64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 4, 1).unwrap() + Days::new(i)
}

#[test]
fn fixation_phase() -> Result<(), Report> {
    let series = series(&[0, 0, 1, 5, 20, 50, 90, 99, 99])?;
    let phase = extract("delta", &series, &EndPolicy::Fixation { threshold: 0.98 })?;
    assert_eq!(phase, GrowthPhase { group: "delta", start: day(2), end: day(7) });
    Ok(())
}

#[test]
fn fixation_never_reached() -> Result<(), Report> {
    let series = series(&[0, 10, 20, 30, 40, 30])?;
    let phase = extract("delta", &series, &EndPolicy::default())?;
    assert_eq!((phase.start, phase.end), (day(1), day(5)));
    Ok(())
}

#[test]
fn max_frequency_phase() -> Result<(), Report> {
    let series = series(&[0, 10, 20, 60, 60, 40])?;
    let phase = extract("delta", &series, &EndPolicy::MaxFrequency)?;
    assert_eq!((phase.start, phase.end), (day(1), day(3)));
    Ok(())
}

#[test]
fn end_searched_from_start() -> Result<(), Report> {
    // an early spike above the threshold precedes the sustained run
    let series = series(&[99, 0, 0, 10, 20, 40, 50])?;
    let phase = extract("delta", &series, &EndPolicy::Fixation { threshold: 0.98 })?;
    assert_eq!((phase.start, phase.end), (day(3), day(6)));
    let phase = extract("delta", &series, &EndPolicy::MaxFrequency)?;
    assert_eq!((phase.start, phase.end), (day(3), day(6)));
    Ok(())
}

#[test]
fn spikes_are_not_growth() -> Result<(), Report> {
    let series = series(&[0, 5, 0, 7, 7, 0, 3])?;
    let result = extract("delta", &series, &EndPolicy::default());
    assert_eq!(result, Err(PhaseError::NoSustainedGrowth));
    assert_eq!(PhaseError::NoSustainedGrowth.to_string(), "no_sustained_growth");
    Ok(())
}

#[test]
fn empty_series() -> Result<(), Report> {
    let result = extract("delta", &FrequencySeries::default(), &EndPolicy::default());
    assert_eq!(result, Err(PhaseError::Empty));
    Ok(())
}
