//! Create the synthetic dataset Toy1.
//!
//! Delta (B.1.617.2 and AY.4) replaces Alpha (B.1.1.7) with a known selective
//! advantage of [`GROWTH_RATE`] per day, starting from [`INITIAL_FREQUENCY`] on
//! [`START`]. A constant 1% of sequences are an unrelated lineage. National
//! cases grow at [`CASE_GROWTH_RATE`] per day, so Rt is near
//! `exp(CASE_GROWTH_RATE * serial interval mean)`.
//!
//! Every table is deterministic, the same call always writes the same bytes.

use crate::dataset::{CaseCount, Detection, LineageCount, RemoteFile, Source};
use crate::utils;
use chrono::{Days, NaiveDate, Utc};
use color_eyre::eyre::{eyre, ContextCompat, Report, Result};
use std::fmt::Debug;
use std::path::Path;
use vardyn_stats::LogisticModel;

/// Selective advantage of Delta over Alpha, per day.
pub const GROWTH_RATE: f64 = 0.1;
/// Delta frequency on [`START`].
pub const INITIAL_FREQUENCY: f64 = 0.005;
/// Daily growth rate of national cases.
pub const CASE_GROWTH_RATE: f64 = 0.03;
/// First week-ending date (a Saturday).
pub const START: &str = "2021-03-06";
/// Number of weekly observations.
pub const WEEKS: u64 = 16;
/// Regions of the per-sample detections, with their delay (days) behind [`START`].
pub const REGIONS: &[(&str, u64)] = &[("London", 0), ("North West", 10)];

const WEEKLY_TOTAL: f64 = 1000.0;
const DAILY_TOTAL: f64 = 150.0;
const OTHER_SHARE: f64 = 0.01;
const SAMPLES_PER_DAY: u64 = 4;

fn start() -> Result<NaiveDate, Report> {
    Ok(NaiveDate::parse_from_str(START, "%Y-%m-%d")?)
}

fn offset(date: NaiveDate, days: u64) -> Result<NaiveDate, Report> {
    date.checked_add_days(Days::new(days)).wrap_err_with(|| eyre!("Date overflow: {date} + {days}"))
}

/// Expected Delta frequency `t` days after [`START`].
///
/// ```rust
/// use vardyn::dataset::toy1;
/// assert!((toy1::delta_frequency(0.0) - toy1::INITIAL_FREQUENCY).abs() < 1e-12);
/// assert!(toy1::delta_frequency(100.0) > 0.99);
/// ```
pub fn delta_frequency(t: f64) -> f64 {
    LogisticModel { s: GROWTH_RATE, f0: INITIAL_FREQUENCY }.predict(t)
}

/// Split a total count into Alpha, Delta (two lineages) and other rows.
fn lineage_counts(date: NaiveDate, total: f64, t: f64) -> Vec<LineageCount> {
    let other = (total * OTHER_SHARE).round();
    let delta = ((total - other) * delta_frequency(t)).round();
    let alpha = total - other - delta;
    let ay = (delta * 0.4).floor();
    [("B.1.1.7", alpha), ("B.1.617.2", delta - ay), ("AY.4", ay), ("B.1.1.70", other)]
        .into_iter()
        .map(|(lineage, count)| LineageCount {
            date,
            lineage: lineage.to_string(),
            count: count as u64,
        })
        .collect()
}

/// Write the weekly lineage counts, one row per (week, lineage).
///
/// ```rust
/// use vardyn::dataset::toy1;
/// let dir = tempfile::tempdir()?;
/// let file = toy1::weekly_lineages(&dir.path())?;
/// assert!(dir.path().join(file.local).exists());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn weekly_lineages<P>(output_dir: &P) -> Result<RemoteFile, Report>
where
    P: AsRef<Path> + Debug,
{
    let start = start()?;
    let rows = (0..WEEKS)
        .map(|week| {
            let date = offset(start, week * 7)?;
            Ok(lineage_counts(date, WEEKLY_TOTAL, (week * 7) as f64))
        })
        .collect::<Result<Vec<_>, Report>>()?
        .concat();
    write(Source::WeeklyLineages, &rows, output_dir)
}

/// Write the daily sequence counts, starting five days before [`START`] and
/// ending on the last weekly date.
pub fn daily_sequences<P>(output_dir: &P) -> Result<RemoteFile, Report>
where
    P: AsRef<Path> + Debug,
{
    let first = start()? - Days::new(5);
    let days = 5 + (WEEKS - 1) * 7 + 1;
    let rows = (0..days)
        .map(|day| {
            let date = offset(first, day)?;
            Ok(lineage_counts(date, DAILY_TOTAL, day as f64 - 5.0))
        })
        .collect::<Result<Vec<_>, Report>>()?
        .concat();
    write(Source::DailySequences, &rows, output_dir)
}

/// Write the per-sample detections, [`SAMPLES_PER_DAY`] samples per region
/// and day, the first `round(n * frequency)` of which are positive.
pub fn regional_detections<P>(output_dir: &P) -> Result<RemoteFile, Report>
where
    P: AsRef<Path> + Debug,
{
    let start = start()?;
    let days = (WEEKS - 1) * 7 + 1;
    let mut rows = Vec::new();
    for (region, delay) in REGIONS {
        for day in 0..days {
            let date = offset(start, day)?;
            let t = day as f64 - *delay as f64;
            let positive = (SAMPLES_PER_DAY as f64 * delta_frequency(t)).round() as u64;
            rows.extend((0..SAMPLES_PER_DAY).map(|sample| Detection {
                region: region.to_string(),
                date,
                detected: sample < positive,
            }));
        }
    }
    write(Source::RegionalDetections, &rows, output_dir)
}

/// Write the national daily case counts, with the trailing 7-day average
/// once a full week is available.
pub fn cases<P>(output_dir: &P) -> Result<RemoteFile, Report>
where
    P: AsRef<Path> + Debug,
{
    let first = start()? - Days::new(5);
    let days = 5 + (WEEKS - 1) * 7 + 1;
    let counts: Vec<u64> =
        (0..days).map(|day| (2000.0 * (CASE_GROWTH_RATE * day as f64).exp()).round() as u64).collect();

    let rows = counts
        .iter()
        .enumerate()
        .map(|(day, cases)| {
            let cases_avg = (day >= 6).then(|| {
                let week = &counts[day - 6..=day];
                week.iter().sum::<u64>() as f64 / 7.0
            });
            Ok(CaseCount { date: offset(first, day as u64)?, cases: *cases, cases_avg })
        })
        .collect::<Result<Vec<_>, Report>>()?;
    write(Source::Cases, &rows, output_dir)
}

/// Create the table of one source.
pub fn create<P>(source: &Source, output_dir: &P) -> Result<RemoteFile, Report>
where
    P: AsRef<Path> + Debug,
{
    match source {
        Source::WeeklyLineages => weekly_lineages(output_dir),
        Source::DailySequences => daily_sequences(output_dir),
        Source::RegionalDetections => regional_detections(output_dir),
        Source::Cases => cases(output_dir),
    }
}

fn write<T, P>(source: Source, rows: &[T], output_dir: &P) -> Result<RemoteFile, Report>
where
    T: serde::Serialize,
    P: AsRef<Path> + Debug,
{
    let mut file = RemoteFile::new(&source, None);
    let path = output_dir.as_ref().join(&file.local);
    utils::write_table(rows, &path)?;
    file.date_created = Some(Utc::now());
    Ok(file)
}
