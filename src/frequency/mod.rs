//! Aggregation of counted observations into per-date frequencies.

use crate::dataset::{Detection, LineageCount};
use crate::variant::{classify, Variant};

use chrono::{Datelike, Days, NaiveDate, Weekday};
use color_eyre::eyre::{eyre, ContextCompat, Report, Result};
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

#[cfg(test)]
mod tests;

// ----------------------------------------------------------------------------
// Observation
// ----------------------------------------------------------------------------

/// A count of one group (variant or region) on one date.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation<K> {
    pub date: NaiveDate,
    pub key: K,
    pub count: u64,
}

impl Observation<Variant> {
    /// Classify lineage counts into variant observations.
    pub fn from_lineages(rows: &[LineageCount]) -> Vec<Self> {
        rows.iter()
            .map(|row| Observation { date: row.date, key: classify(&row.lineage), count: row.count })
            .collect()
    }
}

// ----------------------------------------------------------------------------
// Frequency Series
// ----------------------------------------------------------------------------

/// The count of one group at one date, out of all counts at that date.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct FrequencyPoint {
    pub date: NaiveDate,
    pub count: u64,
    pub total: u64,
    /// `count / total`, where `total > 0`.
    pub frequency: f64,
}

/// Date-ordered [`FrequencyPoint`]s of one group, at most one per date.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrequencySeries {
    points: Vec<FrequencyPoint>,
}

impl FrequencySeries {
    /// Build a series from `(date, count, total)` triples.
    ///
    /// Triples with a zero total are dropped, the others are sorted by date.
    /// Repeated dates and counts above their total are errors.
    ///
    /// ```rust
    /// use chrono::NaiveDate;
    /// use vardyn::frequency::FrequencySeries;
    ///
    /// let d1 = NaiveDate::from_ymd_opt(2021, 5, 8).unwrap();
    /// let d2 = NaiveDate::from_ymd_opt(2021, 5, 1).unwrap();
    /// let series = FrequencySeries::new(vec![(d1, 3, 4), (d2, 1, 4)])?;
    /// assert_eq!(series.dates(), vec![d2, d1]);
    /// assert_eq!(series.frequency_at(&d1), Some(0.75));
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn new(counts: Vec<(NaiveDate, u64, u64)>) -> Result<Self, Report> {
        let points: Vec<_> = counts
            .into_iter()
            .filter(|(_date, _count, total)| *total > 0)
            .sorted_by_key(|(date, _count, _total)| *date)
            .map(|(date, count, total)| {
                if count > total {
                    return Err(eyre!("Count {count} exceeds total {total} on {date}"));
                }
                Ok(FrequencyPoint { date, count, total, frequency: count as f64 / total as f64 })
            })
            .collect::<Result<_, Report>>()?;

        if let Some((a, _b)) = points.iter().tuple_windows().find(|(a, b)| a.date == b.date) {
            return Err(eyre!("Duplicate date in frequency series: {}", a.date));
        }
        Ok(FrequencySeries { points })
    }

    pub fn points(&self) -> &[FrequencyPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// Frequency at an exact date, if the series has one.
    pub fn frequency_at(&self, date: &NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(date, |p| p.date)
            .ok()
            .map(|i| self.points[i].frequency)
    }

    /// Points within `[start, end]`, inclusive.
    pub fn window(&self, start: &NaiveDate, end: &NaiveDate) -> &[FrequencyPoint] {
        let from = self.points.partition_point(|p| p.date < *start);
        let to = self.points.partition_point(|p| p.date <= *end);
        &self.points[from..to.max(from)]
    }
}

// ----------------------------------------------------------------------------
// Aggregation
// ----------------------------------------------------------------------------

/// Sum observations per (date, key) and divide by the per-date total.
///
/// Every key gets a point at every date with a nonzero total, filling absent
/// pairs with 0. Dates whose total is 0 are dropped.
///
/// ## Examples
///
/// ```rust
/// use chrono::NaiveDate;
/// use vardyn::frequency::{aggregate, Observation};
///
/// let date = NaiveDate::from_ymd_opt(2021, 6, 5).unwrap();
/// let observations = vec![
///     Observation { date, key: "delta", count: 3 },
///     Observation { date, key: "alpha", count: 1 },
///     Observation { date, key: "delta", count: 4 },
/// ];
/// let series = aggregate(&observations)?;
/// assert_eq!(series["delta"].frequency_at(&date), Some(0.875));
/// assert_eq!(series["alpha"].frequency_at(&date), Some(0.125));
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn aggregate<K>(observations: &[Observation<K>]) -> Result<BTreeMap<K, FrequencySeries>, Report>
where
    K: Clone + Ord,
{
    let mut counts: BTreeMap<(NaiveDate, K), u64> = BTreeMap::new();
    let mut totals: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for o in observations {
        *counts.entry((o.date, o.key.clone())).or_default() += o.count;
        *totals.entry(o.date).or_default() += o.count;
    }

    let keys: BTreeSet<K> = observations.iter().map(|o| o.key.clone()).collect();
    let dropped = totals.values().filter(|total| **total == 0).count();
    if dropped > 0 {
        debug!("Dropped {dropped} dates with no observations.");
    }

    keys.into_iter()
        .map(|key| {
            let triples = totals
                .iter()
                .filter(|(_date, total)| **total > 0)
                .map(|(date, total)| {
                    let count = counts.get(&(*date, key.clone())).copied().unwrap_or(0);
                    (*date, count, *total)
                })
                .collect();
            Ok((key, FrequencySeries::new(triples)?))
        })
        .collect()
}

/// Proportion of samples with a detection, per region and date.
///
/// Each region has its own denominator, so proportions across regions do not
/// sum to one.
pub fn proportions(detections: &[Detection]) -> Result<BTreeMap<String, FrequencySeries>, Report> {
    let mut counts: BTreeMap<&str, BTreeMap<NaiveDate, (u64, u64)>> = BTreeMap::new();
    for d in detections {
        let (count, total) = counts.entry(d.region.as_str()).or_default().entry(d.date).or_default();
        *count += d.detected as u64;
        *total += 1;
    }

    counts
        .into_iter()
        .map(|(region, dates)| {
            let triples = dates.into_iter().map(|(date, (count, total))| (date, count, total));
            Ok((region.to_string(), FrequencySeries::new(triples.collect())?))
        })
        .collect()
}

/// Returns the first date on or after `date` that falls on `anchor`.
///
/// ```rust
/// use chrono::{NaiveDate, Weekday};
/// use vardyn::frequency::week_ending;
///
/// let wednesday = NaiveDate::from_ymd_opt(2021, 6, 2).unwrap();
/// let saturday = NaiveDate::from_ymd_opt(2021, 6, 5).unwrap();
/// assert_eq!(week_ending(&wednesday, Weekday::Sat)?, saturday);
/// assert_eq!(week_ending(&saturday, Weekday::Sat)?, saturday);
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn week_ending(date: &NaiveDate, anchor: Weekday) -> Result<NaiveDate, Report> {
    let from = date.weekday().num_days_from_monday();
    let to = anchor.num_days_from_monday();
    let days = (to + 7 - from) % 7;
    date.checked_add_days(Days::new(days as u64))
        .wrap_err_with(|| format!("Date overflow: {date} + {days} days"))
}

/// Bin daily observations into weeks ending on the `anchor` weekday, summing
/// counts per (week, key).
pub fn bin_weekly<K>(observations: &[Observation<K>], anchor: Weekday) -> Result<Vec<Observation<K>>, Report>
where
    K: Clone + Ord,
{
    let mut weeks: BTreeMap<(NaiveDate, K), u64> = BTreeMap::new();
    for o in observations {
        let week = week_ending(&o.date, anchor)?;
        *weeks.entry((week, o.key.clone())).or_default() += o.count;
    }
    let binned = weeks
        .into_iter()
        .map(|((date, key), count)| Observation { date, key, count })
        .collect();
    Ok(binned)
}

// ----------------------------------------------------------------------------
// Output Rows
// ----------------------------------------------------------------------------

/// One point of one group, as written to the frequency tables.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FrequencyRow {
    pub group: String,
    pub date: NaiveDate,
    pub count: u64,
    pub total: u64,
    pub frequency: f64,
}

/// Flatten series into rows, ordered by group then date.
pub fn rows<K>(series: &BTreeMap<K, FrequencySeries>) -> Vec<FrequencyRow>
where
    K: Display,
{
    series
        .iter()
        .flat_map(|(key, series)| {
            series.points().iter().map(move |p| FrequencyRow {
                group: key.to_string(),
                date: p.date,
                count: p.count,
                total: p.total,
                frequency: p.frequency,
            })
        })
        .collect()
}

/// The frequency of one group at one date in two sources.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Comparison {
    pub group: String,
    pub date: NaiveDate,
    /// Frequency in the first source, empty if it has no point here.
    pub frequency_a: Option<f64>,
    /// Frequency in the second source, empty if it has no point here.
    pub frequency_b: Option<f64>,
}

/// Join two sources on (group, date), keeping points present in only one.
///
/// ```rust
/// use chrono::NaiveDate;
/// use std::collections::BTreeMap;
/// use vardyn::frequency::{compare, FrequencySeries};
///
/// let d1 = NaiveDate::from_ymd_opt(2021, 6, 5).unwrap();
/// let d2 = NaiveDate::from_ymd_opt(2021, 6, 12).unwrap();
/// let a = BTreeMap::from([("delta", FrequencySeries::new(vec![(d1, 1, 2)])?)]);
/// let b = BTreeMap::from([("delta", FrequencySeries::new(vec![(d1, 1, 4), (d2, 3, 4)])?)]);
///
/// let joined = compare(&a, &b);
/// assert_eq!(joined.len(), 2);
/// assert_eq!((joined[0].frequency_a, joined[0].frequency_b), (Some(0.5), Some(0.25)));
/// assert_eq!((joined[1].frequency_a, joined[1].frequency_b), (None, Some(0.75)));
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn compare<K>(a: &BTreeMap<K, FrequencySeries>, b: &BTreeMap<K, FrequencySeries>) -> Vec<Comparison>
where
    K: Display + Ord,
{
    let mut joined: BTreeMap<(&K, NaiveDate), (Option<f64>, Option<f64>)> = BTreeMap::new();
    for (key, series) in a {
        for p in series.points() {
            joined.entry((key, p.date)).or_default().0 = Some(p.frequency);
        }
    }
    for (key, series) in b {
        for p in series.points() {
            joined.entry((key, p.date)).or_default().1 = Some(p.frequency);
        }
    }

    joined
        .into_iter()
        .map(|((key, date), (frequency_a, frequency_b))| Comparison {
            group: key.to_string(),
            date,
            frequency_a,
            frequency_b,
        })
        .collect()
}
