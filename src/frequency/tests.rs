use crate::dataset::{Detection, LineageCount};
use crate::frequency::*;
use crate::variant::Variant;

use chrono::{NaiveDate, Weekday};
use color_eyre::eyre::{Report, Result};

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 6, day).unwrap()
}

fn lineage(day: u32, lineage: &str, count: u64) -> LineageCount {
    LineageCount { date: date(day), lineage: lineage.to_string(), count }
}

#[test]
fn frequencies_sum_to_one() -> Result<(), Report> {
    let rows = vec![
        lineage(5, "B.1.1.7", 7),
        lineage(5, "AY.4", 2),
        lineage(5, "B.1.617.2", 1),
        lineage(5, "B.1.1.70", 3),
        lineage(12, "AY.4", 11),
        lineage(12, "B.1.1.7", 1),
        lineage(19, "P.1", 1),
    ];
    let series = aggregate(&Observation::from_lineages(&rows))?;

    let keys: Vec<_> = series.keys().copied().collect();
    assert_eq!(keys, vec![Variant::Alpha, Variant::Gamma, Variant::Delta, Variant::Other]);
    for day in [5, 12, 19] {
        let sum: f64 = series.values().filter_map(|s| s.frequency_at(&date(day))).sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }
    // absent (date, variant) pairs are filled with zero
    assert_eq!(series[&Variant::Gamma].frequency_at(&date(5)), Some(0.0));
    assert_eq!(series[&Variant::Delta].points()[0].count, 3);
    assert_eq!(series[&Variant::Delta].points()[0].total, 13);
    Ok(())
}

#[test]
fn zero_total_dates_dropped() -> Result<(), Report> {
    let observations = vec![
        Observation { date: date(5), key: "delta", count: 0 },
        Observation { date: date(5), key: "alpha", count: 0 },
        Observation { date: date(12), key: "delta", count: 2 },
    ];
    let series = aggregate(&observations)?;
    assert_eq!(series["delta"].dates(), vec![date(12)]);
    assert_eq!(series["alpha"].dates(), vec![date(12)]);
    assert!(series.values().flat_map(|s| s.points()).all(|p| p.frequency.is_finite()));
    Ok(())
}

#[test]
fn regional_proportions() -> Result<(), Report> {
    let detection = |region: &str, day, detected| Detection { region: region.to_string(), date: date(day), detected };
    let detections = vec![
        detection("London", 1, true),
        detection("London", 1, false),
        detection("London", 1, false),
        detection("London", 1, true),
        detection("North West", 1, true),
        detection("North West", 2, false),
    ];
    let series = proportions(&detections)?;
    assert_eq!(series["London"].frequency_at(&date(1)), Some(0.5));
    assert_eq!(series["North West"].frequency_at(&date(1)), Some(1.0));
    assert_eq!(series["North West"].frequency_at(&date(2)), Some(0.0));
    assert_eq!(series["London"].frequency_at(&date(2)), None);
    Ok(())
}

#[test]
fn weekly_bins() -> Result<(), Report> {
    // 2021-06-05 and 2021-06-12 are Saturdays
    let observations: Vec<_> =
        (1..=12).map(|day| Observation { date: date(day), key: Variant::Delta, count: day as u64 }).collect();
    let binned = bin_weekly(&observations, Weekday::Sat)?;
    let expected = vec![
        Observation { date: date(5), key: Variant::Delta, count: 1 + 2 + 3 + 4 + 5 },
        Observation { date: date(12), key: Variant::Delta, count: 6 + 7 + 8 + 9 + 10 + 11 + 12 },
    ];
    assert_eq!(binned, expected);
    Ok(())
}

#[test]
fn series_rejects_bad_counts() -> Result<(), Report> {
    assert!(FrequencySeries::new(vec![(date(1), 5, 4)]).is_err());
    assert!(FrequencySeries::new(vec![(date(1), 1, 4), (date(1), 2, 4)]).is_err());
    assert!(FrequencySeries::new(vec![(date(1), 0, 0)])?.is_empty());
    Ok(())
}

#[test]
fn window_bounds() -> Result<(), Report> {
    let series = FrequencySeries::new((1..=10).map(|day| (date(day), 1, 2)).collect())?;
    let window = series.window(&date(3), &date(5));
    assert_eq!(window.iter().map(|p| p.date).collect::<Vec<_>>(), vec![date(3), date(4), date(5)]);
    assert!(series.window(&date(6), &date(5)).is_empty());
    Ok(())
}

#[test]
fn rows_ordered_by_group_then_date() -> Result<(), Report> {
    let observations = vec![
        Observation { date: date(12), key: "delta", count: 1 },
        Observation { date: date(5), key: "delta", count: 1 },
        Observation { date: date(5), key: "alpha", count: 1 },
    ];
    let rows = rows(&aggregate(&observations)?);
    let observed: Vec<_> = rows.iter().map(|r| (r.group.as_str(), r.date)).collect();
    let expected = vec![("alpha", date(5)), ("alpha", date(12)), ("delta", date(5)), ("delta", date(12))];
    assert_eq!(observed, expected);
    Ok(())
}
