//! Typed rows of the input sources.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Sequence count of one lineage on one date (or week-ending date).
///
/// Reads both the plain `date,lineage,count` layout and the weekly
/// `WeekEndDate,LTLA,Lineage,Count` layout; repeated (date, lineage) rows
/// are summed later during aggregation.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct LineageCount {
    #[serde(alias = "WeekEndDate", alias = "week_end_date")]
    pub date: NaiveDate,
    #[serde(alias = "Lineage")]
    pub lineage: String,
    #[serde(alias = "Count", alias = "n")]
    pub count: u64,
}

/// A single sequenced sample, and whether the focal variant was detected.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Detection {
    #[serde(alias = "Region", alias = "phec_name")]
    pub region: String,
    #[serde(alias = "Date", alias = "sample_date")]
    pub date: NaiveDate,
    #[serde(deserialize_with = "deserialize_flag")]
    pub detected: bool,
}

/// Daily national case count.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CaseCount {
    pub date: NaiveDate,
    #[serde(alias = "newCasesBySpecimenDate")]
    pub cases: u64,
    /// Precomputed 7-day average, when the source provides it.
    #[serde(default, alias = "newCasesBySpecimenDateRollingAverage")]
    pub cases_avg: Option<f64>,
}

/// Parse the boolean spellings found in exported tables (`TRUE`, `1`, `yes`).
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    match value.trim().to_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Ok(true),
        "false" | "f" | "0" | "no" | "n" => Ok(false),
        _ => Err(serde::de::Error::custom(format!("Invalid boolean value: {value:?}"))),
    }
}
