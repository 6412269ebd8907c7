//! Classification of Pango lineages into major [Variant]s.

use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumProperty, EnumString, IntoEnumIterator};

/// A major SARS-CoV-2 variant, or [`Variant::Other`].
///
/// Parsed case-insensitively, displayed in lowercase.
///
/// ```rust
/// use std::str::FromStr;
/// use vardyn::Variant;
///
/// assert_eq!(Variant::from_str("Delta")?, Variant::Delta);
/// assert_eq!(Variant::Delta.to_string(), "delta");
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    EnumIter,
    EnumProperty,
    EnumString,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Variant {
    #[strum(props(lineages = "B.1.1.7 Q"))]
    Alpha,
    #[strum(props(lineages = "B.1.351"))]
    Beta,
    #[strum(props(lineages = "P.1"))]
    Gamma,
    #[strum(props(lineages = "B.1.617.2 AY"))]
    Delta,
    #[strum(props(lineages = "B.1.617.1"))]
    Kappa,
    #[strum(props(lineages = "B.1.1.529 BA"))]
    Omicron,
    #[default]
    Other,
}

impl Variant {
    /// Lineages (and their descendants) that define this variant.
    pub fn lineages(&self) -> Vec<&'static str> {
        self.get_str("lineages").map(|l| l.split(' ').collect()).unwrap_or_default()
    }
}

/// Returns true if `lineage` is `ancestor` or one of its descendants.
///
/// Descendants extend the label by a `.`, so `B.1.1.70` does not descend from `B.1.1.7`.
///
/// ```rust
/// use vardyn::variant::descends_from;
/// assert!(descends_from("AY.4.2", "AY"));
/// assert!(descends_from("B.1.1.7", "B.1.1.7"));
/// assert!(!descends_from("B.1.1.70", "B.1.1.7"));
/// assert!(!descends_from("BA", "B"));
/// ```
pub fn descends_from(lineage: &str, ancestor: &str) -> bool {
    match lineage.strip_prefix(ancestor) {
        Some(rest) => rest.is_empty() || rest.starts_with('.'),
        None => false,
    }
}

/// Classify a Pango lineage label into a [`Variant`].
///
/// Labels are trimmed and compared case-insensitively. Anything unmatched,
/// including `None`, `Unassigned` and empty labels, is [`Variant::Other`].
///
/// ```rust
/// use vardyn::{variant::classify, Variant};
/// assert_eq!(classify("AY.4"), Variant::Delta);
/// assert_eq!(classify("q.1"), Variant::Alpha);
/// assert_eq!(classify("Unassigned"), Variant::Other);
/// ```
pub fn classify(lineage: &str) -> Variant {
    let lineage = lineage.trim().to_uppercase();
    Variant::iter()
        .find(|variant| variant.lineages().iter().any(|a| descends_from(&lineage, a)))
        .unwrap_or_default()
}
