//! Metadata to identify a dataset ([Name]) and its input files ([Source]), and
//! to faciliate reproducibility ([Sources] snapshot).

use chrono::{DateTime, Utc};
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use log::warn;
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::default::Default;
use std::fmt::{Debug, Display, Formatter};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use strum::{EnumIter, EnumProperty, IntoEnumIterator};

// ----------------------------------------------------------------------------
// Dataset Name
// ----------------------------------------------------------------------------

/// The name of a dataset.
///
/// Either the surveillance data for England, or simulated data for testing (toy1).
#[derive(Clone, Copy, Debug, Default, Deserialize, EnumIter, PartialEq, Serialize)]
pub enum Name {
    /// Genomic surveillance and case data for England.
    #[default]
    #[serde(rename = "england")]
    England,
    /// Synthetic dataset with known growth parameters.
    #[serde(rename = "toy1")]
    Toy1,
}

impl Display for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Name::England => String::from("england"),
            Name::Toy1 => String::from("toy1"),
        };

        write!(f, "{}", name)
    }
}

impl FromStr for Name {
    type Err = Report;

    fn from_str(name: &str) -> Result<Self, Report> {
        let name = match name {
            "england" => Name::England,
            "toy1" => Name::Toy1,
            _ => Err(eyre!("Unknown dataset name: {name}"))
                .suggestion(format!("Please choose from: {}", Name::iter().map(|n| n.to_string()).collect::<Vec<_>>().join(", ")))?,
        };

        Ok(name)
    }
}

impl Name {
    /// Returns the default remote URL of a source, if this dataset has one.
    ///
    /// ```rust
    /// use vardyn::dataset::{Name, Source};
    /// assert!(Name::England.default_url(&Source::Cases).is_some());
    /// assert!(Name::England.default_url(&Source::RegionalDetections).is_none());
    /// assert!(Name::Toy1.default_url(&Source::Cases).is_none());
    /// ```
    pub fn default_url(&self, source: &Source) -> Option<String> {
        match self {
            Name::England => source.get_str("england_url").map(String::from),
            Name::Toy1 => None,
        }
    }
}

// ----------------------------------------------------------------------------
// Source
// ----------------------------------------------------------------------------

/// One of the fixed input tables of a dataset.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    EnumIter,
    EnumProperty,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Source {
    /// Weekly sequence counts per lineage.
    #[strum(props(
        file = "weekly_lineages.tsv",
        england_url = "https://covid-surveillance-data.cog-uk.io/lineages_by_ltla_and_week.tsv"
    ))]
    WeeklyLineages,
    /// Daily sequence counts per lineage.
    #[strum(props(file = "daily_sequences.tsv"))]
    DailySequences,
    /// Per-sample focal variant detections, by region.
    #[strum(props(file = "regional_detections.tsv"))]
    RegionalDetections,
    /// Daily national case counts, with a 7-day average.
    #[strum(props(
        file = "cases.csv",
        england_url = "https://api.coronavirus.data.gov.uk/v2/data?areaType=nation&areaCode=E92000001&metric=newCasesBySpecimenDate&metric=newCasesBySpecimenDateRollingAverage&format=csv"
    ))]
    Cases,
}

impl Source {
    /// Default local file name of the source within a dataset directory.
    pub fn file_name(&self) -> String {
        self.get_str("file").unwrap_or_default().to_string()
    }
}

// ----------------------------------------------------------------------------
// Remote File
// ----------------------------------------------------------------------------

/// A dataset file, and where it was downloaded from.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct RemoteFile {
    /// File URL, [`None`] for files created locally.
    pub url: Option<String>,
    /// Local path, relative to the dataset directory.
    pub local: PathBuf,
    /// Date the file was downloaded or created.
    pub date_created: Option<DateTime<Utc>>,
}

impl RemoteFile {
    /// Returns a new [`RemoteFile`] with the source's default file name.
    ///
    /// A compressed URL keeps its extension locally, so it is decompressed on read.
    ///
    /// ```rust
    /// use vardyn::dataset::{RemoteFile, Source};
    /// let file = RemoteFile::new(&Source::Cases, Some("https://example.org/cases.csv.zst".to_string()));
    /// assert_eq!(file.local, std::path::PathBuf::from("cases.csv.zst"));
    /// ```
    pub fn new(source: &Source, url: Option<String>) -> Self {
        let mut local = source.file_name();
        if let Some(url) = &url {
            if crate::utils::is_compressed(&Path::new(url)) {
                let ext = Path::new(url).extension().and_then(|e| e.to_str()).unwrap_or_default();
                local = format!("{local}.{ext}");
            }
        }
        RemoteFile { url, local: local.into(), date_created: None }
    }
}

// ----------------------------------------------------------------------------
// Sources Snapshot
// ----------------------------------------------------------------------------

/// A snapshot of a dataset's input files, written as `sources.json`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Sources {
    /// Dataset name.
    pub name: Name,
    /// CLI version used to create the dataset.
    pub version: String,
    /// Input files, by source.
    pub files: BTreeMap<Source, RemoteFile>,
}

impl Default for Sources {
    fn default() -> Self {
        Self::new(Name::default())
    }
}

impl Sources {
    /// Returns a new snapshot with the default URLs of the named dataset.
    pub fn new(name: Name) -> Self {
        let files = Source::iter()
            .map(|source| (source, RemoteFile::new(&source, name.default_url(&source))))
            .collect();
        Sources {
            name,
            version: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            files,
        }
    }

    /// Read sources from JSON file.
    pub fn read<P>(path: &P) -> Result<Sources, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let file =
            std::fs::File::open(path).wrap_err(eyre!("Failed to open sources file: {path:?}."))?;
        let reader = std::io::BufReader::new(file);
        let sources: Sources = serde_json::from_reader(reader)
            .wrap_err(eyre!("Failed to deserialize sources file: {path:?}."))?;
        if !sources.is_compatible()? {
            warn!("Sources {path:?} were created by {}, results may differ.", sources.version);
        }
        Ok(sources)
    }

    /// Write sources to JSON file.
    pub fn write<P>(&self, path: &P) -> Result<(), Report>
    where
        P: AsRef<Path> + Debug,
    {
        crate::utils::create_parent_dir(path)?;
        let mut file = std::fs::File::create(path)
            .wrap_err(eyre!("Failed to create sources file: {path:?}"))?;
        let output = serde_json::to_string_pretty(self)
            .wrap_err(eyre!("Failed to serialize sources: {self:?}"))?;
        file.write_all(format!("{}\n", output).as_bytes())
            .wrap_err(eyre!("Failed to write sources file: {path:?}"))?;
        Ok(())
    }

    /// Returns true if the snapshot was created by a CLI with the same major
    /// (or, before 1.0, minor) version as this one.
    pub fn is_compatible(&self) -> Result<bool, Report> {
        let created = self
            .version
            .split_whitespace()
            .last()
            .ok_or_else(|| eyre!("Sources version is empty."))?;
        let created = Version::parse(created)
            .wrap_err(format!("Failed to parse sources version: {:?}", self.version))?;
        let current = Version::parse(env!("CARGO_PKG_VERSION"))?;
        let required = VersionReq::parse(&format!("^{created}"))?;
        Ok(required.matches(&current) || VersionReq::parse(&format!("^{current}"))?.matches(&created))
    }
}
