//! Downloading and loading of the input [Dataset].

mod attributes;
mod records;
pub mod toy1;

#[doc(inline)]
pub use attributes::*;
#[doc(inline)]
pub use records::*;

use crate::utils;

#[cfg(feature = "cli")]
use clap::Parser;
use color_eyre::eyre::{Report, Result};
#[cfg(feature = "download")]
use color_eyre::{eyre::eyre, eyre::ContextCompat, Help};
use log::{debug, info, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use tabled::Table;

// ----------------------------------------------------------------------------
// Dataset

/// The typed input tables of one analysis, and where they came from.
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    /// [`Dataset`] [`Sources`].
    pub sources: Sources,
    /// Weekly sequence counts per lineage.
    pub weekly_lineages: Vec<LineageCount>,
    /// Daily sequence counts per lineage.
    pub daily_sequences: Vec<LineageCount>,
    /// Per-sample focal variant detections.
    pub regional_detections: Vec<Detection>,
    /// Daily national cases.
    pub cases: Vec<CaseCount>,
}

impl Display for Dataset {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "name: {}, version: {}", self.sources.name, self.sources.version)
    }
}

impl Dataset {
    /// Download a [`Dataset`], writing each source and a `sources.json`
    /// snapshot to the output directory.
    ///
    /// Sources without a URL are created locally for [`Name::Toy1`], and are
    /// an error for any other dataset. A failed request is an error.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use vardyn::dataset::*;
    /// # use tokio_test::{assert_ok, block_on};
    ///
    /// let output_dir = tempfile::tempdir()?.into_path();
    /// let args = DownloadArgs { name: Name::Toy1, output_dir, sources: None };
    /// # assert_ok!(block_on(async {
    /// let sources = Dataset::download(&args).await?;
    /// assert_eq!(sources.files.len(), 4);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// # }));
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    #[cfg(feature = "download")]
    pub async fn download(args: &DownloadArgs) -> Result<Sources, Report> {
        info!("Downloading dataset: {}", &args.name);

        // --------------------------------------------------------------------
        // Read Optional Input Sources

        let mut sources = match &args.sources {
            Some(path) => {
                info!("Importing sources: {path:?}");
                let mut sources = Sources::read(path)?;
                if sources.name != args.name {
                    warn!("Dataset has been changed by sources to: {}", &sources.name);
                }
                // update cli version, just in case
                sources.version = Sources::new(sources.name).version;
                sources
            }
            None => Sources::new(args.name),
        };

        if !args.output_dir.exists() {
            info!("Creating output directory: {:?}", &args.output_dir);
            std::fs::create_dir_all(&args.output_dir)?;
        } else {
            warn!("Proceed with caution! --output-dir {:?} already exists.", args.output_dir);
        }

        for source in Source::iter() {
            let file = sources.files.get(&source).cloned().unwrap_or_default();
            let file = match (&file.url, sources.name) {
                (Some(url), _) => {
                    info!("Downloading {source}: {url}");
                    let file = if file.local.as_os_str().is_empty() {
                        RemoteFile::new(&source, file.url.clone())
                    } else {
                        file.clone()
                    };
                    let path = args.output_dir.join(&file.local);
                    let compressed = utils::is_compressed(&path);
                    let path = utils::download_file(url, &path, !compressed).await?;
                    let local = match compressed {
                        true => {
                            debug!("Decompressing: {path:?}");
                            let path = utils::decompress_file(&path)?;
                            path.file_name()
                                .map(PathBuf::from)
                                .wrap_err_with(|| format!("Failed to get file name: {path:?}"))?
                        }
                        false => file.local,
                    };
                    RemoteFile { url: file.url, local, date_created: Some(chrono::Utc::now()) }
                }
                (None, Name::Toy1) => {
                    info!("Creating {source}.");
                    toy1::create(&source, &args.output_dir)?
                }
                (None, name) => Err(eyre!("Dataset {name} has no URL for source: {source}"))
                    .suggestion("Provide one in a sources JSON with --sources.")?,
            };
            sources.files.insert(source, file);
        }

        let path = args.output_dir.join("sources.json");
        info!("Writing sources: {path:?}");
        sources.write(&path)?;

        info!("Done.");
        Ok(sources)
    }

    /// Returns a [`Table`] of datasets and their sources.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use vardyn::dataset::*;
    ///
    /// let table = Dataset::list(&ListArgs::default())?;
    /// let table = Dataset::list(&ListArgs { name: Some(Name::Toy1) })?;
    /// assert!(table.to_string().contains("regional_detections"));
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn list(args: &ListArgs) -> Result<Table, Report> {
        let mut builder = tabled::builder::Builder::default();
        builder.push_record(vec!["Name", "Source", "File", "Default URL"]);

        Name::iter()
            .filter(|name| match args.name {
                Some(args_name) => args_name == *name,
                None => true,
            })
            .for_each(|name| {
                Source::iter().for_each(|source| {
                    let url = match name.default_url(&source) {
                        Some(_) => "yes",
                        None if name == Name::Toy1 => "created locally",
                        None => "no",
                    };
                    let row =
                        vec![name.to_string(), source.to_string(), source.file_name(), url.into()];
                    builder.push_record(row);
                })
            });

        let table = builder.build();
        Ok(table)
    }

    /// Returns a [`Dataset`] read from files in a directory.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use vardyn::dataset::*;
    /// # use tokio_test::{assert_ok, block_on};
    ///
    /// let output_dir = tempfile::tempdir()?.into_path();
    /// # assert_ok!(block_on(async {
    /// let args = DownloadArgs { name: Name::Toy1, output_dir: output_dir.clone(), sources: None };
    /// Dataset::download(&args).await?;
    /// let dataset = Dataset::read(&output_dir)?;
    /// assert_eq!(dataset.sources.name, Name::Toy1);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// # }));
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn read<P>(dataset_dir: &P) -> Result<Dataset, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let dataset_dir = dataset_dir.as_ref();
        info!("Reading dataset: {dataset_dir:?}");

        let path = dataset_dir.join("sources.json");
        info!("Reading sources: {path:?}");
        let sources = Sources::read(&path)?;

        let dataset = Dataset {
            weekly_lineages: read_source(dataset_dir, &sources, &Source::WeeklyLineages)?,
            daily_sequences: read_source(dataset_dir, &sources, &Source::DailySequences)?,
            regional_detections: read_source(dataset_dir, &sources, &Source::RegionalDetections)?,
            cases: read_source(dataset_dir, &sources, &Source::Cases)?,
            sources,
        };

        Ok(dataset)
    }
}

/// Read one source table, at its snapshot path or its default file name.
fn read_source<T>(dataset_dir: &Path, sources: &Sources, source: &Source) -> Result<Vec<T>, Report>
where
    T: DeserializeOwned,
{
    let local = match sources.files.get(source) {
        Some(file) => file.local.clone(),
        None => {
            warn!("Sources have no entry for {source}, using the default file name.");
            PathBuf::from(source.file_name())
        }
    };
    let path = dataset_dir.join(local);
    info!("Reading {source}: {path:?}");
    let records = utils::read_table(&path)?;
    debug!("Read {} records from {path:?}", records.len());
    Ok(records)
}

// ----------------------------------------------------------------------------
// Download Args
// ----------------------------------------------------------------------------

/// Download dataset arguments.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[cfg_attr(feature = "cli", derive(Parser))]
pub struct DownloadArgs {
    /// [`Dataset`] [`Name`].
    #[cfg_attr(feature = "cli", clap(short = 'r', long, required = true))]
    pub name: Name,

    /// Output directory.
    ///
    /// If the directory does not exist, it will be created.
    #[cfg_attr(feature = "cli", clap(short = 'o', long, required = true))]
    pub output_dir: PathBuf,

    /// Download [`Dataset`] from a [`Sources`] JSON snapshot.
    #[cfg_attr(feature = "cli", clap(short = 's', long, required = false))]
    #[cfg_attr(feature = "cli", clap(help = "Download dataset from a sources JSON."))]
    pub sources: Option<PathBuf>,
}

impl Default for DownloadArgs {
    fn default() -> Self {
        DownloadArgs::new()
    }
}
impl DownloadArgs {
    pub fn new() -> Self {
        DownloadArgs { name: Name::default(), output_dir: PathBuf::new(), sources: None }
    }
}

// ----------------------------------------------------------------------------
// List Args
// ----------------------------------------------------------------------------

/// Arguments for listing datasets available for download.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[cfg_attr(feature = "cli", derive(Parser))]
pub struct ListArgs {
    /// [`Dataset`] [`Name`].
    #[cfg_attr(feature = "cli", clap(short = 'n', long))]
    pub name: Option<Name>,
}

#[cfg(test)]
mod tests;
