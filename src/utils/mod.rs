//! File helpers: download, decompression, and delimited table input/output.

use color_eyre::eyre::{eyre, ContextCompat, Report, Result, WrapErr};
use color_eyre::Help;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use zstd::stream::read::Decoder;

#[cfg(test)]
mod tests;

pub enum Decompress {
    Zst,
}

impl FromStr for Decompress {
    type Err = Report;
    fn from_str(s: &str) -> Result<Self, Report> {
        match s {
            "zst" => Ok(Decompress::Zst),
            _ext => Err(eyre!("Decompression for {_ext:?} is not implemented yet.")),
        }
    }
}

/// Returns the lowercase file extension of a path.
fn get_extension<P>(path: &P) -> Result<String, Report>
where
    P: AsRef<Path> + Debug,
{
    let ext = path
        .as_ref()
        .extension()
        .wrap_err_with(|| format!("Failed to get file extension: {path:?}"))?
        .to_str()
        .wrap_err_with(|| format!("Failed to convert file extension to str: {path:?}"))?;
    Ok(ext.to_lowercase())
}

/// Returns true if the path has a compression extension we can decode.
pub fn is_compressed<P>(path: &P) -> bool
where
    P: AsRef<Path> + Debug,
{
    get_extension(path).map(|ext| Decompress::from_str(&ext).is_ok()).unwrap_or(false)
}

/// Decompress file in place, returning the path without the compression extension.
///
/// ## Examples
///
/// ```rust
/// use vardyn::utils::decompress_file;
/// use std::io::Write;
///
/// let dir = tempfile::tempdir()?;
/// let path = dir.path().join("cases.csv.zst");
/// let compressed = zstd::stream::encode_all("date,cases\n2021-06-01,10\n".as_bytes(), 0)?;
/// std::fs::File::create(&path)?.write_all(&compressed)?;
///
/// let output = decompress_file(&path)?;
/// assert_eq!(output, dir.path().join("cases.csv"));
/// assert_eq!(std::fs::read_to_string(&output)?, "date,cases\n2021-06-01,10\n");
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn decompress_file<P>(path: &P) -> Result<PathBuf, Report>
where
    P: AsRef<Path> + Debug,
{
    // extract the output file path without the last extension
    let output = path.as_ref().with_extension("");

    match Decompress::from_str(&get_extension(path)?)? {
        Decompress::Zst => {
            let reader = File::open(path).wrap_err(format!("Failed to open: {path:?}"))?;
            let mut decoder =
                Decoder::new(reader).wrap_err(format!("Failed to decode: {path:?}"))?;
            let mut buffer = Vec::new();
            decoder
                .read_to_end(&mut buffer)
                .wrap_err(format!("Failed to decompress: {path:?}"))?;
            std::fs::write(&output, buffer).wrap_err(eyre!("Failed to write: {output:?}"))?;
            std::fs::remove_file(path)?;
        }
    }

    Ok(output)
}

/// Download file from url to path.
///
/// Any non-200 response is an error: there is no retry and no offline fallback.
///
/// ## Examples
///
/// ```rust,no_run
/// # use tokio_test::{block_on, assert_ok};
/// use vardyn::utils::download_file;
///
/// let url = "https://covid-surveillance-data.cog-uk.io/lineages_by_ltla_and_week.tsv";
/// # assert_ok!(block_on(async {
/// let output = "test/utils/download_file/weekly_lineages.tsv";
/// download_file(&url, &output, true).await?;
/// # Ok::<(), color_eyre::eyre::Report>(())
/// # }));
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
#[cfg(feature = "download")]
pub async fn download_file<P>(
    url: &str,
    output: &P,
    download_as_text: bool,
) -> Result<PathBuf, Report>
where
    P: AsRef<Path> + Debug,
{
    let output: PathBuf = output.as_ref().into();
    create_parent_dir(&output)?;

    // get URL response
    let response = reqwest::get(url).await.wrap_err(format!("Failed to request: {url:?}"))?;
    if response.status() != 200 {
        Err(eyre!("Failed to download: {url:?}")
            .suggestion(format!("Status code: {}", response.status())))?;
    }

    match download_as_text {
        true => std::fs::write(&output, response.text().await?),
        false => std::fs::write(&output, response.bytes().await?),
    }
    .wrap_err(format!("Unable to write: {output:?}"))?;

    Ok(output)
}

/// Create the parent directory of a file path, if it doesn't exist yet.
pub fn create_parent_dir<P>(path: &P) -> Result<(), Report>
where
    P: AsRef<Path> + Debug,
{
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .wrap_err(format!("Failed to create directory: {parent:?}"))?;
        }
    }
    Ok(())
}

/// Get delimiter based on file extension.
///
/// - `.tsv` => `\t`
/// - `.txt` => `\t`
/// - `.csv` => `,`
///
/// A compression extension is skipped, so `.tsv.zst` is tab-delimited.
///
/// ```rust
/// use vardyn::utils::get_delimiter;
///
/// assert_eq!(get_delimiter(&"file.tsv")?, b'\t');
/// assert_eq!(get_delimiter(&"file.csv")?, b',');
/// assert_eq!(get_delimiter(&"file.txt")?, b'\t');
/// assert_eq!(get_delimiter(&"file.csv.zst")?, b',');
/// assert!(get_delimiter(&"file").is_err());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn get_delimiter<P>(path: &P) -> Result<u8, Report>
where
    P: AsRef<Path> + Debug,
{
    let path = path.as_ref();
    let path = match is_compressed(&path) {
        true => path.with_extension(""),
        false => path.to_path_buf(),
    };
    // convert extension to the expected delimiter
    match get_extension(&path)?.as_str() {
        "tsv" | "txt" => Ok(b'\t'),
        "csv" => Ok(b','),
        _ext => {
            Err(eyre!("Unknown file extension: {_ext:?}").suggestion("Options: tsv, csv, or txt"))
        }
    }
}

/// Read a delimited file into typed records, decompressing on the fly.
///
/// Columns are matched to fields by header name; extra columns are ignored.
pub fn read_table<T, P>(path: &P) -> Result<Vec<T>, Report>
where
    T: DeserializeOwned,
    P: AsRef<Path> + Debug,
{
    let delimiter = get_delimiter(path)?;
    let file = File::open(path).wrap_err(format!("Failed to open: {path:?}"))?;
    let reader: Box<dyn Read> = match is_compressed(path) {
        true => Box::new(Decoder::new(file).wrap_err(format!("Failed to decode: {path:?}"))?),
        false => Box::new(BufReader::new(file)),
    };

    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(reader)
        .deserialize()
        .enumerate()
        .map(|(i, record)| {
            // +2 for the header line and 1-based numbering
            record.wrap_err(format!("Failed to parse line {} of {path:?}", i + 2))
        })
        .collect()
}

/// Write typed records to a delimited file, with a header line.
pub fn write_table<T, P>(records: &[T], path: &P) -> Result<(), Report>
where
    T: Serialize,
    P: AsRef<Path> + Debug,
{
    create_parent_dir(path)?;
    let delimiter = get_delimiter(path)?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .wrap_err(format!("Failed to create: {path:?}"))?;
    for record in records {
        writer.serialize(record).wrap_err(format!("Failed to write record to: {path:?}"))?;
    }
    writer.flush().wrap_err(format!("Failed to write: {path:?}"))?;
    Ok(())
}
