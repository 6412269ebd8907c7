//! Run the variant dynamics analysis on a dataset.

use crate::dataset::Dataset;
use crate::fit::{fit_all, LogisticFitResult};
use crate::frequency::{self, aggregate, bin_weekly, compare, proportions, FrequencySeries, Observation};
use crate::incidence::{self, CaseColumn};
use crate::phase::{self, EndPolicy, EndRule, GrowthPhase};
use crate::rt;
use crate::utils::write_table;
use crate::variant::Variant;

use chrono::{Datelike, NaiveDate, Weekday};
#[cfg(feature = "cli")]
use clap::Parser;
use color_eyre::eyre::{Report, Result, WrapErr};
use indoc::formatdoc;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Debug, Display};
use std::path::{Path, PathBuf};
use vardyn_stats::{FitOptions, RenewalConfig, SerialInterval};


// ----------------------------------------------------------------------------
// Run
// ----------------------------------------------------------------------------

/// Run every stage of the analysis and write the derived tables.
///
/// ## Examples
///
/// ```rust
/// use vardyn::dataset::{toy1, Source};
/// use vardyn::RunArgs;
/// use strum::IntoEnumIterator;
///
/// let dataset_dir = tempfile::tempdir()?.into_path();
/// let mut sources = vardyn::dataset::Sources::new(vardyn::dataset::Name::Toy1);
/// for source in Source::iter() {
///     sources.files.insert(source, toy1::create(&source, &dataset_dir)?);
/// }
/// sources.write(&dataset_dir.join("sources.json"))?;
///
/// let output_dir = tempfile::tempdir()?.into_path();
/// let args = RunArgs { dataset_dir, output_dir: output_dir.clone(), ..Default::default() };
/// vardyn::run(&args)?;
/// assert!(output_dir.join("rt.tsv").exists());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn run(args: &RunArgs) -> Result<(), Report> {
    let args = args.resolve()?;
    let end_policy = EndPolicy::new(args.end_policy, args.fixation_threshold)?;
    let serial_interval = SerialInterval::new(args.si_mean, args.si_sd)?;
    let fit_options = FitOptions { max_iter: args.max_iter, ..Default::default() };

    let output_dir = &args.output_dir;
    if !output_dir.exists() {
        info!("Creating output directory: {output_dir:?}");
        std::fs::create_dir_all(output_dir)
            .wrap_err_with(|| format!("Failed to create output directory: {output_dir:?}"))?;
    }
    let path = output_dir.join("run_args.json");
    info!("Writing run arguments: {path:?}");
    args.write(&path)?;

    let dataset = Dataset::read(&args.dataset_dir)?;

    // ------------------------------------------------------------------------
    // Frequencies

    let weekly_observations = Observation::from_lineages(&dataset.weekly_lineages);
    let daily_observations = Observation::from_lineages(&dataset.daily_sequences);
    let weekly = aggregate(&weekly_observations)?;
    let daily = aggregate(&daily_observations)?;
    let regional = proportions(&dataset.regional_detections)?;

    let anchor = week_anchor(&weekly);
    debug!("Binning daily sequences into weeks ending on {anchor}.");
    let binned = aggregate(&bin_weekly(&daily_observations, anchor)?)?;

    write_output(&frequency::rows(&weekly), output_dir, "frequencies_weekly.tsv")?;
    write_output(&frequency::rows(&daily), output_dir, "frequencies_daily.tsv")?;
    write_output(&compare(&weekly, &binned), output_dir, "frequencies_comparison.tsv")?;
    write_output(&frequency::rows(&regional), output_dir, "frequencies_regional.tsv")?;

    // ------------------------------------------------------------------------
    // Growth Phases and Logistic Fits

    let mut tables = Tables::default();
    tables.extend(analyse("weekly", &weekly, &end_policy, &fit_options, args.threads)?);
    tables.extend(analyse("daily", &daily, &end_policy, &fit_options, args.threads)?);
    tables.extend(analyse("regional", &regional, &end_policy, &fit_options, args.threads)?);

    write_output(&tables.phases, output_dir, "growth_phases.tsv")?;
    write_output(&tables.fits, output_dir, "logistic_fits.tsv")?;
    write_output(&tables.curves, output_dir, "logistic_curves.tsv")?;

    // ------------------------------------------------------------------------
    // Incidence and Rt

    // tables from an earlier run must not outlive a skipped step
    let rt_path = output_dir.join("rt.tsv");
    for path in [output_dir.join("incidence.tsv"), rt_path.clone()] {
        if path.exists() {
            std::fs::remove_file(&path).wrap_err_with(|| format!("Failed to remove: {path:?}"))?;
        }
    }

    match weekly.get(&args.focal_variant) {
        Some(focal) => {
            let estimates = incidence::estimate(&dataset.cases, focal, args.case_column);
            write_output(&estimates, output_dir, "incidence.tsv")?;

            let series: Vec<_> = estimates.iter().map(|e| (e.date, e.estimated_cases)).collect();
            let config = RenewalConfig::default();
            match rt::estimate(&series, args.rt_start, args.rt_end, &serial_interval, &config) {
                Ok(estimates) => write_output(&estimates, output_dir, "rt.tsv")?,
                Err(e) => error!("Rt estimation failed, {rt_path:?} was not written: {e}"),
            }
        }
        None => warn!(
            "Focal variant {} has no weekly frequencies, skipping incidence and Rt.",
            args.focal_variant
        ),
    }

    info!("{}", tables.summary());
    info!("Done.");
    Ok(())
}

/// Weekday of the weekly source's week-ending dates, Saturday if it has none.
fn week_anchor(weekly: &BTreeMap<Variant, FrequencySeries>) -> Weekday {
    weekly
        .values()
        .find_map(|series| series.points().first())
        .map(|p| p.date.weekday())
        .unwrap_or(Weekday::Sat)
}

fn write_output<T>(rows: &[T], output_dir: &Path, file_name: &str) -> Result<(), Report>
where
    T: Serialize,
{
    let path = output_dir.join(file_name);
    info!("Writing {} rows: {path:?}", rows.len());
    write_table(rows, &path)
}

// ----------------------------------------------------------------------------
// Output Tables
// ----------------------------------------------------------------------------

/// Growth phase of one group, or why it has none.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PhaseRow {
    pub source: String,
    pub group: String,
    pub status: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Logistic fit of one group. Parameters are empty unless `status` is `ok`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FitRow {
    pub source: String,
    pub group: String,
    pub status: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub s: Option<f64>,
    pub f0: Option<f64>,
    pub rss: Option<f64>,
    pub iterations: Option<usize>,
}

/// One day of a fitted logistic curve.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CurveRow {
    pub source: String,
    pub group: String,
    pub date: NaiveDate,
    pub frequency: f64,
}

#[derive(Debug, Default)]
struct Tables {
    phases: Vec<PhaseRow>,
    fits: Vec<FitRow>,
    curves: Vec<CurveRow>,
}

impl Tables {
    fn extend(&mut self, other: Tables) {
        self.phases.extend(other.phases);
        self.fits.extend(other.fits);
        self.curves.extend(other.curves);
    }

    /// Terminal table of the fits, with a count of each status.
    fn summary(&self) -> String {
        let mut builder = tabled::builder::Builder::default();
        builder.push_record(vec!["Source", "Group", "Status", "s", "f0"]);
        let format = |x: Option<f64>| x.map(|x| format!("{x:.4}")).unwrap_or_default();
        self.fits.iter().for_each(|row| {
            let record = vec![
                row.source.clone(),
                row.group.clone(),
                row.status.clone(),
                format(row.s),
                format(row.f0),
            ];
            builder.push_record(record);
        });

        let ok = self.fits.iter().filter(|row| row.status == "ok").count();
        formatdoc! {"
            Logistic fits: {ok} of {total} succeeded.
            {table}",
            total = self.fits.len(),
            table = builder.build(),
        }
    }
}

/// Extract growth phases and fit every group of one source.
fn analyse<K>(
    source: &str,
    series: &BTreeMap<K, FrequencySeries>,
    policy: &EndPolicy,
    options: &FitOptions,
    threads: usize,
) -> Result<Tables, Report>
where
    K: Clone + Debug + Display + Ord + Send + Sync,
{
    let mut tables = Tables::default();

    let mut phases: Vec<GrowthPhase<K>> = Vec::new();
    for (group, series) in series {
        let row = match phase::extract(group.clone(), series, policy) {
            Ok(phase) => {
                let row = phase_row(source, group, "ok", Some(phase.start), Some(phase.end));
                phases.push(phase);
                row
            }
            Err(e) => {
                debug!("{source} {group}: no growth phase ({e})");
                phase_row(source, group, &e.to_string(), None, None)
            }
        };
        tables.phases.push(row);
    }

    let fits: BTreeMap<K, LogisticFitResult<K>> = fit_all(series, &phases, options, threads)?;
    for group in series.keys() {
        let row = match fits.get(group) {
            Some(result) => {
                tables.curves.extend(result.curve().into_iter().map(|(date, frequency)| CurveRow {
                    source: source.to_string(),
                    group: group.to_string(),
                    date,
                    frequency,
                }));
                fit_row(source, result)
            }
            None => FitRow {
                source: source.to_string(),
                group: group.to_string(),
                status: "no_growth_phase".to_string(),
                start: None,
                end: None,
                s: None,
                f0: None,
                rss: None,
                iterations: None,
            },
        };
        tables.fits.push(row);
    }

    Ok(tables)
}

fn phase_row<K: Display>(
    source: &str,
    group: &K,
    status: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> PhaseRow {
    PhaseRow { source: source.to_string(), group: group.to_string(), status: status.to_string(), start, end }
}

fn fit_row<K: Display>(source: &str, result: &LogisticFitResult<K>) -> FitRow {
    let (status, fit) = match &result.outcome {
        Ok(fit) => ("ok".to_string(), Some(fit)),
        Err(failure) => (failure.to_string(), None),
    };
    FitRow {
        source: source.to_string(),
        group: result.group.to_string(),
        status,
        start: Some(result.start),
        end: Some(result.end),
        s: fit.map(|f| f.model.s),
        f0: fit.map(|f| f.model.f0),
        rss: fit.map(|f| f.rss),
        iterations: fit.map(|f| f.iterations),
    }
}

// ----------------------------------------------------------------------------
// RunArgs
// ----------------------------------------------------------------------------

/// Analyse variant dynamics in a dataset.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[cfg_attr(feature = "cli", derive(Parser))]
#[serde(default)]
pub struct RunArgs {
    /// Dataset directory.
    #[cfg_attr(feature = "cli", clap(short = 'd', long, required = true))]
    #[serde(skip_deserializing)]
    pub dataset_dir: PathBuf,

    /// Output directory.
    ///
    /// If the directory does not exist, it will be created.
    #[cfg_attr(feature = "cli", clap(short = 'o', long, required = true))]
    #[serde(skip_deserializing)]
    pub output_dir: PathBuf,

    /// Read all other arguments from a run arguments JSON file.
    #[cfg_attr(feature = "cli", clap(short = 'c', long))]
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Variant whose incidence and Rt are estimated.
    #[cfg_attr(feature = "cli", clap(short = 'f', long, default_value_t = RunArgs::default().focal_variant))]
    pub focal_variant: Variant,

    /// How the end of each growth phase is chosen.
    #[cfg_attr(feature = "cli", clap(short = 'e', long, value_enum, default_value_t = RunArgs::default().end_policy))]
    pub end_policy: EndRule,

    /// Frequency that ends a growth phase with '--end-policy fixation'.
    #[cfg_attr(feature = "cli", clap(long, default_value_t = RunArgs::default().fixation_threshold))]
    pub fixation_threshold: f64,

    /// Maximum number of iterations of each logistic fit.
    #[cfg_attr(feature = "cli", clap(short = 'i', long, default_value_t = RunArgs::default().max_iter))]
    pub max_iter: usize,

    /// First date (YYYY-MM-DD) of the incidence used for Rt.
    #[cfg_attr(feature = "cli", clap(long))]
    pub rt_start: Option<NaiveDate>,

    /// Last date (YYYY-MM-DD) of the incidence used for Rt.
    #[cfg_attr(feature = "cli", clap(long))]
    pub rt_end: Option<NaiveDate>,

    /// Mean of the serial interval, in days.
    #[cfg_attr(feature = "cli", clap(long, default_value_t = RunArgs::default().si_mean))]
    pub si_mean: f64,

    /// Standard deviation of the serial interval, in days.
    #[cfg_attr(feature = "cli", clap(long, default_value_t = RunArgs::default().si_sd))]
    pub si_sd: f64,

    /// Case count column scaled into variant incidence.
    #[cfg_attr(feature = "cli", clap(long, value_enum, default_value_t = RunArgs::default().case_column))]
    pub case_column: CaseColumn,

    /// Number of CPU threads to use.
    #[cfg_attr(feature = "cli", clap(short = 't', long, default_value_t = RunArgs::default().threads))]
    #[serde(skip)]
    pub threads: usize,
}

impl Default for RunArgs {
    fn default() -> Self {
        RunArgs {
            dataset_dir: PathBuf::new(),
            output_dir: PathBuf::new(),
            config: None,
            focal_variant: Variant::Delta,
            end_policy: EndRule::Fixation,
            fixation_threshold: 0.98,
            max_iter: FitOptions::default().max_iter,
            rt_start: None,
            rt_end: None,
            si_mean: 4.7,
            si_sd: 2.9,
            case_column: CaseColumn::Daily,
            threads: 1,
        }
    }
}

impl RunArgs {
    /// Returns the effective arguments: those of `--config` if given, with
    /// the directories and thread count of the command line.
    pub fn resolve(&self) -> Result<RunArgs, Report> {
        let Some(path) = &self.config else {
            return Ok(self.clone());
        };
        info!("Reading run arguments: {path:?}");
        let mut args = RunArgs::read(path)?;
        args.dataset_dir = self.dataset_dir.clone();
        args.output_dir = self.output_dir.clone();
        args.threads = self.threads;
        Ok(args)
    }

    /// Reads [`RunArgs`] from a JSON file.
    pub fn read<P>(path: &P) -> Result<RunArgs, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let input = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read run arguments: {path:?}."))?;
        let run_args = serde_json::from_str(&input)
            .wrap_err_with(|| format!("Failed to deserialize run arguments: {input}"))?;
        Ok(run_args)
    }

    /// Write [`RunArgs`] to a JSON file.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use vardyn::RunArgs;
    /// let dir = tempfile::tempdir()?;
    /// let path = dir.path().join("run_args.json");
    /// RunArgs::default().write(&path)?;
    /// assert_eq!(RunArgs::read(&path)?, RunArgs::default());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn write<P>(&self, path: &P) -> Result<(), Report>
    where
        P: AsRef<Path> + Debug,
    {
        crate::utils::create_parent_dir(path)?;
        let output = serde_json::to_string_pretty(self)
            .wrap_err(format!("Failed to serialize run arguments: {self:?}"))?;
        std::fs::write(path, format!("{output}\n"))
            .wrap_err(format!("Failed to write run arguments: {path:?}"))?;
        Ok(())
    }
}
