//! [Command-line interface](Cli) (CLI) of the main binary.

pub mod dataset;

use crate::RunArgs;
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

// ----------------------------------------------------------------------------
// CLI Entry Point
// ----------------------------------------------------------------------------

/// The command-line interface (CLI).
/// ---
/// The CLI is intended for parsing user input from the command-line in the main function. This is achieved with the `parse` function, which parses the command line arguments from [`std::env::args`](https://doc.rust-lang.org/std/env/fn.args.html).
/// ```no_run
/// use clap::Parser;
/// let args = vardyn::Cli::parse();
/// ```
/// The command-line arguments from `std::env::args` are simply a vector of space separated strings. Here is a manual example of setting the command-line input:
/// ```rust
/// # use clap::Parser;
/// let input = ["vardyn", "run", "--dataset-dir", "dataset/toy1", "--output-dir", "output/toy1", "--end-policy", "max-frequency"];
/// let args = vardyn::Cli::parse_from(input);
/// use serde_json;
/// serde_json::to_string_pretty(&args)?;
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
/// With the following pretty JSON representation (abbreviated):
/// ```json
/// {
///   "command": {
///     "Run": {
///       "dataset_dir": "dataset/toy1",
///       "output_dir": "output/toy1",
///       "focal_variant": "delta",
///       "end_policy": "max-frequency",
///       "fixation_threshold": 0.98,
///       ...
///     }
///   },
///   "verbosity": "Info"
/// }
/// ```
#[derive(Debug, Deserialize, Parser, Serialize)]
#[clap(name = "vardyn", author, version)]
#[clap(about = "vardyn estimates the growth and reproduction number of SARS-CoV-2 variants in England.")]
pub struct Cli {
    #[clap(subcommand)]
    /// Pass CLI arguments to a particular [Command].
    #[clap(help = "Set the command.")]
    pub command: Command,

    /// Set the output [Verbosity] level.
    #[clap(short = 'v', long)]
    #[clap(value_enum, default_value_t = Verbosity::default())]
    #[clap(hide_possible_values = false)]
    #[clap(global = true)]
    #[clap(help = "Set the output verbosity level.")]
    pub verbosity: Verbosity,
}

/// CLI [commands](#variants). Used to decide which runtime [Command](#variants) the CLI arguments should be passed to.
#[derive(Debug, Deserialize, Serialize, Subcommand)]
pub enum Command {
    /// Pass CLI arguments to the [Dataset](dataset::Command) subcommands.
    /// ## Examples
    /// ```rust
    /// use vardyn::{Cli, cli::Command};
    /// use clap::Parser;
    /// let input = ["vardyn", "dataset", "list"];
    /// let args = Cli::parse_from(input);
    /// assert!(matches!(args.command, Command::Dataset(_)));
    /// ```
    #[clap(about = "List or download available datasets.")]
    Dataset(dataset::Args),
    /// Pass CLI arguments to the [run](crate::run()) function.
    /// ## Examples
    /// ```rust
    /// use vardyn::{Cli, cli::Command};
    /// use clap::Parser;
    /// let input = ["vardyn", "run", "-d", "dataset", "-o", "output", "--rt-start", "2021-05-01", "--focal-variant", "Alpha"];
    /// match Cli::parse_from(input).command {
    ///     Command::Run(args) => {
    ///         assert_eq!(args.focal_variant, vardyn::Variant::Alpha);
    ///         assert_eq!(args.rt_start.map(|d| d.to_string()), Some("2021-05-01".to_string()));
    ///     }
    ///     _ => assert!(false),
    /// }
    /// ```
    #[clap(about = "Run the variant dynamics analysis.")]
    Run(RunArgs),
}

// -----------------------------------------------------------------------------
// Verbosity
// -----------------------------------------------------------------------------

/// The output verbosity level.
#[derive(Clone, Debug, Default, Deserialize, Serialize, ValueEnum)]
pub enum Verbosity {
    #[default]
    Info,
    Warn,
    Debug,
    Error,
}

impl Display for Verbosity {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        // Convert to lowercase for RUST_LOG env var compatibility
        let lowercase = format!("{:?}", self).to_lowercase();
        write!(f, "{lowercase}")
    }
}
