#![doc = include_str!("../README.md")]

#[cfg(feature = "cli")]
pub mod cli;
pub mod dataset;
pub mod fit;
pub mod frequency;
pub mod incidence;
pub mod phase;
pub mod rt;
pub mod run;
pub mod utils;
pub mod variant;

#[doc(inline)]
#[cfg(feature = "cli")]
pub use crate::cli::Cli;
#[doc(inline)]
pub use crate::dataset::Dataset;
#[doc(inline)]
pub use crate::run::{run, RunArgs};
#[doc(inline)]
pub use crate::variant::Variant;
