#![doc = include_str!("../README.md")]

pub mod gamma;
pub mod logistic;
pub mod renewal;

#[doc(inline)]
pub use gamma::Gamma;
#[doc(inline)]
pub use logistic::{FitFailure, FitOptions, LogisticFit, LogisticModel};
#[doc(inline)]
pub use renewal::{Posterior, RenewalConfig, RenewalError, SerialInterval};
