//! Data model shared by the fsmscan extractors:
//!
//! - [`Metadata`] records recovered from annotation chains, with their merge rule;
//! - the [`ChartDocument`] emitted for visualization tools;
//! - the [`MachineConfig`] requests describing which machines to extract.
//!
//! Nothing in this crate knows about syntax trees.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod chart;
mod config;
mod metadata;

pub use chart::*;
pub use config::*;
pub use metadata::*;
