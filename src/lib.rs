//! Cloud readiness assessment for source repositories.
//!
//! A crawled file list is scanned in batches for heuristic signals, the per-batch results
//! are merged, and the merged signals are scored, optionally blended with an LLM
//! assessment, and turned into a report with prioritized recommendations.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;

pub use config::Config;
pub use error::{CloudReadyError, Result};
