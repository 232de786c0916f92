//! Signal scanners, one per category.
//!
//! Each scanner is a pure function of a batch: it reads file paths and text, never shared
//! state, and returns a fresh accumulator. [`ScanSuite`] runs all of them over one batch
//! and packs the results into a [`Signals`] value ready for merging.

mod architecture;
mod coupling;
mod dependencies;
mod environment;
mod health;
mod instrumentation;
mod logging;
mod modularity;
mod secrets;
mod state;
mod technology;
mod testing;

pub use architecture::ArchitectureHintScanner;
pub use coupling::CouplingScanner;
pub use dependencies::DependencyScanner;
pub use environment::EnvironmentScanner;
pub use health::HealthCheckScanner;
pub use instrumentation::InstrumentationScanner;
pub use logging::LoggingScanner;
pub use modularity::ModularityScanner;
pub use secrets::SecretsScanner;
pub use state::StateScanner;
pub use technology::TechnologyScanner;
pub use testing::TestingScanner;

use regex::Regex;
use tracing::debug;

use super::merge::Merge;
use super::model::FileRecord;
use super::patterns::PatternTable;
use super::signals::Signals;

/// Trait every category scanner implements
pub trait SignalScanner {
    /// Partial accumulator produced for one batch
    type Output: Merge + Default;

    /// Category name, used in diagnostics
    fn category(&self) -> &'static str;

    /// Scan a batch. Content longer than `ceiling` bytes is skipped; paths are always seen.
    fn scan(&self, files: &[FileRecord], ceiling: usize) -> Self::Output;
}

/// Runs every scanner over a batch
#[derive(Debug, Clone, Copy)]
pub struct ScanSuite {
    content_size_ceiling: usize,
}

impl ScanSuite {
    pub fn new(content_size_ceiling: usize) -> Self {
        Self { content_size_ceiling }
    }

    pub fn scan_batch(&self, files: &[FileRecord]) -> Signals {
        let ceiling = self.content_size_ceiling;
        debug!("Scanning batch of {} files", files.len());

        Signals {
            file_count: files.len() as u64,
            technology: run(&TechnologyScanner, files, ceiling),
            secrets: run(&SecretsScanner, files, ceiling),
            environment: run(&EnvironmentScanner, files, ceiling),
            coupling: run(&CouplingScanner, files, ceiling),
            logging: run(&LoggingScanner, files, ceiling),
            state: run(&StateScanner, files, ceiling),
            modularity: run(&ModularityScanner, files, ceiling),
            dependencies: run(&DependencyScanner, files, ceiling),
            health: run(&HealthCheckScanner, files, ceiling),
            testing: run(&TestingScanner, files, ceiling),
            instrumentation: run(&InstrumentationScanner, files, ceiling),
            hints: run(&ArchitectureHintScanner, files, ceiling),
        }
    }
}

impl Default for ScanSuite {
    fn default() -> Self {
        Self::new(1_000_000)
    }
}

fn run<S: SignalScanner>(scanner: &S, files: &[FileRecord], ceiling: usize) -> S::Output {
    let output = scanner.scan(files, ceiling);
    debug!("{} scanner finished", scanner.category());
    output
}

/// Number of non-overlapping matches of one regex
pub(crate) fn count_matches(regex: &Regex, text: &str) -> u64 {
    regex.find_iter(text).count() as u64
}

/// Matches per named group of a table, summed over the group's patterns; groups without
/// a match are left out
pub(crate) fn table_hits(table: &PatternTable, text: &str) -> Vec<(&'static str, u64)> {
    table
        .entries()
        .map(|(name, regexes)| (name, regexes.iter().map(|r| count_matches(r, text)).sum::<u64>()))
        .filter(|(_, hits)| *hits > 0)
        .collect()
}
