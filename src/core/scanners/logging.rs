use super::{table_hits, SignalScanner};
use crate::core::model::FileRecord;
use crate::core::patterns::LOGGING;
use crate::core::signals::LoggingPractices;

/// Structured vs. basic logging calls and log level configuration
pub struct LoggingScanner;

impl SignalScanner for LoggingScanner {
    type Output = LoggingPractices;

    fn category(&self) -> &'static str {
        "logging_practices"
    }

    fn scan(&self, files: &[FileRecord], ceiling: usize) -> LoggingPractices {
        let mut logging = LoggingPractices::default();

        for file in files {
            let Some(content) = file.scannable_text(ceiling) else {
                continue;
            };

            let hits = table_hits(&LOGGING, content);
            for (kind, count) in &hits {
                match *kind {
                    "structured_logging" => logging.structured_logging += count,
                    "basic_logging" => logging.basic_logging += count,
                    "log_levels" => logging.log_levels += count,
                    _ => {}
                }
            }

            if !hits.is_empty() {
                logging.files.push(file.path.clone());
            }
        }

        logging
    }
}
