use super::{table_hits, SignalScanner};
use crate::core::model::FileRecord;
use crate::core::patterns::INSTRUMENTATION;
use crate::core::signals::Instrumentation;

/// Metrics, tracing and profiling hooks
pub struct InstrumentationScanner;

impl SignalScanner for InstrumentationScanner {
    type Output = Instrumentation;

    fn category(&self) -> &'static str {
        "instrumentation"
    }

    fn scan(&self, files: &[FileRecord], ceiling: usize) -> Instrumentation {
        let mut instrumentation = Instrumentation::default();

        for file in files {
            let Some(content) = file.scannable_text(ceiling) else {
                continue;
            };

            let hits = table_hits(&INSTRUMENTATION, content);
            for (kind, count) in &hits {
                match *kind {
                    "metrics" => instrumentation.metrics += count,
                    "tracing" => instrumentation.tracing += count,
                    "profiling" => instrumentation.profiling += count,
                    _ => {}
                }
            }

            if !hits.is_empty() {
                instrumentation.has_instrumentation = true;
                instrumentation.files.push(file.path.clone());
            }
        }

        instrumentation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_is_case_insensitive() {
        let files = vec![FileRecord::text(
            "telemetry.go",
            "import \"go.opentelemetry.io/otel\"\nvar Tracer = otel.Tracer(\"api\")\n",
        )];

        let instrumentation = InstrumentationScanner.scan(&files, 1_000_000);

        assert!(instrumentation.has_instrumentation);
        assert!(instrumentation.tracing >= 3);
        assert_eq!(instrumentation.metrics, 0);
        assert_eq!(instrumentation.files, vec!["telemetry.go"]);
    }
}
