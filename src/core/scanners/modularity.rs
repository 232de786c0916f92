use super::{table_hits, SignalScanner};
use crate::core::model::FileRecord;
use crate::core::patterns::MODULARITY;
use crate::core::signals::CodeModularity;

/// Classes, functions and module boundaries, plus text size for the average file size.
///
/// Size is tallied for every text file; patterns only run on content under the ceiling.
pub struct ModularityScanner;

impl SignalScanner for ModularityScanner {
    type Output = CodeModularity;

    fn category(&self) -> &'static str {
        "code_modularity"
    }

    fn scan(&self, files: &[FileRecord], ceiling: usize) -> CodeModularity {
        let mut modularity = CodeModularity::default();

        for file in files {
            let Some(text) = file.as_text() else {
                continue;
            };

            modularity.file_count += 1;
            modularity.total_size += text.chars().count() as u64;

            let Some(content) = file.scannable_text(ceiling) else {
                continue;
            };

            for (kind, count) in table_hits(&MODULARITY, content) {
                match kind {
                    "classes" => modularity.classes += count,
                    "functions" => modularity.functions += count,
                    "modules" => modularity.modules += count,
                    _ => {}
                }
            }
        }

        modularity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_definitions_and_sizes() {
        let files = vec![
            FileRecord::text("svc.py", "import os\n\nclass Service:\n    def run(self):\n        pass\n"),
            FileRecord::text("big.js", "x".repeat(20)),
            FileRecord::binary("logo.png"),
        ];

        let modularity = ModularityScanner.scan(&files, 10_000);

        assert_eq!(modularity.classes, 1);
        assert_eq!(modularity.functions, 1);
        assert_eq!(modularity.modules, 1);
        assert_eq!(modularity.file_count, 2);
    }
}
