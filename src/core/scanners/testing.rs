use super::{table_hits, SignalScanner};
use crate::core::model::FileRecord;
use crate::core::patterns::TESTING;
use crate::core::signals::TestingCoverage;

/// Test files (by path) and unit, integration and mocking constructs (by content)
pub struct TestingScanner;

fn is_test_path(path: &str) -> bool {
    let lower = path.to_lowercase();
    lower.contains("test") || lower.contains("spec")
}

impl SignalScanner for TestingScanner {
    type Output = TestingCoverage;

    fn category(&self) -> &'static str {
        "testing_coverage"
    }

    fn scan(&self, files: &[FileRecord], ceiling: usize) -> TestingCoverage {
        let mut testing = TestingCoverage::default();

        for file in files {
            let mut recorded = false;
            if is_test_path(&file.path) {
                testing.test_files += 1;
                testing.has_tests = true;
                testing.files.push(file.path.clone());
                recorded = true;
            }

            let Some(content) = file.scannable_text(ceiling) else {
                continue;
            };

            let hits = table_hits(&TESTING, content);
            for (kind, count) in &hits {
                match *kind {
                    "unit_tests" => testing.unit_tests += count,
                    "integration_tests" => testing.integration_tests += count,
                    "mocking" => testing.mocking += count,
                    _ => {}
                }
            }

            if !hits.is_empty() {
                testing.has_tests = true;
                if !recorded {
                    testing.files.push(file.path.clone());
                }
            }
        }

        testing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_file_recorded_once() {
        let files = vec![
            FileRecord::text(
                "tests/test_orders.py",
                "from unittest.mock import patch\n\ndef test_create():\n    pass\n",
            ),
            FileRecord::text("src/orders.py", "def create():\n    pass\n"),
        ];

        let testing = TestingScanner.scan(&files, 1_000_000);

        assert!(testing.has_tests);
        assert_eq!(testing.test_files, 1);
        assert_eq!(testing.unit_tests, 1);
        assert_eq!(testing.mocking, 1);
        assert_eq!(testing.files, vec!["tests/test_orders.py"]);
    }
}
