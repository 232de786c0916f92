use once_cell::sync::Lazy;

use super::SignalScanner;
use crate::core::model::FileRecord;
use crate::core::patterns::{
    PatternTable, CICD, CLOUD_SERVICES, CONTAINERIZATION, DATABASES, FRAMEWORKS, IAC, LANGUAGES,
    MONITORING,
};
use crate::core::signals::TechnologyStack;

/// Languages, frameworks, databases, cloud services, containers, CI/CD, monitoring and IaC.
///
/// Every pattern is tried against the path and, separately, the content; each side that
/// matches adds one hit for the technology.
pub struct TechnologyScanner;

static CATEGORIES: [(&str, &Lazy<PatternTable>); 8] = [
    ("languages", &LANGUAGES),
    ("frameworks", &FRAMEWORKS),
    ("databases", &DATABASES),
    ("cloud_services", &CLOUD_SERVICES),
    ("containerization", &CONTAINERIZATION),
    ("cicd", &CICD),
    ("monitoring", &MONITORING),
    ("iac", &IAC),
];

impl SignalScanner for TechnologyScanner {
    type Output = TechnologyStack;

    fn category(&self) -> &'static str {
        "technology_stack"
    }

    fn scan(&self, files: &[FileRecord], ceiling: usize) -> TechnologyStack {
        let mut stack = TechnologyStack::default();

        for file in files {
            let content = file.scannable_text(ceiling);

            for (category, table) in CATEGORIES.iter() {
                let Some(counter) = stack.category_mut(category) else {
                    continue;
                };

                for (tech, regexes) in table.entries() {
                    for regex in regexes {
                        let mut hits = 0;
                        if regex.is_match(&file.path) {
                            hits += 1;
                        }
                        if content.is_some_and(|text| regex.is_match(text)) {
                            hits += 1;
                        }
                        if hits > 0 {
                            *counter.entry(tech.to_string()).or_insert(0) += hits;
                        }
                    }
                }
            }
        }

        stack
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_docker_and_compose_without_kubernetes() {
        let files = vec![
            FileRecord::text("Dockerfile", "FROM python:3.12\nWORKDIR /app\nCMD [\"python\", \"main.py\"]\n"),
            FileRecord::text("docker-compose.yml", "services:\n  web:\n    build: .\n"),
        ];

        let stack = TechnologyScanner.scan(&files, 1_000_000);

        assert!(stack.containerization["docker"] > 0);
        assert!(!stack.containerization.contains_key("kubernetes"));
    }

    #[test]
    fn test_path_and_content_hits_are_counted_separately() {
        let files = vec![FileRecord::text("infra/main.tf", "terraform {}\n")];
        let stack = TechnologyScanner.scan(&files, 1_000_000);

        // `\.tf$` on the path, `terraform` on the content
        assert_eq!(stack.iac["terraform"], 2);
        assert_eq!(stack.languages["terraform"], 1);
    }

    #[test]
    fn test_oversized_content_only_counts_path() {
        let files = vec![FileRecord::text("big.py", "import boto3\n")];
        let stack = TechnologyScanner.scan(&files, 4);

        assert_eq!(stack.languages["python"], 1);
        assert!(stack.cloud_services.is_empty());
    }
}
