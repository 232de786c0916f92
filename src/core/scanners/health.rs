use super::{count_matches, SignalScanner};
use crate::core::model::FileRecord;
use crate::core::patterns::HEALTH_CHECKS;
use crate::core::signals::HealthChecks;

/// Health, readiness and liveness endpoints. The first matching pattern decides a file.
pub struct HealthCheckScanner;

impl SignalScanner for HealthCheckScanner {
    type Output = HealthChecks;

    fn category(&self) -> &'static str {
        "health_checks"
    }

    fn scan(&self, files: &[FileRecord], ceiling: usize) -> HealthChecks {
        let mut health = HealthChecks::default();

        for file in files {
            let Some(content) = file.scannable_text(ceiling) else {
                continue;
            };

            for regex in HEALTH_CHECKS.iter() {
                let matches = count_matches(regex, content);
                if matches > 0 {
                    health.has_health_endpoints = true;
                    health.count += matches;
                    health.files.push(file.path.clone());
                    break;
                }
            }
        }

        health
    }
}
