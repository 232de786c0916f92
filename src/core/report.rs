use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tera::{Context, Tera};
use tracing::info;

use super::architecture::Architecture;
use super::llm::LlmAssessment;
use super::recommendations::Recommendation;
use super::scoring::{MaxScoreMap, ReadinessLevel, ScoreCard};
use super::signals::{
    CodeModularity, DependencyManagement, EnvironmentVariables, HealthChecks, Instrumentation,
    LoggingPractices, SecretsFindings, ServiceCoupling, Signals, StateManagement,
    TechnologyStack, TestingCoverage,
};
use crate::error::{CloudReadyError, Result};

const MARKDOWN_TEMPLATE: &str = include_str!("templates/report.md.tera");

pub const JSON_REPORT_FILE: &str = "cloud_readiness.json";
pub const MARKDOWN_REPORT_FILE: &str = "cloud_readiness.md";

/// Result of one analysis run. Assembled once, never updated.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub project_name: String,
    pub generated_at: DateTime<Utc>,
    pub files_analyzed: usize,
    pub batch_count: usize,
    pub technology_stack: TechnologyStack,
    pub architecture: Architecture,
    pub secrets: SecretsFindings,
    pub environment_variables: EnvironmentVariables,
    pub service_coupling: ServiceCoupling,
    pub logging_practices: LoggingPractices,
    pub state_management: StateManagement,
    pub code_modularity: CodeModularity,
    pub dependency_management: DependencyManagement,
    pub health_checks: HealthChecks,
    pub testing_coverage: TestingCoverage,
    pub instrumentation: Instrumentation,
    pub scores: ScoreCard,
    pub overall_score: u32,
    pub max_scores: MaxScoreMap,
    pub readiness_level: ReadinessLevel,
    pub recommendations: Vec<Recommendation>,
    pub llm_analysis: Option<LlmAssessment>,
}

impl Report {
    pub fn assemble(
        project_name: &str,
        batch_count: usize,
        signals: Signals,
        architecture: Architecture,
        scores: ScoreCard,
        recommendations: Vec<Recommendation>,
        llm_analysis: Option<LlmAssessment>,
    ) -> Self {
        let overall_score = scores.overall();
        Self {
            project_name: project_name.to_string(),
            generated_at: Utc::now(),
            files_analyzed: signals.file_count as usize,
            batch_count,
            technology_stack: signals.technology,
            architecture,
            secrets: signals.secrets,
            environment_variables: signals.environment,
            service_coupling: signals.coupling,
            logging_practices: signals.logging,
            state_management: signals.state,
            code_modularity: signals.modularity,
            dependency_management: signals.dependencies,
            health_checks: signals.health,
            testing_coverage: signals.testing,
            instrumentation: signals.instrumentation,
            scores,
            overall_score,
            max_scores: MaxScoreMap,
            readiness_level: ReadinessLevel::from_score(overall_score),
            recommendations,
            llm_analysis,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Markdown summary of the report
    pub fn render_markdown(&self) -> Result<String> {
        let mut context = Context::from_serialize(self)?;
        context.insert("factor_rows", &self.scores.factor_scores());
        Ok(Tera::one_off(MARKDOWN_TEMPLATE, &context, false)?)
    }

    /// Write the report in the requested format (`json`, `markdown` or `both`) into `dir`
    pub fn write_to(&self, dir: &Path, format: &str) -> Result<Vec<PathBuf>> {
        let (json, markdown) = match format {
            "json" => (true, false),
            "markdown" => (false, true),
            "both" => (true, true),
            other => {
                return Err(CloudReadyError::Config(format!("Unsupported output format: {}", other)))
            }
        };

        std::fs::create_dir_all(dir)?;
        let mut written = Vec::new();

        if json {
            let path = dir.join(JSON_REPORT_FILE);
            std::fs::write(&path, self.to_json()?)?;
            written.push(path);
        }
        if markdown {
            let path = dir.join(MARKDOWN_REPORT_FILE);
            std::fs::write(&path, self.render_markdown()?)?;
            written.push(path);
        }

        for path in &written {
            info!("Wrote {}", path.display());
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::architecture::classify;
    use crate::core::recommendations::generate;
    use crate::core::scoring::rule_scores;
    use serde_json::Value;

    fn sample_report(llm: Option<LlmAssessment>) -> Report {
        let mut signals = Signals {
            file_count: 3,
            ..Default::default()
        };
        signals.technology.languages.insert("python".into(), 2);
        signals.technology.containerization.insert("docker".into(), 1);
        signals.finalize();

        let architecture = classify(&signals);
        let scores = rule_scores(&signals);
        let recommendations = generate(&signals, &architecture, &scores, llm.as_ref());
        Report::assemble("demo", 1, signals, architecture, scores, recommendations, llm)
    }

    #[test]
    fn test_json_shape() {
        let report = sample_report(None);
        let value: Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(value["project_name"], "demo");
        assert_eq!(value["files_analyzed"], 3);
        assert_eq!(value["max_scores"]["language_compatibility"], 15);
        assert_eq!(value["max_scores"]["infrastructure_as_code"], 5);
        assert_eq!(value["scores"]["overall"], value["overall_score"]);
        assert_eq!(value["scores"].as_object().map(|m| m.len()), Some(15));
        assert_eq!(value["technology_stack"]["languages"]["python"], 2);
        assert!(value["llm_analysis"].is_null());
        assert!(value["readiness_level"].is_string());
    }

    #[test]
    fn test_markdown_lists_scores_and_recommendations() {
        let report = sample_report(Some(LlmAssessment::fallback("offline")));
        let markdown = report.render_markdown().unwrap();

        assert!(markdown.starts_with("# Cloud Readiness Report: demo"));
        assert!(markdown.contains("| containerization |"));
        assert!(markdown.contains("**HIGH**"));
        assert!(markdown.contains("## LLM Assessment"));
        assert!(markdown.contains("Error performing LLM analysis: offline"));
    }

    #[test]
    fn test_write_both_formats() {
        let dir = tempfile::tempdir().unwrap();
        let written = sample_report(None).write_to(dir.path(), "both").unwrap();

        assert_eq!(written.len(), 2);
        assert!(dir.path().join(JSON_REPORT_FILE).exists());
        assert!(dir.path().join(MARKDOWN_REPORT_FILE).exists());
        assert!(sample_report(None).write_to(dir.path(), "pdf").is_err());
    }
}
