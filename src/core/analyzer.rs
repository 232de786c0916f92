//! Orchestration of one analysis run: batch scanning, merge, classification, scoring and
//! recommendations, with the optional LLM assessment running alongside the scan.

use std::sync::Arc;

use serde_json::json;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use super::architecture::classify;
use super::batch::{partition, Batch};
use super::llm::{LlmAssessment, LlmAssessor};
use super::model::FileRecord;
use super::progress::ProgressReporter;
use super::recommendations::generate;
use super::report::Report;
use super::scanners::ScanSuite;
use super::scoring::{blend, rule_scores};
use super::signals::{merge_batches, Signals};
use crate::config::AnalysisConfig;
use crate::error::{CloudReadyError, Result};

pub struct CloudReadinessAnalyzer {
    suite: ScanSuite,
    batch_size: usize,
    assessor: Option<LlmAssessor>,
    progress: ProgressReporter,
}

impl CloudReadinessAnalyzer {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            suite: ScanSuite::new(config.content_size_ceiling),
            batch_size: config.batch_size,
            assessor: None,
            progress: ProgressReporter::disabled(),
        }
    }

    pub fn with_llm(mut self, assessor: LlmAssessor) -> Self {
        self.assessor = Some(assessor);
        self
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Analyze a crawled file list. The only error for valid input is an empty list; LLM
    /// failures are absorbed into the fallback assessment.
    pub async fn analyze(&self, files: Vec<FileRecord>, project: &str, use_llm: bool) -> Result<Report> {
        let result = self.run(files, project, use_llm).await;
        match &result {
            Ok(report) => {
                self.progress.completed();
                info!(
                    "Analysis of {} finished: {} ({}/100)",
                    project, report.readiness_level, report.overall_score
                );
            }
            Err(e) => self.progress.failed(e.to_string()),
        }
        result
    }

    async fn run(&self, files: Vec<FileRecord>, project: &str, use_llm: bool) -> Result<Report> {
        self.progress.phase("setup");
        if files.is_empty() {
            return Err(CloudReadyError::NoFiles);
        }

        let files: Arc<[FileRecord]> = files.into();
        let batches = partition(files.len(), self.batch_size);
        info!("Analyzing {} files of {} in {} batches", files.len(), project, batches.len());
        self.progress.detail(
            "input",
            json!({"project": project, "files": files.len(), "batches": batches.len()}),
        );

        // Independent of the scan, so it starts first
        let llm_task = self.spawn_assessment(&files, project, use_llm);

        self.progress.phase("signal_scanning");
        let batch_count = batches.len();
        let per_batch = self.scan_batches(Arc::clone(&files), batches).await?;

        self.progress.phase("batch_merge");
        let signals = merge_batches(per_batch);
        debug!("Merged signals from {} batches", batch_count);

        self.progress.phase("architecture_analysis");
        let architecture = classify(&signals);
        self.progress.detail("architecture", json!(architecture));

        self.progress.phase("llm_analysis");
        let llm = match llm_task {
            Some(handle) => Some(handle.await.unwrap_or_else(|e| {
                warn!("LLM assessment task failed: {}", e);
                LlmAssessment::fallback(e.to_string())
            })),
            None => None,
        };

        self.progress.phase("score_calculation");
        let rule = rule_scores(&signals);
        let scores = match &llm {
            Some(assessment) => blend(&rule, &assessment.factor_scores()),
            None => rule,
        };

        self.progress.phase("recommendation_generation");
        let recommendations = generate(&signals, &architecture, &scores, llm.as_ref());

        Ok(Report::assemble(
            project,
            batch_count,
            signals,
            architecture,
            scores,
            recommendations,
            llm,
        ))
    }

    fn spawn_assessment(
        &self,
        files: &[FileRecord],
        project: &str,
        use_llm: bool,
    ) -> Option<JoinHandle<LlmAssessment>> {
        if !use_llm {
            return None;
        }
        let Some(assessor) = self.assessor.clone() else {
            warn!("LLM analysis requested but no LLM client is configured; using rule scores only");
            return None;
        };

        let prompt = assessor.prompt(files, project);
        Some(tokio::spawn(async move { assessor.assess_prompt(&prompt).await }))
    }

    /// Scan every batch on the blocking pool and return the results in batch order
    async fn scan_batches(&self, files: Arc<[FileRecord]>, batches: Vec<Batch>) -> Result<Vec<Signals>> {
        self.progress.item_total(batches.len() as u64);

        let mut slots: Vec<Option<Signals>> = vec![None; batches.len()];
        let mut workers = JoinSet::new();

        for batch in batches {
            let files = Arc::clone(&files);
            let suite = self.suite;
            workers.spawn_blocking(move || {
                let signals = suite.scan_batch(&files[batch.range.clone()]);
                (batch.index, signals)
            });
        }

        while let Some(joined) = workers.join_next().await {
            let (index, signals) = joined.map_err(|e| CloudReadyError::Task(e.to_string()))?;
            self.progress.merge_detail(
                "scanning",
                json!({
                    "files_scanned": signals.file_count,
                    "secrets_found": signals.secrets.secrets_count,
                    "files_with_secrets": signals.secrets.files_with_secrets,
                }),
            );
            self.progress.increment(1);
            slots[index] = Some(signals);
        }

        Ok(slots.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::llm::LlmClient;
    use crate::core::progress::{progress_channel, RunStatus, ANALYSIS_PHASES};
    use crate::core::scoring::Factor;
    use async_trait::async_trait;
    use std::time::Duration;

    struct CannedClient(&'static str);

    #[async_trait]
    impl LlmClient for CannedClient {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }

        fn provider_name(&self) -> &str {
            "canned"
        }

        fn model_name(&self) -> &str {
            "test"
        }
    }

    fn sample_files() -> Vec<FileRecord> {
        vec![
            FileRecord::text("Dockerfile", "FROM python:3.12\nWORKDIR /app"),
            FileRecord::text("docker-compose.yml", "services:\n  api:\n    build: ."),
            FileRecord::text(
                "app/settings.py",
                "import os\nDB = os.environ.get('DATABASE_URL')\nAWS_SECRET_ACCESS_KEY = 'abcdefghijklmnopqrstuvwxyz0123456789ABCD'\n",
            ),
            FileRecord::text("app/main.py", "import logging\nlogging.info('started')\n"),
            FileRecord::binary("static/logo.png"),
        ]
    }

    fn analyzer(batch_size: usize) -> CloudReadinessAnalyzer {
        CloudReadinessAnalyzer::new(&AnalysisConfig {
            batch_size,
            ..AnalysisConfig::default()
        })
    }

    #[tokio::test]
    async fn test_empty_input_is_fatal() {
        let result = analyzer(50).analyze(Vec::new(), "empty", false).await;
        assert!(matches!(result, Err(CloudReadyError::NoFiles)));
    }

    #[tokio::test]
    async fn test_batch_size_does_not_change_totals() {
        let whole = analyzer(50).analyze(sample_files(), "demo", false).await.unwrap();
        let split = analyzer(1).analyze(sample_files(), "demo", false).await.unwrap();

        assert_eq!(whole.batch_count, 1);
        assert_eq!(split.batch_count, 5);
        assert_eq!(whole.files_analyzed, 5);
        assert_eq!(whole.secrets, split.secrets);
        assert_eq!(whole.environment_variables, split.environment_variables);
        assert_eq!(whole.technology_stack, split.technology_stack);
        assert_eq!(whole.scores, split.scores);
        assert_eq!(split.secrets.files_with_secrets, vec!["app/settings.py".to_string()]);
    }

    #[tokio::test]
    async fn test_docker_and_compose_without_kubernetes() {
        let report = analyzer(2).analyze(sample_files(), "demo", false).await.unwrap();

        assert_eq!(report.scores.get(Factor::Containerization), 10.0);
        assert!(report.llm_analysis.is_none());
    }

    #[tokio::test]
    async fn test_llm_scores_are_blended() {
        let client = CannedClient(r#"{"factors": {"ci_cd": {"score": 10, "reasoning": "ok", "recommendations": "Cache builds"}}}"#);
        let assessor = LlmAssessor::new(Arc::new(client), Duration::from_secs(5));
        let report = analyzer(50)
            .with_llm(assessor)
            .analyze(sample_files(), "demo", true)
            .await
            .unwrap();

        // No CI signals: rule score 0, LLM 10/10 of a max of 10
        assert_eq!(report.scores.get(Factor::CiCd), 4.0);
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.category == "ci_cd" && r.description == "Cache builds"));
    }

    #[tokio::test]
    async fn test_use_llm_without_client_falls_back_to_rules() {
        let report = analyzer(50).analyze(sample_files(), "demo", true).await.unwrap();
        assert!(report.llm_analysis.is_none());
    }

    #[tokio::test]
    async fn test_progress_reaches_completion() {
        let (reporter, tracker) = progress_channel(&ANALYSIS_PHASES);
        let handle = tokio::spawn(tracker.run());

        let analyzer = analyzer(2).with_progress(reporter);
        analyzer.analyze(sample_files(), "demo", false).await.unwrap();
        drop(analyzer);

        let state = handle.await.unwrap();
        assert_eq!(state.status, RunStatus::Completed);
        assert_eq!(state.overall_progress, 100.0);
        assert_eq!(state.current_phase.as_deref(), Some("recommendation_generation"));
        assert_eq!(state.detailed_status["scanning"]["files_scanned"], 5);
    }
}
