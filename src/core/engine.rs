use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use super::analyzer::CloudReadinessAnalyzer;
use super::crawler::LocalCrawler;
use super::llm::json_repair::{backfill_required, unparseable_fallback};
use super::llm::{create_client, LlmAssessment, LlmAssessor, RepairChain};
use super::progress::{progress_channel, ProgressState, ANALYSIS_PHASES};
use crate::config::Config;

pub const CONFIG_FILE_NAME: &str = "cloudready.toml";

/// Command-line overrides for one `analyze` run
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    pub source: Option<PathBuf>,
    pub project_name: Option<String>,
    pub no_llm: bool,
    pub output: Option<PathBuf>,
    pub format: Option<String>,
    pub batch_size: Option<usize>,
}

/// Main orchestration engine for cloudready
pub struct Engine {
    config: Config,
}

impl Engine {
    /// Create a new engine instance from a config file or the defaults
    pub async fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load_or_default(config_path)?;
        debug!("Loaded configuration: {:?}", config);
        Ok(Self { config })
    }

    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Crawl, analyze and write the report; returns the written file paths
    pub async fn analyze(&self, options: AnalyzeOptions) -> Result<Vec<PathBuf>> {
        let mut config = self.config.clone();
        if let Some(batch_size) = options.batch_size {
            config.analysis.batch_size = batch_size;
        }
        if options.no_llm {
            config.analysis.use_llm = false;
        }

        let source = options.source.clone().unwrap_or_else(|| PathBuf::from("."));
        let project = options
            .project_name
            .clone()
            .or_else(|| config.project.name.clone())
            .unwrap_or_else(|| project_name_from(&source));
        let output_root = options.output.clone().unwrap_or_else(|| config.project.output_dir.clone());
        let format = options.format.clone().unwrap_or_else(|| config.output.format.clone());

        info!("🔍 Analyzing cloud readiness of {}", project);
        info!("Source: {}", source.display());

        let crawler = LocalCrawler::new(&source, &config.crawl);
        let files = tokio::task::spawn_blocking(move || crawler.crawl())
            .await
            .context("File crawler task failed")?
            .with_context(|| format!("Failed to crawl {}", source.display()))?;
        info!("Collected {} files", files.len());

        let use_llm = config.analysis.use_llm && config.llm.enabled;
        let mut analyzer = CloudReadinessAnalyzer::new(&config.analysis);
        if use_llm {
            match create_client(&config.llm) {
                Ok(client) => {
                    info!("✅ LLM integration enabled: {} ({})", client.provider_name(), client.model_name());
                    let assessor = LlmAssessor::new(client, Duration::from_secs(config.llm.timeout_secs))
                        .with_sampling(config.analysis.llm_sample_limit, config.analysis.llm_window_chars);
                    analyzer = analyzer.with_llm(assessor);
                }
                Err(e) => {
                    warn!("⚠️ Failed to initialize LLM client: {}", e);
                    warn!("Continuing with rule-based scores only");
                }
            }
        } else {
            debug!("LLM analysis disabled");
        }

        let (reporter, tracker) = progress_channel(&ANALYSIS_PHASES);
        let watcher = tokio::spawn(log_phase_changes(tracker.subscribe()));
        let tracker = tokio::spawn(tracker.run());

        let analyzer = analyzer.with_progress(reporter);
        let result = analyzer.analyze(files, &project, use_llm).await;
        drop(analyzer);

        let final_state = tracker.await.context("Progress tracker task failed")?;
        watcher.abort();
        debug!("Final progress: {:.0}% ({:?})", final_state.overall_progress, final_state.status);

        let report = result.context("Cloud readiness analysis failed")?;
        let report_dir = output_root.join(&project);
        let written = report.write_to(&report_dir, &format)?;

        info!(
            "✅ {}: {} (overall {}/100, {} recommendations)",
            project,
            report.readiness_level,
            report.overall_score,
            report.recommendations.len()
        );
        Ok(written)
    }

    /// Write a default configuration file
    pub async fn init(&self, path: Option<PathBuf>) -> Result<PathBuf> {
        let target_dir = match path {
            Some(path) => path,
            None => std::env::current_dir().context("Cannot determine the current directory")?,
        };
        info!("Initializing cloudready in: {}", target_dir.display());

        std::fs::create_dir_all(&target_dir)?;
        let config_path = target_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            warn!("{} already exists, leaving it untouched", config_path.display());
            return Ok(config_path);
        }

        Config::default().save(&config_path)?;
        info!("✅ Wrote {}", config_path.display());
        Ok(config_path)
    }

    /// Run the JSON repair chain on a saved LLM response and return the normalized
    /// assessment as pretty JSON
    pub async fn repair_json(&self, file: &Path) -> Result<String> {
        let raw = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;

        let mut value = match RepairChain::standard().run(&raw) {
            Ok(recovered) => {
                info!("Recovered JSON with the '{}' stage", recovered.stage);
                recovered.value
            }
            Err(failure) => {
                warn!("No JSON recovered ({}), using the fallback", failure.message);
                unparseable_fallback(&failure.message)
            }
        };
        backfill_required(&mut value);

        let assessment = LlmAssessment::from_value(value);
        Ok(serde_json::to_string_pretty(&assessment)?)
    }
}

fn project_name_from(source: &Path) -> String {
    source
        .canonicalize()
        .ok()
        .and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "project".to_string())
}

async fn log_phase_changes(mut snapshots: tokio::sync::watch::Receiver<ProgressState>) {
    let mut last_phase: Option<String> = None;
    while snapshots.changed().await.is_ok() {
        let state = snapshots.borrow_and_update().clone();
        if state.current_phase != last_phase {
            if let Some(phase) = &state.current_phase {
                info!("[{:>3.0}%] {}", state.overall_progress, phase);
            }
            last_phase = state.current_phase;
        }
    }
}
