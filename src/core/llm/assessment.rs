use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::json_repair::recover_object;
use super::LlmClient;
use crate::core::model::FileRecord;
use crate::core::patterns::LLM_PRIORITY_FILES;
use crate::core::scoring::Factor;
use crate::error::CloudReadyError;

const NEUTRAL_FACTOR_SCORE: f64 = 5.0;
const TRUNCATION_MARKER: &str = "\n\n[...content truncated...]\n\n";

/// Factor names the model tends to invent, mapped to the fixed factor keys
const FACTOR_ALIASES: &[(&str, &str)] = &[
    ("language_runtime_compatibility", "language_compatibility"),
    ("configuration_management", "configuration"),
    ("environment_variables", "configuration"),
    ("external_service_coupling", "service_coupling"),
    ("logging_observability", "logging_practices"),
    ("cloud_sdk_usage", "cloud_integration"),
    ("test_coverage", "testing"),
    ("iac", "infrastructure_as_code"),
];

/// One factor as judged by the model, on its 1-10 scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmFactor {
    pub score: Option<f64>,
    pub reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<String>,
}

impl LlmFactor {
    fn neutral() -> Self {
        Self {
            score: Some(NEUTRAL_FACTOR_SCORE),
            reasoning: String::new(),
            recommendations: None,
        }
    }

    fn from_entry(entry: &Value) -> Self {
        let Some(map) = entry.as_object() else {
            return Self::neutral();
        };

        Self {
            score: map.get("score").map_or(Some(NEUTRAL_FACTOR_SCORE), score_value),
            reasoning: map
                .get("reasoning")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            recommendations: map.get("recommendations").and_then(recommendation_text),
        }
    }
}

/// The secondary assessment, normalized from whatever the model returned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmAssessment {
    pub factors: BTreeMap<String, LlmFactor>,
    pub overall_score: f64,
    pub readiness_level: String,
    pub summary: String,
    pub key_strengths: Vec<String>,
    pub key_weaknesses: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LlmAssessment {
    /// Neutral assessment used when the call itself failed
    pub fn fallback(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            factors: BTreeMap::new(),
            overall_score: 50.0,
            readiness_level: "Cloud-Friendly".to_string(),
            summary: format!("Error performing LLM analysis: {error}"),
            key_strengths: vec!["Unable to determine due to error".to_string()],
            key_weaknesses: vec!["Unable to determine due to error".to_string()],
            error: Some(error),
        }
    }

    /// Normalize a recovered JSON object: factor names are lowercased and aliased, and
    /// malformed factor entries are coerced to a neutral score
    pub fn from_value(value: Value) -> Self {
        Self {
            factors: normalize_factors(value.get("factors")),
            overall_score: value.get("overall_score").and_then(score_value).unwrap_or(50.0),
            readiness_level: value
                .get("readiness_level")
                .and_then(Value::as_str)
                .unwrap_or("Cloud-Friendly")
                .to_string(),
            summary: value
                .get("summary")
                .and_then(Value::as_str)
                .unwrap_or("Analysis completed with limited data.")
                .to_string(),
            key_strengths: string_list(value.get("key_strengths")),
            key_weaknesses: string_list(value.get("key_weaknesses")),
            error: value.get("error").and_then(Value::as_str).map(str::to_string),
        }
    }

    /// Recover and normalize a raw model response
    pub fn from_response(raw: &str) -> Self {
        Self::from_value(recover_object(raw))
    }

    /// Scores for the fixed factors only; unknown names and missing scores are dropped
    pub fn factor_scores(&self) -> BTreeMap<Factor, f64> {
        self.factors
            .iter()
            .filter_map(|(name, factor)| Some((Factor::from_key(name)?, factor.score?)))
            .collect()
    }
}

pub fn canonical_factor_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    FACTOR_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(lowered)
}

fn normalize_factors(raw: Option<&Value>) -> BTreeMap<String, LlmFactor> {
    let mut factors = BTreeMap::new();
    let Some(map) = raw.and_then(Value::as_object) else {
        return factors;
    };

    // Keys already spelled canonically take precedence over aliases
    let mut exact = BTreeSet::new();
    for (name, entry) in map {
        let canonical = canonical_factor_name(name);
        let is_exact = name.trim().to_lowercase() == canonical;

        if !is_exact && exact.contains(&canonical) {
            debug!("Ignoring aliased factor '{}', '{}' already present", name, canonical);
            continue;
        }
        if is_exact {
            exact.insert(canonical.clone());
        }
        factors.insert(canonical, LlmFactor::from_entry(entry));
    }

    factors
}

fn score_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn recommendation_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("; "),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Text files for the prompt: infrastructure and config files first, then the rest in
/// crawl order
pub fn sample_files(files: &[FileRecord], limit: usize) -> Vec<&FileRecord> {
    let (priority, rest): (Vec<&FileRecord>, Vec<&FileRecord>) = files
        .iter()
        .filter(|file| file.as_text().is_some())
        .partition(|file| LLM_PRIORITY_FILES.iter().any(|re| re.is_match(&file.path)));

    priority.into_iter().chain(rest).take(limit).collect()
}

/// Keep the head and tail of long content
pub fn truncate_middle(content: &str, window: usize) -> Cow<'_, str> {
    let total = content.chars().count();
    if total <= window {
        return Cow::Borrowed(content);
    }

    let half = window / 2;
    let head: String = content.chars().take(half).collect();
    let tail: String = content.chars().skip(total - half).collect();
    Cow::Owned(format!("{head}{TRUNCATION_MARKER}{tail}"))
}

pub fn build_prompt(project: &str, files: &[&FileRecord], window: usize) -> String {
    let mut listing = String::new();
    for file in files {
        let content = file.as_text().unwrap_or_default();
        listing.push_str(&format!(
            "--- File: {} ---\n{}\n\n",
            file.path,
            truncate_middle(content, window)
        ));
    }

    let factor_keys: Vec<&str> = Factor::ALL.iter().map(|f| f.key()).collect();
    let factor_schema = factor_keys
        .iter()
        .map(|key| {
            format!(
                "    \"{key}\": {{\"score\": <1-10>, \"reasoning\": \"<why>\", \"recommendations\": \"<what to change>\"}}"
            )
        })
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        r#"Assess how ready the project "{project}" is to run in the cloud, based on the files below.

Score each factor from 1 (poor) to 10 (excellent):
{factors}

Readiness levels:
- Cloud-Native: designed for the cloud (containers, stateless services, IaC, observability)
- Cloud-Ready: can be deployed with minor changes
- Cloud-Friendly: deployable after moderate refactoring
- Cloud-Challenged: needs significant work before it can run in the cloud

Answer with a single JSON object and nothing else, using exactly this structure:
{{
  "factors": {{
{factor_schema}
  }},
  "overall_score": <0-100>,
  "readiness_level": "<Cloud-Native | Cloud-Ready | Cloud-Friendly | Cloud-Challenged>",
  "summary": "<two or three sentences>",
  "key_strengths": ["<strength>"],
  "key_weaknesses": ["<weakness>"]
}}

Files:

{listing}"#,
        factors = factor_keys.join(", "),
    )
}

/// Runs the secondary assessment. Never fails: any error or timeout becomes the neutral
/// fallback assessment.
#[derive(Clone)]
pub struct LlmAssessor {
    client: Arc<dyn LlmClient>,
    timeout: Duration,
    sample_limit: usize,
    window: usize,
}

impl LlmAssessor {
    pub fn new(client: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            sample_limit: 10,
            window: 4000,
        }
    }

    pub fn with_sampling(mut self, sample_limit: usize, window: usize) -> Self {
        self.sample_limit = sample_limit;
        self.window = window;
        self
    }

    pub fn prompt(&self, files: &[FileRecord], project: &str) -> String {
        let sample = sample_files(files, self.sample_limit);
        debug!("Sampled {} files for the LLM prompt", sample.len());
        build_prompt(project, &sample, self.window)
    }

    pub async fn assess(&self, files: &[FileRecord], project: &str) -> LlmAssessment {
        let prompt = self.prompt(files, project);
        self.assess_prompt(&prompt).await
    }

    pub async fn assess_prompt(&self, prompt: &str) -> LlmAssessment {
        info!(
            "Requesting LLM assessment from {} ({})",
            self.client.provider_name(),
            self.client.model_name()
        );

        let response = match tokio::time::timeout(self.timeout, self.client.complete(prompt)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!("LLM assessment failed: {}", e);
                return LlmAssessment::fallback(e.to_string());
            }
            Err(_) => {
                let e = CloudReadyError::LlmTimeout(self.timeout.as_secs());
                warn!("{}", e);
                return LlmAssessment::fallback(e.to_string());
            }
        };

        LlmAssessment::from_response(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use async_trait::async_trait;
    use serde_json::json;

    struct FixedClient(std::result::Result<String, String>);

    #[async_trait]
    impl LlmClient for FixedClient {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            self.0.clone().map_err(CloudReadyError::Llm)
        }

        fn provider_name(&self) -> &str {
            "fixed"
        }

        fn model_name(&self) -> &str {
            "test"
        }
    }

    struct SlowClient;

    #[async_trait]
    impl LlmClient for SlowClient {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("{}".to_string())
        }

        fn provider_name(&self) -> &str {
            "slow"
        }

        fn model_name(&self) -> &str {
            "test"
        }
    }

    #[test]
    fn test_aliases_and_coercion() {
        let assessment = LlmAssessment::from_value(json!({
            "factors": {
                "IaC": {"score": 7, "reasoning": "Terraform present"},
                "test_coverage": "good",
                "Logging_Observability": {"score": "6", "recommendations": ["Use JSON logs", "Add request ids"]},
                "cloud_integration": {"reasoning": "no score given"},
                "ci_cd": {"score": null}
            }
        }));

        let factors = &assessment.factors;
        assert_eq!(factors["infrastructure_as_code"].score, Some(7.0));
        assert_eq!(factors["testing"], LlmFactor::neutral());
        assert_eq!(factors["logging_practices"].score, Some(6.0));
        assert_eq!(
            factors["logging_practices"].recommendations.as_deref(),
            Some("Use JSON logs; Add request ids")
        );
        assert_eq!(factors["cloud_integration"].score, Some(5.0));
        assert_eq!(factors["ci_cd"].score, None);

        let scores = assessment.factor_scores();
        assert_eq!(scores.get(&Factor::InfrastructureAsCode), Some(&7.0));
        assert!(!scores.contains_key(&Factor::CiCd));
        assert_eq!(assessment.readiness_level, "Cloud-Friendly");
    }

    #[test]
    fn test_canonical_key_beats_alias() {
        let assessment = LlmAssessment::from_value(json!({
            "factors": {
                "configuration": {"score": 9},
                "configuration_management": {"score": 2},
                "environment_variables": {"score": 3}
            }
        }));

        assert_eq!(assessment.factors.len(), 1);
        assert_eq!(assessment.factors["configuration"].score, Some(9.0));
    }

    #[test]
    fn test_unknown_factors_are_kept_but_not_scored() {
        let assessment = LlmAssessment::from_value(json!({
            "factors": {"security_posture": {"score": 4}}
        }));

        assert!(assessment.factors.contains_key("security_posture"));
        assert!(assessment.factor_scores().is_empty());
    }

    #[test]
    fn test_sampling_prefers_infrastructure_files() {
        let files = vec![
            FileRecord::text("src/lib.rs", "fn a() {}"),
            FileRecord::binary("assets/logo.png"),
            FileRecord::text("src/util.rs", "fn b() {}"),
            FileRecord::text("Dockerfile", "FROM rust"),
            FileRecord::text("deploy/k8s/service.yaml", "kind: Service"),
        ];

        let sample: Vec<&str> = sample_files(&files, 3).iter().map(|f| f.path.as_str()).collect();
        assert_eq!(sample, vec!["Dockerfile", "deploy/k8s/service.yaml", "src/lib.rs"]);
    }

    #[test]
    fn test_truncate_middle_keeps_head_and_tail() {
        let content = format!("{}{}", "a".repeat(30), "é".repeat(30));
        let truncated = truncate_middle(&content, 20);

        assert!(truncated.starts_with(&"a".repeat(10)));
        assert!(truncated.ends_with(&"é".repeat(10)));
        assert!(truncated.contains("[...content truncated...]"));
        assert_eq!(truncate_middle("short", 20), "short");
    }

    #[test]
    fn test_prompt_lists_factor_keys_and_files() {
        let files = vec![FileRecord::text("app.py", "import flask")];
        let assessor = LlmAssessor::new(
            Arc::new(FixedClient(Ok(String::new()))),
            Duration::from_secs(1),
        );
        let prompt = assessor.prompt(&files, "demo");

        assert!(prompt.contains("\"demo\""));
        assert!(prompt.contains("--- File: app.py ---"));
        for factor in Factor::ALL {
            assert!(prompt.contains(factor.key()));
        }
    }

    #[tokio::test]
    async fn test_messy_response_is_recovered() {
        let response = "Sure! ```json\n{\"factors\": {\"testing\": {\"score\": 8, \"reasoning\": Good coverage}}, \"overall_score\": 70}\n```";
        let assessor = LlmAssessor::new(
            Arc::new(FixedClient(Ok(response.to_string()))),
            Duration::from_secs(1),
        );

        let assessment = assessor.assess(&[], "demo").await;
        assert_eq!(assessment.factors["testing"].score, Some(8.0));
        assert_eq!(assessment.factors["testing"].reasoning, "Good coverage");
        assert_eq!(assessment.overall_score, 70.0);
        assert_eq!(assessment.error, None);
    }

    #[tokio::test]
    async fn test_client_error_becomes_fallback() {
        let assessor = LlmAssessor::new(
            Arc::new(FixedClient(Err("connection refused".to_string()))),
            Duration::from_secs(1),
        );

        let assessment = assessor.assess(&[], "demo").await;
        assert!(assessment.factors.is_empty());
        assert_eq!(assessment.overall_score, 50.0);
        assert!(assessment.summary.starts_with("Error performing LLM analysis"));
        assert!(assessment.error.is_some_and(|e| e.contains("connection refused")));
    }

    #[tokio::test]
    async fn test_timeout_becomes_fallback() {
        let assessor = LlmAssessor::new(Arc::new(SlowClient), Duration::from_millis(100));

        let assessment = assessor.assess(&[], "demo").await;
        assert!(assessment.error.is_some_and(|e| e.contains("timed out")));
        assert_eq!(assessment.readiness_level, "Cloud-Friendly");
    }
}
