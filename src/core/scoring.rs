//! Factor scores: rule-based calculation, LLM blending and readiness tiers.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use super::signals::{hits, total, Signals};

/// The fourteen scored factors, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    LanguageCompatibility,
    Containerization,
    CiCd,
    Configuration,
    CloudIntegration,
    ServiceCoupling,
    LoggingPractices,
    StateManagement,
    CodeModularity,
    DependencyManagement,
    HealthChecks,
    Testing,
    Instrumentation,
    InfrastructureAsCode,
}

impl Factor {
    pub const ALL: [Factor; 14] = [
        Factor::LanguageCompatibility,
        Factor::Containerization,
        Factor::CiCd,
        Factor::Configuration,
        Factor::CloudIntegration,
        Factor::ServiceCoupling,
        Factor::LoggingPractices,
        Factor::StateManagement,
        Factor::CodeModularity,
        Factor::DependencyManagement,
        Factor::HealthChecks,
        Factor::Testing,
        Factor::Instrumentation,
        Factor::InfrastructureAsCode,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Factor::LanguageCompatibility => "language_compatibility",
            Factor::Containerization => "containerization",
            Factor::CiCd => "ci_cd",
            Factor::Configuration => "configuration",
            Factor::CloudIntegration => "cloud_integration",
            Factor::ServiceCoupling => "service_coupling",
            Factor::LoggingPractices => "logging_practices",
            Factor::StateManagement => "state_management",
            Factor::CodeModularity => "code_modularity",
            Factor::DependencyManagement => "dependency_management",
            Factor::HealthChecks => "health_checks",
            Factor::Testing => "testing",
            Factor::Instrumentation => "instrumentation",
            Factor::InfrastructureAsCode => "infrastructure_as_code",
        }
    }

    pub fn from_key(key: &str) -> Option<Factor> {
        Factor::ALL.into_iter().find(|factor| factor.key() == key)
    }

    /// Maximum points for the factor; all maxima sum to 100
    pub fn max_score(self) -> f64 {
        match self {
            Factor::LanguageCompatibility | Factor::Containerization => 15.0,
            Factor::CiCd | Factor::Configuration | Factor::CloudIntegration => 10.0,
            _ => 5.0,
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// The fixed factor maxima, serialized by key in canonical order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaxScoreMap;

impl MaxScoreMap {
    pub fn total() -> f64 {
        Factor::ALL.iter().map(|factor| factor.max_score()).sum()
    }
}

impl Serialize for MaxScoreMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Factor::ALL.len()))?;
        for factor in Factor::ALL {
            map.serialize_entry(factor.key(), &(factor.max_score() as u64))?;
        }
        map.end()
    }
}

/// One factor's value next to its ceiling
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorScore {
    pub name: String,
    pub value: f64,
    pub max: f64,
}

/// Per-factor values plus the overall 0-100 score.
///
/// Serializes as a flat map: every factor key, then `overall`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreCard {
    values: BTreeMap<Factor, f64>,
    overall: u32,
}

impl ScoreCard {
    /// Build a card from raw values; each is clamped to its factor range and the overall
    /// score is derived from the clamped values
    pub fn from_values(raw: impl IntoIterator<Item = (Factor, f64)>) -> Self {
        let mut values: BTreeMap<Factor, f64> = Factor::ALL.iter().map(|f| (*f, 0.0)).collect();
        for (factor, value) in raw {
            values.insert(factor, clamp_to_factor(factor, value));
        }

        let sum: f64 = values.values().sum();
        let overall = ((sum / MaxScoreMap::total()) * 100.0).round_ties_even().clamp(0.0, 100.0) as u32;

        Self { values, overall }
    }

    pub fn get(&self, factor: Factor) -> f64 {
        self.values.get(&factor).copied().unwrap_or(0.0)
    }

    pub fn overall(&self) -> u32 {
        self.overall
    }

    pub fn factor_scores(&self) -> Vec<FactorScore> {
        self.values
            .iter()
            .map(|(factor, value)| FactorScore {
                name: factor.key().to_string(),
                value: *value,
                max: factor.max_score(),
            })
            .collect()
    }
}

impl Serialize for ScoreCard {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        for (factor, value) in &self.values {
            map.serialize_entry(factor.key(), value)?;
        }
        map.serialize_entry("overall", &self.overall)?;
        map.end()
    }
}

fn clamp_to_factor(factor: Factor, value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, factor.max_score())
}

const CLOUD_FRIENDLY_LANGUAGES: &[&str] = &[
    "python", "javascript", "typescript", "go", "java", "ruby", "php", "csharp",
];

/// Rule-based scores from merged signals
pub fn rule_scores(signals: &Signals) -> ScoreCard {
    let tech = &signals.technology;

    let language = CLOUD_FRIENDLY_LANGUAGES
        .iter()
        .filter(|lang| hits(&tech.languages, lang) > 0)
        .count() as f64
        * 2.0;

    let mut containerization = 0.0;
    if hits(&tech.containerization, "docker") > 0 {
        containerization += 10.0;
    }
    if hits(&tech.containerization, "kubernetes") > 0 {
        containerization += 5.0;
    }

    let ci_cd = (total(&tech.cicd) as f64 * 3.0).min(10.0);

    let secrets = signals.secrets.secrets_count.min(5) as f64;
    let env_bonus = (signals.environment.count / 2).min(5) as f64;
    let configuration = 10.0 - secrets + env_bonus;

    let cloud_integration = (total(&tech.cloud_services) as f64).min(10.0);

    let service_coupling = 5.0 - (signals.coupling.count / 3).min(5) as f64;

    let logging = &signals.logging;
    let logging_practices = flag(logging.structured_logging > 0, 3.0)
        + flag(logging.basic_logging > 0, 1.0)
        + flag(logging.log_levels > 0, 1.0);

    let state = &signals.state;
    let state_management = flag(state.stateless > 0, 3.0) + flag(state.database_state > 0, 2.0);

    let modularity = &signals.modularity;
    let code_modularity = flag(modularity.classes > 0 && modularity.functions > 0, 2.0)
        + flag(modularity.modules > 0, 3.0);

    let dependency_management = flag(signals.dependencies.has_dependency_management, 5.0);
    let health_checks = flag(signals.health.has_health_endpoints, 5.0);

    let testing = &signals.testing;
    let testing_score = flag(testing.has_tests, 2.0)
        + flag(testing.unit_tests > 0, 2.0)
        + flag(testing.integration_tests > 0, 1.0);

    let instrumentation = &signals.instrumentation;
    let instrumentation_score = flag(instrumentation.metrics > 0, 2.0)
        + flag(instrumentation.tracing > 0, 2.0)
        + flag(instrumentation.profiling > 0, 1.0);

    let iac = (total(&tech.iac) as f64).min(5.0);

    ScoreCard::from_values([
        (Factor::LanguageCompatibility, language),
        (Factor::Containerization, containerization),
        (Factor::CiCd, ci_cd),
        (Factor::Configuration, configuration),
        (Factor::CloudIntegration, cloud_integration),
        (Factor::ServiceCoupling, service_coupling),
        (Factor::LoggingPractices, logging_practices),
        (Factor::StateManagement, state_management),
        (Factor::CodeModularity, code_modularity),
        (Factor::DependencyManagement, dependency_management),
        (Factor::HealthChecks, health_checks),
        (Factor::Testing, testing_score),
        (Factor::Instrumentation, instrumentation_score),
        (Factor::InfrastructureAsCode, iac),
    ])
}

fn flag(condition: bool, points: f64) -> f64 {
    if condition {
        points
    } else {
        0.0
    }
}

/// Blend rule scores with LLM scores given on a 1-10 scale.
///
/// A factor with an LLM score becomes `0.6 * rule + 0.4 * (llm / 10 * max)`; the others
/// keep their rule value. Every result is clamped to the factor range.
pub fn blend(rule: &ScoreCard, llm: &BTreeMap<Factor, f64>) -> ScoreCard {
    ScoreCard::from_values(Factor::ALL.into_iter().map(|factor| {
        let rule_value = rule.get(factor);
        let value = match llm.get(&factor) {
            Some(llm_score) if llm_score.is_finite() => {
                let normalized = llm_score / 10.0 * factor.max_score();
                0.6 * rule_value + 0.4 * normalized
            }
            _ => rule_value,
        };
        (factor, value)
    }))
}

/// Readiness tier for an overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadinessLevel {
    #[serde(rename = "Cloud-Native")]
    CloudNative,
    #[serde(rename = "Cloud-Ready")]
    CloudReady,
    #[serde(rename = "Cloud-Friendly")]
    CloudFriendly,
    #[serde(rename = "Cloud-Challenged")]
    CloudChallenged,
}

impl ReadinessLevel {
    pub fn from_score(overall: u32) -> Self {
        match overall {
            80.. => ReadinessLevel::CloudNative,
            60..=79 => ReadinessLevel::CloudReady,
            40..=59 => ReadinessLevel::CloudFriendly,
            _ => ReadinessLevel::CloudChallenged,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ReadinessLevel::CloudNative => "Cloud-Native",
            ReadinessLevel::CloudReady => "Cloud-Ready",
            ReadinessLevel::CloudFriendly => "Cloud-Friendly",
            ReadinessLevel::CloudChallenged => "Cloud-Challenged",
        }
    }
}

impl fmt::Display for ReadinessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_scores_sum_to_100() {
        assert_eq!(MaxScoreMap::total(), 100.0);
        let json = serde_json::to_string(&MaxScoreMap).unwrap();
        assert!(json.starts_with(r#"{"language_compatibility":15,"containerization":15,"ci_cd":10"#));
        assert!(json.ends_with(r#""infrastructure_as_code":5}"#));
    }

    #[test]
    fn test_factor_keys_round_trip() {
        for factor in Factor::ALL {
            assert_eq!(Factor::from_key(factor.key()), Some(factor));
            assert_eq!(serde_json::to_value(factor).unwrap(), factor.key());
        }
        assert_eq!(Factor::from_key("overall"), None);
    }

    #[test]
    fn test_docker_without_kubernetes_scores_ten() {
        let mut signals = Signals::default();
        signals.technology.containerization.insert("docker".into(), 6);

        let scores = rule_scores(&signals);
        assert_eq!(scores.get(Factor::Containerization), 10.0);
    }

    #[test]
    fn test_configuration_balances_secrets_and_env_vars() {
        let mut signals = Signals::default();
        signals.secrets.secrets_count = 3;
        signals.environment.count = 5;

        // 10 - 3 + 5 / 2
        assert_eq!(rule_scores(&signals).get(Factor::Configuration), 9.0);
    }

    #[test]
    fn test_pathological_counts_stay_in_range() {
        let mut signals = Signals::default();
        for lang in CLOUD_FRIENDLY_LANGUAGES {
            signals.technology.languages.insert(lang.to_string(), u64::MAX / 16);
        }
        signals.technology.cicd.insert("jenkins".into(), u64::MAX / 16);
        signals.technology.cloud_services.insert("aws".into(), u64::MAX / 16);
        signals.technology.iac.insert("terraform".into(), u64::MAX / 16);
        signals.secrets.secrets_count = u64::MAX;
        signals.coupling.count = u64::MAX;
        signals.environment.count = u64::MAX;

        let scores = rule_scores(&signals);
        for factor in Factor::ALL {
            let value = scores.get(factor);
            assert!((0.0..=factor.max_score()).contains(&value), "{factor} = {value}");
        }
        assert!(scores.overall() <= 100);
        assert_eq!(scores.get(Factor::ServiceCoupling), 0.0);
        assert_eq!(scores.get(Factor::LanguageCompatibility), 15.0);
    }

    #[test]
    fn test_blend_never_exceeds_factor_max() {
        let rule = ScoreCard::from_values(Factor::ALL.map(|f| (f, f.max_score())));
        let llm: BTreeMap<Factor, f64> = Factor::ALL.iter().map(|f| (*f, 10.0)).collect();

        let blended = blend(&rule, &llm);
        for factor in Factor::ALL {
            assert!(blended.get(factor) <= factor.max_score());
        }
        assert_eq!(blended.overall(), 100);
    }

    #[test]
    fn test_blend_mixes_sixty_forty() {
        let rule = ScoreCard::from_values([(Factor::CiCd, 5.0)]);
        let llm = BTreeMap::from([(Factor::CiCd, 10.0)]);

        let blended = blend(&rule, &llm);
        assert!((blended.get(Factor::CiCd) - 7.0).abs() < 1e-9);
        assert_eq!(blended.get(Factor::Testing), 0.0);
    }

    #[test]
    fn test_readiness_boundaries() {
        assert_eq!(ReadinessLevel::from_score(80), ReadinessLevel::CloudNative);
        assert_eq!(ReadinessLevel::from_score(79), ReadinessLevel::CloudReady);
        assert_eq!(ReadinessLevel::from_score(60), ReadinessLevel::CloudReady);
        assert_eq!(ReadinessLevel::from_score(59), ReadinessLevel::CloudFriendly);
        assert_eq!(ReadinessLevel::from_score(40), ReadinessLevel::CloudFriendly);
        assert_eq!(ReadinessLevel::from_score(0), ReadinessLevel::CloudChallenged);
        assert_eq!(ReadinessLevel::CloudNative.to_string(), "Cloud-Native");
    }

    #[test]
    fn test_score_card_serializes_flat() {
        let card = ScoreCard::from_values([(Factor::Testing, 4.0)]);
        let value = serde_json::to_value(&card).unwrap();
        assert_eq!(value["testing"], 4.0);
        assert_eq!(value["overall"], 4);
        assert_eq!(value.as_object().unwrap().len(), 15);
    }
}
