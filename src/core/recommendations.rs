use serde::{Deserialize, Serialize};

use super::architecture::Architecture;
use super::llm::LlmAssessment;
use super::scoring::{Factor, ScoreCard};
use super::signals::Signals;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationSource {
    Rule,
    Llm,
}

/// One remediation item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub category: String,
    pub priority: Priority,
    pub description: String,
    pub source: RecommendationSource,
}

impl Recommendation {
    fn rule(category: &str, priority: Priority, description: impl Into<String>) -> Self {
        Self {
            category: category.to_string(),
            priority,
            description: description.into(),
            source: RecommendationSource::Rule,
        }
    }
}

/// Threshold rules over the final scores and merged signals, followed by one medium item
/// per LLM factor that carries its own recommendation text. Items are not deduplicated.
pub fn generate(
    signals: &Signals,
    architecture: &Architecture,
    scores: &ScoreCard,
    llm: Option<&LlmAssessment>,
) -> Vec<Recommendation> {
    let mut items = Vec::new();
    let mut push = |category: &str, priority: Priority, description: String| {
        items.push(Recommendation::rule(category, priority, description));
    };

    if scores.get(Factor::LanguageCompatibility) < 10.0 {
        push(
            "language_compatibility",
            Priority::Medium,
            "Consider using more cloud-friendly languages and frameworks like Python, JavaScript/TypeScript, Go, or Java for better cloud compatibility.".into(),
        );
    }

    let containerization = scores.get(Factor::Containerization);
    if containerization < 10.0 {
        push(
            "containerization",
            Priority::High,
            "Containerize your application using Docker for better portability and deployment consistency.".into(),
        );
    }
    if containerization < 15.0 {
        push(
            "containerization",
            Priority::Medium,
            "Consider using Kubernetes for container orchestration to improve scalability and resilience.".into(),
        );
    }

    if scores.get(Factor::CiCd) < 5.0 {
        push(
            "ci_cd",
            Priority::High,
            "Implement CI/CD pipelines using GitHub Actions, GitLab CI, or Jenkins to automate testing and deployment.".into(),
        );
    }

    if signals.secrets.secrets_count > 0 {
        push(
            "configuration",
            Priority::Critical,
            format!(
                "Remove {} hardcoded secrets found in {} files and use environment variables or a secrets management service instead.",
                signals.secrets.secrets_count,
                signals.secrets.files_with_secrets.len()
            ),
        );
    }

    if signals.environment.count < 5 {
        push(
            "configuration",
            Priority::High,
            "Use more environment variables for configuration to improve flexibility when deploying to different environments.".into(),
        );
    }

    let cloud_integration = scores.get(Factor::CloudIntegration);
    if cloud_integration < 5.0 {
        push(
            "cloud_integration",
            Priority::Medium,
            "Integrate with cloud services for storage, database, and compute resources to improve scalability.".into(),
        );
    }

    if signals.coupling.count > 10 {
        push(
            "service_coupling",
            Priority::Medium,
            "Reduce tight coupling to external services by using environment variables, configuration files, or service discovery.".into(),
        );
    }

    if signals.logging.structured_logging == 0 {
        push(
            "logging",
            Priority::Medium,
            "Implement structured logging to improve observability in a cloud environment.".into(),
        );
    }

    if signals.state.stateless == 0 {
        push(
            "state_management",
            Priority::Medium,
            "Design more stateless components to improve scalability and resilience in the cloud.".into(),
        );
    }

    if scores.get(Factor::CodeModularity) < 3.0 {
        push(
            "code_modularity",
            Priority::Medium,
            "Improve code modularity by organizing code into more reusable modules and components.".into(),
        );
    }

    if !signals.dependencies.has_dependency_management {
        push(
            "dependency_management",
            Priority::High,
            "Use a dependency management system to track and manage dependencies properly.".into(),
        );
    }

    if !signals.health.has_health_endpoints {
        push(
            "health_checks",
            Priority::High,
            "Implement health check endpoints to enable monitoring and auto-healing in cloud environments.".into(),
        );
    }

    if !signals.testing.has_tests {
        push(
            "testing",
            Priority::Medium,
            "Add automated tests to ensure reliability when deploying to the cloud.".into(),
        );
    }

    if !signals.instrumentation.has_instrumentation {
        push(
            "instrumentation",
            Priority::Medium,
            "Add metrics, tracing, and monitoring instrumentation to improve observability in the cloud.".into(),
        );
    }

    if scores.get(Factor::InfrastructureAsCode) < 3.0 {
        push(
            "infrastructure_as_code",
            Priority::Medium,
            "Use Infrastructure as Code tools like Terraform or CloudFormation to manage and version your infrastructure.".into(),
        );
    }

    if architecture.is_microservices && cloud_integration < 7.0 {
        push(
            "architecture",
            Priority::High,
            "Your microservices architecture would benefit from better cloud service integration for inter-service communication and data storage.".into(),
        );
    }

    if !architecture.is_microservices && Architecture::containerized(signals) {
        push(
            "architecture",
            Priority::Low,
            "Consider breaking your monolithic application into microservices for better scalability and maintainability in the cloud.".into(),
        );
    }

    if let Some(assessment) = llm {
        for (factor, detail) in &assessment.factors {
            let Some(text) = detail.recommendations.as_deref() else {
                continue;
            };
            if text.trim().is_empty() {
                continue;
            }
            items.push(Recommendation {
                category: factor.clone(),
                priority: Priority::Medium,
                description: text.to_string(),
                source: RecommendationSource::Llm,
            });
        }
    }

    items
}
