use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::signals::{hits, total, Signals};

/// Deployment and integration style inferred from merged signals
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Architecture {
    pub is_microservices: bool,
    pub apis: BTreeMap<String, bool>,
    pub message_queues: BTreeMap<String, bool>,
}

/// Classify the architecture. Microservices need at least two of: Kubernetes, more than
/// two Docker signals, a compose file, a lightweight web framework.
pub fn classify(signals: &Signals) -> Architecture {
    let tech = &signals.technology;
    let hints = &signals.hints;

    let indicators = [
        hits(&tech.containerization, "kubernetes") > 0,
        hits(&tech.containerization, "docker") > 2,
        hints.compose_files > 0,
        ["fastapi", "express", "flask"]
            .iter()
            .any(|framework| hits(&tech.frameworks, framework) > 0),
    ];
    let is_microservices = indicators.iter().filter(|present| **present).count() >= 2;

    let rest: u64 = ["fastapi", "flask", "express", "django"]
        .iter()
        .map(|framework| hits(&tech.frameworks, framework))
        .sum();

    let apis = BTreeMap::from([
        ("rest".to_string(), rest > 0),
        ("grpc".to_string(), hints.grpc_paths > 0 || hints.proto_files > 0),
    ]);

    let uses_aws = hits(&tech.cloud_services, "aws") > 0;
    let message_queues = BTreeMap::from([
        ("kafka".to_string(), hints.kafka_paths > 0 || hints.kafka_consumers > 0),
        ("rabbitmq".to_string(), hints.rabbitmq_paths > 0 || hints.amqp_mentions > 0),
        ("sqs".to_string(), uses_aws && (hints.sqs_paths > 0 || hints.sqs_mentions > 0)),
    ]);

    Architecture {
        is_microservices,
        apis,
        message_queues,
    }
}

impl Architecture {
    /// Whether any containerization signal at all was seen
    pub fn containerized(signals: &Signals) -> bool {
        total(&signals.technology.containerization) > 0
    }
}
