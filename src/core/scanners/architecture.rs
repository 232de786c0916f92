use super::SignalScanner;
use crate::core::model::FileRecord;
use crate::core::signals::ArchitectureHints;

/// Path and content markers for deployment topology, RPC style and messaging
pub struct ArchitectureHintScanner;

const COMPOSE_FILES: &[&str] = &["docker-compose.yml", "docker-compose.yaml", "compose.yml"];

impl SignalScanner for ArchitectureHintScanner {
    type Output = ArchitectureHints;

    fn category(&self) -> &'static str {
        "architecture_hints"
    }

    fn scan(&self, files: &[FileRecord], ceiling: usize) -> ArchitectureHints {
        let mut hints = ArchitectureHints::default();

        for file in files {
            let path = file.path.as_str();

            if COMPOSE_FILES.contains(&file.file_name()) {
                hints.compose_files += 1;
            }
            if path.contains("grpc") {
                hints.grpc_paths += 1;
            }
            if path.ends_with(".proto") {
                hints.proto_files += 1;
            }
            if path.contains("kafka") {
                hints.kafka_paths += 1;
            }
            if path.contains("rabbitmq") {
                hints.rabbitmq_paths += 1;
            }
            if path.contains("sqs") {
                hints.sqs_paths += 1;
            }

            let Some(content) = file.scannable_text(ceiling) else {
                continue;
            };

            if content.contains("KafkaConsumer") {
                hints.kafka_consumers += 1;
            }
            if content.contains("amqp") {
                hints.amqp_mentions += 1;
            }
            if content.contains("SQS") {
                hints.sqs_mentions += 1;
            }
        }

        hints
    }
}
