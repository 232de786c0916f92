//! Signal accumulators produced by the scanners and folded across batches.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::merge::{impl_merge, merge_all, Merge};

/// Finding name to hit count
pub type Counter = BTreeMap<String, u64>;

/// Sum of all counts in a counter
pub fn total(counter: &Counter) -> u64 {
    counter.values().fold(0u64, |sum, n| sum.saturating_add(*n))
}

/// Count for a single finding, zero when absent
pub fn hits(counter: &Counter, name: &str) -> u64 {
    counter.get(name).copied().unwrap_or(0)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnologyStack {
    pub languages: Counter,
    pub frameworks: Counter,
    pub databases: Counter,
    pub cloud_services: Counter,
    pub containerization: Counter,
    pub cicd: Counter,
    pub monitoring: Counter,
    pub iac: Counter,
}

impl TechnologyStack {
    /// Mutable counter for a category name used by the pattern tables
    pub fn category_mut(&mut self, category: &str) -> Option<&mut Counter> {
        match category {
            "languages" => Some(&mut self.languages),
            "frameworks" => Some(&mut self.frameworks),
            "databases" => Some(&mut self.databases),
            "cloud_services" => Some(&mut self.cloud_services),
            "containerization" => Some(&mut self.containerization),
            "cicd" => Some(&mut self.cicd),
            "monitoring" => Some(&mut self.monitoring),
            "iac" => Some(&mut self.iac),
            _ => None,
        }
    }
}

impl_merge!(TechnologyStack {
    languages,
    frameworks,
    databases,
    cloud_services,
    containerization,
    cicd,
    monitoring,
    iac,
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecretsFindings {
    pub secrets_count: u64,
    pub files_with_secrets: Vec<String>,
}

impl_merge!(SecretsFindings { secrets_count, files_with_secrets });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentVariables {
    pub count: u64,
    pub variables: BTreeSet<String>,
    pub files: Vec<String>,
}

impl_merge!(EnvironmentVariables { count, variables, files });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceCoupling {
    pub count: u64,
    /// Coupling kind to the endpoints found for it
    pub services: BTreeMap<String, Vec<String>>,
    pub files: Vec<String>,
}

impl_merge!(ServiceCoupling { count, services, files });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingPractices {
    pub structured_logging: u64,
    pub basic_logging: u64,
    pub log_levels: u64,
    pub files: Vec<String>,
}

impl_merge!(LoggingPractices { structured_logging, basic_logging, log_levels, files });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateManagement {
    pub stateless: u64,
    pub persistent_state: u64,
    pub database_state: u64,
    pub files: Vec<String>,
}

impl_merge!(StateManagement { stateless, persistent_state, database_state, files });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeModularity {
    pub classes: u64,
    pub functions: u64,
    pub modules: u64,
    /// Bytes of text content seen; `avg_file_size` is derived from it after the fold
    #[serde(skip)]
    pub total_size: u64,
    pub file_count: u64,
    pub avg_file_size: f64,
}

// avg_file_size is recomputed in finalize, never summed
impl Merge for CodeModularity {
    fn merge(&mut self, other: Self) {
        self.classes.merge(other.classes);
        self.functions.merge(other.functions);
        self.modules.merge(other.modules);
        self.total_size.merge(other.total_size);
        self.file_count.merge(other.file_count);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyManagement {
    pub has_dependency_management: bool,
    pub dependency_systems: Counter,
    pub dependency_files: Vec<String>,
}

impl_merge!(DependencyManagement {
    has_dependency_management,
    dependency_systems,
    dependency_files,
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthChecks {
    pub has_health_endpoints: bool,
    pub count: u64,
    pub files: Vec<String>,
}

impl_merge!(HealthChecks { has_health_endpoints, count, files });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestingCoverage {
    pub has_tests: bool,
    pub unit_tests: u64,
    pub integration_tests: u64,
    pub mocking: u64,
    pub test_files: u64,
    pub files: Vec<String>,
}

impl_merge!(TestingCoverage {
    has_tests,
    unit_tests,
    integration_tests,
    mocking,
    test_files,
    files,
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Instrumentation {
    pub has_instrumentation: bool,
    pub metrics: u64,
    pub tracing: u64,
    pub profiling: u64,
    pub files: Vec<String>,
}

impl_merge!(Instrumentation { has_instrumentation, metrics, tracing, profiling, files });

/// Path and content hits the architecture classifier needs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureHints {
    pub compose_files: u64,
    pub grpc_paths: u64,
    pub proto_files: u64,
    pub kafka_paths: u64,
    pub kafka_consumers: u64,
    pub rabbitmq_paths: u64,
    pub amqp_mentions: u64,
    pub sqs_paths: u64,
    pub sqs_mentions: u64,
}

impl_merge!(ArchitectureHints {
    compose_files,
    grpc_paths,
    proto_files,
    kafka_paths,
    kafka_consumers,
    rabbitmq_paths,
    amqp_mentions,
    sqs_paths,
    sqs_mentions,
});

/// Every accumulator for one batch, or for the whole run once merged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Signals {
    pub file_count: u64,
    pub technology: TechnologyStack,
    pub secrets: SecretsFindings,
    pub environment: EnvironmentVariables,
    pub coupling: ServiceCoupling,
    pub logging: LoggingPractices,
    pub state: StateManagement,
    pub modularity: CodeModularity,
    pub dependencies: DependencyManagement,
    pub health: HealthChecks,
    pub testing: TestingCoverage,
    pub instrumentation: Instrumentation,
    pub hints: ArchitectureHints,
}

impl_merge!(Signals {
    file_count,
    technology,
    secrets,
    environment,
    coupling,
    logging,
    state,
    modularity,
    dependencies,
    health,
    testing,
    instrumentation,
    hints,
});

impl Signals {
    /// Category-level post-processing, applied once after every batch is folded
    pub fn finalize(&mut self) {
        for endpoints in self.coupling.services.values_mut() {
            endpoints.sort();
            endpoints.dedup();
        }

        let modularity = &mut self.modularity;
        modularity.avg_file_size = if modularity.file_count > 0 {
            modularity.total_size as f64 / modularity.file_count as f64
        } else {
            0.0
        };
    }
}

/// Fold per-batch signals in order and finalize the result
pub fn merge_batches(batches: Vec<Signals>) -> Signals {
    let mut merged: Signals = merge_all(batches);
    merged.finalize();
    merged
}
