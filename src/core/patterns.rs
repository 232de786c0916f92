//! Pattern taxonomy for the signal scanners.
//!
//! Every table is plain data (`name -> regex sources`) compiled once on first use.
//! Scanners decide how hits are counted; this module only says what to look for.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

/// A named group of regex sources
pub type PatternSpec = (&'static str, &'static [&'static str]);

/// A compiled, ordered table of named pattern groups
pub struct PatternTable {
    entries: Vec<(&'static str, Vec<Regex>)>,
}

impl PatternTable {
    fn compile(specs: &[PatternSpec], case_insensitive: bool) -> Self {
        let entries = specs
            .iter()
            .map(|(name, sources)| (*name, compile_all(sources, case_insensitive)))
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &[Regex])> {
        self.entries.iter().map(|(name, regexes)| (*name, regexes.as_slice()))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }
}

fn compile_all(sources: &[&str], case_insensitive: bool) -> Vec<Regex> {
    sources
        .iter()
        .map(|source| {
            RegexBuilder::new(source)
                .case_insensitive(case_insensitive)
                .build()
                .unwrap_or_else(|e| panic!("Invalid built-in pattern {source:?}: {e}"))
        })
        .collect()
}

// Technology stack

pub const LANGUAGE_PATTERNS: &[PatternSpec] = &[
    ("python", &[r"\.py$", r"requirements\.txt$", r"setup\.py$", r"Pipfile$"]),
    ("javascript", &[r"\.js$", r"\.jsx$", r"package\.json$", r"yarn\.lock$", r"npm-shrinkwrap\.json$"]),
    ("typescript", &[r"\.ts$", r"\.tsx$", r"tsconfig\.json$"]),
    ("java", &[r"\.java$", r"pom\.xml$", r"build\.gradle$", r"\.jar$"]),
    ("go", &[r"\.go$", r"go\.mod$", r"go\.sum$"]),
    ("ruby", &[r"\.rb$", r"Gemfile$", r"\.gemspec$"]),
    ("php", &[r"\.php$", r"composer\.json$"]),
    ("csharp", &[r"\.cs$", r"\.csproj$", r"\.sln$"]),
    ("rust", &[r"\.rs$", r"Cargo\.toml$"]),
    ("kotlin", &[r"\.kt$", r"\.kts$"]),
    ("swift", &[r"\.swift$", r"Package\.swift$"]),
    ("html", &[r"\.html$", r"\.htm$"]),
    ("css", &[r"\.css$", r"\.scss$", r"\.sass$", r"\.less$"]),
    ("shell", &[r"\.sh$", r"\.bash$", r"\.zsh$"]),
    ("dockerfile", &[r"Dockerfile", r"\.dockerfile$", r"docker-compose\.yml$"]),
    ("terraform", &[r"\.tf$", r"\.tfvars$"]),
    ("yaml", &[r"\.yaml$", r"\.yml$"]),
];

pub const FRAMEWORK_PATTERNS: &[PatternSpec] = &[
    ("django", &[r"settings\.py$", r"wsgi\.py$", r"asgi\.py$", r"django", r"urls\.py$"]),
    ("flask", &[r"flask", r"Flask\(", r"@app\.route"]),
    ("fastapi", &[r"fastapi", r"FastAPI\(", r"@app\.get", r"@app\.post"]),
    ("express", &[r"express\s*=\s*require", r"express\(", r"app\.get\(", r"app\.post\("]),
    ("react", &[r"react", r"React", r"useState", r"useEffect", r"ReactDOM"]),
    ("angular", &[r"@angular", r"NgModule", r"Component\("]),
    ("vue", &[r"vue", r"createApp", r"new Vue"]),
    ("next.js", &[r"next\.config", r"pages/_app", r"getStaticProps"]),
    ("spring", &[r"@SpringBootApplication", r"@RestController", r"@Autowired"]),
    ("laravel", &[r"Illuminate\\", r"artisan"]),
    ("asp.net", &[r"Microsoft\.AspNetCore", r"IActionResult"]),
    ("rails", &[r"Rails::", r"ActiveRecord::"]),
];

pub const DATABASE_PATTERNS: &[PatternSpec] = &[
    ("mongodb", &[r"mongodb", r"mongoose", r"MongoClient"]),
    ("mysql", &[r"mysql", r"MySQL", r"createConnection"]),
    ("postgresql", &[r"postgresql", r"postgres", r"pg\s*=\s*require"]),
    ("sqlite", &[r"sqlite", r"SQLite"]),
    ("redis", &[r"redis", r"Redis"]),
    ("dynamodb", &[r"dynamodb", r"DynamoDB"]),
    ("cosmosdb", &[r"cosmosdb", r"CosmosClient"]),
];

pub const CLOUD_SERVICE_PATTERNS: &[PatternSpec] = &[
    ("aws", &[r"aws-sdk", r"boto3", r"AWS\.", r"\.amazonaws\.com"]),
    ("azure", &[r"azure-", r"Azure\.", r"\.azure\.com"]),
    ("gcp", &[r"google-cloud", r"gcloud", r"\.googleapis\.com"]),
    ("s3", &[r"S3Client", r"S3Bucket", r"aws_s3", r"boto3.*?s3"]),
    ("dynamodb", &[r"DynamoDBClient", r"boto3.*?dynamodb"]),
    ("lambda", &[r"aws_lambda", r"boto3.*?lambda"]),
    ("ec2", &[r"EC2Client", r"boto3.*?ec2"]),
    ("azure_blob", &[r"BlobServiceClient", r"azure.storage.blob"]),
    ("azure_functions", &[r"azure.functions"]),
    ("bigquery", &[r"bigquery", r"BigQuery"]),
    ("pubsub", &[r"pubsub", r"PubSub"]),
    ("gcs", &[r"storage.Client", r"google.cloud.storage"]),
];

pub const CONTAINER_PATTERNS: &[PatternSpec] = &[
    ("docker", &[r"Dockerfile", r"docker-compose", r"ENTRYPOINT", r"WORKDIR"]),
    ("kubernetes", &[r"kubernetes", r"kubectl", r"apiVersion:", r"kind: (Deployment|Service|ConfigMap|Secret)"]),
    ("helm", &[r"Chart\.yaml", r"values\.yaml", r"templates/"]),
];

pub const CICD_PATTERNS: &[PatternSpec] = &[
    ("github_actions", &[r"\.github/workflows", r"uses: actions/", r"on: \[push, pull_request\]"]),
    ("gitlab_ci", &[r"\.gitlab-ci\.yml"]),
    ("jenkins", &[r"Jenkinsfile"]),
    ("circle_ci", &[r"\.circleci/config\.yml"]),
    ("travis", &[r"\.travis\.yml"]),
    ("azure_devops", &[r"azure-pipelines\.yml"]),
];

pub const MONITORING_PATTERNS: &[PatternSpec] = &[
    ("prometheus", &[r"prometheus", r"Prometheus", r"prom/client"]),
    ("grafana", &[r"grafana", r"Grafana"]),
    ("elk", &[r"elasticsearch", r"kibana", r"logstash"]),
    ("datadog", &[r"datadog", r"Datadog"]),
    ("newrelic", &[r"newrelic", r"NewRelic"]),
    ("sentry", &[r"sentry", r"Sentry.init"]),
    ("fluentd", &[r"fluentd", r"Fluentd"]),
];

pub const IAC_PATTERNS: &[PatternSpec] = &[
    ("terraform", &[r"\.tf$", r"terraform", r#"provider "aws""#, r#"resource ""#]),
    ("cloudformation", &[r"\.template$", r"AWSTemplateFormatVersion", r"Resources:"]),
    ("pulumi", &[r"index\.ts$", r"Pulumi\.yaml", r"pulumi."]),
    ("serverless", &[r"serverless\.yml", r"serverless\.json"]),
    ("ansible", &[r"ansible\.cfg", r"playbook\.yml"]),
    ("cdk", &[r"cdk\.json", r"aws-cdk-lib"]),
];

pub static LANGUAGES: Lazy<PatternTable> = Lazy::new(|| PatternTable::compile(LANGUAGE_PATTERNS, true));
pub static FRAMEWORKS: Lazy<PatternTable> = Lazy::new(|| PatternTable::compile(FRAMEWORK_PATTERNS, true));
pub static DATABASES: Lazy<PatternTable> = Lazy::new(|| PatternTable::compile(DATABASE_PATTERNS, true));
pub static CLOUD_SERVICES: Lazy<PatternTable> = Lazy::new(|| PatternTable::compile(CLOUD_SERVICE_PATTERNS, true));
pub static CONTAINERIZATION: Lazy<PatternTable> = Lazy::new(|| PatternTable::compile(CONTAINER_PATTERNS, true));
pub static CICD: Lazy<PatternTable> = Lazy::new(|| PatternTable::compile(CICD_PATTERNS, true));
pub static MONITORING: Lazy<PatternTable> = Lazy::new(|| PatternTable::compile(MONITORING_PATTERNS, true));
pub static IAC: Lazy<PatternTable> = Lazy::new(|| PatternTable::compile(IAC_PATTERNS, true));

// Secrets. A file is flagged by the first pattern that matches it.

pub const SECRET_SOURCES: &[&str] = &[
    // AWS access key id and secret access key assignments
    r"AKIA[0-9A-Z]{16}",
    r"AWS_SECRET_ACCESS_KEY.*?=.*?[A-Za-z0-9+/]{40}",
    r"AWS_ACCESS_KEY_ID.*?=.*?AKIA[0-9A-Z]{16}",
    // Generic API keys, tokens and passwords
    r#"api[-_]?key.*?[=:"\s]+[A-Za-z0-9]{32,}['"\s]"#,
    r#"auth[-_]?token.*?[=:"\s]+[A-Za-z0-9]{32,}['"\s]"#,
    r#"secret[-_]?key.*?[=:"\s]+[A-Za-z0-9]{32,}['"\s]"#,
    r#"password.*?[=:"\s]+[A-Za-z0-9!@#$%^&*()]{8,}['"\s]"#,
    // Connection strings with inline credentials
    r"mysql://.*:.*@.*",
    r"postgres://.*:.*@.*",
    r"mongodb://.*:.*@.*",
    // OAuth tokens
    r#"oauth.*token.*?[=:"\s]+[A-Za-z0-9]{32,}['"\s]"#,
    // JWT-like triples
    r"eyJ[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}",
];

pub static SECRETS: Lazy<Vec<Regex>> = Lazy::new(|| compile_all(SECRET_SOURCES, true));

// Environment variable reads; capture group 1 is the variable name.

pub const ENV_VAR_SOURCES: &[&str] = &[
    r#"os\.environ\.get\(['"](\w+)['"]"#,
    r"process\.env\.(\w+)",
    r#"ENV\[['"](\w+)['"]\]"#,
    r#"getenv\(['"](\w+)['"]"#,
    r#"System\.getenv\(['"](\w+)['"]"#,
    r"\$\{(\w+)\}",
    r"@Value\(\$\{(\w+)\}\)",
];

pub static ENV_VARS: Lazy<Vec<Regex>> = Lazy::new(|| compile_all(ENV_VAR_SOURCES, false));

// Coupling to concrete external endpoints

pub const COUPLING_PATTERNS: &[PatternSpec] = &[
    ("direct_http", &[r"http[s]?://(?:[a-zA-Z]|[0-9]|[$-_@.&+]|[!*\\(\\),]|(?:%[0-9a-fA-F][0-9a-fA-F]))+"]),
    ("hardcoded_ips", &[r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b"]),
    ("hardcoded_hostnames", &[r"[a-zA-Z0-9][-a-zA-Z0-9]{0,62}(\.[a-zA-Z0-9][-a-zA-Z0-9]{0,62})+"]),
];

pub static COUPLING: Lazy<PatternTable> = Lazy::new(|| PatternTable::compile(COUPLING_PATTERNS, false));

pub const LOGGING_PATTERNS: &[PatternSpec] = &[
    ("structured_logging", &[r"logger\.(info|debug|error|warn)\(\{", r"structlog", r"winston", r"bunyan", r"logstash"]),
    ("basic_logging", &[r"(console|logger)\.(log|info|debug|error|warn)\(", r"System\.out\.println", r"Log\.(d|i|e|v|w)", r"print\(", r"puts\s"]),
    ("log_levels", &[r"(LOG|Log)_LEVEL", r"setLevel"]),
];

pub static LOGGING: Lazy<PatternTable> = Lazy::new(|| PatternTable::compile(LOGGING_PATTERNS, false));

pub const STATE_PATTERNS: &[PatternSpec] = &[
    ("stateless", &[r"@Stateless", r"StatelessWidget", r"pure\s+function"]),
    ("persistent_state", &[r"localStorage", r"sessionStorage", r"SharedPreferences", r"UserDefaults", r"createStore", r"useState", r"@State"]),
    ("database_state", &[r"database", r"repository", r"persist", r"entity", r"model"]),
];

pub static STATE: Lazy<PatternTable> = Lazy::new(|| PatternTable::compile(STATE_PATTERNS, true));

pub const MODULARITY_PATTERNS: &[PatternSpec] = &[
    ("classes", &[r"class\s+\w+", r"interface\s+\w+"]),
    ("functions", &[r"(function|def|func)\s+\w+", r"const\s+\w+\s*=\s*(\(.*\)|async\s*\(.*\))\s*=>"]),
    ("modules", &[r"(import|require|use)\s+", r"module\.", r"export\s+"]),
];

pub static MODULARITY: Lazy<PatternTable> = Lazy::new(|| PatternTable::compile(MODULARITY_PATTERNS, false));

/// Manifest file names per ecosystem; a leading `*` matches any prefix
pub const DEPENDENCY_MANIFESTS: &[PatternSpec] = &[
    ("python", &["requirements.txt", "setup.py", "Pipfile", "pyproject.toml"]),
    ("javascript", &["package.json", "yarn.lock", "package-lock.json"]),
    ("java", &["pom.xml", "build.gradle", "build.gradle.kts"]),
    ("ruby", &["Gemfile", "Gemfile.lock"]),
    ("go", &["go.mod", "go.sum"]),
    ("php", &["composer.json", "composer.lock"]),
    ("rust", &["Cargo.toml", "Cargo.lock"]),
    ("dotnet", &["*.csproj", "*.fsproj", "packages.config"]),
];

pub const HEALTH_CHECK_SOURCES: &[&str] = &[
    r#"@GetMapping\(['"]/?health['"]"#,
    r#"app\.get\(['"]/?health['"]"#,
    r#"@app\.route\(['"]/?health['"]"#,
    r#"\.route\(['"]/?health['"]"#,
    r"func\s+Health",
    r"def\s+health",
    r#"\.get\(['"]/?health['"]"#,
    r#"\.get\(['"]/?status['"]"#,
    r#"\.get\(['"]/?ready['"]"#,
    r#"\.get\(['"]/?alive['"]"#,
    r#"\.get\(['"]/?livez['"]"#,
    r#"\.get\(['"]/?readyz['"]"#,
];

pub static HEALTH_CHECKS: Lazy<Vec<Regex>> = Lazy::new(|| compile_all(HEALTH_CHECK_SOURCES, true));

pub const TESTING_PATTERNS: &[PatternSpec] = &[
    ("unit_tests", &[r"@Test", r#"test\(['"]"#, r#"describe\(['"]"#, r#"it\(['"]"#, r"def\s+test_", r"class\s+\w+Test", r"func\s+Test\w+"]),
    ("integration_tests", &[r"@SpringBootTest", r"@IntegrationTest", r"integration\s+test", r"end-to-end", r"e2e"]),
    ("mocking", &[r"mock\(", r"@Mock", r"createMock", r"jest\.mock", r"unittest\.mock"]),
];

pub static TESTING: Lazy<PatternTable> = Lazy::new(|| PatternTable::compile(TESTING_PATTERNS, false));

pub const INSTRUMENTATION_PATTERNS: &[PatternSpec] = &[
    ("metrics", &[r"metrics\.", r"prometheus", r"counter\.", r"gauge\.", r"histogram\.", r"meter\."]),
    ("tracing", &[r"tracer", r"span", r"opentracing", r"opentelemetry", r"distributed_tracing", r"jaeger", r"zipkin"]),
    ("profiling", &[r"profiler", r"profile\.", r"benchmark"]),
];

pub static INSTRUMENTATION: Lazy<PatternTable> = Lazy::new(|| PatternTable::compile(INSTRUMENTATION_PATTERNS, true));

/// File paths worth showing to the LLM first
pub const LLM_PRIORITY_SOURCES: &[&str] = &[
    r"Dockerfile", r"docker-compose", r"requirements.txt", r"package.json", r"app.py",
    r"server.js", r"main.py", r"index.js", r"terraform", r"cloudformation", r"kubernetes",
    r"k8s", r"helm", r"config",
];

pub static LLM_PRIORITY_FILES: Lazy<Vec<Regex>> = Lazy::new(|| compile_all(LLM_PRIORITY_SOURCES, true));
