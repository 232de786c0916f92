use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CloudReadyError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Whether the secondary LLM assessment may be used at all
    pub enabled: bool,

    /// LLM provider (openai, anthropic, ollama)
    pub provider: String,

    /// Model name (e.g., "gpt-4o", "claude-3-5-sonnet-latest", "llama3")
    pub model: String,

    /// API key (for hosted providers); falls back to the provider's env var
    pub api_key: Option<String>,

    /// Base URL override (proxies, self-hosted endpoints)
    pub base_url: Option<String>,

    /// Maximum tokens for LLM responses
    pub max_tokens: Option<u32>,

    /// Temperature for LLM responses (0.0 to 1.0)
    pub temperature: Option<f32>,

    /// Hard limit for a single assessment call
    pub timeout_secs: u64,

    /// Directory for cached responses, keyed by prompt hash
    pub cache_dir: Option<PathBuf>,
}

impl LlmConfig {
    /// Resolve the API key from config or the provider's conventional environment variable
    pub fn resolved_api_key(&self) -> Option<String> {
        if let Some(key) = &self.api_key {
            if !key.trim().is_empty() {
                return Some(key.clone());
            }
        }

        let env_var = match self.provider.as_str() {
            "openai" => "OPENAI_API_KEY",
            "anthropic" => "ANTHROPIC_API_KEY",
            _ => return None,
        };
        std::env::var(env_var).ok().filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Local file crawling
    pub crawl: CrawlConfig,

    /// Analysis engine tuning
    pub analysis: AnalysisConfig,

    /// LLM integration settings
    pub llm: LlmConfig,

    /// Output settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name; defaults to the source directory name
    pub name: Option<String>,

    /// Root directory for written reports
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Glob patterns a file must match to be analyzed
    pub include_patterns: Vec<String>,

    /// Glob patterns that exclude files and directories
    pub exclude_patterns: Vec<String>,

    /// Files larger than this (in bytes) are skipped entirely
    pub max_file_size: u64,

    /// Honour .gitignore files while walking
    pub respect_gitignore: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Number of files per scanning batch
    pub batch_size: usize,

    /// Content above this size (in bytes) is not scanned, only its path
    pub content_size_ceiling: usize,

    /// Whether to request the secondary LLM assessment
    pub use_llm: bool,

    /// Maximum number of files sampled into the LLM prompt
    pub llm_sample_limit: usize,

    /// Per-file character window kept in the LLM prompt (head + tail)
    pub llm_window_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Report format: json, markdown or both
    pub format: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            content_size_ceiling: 1_000_000,
            use_llm: true,
            llm_sample_limit: 10,
            llm_window_chars: 4000,
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        let include = [
            "*.py", "*.js", "*.jsx", "*.ts", "*.tsx", "*.java", "*.c", "*.cpp", "*.h", "*.cs",
            "*.go", "*.rb", "*.php", "*.rs", "*.kt", "*.swift", "*.html", "*.css", "*.scss",
            "*.json", "*.yaml", "*.yml", "*.xml", "*.md", "*.txt", "*.toml", "*.tf", "*.tfvars",
            "Dockerfile", "*.dockerfile", "Makefile", "Jenkinsfile", "Gemfile", "Pipfile",
            "*.properties", "*.config", "*.cfg", "*.ini", "*.env", "*.sh", "*.bat", "*.ps1",
            "*.gradle", "*.gradle.kts", "*.sql", "*.proto", "*.csproj", "*.sln",
        ];
        let exclude = [
            "**/node_modules/**", "**/.git/**", "**/__pycache__/**", "**/venv/**",
            "**/build/**", "**/dist/**", "**/bin/**", "**/obj/**", "**/.next/**",
            "**/.idea/**", "**/.vscode/**", "**/tmp/**", "**/temp/**", "**/logs/**",
            "**/coverage/**", "**/vendor/**", "**/third_party/**", "**/target/**",
            "**/*.min.js", "**/*.min.css", "**/*.log", "**/.DS_Store",
        ];

        Self {
            include_patterns: include.iter().map(|p| p.to_string()).collect(),
            exclude_patterns: exclude.iter().map(|p| p.to_string()).collect(),
            max_file_size: 100_000,
            respect_gitignore: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: ProjectConfig {
                name: None,
                output_dir: PathBuf::from("output"),
            },
            crawl: CrawlConfig::default(),
            analysis: AnalysisConfig::default(),
            llm: LlmConfig {
                enabled: false,
                provider: "openai".to_string(),
                model: "gpt-4o".to_string(),
                api_key: None,
                base_url: None,
                max_tokens: Some(4000),
                temperature: Some(0.2),
                timeout_secs: 120,
                cache_dir: None,
            },
            output: OutputConfig {
                format: "json".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| CloudReadyError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CloudReadyError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Ok(Self::default())
                }
            }
            None => {
                let candidates = ["cloudready.toml", ".cloudready.toml"];

                for candidate in &candidates {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.analysis.batch_size == 0 {
            return Err(CloudReadyError::Config("analysis.batch_size must be at least 1".to_string()));
        }
        if !matches!(self.output.format.as_str(), "json" | "markdown" | "both") {
            return Err(CloudReadyError::Config(format!(
                "Unsupported output format: {}",
                self.output.format
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloudready.toml");

        Config::default().save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();

        assert_eq!(loaded.analysis.batch_size, 50);
        assert_eq!(loaded.analysis.content_size_ceiling, 1_000_000);
        assert_eq!(loaded.crawl.max_file_size, 100_000);
        assert_eq!(loaded.llm.provider, "openai");
    }

    #[test]
    fn test_rejects_zero_batch_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloudready.toml");

        let mut config = Config::default();
        config.analysis.batch_size = 0;
        config.save(&path).unwrap();

        assert!(matches!(Config::load(&path), Err(CloudReadyError::Config(_))));
    }

    #[test]
    fn test_missing_explicit_path_falls_back_to_default() {
        let config = Config::load_or_default(Some("/definitely/not/here.toml")).unwrap();
        assert_eq!(config.output.format, "json");
    }

    #[test]
    fn test_explicit_api_key_wins() {
        let mut llm = Config::default().llm;
        llm.api_key = Some("sk-test".to_string());
        assert_eq!(llm.resolved_api_key().as_deref(), Some("sk-test"));

        llm.provider = "ollama".to_string();
        llm.api_key = None;
        assert_eq!(llm.resolved_api_key(), None);
    }
}
