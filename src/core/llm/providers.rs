use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::cache::CachedClient;
use super::LlmClient;
use crate::config::LlmConfig;
use crate::error::{CloudReadyError, Result};

const SYSTEM_PROMPT: &str = "You are a cloud architecture expert. You assess codebases for cloud readiness and answer strictly in JSON.";

/// Factory function to create the configured LLM client, wrapped in the response cache
/// when `cache_dir` is set
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    if !config.enabled {
        return Err(CloudReadyError::Config("LLM integration is disabled".to_string()));
    }

    let client: Arc<dyn LlmClient> = match config.provider.as_str() {
        "openai" => Arc::new(OpenAiProvider::new(config)?),
        "anthropic" => Arc::new(AnthropicProvider::new(config)?),
        "ollama" => Arc::new(OllamaProvider::new(config)),
        _ => {
            return Err(CloudReadyError::Config(format!(
                "Unsupported LLM provider: {}",
                config.provider
            )))
        }
    };

    match &config.cache_dir {
        Some(dir) => Ok(Arc::new(CachedClient::new(client, dir.clone()))),
        None => Ok(client),
    }
}

fn require_api_key(config: &LlmConfig) -> Result<String> {
    config.resolved_api_key().ok_or_else(|| {
        CloudReadyError::Config(format!("API key required for the {} provider", config.provider))
    })
}

async fn post_json(
    request: reqwest::RequestBuilder,
    payload: &Value,
    provider: &str,
) -> Result<Value> {
    let response = request
        .header("Content-Type", "application/json")
        .json(payload)
        .send()
        .await
        .map_err(|e| CloudReadyError::Llm(format!("{} API request failed: {}", provider, e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        return Err(CloudReadyError::Llm(format!(
            "{} API error {}: {}",
            provider, status, error_text
        )));
    }

    response
        .json()
        .await
        .map_err(|e| CloudReadyError::Llm(format!("Failed to parse {} response: {}", provider, e)))
}

fn missing_content(provider: &str) -> CloudReadyError {
    CloudReadyError::Llm(format!("No content in {} response", provider))
}

/// OpenAI chat completions (also works with compatible proxies via `base_url`)
pub struct OpenAiProvider {
    config: LlmConfig,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            api_key: require_api_key(config)?,
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiProvider {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let base_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or("https://api.openai.com/v1")
            .trim_end_matches('/');

        let payload = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt }
            ],
            "max_tokens": self.config.max_tokens.unwrap_or(4000),
            "temperature": self.config.temperature.unwrap_or(0.2)
        });

        debug!("Sending {} prompt chars to OpenAI model {}", prompt.len(), self.config.model);
        let request = self
            .client
            .post(format!("{}/chat/completions", base_url))
            .header("Authorization", format!("Bearer {}", self.api_key));
        let data = post_json(request, &payload, "OpenAI").await?;

        data["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| missing_content("OpenAI"))
    }

    fn provider_name(&self) -> &str {
        "OpenAI"
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Anthropic messages API
pub struct AnthropicProvider {
    config: LlmConfig,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            api_key: require_api_key(config)?,
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl LlmClient for AnthropicProvider {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let base_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or("https://api.anthropic.com/v1")
            .trim_end_matches('/');

        let payload = json!({
            "model": self.config.model,
            "system": SYSTEM_PROMPT,
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": self.config.max_tokens.unwrap_or(4000),
            "temperature": self.config.temperature.unwrap_or(0.2)
        });

        debug!("Sending {} prompt chars to Anthropic model {}", prompt.len(), self.config.model);
        let request = self
            .client
            .post(format!("{}/messages", base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01");
        let data = post_json(request, &payload, "Anthropic").await?;

        let text: String = data["content"]
            .as_array()
            .map(|blocks| {
                blocks
                    .iter()
                    .filter_map(|block| block["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(missing_content("Anthropic"));
        }
        Ok(text)
    }

    fn provider_name(&self) -> &str {
        "Anthropic"
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Local Ollama server; no API key
pub struct OllamaProvider {
    config: LlmConfig,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            config: config.clone(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmClient for OllamaProvider {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let base_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or("http://localhost:11434")
            .trim_end_matches('/');

        let payload = json!({
            "model": self.config.model,
            "system": SYSTEM_PROMPT,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": self.config.temperature.unwrap_or(0.2),
                "num_predict": self.config.max_tokens.unwrap_or(4000)
            }
        });

        debug!("Sending {} prompt chars to Ollama model {}", prompt.len(), self.config.model);
        let request = self.client.post(format!("{}/api/generate", base_url));
        let data = post_json(request, &payload, "Ollama").await?;

        data["response"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| missing_content("Ollama"))
    }

    fn provider_name(&self) -> &str {
        "Ollama"
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_disabled_config_is_rejected() {
        let config = Config::default().llm;
        assert!(matches!(create_client(&config), Err(CloudReadyError::Config(_))));
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let mut config = Config::default().llm;
        config.enabled = true;
        config.provider = "carrier-pigeon".to_string();
        assert!(matches!(create_client(&config), Err(CloudReadyError::Config(_))));
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let mut config = Config::default().llm;
        config.enabled = true;
        config.provider = "ollama".to_string();
        config.model = "llama3".to_string();

        let client = create_client(&config).unwrap();
        assert_eq!(client.provider_name(), "Ollama");
        assert_eq!(client.model_name(), "llama3");
    }
}
