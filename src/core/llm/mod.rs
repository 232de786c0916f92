//! LLM integration for the secondary cloud readiness assessment
//!
//! Providers sit behind the [`LlmClient`] trait so the assessment adapter can be driven by
//! any backend (or a fake in tests). Responses go through the JSON repair chain before they
//! are normalized into an [`LlmAssessment`].

mod assessment;
mod cache;
pub mod json_repair;
mod providers;

pub use assessment::{
    build_prompt, canonical_factor_name, sample_files, truncate_middle, LlmAssessment,
    LlmAssessor, LlmFactor,
};
pub use cache::CachedClient;
pub use json_repair::{recover_object, RepairChain, RepairStrategy};
pub use providers::{create_client, AnthropicProvider, OllamaProvider, OpenAiProvider};

use async_trait::async_trait;

use crate::error::Result;

/// A text completion backend
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send one prompt and return the raw response text
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Get the provider name
    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;
}
