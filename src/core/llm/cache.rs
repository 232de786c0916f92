use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::LlmClient;
use crate::error::Result;

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    provider: String,
    model: String,
    response: String,
}

/// Response cache on disk, keyed by the SHA-256 of provider, model and prompt
pub struct CachedClient {
    inner: Arc<dyn LlmClient>,
    dir: PathBuf,
}

impl CachedClient {
    pub fn new(inner: Arc<dyn LlmClient>, dir: PathBuf) -> Self {
        Self { inner, dir }
    }

    fn entry_path(&self, prompt: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(self.inner.provider_name().as_bytes());
        hasher.update(b"\0");
        hasher.update(self.inner.model_name().as_bytes());
        hasher.update(b"\0");
        hasher.update(prompt.as_bytes());
        self.dir.join(format!("{:x}.json", hasher.finalize()))
    }

    async fn read_entry(path: &Path) -> Option<String> {
        let raw = tokio::fs::read_to_string(path).await.ok()?;
        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) => Some(entry.response),
            Err(e) => {
                warn!("Ignoring unreadable cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    async fn write_entry(&self, path: &Path, response: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let entry = CacheEntry {
            provider: self.inner.provider_name().to_string(),
            model: self.inner.model_name().to_string(),
            response: response.to_string(),
        };
        tokio::fs::write(path, serde_json::to_string_pretty(&entry)?).await?;
        Ok(())
    }
}

#[async_trait]
impl LlmClient for CachedClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let path = self.entry_path(prompt);
        if let Some(response) = Self::read_entry(&path).await {
            debug!("LLM cache hit: {}", path.display());
            return Ok(response);
        }

        let response = self.inner.complete(prompt).await?;
        if let Err(e) = self.write_entry(&path, &response).await {
            warn!("Failed to write LLM cache entry {}: {}", path.display(), e);
        }
        Ok(response)
    }

    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingClient {
        calls: AtomicUsize,
        model: &'static str,
    }

    impl CountingClient {
        fn new(model: &'static str) -> Self {
            Self { calls: AtomicUsize::new(0), model }
        }
    }

    #[async_trait]
    impl LlmClient for CountingClient {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("echo: {prompt}"))
        }

        fn provider_name(&self) -> &str {
            "counting"
        }

        fn model_name(&self) -> &str {
            self.model
        }
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let inner = Arc::new(CountingClient::new("test"));
        let cached = CachedClient::new(inner.clone(), dir.path().join("cache"));

        let first = cached.complete("assess this").await.unwrap();
        let second = cached.complete("assess this").await.unwrap();
        let other = cached.complete("something else").await.unwrap();

        assert_eq!(first, "echo: assess this");
        assert_eq!(first, second);
        assert_eq!(other, "echo: something else");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_entries_are_separate_per_model() {
        let dir = tempfile::tempdir().unwrap();
        let small = Arc::new(CountingClient::new("small"));
        let large = Arc::new(CountingClient::new("large"));

        CachedClient::new(small.clone(), dir.path().to_path_buf()).complete("same prompt").await.unwrap();
        CachedClient::new(large.clone(), dir.path().to_path_buf()).complete("same prompt").await.unwrap();

        assert_eq!(small.calls.load(Ordering::SeqCst), 1);
        assert_eq!(large.calls.load(Ordering::SeqCst), 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }
}
