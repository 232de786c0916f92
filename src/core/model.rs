use serde::{Deserialize, Serialize};

/// Content of a crawled file; binary files keep their path but no text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum FileContent {
    Text(String),
    Binary,
}

/// A single file handed to the analysis engine by a crawler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path relative to the analyzed root, `/`-separated
    pub path: String,
    pub content: FileContent,
}

impl FileRecord {
    pub fn text(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: FileContent::Text(content.into()),
        }
    }

    pub fn binary(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: FileContent::Binary,
        }
    }

    /// Text content, if any
    pub fn as_text(&self) -> Option<&str> {
        match &self.content {
            FileContent::Text(text) => Some(text),
            FileContent::Binary => None,
        }
    }

    /// Text content if it is small enough to be scanned
    pub fn scannable_text(&self, ceiling: usize) -> Option<&str> {
        self.as_text().filter(|text| text.len() <= ceiling)
    }

    /// Final path component
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scannable_text_respects_ceiling() {
        let record = FileRecord::text("src/app.py", "x".repeat(10));
        assert!(record.scannable_text(10).is_some());
        assert!(record.scannable_text(9).is_none());
        assert!(FileRecord::binary("logo.png").scannable_text(usize::MAX).is_none());
    }

    #[test]
    fn test_file_name() {
        assert_eq!(FileRecord::binary("a/b/Dockerfile").file_name(), "Dockerfile");
        assert_eq!(FileRecord::binary("Cargo.toml").file_name(), "Cargo.toml");
    }
}
