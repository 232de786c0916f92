use std::path::{Path, PathBuf};

use ignore::overrides::{Override, OverrideBuilder};
use ignore::WalkBuilder;
use tracing::{debug, warn};

use super::model::FileRecord;
use crate::config::CrawlConfig;
use crate::error::{CloudReadyError, Result};

/// Collects [`FileRecord`]s from a local directory
pub struct LocalCrawler {
    root: PathBuf,
    config: CrawlConfig,
}

impl LocalCrawler {
    pub fn new<P: AsRef<Path>>(root: P, config: &CrawlConfig) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            config: config.clone(),
        }
    }

    /// Walk the tree. Unreadable and oversized files are skipped; files that are not UTF-8
    /// text are kept as binary records.
    pub fn crawl(&self) -> Result<Vec<FileRecord>> {
        if !self.root.is_dir() {
            return Err(CloudReadyError::Crawl(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }

        let walker = WalkBuilder::new(&self.root)
            .hidden(false)
            .git_ignore(self.config.respect_gitignore)
            .git_exclude(self.config.respect_gitignore)
            .git_global(self.config.respect_gitignore)
            .require_git(false)
            .overrides(self.overrides()?)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut records = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            if let Some(record) = self.read_file(entry.path()) {
                records.push(record);
            }
        }

        debug!("Crawled {} files under {}", records.len(), self.root.display());
        Ok(records)
    }

    fn overrides(&self) -> Result<Override> {
        let mut builder = OverrideBuilder::new(&self.root);
        for pattern in &self.config.include_patterns {
            builder.add(pattern).map_err(|e| glob_error(pattern, e))?;
        }
        for pattern in &self.config.exclude_patterns {
            let negated = format!("!{}", pattern);
            builder.add(&negated).map_err(|e| glob_error(pattern, e))?;
        }
        builder
            .build()
            .map_err(|e| CloudReadyError::Crawl(format!("Invalid glob set: {}", e)))
    }

    fn read_file(&self, path: &Path) -> Option<FileRecord> {
        let relative = self.relative_path(path);

        let size = match std::fs::metadata(path) {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                warn!("Skipping {}: {}", relative, e);
                return None;
            }
        };
        if size > self.config.max_file_size {
            debug!("Skipping {} ({} bytes exceeds max_file_size)", relative, size);
            return None;
        }

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Skipping {}: {}", relative, e);
                return None;
            }
        };

        if bytes.contains(&0) {
            return Some(FileRecord::binary(relative));
        }
        match String::from_utf8(bytes) {
            Ok(text) => Some(FileRecord::text(relative, text)),
            Err(_) => Some(FileRecord::binary(relative)),
        }
    }

    fn relative_path(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn glob_error(pattern: &str, error: ignore::Error) -> CloudReadyError {
    CloudReadyError::Crawl(format!("Invalid glob '{}': {}", pattern, error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::FileContent;
    use std::fs;

    fn write(root: &Path, relative: &str, content: &[u8]) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn paths(records: &[FileRecord]) -> Vec<&str> {
        records.iter().map(|r| r.path.as_str()).collect()
    }

    #[test]
    fn test_crawl_applies_globs_and_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "app/main.py", b"print('hi')");
        write(root, "Dockerfile", b"FROM python:3.12");
        write(root, "node_modules/lib/index.js", b"module.exports = {}");
        write(root, "notes.unknownext", b"ignored");
        write(root, "data/big.json", &vec![b'a'; 2048]);

        let config = CrawlConfig {
            max_file_size: 1024,
            ..CrawlConfig::default()
        };
        let records = LocalCrawler::new(root, &config).crawl().unwrap();

        assert_eq!(paths(&records), vec!["Dockerfile", "app/main.py"]);
        assert_eq!(records[1].as_text(), Some("print('hi')"));
    }

    #[test]
    fn test_non_utf8_content_is_binary() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "blob.txt", &[0xff, 0xfe, 0x00, 0x41]);

        let records = LocalCrawler::new(dir.path(), &CrawlConfig::default()).crawl().unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content, FileContent::Binary);
    }

    #[test]
    fn test_gitignore_is_respected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), ".gitignore", b"generated/\n");
        write(dir.path(), "generated/schema.sql", b"CREATE TABLE t (id int);");
        write(dir.path(), "src/app.ts", b"export const x = 1;");

        let records = LocalCrawler::new(dir.path(), &CrawlConfig::default()).crawl().unwrap();
        assert_eq!(paths(&records), vec!["src/app.ts"]);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let crawler = LocalCrawler::new("/definitely/not/here", &CrawlConfig::default());
        assert!(matches!(crawler.crawl(), Err(CloudReadyError::Crawl(_))));
    }
}
