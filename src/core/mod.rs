mod analyzer;
pub mod architecture;
pub mod batch;
mod crawler;
mod engine;
pub mod llm;
pub mod merge;
pub mod model;
pub mod patterns;
pub mod progress;
pub mod recommendations;
mod report;
pub mod scanners;
pub mod scoring;
pub mod signals;

pub use analyzer::CloudReadinessAnalyzer;
pub use architecture::{classify, Architecture};
pub use crawler::LocalCrawler;
pub use engine::{AnalyzeOptions, Engine, CONFIG_FILE_NAME};
pub use model::{FileContent, FileRecord};
pub use progress::{progress_channel, ProgressEvent, ProgressReporter, ProgressState, ProgressTracker};
pub use recommendations::{Priority, Recommendation, RecommendationSource};
pub use report::{Report, JSON_REPORT_FILE, MARKDOWN_REPORT_FILE};
pub use scoring::{Factor, ReadinessLevel, ScoreCard};
pub use signals::Signals;
