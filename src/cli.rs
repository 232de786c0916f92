use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use anyhow::Result;

use crate::core::{AnalyzeOptions, Engine};

#[derive(Parser)]
#[command(name = "cloudready")]
#[command(about = "Cloud readiness assessment for source repositories")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Json,
    Markdown,
    Both,
}

impl ReportFormat {
    fn as_str(self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Markdown => "markdown",
            ReportFormat::Both => "both",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a source tree and write a cloud readiness report
    Analyze {
        /// Source directory to analyze (defaults to current directory)
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Project name used in the report and output path
        #[arg(short = 'n', long)]
        project_name: Option<String>,

        /// Skip the LLM assessment and use rule-based scores only
        #[arg(long)]
        no_llm: bool,

        /// Root directory for reports
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report format
        #[arg(short, long, value_enum)]
        format: Option<ReportFormat>,

        /// Number of files per scanning batch
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Write a default cloudready.toml
    Init {
        /// Target directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Recover and normalize a saved LLM response
    RepairJson {
        /// File holding the raw response text
        file: PathBuf,
    },
}

impl Cli {
    pub async fn execute(self, engine: Engine) -> Result<()> {
        match self.command {
            Commands::Analyze { source, project_name, no_llm, output, format, batch_size } => {
                let written = engine
                    .analyze(AnalyzeOptions {
                        source,
                        project_name,
                        no_llm,
                        output,
                        format: format.map(|f| f.as_str().to_string()),
                        batch_size,
                    })
                    .await?;
                for path in written {
                    println!("{}", path.display());
                }
                Ok(())
            }
            Commands::Init { path } => {
                let config_path = engine.init(path).await?;
                println!("{}", config_path.display());
                Ok(())
            }
            Commands::RepairJson { file } => {
                println!("{}", engine.repair_json(&file).await?);
                Ok(())
            }
        }
    }
}
