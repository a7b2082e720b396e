use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "docbench-studio")]
#[command(about = "DocBench Studio - interactive document-store query workbench")]
#[command(version)]
pub struct Args {
    /// Directory for the saved-query database (default: system temp)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Schema metadata JSON file replacing the built-in table
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Query to run, as a URL query string (e.g. "path=posts&limit=10")
    #[arg(long)]
    pub query: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub data_dir: Option<PathBuf>,
    pub schema_path: Option<PathBuf>,
    pub query: Option<String>,
    pub log_level: String,
}

impl From<Args> for StudioConfig {
    fn from(args: Args) -> Self {
        Self {
            data_dir: args.data_dir,
            schema_path: args.schema,
            query: args.query,
            log_level: args.log_level,
        }
    }
}
