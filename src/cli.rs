use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "class-archive")]
#[command(about = "List and read compiled Java classes from a class directory")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Target runtime release for multi-release overlays
    #[arg(long, value_name = "N", global = true)]
    pub release: Option<u32>,

    #[arg(long, value_name = "N", global = true)]
    pub max_depth: Option<usize>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    List {
        /// Class directory or file: URL
        root: String,

        #[arg(long, value_name = "PACKAGE")]
        base_package: Option<String>,

        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    Fetch {
        root: String,

        class_name: String,

        #[arg(long, value_name = "PACKAGE")]
        base_package: Option<String>,

        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    Digest {
        root: String,

        #[arg(long, value_name = "PACKAGE")]
        base_package: Option<String>,
    },
    Decode {
        path: String,
    },
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}
