use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Portfolio site with a streaming Q&A assistant
#[derive(Debug, Parser)]
#[command(name = "portfolio")]
#[command(version)]
#[command(about = "Portfolio site with a streaming Q&A assistant", long_about = None)]
pub struct Args {
    /// Config file (default: config dir/config.toml)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Model name
    #[arg(short = 'm', long = "model")]
    pub model: Option<String>,

    /// Provider (default: config chat.provider or "google")
    #[arg(long = "provider")]
    pub provider: Option<String>,

    #[command(subcommand)]
    pub cmd: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the web server (default)
    Serve {
        /// Listen address, e.g. 127.0.0.1:8000
        #[arg(long = "bind")]
        bind: Option<String>,
    },

    /// Ask the assistant one question and print the answer as it streams
    Ask {
        /// Question text
        #[arg(value_name = "QUESTION", required = true)]
        question: Vec<String>,
    },

    /// Store a resume JSON file as the document shown on /resume
    SeedResume {
        /// Path to the resume JSON
        path: PathBuf,
    },
}
