use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "discprobe")]
#[command(author, version, about = "Media inspection service for video files, BDMV folders and ISOs")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server with web UI
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print a mediainfo report for a file or directory
    Info {
        /// File or directory to inspect
        #[arg(required = true)]
        input: PathBuf,
    },

    /// Capture a screenshot set from a file, BDMV folder or ISO
    Shots {
        /// Input to capture from
        #[arg(required = true)]
        input: PathBuf,

        /// Directory to write the captured frames into
        #[arg(short, long, default_value = "shots")]
        out: PathBuf,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
