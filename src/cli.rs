use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "qtfaststart")]
#[command(author, version, about = "Move the moov atom of MP4/QuickTime files for fast start")]
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
    /// Rewrite a file so that moov comes before the media data
    Run {
        /// Input file to process
        #[arg(required = true)]
        input: PathBuf,

        /// Output file (may be the same as the input)
        #[arg(required = true)]
        output: PathBuf,

        /// Place moov at the end of the file instead of the front
        #[arg(long)]
        to_end: bool,

        /// Keep free atoms instead of removing them
        #[arg(long)]
        no_cleanup: bool,

        /// Maximum bytes copied per atom (0 = unlimited)
        #[arg(long)]
        limit: Option<u64>,
    },

    /// List the top-level atoms of a file
    List {
        /// File to inspect
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
