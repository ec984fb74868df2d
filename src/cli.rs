use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mkvsource")]
#[command(author, version, about = "Incremental Matroska demuxer")]
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
    /// Print container metadata: info, tracks, seek head and cues
    Probe {
        /// Matroska or WebM file
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Demux a file and print one line per frame
    Dump {
        /// Matroska or WebM file
        #[arg(required = true)]
        file: PathBuf,

        /// Track to output (repeatable, default: all tracks)
        #[arg(short, long = "track")]
        tracks: Vec<u64>,

        /// Start position in seconds (requires a cue index unless 0)
        #[arg(short, long)]
        start: Option<f64>,

        /// Stop after this many frames
        #[arg(short, long)]
        limit: Option<usize>,

        /// Rewrite H.264 frames to Annex-B
        #[arg(long)]
        annexb: bool,

        /// Output as JSON lines
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
