use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

#[derive(Parser)]
#[command(
    name = "framectl",
    version,
    about = "Inspect streams and replay playback scenarios against the Family Frame player engine",
    long_about = None
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true, env = "FRAMECTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show how a channel url would be attached to the media element
    Resolve {
        /// Channel url
        url: String,

        /// Pretend the HLS library is unavailable
        #[arg(long)]
        no_hls_library: bool,

        /// Pretend the media element plays HLS natively
        #[arg(long)]
        native_hls: bool,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
        output: OutputFormat,
    },

    /// Fetch an HLS playlist and list the quality tiers the player would offer
    Probe {
        /// Playlist url
        url: String,

        /// Request timeout in seconds (overrides the config file)
        #[arg(short, long)]
        timeout: Option<u64>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
        output: OutputFormat,
    },

    /// List a channel catalog file grouped by category
    Channels {
        /// JSON file with channel groups or a flat channel list
        file: PathBuf,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
        output: OutputFormat,
    },

    /// Replay a scripted scenario against the player with simulated media
    Simulate {
        /// JSON scenario script
        script: PathBuf,

        /// Divide every delay by this factor (overrides the config file)
        #[arg(long)]
        time_scale: Option<f64>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
        output: OutputFormat,
    },

    /// Show or reset the configuration
    Config {
        #[arg(long, conflicts_with = "reset")]
        show: bool,

        #[arg(long)]
        reset: bool,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Commands {
    pub fn output_format(&self) -> Option<OutputFormat> {
        match self {
            Self::Resolve { output, .. }
            | Self::Probe { output, .. }
            | Self::Channels { output, .. }
            | Self::Simulate { output, .. } => Some(*output),
            Self::Config { .. } | Self::Completions { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human readable
    Pretty,
    /// Pretty-printed JSON
    Json,
    /// One JSON document per line
    JsonCompact,
}

impl OutputFormat {
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json | Self::JsonCompact)
    }
}
