use clap::{Parser, Subcommand, ValueEnum};
use rendition::{AudioLayout, DynamicRange, SubtitleSelection};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(
    name = "evdl",
    about = "Evdl - pick and download renditions of HLS event streams",
    version,
    author
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true, env = "EVDL_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Request timeout in seconds (overrides the configuration)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Number of retry attempts (overrides the configuration)
    #[arg(long, global = true)]
    pub retries: Option<u32>,
}

/// Where the master playlist comes from.
#[derive(clap::Args, Debug, Clone)]
pub struct SourceArgs {
    /// Master playlist URL or local file path
    pub source: String,

    /// Base URL for resolving relative URIs of a local playlist
    #[arg(long)]
    pub base_url: Option<Url>,
}

/// Rendition choices. Anything left out falls back to the configuration.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Ask for every choice interactively
    #[arg(short, long)]
    pub interactive: bool,

    /// Video flavors, best variant of each (e.g. "sdr,dolby-vision")
    #[arg(long, value_enum, value_delimiter = ',', conflicts_with = "video_index")]
    pub video: Vec<DynamicRange>,

    /// Video variants by stream matrix index (e.g. "3+7")
    #[arg(long, value_delimiter = '+')]
    pub video_index: Vec<usize>,

    /// Audio languages in priority order (e.g. "en,fr")
    #[arg(short, long, value_delimiter = ',')]
    pub audio: Vec<String>,

    /// Audio layouts fetched for every language
    #[arg(long, value_enum, value_delimiter = ',')]
    pub layout: Vec<AudioLayout>,

    /// Also fetch audio description tracks
    #[arg(long)]
    pub audio_description: bool,

    /// Skip audio description tracks even when the configuration enables them
    #[arg(long, conflicts_with = "audio_description")]
    pub no_audio_description: bool,

    /// Subtitles: "all", "none" or languages (e.g. "en,ja")
    #[arg(short, long)]
    pub subtitles: Option<SubtitleSelection>,

    /// Subtitle language flagged as default in the muxed file
    #[arg(long)]
    pub default_subtitle: Option<String>,

    /// Directory the renditions are fetched to
    #[arg(short, long)]
    pub download_dir: Option<PathBuf>,

    /// Muxed output file
    #[arg(short = 'm', long)]
    pub mkv: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the renditions of a master playlist
    List {
        #[command(flatten)]
        source: SourceArgs,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Save output to file
        #[arg(short = 'O', long)]
        output_file: Option<PathBuf>,
    },

    /// Resolve a selection and print the fetch and mux commands
    Plan {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        selection: SelectionArgs,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Save output to file
        #[arg(short = 'O', long)]
        output_file: Option<PathBuf>,
    },

    /// Resolve a selection and fetch the renditions with ffmpeg
    Download {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        selection: SelectionArgs,

        /// Run the mkvmerge command after fetching
        #[arg(long)]
        mux: bool,

        /// Maximum concurrent fetches
        #[arg(long)]
        max_concurrent: Option<usize>,
    },

    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    /// Show configuration information
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Reset configuration to defaults
        #[arg(long)]
        reset: bool,
    },
}

#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Pretty-printed human-readable output
    #[default]
    Pretty,
    /// JSON output
    Json,
    /// Compact JSON output
    JsonCompact,
    /// Table format
    Table,
    /// CSV format
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Pretty => write!(f, "pretty"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::JsonCompact => write!(f, "json-compact"),
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}
