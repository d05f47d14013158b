use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "relay",
    about = "Transcript Relay - Fetch YouTube transcripts through a chain of providers",
    version,
    long_about = "A backend relay that fetches YouTube transcripts from paid transcript APIs with a proxied direct fetch as the last resort, and scrapes websites through Firecrawl."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP relay server
    Serve {
        /// Address to bind (overrides config)
        #[arg(long, value_name = "HOST")]
        host: Option<String>,

        /// Port to listen on (overrides config and PORT)
        #[arg(short, long, value_name = "PORT")]
        port: Option<u16>,
    },

    /// Fetch a transcript once through the provider chain
    Transcript {
        /// YouTube URL or bare video id
        #[arg(value_name = "URL_OR_ID")]
        url: String,

        /// Preferred language codes, most preferred first (repeatable)
        #[arg(short, long = "language", value_name = "LANG")]
        languages: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List the caption tracks available for a video
    List {
        /// YouTube URL or bare video id
        #[arg(value_name = "URL_OR_ID")]
        url: String,
    },

    /// Show the provider chain built from the current configuration
    Providers,

    /// Show configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON in the HTTP response shape
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
