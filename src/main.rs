use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use transcript_relay::cli::{Cli, Commands};
use transcript_relay::config::{Config, RequestOverrides};
use transcript_relay::orchestrator::{FallbackOrchestrator, ProviderChain, TranscriptRequest};
use transcript_relay::providers::ProviderClients;
use transcript_relay::{output, server, utils};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "transcript_relay=debug,tower_http=debug"
    } else {
        "transcript_relay=info,tower_http=info"
    };

    // Initialize tracing; logs go to stderr so command output stays pipeable
    let json_logs = std::env::var("LOG_FORMAT").map(|f| f == "json").unwrap_or(false);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    let mut config = Config::load()?;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            server::serve(config).await?;
        }
        Commands::Transcript { url, languages, format } => {
            let request = TranscriptRequest::new(&url, Some(languages), RequestOverrides::default())?;
            let clients = ProviderClients::from_config(&config)?;
            let orchestrator = FallbackOrchestrator::from_config(&config, &clients, &request.overrides);

            let progress = spinner(cli.quiet)?;
            progress.set_message(format!("Fetching transcript for {}...", request.video_id));

            let result = orchestrator.run(&request).await;
            progress.finish_and_clear();

            output::print_transcript(&result?, &format)?;
        }
        Commands::List { url } => {
            let video_id = utils::extract_video_id(&url);
            let clients = ProviderClients::from_config(&config)?;

            let progress = spinner(cli.quiet)?;
            progress.set_message(format!("Listing transcripts for {}...", video_id));

            let listings = clients.direct().list(&video_id).await;
            progress.finish_and_clear();

            output::print_listings(&video_id, &listings?);
        }
        Commands::Providers => {
            let credentials = config.merged_credentials(&RequestOverrides::default());
            let chain = ProviderChain::from_config(&config, &credentials);

            println!("Provider chain (tried in order):");
            if chain.is_empty() {
                println!("  (none configured)");
            }
            for (position, kind) in chain.kinds().iter().enumerate() {
                println!("  {}. {}", position + 1, kind);
            }
        }
        Commands::Config { show } => {
            config.display();
            if !show {
                println!();
                println!("Settings come from config.yaml and environment variables (.env is loaded).");
            }
        }
    }

    Ok(())
}

fn spinner(quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }

    let progress = ProgressBar::new_spinner();
    progress.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    progress.enable_steady_tick(Duration::from_millis(100));
    Ok(progress)
}
