use anyhow::Result;
use clap::Parser;
use std::process;
use tracing_subscriber::EnvFilter;
use youtube_stats::cli::{self, Cli, Commands};
use youtube_stats::config::Config;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        eprintln!("\nFor help, run: youtube-stats --help");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("youtube_stats=debug,info"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("youtube_stats=info,warn"))
    };

    // stdout carries command output, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::InitConfig { output, force } => {
            cli::run_init_config(&output, force).await?;
            println!("Created example configuration at {:?}", output);
            println!(
                "Set youtube.channel_id and youtube.api_key before running, \
                 or provide YOUTUBE_CHANNEL_ID / YOUTUBE_API_KEY in the environment or .env"
            );
            Ok(())
        }

        Commands::Export { out_file } => {
            let config = Config::load(&cli.config).await?;
            let (path, statistics) = cli::run_export(&config, out_file).await?;
            println!("Wrote statistics to {:?}", path);
            println!("{}", cli::format_table(&statistics.video_count));
            Ok(())
        }

        Commands::Stats { category } => {
            let config = Config::load(&cli.config).await?;
            println!("{}", cli::run_stats(&config, category.as_deref()).await?);
            Ok(())
        }

        Commands::Serve { bind } => {
            let config = Config::load(&cli.config).await?;
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!("Failed to listen for Ctrl-C: {}", e);
                    std::future::pending::<()>().await;
                }
            };
            cli::run_serve(&config, bind, shutdown).await?;
            Ok(())
        }
    }
}
