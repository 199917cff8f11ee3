mod cli;

use music_channel::{
    bot::{AdminGate, Bot, Router},
    config,
    dispatch::Dispatcher,
    intake::Intake,
    processor::JobProcessor,
    state::AppState,
    tracker,
    transform::{self, FfmpegTranscoder},
    transport::{TelegramClient, Transport},
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::sync::Arc;

async fn start_bot(config_path: Option<&std::path::Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    config::validate_for_start(&config)?;

    tracing::info!("Starting music-channel");
    tracing::info!(
        administrators = config.administrators.len(),
        channel = config.channel_username.as_deref().unwrap_or("-"),
        "Loaded configuration"
    );

    tokio::fs::create_dir_all(&config.temp_directory)
        .await
        .with_context(|| format!("Failed to create temp directory: {:?}", config.temp_directory))?;

    let ffmpeg = transform::check_tool(&config.tools.ffmpeg);
    if !ffmpeg.available {
        tracing::warn!("{} not found on PATH; every transform will fail", ffmpeg.name);
    }

    // Create state
    let state = AppState::new(config.tracker.default_ttl());
    let sweeper = tracker::start_sweeper(state.results(), config.tracker.interval());

    let client = Arc::new(TelegramClient::new(&config.token, &config.telegram));
    let transport: Arc<dyn Transport> = client.clone();

    // Create shutdown channel for job processor
    let (shutdown_tx, shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);

    // Start job processor
    let processor = JobProcessor::new(
        state.clone(),
        transport.clone(),
        Arc::new(FfmpegTranscoder::new(config.tools.ffmpeg.clone())),
        config.worker.idle_delay(),
        shutdown_rx,
    );
    let processor_handle = tokio::spawn(processor.run());

    let router = Router::new(
        AdminGate::new(config.administrator_set()),
        Intake::new(
            state.clone(),
            transport.clone(),
            config.temp_directory.clone(),
            config.intake.min_duration_secs,
        ),
        Dispatcher::new(state.clone(), transport.clone(), config.channel_username.clone()),
        transport,
    );

    Bot::new(client, Arc::new(router))
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for ctrl-c: {}", e);
            }
        })
        .await;

    // Cleanup
    tracing::info!("Shutting down...");
    let _ = shutdown_tx.send(()).await;
    let _ = processor_handle.await;
    sweeper.abort();

    let stats = state.get_stats();
    tracing::info!(
        processed = stats.total_processed,
        successful = stats.successful,
        failed = stats.failed,
        "Final job statistics"
    );

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "music_channel=trace,music_channel_common=debug,reqwest=debug".to_string()
        } else {
            "music_channel=debug,reqwest=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_bot(cli.config.as_deref()))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("music-channel {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn check_tools(config_path: Option<&std::path::Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let program = match config::load_config_or_default(config_path) {
        Ok(config) => config.tools.ffmpeg,
        Err(e) => {
            tracing::warn!("Using default tool names: {:#}", e);
            config::Config::default().tools.ffmpeg
        }
    };

    let tool = transform::check_tool(&program);
    let status = if tool.available { "✓" } else { "✗" };
    print!("{} {}", status, tool.name);
    if let Some(ref path) = tool.path {
        print!(" - {}", path.display());
    }
    println!("\n");

    if tool.available {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install them to enable all features.");
    }

    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Token set: {}", !config.token.trim().is_empty());
            println!("  Administrators: {}", config.administrators.len());
            println!(
                "  Channel: {}",
                config.channel_username.as_deref().unwrap_or("(none)")
            );
            println!("  Temp directory: {}", config.temp_directory.display());
            println!(
                "  Result TTL: {}s (sweep every {}s)",
                config.tracker.default_ttl_secs, config.tracker.interval_secs
            );
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Temp directory: {}", config.temp_directory.display());
            println!("  Result TTL: {}s", config.tracker.default_ttl_secs);
        }
    }

    Ok(())
}
