mod config;
mod feed;
mod tracker;
mod web;

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;

use crate::config::Config;
use crate::feed::{ChannelRegistry, HttpBroker, HttpTrackSource, SubscriptionManager};
use crate::tracker::{Ellipsoid, LogRenderer, Session, StyleBook, Tracker, TrackerSettings};

#[derive(Parser)]
#[command(name = "trackcast")]
#[command(about = "Live position tracking from a server-sent event broker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a config file
    CheckConfig { config: String },
    /// List the channels the broker currently carries
    Channels { config: String },
    /// Track every channel until interrupted
    Run { config: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::CheckConfig { config } => check_config(&config),
        Commands::Channels { config } => channels(&config).await,
        Commands::Run { config } => run(&config).await,
    }
}

fn load(path: &str) -> Option<Config> {
    match Config::from_file(path) {
        Ok(config) => Some(config),
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            None
        }
    }
}

fn check_config(path: &str) -> ExitCode {
    let Some(config) = load(path) else {
        return ExitCode::FAILURE;
    };
    println!("Config is valid");
    println!("  broker: {}", config.source.base_url);
    println!(
        "  stale after {} (swept every {})",
        humantime::format_duration(config.staleness.threshold),
        humantime::format_duration(config.staleness.sweep_interval)
    );
    match &config.web {
        Some(web) => println!("  status API on {}", web.bind),
        None => println!("  status API disabled"),
    }
    ExitCode::SUCCESS
}

async fn channels(path: &str) -> ExitCode {
    let Some(config) = load(path) else {
        return ExitCode::FAILURE;
    };
    let broker = match HttpBroker::new(&config.source.base_url, config.source.request_timeout) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error creating HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match ChannelRegistry::new(Arc::new(broker)).list_channels().await {
        Ok(channels) => {
            for channel in channels {
                println!("{}", channel);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn tracker_settings(config: &Config) -> Result<TrackerSettings, chrono::OutOfRangeError> {
    Ok(TrackerSettings {
        stale_threshold: chrono::Duration::from_std(config.staleness.threshold)?,
        track_window: chrono::Duration::from_std(config.track.default_window)?,
    })
}

async fn run(path: &str) -> ExitCode {
    let Some(config) = load(path) else {
        return ExitCode::FAILURE;
    };
    let settings = match tracker_settings(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Duration out of range: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let base_url = &config.source.base_url;
    let timeout = config.source.request_timeout;
    let (broker, source) = match (
        HttpBroker::new(base_url, timeout),
        HttpTrackSource::new(base_url, timeout),
    ) {
        (Ok(broker), Ok(source)) => (Arc::new(broker), Arc::new(source)),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Error creating HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let channels = match ChannelRegistry::new(broker.clone()).list_channels().await {
        Ok(channels) => channels,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    log::info!("Discovered {} channels: {}", channels.len(), channels.join(", "));

    let mut session = Session::new(StyleBook::new(config.pointer_url()));
    session.register_channels(channels.iter().cloned());
    let session = session.shared();

    let tracker = Tracker::new(
        session.clone(),
        Arc::new(Ellipsoid::raised(config.geometry.height_m)),
        source,
        Arc::new(LogRenderer),
        settings,
    );

    let bootstrap = {
        let tracker = tracker.clone();
        tokio::spawn(async move {
            if let Err(e) = tracker.bootstrap().await {
                log::error!("Could not load active positions: {}", e);
            }
        })
    };

    let mut subscriptions = SubscriptionManager::new(broker, Arc::new(tracker.clone()));
    if let Err(e) = subscriptions.subscribe_all(&channels).await {
        eprintln!("{}", e);
        subscriptions.unsubscribe_all().await;
        bootstrap.abort();
        return ExitCode::FAILURE;
    }

    let active = channels
        .iter()
        .filter(|channel| subscriptions.is_active(channel))
        .count();
    log::info!("Streaming {} of {} channels", active, channels.len());

    let watchdog = tracker.spawn_watchdog(config.staleness.sweep_interval);

    let server = config.web.clone().map(|web| {
        let session = session.clone();
        tokio::spawn(async move {
            if let Err(e) = web::run_server(web, session).await {
                log::error!("Status server failed: {}", e);
            }
        })
    });

    let exit = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                log::error!("Could not listen for shutdown signal: {}", e);
            }
            ExitCode::SUCCESS
        }
        Some(lost) = subscriptions.next_lost() => {
            eprintln!("Lost channel {}: {}", lost.channel, lost.error);
            subscriptions.unsubscribe(&lost.channel).await;
            ExitCode::FAILURE
        }
    };
    log::info!("Shutting down");

    if let Some(server) = server {
        server.abort();
    }
    bootstrap.abort();
    watchdog.stop().await;
    subscriptions.unsubscribe_all().await;

    exit
}
