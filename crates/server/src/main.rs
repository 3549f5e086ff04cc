use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use ferry_registry::FileRegistryBuilder;
use ferry_server::bot::{Bot, BotSettings, run_polling};
use ferry_server::config::FerryConfig;
use ferry_server::error::ServerError;
use ferry_server::links::LinkPresenter;
use ferry_server::relay_factory::create_relay;
use ferry_server::store_factory::create_store;
use ferry_server::telemetry;
use ferry_telegram::{TelegramClient, TelegramConfig};

/// Ferry file relay bot.
#[derive(Parser, Debug)]
#[command(name = "ferry-server", about = "Telegram bot that shares files through expiring links")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "ferry.toml")]
    config: String,

    /// Override how long shared files stay available, in hours.
    #[arg(long)]
    retention_hours: Option<u64>,

    /// Override the eviction sweep interval, in seconds.
    #[arg(long)]
    sweep_interval: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration from TOML file, or use defaults if the file does not exist.
    let mut config: FerryConfig = if Path::new(&cli.config).exists() {
        let contents = std::fs::read_to_string(&cli.config)?;
        toml::from_str(&contents)?
    } else {
        toml::from_str("")?
    };
    if let Some(hours) = cli.retention_hours {
        config.retention.hours = hours;
    }
    if let Some(seconds) = cli.sweep_interval {
        config.sweeper.interval_seconds = seconds;
    }

    telemetry::init(&config.logging);
    info!(config = %cli.config, "starting ferry-server");

    let store = create_store(&config.store)?;
    store.ping().await?;
    info!(backend = %config.store.backend, "metadata store reachable");

    let bot_token = config
        .telegram
        .resolve_bot_token()
        .ok_or_else(|| ServerError::Config("telegram bot token is required".into()))?;
    let telegram = Arc::new(TelegramClient::new(
        TelegramConfig::new(bot_token)
            .with_api_base_url(&config.telegram.api_base_url)
            .with_request_timeout(config.telegram.request_timeout()),
    )?);

    let bot_username = match config.telegram.bot_username.clone() {
        Some(username) => username,
        None => {
            let me = telegram.get_me().await?;
            me.username.ok_or_else(|| {
                ServerError::Config("bot has no username; set telegram.bot_username".into())
            })?
        }
    };
    info!(%bot_username, "connected to Telegram");

    let relay = create_relay(&config.relay, &config.telegram, &telegram)?;
    let registry = Arc::new(
        FileRegistryBuilder::new()
            .store(Arc::clone(&store))
            .relay(Arc::clone(&relay))
            .retention(config.retention.duration())
            .search_cap(config.search.limit)
            .build()?,
    );

    // Spawn the eviction sweeper.
    let (shutdown_tx, sweeper_handle) = if config.sweeper.enabled {
        let (tx, rx) = mpsc::channel(1);
        let mut sweeper = registry.sweeper(config.sweeper.to_sweeper_config(), rx);
        let handle = tokio::spawn(async move { sweeper.run().await });
        (Some(tx), Some(handle))
    } else {
        warn!("eviction sweeper disabled; expired files will not be removed");
        (None, None)
    };

    let links = LinkPresenter::new(config.links.clone())?;
    let bot = Arc::new(Bot::new(
        Arc::clone(&registry),
        Arc::clone(&telegram) as Arc<dyn ferry_server::bot::Messenger>,
        links,
        BotSettings {
            bot_username,
            admin_ids: config.telegram.admin_ids.clone(),
            update_channel: config.telegram.update_channel,
            retention_hours: config.retention.hours,
            search_limit: config.search.limit,
        },
    ));

    run_polling(
        bot,
        Arc::clone(&telegram),
        config.telegram.poll_timeout(),
        config.telegram.max_concurrent_updates,
        shutdown_signal(),
    )
    .await;

    if let Some(tx) = shutdown_tx {
        let _ = tx.send(()).await;
    }
    if let Some(handle) = sweeper_handle {
        match tokio::time::timeout(Duration::from_secs(30), handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "sweeper task panicked"),
            Err(_) => warn!("timed out waiting for the sweeper to stop"),
        }
    }

    if let Err(e) = relay.close().await {
        warn!(error = %e, "failed to close blob relay");
    }
    if let Err(e) = store.close().await {
        warn!(error = %e, "failed to close metadata store");
    }

    info!("ferry-server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
