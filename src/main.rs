use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use marketwatch::bot::{CommandHandler, TelegramBot};
use marketwatch::config::AppConfig;
use marketwatch::monitor::{PollCycle, PollScheduler, QueryBuilder, TargetStore};
use marketwatch::notifications::senders::{TelegramApi, TelegramSender};
use marketwatch::scanner::HttpScanner;
use marketwatch::version::VERSION;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Crawling interval in seconds, overrides the configured value
    #[arg(short, long)]
    interval: Option<u64>,
}

fn init_logging(log_dir: &str, default_level: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "marketwatch.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    // RUST_LOG wins over the configured level.
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if std::env::args().any(|arg| arg == "--version") {
        println!("marketwatch version: {VERSION}");
        return Ok(());
    }

    let args = Args::parse();

    // Logging depends on the configured directory, so a config failure goes to stderr.
    let config = match AppConfig::load(args.config.as_deref())
        .and_then(|config| config.with_interval_override(args.interval))
    {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return Err(e.into());
        }
    };

    init_logging(&config.log_dir, &config.log_level);
    info!(
        version = VERSION,
        interval_secs = config.polling_interval,
        marketplace_url = %config.marketplace_url,
        dedup = config.dedup_notifications,
        "Starting marketwatch."
    );

    let api = Arc::new(TelegramApi::new(config.telegram_api_token.clone())?);
    let sender = Arc::new(TelegramSender::new(
        api.clone(),
        config.telegram_chat_id.clone(),
    )?);
    let scanner = Arc::new(HttpScanner::new(
        Duration::from_secs(config.request_timeout_secs),
        &config.selectors,
    )?);

    let store = Arc::new(TargetStore::new());
    let cycle = PollCycle::new(
        store.clone(),
        QueryBuilder::new(config.marketplace_url.clone()),
        scanner,
        sender,
    )
    .with_dedup(config.dedup_notifications);
    let scheduler = Arc::new(PollScheduler::new(Arc::new(cycle)));
    scheduler.start(config.polling_interval)?;

    let bot = TelegramBot::new(api, CommandHandler::new(store, scheduler.clone()));
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let bot_handle = tokio::spawn(async move { bot.run(shutdown_rx).await });

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal."),
        Err(e) => error!(error = %e, "Failed to listen for shutdown signal."),
    }

    let _ = shutdown_tx.send(());
    scheduler.stop();
    if let Err(e) = bot_handle.await {
        error!(error = %e, "Telegram command loop terminated abnormally.");
    }

    info!("marketwatch stopped.");
    Ok(())
}
