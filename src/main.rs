//! replyd - Marketplace review autoresponder daemon
//!
//! Entry point: wire the transports, executors and clients together and drive
//! the scheduler until a shutdown signal arrives.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use eyre::{Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};

use replyd::assistant::AssistantClient;
use replyd::config::Config;
use replyd::executor::{CooldownGate, HttpTransport, RequestExecutor};
use replyd::notify::{Notifier, NullNotifier, TelegramNotifier};
use replyd::responder::{AutoresponderJob, LogSink};
use replyd::roster::{FileRoster, JobKind};
use replyd::runner::JobHandler;
use replyd::scheduler::Scheduler;

fn setup_logging() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Logging initialized");
    Ok(())
}

fn build_notifier(config: &Config) -> Arc<dyn Notifier> {
    if !config.telegram.enabled() {
        info!("Telegram notifications disabled");
        return Arc::new(NullNotifier);
    }

    let token_env = config.telegram.token_env();
    let chat_id = config.telegram.chat_id.clone().unwrap_or_default();
    match std::env::var(token_env) {
        Ok(token) => match TelegramNotifier::new(token, chat_id) {
            Ok(notifier) => {
                info!(chat_id = %config.telegram.chat_id.as_deref().unwrap_or(""), "Telegram notifications enabled");
                Arc::new(notifier)
            }
            Err(e) => {
                warn!(error = %e, "Failed to build Telegram client, notifications disabled");
                Arc::new(NullNotifier)
            }
        },
        Err(_) => {
            warn!(token_env, "Telegram bot token not set, notifications disabled");
            Arc::new(NullNotifier)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let config_path = std::env::var("REPLYD_CONFIG").ok().map(PathBuf::from);
    let config = Config::load(config_path.as_deref()).context("Failed to load configuration")?;

    info!(
        tick_secs = config.scheduler.tick_interval_secs,
        max_concurrent = config.scheduler.max_concurrent_jobs,
        model = %config.assistant.model,
        "replyd starting"
    );

    // One shared connection pool; one executor (and cooldown gate) per
    // downstream provider
    let transport = Arc::new(HttpTransport::new().context("Failed to build HTTP transport")?);
    let marketplace_executor = Arc::new(RequestExecutor::new(
        transport.clone(),
        config.marketplace.profile.clone(),
        CooldownGate::new(),
        config.executor.clone(),
    ));
    let assistant_executor = Arc::new(RequestExecutor::new(
        transport,
        config.assistant.profile.clone(),
        CooldownGate::new(),
        config.executor.clone(),
    ));

    let assistant = Arc::new(
        AssistantClient::from_config(assistant_executor, config.assistant.clone())
            .context("Failed to build assistant client")?,
    );

    let notifier = build_notifier(&config);

    let autoresponder = AutoresponderJob::new(
        marketplace_executor,
        config.marketplace.clone(),
        assistant,
        Arc::new(LogSink),
        config.responder.clone(),
    );
    let mut handlers: HashMap<JobKind, Arc<dyn JobHandler>> = HashMap::new();
    handlers.insert(JobKind::Autoresponder, Arc::new(autoresponder));

    let roster = Arc::new(FileRoster::new(config.roster.path.clone()));
    let scheduler = Scheduler::new(
        config.scheduler.clone(),
        config.runner.clone(),
        roster,
        handlers,
        notifier,
    );

    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
            let _ = shutdown_tx.send(()).await;
        }
    });

    scheduler.run(shutdown_rx).await;
    info!("replyd stopped");
    Ok(())
}
