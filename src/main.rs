use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use komissar::config::Config;
use komissar::kernel::notifier::Notifier;
use komissar::kernel::registry::RecipientRegistry;
use komissar::services::llm::{AssistantAdapter, OpenAiAssistant, OpenAiOptions};
use komissar::services::telegram::client::to_input;
use komissar::services::telegram::{TelegramClient, TelegramOptions};
use komissar::{Controller, Dispatcher, Reactor};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("🚀 Starting accident intake bot...");
    let config = Config::from_env()?;

    // Recipients
    let registry = Arc::new(RecipientRegistry::new(
        config.recipients_file.clone(),
        config.default_recipients.clone(),
    ));
    let recipients = registry.load().await;
    if recipients.is_empty() {
        warn!("⚠️ No recipients registered, reports will not be delivered to anyone");
        warn!("⚠️ Add identifiers to {} or DEFAULT_RECIPIENTS", registry.path().display());
    } else {
        info!("✅ {} recipients registered", recipients.len());
    }

    // Transport
    let telegram = Arc::new(TelegramClient::new(TelegramOptions {
        token: config.telegram_token.clone(),
        api_url: config.telegram_api_url.clone(),
        poll_timeout: config.poll_timeout,
        send_timeout: config.delivery_timeout,
    }));

    // Assistant
    let assistant = match &config.openai_api_key {
        Some(key) => {
            info!(model = %config.openai_model, "assistant client initialised");
            AssistantAdapter::new(
                Arc::new(OpenAiAssistant::new(OpenAiOptions {
                    api_key: key.clone(),
                    base_url: config.openai_base_url.clone(),
                    model: config.openai_model.clone(),
                    timeout: config.assistant_timeout,
                })),
                config.assistant_timeout,
            )
        }
        None => {
            warn!("OPENAI_API_KEY not set, assistant mode will answer with a fallback message");
            AssistantAdapter::disabled()
        }
    };

    let notifier = Notifier::new(telegram.clone(), config.delivery_timeout);
    let controller = Controller::new(registry, assistant, notifier);
    let reactor = Arc::new(Reactor::new(controller));
    let dispatcher = Dispatcher::new(reactor, telegram.clone());

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            signal.cancel();
        }
    });

    info!("✅ Bot is running, send /start in Telegram");
    poll(telegram, dispatcher, shutdown).await;
    info!("bot stopped");
    Ok(())
}

/// Long-poll loop. Updates are queued per user in the order received.
async fn poll(telegram: Arc<TelegramClient>, dispatcher: Arc<Dispatcher>, shutdown: CancellationToken) {
    let mut offset: Option<i64> = None;

    loop {
        let updates = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = telegram.get_updates(offset) => result,
        };

        let updates = match updates {
            Ok(updates) => updates,
            Err(e) => {
                error!("polling failed: {:#}", e);
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_secs(3)) => continue,
                }
            }
        };

        for update in updates {
            offset = Some(update.update_id + 1);
            if let Some(input) = to_input(&update) {
                dispatcher.submit(input);
            }
        }
    }
}
