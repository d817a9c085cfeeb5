//! Update polling and per-message dispatch.

use std::sync::Arc;
use std::time::Duration;

use peramos_core::config::TOKEN_ENV;
use peramos_core::{AppError, Config, ConfigError, TransportError};
use peramos_weather::{Clock, ReportCache, ReportPipeline, SystemClock, EXHAUSTED_MESSAGE};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::commands::{status_text, Command, FETCHING_TEXT, NON_TEXT_REPLY};
use crate::status::MemoryProbe;
use crate::telegram::{Message, TelegramClient};

/// Pause after a failed getUpdates before polling again
const POLL_BACKOFF: Duration = Duration::from_secs(5);
/// How often the memory heartbeat is logged
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(300);

/// Answers individual messages. Shared by all in-flight handlers.
pub struct Dispatcher {
    client: TelegramClient,
    cache: ReportCache,
    pipeline: ReportPipeline,
    memory: Option<Arc<MemoryProbe>>,
    report_deadline: Duration,
}

impl Dispatcher {
    pub fn new(
        client: TelegramClient,
        config: &Config,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let pipeline = ReportPipeline::from_config(config, clock.clone())?;
        let memory = config.bot.show_memory.then(|| Arc::new(MemoryProbe::new()));

        let mut cache = ReportCache::new(clock, config.cache.ttl());
        if let Some(probe) = memory.clone() {
            cache = cache.with_annotation(move || probe.annotation());
        }

        Ok(Self {
            client,
            cache,
            pipeline,
            memory,
            report_deadline: config.bot.report_deadline(),
        })
    }

    pub fn client(&self) -> &TelegramClient {
        &self.client
    }

    /// Current report text: cached while fresh, otherwise scraped with retries.
    ///
    /// Bounded by the report deadline; on expiry the exhaustion message is returned.
    pub async fn report(&self) -> String {
        let report = self.cache.get_or_refresh(|| self.pipeline.get_report());

        match tokio::time::timeout(self.report_deadline, report).await {
            Ok(text) => text,
            Err(_) => {
                tracing::warn!(
                    "Report request exceeded {:?}, giving up",
                    self.report_deadline
                );
                EXHAUSTED_MESSAGE.to_string()
            }
        }
    }

    /// Reply to one inbound message. Send failures are logged, never returned.
    pub async fn handle(&self, message: &Message) {
        let chat_id = message.chat.id;
        tracing::info!(
            chat_id,
            chat_type = %message.chat.kind,
            has_text = message.text.is_some(),
            "Message received"
        );

        let Some(text) = message.text.as_deref() else {
            self.send(chat_id, NON_TEXT_REPLY).await;
            return;
        };

        let command = Command::parse(text);
        tracing::debug!(chat_id, ?command, "Dispatching command");

        match command {
            Command::Status => {
                let memory = self.memory.as_ref().and_then(|probe| probe.resident_mb());
                self.send(chat_id, &status_text(memory)).await;
            }
            Command::Weather => {
                self.send(chat_id, FETCHING_TEXT).await;
                let report = self.report().await;
                self.send(chat_id, &report).await;
            }
            other => {
                if let Some(reply) = other.static_reply() {
                    self.send(chat_id, reply).await;
                }
            }
        }
    }

    async fn send(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.client.send_message(chat_id, text).await {
            tracing::error!(chat_id, "Failed to send message: {}", e);
        }
    }
}

/// A connected bot: authenticated client plus the shared dispatcher
pub struct Bot {
    dispatcher: Arc<Dispatcher>,
    username: String,
    poll_timeout: Duration,
}

impl Bot {
    /// Authenticate with the Bot API and build the report pipeline.
    ///
    /// Fails if the token is missing or rejected; callers treat that as fatal.
    pub async fn connect(config: &Config) -> Result<Self, AppError> {
        let token = config
            .bot
            .token
            .as_deref()
            .ok_or_else(|| ConfigError::MissingSetting(TOKEN_ENV.to_string()))?;

        let poll_timeout = config.bot.poll_timeout();
        let client = TelegramClient::new(&config.bot.api_url, token, poll_timeout)?;

        let me = client.get_me().await?;
        let username = me.username.unwrap_or(me.first_name);
        tracing::info!("Bot started: @{}", username);

        let dispatcher = Dispatcher::new(client, config, Arc::new(SystemClock))?;

        Ok(Self {
            dispatcher: Arc::new(dispatcher),
            username,
            poll_timeout,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        self.dispatcher.clone()
    }

    /// Poll for updates until `shutdown` is cancelled.
    ///
    /// Each message is handled on its own task. Transient transport errors
    /// are logged and retried; a revoked token ends the loop with an error.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), AppError> {
        let tracker = TaskTracker::new();
        tracker.spawn(heartbeat(self.dispatcher.memory.clone(), shutdown.clone()));

        tracing::info!("Bot is listening for messages...");

        let mut offset: Option<i64> = None;
        let result = loop {
            let polled = tokio::select! {
                _ = shutdown.cancelled() => break Ok(()),
                polled = self.dispatcher.client.get_updates(offset, self.poll_timeout) => polled,
            };

            match polled {
                Ok(updates) => {
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        if let Some(message) = update.message {
                            let dispatcher = self.dispatcher.clone();
                            tracker.spawn(async move { dispatcher.handle(&message).await });
                        }
                    }
                }
                Err(TransportError::Unauthorized) => {
                    tracing::error!("Bot token rejected while polling");
                    break Err(AppError::Transport(TransportError::Unauthorized));
                }
                Err(e) => {
                    tracing::warn!("Polling failed: {}, retrying in {:?}", e, POLL_BACKOFF);
                    tokio::select! {
                        _ = shutdown.cancelled() => break Ok(()),
                        _ = tokio::time::sleep(POLL_BACKOFF) => {}
                    }
                }
            }
        };

        shutdown.cancel();
        tracker.close();
        tracker.wait().await;
        tracing::info!("Bot stopped");
        result
    }
}

async fn heartbeat(memory: Option<Arc<MemoryProbe>>, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
    interval.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = interval.tick() => {}
        }

        match memory.as_ref().and_then(|probe| probe.resident_mb()) {
            Some(mb) => tracing::info!("Bot is still running, memory: {:.1}MB", mb),
            None => tracing::info!("Bot is still running"),
        }
    }
}
