//! Forwards ledger activity to the operators' log chat.

use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::ChatId;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

const FLUSH_EVERY: Duration = Duration::from_secs(5);
const MAX_BATCH: usize = 30;
const MAX_CHARS: usize = 4000;

/// Log line with priority.
#[derive(Debug, PartialEq, Eq)]
enum OpsMessage {
    /// WARN/ERROR, sent right away.
    Urgent(String),
    /// INFO, batched.
    Info(String),
}

/// Pending INFO lines.
#[derive(Default)]
struct Batch {
    lines: Vec<String>,
}

impl Batch {
    /// Add a line; returns the joined batch once it is full.
    fn push(&mut self, line: String) -> Option<String> {
        self.lines.push(line);
        (self.lines.len() >= MAX_BATCH).then(|| self.take()).flatten()
    }

    fn take(&mut self) -> Option<String> {
        if self.lines.is_empty() {
            return None;
        }
        let joined = self.lines.join("\n");
        self.lines.clear();
        Some(joined)
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() > MAX_CHARS {
        let truncated: String = text.chars().take(MAX_CHARS).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}

pub struct OpsLogLayer {
    tx: mpsc::UnboundedSender<OpsMessage>,
}

impl OpsLogLayer {
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<OpsMessage>();

        tokio::spawn(async move {
            let mut batch = Batch::default();
            let mut interval = tokio::time::interval(FLUSH_EVERY);

            loop {
                tokio::select! {
                    msg = rx.recv() => {
                        match msg {
                            Some(OpsMessage::Urgent(text)) => send_log(&bot, chat_id, &text).await,
                            Some(OpsMessage::Info(text)) => {
                                if let Some(full) = batch.push(text) {
                                    send_log(&bot, chat_id, &full).await;
                                }
                            }
                            None => break,
                        }
                    }
                    _ = interval.tick() => {
                        if let Some(pending) = batch.take() {
                            send_log(&bot, chat_id, &pending).await;
                        }
                    }
                }
            }
        });

        Self { tx }
    }
}

async fn send_log(bot: &Bot, chat_id: ChatId, text: &str) {
    // eprintln, not tracing: a failure here must not feed back into this layer.
    if let Err(e) = bot.send_message(chat_id, truncate(text)).await {
        eprintln!("Failed to send log to ops chat: {e}");
    }
}

struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else if self.message.is_empty() {
            self.message = format!("{} = {:?}", field.name(), value);
        } else {
            self.message.push_str(&format!(", {} = {:?}", field.name(), value));
        }
    }
}

/// Classify an event; `None` for events that stay out of the ops chat.
fn classify(level: Level, target: &str, message: String) -> Option<OpsMessage> {
    // Transport chatter would echo our own sends back into the chat.
    if !target.starts_with(env!("CARGO_CRATE_NAME")) || level > Level::INFO {
        return None;
    }
    Some(match level {
        Level::ERROR => OpsMessage::Urgent(format!("❌ {message}")),
        Level::WARN => OpsMessage::Urgent(format!("⚠️ {message}")),
        _ => OpsMessage::Info(message),
    })
}

impl<S: Subscriber> Layer<S> for OpsLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if *metadata.level() > Level::INFO {
            return;
        }

        let mut visitor = MessageVisitor { message: String::new() };
        event.record(&mut visitor);

        if let Some(msg) = classify(*metadata.level(), metadata.target(), visitor.message)
            && self.tx.send(msg).is_err()
        {
            eprintln!("Ops log channel closed, message dropped");
        }
    }
}
