mod bot;
mod config;
mod ledger;
mod ops_log;

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{ChatKind, User};
use tracing::{debug, error, info, warn};
use tracing_subscriber::prelude::*;

use bot::{Event, Router, RouterSettings, Sender, TelegramClient, TelegramGate};
use config::Config;
use ledger::{Ledger, Store, ThreadDice};

struct BotState {
    router: Router<TelegramGate>,
    telegram: TelegramClient,
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tasbot.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let bot = Bot::new(&config.telegram_bot_token);

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("tasbot.log"))
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open log file in {}: {e}", log_dir.display());
            std::process::exit(1);
        }
    };
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    let registry = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        );

    if let Some(log_chat_id) = config.log_chat_id {
        let ops_layer = ops_log::OpsLogLayer::new(bot.clone(), log_chat_id);
        registry.with(ops_layer).init();
    } else {
        registry.init();
    }

    info!("🚀 Starting tasbot...");
    info!("Loaded config from {}", config.config_path.display());
    info!("Operator IDs: {:?}", config.operator_ids);
    info!("Required channels: {:?}", config.required_channels);

    let db_path = config.data_dir.join("ledger.db");
    let legacy_dir = config.import_legacy_json.then_some(config.data_dir.as_path());
    let store = match Store::load_or_new(&db_path, legacy_dir) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Failed to open ledger at {}: {e}", db_path.display());
            std::process::exit(1);
        }
    };
    let ledger = Arc::new(Ledger::new(store, Box::new(ThreadDice), config.min_stake, config.limits));

    let settings = RouterSettings {
        operators: config.operator_ids.iter().map(|id| id.0 as i64).collect(),
        required_channels: config.required_channels.clone(),
        support_url: config.support_url.clone(),
        session_timeout: config.session_timeout,
    };
    let gate = TelegramGate::new(bot.clone(), config.required_channels.clone());
    let state = Arc::new(BotState {
        router: Router::new(ledger, gate, settings),
        telegram: TelegramClient::new(bot.clone()),
    });

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handle_message))
        .branch(Update::filter_callback_query().endpoint(handle_callback));

    // Updates are distributed per chat, so one player's events run in order.
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn sender_of(user: &User) -> Sender {
    let name = user.username.as_deref().unwrap_or(&user.first_name);
    Sender::new(user.id.0 as i64, name)
}

async fn handle_message(msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    if !matches!(msg.chat.kind, ChatKind::Private(_)) {
        return Ok(());
    }
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let sender = sender_of(user);
    debug!("📨 Message from {} ({})", sender.display_name, sender.external_id);

    let notifies = state.router.handle(Event::from_message(sender, text)).await;
    state.telegram.deliver(&notifies, None).await;
    Ok(())
}

async fn handle_callback(bot: Bot, q: CallbackQuery, state: Arc<BotState>) -> ResponseResult<()> {
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        warn!("Failed to answer callback: {e}");
    }
    let Some(token) = q.data.clone() else {
        return Ok(());
    };

    let origin = q.regular_message().map(|m| (m.chat.id.0, m.id.0 as i64));
    let event = Event::Action { sender: sender_of(&q.from), token };
    let notifies = state.router.handle(event).await;
    state.telegram.deliver(&notifies, origin).await;
    Ok(())
}
