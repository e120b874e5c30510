//! Event routing: membership gate, operator console and player flows.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::ledger::Ledger;

use super::events::{Action, Event, Notify};
use super::operator::OperatorConsole;
use super::player::PlayerFlow;
use super::session::SessionTable;
use super::texts;

/// Answers whether a user has joined every required channel.
pub trait MembershipGate: Send + Sync {
    fn is_member(&self, external_id: i64) -> impl Future<Output = bool> + Send;
}

/// Static routing settings taken from the config file.
#[derive(Debug, Clone, Default)]
pub struct RouterSettings {
    pub operators: Vec<i64>,
    pub required_channels: Vec<String>,
    pub support_url: String,
    pub session_timeout: Option<Duration>,
}

pub struct Router<G> {
    gate: G,
    player: PlayerFlow,
    console: OperatorConsole,
    operators: HashSet<i64>,
    channels: Vec<String>,
}

impl<G: MembershipGate> Router<G> {
    pub fn new(ledger: Arc<Ledger>, gate: G, settings: RouterSettings) -> Self {
        let player = PlayerFlow::new(
            ledger.clone(),
            SessionTable::new(settings.session_timeout),
            settings.operators.clone(),
            settings.support_url,
        );
        let console = OperatorConsole::new(ledger, SessionTable::new(settings.session_timeout));
        Self {
            gate,
            player,
            console,
            operators: settings.operators.into_iter().collect(),
            channels: settings.required_channels,
        }
    }

    pub fn is_operator(&self, external_id: i64) -> bool {
        self.operators.contains(&external_id)
    }

    /// Handle one event and return what to send.
    pub async fn handle(&self, event: Event) -> Vec<Notify> {
        let sender = event.sender().clone();
        let chat = sender.external_id;
        let is_operator = self.is_operator(chat);

        // An operator has one open flow at a time across both consoles.
        if is_operator {
            match &event {
                Event::Command { command, .. } if command == "admin" => self.player.reset(chat),
                Event::Action { token, .. } if matches!(Action::parse(token), Some(Action::Admin(_))) => {
                    self.player.reset(chat)
                }
                Event::Command { .. } | Event::Action { .. } => self.console.close(chat),
                Event::Text { .. } => {}
            }
        }

        match &event {
            Event::Command { command, .. } if command == "admin" => {
                if is_operator {
                    return self.console.open(&sender);
                }
                warn!("🚫 /admin from non-operator {} ({})", sender.display_name, chat);
                return vec![Notify::text(chat, texts::no_access())];
            }
            Event::Action { token, .. } => {
                if let Some(Action::Admin(action)) = Action::parse(token) {
                    if is_operator {
                        return self.console.handle_action(&sender, action);
                    }
                    warn!("🚫 Operator action {:?} from non-operator {} ({})", token, sender.display_name, chat);
                    return vec![Notify::text(chat, texts::no_access())];
                }
            }
            Event::Text { text, .. } if is_operator => {
                if let Some(out) = self.console.handle_text(&sender, text) {
                    return out;
                }
            }
            _ => {}
        }

        if !is_operator && !self.gate.is_member(chat).await {
            info!("🔒 {} ({}) has not joined the required channels", sender.display_name, chat);
            let (text, menu) = texts::join_required(&self.channels);
            return vec![Notify::with_menu(chat, text, menu)];
        }

        match event {
            Event::Command { command, .. } => self.player.handle_command(&sender, &command),
            Event::Action { token, .. } => match Action::parse(&token) {
                Some(action) => self.player.handle_action(&sender, action),
                None => {
                    warn!("Unknown action token {:?} from {}", token, chat);
                    vec![Notify::with_menu(chat, texts::stale_menu(), texts::main_menu())]
                }
            },
            Event::Text { text, .. } => self.player.handle_text(&sender, &text),
        }
    }
}
