//! Inbound events, outbound notifications and the callback action codec.

use crate::ledger::{AccountStatus, Decision, PaymentMethod, RequestKind, Selection};

/// Who sent an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub external_id: i64,
    pub display_name: String,
}

impl Sender {
    pub fn new(external_id: i64, display_name: impl Into<String>) -> Self {
        Self { external_id, display_name: display_name.into() }
    }
}

/// An inbound chat event, already stripped of transport details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Slash command without the slash, e.g. `start`.
    Command { sender: Sender, command: String },
    /// Button press carrying an opaque action token.
    Action { sender: Sender, token: String },
    /// Free-text message.
    Text { sender: Sender, text: String },
}

impl Event {
    /// Split a chat message into a command or free text.
    ///
    /// `/start@TasBot extra` becomes the command `start`.
    pub fn from_message(sender: Sender, text: &str) -> Self {
        match text.trim_start().strip_prefix('/') {
            Some(rest) => {
                let word = rest.split_whitespace().next().unwrap_or("");
                let command = word.split('@').next().unwrap_or("").to_lowercase();
                Event::Command { sender, command }
            }
            None => Event::Text { sender, text: text.to_string() },
        }
    }

    pub fn sender(&self) -> &Sender {
        match self {
            Event::Command { sender, .. } | Event::Action { sender, .. } | Event::Text { sender, .. } => sender,
        }
    }
}

/// An instruction for the transport to deliver a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notify {
    pub external_id: i64,
    pub text: String,
    pub menu: Option<Menu>,
}

impl Notify {
    pub fn text(external_id: i64, text: impl Into<String>) -> Self {
        Self { external_id, text: text.into(), menu: None }
    }

    pub fn with_menu(external_id: i64, text: impl Into<String>, menu: Menu) -> Self {
        Self { external_id, text: text.into(), menu: Some(menu) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Button {
    Action { label: String, action: Action },
    Url { label: String, url: String },
}

impl Button {
    pub fn action(label: impl Into<String>, action: Action) -> Self {
        Button::Action { label: label.into(), action }
    }

    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Button::Url { label: label.into(), url: url.into() }
    }
}

/// Inline keyboard, row by row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Menu {
    pub rows: Vec<Vec<Button>>,
}

impl Menu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(mut self, buttons: Vec<Button>) -> Self {
        self.rows.push(buttons);
        self
    }

    /// All action buttons, in order. Handy for assertions.
    pub fn actions(&self) -> Vec<&Action> {
        self.rows
            .iter()
            .flatten()
            .filter_map(|b| match b {
                Button::Action { action, .. } => Some(action),
                Button::Url { .. } => None,
            })
            .collect()
    }
}

/// Button actions available to players.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MainMenu,
    Play,
    Bet(Selection),
    Deposit,
    Withdraw,
    DepositMethod(PaymentMethod),
    WithdrawMethod(PaymentMethod),
    Leaderboard,
    Guide,
    Support,
    Admin(AdminAction),
}

/// Button actions available on the operator console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    Menu,
    Users,
    User(i64),
    EditBalance(i64),
    EditStatus(i64),
    SetStatus(i64, AccountStatus),
    EditNote(i64),
    Logic,
    EditWin,
    EditLose,
    ToggleRandom,
    Wallets,
    EditWallet(PaymentMethod),
    Pending(RequestKind),
    Review(RequestKind, i64),
    Decide(RequestKind, i64, Decision),
}

fn kind_token(kind: RequestKind) -> &'static str {
    match kind {
        RequestKind::Deposit => "dep",
        RequestKind::Withdrawal => "wd",
    }
}

fn parse_kind(s: &str) -> Option<RequestKind> {
    match s {
        "dep" => Some(RequestKind::Deposit),
        "wd" => Some(RequestKind::Withdrawal),
        _ => None,
    }
}

fn parse_decision(s: &str) -> Option<Decision> {
    match s {
        "accept" => Some(Decision::Accept),
        "reject" => Some(Decision::Reject),
        _ => None,
    }
}

impl Action {
    /// Callback data for this action. Always well under Telegram's 64 bytes.
    pub fn token(&self) -> String {
        match self {
            Action::MainMenu => "menu".to_string(),
            Action::Play => "play".to_string(),
            Action::Bet(selection) => format!("bet:{}", selection.as_token()),
            Action::Deposit => "dep".to_string(),
            Action::Withdraw => "wd".to_string(),
            Action::DepositMethod(method) => format!("dep:{}", method.as_str()),
            Action::WithdrawMethod(method) => format!("wd:{}", method.as_str()),
            Action::Leaderboard => "top".to_string(),
            Action::Guide => "guide".to_string(),
            Action::Support => "support".to_string(),
            Action::Admin(admin) => match admin {
                AdminAction::Menu => "adm".to_string(),
                AdminAction::Users => "adm:users".to_string(),
                AdminAction::User(id) => format!("adm:user:{id}"),
                AdminAction::EditBalance(id) => format!("adm:bal:{id}"),
                AdminAction::EditStatus(id) => format!("adm:status:{id}"),
                AdminAction::SetStatus(id, status) => format!("adm:status:{id}:{}", status.as_str()),
                AdminAction::EditNote(id) => format!("adm:note:{id}"),
                AdminAction::Logic => "adm:logic".to_string(),
                AdminAction::EditWin => "adm:win".to_string(),
                AdminAction::EditLose => "adm:lose".to_string(),
                AdminAction::ToggleRandom => "adm:rand".to_string(),
                AdminAction::Wallets => "adm:wallets".to_string(),
                AdminAction::EditWallet(method) => format!("adm:wallet:{}", method.as_str()),
                AdminAction::Pending(kind) => format!("adm:pending:{}", kind_token(*kind)),
                AdminAction::Review(kind, id) => format!("adm:req:{}:{id}", kind_token(*kind)),
                AdminAction::Decide(kind, id, decision) => {
                    let verdict = match decision {
                        Decision::Accept => "accept",
                        Decision::Reject => "reject",
                    };
                    format!("adm:req:{}:{id}:{verdict}", kind_token(*kind))
                }
            },
        }
    }

    /// Decode callback data. Unknown or malformed tokens yield `None`.
    pub fn parse(token: &str) -> Option<Self> {
        let parts: Vec<&str> = token.split(':').collect();
        let action = match parts.as_slice() {
            ["menu"] => Action::MainMenu,
            ["play"] => Action::Play,
            ["bet", sel] => Action::Bet(Selection::parse(sel)?),
            ["dep"] => Action::Deposit,
            ["wd"] => Action::Withdraw,
            ["dep", method] => Action::DepositMethod(PaymentMethod::parse(method)?),
            ["wd", method] => Action::WithdrawMethod(PaymentMethod::parse(method)?),
            ["top"] => Action::Leaderboard,
            ["guide"] => Action::Guide,
            ["support"] => Action::Support,
            ["adm", rest @ ..] => Action::Admin(parse_admin(rest)?),
            _ => return None,
        };
        Some(action)
    }
}

fn parse_admin(parts: &[&str]) -> Option<AdminAction> {
    let id = |s: &str| s.parse::<i64>().ok();
    let action = match parts {
        [] => AdminAction::Menu,
        ["users"] => AdminAction::Users,
        ["user", n] => AdminAction::User(id(n)?),
        ["bal", n] => AdminAction::EditBalance(id(n)?),
        ["status", n] => AdminAction::EditStatus(id(n)?),
        ["status", n, status] => AdminAction::SetStatus(id(n)?, AccountStatus::parse(status)?),
        ["note", n] => AdminAction::EditNote(id(n)?),
        ["logic"] => AdminAction::Logic,
        ["win"] => AdminAction::EditWin,
        ["lose"] => AdminAction::EditLose,
        ["rand"] => AdminAction::ToggleRandom,
        ["wallets"] => AdminAction::Wallets,
        ["wallet", method] => AdminAction::EditWallet(PaymentMethod::parse(method)?),
        ["pending", kind] => AdminAction::Pending(parse_kind(kind)?),
        ["req", kind, n] => AdminAction::Review(parse_kind(kind)?, id(n)?),
        ["req", kind, n, verdict] => AdminAction::Decide(parse_kind(kind)?, id(n)?, parse_decision(verdict)?),
        _ => return None,
    };
    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_action_survives_its_token() {
        let actions = [
            Action::MainMenu,
            Action::Play,
            Action::Bet(Selection::Odd),
            Action::Bet(Selection::Face(5)),
            Action::DepositMethod(PaymentMethod::Voucher),
            Action::WithdrawMethod(PaymentMethod::Trc20),
            Action::Admin(AdminAction::Menu),
            Action::Admin(AdminAction::SetStatus(12, AccountStatus::Blocked)),
            Action::Admin(AdminAction::Decide(RequestKind::Withdrawal, 77, Decision::Reject)),
            Action::Admin(AdminAction::EditWallet(PaymentMethod::Polygon)),
        ];
        for action in actions {
            let token = action.token();
            assert!(token.len() <= 64, "{token}");
            assert_eq!(Action::parse(&token), Some(action), "{token}");
        }
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        for token in ["", "bet:7", "bet", "adm:user:abc", "adm:req:dep:1:maybe", "dep:paypal", "menu:extra"] {
            assert_eq!(Action::parse(token), None, "{token}");
        }
    }

    #[test]
    fn test_message_splitting() {
        let sender = Sender::new(1, "a");
        let command = |name: &str| Event::Command { sender: sender.clone(), command: name.to_string() };
        assert_eq!(Event::from_message(sender.clone(), "/start"), command("start"));
        assert_eq!(Event::from_message(sender.clone(), "/Admin@TasBot now"), command("admin"));
        assert_eq!(
            Event::from_message(sender.clone(), "150000"),
            Event::Text { sender: sender.clone(), text: "150000".to_string() }
        );
    }

    #[test]
    fn test_menu_actions_skip_urls() {
        let menu = Menu::new()
            .row(vec![Button::action("Play", Action::Play), Button::url("Help", "https://t.me/help")])
            .row(vec![Button::action("Back", Action::MainMenu)]);
        assert_eq!(menu.actions(), vec![&Action::Play, &Action::MainMenu]);
    }
}
