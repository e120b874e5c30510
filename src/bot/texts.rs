//! Message texts and keyboards.

use crate::ledger::{
    Account, AccountStatus, Decision, FundsRequest, GameLogicConfig, LeaderboardEntry, PaymentMethod, RequestKind,
    RequestLimits, RequestStatus, Selection, WagerRecord, WagerResult, WalletConfig,
};

use super::events::{Action, AdminAction, Button, Menu};

/// `1500000` -> `1,500,000`.
pub fn fmt_amount(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if amount < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn face_emoji(face: u8) -> &'static str {
    match face {
        1 => "1️⃣",
        2 => "2️⃣",
        3 => "3️⃣",
        4 => "4️⃣",
        5 => "5️⃣",
        _ => "6️⃣",
    }
}

fn selection_label(selection: Selection) -> String {
    match selection {
        Selection::Even => "Even".to_string(),
        Selection::Odd => "Odd".to_string(),
        Selection::Face(n) => format!("Number {n}"),
    }
}

fn back_button() -> Button {
    Button::action("⬅️ Back", Action::MainMenu)
}

// ---- player ----

pub fn main_menu() -> Menu {
    Menu::new()
        .row(vec![Button::action("🎲 Play", Action::Play)])
        .row(vec![Button::action("💰 Deposit", Action::Deposit), Button::action("💸 Withdraw", Action::Withdraw)])
        .row(vec![Button::action("🏆 Leaderboard", Action::Leaderboard), Button::action("📖 Guide", Action::Guide)])
        .row(vec![Button::action("🆘 Support", Action::Support)])
}

pub fn back_menu() -> Menu {
    Menu::new().row(vec![back_button()])
}

pub fn welcome(account: &Account) -> String {
    format!(
        "👋 Welcome, {}!\n\nYour balance: {} toman\n\nChoose an option below.",
        account.display_name,
        fmt_amount(account.balance)
    )
}

pub fn balance(account: &Account) -> String {
    format!("💼 Your balance: {} toman", fmt_amount(account.balance))
}

pub fn selection_menu() -> Menu {
    let faces = |range: std::ops::RangeInclusive<u8>| {
        range.map(|n| Button::action(face_emoji(n), Action::Bet(Selection::Face(n)))).collect::<Vec<_>>()
    };
    Menu::new()
        .row(vec![
            Button::action("Even (x2)", Action::Bet(Selection::Even)),
            Button::action("Odd (x2)", Action::Bet(Selection::Odd)),
        ])
        .row(faces(1..=3))
        .row(faces(4..=6))
        .row(vec![back_button()])
}

pub fn choose_selection(balance: i64) -> String {
    format!(
        "🎲 Pick your bet.\n\nEven or Odd pays x2. A single number pays x6.\nYour balance: {} toman",
        fmt_amount(balance)
    )
}

pub fn bet_prompt(selection: Selection, min_stake: i64, balance: i64) -> String {
    format!(
        "You picked {} (x{}).\n\nSend your stake in toman.\nMinimum: {}\nYour balance: {}",
        selection_label(selection),
        selection.multiplier(),
        fmt_amount(min_stake),
        fmt_amount(balance)
    )
}

pub fn bet_result(record: &WagerRecord, balance: i64) -> String {
    let headline = match record.result {
        WagerResult::Win => format!("🎉 You won {} toman!", fmt_amount(record.profit)),
        WagerResult::Lose => format!("😔 You lost {} toman.", fmt_amount(record.stake)),
    };
    format!(
        "🎲 The dice rolled {} ({})\nYour bet: {} for {}\n\n{}\nNew balance: {} toman",
        face_emoji(record.outcome),
        record.outcome,
        selection_label(record.selection),
        fmt_amount(record.stake),
        headline,
        fmt_amount(balance)
    )
}

pub fn play_again_menu() -> Menu {
    Menu::new().row(vec![Button::action("🎲 Play again", Action::Play), back_button()])
}

pub fn deposit_amount_prompt(min_deposit: i64) -> String {
    format!("💰 How much do you want to deposit?\n\nSend the amount in toman. Minimum: {}", fmt_amount(min_deposit))
}

pub fn methods_menu(deposit: bool) -> Menu {
    let mut menu = Menu::new();
    for method in PaymentMethod::ALL {
        let action = if deposit { Action::DepositMethod(method) } else { Action::WithdrawMethod(method) };
        menu = menu.row(vec![Button::action(method.label(), action)]);
    }
    menu.row(vec![back_button()])
}

pub fn choose_method(amount: i64) -> String {
    format!("Amount: {} toman\n\nChoose a payment method.", fmt_amount(amount))
}

pub fn deposit_proof_prompt(amount: i64, method: PaymentMethod, wallets: &WalletConfig) -> String {
    match wallets.address(method) {
        Some(address) if method.is_on_chain() => format!(
            "Send the equivalent of {} toman via {} to:\n\n{}\n\nThen reply with the transaction hash and the transaction link.",
            fmt_amount(amount),
            method.label(),
            address
        ),
        _ => format!("Reply with your {} code worth {} toman.", method.label(), fmt_amount(amount)),
    }
}

pub fn deposit_filed(request: &FundsRequest) -> String {
    format!(
        "✅ Deposit request #{} for {} toman via {} was submitted.\n\nYour balance will be credited once it is approved.",
        request.id,
        fmt_amount(request.amount),
        request.method.label()
    )
}

pub fn withdrawal_amount_prompt(min_withdrawal: i64, balance: i64) -> String {
    format!(
        "💸 How much do you want to withdraw?\n\nMinimum: {}\nYour balance: {}",
        fmt_amount(min_withdrawal),
        fmt_amount(balance)
    )
}

pub fn withdrawal_destination_prompt(method: PaymentMethod) -> String {
    format!("Send your {} wallet address.", method.label())
}

pub fn withdrawal_filed(request: &FundsRequest, balance: i64) -> String {
    format!(
        "✅ Withdrawal request #{} for {} toman via {} was submitted.\n\nThe amount is held until review. Balance: {} toman",
        request.id,
        fmt_amount(request.amount),
        request.method.label(),
        fmt_amount(balance)
    )
}

pub fn use_buttons() -> &'static str {
    "Please choose one of the buttons above."
}

pub fn stale_menu() -> &'static str {
    "This menu has expired. Please start again."
}

pub fn idle_hint() -> &'static str {
    "Send /start to open the menu."
}

pub fn cancelled() -> &'static str {
    "Cancelled."
}

pub fn unknown_command() -> &'static str {
    "Unknown command. Send /start to open the menu."
}

pub fn leaderboard(entries: &[LeaderboardEntry]) -> String {
    if entries.is_empty() {
        return "🏆 No games played yet.".to_string();
    }
    let mut text = String::from("🏆 Top players\n");
    for (rank, entry) in entries.iter().enumerate() {
        let medal = match rank {
            0 => "🥇",
            1 => "🥈",
            2 => "🥉",
            _ => "▫️",
        };
        text.push_str(&format!(
            "\n{medal} {} · {} games · {:+} toman",
            entry.display_name, entry.games, entry.net_profit
        ));
    }
    text
}

pub fn guide(min_stake: i64, limits: RequestLimits) -> String {
    format!(
        "📖 How it works\n\n\
         Pick Even, Odd or a number from 1 to 6, then send your stake.\n\
         Even/Odd pays x2, a correct number pays x6.\n\n\
         Minimum stake: {}\nMinimum deposit: {}\nMinimum withdrawal: {}\n\n\
         Deposits are credited after review. Withdrawals are held from your balance until reviewed, \
         and refunded if rejected.",
        fmt_amount(min_stake),
        fmt_amount(limits.min_deposit),
        fmt_amount(limits.min_withdrawal)
    )
}

pub fn support_menu(url: &str) -> Menu {
    Menu::new().row(vec![Button::url("💬 Contact support", url)]).row(vec![back_button()])
}

pub fn join_required(channels: &[String]) -> (String, Menu) {
    let mut menu = Menu::new();
    for channel in channels {
        let handle = channel.trim_start_matches('@');
        menu = menu.row(vec![Button::url(format!("Join {channel}"), format!("https://t.me/{handle}"))]);
    }
    let text = "📢 To use the bot, please join our channels first, then send /start again.".to_string();
    (text, menu)
}

pub fn request_reviewed(request: &FundsRequest) -> String {
    let (icon, verdict) = match request.status {
        RequestStatus::Accepted => ("✅", "approved"),
        RequestStatus::Rejected => ("❌", "rejected"),
        RequestStatus::Pending => ("⏳", "pending"),
    };
    let note = match (request.kind, request.status) {
        (RequestKind::Deposit, RequestStatus::Accepted) => " Your balance was credited.",
        (RequestKind::Withdrawal, RequestStatus::Rejected) => " The held amount was returned to your balance.",
        _ => "",
    };
    format!(
        "{icon} Your {} request #{} for {} toman was {verdict}.{note}",
        request.kind,
        request.id,
        fmt_amount(request.amount)
    )
}

// ---- operator ----

pub fn no_access() -> &'static str {
    "⛔ You don't have access to this."
}

pub fn admin_menu() -> Menu {
    Menu::new()
        .row(vec![Button::action("👥 Users", Action::Admin(AdminAction::Users))])
        .row(vec![
            Button::action("📥 Deposits", Action::Admin(AdminAction::Pending(RequestKind::Deposit))),
            Button::action("📤 Withdrawals", Action::Admin(AdminAction::Pending(RequestKind::Withdrawal))),
        ])
        .row(vec![
            Button::action("🎯 Game logic", Action::Admin(AdminAction::Logic)),
            Button::action("👛 Wallets", Action::Admin(AdminAction::Wallets)),
        ])
}

pub fn admin_home() -> &'static str {
    "🛠 Operator console"
}

fn admin_back() -> Button {
    Button::action("⬅️ Console", Action::Admin(AdminAction::Menu))
}

pub fn admin_back_menu() -> Menu {
    Menu::new().row(vec![admin_back()])
}

pub fn account_list(accounts: &[Account]) -> (String, Menu) {
    let mut menu = Menu::new();
    for account in accounts {
        menu = menu.row(vec![Button::action(
            format!("{} · {}", account.display_name, fmt_amount(account.balance)),
            Action::Admin(AdminAction::User(account.id)),
        )]);
    }
    let text = if accounts.is_empty() { "No accounts yet.".to_string() } else { format!("👥 {} accounts", accounts.len()) };
    (text, menu.row(vec![admin_back()]))
}

pub fn account_detail(account: &Account) -> (String, Menu) {
    let text = format!(
        "👤 {}\nAccount #{} (chat {})\nBalance: {} toman\nStatus: {}\nNote: {}\nJoined: {}",
        account.display_name,
        account.id,
        account.external_id,
        fmt_amount(account.balance),
        account.status,
        if account.note.is_empty() { "-" } else { &account.note },
        account.created_at
    );
    let menu = Menu::new()
        .row(vec![
            Button::action("✏️ Balance", Action::Admin(AdminAction::EditBalance(account.id))),
            Button::action("🚦 Status", Action::Admin(AdminAction::EditStatus(account.id))),
            Button::action("📝 Note", Action::Admin(AdminAction::EditNote(account.id))),
        ])
        .row(vec![Button::action("⬅️ Users", Action::Admin(AdminAction::Users))]);
    (text, menu)
}

pub fn status_menu(account: &Account) -> (String, Menu) {
    let buttons = AccountStatus::ALL
        .into_iter()
        .map(|status| Button::action(status.as_str(), Action::Admin(AdminAction::SetStatus(account.id, status))))
        .collect();
    let text = format!("Set status for {} (now {}).", account.display_name, account.status);
    (text, Menu::new().row(buttons).row(vec![Button::action("⬅️ Back", Action::Admin(AdminAction::User(account.id)))]))
}

pub fn balance_prompt(account: &Account) -> String {
    format!(
        "Send the new balance for {} (currently {} toman).",
        account.display_name,
        fmt_amount(account.balance)
    )
}

pub fn note_prompt(account: &Account) -> String {
    format!("Send the note for {}.", account.display_name)
}

pub fn logic(logic: &GameLogicConfig) -> (String, Menu) {
    let text = format!(
        "🎯 Game logic\n\nWin: {}%\nLose: {}%\nRandomize: {}",
        logic.win_percent,
        logic.lose_percent,
        if logic.randomize { "on" } else { "off" }
    );
    let menu = Menu::new()
        .row(vec![
            Button::action("Win %", Action::Admin(AdminAction::EditWin)),
            Button::action("Lose %", Action::Admin(AdminAction::EditLose)),
        ])
        .row(vec![Button::action("🔀 Toggle randomize", Action::Admin(AdminAction::ToggleRandom))])
        .row(vec![admin_back()]);
    (text, menu)
}

pub fn percent_prompt(win: bool) -> String {
    format!("Send the new {} percentage (0-100).", if win { "win" } else { "lose" })
}

pub fn wallets(wallets: &WalletConfig) -> (String, Menu) {
    let mut text = String::from("👛 Deposit wallets\n");
    let mut menu = Menu::new();
    for method in PaymentMethod::ALL.into_iter().filter(PaymentMethod::is_on_chain) {
        text.push_str(&format!("\n{}: {}", method.label(), wallets.address(method).unwrap_or("-")));
        menu = menu.row(vec![Button::action(
            format!("✏️ {}", method.label()),
            Action::Admin(AdminAction::EditWallet(method)),
        )]);
    }
    (text, menu.row(vec![admin_back()]))
}

pub fn wallet_prompt(method: PaymentMethod) -> String {
    format!("Send the new {} address.", method.label())
}

pub fn pending_list(kind: RequestKind, requests: &[FundsRequest]) -> (String, Menu) {
    let mut menu = Menu::new();
    for request in requests {
        menu = menu.row(vec![Button::action(
            format!("#{} {} · {} · {}", request.id, request.display_name, fmt_amount(request.amount), request.method.label()),
            Action::Admin(AdminAction::Review(kind, request.id)),
        )]);
    }
    let text = if requests.is_empty() {
        format!("No pending {kind} requests.")
    } else {
        format!("⏳ {} pending {kind} requests", requests.len())
    };
    (text, menu.row(vec![admin_back()]))
}

pub fn request_detail(request: &FundsRequest) -> (String, Menu) {
    let payload_label = match request.kind {
        RequestKind::Deposit => "Proof",
        RequestKind::Withdrawal => "Destination",
    };
    let mut text = format!(
        "📄 {} #{}\nUser: {} (account #{})\nAmount: {} toman\nMethod: {}\n{}: {}\nStatus: {}\nCreated: {}",
        request.kind,
        request.id,
        request.display_name,
        request.account_id,
        fmt_amount(request.amount),
        request.method.label(),
        payload_label,
        request.payload,
        request.status,
        request.created_at
    );
    if let Some(reviewed) = &request.reviewed_at {
        text.push_str(&format!("\nReviewed: {reviewed}"));
    }
    let mut menu = Menu::new();
    if request.status == RequestStatus::Pending {
        menu = menu.row(vec![
            Button::action("✅ Accept", Action::Admin(AdminAction::Decide(request.kind, request.id, Decision::Accept))),
            Button::action("❌ Reject", Action::Admin(AdminAction::Decide(request.kind, request.id, Decision::Reject))),
        ]);
    }
    let back = Button::action("⬅️ Pending", Action::Admin(AdminAction::Pending(request.kind)));
    (text, menu.row(vec![back]))
}

pub fn new_request_alert(request: &FundsRequest) -> (String, Menu) {
    let text = format!(
        "🔔 New {} request #{} from {}: {} toman via {}",
        request.kind,
        request.id,
        request.display_name,
        fmt_amount(request.amount),
        request.method.label()
    );
    let menu = Menu::new().row(vec![Button::action("🔍 Review", Action::Admin(AdminAction::Review(request.kind, request.id)))]);
    (text, menu)
}

pub fn saved() -> &'static str {
    "✅ Saved."
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_amount() {
        assert_eq!(fmt_amount(0), "0");
        assert_eq!(fmt_amount(999), "999");
        assert_eq!(fmt_amount(5_000), "5,000");
        assert_eq!(fmt_amount(1_500_000), "1,500,000");
        assert_eq!(fmt_amount(-25_000), "-25,000");
    }

    #[test]
    fn test_selection_menu_covers_every_selection() {
        let actions = selection_menu().actions().into_iter().copied().collect::<Vec<_>>();
        for selection in Selection::ALL {
            assert!(actions.contains(&Action::Bet(selection)), "{selection}");
        }
    }

    #[test]
    fn test_join_links() {
        let (_, menu) = join_required(&["@tas_news".to_string()]);
        assert_eq!(menu.rows[0][0], Button::url("Join @tas_news", "https://t.me/tas_news"));
    }

    #[test]
    fn test_reviewed_request_hides_decision_buttons() {
        let request = FundsRequest {
            id: 3,
            kind: RequestKind::Deposit,
            account_id: 1,
            display_name: "alice".to_string(),
            amount: 100_000,
            method: PaymentMethod::Trc20,
            payload: "tx".to_string(),
            status: RequestStatus::Accepted,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            reviewed_at: Some("2026-01-01T01:00:00Z".to_string()),
        };
        let (text, menu) = request_detail(&request);
        assert!(text.contains("Reviewed"));
        assert_eq!(menu.actions(), vec![&Action::Admin(AdminAction::Pending(RequestKind::Deposit))]);
    }
}
