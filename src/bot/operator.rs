//! Operator console: accounts, game logic, wallets and request review.

use std::sync::Arc;

use tracing::info;

use crate::ledger::{Decision, FundsRequest, Ledger, LedgerError, LedgerResult, RequestKind};

use super::events::{AdminAction, Notify, Sender};
use super::input::{parse_amount, parse_percent};
use super::player::failure;
use super::session::{OperatorState, SessionTable};
use super::texts;

const LIST_SIZE: usize = 20;
const NOTE_MAX_CHARS: usize = 200;

pub struct OperatorConsole {
    ledger: Arc<Ledger>,
    sessions: SessionTable<OperatorState>,
}

impl OperatorConsole {
    pub fn new(ledger: Arc<Ledger>, sessions: SessionTable<OperatorState>) -> Self {
        Self { ledger, sessions }
    }

    #[cfg(test)]
    pub fn state(&self, external_id: i64) -> OperatorState {
        self.sessions.get(external_id)
    }

    /// True while an edit flow is waiting for free text.
    pub fn is_busy(&self, external_id: i64) -> bool {
        self.sessions.get(external_id) != OperatorState::Idle
    }

    /// Drop any pending edit.
    pub fn close(&self, external_id: i64) {
        self.sessions.reset(external_id);
    }

    /// `/admin`
    pub fn open(&self, sender: &Sender) -> Vec<Notify> {
        self.sessions.reset(sender.external_id);
        vec![Notify::with_menu(sender.external_id, texts::admin_home(), texts::admin_menu())]
    }

    pub fn handle_action(&self, sender: &Sender, action: AdminAction) -> Vec<Notify> {
        let chat = sender.external_id;
        match self.dispatch(sender, action) {
            Ok(out) => out,
            Err(e) => vec![failure(chat, &e)],
        }
    }

    fn dispatch(&self, sender: &Sender, action: AdminAction) -> LedgerResult<Vec<Notify>> {
        let chat = sender.external_id;
        let store = &self.ledger.store;

        // Any button ends a pending edit unless it starts a new one.
        self.sessions.reset(chat);

        let reply = match action {
            AdminAction::Menu => Notify::with_menu(chat, texts::admin_home(), texts::admin_menu()),
            AdminAction::Users => {
                let (text, menu) = texts::account_list(&store.list_accounts(LIST_SIZE)?);
                Notify::with_menu(chat, text, menu)
            }
            AdminAction::User(id) => {
                let (text, menu) = texts::account_detail(&store.get_account_by_id(id)?);
                Notify::with_menu(chat, text, menu)
            }
            AdminAction::EditBalance(id) => {
                let account = store.get_account_by_id(id)?;
                self.sessions.set(chat, OperatorState::AwaitingBalanceEdit { target: id });
                Notify::with_menu(chat, texts::balance_prompt(&account), texts::admin_back_menu())
            }
            AdminAction::EditStatus(id) => {
                let (text, menu) = texts::status_menu(&store.get_account_by_id(id)?);
                Notify::with_menu(chat, text, menu)
            }
            AdminAction::SetStatus(id, status) => {
                let account = store.set_status(id, status)?;
                info!("🚦 {} set status of {} to {}", sender.display_name, account.display_name, status);
                let (text, menu) = texts::account_detail(&account);
                Notify::with_menu(chat, text, menu)
            }
            AdminAction::EditNote(id) => {
                let account = store.get_account_by_id(id)?;
                self.sessions.set(chat, OperatorState::AwaitingNoteEdit { target: id });
                Notify::with_menu(chat, texts::note_prompt(&account), texts::admin_back_menu())
            }
            AdminAction::Logic => {
                let (text, menu) = texts::logic(&store.game_logic()?);
                Notify::with_menu(chat, text, menu)
            }
            AdminAction::EditWin => {
                self.sessions.set(chat, OperatorState::AwaitingWinRateEdit);
                Notify::with_menu(chat, texts::percent_prompt(true), texts::admin_back_menu())
            }
            AdminAction::EditLose => {
                self.sessions.set(chat, OperatorState::AwaitingLoseRateEdit);
                Notify::with_menu(chat, texts::percent_prompt(false), texts::admin_back_menu())
            }
            AdminAction::ToggleRandom => {
                let (text, menu) = texts::logic(&store.toggle_randomize()?);
                Notify::with_menu(chat, text, menu)
            }
            AdminAction::Wallets => {
                let (text, menu) = texts::wallets(&store.wallets()?);
                Notify::with_menu(chat, text, menu)
            }
            AdminAction::EditWallet(method) => {
                if !method.is_on_chain() {
                    return Err(LedgerError::InvalidInput(format!("{method} has no wallet address")));
                }
                self.sessions.set(chat, OperatorState::AwaitingWalletEdit { method });
                Notify::with_menu(chat, texts::wallet_prompt(method), texts::admin_back_menu())
            }
            AdminAction::Pending(kind) => {
                let (text, menu) = texts::pending_list(kind, &self.ledger.requests.list_pending(kind, LIST_SIZE)?);
                Notify::with_menu(chat, text, menu)
            }
            AdminAction::Review(kind, id) => {
                let (text, menu) = texts::request_detail(&self.ledger.requests.get_request(kind, id)?);
                Notify::with_menu(chat, text, menu)
            }
            AdminAction::Decide(kind, id, decision) => return self.decide(sender, kind, id, decision),
        };
        Ok(vec![reply])
    }

    fn decide(&self, sender: &Sender, kind: RequestKind, id: i64, decision: Decision) -> LedgerResult<Vec<Notify>> {
        let chat = sender.external_id;
        let request = match kind {
            RequestKind::Deposit => self.ledger.requests.review_deposit(id, decision),
            RequestKind::Withdrawal => self.ledger.requests.review_withdrawal(id, decision),
        };
        let request = match request {
            Ok(request) => request,
            Err(e @ LedgerError::AlreadyReviewed { .. }) => {
                // Another operator got there first; show the settled request.
                let (text, menu) = texts::request_detail(&self.ledger.requests.get_request(kind, id)?);
                return Ok(vec![Notify::text(chat, format!("⚠️ {e}")), Notify::with_menu(chat, text, menu)]);
            }
            Err(e) => return Err(e),
        };
        info!("👮 {} reviewed {} #{}: {}", sender.display_name, kind, id, request.status);

        let (text, menu) = texts::request_detail(&request);
        let mut out = vec![Notify::with_menu(chat, text, menu)];
        out.push(self.tell_owner(&request)?);
        Ok(out)
    }

    fn tell_owner(&self, request: &FundsRequest) -> LedgerResult<Notify> {
        let owner = self.ledger.store.get_account_by_id(request.account_id)?;
        Ok(Notify::text(owner.external_id, texts::request_reviewed(request)))
    }

    /// Free text for an open edit flow. `None` when no flow is open.
    pub fn handle_text(&self, sender: &Sender, text: &str) -> Option<Vec<Notify>> {
        let chat = sender.external_id;
        let state = self.sessions.get(chat);
        let result = match state {
            OperatorState::Idle => return None,
            OperatorState::AwaitingBalanceEdit { target } => parse_amount(text)
                .and_then(|balance| self.ledger.store.set_balance_absolute(target, balance))
                .map(|account| {
                    info!("✏️ {} set balance of {} to {}", sender.display_name, account.display_name, account.balance);
                    texts::account_detail(&account)
                }),
            OperatorState::AwaitingNoteEdit { target } => note(text)
                .and_then(|note| self.ledger.store.set_note(target, &note))
                .map(|account| texts::account_detail(&account)),
            OperatorState::AwaitingWinRateEdit => parse_percent(text)
                .and_then(|p| self.ledger.store.set_win_percent(p))
                .map(|logic| texts::logic(&logic)),
            OperatorState::AwaitingLoseRateEdit => parse_percent(text)
                .and_then(|p| self.ledger.store.set_lose_percent(p))
                .map(|logic| texts::logic(&logic)),
            OperatorState::AwaitingWalletEdit { method } => self
                .ledger
                .store
                .set_wallet_address(method, text)
                .map(|wallets| texts::wallets(&wallets)),
        };

        Some(match result {
            Ok((text, menu)) => {
                self.sessions.reset(chat);
                vec![Notify::text(chat, texts::saved()), Notify::with_menu(chat, text, menu)]
            }
            // A missing target cannot be fixed by retyping.
            Err(e @ LedgerError::NotFound(_)) => {
                self.sessions.reset(chat);
                vec![failure(chat, &e)]
            }
            Err(e) => vec![failure(chat, &e)],
        })
    }
}

fn note(text: &str) -> LedgerResult<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(LedgerError::InvalidInput("note cannot be empty".to_string()));
    }
    if text.chars().count() > NOTE_MAX_CHARS {
        return Err(LedgerError::InvalidInput(format!("note is limited to {NOTE_MAX_CHARS} characters")));
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{AccountStatus, FixedDice, PaymentMethod, RequestLimits, RequestStatus, Store};

    const OPERATOR: i64 = 900;

    fn console() -> OperatorConsole {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let ledger = Arc::new(Ledger::new(store, Box::new(FixedDice(1)), 5_000, RequestLimits::default()));
        OperatorConsole::new(ledger, SessionTable::new(None))
    }

    fn op() -> Sender {
        Sender::new(OPERATOR, "admin")
    }

    #[test]
    fn test_balance_edit_flow() {
        let console = console();
        let account = console.ledger.store.create_account(1001, "alice").unwrap();

        console.handle_action(&op(), AdminAction::EditBalance(account.id));
        assert!(console.is_busy(OPERATOR));

        let out = console.handle_text(&op(), "-5").unwrap();
        assert!(out[0].text.starts_with("⚠️"));
        assert_eq!(console.state(OPERATOR), OperatorState::AwaitingBalanceEdit { target: account.id });

        let out = console.handle_text(&op(), "250000").unwrap();
        assert_eq!(out[0].text, texts::saved());
        assert!(!console.is_busy(OPERATOR));
        assert_eq!(console.ledger.store.get_account_by_id(account.id).unwrap().balance, 250_000);
    }

    #[test]
    fn test_idle_text_is_not_consumed() {
        let console = console();
        assert!(console.handle_text(&op(), "hello").is_none());
    }

    #[test]
    fn test_rate_edit_keeps_sum() {
        let console = console();
        console.handle_action(&op(), AdminAction::EditLose);

        let out = console.handle_text(&op(), "150").unwrap();
        assert!(out[0].text.contains("between 0 and 100"), "{}", out[0].text);
        assert!(console.is_busy(OPERATOR));

        console.handle_text(&op(), "70").unwrap();
        let logic = console.ledger.store.game_logic().unwrap();
        assert_eq!((logic.win_percent, logic.lose_percent), (30, 70));
        assert!(!console.is_busy(OPERATOR));
    }

    #[test]
    fn test_set_status_and_note() {
        let console = console();
        let account = console.ledger.store.create_account(1001, "alice").unwrap();

        console.handle_action(&op(), AdminAction::SetStatus(account.id, AccountStatus::Blocked));
        console.handle_action(&op(), AdminAction::EditNote(account.id));
        console.handle_text(&op(), "  chargeback risk ").unwrap();

        let account = console.ledger.store.get_account_by_id(account.id).unwrap();
        assert_eq!(account.status, AccountStatus::Blocked);
        assert_eq!(account.note, "chargeback risk");
    }

    #[test]
    fn test_accept_deposit_notifies_owner() {
        let console = console();
        let account = console.ledger.store.create_account(1001, "alice").unwrap();
        let request =
            console.ledger.requests.submit_deposit(account.id, 200_000, PaymentMethod::Trc20, "tx").unwrap();

        let out = console.handle_action(&op(), AdminAction::Decide(RequestKind::Deposit, request.id, Decision::Accept));
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].external_id, 1001);
        assert!(out[1].text.contains("approved"));
        assert_eq!(console.ledger.store.get_account_by_id(account.id).unwrap().balance, 200_000);

        let out = console.handle_action(&op(), AdminAction::Decide(RequestKind::Deposit, request.id, Decision::Reject));
        assert!(out[0].text.contains("already reviewed"), "{}", out[0].text);
        assert!(out.iter().all(|n| n.external_id == OPERATOR));
        let stored = console.ledger.requests.get_request(RequestKind::Deposit, request.id).unwrap();
        assert_eq!(stored.status, RequestStatus::Accepted);
        assert_eq!(console.ledger.store.get_account_by_id(account.id).unwrap().balance, 200_000);
    }

    #[test]
    fn test_reject_withdrawal_refunds() {
        let console = console();
        let account = console.ledger.store.create_account(1001, "alice").unwrap();
        console.ledger.store.adjust_balance(account.id, 600_000, false).unwrap();
        let request =
            console.ledger.requests.submit_withdrawal(account.id, 500_000, PaymentMethod::Polygon, "0xabc").unwrap().record;

        let out =
            console.handle_action(&op(), AdminAction::Decide(RequestKind::Withdrawal, request.id, Decision::Reject));
        assert!(out[1].text.contains("returned"));
        assert_eq!(console.ledger.store.get_account_by_id(account.id).unwrap().balance, 600_000);
    }

    #[test]
    fn test_unknown_account_reports_not_found() {
        let console = console();
        let out = console.handle_action(&op(), AdminAction::User(42));
        assert!(out[0].text.contains("not found"), "{}", out[0].text);
    }

    #[test]
    fn test_wallet_edit_for_voucher_refused() {
        let console = console();
        let out = console.handle_action(&op(), AdminAction::EditWallet(PaymentMethod::Voucher));
        assert!(out[0].text.starts_with("⚠️"));
        assert!(!console.is_busy(OPERATOR));
    }
}
