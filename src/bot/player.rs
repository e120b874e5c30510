//! Player flows: menu, betting, deposits and withdrawals.

use std::sync::Arc;

use tracing::{error, info};

use crate::ledger::{Account, FundsRequest, Ledger, LedgerError, LedgerResult, PaymentMethod, Selection};

use super::events::{Action, Notify, Sender};
use super::input::{parse_amount, parse_proof, parse_token};
use super::session::{PlayerState, SessionTable};
use super::texts;

const LEADERBOARD_SIZE: usize = 10;

pub struct PlayerFlow {
    ledger: Arc<Ledger>,
    sessions: SessionTable<PlayerState>,
    operators: Vec<i64>,
    support_url: String,
}

impl PlayerFlow {
    pub fn new(ledger: Arc<Ledger>, sessions: SessionTable<PlayerState>, operators: Vec<i64>, support_url: String) -> Self {
        Self { ledger, sessions, operators, support_url }
    }

    #[cfg(test)]
    pub fn state(&self, external_id: i64) -> PlayerState {
        self.sessions.get(external_id)
    }

    /// Abandon any open flow.
    pub fn reset(&self, external_id: i64) {
        self.sessions.reset(external_id);
    }

    pub fn handle_command(&self, sender: &Sender, command: &str) -> Vec<Notify> {
        let chat = sender.external_id;
        match command {
            "start" => {
                self.sessions.reset(chat);
                match self.account(sender) {
                    Ok(account) => vec![Notify::with_menu(chat, texts::welcome(&account), texts::main_menu())],
                    Err(e) => vec![failure(chat, &e)],
                }
            }
            "balance" => {
                self.sessions.reset(chat);
                match self.account(sender) {
                    Ok(account) => vec![Notify::with_menu(chat, texts::balance(&account), texts::main_menu())],
                    Err(e) => vec![failure(chat, &e)],
                }
            }
            "cancel" => {
                self.sessions.reset(chat);
                vec![Notify::with_menu(chat, texts::cancelled(), texts::main_menu())]
            }
            _ => vec![Notify::text(chat, texts::unknown_command())],
        }
    }

    pub fn handle_action(&self, sender: &Sender, action: Action) -> Vec<Notify> {
        let chat = sender.external_id;
        let account = match self.account(sender) {
            Ok(account) => account,
            Err(e) => return vec![failure(chat, &e)],
        };

        match action {
            Action::MainMenu => {
                self.sessions.reset(chat);
                vec![Notify::with_menu(chat, texts::welcome(&account), texts::main_menu())]
            }
            Action::Play => {
                self.sessions.reset(chat);
                vec![Notify::with_menu(chat, texts::choose_selection(account.balance), texts::selection_menu())]
            }
            Action::Bet(selection) => {
                self.sessions.set(chat, PlayerState::AwaitingBetAmount { selection });
                let text = texts::bet_prompt(selection, self.ledger.wagers.min_stake(), account.balance);
                vec![Notify::with_menu(chat, text, texts::back_menu())]
            }
            Action::Deposit => {
                self.sessions.set(chat, PlayerState::AwaitingDepositAmount);
                let text = texts::deposit_amount_prompt(self.ledger.requests.limits().min_deposit);
                vec![Notify::with_menu(chat, text, texts::back_menu())]
            }
            Action::Withdraw => {
                self.sessions.set(chat, PlayerState::AwaitingWithdrawalAmount);
                let text = texts::withdrawal_amount_prompt(self.ledger.requests.limits().min_withdrawal, account.balance);
                vec![Notify::with_menu(chat, text, texts::back_menu())]
            }
            Action::DepositMethod(method) => self.deposit_method(&account, chat, method),
            Action::WithdrawMethod(method) => self.withdraw_method(&account, chat, method),
            Action::Leaderboard => {
                self.sessions.reset(chat);
                match self.ledger.store.leaderboard(LEADERBOARD_SIZE) {
                    Ok(entries) => vec![Notify::with_menu(chat, texts::leaderboard(&entries), texts::back_menu())],
                    Err(e) => vec![failure(chat, &e)],
                }
            }
            Action::Guide => {
                self.sessions.reset(chat);
                let text = texts::guide(self.ledger.wagers.min_stake(), self.ledger.requests.limits());
                vec![Notify::with_menu(chat, text, texts::back_menu())]
            }
            Action::Support => {
                self.sessions.reset(chat);
                vec![Notify::with_menu(chat, "🆘 Need help? Our team is here.", texts::support_menu(&self.support_url))]
            }
            Action::Admin(_) => vec![Notify::text(chat, texts::no_access())],
        }
    }

    pub fn handle_text(&self, sender: &Sender, text: &str) -> Vec<Notify> {
        let chat = sender.external_id;
        let account = match self.account(sender) {
            Ok(account) => account,
            Err(e) => return vec![failure(chat, &e)],
        };

        match self.sessions.get(chat) {
            PlayerState::Idle => vec![Notify::text(chat, texts::idle_hint())],
            PlayerState::AwaitingBetAmount { selection } => self.bet(&account, chat, selection, text),
            PlayerState::AwaitingDepositAmount => {
                let min_deposit = self.ledger.requests.limits().min_deposit;
                match parse_amount(text).and_then(|amount| at_least(amount, min_deposit)) {
                    Ok(amount) => {
                        self.sessions.set(chat, PlayerState::AwaitingDepositMethod { amount });
                        vec![Notify::with_menu(chat, texts::choose_method(amount), texts::methods_menu(true))]
                    }
                    Err(e) => vec![failure(chat, &e)],
                }
            }
            PlayerState::AwaitingDepositMethod { .. } | PlayerState::AwaitingWithdrawalMethod { .. } => {
                vec![Notify::text(chat, texts::use_buttons())]
            }
            PlayerState::AwaitingDepositProof { amount, method } => {
                let proof = match parse_proof(text) {
                    Ok(proof) => proof,
                    Err(e) => return vec![failure(chat, &e)],
                };
                match self.ledger.requests.submit_deposit(account.id, amount, method, &proof) {
                    Ok(request) => {
                        self.sessions.reset(chat);
                        let mut out = vec![Notify::with_menu(chat, texts::deposit_filed(&request), texts::main_menu())];
                        out.extend(self.alert_operators(&request));
                        out
                    }
                    Err(e) => vec![failure(chat, &e)],
                }
            }
            PlayerState::AwaitingWithdrawalAmount => {
                let min_withdrawal = self.ledger.requests.limits().min_withdrawal;
                let checked = parse_amount(text).and_then(|amount| at_least(amount, min_withdrawal)).and_then(|amount| {
                    // Early feedback only; the escrow debit re-checks under the lock.
                    if account.balance < amount {
                        Err(LedgerError::InsufficientFunds { available: account.balance, required: amount })
                    } else {
                        Ok(amount)
                    }
                });
                match checked {
                    Ok(amount) => {
                        self.sessions.set(chat, PlayerState::AwaitingWithdrawalMethod { amount });
                        vec![Notify::with_menu(chat, texts::choose_method(amount), texts::methods_menu(false))]
                    }
                    Err(e) => vec![failure(chat, &e)],
                }
            }
            PlayerState::AwaitingWithdrawalDestination { amount, method } => {
                let destination = match parse_token(text, "address") {
                    Ok(destination) => destination,
                    Err(e) => return vec![failure(chat, &e)],
                };
                self.file_withdrawal(&account, chat, amount, method, &destination)
            }
        }
    }

    fn account(&self, sender: &Sender) -> LedgerResult<Account> {
        self.ledger.store.create_account(sender.external_id, &sender.display_name)
    }

    fn bet(&self, account: &Account, chat: i64, selection: Selection, text: &str) -> Vec<Notify> {
        let settled = parse_amount(text).and_then(|stake| self.ledger.wagers.place_bet(account.id, selection, stake));
        match settled {
            Ok(settled) => {
                self.sessions.reset(chat);
                vec![Notify::with_menu(chat, texts::bet_result(&settled.record, settled.balance), texts::play_again_menu())]
            }
            Err(e) => vec![failure(chat, &e)],
        }
    }

    fn deposit_method(&self, account: &Account, chat: i64, method: PaymentMethod) -> Vec<Notify> {
        let amount = match self.sessions.get(chat) {
            PlayerState::AwaitingDepositMethod { amount } | PlayerState::AwaitingDepositProof { amount, .. } => amount,
            _ => return self.stale(chat),
        };
        let wallets = match self.ledger.store.wallets() {
            Ok(wallets) => wallets,
            Err(e) => return vec![failure(chat, &e)],
        };
        info!("💳 {} chose {} for a deposit of {}", account.display_name, method, amount);
        self.sessions.set(chat, PlayerState::AwaitingDepositProof { amount, method });
        vec![Notify::with_menu(chat, texts::deposit_proof_prompt(amount, method, &wallets), texts::back_menu())]
    }

    fn withdraw_method(&self, account: &Account, chat: i64, method: PaymentMethod) -> Vec<Notify> {
        let amount = match self.sessions.get(chat) {
            PlayerState::AwaitingWithdrawalMethod { amount } | PlayerState::AwaitingWithdrawalDestination { amount, .. } => {
                amount
            }
            _ => return self.stale(chat),
        };
        if method.is_on_chain() {
            self.sessions.set(chat, PlayerState::AwaitingWithdrawalDestination { amount, method });
            return vec![Notify::with_menu(chat, texts::withdrawal_destination_prompt(method), texts::back_menu())];
        }
        // Vouchers are issued by the operator; nothing to ask for.
        self.file_withdrawal(account, chat, amount, method, method.as_str())
    }

    fn file_withdrawal(
        &self,
        account: &Account,
        chat: i64,
        amount: i64,
        method: PaymentMethod,
        destination: &str,
    ) -> Vec<Notify> {
        match self.ledger.requests.submit_withdrawal(account.id, amount, method, destination) {
            Ok(escrowed) => {
                self.sessions.reset(chat);
                let request = escrowed.record;
                let mut out = vec![Notify::with_menu(
                    chat,
                    texts::withdrawal_filed(&request, escrowed.balance),
                    texts::main_menu(),
                )];
                out.extend(self.alert_operators(&request));
                out
            }
            Err(e @ LedgerError::InsufficientFunds { .. }) => {
                // The balance moved since the amount was entered; the flow cannot continue.
                self.sessions.reset(chat);
                vec![Notify::with_menu(chat, e.user_message(), texts::main_menu())]
            }
            Err(e) => vec![failure(chat, &e)],
        }
    }

    fn stale(&self, chat: i64) -> Vec<Notify> {
        self.sessions.reset(chat);
        vec![Notify::with_menu(chat, texts::stale_menu(), texts::main_menu())]
    }

    fn alert_operators(&self, request: &FundsRequest) -> Vec<Notify> {
        let (text, menu) = texts::new_request_alert(request);
        self.operators.iter().map(|&op| Notify::with_menu(op, text.clone(), menu.clone())).collect()
    }
}

fn at_least(amount: i64, minimum: i64) -> LedgerResult<i64> {
    if amount < minimum {
        return Err(LedgerError::BelowMinimum { minimum, got: amount });
    }
    Ok(amount)
}

/// Reply for a failed step. The session is left as it was.
pub(crate) fn failure(chat: i64, err: &LedgerError) -> Notify {
    if err.is_fatal() {
        error!("💥 Ledger failure while serving {}: {}", chat, err);
    }
    Notify::text(chat, format!("⚠️ {}", err.user_message()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{FixedDice, RequestKind, RequestLimits, RequestStatus, Store};

    const OPERATOR: i64 = 900;

    fn flow_with(face: u8) -> PlayerFlow {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let ledger = Arc::new(Ledger::new(store, Box::new(FixedDice(face)), 5_000, RequestLimits::default()));
        PlayerFlow::new(ledger, SessionTable::new(None), vec![OPERATOR], "https://t.me/support".to_string())
    }

    fn alice() -> Sender {
        Sender::new(1001, "alice")
    }

    fn fund(flow: &PlayerFlow, amount: i64) -> i64 {
        let account = flow.ledger.store.create_account(1001, "alice").unwrap();
        flow.ledger.store.adjust_balance(account.id, amount, false).unwrap();
        account.id
    }

    #[test]
    fn test_start_creates_account_and_resets() {
        let flow = flow_with(1);
        flow.sessions.set(1001, PlayerState::AwaitingDepositAmount);

        let out = flow.handle_command(&alice(), "start");
        assert_eq!(out.len(), 1);
        assert!(out[0].text.contains("alice"));
        assert_eq!(flow.state(1001), PlayerState::Idle);
        assert_eq!(flow.ledger.store.get_account(1001).unwrap().balance, 0);
    }

    #[test]
    fn test_bet_flow_settles_and_returns_to_idle() {
        let flow = flow_with(4);
        let id = fund(&flow, 150_000);

        flow.handle_action(&alice(), Action::Bet(Selection::Even));
        assert_eq!(flow.state(1001), PlayerState::AwaitingBetAmount { selection: Selection::Even });

        let out = flow.handle_text(&alice(), "5000");
        assert!(out[0].text.contains("won"), "{}", out[0].text);
        assert!(out[0].text.contains("155,000"));
        assert_eq!(flow.state(1001), PlayerState::Idle);
        assert_eq!(flow.ledger.store.get_account_by_id(id).unwrap().balance, 155_000);
    }

    #[test]
    fn test_invalid_stake_keeps_state() {
        let flow = flow_with(4);
        fund(&flow, 150_000);
        flow.handle_action(&alice(), Action::Bet(Selection::Face(2)));
        let expected = PlayerState::AwaitingBetAmount { selection: Selection::Face(2) };

        for text in ["abc", "4999", "200000"] {
            let out = flow.handle_text(&alice(), text);
            assert!(out[0].text.starts_with("⚠️"), "{text}: {}", out[0].text);
            assert_eq!(flow.state(1001), expected, "{text}");
        }
        assert!(flow.ledger.store.wagers_for(1, 10).unwrap().is_empty());
    }

    #[test]
    fn test_deposit_flow_files_request_and_alerts_operators() {
        let flow = flow_with(1);

        flow.handle_action(&alice(), Action::Deposit);
        let out = flow.handle_text(&alice(), "50000");
        assert!(out[0].text.contains("minimum"), "{}", out[0].text);
        assert_eq!(flow.state(1001), PlayerState::AwaitingDepositAmount);

        flow.handle_text(&alice(), "150,000");
        assert_eq!(flow.state(1001), PlayerState::AwaitingDepositMethod { amount: 150_000 });

        let out = flow.handle_action(&alice(), Action::DepositMethod(PaymentMethod::Trc20));
        assert!(out[0].text.contains("transaction hash"));

        let proof = "hash 0xfeed link https://tronscan.org/#/transaction/0xfeed";
        let out = flow.handle_text(&alice(), proof);
        assert_eq!(flow.state(1001), PlayerState::Idle);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].external_id, OPERATOR);

        let pending = flow.ledger.requests.list_pending(RequestKind::Deposit, 10).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].payload, proof);
        assert_eq!(flow.ledger.store.get_account(1001).unwrap().balance, 0);
    }

    #[test]
    fn test_empty_proof_keeps_state() {
        let flow = flow_with(1);
        flow.handle_action(&alice(), Action::Deposit);
        flow.handle_text(&alice(), "150000");
        flow.handle_action(&alice(), Action::DepositMethod(PaymentMethod::Polygon));

        let out = flow.handle_text(&alice(), "   ");
        assert!(out[0].text.starts_with("⚠️"));
        assert_eq!(
            flow.state(1001),
            PlayerState::AwaitingDepositProof { amount: 150_000, method: PaymentMethod::Polygon }
        );
        assert!(flow.ledger.requests.list_pending(RequestKind::Deposit, 10).unwrap().is_empty());
    }

    #[test]
    fn test_method_button_without_amount_is_stale() {
        let flow = flow_with(1);
        let out = flow.handle_action(&alice(), Action::DepositMethod(PaymentMethod::Polygon));
        assert_eq!(out[0].text, texts::stale_menu());
        assert_eq!(flow.state(1001), PlayerState::Idle);
    }

    #[test]
    fn test_voucher_withdrawal_files_immediately() {
        let flow = flow_with(1);
        fund(&flow, 600_000);

        flow.handle_action(&alice(), Action::Withdraw);
        flow.handle_text(&alice(), "500000");
        let out = flow.handle_action(&alice(), Action::WithdrawMethod(PaymentMethod::Voucher));

        assert!(out[0].text.contains("100,000"), "{}", out[0].text);
        assert_eq!(flow.state(1001), PlayerState::Idle);
        let pending = flow.ledger.requests.list_pending(RequestKind::Withdrawal, 10).unwrap();
        assert_eq!(pending[0].method, PaymentMethod::Voucher);
        assert_eq!(pending[0].status, RequestStatus::Pending);
    }

    #[test]
    fn test_withdrawal_over_balance_rejected_at_amount_step() {
        let flow = flow_with(1);
        fund(&flow, 600_000);

        flow.handle_action(&alice(), Action::Withdraw);
        let out = flow.handle_text(&alice(), "700000");
        assert!(out[0].text.contains("not enough"));
        assert_eq!(flow.state(1001), PlayerState::AwaitingWithdrawalAmount);
    }

    #[test]
    fn test_withdrawal_balance_drained_mid_flow() {
        let flow = flow_with(1);
        let id = fund(&flow, 600_000);

        flow.handle_action(&alice(), Action::Withdraw);
        flow.handle_text(&alice(), "500000");
        flow.handle_action(&alice(), Action::WithdrawMethod(PaymentMethod::Trc20));
        flow.ledger.store.set_balance_absolute(id, 100_000).unwrap();

        let out = flow.handle_text(&alice(), "TAddr");
        assert!(out[0].text.contains("not enough"));
        assert_eq!(flow.state(1001), PlayerState::Idle);
        assert_eq!(flow.ledger.store.get_account_by_id(id).unwrap().balance, 100_000);
    }

    #[test]
    fn test_button_overwrites_open_flow() {
        let flow = flow_with(1);
        flow.handle_action(&alice(), Action::Deposit);
        flow.handle_action(&alice(), Action::Bet(Selection::Odd));
        assert_eq!(flow.state(1001), PlayerState::AwaitingBetAmount { selection: Selection::Odd });

        flow.handle_command(&alice(), "cancel");
        assert_eq!(flow.state(1001), PlayerState::Idle);
    }

    #[test]
    fn test_blocked_account_cannot_bet() {
        let flow = flow_with(1);
        let id = fund(&flow, 100_000);
        flow.ledger.store.set_status(id, crate::ledger::AccountStatus::Blocked).unwrap();

        flow.handle_action(&alice(), Action::Bet(Selection::Even));
        let out = flow.handle_text(&alice(), "5000");
        assert!(out[0].text.contains("blocked"));
        assert_eq!(flow.ledger.store.get_account_by_id(id).unwrap().balance, 100_000);
    }
}
