//! Ledger & wager engine: balances, bets, deposit/withdrawal requests and
//! operator settings.

pub mod errors;
pub mod models;
pub mod requests;
pub mod settings;
pub mod store;
pub mod wager;


use std::sync::Arc;

pub use errors::{LedgerError, LedgerResult};
pub use models::{
    Account, AccountStatus, Committed, Decision, FundsRequest, GameLogicConfig, LeaderboardEntry, MAX_AMOUNT,
    PaymentMethod, RequestKind, RequestStatus, Selection, WagerRecord, WagerResult, WalletConfig,
};
pub use requests::{RequestLimits, RequestWorkflow};
pub use store::Store;
pub use wager::{DiceRoller, FixedDice, SeededDice, ThreadDice, WagerEngine};

/// The store plus the two engines that mutate it.
pub struct Ledger {
    pub store: Arc<Store>,
    pub wagers: WagerEngine,
    pub requests: RequestWorkflow,
}

impl Ledger {
    pub fn new(store: Arc<Store>, dice: Box<dyn DiceRoller>, min_stake: i64, limits: RequestLimits) -> Self {
        Self {
            wagers: WagerEngine::new(store.clone(), dice, min_stake),
            requests: RequestWorkflow::new(store.clone(), limits),
            store,
        }
    }
}
