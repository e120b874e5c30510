//! Per-account conversation state.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::info;

use crate::ledger::{PaymentMethod, Selection};

/// Where a player is inside a multi-step flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlayerState {
    #[default]
    Idle,
    AwaitingBetAmount { selection: Selection },
    AwaitingDepositAmount,
    AwaitingDepositMethod { amount: i64 },
    AwaitingDepositProof { amount: i64, method: PaymentMethod },
    AwaitingWithdrawalAmount,
    AwaitingWithdrawalMethod { amount: i64 },
    AwaitingWithdrawalDestination { amount: i64, method: PaymentMethod },
}

/// Where an operator is inside an edit flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OperatorState {
    #[default]
    Idle,
    AwaitingBalanceEdit { target: i64 },
    AwaitingNoteEdit { target: i64 },
    AwaitingWinRateEdit,
    AwaitingLoseRateEdit,
    AwaitingWalletEdit { method: PaymentMethod },
}

struct Entry<S> {
    state: S,
    touched: Instant,
}

/// One state per key, with optional idle expiry.
///
/// Absent and expired entries both read as `S::default()`. Writing the
/// default state removes the entry.
pub struct SessionTable<S> {
    states: Mutex<HashMap<i64, Entry<S>>>,
    timeout: Option<Duration>,
}

impl<S: Copy + Default + PartialEq + Debug> SessionTable<S> {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { states: Mutex::new(HashMap::new()), timeout }
    }

    pub fn get(&self, key: i64) -> S {
        self.get_at(key, Instant::now())
    }

    fn get_at(&self, key: i64, now: Instant) -> S {
        let mut states = self.states.lock().unwrap_or_else(|p| p.into_inner());
        let Some(entry) = states.get(&key) else {
            return S::default();
        };
        if let Some(timeout) = self.timeout
            && now.saturating_duration_since(entry.touched) > timeout
        {
            info!("⏱️ Session {} expired in state {:?}", key, entry.state);
            states.remove(&key);
            return S::default();
        }
        entry.state
    }

    pub fn set(&self, key: i64, state: S) {
        let mut states = self.states.lock().unwrap_or_else(|p| p.into_inner());
        if state == S::default() {
            states.remove(&key);
        } else {
            states.insert(key, Entry { state, touched: Instant::now() });
        }
    }

    pub fn reset(&self, key: i64) {
        self.set(key, S::default());
    }

    /// Number of non-idle sessions.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.states.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_reads_idle() {
        let table: SessionTable<PlayerState> = SessionTable::new(None);
        assert_eq!(table.get(1), PlayerState::Idle);
    }

    #[test]
    fn test_set_and_reset() {
        let table = SessionTable::new(None);
        table.set(1, PlayerState::AwaitingDepositMethod { amount: 100_000 });
        table.set(2, PlayerState::AwaitingWithdrawalAmount);
        assert_eq!(table.get(1), PlayerState::AwaitingDepositMethod { amount: 100_000 });
        assert_eq!(table.len(), 2);

        table.reset(1);
        assert_eq!(table.get(1), PlayerState::Idle);
        assert_eq!(table.get(2), PlayerState::AwaitingWithdrawalAmount);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_setting_idle_removes_entry() {
        let table = SessionTable::new(None);
        table.set(7, OperatorState::AwaitingWinRateEdit);
        table.set(7, OperatorState::Idle);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_timeout_expires_to_idle() {
        let table = SessionTable::new(Some(Duration::from_secs(60)));
        table.set(1, PlayerState::AwaitingBetAmount { selection: Selection::Odd });

        let later = Instant::now() + Duration::from_secs(30);
        assert_eq!(table.get_at(1, later), PlayerState::AwaitingBetAmount { selection: Selection::Odd });

        let much_later = Instant::now() + Duration::from_secs(120);
        assert_eq!(table.get_at(1, much_later), PlayerState::Idle);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_no_timeout_never_expires() {
        let table = SessionTable::new(None);
        table.set(1, OperatorState::AwaitingNoteEdit { target: 3 });
        let far = Instant::now() + Duration::from_secs(86_400 * 365);
        assert_eq!(table.get_at(1, far), OperatorState::AwaitingNoteEdit { target: 3 });
    }
}
