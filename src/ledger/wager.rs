//! Wager engine: validate, draw, settle and record a dice bet.

use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rusqlite::{Connection, Row, params};
use tracing::{debug, info};

use super::errors::{LedgerError, LedgerResult};
use super::models::{AccountStatus, Committed, LeaderboardEntry, Selection, WagerRecord, WagerResult};
use super::settings::load_game_logic;
use super::store::{Store, adjust_balance_in, load_account, now, parse_col};

/// Source of die faces, uniform over 1..=6.
pub trait DiceRoller: Send + Sync {
    fn roll(&self) -> u8;
}

/// Production roller backed by the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDice;

impl DiceRoller for ThreadDice {
    fn roll(&self) -> u8 {
        rand::rng().random_range(1..=6)
    }
}

/// Reproducible roller for simulations and tests.
pub struct SeededDice {
    rng: Mutex<StdRng>,
}

impl SeededDice {
    pub fn new(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }
}

impl DiceRoller for SeededDice {
    fn roll(&self) -> u8 {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.random_range(1..=6)
    }
}

/// Always rolls the same face.
#[derive(Debug, Clone, Copy)]
pub struct FixedDice(pub u8);

impl DiceRoller for FixedDice {
    fn roll(&self) -> u8 {
        self.0
    }
}

/// Settles bets against the account store.
pub struct WagerEngine {
    store: Arc<Store>,
    dice: Box<dyn DiceRoller>,
    min_stake: i64,
}

impl WagerEngine {
    pub fn new(store: Arc<Store>, dice: Box<dyn DiceRoller>, min_stake: i64) -> Self {
        Self { store, dice, min_stake }
    }

    pub fn min_stake(&self) -> i64 {
        self.min_stake
    }

    /// Place and settle a bet.
    ///
    /// The balance check, the draw, the balance write and the record insert
    /// happen in one transaction. If any step fails nothing is written, so a
    /// record exists only for a balance change that was committed.
    pub fn place_bet(&self, account_id: i64, selection: Selection, stake: i64) -> LedgerResult<Committed<WagerRecord>> {
        if stake < self.min_stake {
            return Err(LedgerError::BelowMinimum { minimum: self.min_stake, got: stake });
        }

        let settled = self.store.with_tx(|tx| {
            let account = load_account(tx, account_id)?;
            if account.status == AccountStatus::Blocked {
                return Err(LedgerError::AccountBlocked(account_id));
            }
            if account.balance < stake {
                return Err(LedgerError::InsufficientFunds { available: account.balance, required: stake });
            }

            // Weighting is stored but does not bias the draw.
            let logic = load_game_logic(tx)?;
            debug!("Game logic at settlement: win {}% lose {}% randomize {}", logic.win_percent, logic.lose_percent, logic.randomize);

            let outcome = self.dice.roll();
            let (result, profit) = if selection.wins(outcome) {
                let profit = stake.checked_mul(selection.multiplier() - 1).ok_or_else(|| {
                    LedgerError::InvalidInput(format!("payout for a stake of {stake} is out of range"))
                })?;
                (WagerResult::Win, profit)
            } else {
                (WagerResult::Lose, -stake)
            };

            let balance = adjust_balance_in(tx, account_id, profit, false)?;
            let record = insert_wager(tx, account_id, &account.display_name, stake, selection, outcome, result, profit)?;
            Ok(Committed { record, balance })
        })?;
        let record = &settled.record;

        info!(
            "🎲 {} bet {} on {} -> {} ({}, {:+})",
            record.display_name,
            record.stake,
            record.selection,
            record.outcome,
            record.result.as_str(),
            record.profit
        );
        Ok(settled)
    }
}

#[allow(clippy::too_many_arguments)]
fn insert_wager(
    conn: &Connection,
    account_id: i64,
    display_name: &str,
    stake: i64,
    selection: Selection,
    outcome: u8,
    result: WagerResult,
    profit: i64,
) -> LedgerResult<WagerRecord> {
    let created_at = now();
    conn.execute(
        "INSERT INTO wagers (account_id, display_name, stake, selection, outcome, result, profit, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![account_id, display_name, stake, selection.as_token(), outcome, result.as_str(), profit, created_at],
    )?;
    Ok(WagerRecord {
        id: conn.last_insert_rowid(),
        account_id,
        display_name: display_name.to_string(),
        stake,
        selection,
        outcome,
        result,
        profit,
        created_at,
    })
}

fn wager_from_row(row: &Row<'_>) -> rusqlite::Result<WagerRecord> {
    Ok(WagerRecord {
        id: row.get(0)?,
        account_id: row.get(1)?,
        display_name: row.get(2)?,
        stake: row.get(3)?,
        selection: parse_col(row, 4, Selection::parse)?,
        outcome: row.get(5)?,
        result: parse_col(row, 6, WagerResult::parse)?,
        profit: row.get(7)?,
        created_at: row.get(8)?,
    })
}

impl Store {
    /// Most recent wagers for an account, newest first.
    pub fn wagers_for(&self, account_id: i64, limit: usize) -> LedgerResult<Vec<WagerRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, account_id, display_name, stake, selection, outcome, result, profit, created_at
                 FROM wagers WHERE account_id = ?1 ORDER BY id DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![account_id, limit as i64], wager_from_row)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }

    /// Accounts ranked by net wager profit.
    pub fn leaderboard(&self, limit: usize) -> LedgerResult<Vec<LeaderboardEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT a.id, a.display_name, COUNT(w.id), SUM(w.profit)
                 FROM wagers w JOIN accounts a ON a.id = w.account_id
                 GROUP BY a.id ORDER BY SUM(w.profit) DESC, a.id ASC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit as i64], |row| {
                Ok(LeaderboardEntry {
                    account_id: row.get(0)?,
                    display_name: row.get(1)?,
                    games: row.get(2)?,
                    net_profit: row.get(3)?,
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn funded(balance: i64) -> (Arc<Store>, i64) {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let account = store.create_account(1, "alice").unwrap();
        store.adjust_balance(account.id, balance, false).unwrap();
        (store, account.id)
    }

    #[test]
    fn test_parity_win_pays_double() {
        let (store, id) = funded(150_000);
        let engine = WagerEngine::new(store.clone(), Box::new(FixedDice(4)), 5_000);

        let record = engine.place_bet(id, Selection::Even, 5_000).unwrap().record;
        assert_eq!(record.result, WagerResult::Win);
        assert_eq!(record.profit, 5_000);
        assert_eq!(store.get_account_by_id(id).unwrap().balance, 155_000);
    }

    #[test]
    fn test_face_win_pays_six_times() {
        let (store, id) = funded(10_000);
        let engine = WagerEngine::new(store.clone(), Box::new(FixedDice(3)), 5_000);

        let record = engine.place_bet(id, Selection::Face(3), 10_000).unwrap().record;
        assert_eq!(record.profit, 50_000);
        assert_eq!(store.get_account_by_id(id).unwrap().balance, 60_000);
    }

    #[test]
    fn test_loss_debits_stake() {
        let (store, id) = funded(10_000);
        let engine = WagerEngine::new(store.clone(), Box::new(FixedDice(5)), 5_000);

        let record = engine.place_bet(id, Selection::Even, 6_000).unwrap().record;
        assert_eq!(record.result, WagerResult::Lose);
        assert_eq!(record.profit, -6_000);
        assert_eq!(store.get_account_by_id(id).unwrap().balance, 4_000);
    }

    #[test]
    fn test_below_minimum_rejected() {
        let (store, id) = funded(10_000);
        let engine = WagerEngine::new(store.clone(), Box::new(FixedDice(2)), 5_000);

        let err = engine.place_bet(id, Selection::Odd, 4_999).unwrap_err();
        assert!(matches!(err, LedgerError::BelowMinimum { minimum: 5_000, got: 4_999 }));
        assert!(store.wagers_for(id, 10).unwrap().is_empty());
    }

    #[test]
    fn test_insufficient_funds_writes_nothing() {
        let (store, id) = funded(4_000);
        let engine = WagerEngine::new(store.clone(), Box::new(FixedDice(2)), 1_000);

        let err = engine.place_bet(id, Selection::Even, 5_000).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { available: 4_000, required: 5_000 }));
        assert_eq!(store.get_account_by_id(id).unwrap().balance, 4_000);
        assert!(store.wagers_for(id, 10).unwrap().is_empty());
    }

    #[test]
    fn test_blocked_account_cannot_bet() {
        let (store, id) = funded(10_000);
        store.set_status(id, AccountStatus::Blocked).unwrap();
        let engine = WagerEngine::new(store.clone(), Box::new(FixedDice(2)), 1_000);

        assert!(matches!(engine.place_bet(id, Selection::Even, 5_000), Err(LedgerError::AccountBlocked(_))));
    }

    #[test]
    fn test_committed_balance_returned() {
        let (store, id) = funded(20_000);
        let engine = WagerEngine::new(store.clone(), Box::new(FixedDice(1)), 5_000);

        let settled = engine.place_bet(id, Selection::Odd, 5_000).unwrap();
        assert_eq!(settled.balance, 25_000);
        assert_eq!(settled.balance, store.get_account_by_id(id).unwrap().balance);
    }

    #[test]
    fn test_oversized_payout_rejected_without_poisoning_store() {
        let stake = 4_000_000_000_000_000_000;
        let (store, id) = funded(stake);
        let engine = WagerEngine::new(store.clone(), Box::new(FixedDice(6)), 5_000);

        let err = engine.place_bet(id, Selection::Face(6), stake).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
        assert_eq!(store.get_account_by_id(id).unwrap().balance, stake);
        assert!(store.wagers_for(id, 10).unwrap().is_empty());

        let settled = engine.place_bet(id, Selection::Even, 5_000).unwrap();
        assert_eq!(settled.record.result, WagerResult::Win);
    }

    #[test]
    fn test_game_logic_does_not_bias_outcome() {
        let (store, id) = funded(1_000_000);
        store.set_win_percent(100).unwrap();
        let engine = WagerEngine::new(store.clone(), Box::new(FixedDice(1)), 1_000);

        let record = engine.place_bet(id, Selection::Even, 1_000).unwrap().record;
        assert_eq!(record.result, WagerResult::Lose);
    }

    #[test]
    fn test_leaderboard_orders_by_profit() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let a = store.create_account(1, "alice").unwrap();
        let b = store.create_account(2, "bob").unwrap();
        store.adjust_balance(a.id, 100_000, false).unwrap();
        store.adjust_balance(b.id, 100_000, false).unwrap();

        let winner = WagerEngine::new(store.clone(), Box::new(FixedDice(6)), 1_000);
        winner.place_bet(b.id, Selection::Face(6), 1_000).unwrap();
        winner.place_bet(a.id, Selection::Odd, 1_000).unwrap();

        let board = store.leaderboard(10).unwrap();
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].display_name, "bob");
        assert_eq!(board[0].net_profit, 5_000);
        assert_eq!(board[1].net_profit, -1_000);
        assert_eq!(board[1].games, 1);
    }

    #[test]
    fn test_seeded_dice_is_reproducible() {
        let a = SeededDice::new(42);
        let b = SeededDice::new(42);
        let rolls_a: Vec<u8> = (0..100).map(|_| a.roll()).collect();
        let rolls_b: Vec<u8> = (0..100).map(|_| b.roll()).collect();
        assert_eq!(rolls_a, rolls_b);
        assert!(rolls_a.iter().all(|r| (1..=6).contains(r)));
    }
}
