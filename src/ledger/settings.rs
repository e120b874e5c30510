//! Operator-maintained settings: game logic and payout wallets.

use rusqlite::{Connection, params};
use tracing::info;

use super::errors::{LedgerError, LedgerResult};
use super::models::{GameLogicConfig, PaymentMethod, WalletConfig};
use super::store::{Store, parse_col};

pub(crate) fn load_game_logic(conn: &Connection) -> LedgerResult<GameLogicConfig> {
    Ok(conn.query_row(
        "SELECT win_percent, lose_percent, randomize FROM game_logic WHERE id = 1",
        [],
        |row| {
            Ok(GameLogicConfig {
                win_percent: row.get(0)?,
                lose_percent: row.get(1)?,
                randomize: row.get(2)?,
            })
        },
    )?)
}

fn store_game_logic(conn: &Connection, logic: &GameLogicConfig) -> LedgerResult<()> {
    conn.execute(
        "UPDATE game_logic SET win_percent = ?1, lose_percent = ?2, randomize = ?3 WHERE id = 1",
        params![logic.win_percent, logic.lose_percent, logic.randomize],
    )?;
    Ok(())
}

fn percent(value: i64) -> LedgerResult<u8> {
    match u8::try_from(value) {
        Ok(p) if p <= 100 => Ok(p),
        _ => Err(LedgerError::InvalidInput(format!("percentage must be between 0 and 100, got {value}"))),
    }
}

impl Store {
    /// Current game logic snapshot.
    pub fn game_logic(&self) -> LedgerResult<GameLogicConfig> {
        self.with_conn(load_game_logic)
    }

    /// Replace both percentages; they must add up to 100.
    pub fn set_game_logic(&self, win_percent: u8, lose_percent: u8) -> LedgerResult<GameLogicConfig> {
        self.with_tx(|tx| {
            let current = load_game_logic(tx)?;
            let logic = GameLogicConfig::new(win_percent, lose_percent, current.randomize)?;
            store_game_logic(tx, &logic)?;
            info!("Game logic set to win {}% / lose {}%", logic.win_percent, logic.lose_percent);
            Ok(logic)
        })
    }

    /// Set the win percentage; lose becomes the complement.
    pub fn set_win_percent(&self, win_percent: i64) -> LedgerResult<GameLogicConfig> {
        let win = percent(win_percent)?;
        self.set_game_logic(win, 100 - win)
    }

    /// Set the lose percentage; win becomes the complement.
    pub fn set_lose_percent(&self, lose_percent: i64) -> LedgerResult<GameLogicConfig> {
        let lose = percent(lose_percent)?;
        self.set_game_logic(100 - lose, lose)
    }

    /// Flip the randomize flag.
    pub fn toggle_randomize(&self) -> LedgerResult<GameLogicConfig> {
        self.with_tx(|tx| {
            let mut logic = load_game_logic(tx)?;
            logic.randomize = !logic.randomize;
            store_game_logic(tx, &logic)?;
            info!("Game logic randomize set to {}", logic.randomize);
            Ok(logic)
        })
    }

    /// Payout addresses for on-chain methods.
    pub fn wallets(&self) -> LedgerResult<WalletConfig> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT method, address FROM wallets")?;
            let rows = stmt.query_map([], |row| Ok((parse_col(row, 0, PaymentMethod::parse)?, row.get::<_, String>(1)?)))?;
            Ok(WalletConfig { addresses: rows.collect::<Result<_, _>>()? })
        })
    }

    /// Set the deposit address for an on-chain method.
    pub fn set_wallet_address(&self, method: PaymentMethod, address: &str) -> LedgerResult<WalletConfig> {
        let address = address.trim();
        if !method.is_on_chain() {
            return Err(LedgerError::InvalidInput(format!("{method} has no wallet address")));
        }
        if address.is_empty() || address.chars().any(char::is_whitespace) {
            return Err(LedgerError::InvalidInput("address must be a single non-empty token".to_string()));
        }
        self.with_tx(|tx| {
            tx.execute(
                "INSERT OR REPLACE INTO wallets (method, address) VALUES (?1, ?2)",
                params![method.as_str(), address],
            )?;
            Ok(())
        })?;
        info!("Wallet address for {} updated", method);
        self.wallets()
    }
}
