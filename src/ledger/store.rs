//! Account store backed by SQLite.
//!
//! All compound operations run through [`Store::with_tx`], which holds the
//! connection lock and an immediate SQLite transaction for the whole
//! read-validate-write sequence. That lock is the critical section every
//! balance mutation is linearized on. Nothing in here awaits.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, TransactionBehavior, params};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::errors::{LedgerError, LedgerResult};
use super::models::{Account, AccountStatus, MAX_AMOUNT, PaymentMethod, RequestStatus};

const ACCOUNT_COLUMNS: &str = "id, external_id, display_name, balance, status, note, created_at";

/// Note given to accounts on first contact.
const NEW_ACCOUNT_NOTE: &str = "New user";

/// Durable store for accounts, wagers, requests and settings.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) a database file.
    pub fn open(path: &Path) -> LedgerResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Create a new in-memory database.
    pub fn open_in_memory() -> LedgerResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Open the database, importing legacy JSON collections from `legacy_dir`
    /// when the database file is new.
    pub fn load_or_new(path: &Path, legacy_dir: Option<&Path>) -> LedgerResult<Self> {
        let db_exists = path.exists();
        let store = Self::open(path)?;

        if !db_exists
            && let Some(dir) = legacy_dir
            && dir.join("user.json").exists()
        {
            info!("Migrating legacy JSON collections from {:?}", dir);
            match store.migrate_from_json(dir) {
                Ok(report) => info!(
                    "Imported {} accounts, {} deposits, {} withdrawals ({} game records skipped)",
                    report.accounts, report.deposits, report.withdrawals, report.skipped_games
                ),
                Err(e) => warn!("Legacy migration failed: {e}"),
            }
        }

        let (accounts, pending) = store.counts()?;
        info!("Loaded ledger from {:?} ({} accounts, {} pending requests)", path, accounts, pending);
        Ok(store)
    }

    fn from_connection(conn: Connection) -> LedgerResult<Self> {
        let store = Self { conn: Mutex::new(conn) };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> LedgerResult<()> {
        let conn = self.lock()?;

        conn.execute_batch(r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                external_id INTEGER NOT NULL UNIQUE,
                display_name TEXT NOT NULL,
                balance INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'active',
                note TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS wagers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL REFERENCES accounts(id),
                display_name TEXT NOT NULL,
                stake INTEGER NOT NULL,
                selection TEXT NOT NULL,
                outcome INTEGER NOT NULL,
                result TEXT NOT NULL,
                profit INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS deposits (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL REFERENCES accounts(id),
                display_name TEXT NOT NULL,
                amount INTEGER NOT NULL,
                method TEXT NOT NULL,
                payload TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at TEXT NOT NULL,
                reviewed_at TEXT
            );

            CREATE TABLE IF NOT EXISTS withdrawals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL REFERENCES accounts(id),
                display_name TEXT NOT NULL,
                amount INTEGER NOT NULL,
                method TEXT NOT NULL,
                payload TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at TEXT NOT NULL,
                reviewed_at TEXT
            );

            CREATE TABLE IF NOT EXISTS game_logic (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                win_percent INTEGER NOT NULL,
                lose_percent INTEGER NOT NULL,
                randomize INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS wallets (
                method TEXT PRIMARY KEY,
                address TEXT NOT NULL
            );

            INSERT OR IGNORE INTO game_logic (id, win_percent, lose_percent, randomize) VALUES (1, 50, 50, 1);
            INSERT OR IGNORE INTO wallets (method, address) VALUES ('trc20', '890qya3ymf8oqkzfgqa9HKDSU89QWFU8');
            INSERT OR IGNORE INTO wallets (method, address) VALUES ('polygon', 'werj9yxf78wgo7frgwiarfsjdufgfnxvidb');

            CREATE INDEX IF NOT EXISTS idx_wagers_account ON wagers(account_id);
            CREATE INDEX IF NOT EXISTS idx_deposits_status ON deposits(status);
            CREATE INDEX IF NOT EXISTS idx_withdrawals_status ON withdrawals(status);
        "#)?;
        Ok(())
    }

    fn lock(&self) -> LedgerResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| LedgerError::StoreUnavailable("connection lock poisoned".to_string()))
    }

    /// Run `f` as one indivisible unit. Commits on `Ok`, rolls back on `Err`.
    pub(crate) fn with_tx<T>(&self, f: impl FnOnce(&Transaction<'_>) -> LedgerResult<T>) -> LedgerResult<T> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Read-only access; sees only committed state.
    pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> LedgerResult<T>) -> LedgerResult<T> {
        let conn = self.lock()?;
        f(&conn)
    }

    fn counts(&self) -> LedgerResult<(i64, i64)> {
        self.with_conn(|conn| {
            let accounts = conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?;
            let pending = conn.query_row(
                "SELECT (SELECT COUNT(*) FROM deposits WHERE status = 'pending')
                      + (SELECT COUNT(*) FROM withdrawals WHERE status = 'pending')",
                [],
                |row| row.get(0),
            )?;
            Ok((accounts, pending))
        })
    }

    // ==================== ACCOUNT METHODS ====================

    /// Look up an account by chat identity.
    pub fn get_account(&self, external_id: i64) -> LedgerResult<Account> {
        self.with_conn(|conn| {
            find_account(conn, external_id)?
                .ok_or_else(|| LedgerError::NotFound(format!("Account for user {external_id}")))
        })
    }

    /// Look up an account by ledger id.
    pub fn get_account_by_id(&self, account_id: i64) -> LedgerResult<Account> {
        self.with_conn(|conn| load_account(conn, account_id))
    }

    /// Create the account for a never-seen identity, or return the existing one.
    ///
    /// The uniqueness check and insert happen in one transaction, so racing
    /// first contacts produce exactly one account.
    pub fn create_account(&self, external_id: i64, display_name: &str) -> LedgerResult<Account> {
        self.with_tx(|tx| {
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO accounts (external_id, display_name, balance, status, note, created_at)
                 VALUES (?1, ?2, 0, 'active', ?3, ?4)",
                params![external_id, display_name, NEW_ACCOUNT_NOTE, now()],
            )?;
            if inserted == 1 {
                info!("🆕 Account created for {} ({})", display_name, external_id);
            }
            find_account(tx, external_id)?
                .ok_or_else(|| LedgerError::NotFound(format!("Account for user {external_id}")))
        })
    }

    /// Atomically add `delta` to the balance and return the new balance.
    pub fn adjust_balance(&self, account_id: i64, delta: i64, allow_negative: bool) -> LedgerResult<i64> {
        self.with_tx(|tx| adjust_balance_in(tx, account_id, delta, allow_negative))
    }

    /// Operator edit: set the account status.
    pub fn set_status(&self, account_id: i64, status: AccountStatus) -> LedgerResult<Account> {
        self.with_tx(|tx| {
            load_account(tx, account_id)?;
            tx.execute("UPDATE accounts SET status = ?1 WHERE id = ?2", params![status.as_str(), account_id])?;
            info!("Account {} status set to {}", account_id, status);
            load_account(tx, account_id)
        })
    }

    /// Operator edit: overwrite the balance.
    pub fn set_balance_absolute(&self, account_id: i64, balance: i64) -> LedgerResult<Account> {
        if balance < 0 {
            return Err(LedgerError::InvalidInput(format!("balance must not be negative, got {balance}")));
        }
        if balance > MAX_AMOUNT {
            return Err(LedgerError::InvalidInput(format!("balance must not exceed {MAX_AMOUNT}, got {balance}")));
        }
        self.with_tx(|tx| {
            let before = load_account(tx, account_id)?;
            tx.execute("UPDATE accounts SET balance = ?1 WHERE id = ?2", params![balance, account_id])?;
            info!("Account {} balance set by operator: {} -> {}", account_id, before.balance, balance);
            load_account(tx, account_id)
        })
    }

    /// Operator edit: replace the free-form note.
    pub fn set_note(&self, account_id: i64, note: &str) -> LedgerResult<Account> {
        self.with_tx(|tx| {
            load_account(tx, account_id)?;
            tx.execute("UPDATE accounts SET note = ?1 WHERE id = ?2", params![note, account_id])?;
            load_account(tx, account_id)
        })
    }

    /// Accounts in creation order.
    pub fn list_accounts(&self, limit: usize) -> LedgerResult<Vec<Account>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY id ASC LIMIT ?1"))?;
            let rows = stmt.query_map(params![limit as i64], account_from_row)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }

    // ==================== LEGACY IMPORT ====================

    /// Import the flat JSON collections the service used before the ledger
    /// moved to SQLite. Runs as one transaction.
    pub fn migrate_from_json(&self, dir: &Path) -> LedgerResult<MigrationReport> {
        #[derive(Deserialize)]
        struct LegacyUser {
            #[serde(rename = "ID-Telegram")]
            telegram_id: i64,
            #[serde(rename = "Username", default)]
            username: Option<String>,
            #[serde(rename = "Balance", default)]
            balance: i64,
            #[serde(rename = "Status", default)]
            status: Option<String>,
            #[serde(rename = "Description", default)]
            description: Option<String>,
        }

        #[derive(Deserialize)]
        struct LegacyRequest {
            #[serde(rename = "ID")]
            id: i64,
            #[serde(rename = "ID-Telegram")]
            telegram_id: i64,
            #[serde(rename = "Username", default)]
            username: Option<String>,
            amount: i64,
            side: String,
            #[serde(alias = "information", alias = "wallet-code", default)]
            payload: String,
            status: String,
        }

        #[derive(Deserialize)]
        struct LegacyLogic {
            win: u8,
            lose: u8,
            random: bool,
        }

        fn read<T: serde::de::DeserializeOwned>(path: &Path) -> LedgerResult<Vec<T>> {
            if !path.exists() {
                return Ok(Vec::new());
            }
            let json = std::fs::read_to_string(path)
                .map_err(|e| LedgerError::StoreUnavailable(format!("failed to read {}: {e}", path.display())))?;
            serde_json::from_str(&json)
                .map_err(|e| LedgerError::InvalidInput(format!("failed to parse {}: {e}", path.display())))
        }

        let users: Vec<LegacyUser> = read(&dir.join("user.json"))?;
        let deposits: Vec<LegacyRequest> = read(&dir.join("deposit.json"))?;
        let withdrawals: Vec<LegacyRequest> = read(&dir.join("withdrawal.json"))?;
        let logic: Vec<LegacyLogic> = read(&dir.join("logic.json"))?;
        let wallets: Vec<std::collections::HashMap<String, String>> = read(&dir.join("wallet.json"))?;
        let games: Vec<serde_json::Value> = read(&dir.join("game.json"))?;

        self.with_tx(|tx| {
            let mut report = MigrationReport { skipped_games: games.len(), ..Default::default() };

            for u in &users {
                let status = u.status.as_deref().and_then(AccountStatus::parse).unwrap_or(AccountStatus::Active);
                report.accounts += tx.execute(
                    "INSERT OR IGNORE INTO accounts (external_id, display_name, balance, status, note, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        u.telegram_id,
                        u.username.as_deref().unwrap_or("Unknown"),
                        u.balance,
                        status.as_str(),
                        u.description.as_deref().unwrap_or(NEW_ACCOUNT_NOTE),
                        now()
                    ],
                )?;
            }

            for (table, requests, counter) in [
                ("deposits", &deposits, &mut report.deposits),
                ("withdrawals", &withdrawals, &mut report.withdrawals),
            ] {
                for r in requests {
                    let name = r.username.as_deref().unwrap_or("Unknown");
                    tx.execute(
                        "INSERT OR IGNORE INTO accounts (external_id, display_name, balance, status, note, created_at)
                         VALUES (?1, ?2, 0, 'active', ?3, ?4)",
                        params![r.telegram_id, name, NEW_ACCOUNT_NOTE, now()],
                    )?;
                    let account = find_account(tx, r.telegram_id)?
                        .ok_or_else(|| LedgerError::NotFound(format!("Account for user {}", r.telegram_id)))?;
                    let Some(method) = PaymentMethod::parse(&r.side) else {
                        warn!("Skipping legacy {} #{}: unknown method '{}'", table, r.id, r.side);
                        continue;
                    };
                    let status = RequestStatus::parse(&r.status).unwrap_or(RequestStatus::Pending);
                    *counter += tx.execute(
                        &format!(
                            "INSERT OR IGNORE INTO {table} (id, account_id, display_name, amount, method, payload, status, created_at)
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
                        ),
                        params![r.id, account.id, name, r.amount, method.as_str(), r.payload, status.as_str(), now()],
                    )?;
                }
            }

            if let Some(l) = logic.first() {
                if u16::from(l.win) + u16::from(l.lose) == 100 {
                    tx.execute(
                        "UPDATE game_logic SET win_percent = ?1, lose_percent = ?2, randomize = ?3 WHERE id = 1",
                        params![l.win, l.lose, l.random],
                    )?;
                } else {
                    warn!("Ignoring legacy game logic {}/{}: does not add up to 100", l.win, l.lose);
                }
            }

            if let Some(w) = wallets.first() {
                for (name, address) in w {
                    match PaymentMethod::parse(name) {
                        Some(method) if method.is_on_chain() => {
                            tx.execute(
                                "INSERT OR REPLACE INTO wallets (method, address) VALUES (?1, ?2)",
                                params![method.as_str(), address],
                            )?;
                        }
                        _ => debug!("Ignoring legacy wallet entry {}", name),
                    }
                }
            }

            if report.skipped_games > 0 {
                warn!("{} legacy game records have no selection/outcome and were not imported", report.skipped_games);
            }
            Ok(report)
        })
    }
}

/// Row counts from a legacy import.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub accounts: usize,
    pub deposits: usize,
    pub withdrawals: usize,
    pub skipped_games: usize,
}

/// Current UTC time as stored in records.
pub(crate) fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Decode a text column with `parse`, failing the row on unknown values.
pub(crate) fn parse_col<T>(row: &Row<'_>, idx: usize, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            Box::new(LedgerError::InvalidInput(format!("unexpected value '{raw}'"))),
        )
    })
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        external_id: row.get(1)?,
        display_name: row.get(2)?,
        balance: row.get(3)?,
        status: parse_col(row, 4, AccountStatus::parse)?,
        note: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub(crate) fn find_account(conn: &Connection, external_id: i64) -> LedgerResult<Option<Account>> {
    Ok(conn
        .query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE external_id = ?1"),
            params![external_id],
            account_from_row,
        )
        .optional()?)
}

pub(crate) fn load_account(conn: &Connection, account_id: i64) -> LedgerResult<Account> {
    conn.query_row(
        &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"),
        params![account_id],
        account_from_row,
    )
    .optional()?
    .ok_or_else(|| LedgerError::NotFound(format!("Account {account_id}")))
}

/// The single code path that moves a balance by a delta.
///
/// Must be called inside [`Store::with_tx`]; the caller's transaction is the
/// critical section.
pub(crate) fn adjust_balance_in(conn: &Connection, account_id: i64, delta: i64, allow_negative: bool) -> LedgerResult<i64> {
    let balance: i64 = conn
        .query_row("SELECT balance FROM accounts WHERE id = ?1", params![account_id], |row| row.get(0))
        .optional()?
        .ok_or_else(|| LedgerError::NotFound(format!("Account {account_id}")))?;

    let new_balance = balance
        .checked_add(delta)
        .ok_or_else(|| LedgerError::InvalidInput(format!("balance overflow on account {account_id}")))?;

    if !allow_negative && delta < 0 && new_balance < 0 {
        return Err(LedgerError::InsufficientFunds { available: balance, required: -delta });
    }

    conn.execute("UPDATE accounts SET balance = ?1 WHERE id = ?2", params![new_balance, account_id])?;
    debug!("Account {} balance {} -> {} ({:+})", account_id, balance, new_balance, delta);
    Ok(new_balance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_create_account_defaults() {
        let store = Store::open_in_memory().unwrap();
        let account = store.create_account(100, "alice").unwrap();

        assert_eq!(account.balance, 0);
        assert_eq!(account.status, AccountStatus::Active);
        assert_eq!(account.external_id, 100);
        assert_eq!(store.get_account(100).unwrap(), account);
    }

    #[test]
    fn test_create_account_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        let first = store.create_account(100, "alice").unwrap();
        let second = store.create_account(100, "alice2").unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.list_accounts(10).unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_first_contact_creates_one_account() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let ids: Vec<i64> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let store = store.clone();
                    s.spawn(move || store.create_account(7, "racer").unwrap().id)
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(store.list_accounts(10).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_account_is_not_found() {
        let store = Store::open_in_memory().unwrap();
        assert!(matches!(store.get_account(1), Err(LedgerError::NotFound(_))));
        assert!(matches!(store.adjust_balance(42, 10, false), Err(LedgerError::NotFound(_))));
        assert!(matches!(store.set_status(42, AccountStatus::Blocked), Err(LedgerError::NotFound(_))));
    }

    #[test]
    fn test_adjust_balance_refuses_overdraft() {
        let store = Store::open_in_memory().unwrap();
        let account = store.create_account(1, "bob").unwrap();

        assert_eq!(store.adjust_balance(account.id, 1000, false).unwrap(), 1000);
        let err = store.adjust_balance(account.id, -1500, false).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { available: 1000, required: 1500 }));
        assert_eq!(store.get_account_by_id(account.id).unwrap().balance, 1000);

        assert_eq!(store.adjust_balance(account.id, -1500, true).unwrap(), -500);
    }

    #[test]
    fn test_racing_debits_never_go_negative() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let account = store.create_account(1, "bob").unwrap();
        store.adjust_balance(account.id, 10_000, false).unwrap();

        let successes: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|_| {
                    let store = store.clone();
                    s.spawn(move || store.adjust_balance(account.id, -1_000, false).is_ok() as usize)
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(successes, 10);
        assert_eq!(store.get_account_by_id(account.id).unwrap().balance, 0);
    }

    #[test]
    fn test_operator_edits() {
        let store = Store::open_in_memory().unwrap();
        let account = store.create_account(1, "carol").unwrap();

        let edited = store.set_balance_absolute(account.id, 42_000).unwrap();
        assert_eq!(edited.balance, 42_000);
        assert!(matches!(store.set_balance_absolute(account.id, -1), Err(LedgerError::InvalidInput(_))));
        assert!(matches!(store.set_balance_absolute(account.id, MAX_AMOUNT + 1), Err(LedgerError::InvalidInput(_))));

        let edited = store.set_status(account.id, AccountStatus::Blocked).unwrap();
        assert_eq!(edited.status, AccountStatus::Blocked);

        let edited = store.set_note(account.id, "VIP").unwrap();
        assert_eq!(edited.note, "VIP");
        assert_eq!(edited.balance, 42_000);
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let store = Store::open_in_memory().unwrap();
        let account = store.create_account(1, "dave").unwrap();
        store.adjust_balance(account.id, 500, false).unwrap();

        let result: LedgerResult<()> = store.with_tx(|tx| {
            adjust_balance_in(tx, account.id, 100, false)?;
            adjust_balance_in(tx, account.id, -10_000, false)?;
            Ok(())
        });

        assert!(result.is_err());
        assert_eq!(store.get_account_by_id(account.id).unwrap().balance, 500);
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        {
            let store = Store::open(&path).unwrap();
            let account = store.create_account(9, "erin").unwrap();
            store.adjust_balance(account.id, 777, false).unwrap();
        }
        let store = Store::open(&path).unwrap();
        assert_eq!(store.get_account(9).unwrap().balance, 777);
    }

    #[test]
    fn test_migrate_from_legacy_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("user.json"),
            r#"[{"ID": 1, "ID-Telegram": 555, "Username": "frank", "Balance": 250000, "Status": "Active", "Description": "New User"}]"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("deposit.json"),
            r#"[{"ID": 3, "ID-Telegram": 555, "Username": "frank", "amount": 150000, "side": "TRC20", "information": "tx123", "status": "Pending"}]"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("withdrawal.json"),
            r#"[{"ID": 1, "ID-Telegram": 556, "Username": "gina", "amount": 500000, "side": "POL", "wallet-code": "0xabc", "status": "Accept"}]"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("logic.json"), r#"[{"win": 40, "lose": 60, "random": false}]"#).unwrap();
        std::fs::write(dir.path().join("game.json"), r#"[{"ID": 1, "bet": 5000}]"#).unwrap();

        let db_path = dir.path().join("ledger.db");
        let store = Store::load_or_new(&db_path, Some(dir.path())).unwrap();

        assert_eq!(store.get_account(555).unwrap().balance, 250_000);
        assert_eq!(store.get_account(556).unwrap().balance, 0);

        let report = store.migrate_from_json(dir.path()).unwrap();
        assert_eq!(report.accounts, 0);
        assert_eq!(report.deposits, 0);
        assert_eq!(report.skipped_games, 1);
    }
}
