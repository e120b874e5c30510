//! Deposit and withdrawal request workflow.
//!
//! Requests start `Pending` and move exactly once to `Accepted` or
//! `Rejected`. Withdrawals debit the account when filed (escrow); a rejected
//! withdrawal is refunded, an accepted one needs no further ledger change.
//! Deposits only credit the account on acceptance.

use std::sync::Arc;

use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::info;

use super::errors::{LedgerError, LedgerResult};
use super::models::{AccountStatus, Committed, Decision, FundsRequest, PaymentMethod, RequestKind, RequestStatus};
use super::store::{Store, adjust_balance_in, load_account, now, parse_col};

/// Policy floors for request amounts.
#[derive(Debug, Clone, Copy)]
pub struct RequestLimits {
    pub min_deposit: i64,
    pub min_withdrawal: i64,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self { min_deposit: 100_000, min_withdrawal: 500_000 }
    }
}

/// Drives deposit/withdrawal requests to completion.
pub struct RequestWorkflow {
    store: Arc<Store>,
    limits: RequestLimits,
}

impl RequestWorkflow {
    pub fn new(store: Arc<Store>, limits: RequestLimits) -> Self {
        Self { store, limits }
    }

    pub fn limits(&self) -> RequestLimits {
        self.limits
    }

    /// File a deposit. No balance effect until accepted.
    pub fn submit_deposit(&self, account_id: i64, amount: i64, method: PaymentMethod, proof: &str) -> LedgerResult<FundsRequest> {
        if amount < self.limits.min_deposit {
            return Err(LedgerError::BelowMinimum { minimum: self.limits.min_deposit, got: amount });
        }
        let request = self.store.with_tx(|tx| {
            let account = load_account(tx, account_id)?;
            if account.status == AccountStatus::Blocked {
                return Err(LedgerError::AccountBlocked(account_id));
            }
            insert_request(tx, RequestKind::Deposit, account_id, &account.display_name, amount, method, proof)
        })?;
        info!("📥 Deposit #{} filed by {}: {} via {}", request.id, request.display_name, request.amount, request.method);
        Ok(request)
    }

    /// File a withdrawal and reserve the funds immediately.
    pub fn submit_withdrawal(
        &self,
        account_id: i64,
        amount: i64,
        method: PaymentMethod,
        destination: &str,
    ) -> LedgerResult<Committed<FundsRequest>> {
        if amount < self.limits.min_withdrawal {
            return Err(LedgerError::BelowMinimum { minimum: self.limits.min_withdrawal, got: amount });
        }
        let escrowed = self.store.with_tx(|tx| {
            let account = load_account(tx, account_id)?;
            if account.status == AccountStatus::Blocked {
                return Err(LedgerError::AccountBlocked(account_id));
            }
            let balance = adjust_balance_in(tx, account_id, -amount, false)?;
            let record =
                insert_request(tx, RequestKind::Withdrawal, account_id, &account.display_name, amount, method, destination)?;
            Ok(Committed { record, balance })
        })?;
        let request = &escrowed.record;
        info!("📤 Withdrawal #{} filed by {}: {} via {} (escrowed)", request.id, request.display_name, request.amount, request.method);
        Ok(escrowed)
    }

    /// Accept or reject a pending deposit. Acceptance credits the account.
    pub fn review_deposit(&self, request_id: i64, decision: Decision) -> LedgerResult<FundsRequest> {
        self.review(RequestKind::Deposit, request_id, decision)
    }

    /// Accept or reject a pending withdrawal. Rejection refunds the escrow.
    pub fn review_withdrawal(&self, request_id: i64, decision: Decision) -> LedgerResult<FundsRequest> {
        self.review(RequestKind::Withdrawal, request_id, decision)
    }

    fn review(&self, kind: RequestKind, request_id: i64, decision: Decision) -> LedgerResult<FundsRequest> {
        let request = self.store.with_tx(|tx| {
            let request = load_request(tx, kind, request_id)?;
            if request.status != RequestStatus::Pending {
                return Err(LedgerError::AlreadyReviewed { id: request_id, status: request.status });
            }

            let credit = match (kind, decision) {
                (RequestKind::Deposit, Decision::Accept) | (RequestKind::Withdrawal, Decision::Reject) => request.amount,
                _ => 0,
            };
            if credit != 0 {
                adjust_balance_in(tx, request.account_id, credit, false)?;
            }

            tx.execute(
                &format!("UPDATE {} SET status = ?1, reviewed_at = ?2 WHERE id = ?3 AND status = 'pending'", kind.table()),
                params![decision.status().as_str(), now(), request_id],
            )?;
            load_request(tx, kind, request_id)
        })?;
        info!("🧾 {} #{} {} ({} for account {})", kind, request.id, request.status, request.amount, request.account_id);
        Ok(request)
    }

    /// Fetch one request.
    pub fn get_request(&self, kind: RequestKind, request_id: i64) -> LedgerResult<FundsRequest> {
        self.store.with_conn(|conn| load_request(conn, kind, request_id))
    }

    /// Oldest pending requests first.
    pub fn list_pending(&self, kind: RequestKind, limit: usize) -> LedgerResult<Vec<FundsRequest>> {
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REQUEST_COLUMNS} FROM {} WHERE status = 'pending' ORDER BY id ASC LIMIT ?1",
                kind.table()
            ))?;
            let rows = stmt.query_map(params![limit as i64], |row| request_from_row(row, kind))?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }
}

const REQUEST_COLUMNS: &str = "id, account_id, display_name, amount, method, payload, status, created_at, reviewed_at";

fn request_from_row(row: &Row<'_>, kind: RequestKind) -> rusqlite::Result<FundsRequest> {
    Ok(FundsRequest {
        id: row.get(0)?,
        kind,
        account_id: row.get(1)?,
        display_name: row.get(2)?,
        amount: row.get(3)?,
        method: parse_col(row, 4, PaymentMethod::parse)?,
        payload: row.get(5)?,
        status: parse_col(row, 6, RequestStatus::parse)?,
        created_at: row.get(7)?,
        reviewed_at: row.get(8)?,
    })
}

fn load_request(conn: &Connection, kind: RequestKind, request_id: i64) -> LedgerResult<FundsRequest> {
    conn.query_row(
        &format!("SELECT {REQUEST_COLUMNS} FROM {} WHERE id = ?1", kind.table()),
        params![request_id],
        |row| request_from_row(row, kind),
    )
    .optional()?
    .ok_or_else(|| LedgerError::NotFound(format!("{kind} request #{request_id}")))
}

fn insert_request(
    conn: &Connection,
    kind: RequestKind,
    account_id: i64,
    display_name: &str,
    amount: i64,
    method: PaymentMethod,
    payload: &str,
) -> LedgerResult<FundsRequest> {
    conn.execute(
        &format!(
            "INSERT INTO {} (account_id, display_name, amount, method, payload, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6)",
            kind.table()
        ),
        params![account_id, display_name, amount, method.as_str(), payload, now()],
    )?;
    load_request(conn, kind, conn.last_insert_rowid())
}
