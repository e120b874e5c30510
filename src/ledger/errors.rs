//! Ledger error types.

use thiserror::Error;

use super::models::RequestStatus;

/// Errors produced by the account store, wager engine and request workflow.
///
/// Everything except `StoreUnavailable` is a recoverable, user-visible outcome
/// that leaves no record partially written.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Unknown account or request id.
    #[error("{0} not found")]
    NotFound(String),

    /// Debit exceeds the current balance.
    #[error("Insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: i64, required: i64 },

    /// Stake or request amount under the policy floor.
    #[error("Amount {got} is below the minimum of {minimum}")]
    BelowMinimum { minimum: i64, got: i64 },

    /// Non-numeric or out-of-range input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Request has already left the pending state.
    #[error("Request #{id} was already reviewed ({status})")]
    AlreadyReviewed { id: i64, status: RequestStatus },

    /// Win and lose percentages must add up to 100.
    #[error("Win {win}% and lose {lose}% must add up to 100")]
    ConfigInvariantViolation { win: u8, lose: u8 },

    /// Account is blocked by an operator.
    #[error("Account {0} is blocked")]
    AccountBlocked(i64),

    /// The durable store failed; the mutation did not happen.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<rusqlite::Error> for LedgerError {
    fn from(e: rusqlite::Error) -> Self {
        LedgerError::StoreUnavailable(e.to_string())
    }
}

impl LedgerError {
    /// Message safe to show in chat. Store failures are not described.
    pub fn user_message(&self) -> String {
        match self {
            LedgerError::StoreUnavailable(_) => {
                "Something went wrong on our side, please try again later.".to_string()
            }
            LedgerError::InsufficientFunds { available, .. } => {
                format!("Your balance is not enough (available: {available}).")
            }
            LedgerError::BelowMinimum { minimum, .. } => {
                format!("The minimum amount is {minimum}.")
            }
            LedgerError::AccountBlocked(_) => "Your account is blocked. Contact support.".to_string(),
            _ => self.to_string(),
        }
    }

    /// True for the one fault class that is not a business outcome.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LedgerError::StoreUnavailable(_))
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_is_sanitized() {
        let err = LedgerError::StoreUnavailable("disk I/O error at table accounts".into());
        assert!(err.is_fatal());
        assert!(!err.user_message().contains("accounts"));
    }

    #[test]
    fn test_business_errors_are_not_fatal() {
        let err = LedgerError::AlreadyReviewed { id: 3, status: RequestStatus::Accepted };
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "Request #3 was already reviewed (accepted)");
    }

    #[test]
    fn test_rusqlite_error_maps_to_store_unavailable() {
        let err: LedgerError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, LedgerError::StoreUnavailable(_)));
    }
}
