//! Ledger data models.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::{LedgerError, LedgerResult};

/// Account status as set by an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Inactive,
    Blocked,
}

impl AccountStatus {
    pub const ALL: [AccountStatus; 3] = [AccountStatus::Active, AccountStatus::Inactive, AccountStatus::Blocked];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Inactive => "inactive",
            AccountStatus::Blocked => "blocked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Some(AccountStatus::Active),
            "inactive" => Some(AccountStatus::Inactive),
            "blocked" => Some(AccountStatus::Blocked),
            _ => None,
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's balance record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: i64,
    /// Chat identity; unique and stable.
    pub external_id: i64,
    pub display_name: String,
    /// Minor currency units.
    pub balance: i64,
    pub status: AccountStatus,
    pub note: String,
    pub created_at: String,
}

/// What a wager is placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Even,
    Odd,
    /// A single face, 1 through 6.
    Face(u8),
}

impl Selection {
    pub const ALL: [Selection; 8] = [
        Selection::Even,
        Selection::Odd,
        Selection::Face(1),
        Selection::Face(2),
        Selection::Face(3),
        Selection::Face(4),
        Selection::Face(5),
        Selection::Face(6),
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "even" => Some(Selection::Even),
            "odd" => Some(Selection::Odd),
            other => match other.parse::<u8>() {
                Ok(n @ 1..=6) => Some(Selection::Face(n)),
                _ => None,
            },
        }
    }

    pub fn as_token(&self) -> String {
        match self {
            Selection::Even => "even".to_string(),
            Selection::Odd => "odd".to_string(),
            Selection::Face(n) => n.to_string(),
        }
    }

    /// Gross payout multiplier on a win.
    pub fn multiplier(&self) -> i64 {
        match self {
            Selection::Even | Selection::Odd => 2,
            Selection::Face(_) => 6,
        }
    }

    pub fn wins(&self, outcome: u8) -> bool {
        match self {
            Selection::Even => outcome % 2 == 0,
            Selection::Odd => outcome % 2 == 1,
            Selection::Face(n) => *n == outcome,
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Even => write!(f, "even"),
            Selection::Odd => write!(f, "odd"),
            Selection::Face(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WagerResult {
    Win,
    Lose,
}

impl WagerResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            WagerResult::Win => "win",
            WagerResult::Lose => "lose",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "win" => Some(WagerResult::Win),
            "lose" => Some(WagerResult::Lose),
            _ => None,
        }
    }
}

/// Largest amount accepted from chat input or an operator balance edit.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000_000;

/// A committed record and the account balance it left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed<T> {
    pub record: T,
    pub balance: i64,
}

/// A settled wager. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WagerRecord {
    pub id: i64,
    pub account_id: i64,
    pub display_name: String,
    pub stake: i64,
    pub selection: Selection,
    pub outcome: u8,
    pub result: WagerResult,
    /// Net balance effect: `+stake * (multiplier - 1)` or `-stake`.
    pub profit: i64,
    pub created_at: String,
}

/// Payout/funding rail for deposits and withdrawals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// USDT on TRON.
    Trc20,
    /// USDT on Polygon.
    Polygon,
    /// Utopia voucher code.
    Voucher,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [PaymentMethod::Polygon, PaymentMethod::Trc20, PaymentMethod::Voucher];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Trc20 => "trc20",
            PaymentMethod::Polygon => "polygon",
            PaymentMethod::Voucher => "voucher",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "trc20" => Some(PaymentMethod::Trc20),
            "polygon" | "pol" => Some(PaymentMethod::Polygon),
            "voucher" | "utopia" => Some(PaymentMethod::Voucher),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Trc20 => "USDT-TRC20",
            PaymentMethod::Polygon => "USDT-POL",
            PaymentMethod::Voucher => "Utopia voucher",
        }
    }

    /// On-chain methods have a wallet address.
    pub fn is_on_chain(&self) -> bool {
        !matches!(self, PaymentMethod::Voucher)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Deposit,
    Withdrawal,
}

impl RequestKind {
    pub(crate) fn table(&self) -> &'static str {
        match self {
            RequestKind::Deposit => "deposits",
            RequestKind::Withdrawal => "withdrawals",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::Deposit => write!(f, "deposit"),
            RequestKind::Withdrawal => write!(f, "withdrawal"),
        }
    }
}

/// Request lifecycle. `Accepted` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Some(RequestStatus::Pending),
            "accepted" | "accept" => Some(RequestStatus::Accepted),
            "rejected" | "reject" => Some(RequestStatus::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator verdict on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    pub fn status(&self) -> RequestStatus {
        match self {
            Decision::Accept => RequestStatus::Accepted,
            Decision::Reject => RequestStatus::Rejected,
        }
    }
}

/// A deposit or withdrawal request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundsRequest {
    pub id: i64,
    pub kind: RequestKind,
    pub account_id: i64,
    pub display_name: String,
    pub amount: i64,
    pub method: PaymentMethod,
    /// Proof of payment for deposits, destination for withdrawals.
    pub payload: String,
    pub status: RequestStatus,
    pub created_at: String,
    pub reviewed_at: Option<String>,
}

/// Operator-tunable game parameters.
///
/// Read by the wager engine, but the dice draw stays uniform: the weighting
/// is stored and reported only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameLogicConfig {
    pub win_percent: u8,
    pub lose_percent: u8,
    pub randomize: bool,
}

impl GameLogicConfig {
    pub fn new(win_percent: u8, lose_percent: u8, randomize: bool) -> LedgerResult<Self> {
        if u16::from(win_percent) + u16::from(lose_percent) != 100 {
            return Err(LedgerError::ConfigInvariantViolation { win: win_percent, lose: lose_percent });
        }
        Ok(Self { win_percent, lose_percent, randomize })
    }
}

impl Default for GameLogicConfig {
    fn default() -> Self {
        Self { win_percent: 50, lose_percent: 50, randomize: true }
    }
}

/// Destination address per on-chain method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletConfig {
    pub addresses: BTreeMap<PaymentMethod, String>,
}

impl WalletConfig {
    pub fn address(&self, method: PaymentMethod) -> Option<&str> {
        self.addresses.get(&method).map(String::as_str)
    }
}

/// Aggregated wager results for one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub account_id: i64,
    pub display_name: String,
    pub games: i64,
    pub net_profit: i64,
}
