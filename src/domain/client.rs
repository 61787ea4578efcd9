//! Client (end-user wallet) domain entity

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Administrative status of a client account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientStatus {
    Active,
    Inactive,
    Blocked,
    PendingDeletion,
}

impl ClientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Blocked => "blocked",
            Self::PendingDeletion => "pending_deletion",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            "blocked" => Self::Blocked,
            "pending_deletion" => Self::PendingDeletion,
            _ => Self::Inactive,
        }
    }
}

/// End-user wallet. Created on first OTP-verified login; never hard-deleted.
///
/// Invariant: `balance >= 0` after any committed transition.
#[derive(Debug, Clone)]
pub struct Client {
    pub id: Uuid,
    pub phone: String,
    pub balance: Decimal,
    pub status: ClientStatus,
    pub created_at: DateTime<Utc>,
}

/// Kind of a wallet audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentKind {
    /// Debit at session start (reservation).
    ChargeReserve,
    /// Additional debit at settlement (overdraft).
    ChargePayment,
    /// Credit at settlement or reconciliation.
    ChargeRefund,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChargeReserve => "charge_reserve",
            Self::ChargePayment => "charge_payment",
            Self::ChargeRefund => "charge_refund",
        }
    }
}

/// Append-only wallet audit row with before/after balances.
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    pub client_id: Uuid,
    pub kind: PaymentKind,
    /// Signed amount: negative for debits, positive for credits.
    pub amount: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub description: String,
    pub charging_session_id: Option<Uuid>,
}
