// Transfer entity

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A completed balance movement between two accounts.
///
/// Immutable once created - the transfer table is the append-only ledger.
/// Invariants: `from_account_id != to_account_id`, `amount > 0`, and the
/// amount did not exceed the source balance at execution time. The
/// timestamp is the commit time, timezone-aware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Stable identity - never changes
    pub id: Uuid,

    /// Source account (debited)
    pub from_account_id: Uuid,

    /// Destination account (credited)
    pub to_account_id: Uuid,

    /// Amount moved, exact decimal, > 0
    pub amount: Decimal,

    /// Commit time
    pub timestamp: DateTime<Utc>,
}

impl Transfer {
    /// Create a new transfer record with a fresh UUID. The engine has
    /// already validated the invariants before calling this.
    pub fn new(
        from_account_id: Uuid,
        to_account_id: Uuid,
        amount: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            from_account_id,
            to_account_id,
            amount,
            timestamp,
        }
    }
}
