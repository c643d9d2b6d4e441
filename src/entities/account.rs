// Account entity

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A customer's account.
///
/// The balance is an exact decimal - never binary floating point - so that
/// repeated transfers conserve money to the last digit. Invariant: the
/// balance is never negative in any committed state. Only the transfer
/// engine and the store's `adjust_balance` touch it after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Stable identity - never changes
    pub id: Uuid,

    /// Owning customer (a customer can hold many accounts)
    pub customer_id: Uuid,

    /// Current balance, exact decimal, >= 0
    pub balance: Decimal,
}

impl Account {
    /// Create a new account with a fresh UUID and an opening balance.
    /// The caller has already validated that the balance is positive.
    pub fn new(customer_id: Uuid, balance: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            balance,
        }
    }
}
