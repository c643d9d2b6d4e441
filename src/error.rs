// Ledger error taxonomy
// Every failure a request can surface maps to exactly one variant here;
// the HTTP layer owns the variant -> status code mapping.

use rust_decimal::Decimal;

/// Top-level error type for the ledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Customer not found")]
    CustomerNotFound,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Transfer not found")]
    TransferNotFound,

    /// Malformed input rejected at the request boundary, before any
    /// transaction begins.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Cannot transfer to the same account")]
    SelfTransfer,

    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        available: Decimal,
        requested: Decimal,
    },

    /// Database failure. Fatal to the request, never retried.
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl LedgerError {
    /// True for lookup misses (404-equivalent failures).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LedgerError::CustomerNotFound
                | LedgerError::AccountNotFound
                | LedgerError::TransferNotFound
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_not_found_classification() {
        assert!(LedgerError::CustomerNotFound.is_not_found());
        assert!(LedgerError::AccountNotFound.is_not_found());
        assert!(LedgerError::TransferNotFound.is_not_found());
        assert!(!LedgerError::SelfTransfer.is_not_found());
        assert!(!LedgerError::InvalidAmount.is_not_found());
    }

    #[test]
    fn test_insufficient_funds_message() {
        let err = LedgerError::InsufficientFunds {
            available: dec!(40.00),
            requested: dec!(60.00),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds: available 40.00, requested 60.00"
        );
    }
}
