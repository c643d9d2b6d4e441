// Transfer engine
//
// Executes a single transfer as one atomic unit: validate inside the
// transaction, debit, credit, append the ledger record, commit. Either all
// of it is applied or none of it is. The engine holds no state between
// calls - every execution re-reads current balances inside its own
// transaction, so concurrent transfers can never pass the balance check
// against a stale read.

use chrono::Utc;
use rusqlite::Connection;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::entities::{Account, Transfer};
use crate::error::LedgerError;
use crate::store;

/// A request to move `amount` from one account to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub amount: Decimal,
}

/// Execute a transfer. Exactly one of two outcomes: fully applied, or
/// fully rejected with no state change.
///
/// Preconditions, checked in order inside a single immediate transaction:
/// 1. both accounts exist (`AccountNotFound`)
/// 2. source != destination (`SelfTransfer`)
/// 3. amount > 0 (`InvalidAmount` - the boundary validates this too, but
///    the engine does not trust upstream validation)
/// 4. source balance >= amount (`InsufficientFunds`)
pub fn execute(conn: &mut Connection, request: &TransferRequest) -> Result<Transfer, LedgerError> {
    let from_id = request.from_account_id;
    let to_id = request.to_account_id;

    store::run_atomic(conn, |tx| {
        // Fetch the two rows in ascending-id order regardless of which is
        // source and which is destination, so two opposite-direction
        // transfers between the same pair always touch rows in the same
        // order and cannot deadlock.
        let (first, second) = fetch_ordered(tx, from_id, to_id)?;

        if from_id == to_id {
            return Err(LedgerError::SelfTransfer);
        }

        if request.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }

        let source = if first.id == from_id { &first } else { &second };
        if source.balance < request.amount {
            return Err(LedgerError::InsufficientFunds {
                available: source.balance,
                requested: request.amount,
            });
        }

        // Exact decimal arithmetic, no intermediate rounding. All three
        // writes commit together or roll back together.
        store::adjust_balance(tx, from_id, -request.amount)?;
        store::adjust_balance(tx, to_id, request.amount)?;
        store::create_transfer(tx, from_id, to_id, request.amount, Utc::now())
    })
}

fn fetch_ordered(
    conn: &Connection,
    from_id: Uuid,
    to_id: Uuid,
) -> Result<(Account, Account), LedgerError> {
    let (lo, hi) = if from_id <= to_id {
        (from_id, to_id)
    } else {
        (to_id, from_id)
    };

    let lo_account = store::get_account(conn, lo)?;
    // Self-transfer: one row, reported back twice; the caller rejects it
    // right after existence is established.
    let hi_account = if hi == lo {
        lo_account.clone()
    } else {
        store::get_account(conn, hi)?
    };

    if lo == from_id {
        Ok((lo_account, hi_account))
    } else {
        Ok((hi_account, lo_account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{create_account, create_customer, get_account, list_transfers_for_account};
    use rust_decimal_macros::dec;
    use std::sync::{Arc, Mutex};

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        store::setup_database(&conn).unwrap();
        conn
    }

    fn two_accounts(conn: &Connection, a: Decimal, b: Decimal) -> (Account, Account) {
        let customer = create_customer(conn, "Jane Doe").unwrap();
        let first = create_account(conn, customer.id, a).unwrap();
        let second = create_account(conn, customer.id, b).unwrap();
        (first, second)
    }

    fn request(from: &Account, to: &Account, amount: Decimal) -> TransferRequest {
        TransferRequest {
            from_account_id: from.id,
            to_account_id: to.id,
            amount,
        }
    }

    #[test]
    fn test_successful_transfer_moves_exact_amount() {
        let mut conn = test_conn();
        let (a, b) = two_accounts(&conn, dec!(100.00), dec!(50.00));

        let transfer = execute(&mut conn, &request(&a, &b, dec!(30.00))).unwrap();

        assert_eq!(transfer.from_account_id, a.id);
        assert_eq!(transfer.to_account_id, b.id);
        assert_eq!(transfer.amount, dec!(30.00));

        assert_eq!(get_account(&conn, a.id).unwrap().balance, dec!(70.00));
        assert_eq!(get_account(&conn, b.id).unwrap().balance, dec!(80.00));

        // One ledger entry, visible in both accounts' histories
        let history_a = list_transfers_for_account(&conn, a.id).unwrap();
        let history_b = list_transfers_for_account(&conn, b.id).unwrap();
        assert_eq!(history_a, vec![transfer.clone()]);
        assert_eq!(history_b, vec![transfer]);
    }

    #[test]
    fn test_conservation() {
        let mut conn = test_conn();
        let (a, b) = two_accounts(&conn, dec!(100.00), dec!(50.00));
        let before = dec!(100.00) + dec!(50.00);

        for amount in [dec!(0.01), dec!(12.34), dec!(55.5), dec!(30)] {
            execute(&mut conn, &request(&a, &b, amount)).unwrap();
            let total = get_account(&conn, a.id).unwrap().balance
                + get_account(&conn, b.id).unwrap().balance;
            assert_eq!(total, before);
        }
    }

    #[test]
    fn test_missing_source_account() {
        let mut conn = test_conn();
        let customer = create_customer(&conn, "Jane Doe").unwrap();
        let real = create_account(&conn, customer.id, dec!(100.00)).unwrap();

        let req = TransferRequest {
            from_account_id: Uuid::new_v4(),
            to_account_id: real.id,
            amount: dec!(10.00),
        };
        assert!(matches!(
            execute(&mut conn, &req),
            Err(LedgerError::AccountNotFound)
        ));
    }

    #[test]
    fn test_missing_destination_account() {
        let mut conn = test_conn();
        let customer = create_customer(&conn, "Jane Doe").unwrap();
        let real = create_account(&conn, customer.id, dec!(100.00)).unwrap();

        let req = TransferRequest {
            from_account_id: real.id,
            to_account_id: Uuid::new_v4(),
            amount: dec!(10.00),
        };
        assert!(matches!(
            execute(&mut conn, &req),
            Err(LedgerError::AccountNotFound)
        ));
        assert_eq!(get_account(&conn, real.id).unwrap().balance, dec!(100.00));
    }

    #[test]
    fn test_self_transfer_always_rejected() {
        let mut conn = test_conn();
        let (a, _) = two_accounts(&conn, dec!(100.00), dec!(50.00));

        let req = TransferRequest {
            from_account_id: a.id,
            to_account_id: a.id,
            amount: dec!(10.00),
        };
        assert!(matches!(
            execute(&mut conn, &req),
            Err(LedgerError::SelfTransfer)
        ));
        assert_eq!(get_account(&conn, a.id).unwrap().balance, dec!(100.00));
    }

    #[test]
    fn test_self_transfer_on_missing_account_is_not_found() {
        // Existence is checked before the self-transfer rule
        let mut conn = test_conn();
        let ghost = Uuid::new_v4();
        let req = TransferRequest {
            from_account_id: ghost,
            to_account_id: ghost,
            amount: dec!(10.00),
        };
        assert!(matches!(
            execute(&mut conn, &req),
            Err(LedgerError::AccountNotFound)
        ));
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        let mut conn = test_conn();
        let (a, b) = two_accounts(&conn, dec!(100.00), dec!(50.00));

        for amount in [Decimal::ZERO, dec!(-10.00)] {
            assert!(matches!(
                execute(&mut conn, &request(&a, &b, amount)),
                Err(LedgerError::InvalidAmount)
            ));
        }
        assert_eq!(get_account(&conn, a.id).unwrap().balance, dec!(100.00));
        assert_eq!(get_account(&conn, b.id).unwrap().balance, dec!(50.00));
    }

    #[test]
    fn test_insufficient_funds_boundary() {
        let mut conn = test_conn();
        let (a, b) = two_accounts(&conn, dec!(100.00), dec!(50.00));

        // One cent over the balance fails...
        let err = execute(&mut conn, &request(&a, &b, dec!(100.01))).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert_eq!(get_account(&conn, a.id).unwrap().balance, dec!(100.00));

        // ...the exact balance succeeds and drains the account to zero
        execute(&mut conn, &request(&a, &b, dec!(100.00))).unwrap();
        assert_eq!(get_account(&conn, a.id).unwrap().balance, dec!(0.00));
        assert_eq!(get_account(&conn, b.id).unwrap().balance, dec!(150.00));
    }

    #[test]
    fn test_failed_transfer_leaves_no_trace() {
        let mut conn = test_conn();
        let (a, b) = two_accounts(&conn, dec!(100.00), dec!(50.00));

        let _ = execute(&mut conn, &request(&a, &b, dec!(500.00))).unwrap_err();

        assert_eq!(get_account(&conn, a.id).unwrap().balance, dec!(100.00));
        assert_eq!(get_account(&conn, b.id).unwrap().balance, dec!(50.00));
        assert!(list_transfers_for_account(&conn, a.id).unwrap().is_empty());
        assert!(list_transfers_for_account(&conn, b.id).unwrap().is_empty());
    }

    #[test]
    fn test_opposite_direction_transfers_between_same_pair() {
        let mut conn = test_conn();
        let (a, b) = two_accounts(&conn, dec!(100.00), dec!(100.00));

        execute(&mut conn, &request(&a, &b, dec!(25.00))).unwrap();
        execute(&mut conn, &request(&b, &a, dec!(10.00))).unwrap();

        assert_eq!(get_account(&conn, a.id).unwrap().balance, dec!(85.00));
        assert_eq!(get_account(&conn, b.id).unwrap().balance, dec!(115.00));
    }

    #[test]
    fn test_high_precision_amounts_do_not_drift() {
        let mut conn = test_conn();
        let (a, b) = two_accounts(&conn, dec!(1.00), dec!(1.00));

        let tiny: Decimal = "0.00000000000000000001".parse().unwrap();
        for _ in 0..10 {
            execute(&mut conn, &request(&a, &b, tiny)).unwrap();
        }

        let expected_a: Decimal = "0.99999999999999999990".parse().unwrap();
        let expected_b: Decimal = "1.00000000000000000010".parse().unwrap();
        assert_eq!(get_account(&conn, a.id).unwrap().balance, expected_a);
        assert_eq!(get_account(&conn, b.id).unwrap().balance, expected_b);
    }

    #[test]
    fn test_rolls_back_when_credit_cannot_be_exact() {
        // Destination balance saturates Decimal's precision, so crediting a
        // scale-20 sliver would round to a no-op. The whole transfer must
        // fail - in particular the already-applied source debit - or money
        // would be destroyed.
        let mut conn = test_conn();
        let customer = create_customer(&conn, "Jane Doe").unwrap();
        let source = create_account(&conn, customer.id, dec!(1.00)).unwrap();
        let wide: Decimal = "79228162514264337593543950.33".parse().unwrap();
        let dest = create_account(&conn, customer.id, wide).unwrap();

        let tiny: Decimal = "0.00000000000000000001".parse().unwrap();
        let req = TransferRequest {
            from_account_id: source.id,
            to_account_id: dest.id,
            amount: tiny,
        };

        let err = execute(&mut conn, &req).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        assert_eq!(get_account(&conn, source.id).unwrap().balance, dec!(1.00));
        assert_eq!(get_account(&conn, dest.id).unwrap().balance, wide);
        assert!(list_transfers_for_account(&conn, source.id).unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_drains_cannot_double_spend() {
        // Two concurrent transfers of 60.00 from an account holding 100.00:
        // exactly one commits, the source ends at 40.00, never negative.
        let conn = test_conn();
        let customer = create_customer(&conn, "Jane Doe").unwrap();
        let source = create_account(&conn, customer.id, dec!(100.00)).unwrap();
        let dest_a = create_account(&conn, customer.id, dec!(0.01)).unwrap();
        let dest_b = create_account(&conn, customer.id, dec!(0.01)).unwrap();

        let shared = Arc::new(Mutex::new(conn));
        let mut handles = Vec::new();
        for dest in [dest_a.id, dest_b.id] {
            let shared = Arc::clone(&shared);
            let source_id = source.id;
            handles.push(std::thread::spawn(move || {
                let mut conn = shared.lock().unwrap();
                let req = TransferRequest {
                    from_account_id: source_id,
                    to_account_id: dest,
                    amount: dec!(60.00),
                };
                execute(&mut conn, &req)
            }));
        }

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let failures = results
            .iter()
            .filter(|r| matches!(r, Err(LedgerError::InsufficientFunds { .. })))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(failures, 1);

        let conn = shared.lock().unwrap();
        assert_eq!(get_account(&conn, source.id).unwrap().balance, dec!(40.00));
        assert_eq!(
            list_transfers_for_account(&conn, source.id).unwrap().len(),
            1
        );
    }
}
