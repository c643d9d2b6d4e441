// Bank Ledger - Core Library
// Exposes all modules for use in the API server and tests

pub mod api;
pub mod engine;
pub mod entities;
pub mod error;
pub mod store;
pub mod validation;

// Re-export commonly used types
pub use api::{router, AppState};
pub use engine::{execute as execute_transfer, TransferRequest};
pub use entities::{Account, Customer, Transfer};
pub use error::LedgerError;
pub use store::{
    adjust_balance, create_account, create_customer, create_transfer, get_account, get_customer,
    get_transfer, list_transfers_for_account, run_atomic, setup_database,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
