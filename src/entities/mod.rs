// Ledger entities
//
// Each entity has a stable identity (UUID) assigned at creation and is
// immutable thereafter, except for Account.balance which only the transfer
// engine mutates. Transfers are append-only ledger entries.

pub mod account;
pub mod customer;
pub mod transfer;

pub use account::Account;
pub use customer::Customer;
pub use transfer::Transfer;
