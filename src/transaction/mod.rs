//! Manages the transaction records that make up the ledger.
//!
//! This module defines:
//! - the transaction record model and its settlement status,
//! - the database functions for creating, querying and updating records,
//! - the transactions page and the endpoints behind its entry form, inline
//!   row editing and JSON export.

mod core;
mod create_endpoint;
mod edit_endpoint;
mod export_endpoint;
mod form;
mod transactions_page;
mod view;

pub use core::{
    DEFAULT_TRANSACTION_TYPE, Status, Transaction, TransactionBuilder, TransactionChanges,
    create_transaction_table,
};
pub use create_endpoint::{CreateTransactionState, TransactionForm, create_transaction_endpoint};
pub use edit_endpoint::{
    EditTransactionRowState, UpdateTransactionForm, UpdateTransactionState,
    get_edit_transaction_row, update_transaction_endpoint,
};
pub use export_endpoint::{ExportTransactionsState, export_transactions};
pub use transactions_page::{SearchParams, TransactionsViewState, get_transactions_page};

#[cfg(test)]
pub use core::{
    create_transaction, get_all_transactions, get_matching_transactions, get_transaction,
    get_transaction_number, update_transaction,
};
