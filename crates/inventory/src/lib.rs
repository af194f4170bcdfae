//! Inventory ledger for the delivery platform.
//!
//! The ledger owns the stock count of every product. Deduction holds an
//! exclusive row lock for the whole read-check-write so that two orders can
//! never both observe the same sufficient stock. Restoration is a single
//! atomic increment and is the compensating action of the order saga.

pub mod error;
pub mod item;
pub mod ledger;
pub mod memory;
pub mod postgres;

pub use common::ProductId;
pub use error::{InventoryError, Result};
pub use item::InventoryItem;
pub use ledger::StockLedger;
pub use memory::InMemoryStockLedger;
pub use postgres::PostgresStockLedger;
