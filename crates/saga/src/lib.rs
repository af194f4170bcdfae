//! Order orchestration for the delivery platform.
//!
//! Creating an order is a saga over two independently owned stores:
//! 1. Deduct stock for each line from the inventory ledger
//! 2. Persist the order with its lines
//!
//! A failed step gives back the stock already deducted. Cancellation gives
//! it back too, once the order has moved to `Cancelled`. Every status change
//! is a compare-and-swap on the observed status; `Cancelled` is only set by
//! [`OrderOrchestrator::cancel_order`].

pub mod client;
pub mod error;
pub mod orchestrator;

pub use client::OrderClient;
pub use error::{OrderingError, Result};
pub use orchestrator::{CreatedOrder, OrderOrchestrator};
