//! Order domain for the delivery platform.
//!
//! This crate provides:
//! - the order status machine and the delivery sub-status machine, where a
//!   status change is only representable after it has been checked
//! - order drafts, their validation and total computation
//! - the `OrderStore` trait with in-memory and PostgreSQL implementations

pub mod delivery;
pub mod error;
pub mod order;
pub mod store;

pub use delivery::{DeliveryStatus, DeliveryTransition};
pub use error::{ParseStatusError, Result, StoreError, TransitionError, ValidationError};
pub use order::{
    LineDraft, Money, Order, OrderDraft, OrderLine, OrderNumber, OrderStatus, StatusChange,
    StatusTransition, ValidLine, ValidOrder,
};
pub use store::{InMemoryOrderStore, OrderFilter, OrderStore, PostgresOrderStore};
