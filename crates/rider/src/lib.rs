//! Rider service for the delivery platform.
//!
//! Riders claim accepted orders, pick them up and deliver them. Each step
//! moves the delivery assignment's sub-status and mirrors it into the order
//! status through [`saga::OrderClient`]. When the order side refuses, the
//! assignment change is undone so the two never disagree.

pub mod delivery;
pub mod directory;
pub mod error;
pub mod model;
pub mod service;

pub use delivery::{DeliveryStore, InMemoryDeliveryStore, NewAssignment, PostgresDeliveryStore};
pub use directory::{InMemoryRiderStore, RiderStore};
pub use error::{Result, RiderError};
pub use model::{DeliveryAssignment, Rider, RiderStatus};
pub use service::RiderService;
