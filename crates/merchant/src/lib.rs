//! Merchant service: the merchant directory and the accept/reject decisions
//! merchants make on incoming orders.
//!
//! Order status is never written here. Decisions go through the order
//! service's [`saga::OrderClient`] after the merchant's own preconditions
//! are checked.

pub mod error;
pub mod model;
pub mod service;
pub mod store;

pub use error::{MerchantError, Result};
pub use model::Merchant;
pub use service::MerchantService;
pub use store::{InMemoryMerchantStore, MerchantStore};
