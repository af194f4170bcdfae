//! Types shared by every service of the delivery platform.
//!
//! - numeric identifiers for the entities each service owns
//! - the error taxonomy used at service boundaries
//! - page requests and paged results for list operations

pub mod error;
pub mod paging;
pub mod types;

pub use error::{Classify, ErrorKind, ServiceError};
pub use paging::{Page, PageRequest, PagingError};
pub use types::{CustomerId, MerchantId, OrderId, ProductId, RiderId};
