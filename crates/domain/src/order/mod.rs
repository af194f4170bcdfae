//! Order records, drafts, and the order status machine.

mod draft;
mod model;
mod state;
mod value_objects;

pub use draft::{LineDraft, OrderDraft, ValidLine, ValidOrder};
pub use model::{Order, OrderLine, StatusChange};
pub use state::{OrderStatus, StatusTransition};
pub use value_objects::{Money, OrderNumber};
