use serde::{Deserialize, Serialize};

/// Declares a numeric identifier newtype.
///
/// Each service owns the rows behind one of these ids, so they are kept as
/// distinct types to prevent passing a merchant id where a rider id belongs.
macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw identifier value.
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw identifier value.
            pub const fn get(&self) -> i64 {
                self.0
            }

            /// Returns true if the value can refer to a stored row (ids start at 1).
            pub const fn is_valid(&self) -> bool {
                self.0 > 0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

numeric_id!(
    /// Identifier of an order, assigned by the order store at creation.
    OrderId
);

numeric_id!(
    /// Identifier of a product row in the inventory ledger.
    ProductId
);

numeric_id!(
    /// Identifier of the customer who placed an order.
    CustomerId
);

numeric_id!(
    /// Identifier of a merchant.
    MerchantId
);

numeric_id!(
    /// Identifier of a rider (courier).
    RiderId
);
