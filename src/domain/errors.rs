use thiserror::Error;
use uuid::Uuid;

/// Failure modes of order placement. The first three are pre-commit
/// validation rejections with zero side effects; only `Persistence` can
/// occur after writes have been attempted.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Product {0} is no longer available")]
    ProductNotFound(Uuid),

    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error("Failed to save the order: {0}")]
    Persistence(String),
}
