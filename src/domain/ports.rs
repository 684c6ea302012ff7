use uuid::Uuid;

use super::errors::CheckoutError;
use super::order::{
    InventoryLogRecord, OrderDetailRecord, OrderRecord, ProductSnapshot, StockDecrement,
};

/// Storage boundary of the checkout flow.
///
/// `commit_order` must apply the order, its details, the stock decrements
/// and the inventory logs as one atomic unit, and must itself refuse any
/// decrement that would drive a stock counter negative (the service's
/// validation pass is read-then-write and can race with concurrent
/// checkouts).
pub trait CheckoutStore: Send + Sync + 'static {
    fn load_products(&self, ids: &[Uuid]) -> Result<Vec<ProductSnapshot>, CheckoutError>;

    fn commit_order(
        &self,
        order: &OrderRecord,
        details: &[OrderDetailRecord],
        decrements: &[StockDecrement],
        logs: &[InventoryLogRecord],
    ) -> Result<(), CheckoutError>;
}
