use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Caller-supplied part of a new order; everything else (id, timestamp,
/// total, status) is stamped by the checkout service.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub customer_id: Uuid,
    pub notes: Option<String>,
}

/// Catalog row as seen by the checkout validation pass.
#[derive(Debug, Clone)]
pub struct ProductSnapshot {
    pub id: Uuid,
    pub name: String,
    pub stock_quantity: i32,
}

#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: String,
    pub total_amount: BigDecimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct OrderDetailRecord {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

/// Staged audit entry; `new_quantity` is the stock level after the change
/// as computed from the validation snapshot.
#[derive(Debug, Clone)]
pub struct InventoryLogRecord {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity_change: i32,
    pub new_quantity: i32,
    pub reason: String,
}

#[derive(Debug, Clone, Copy)]
pub struct StockDecrement {
    pub product_id: Uuid,
    pub quantity: i32,
}
