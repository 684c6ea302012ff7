use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{purchase_order_items, purchase_orders};

pub const PO_STATUS_OPEN: &str = "OPEN";
pub const PO_STATUS_RECEIVED: &str = "RECEIVED";

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = purchase_orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub received_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = purchase_orders)]
pub struct NewPurchaseOrder {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = purchase_order_items)]
#[diesel(belongs_to(PurchaseOrder))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PurchaseOrderItem {
    pub id: Uuid,
    pub purchase_order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_cost: BigDecimal,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = purchase_order_items)]
pub struct NewPurchaseOrderItem {
    pub id: Uuid,
    pub purchase_order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_cost: BigDecimal,
}
