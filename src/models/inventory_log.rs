use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::inventory_logs;

/// Append-only record of a stock movement. `quantity_change` is signed:
/// negative for sales, positive for receiving and upward adjustments.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = inventory_logs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct InventoryLog {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity_change: i32,
    pub new_quantity: i32,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = inventory_logs)]
pub struct NewInventoryLog {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity_change: i32,
    pub new_quantity: i32,
    pub reason: String,
}
