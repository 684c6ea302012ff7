use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::orders;

/// Status stamped on every order at placement. Orders are immutable after
/// creation, so no other status is ever written.
pub const STATUS_PENDING_CONFIRMATION: &str = "PENDING_CONFIRMATION";

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: String,
    pub total_amount: BigDecimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrder {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: String,
    pub total_amount: BigDecimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
