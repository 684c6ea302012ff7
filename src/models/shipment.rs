use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::shipments;

// order_id is unique: an order has at most one shipment.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = shipments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Shipment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub shipping_provider: Option<String>,
    pub tracking_number: Option<String>,
    pub dispatched_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = shipments)]
pub struct NewShipment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub shipping_provider: Option<String>,
    pub tracking_number: Option<String>,
}
