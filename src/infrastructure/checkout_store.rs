use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::CheckoutError;
use crate::domain::order::{
    InventoryLogRecord, OrderDetailRecord, OrderRecord, ProductSnapshot, StockDecrement,
};
use crate::domain::ports::CheckoutStore;
use crate::models::inventory_log::NewInventoryLog;
use crate::models::order::NewOrder;
use crate::models::order_detail::NewOrderDetail;
use crate::schema::{inventory_logs, order_details, orders, products};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for CheckoutError {
    fn from(e: diesel::result::Error) -> Self {
        CheckoutError::Persistence(e.to_string())
    }
}

impl From<r2d2::Error> for CheckoutError {
    fn from(e: r2d2::Error) -> Self {
        CheckoutError::Persistence(e.to_string())
    }
}

// ── Store ────────────────────────────────────────────────────────────────────

pub struct DieselCheckoutStore {
    pool: DbPool,
}

impl DieselCheckoutStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CheckoutStore for DieselCheckoutStore {
    fn load_products(&self, ids: &[Uuid]) -> Result<Vec<ProductSnapshot>, CheckoutError> {
        let mut conn = self.pool.get()?;

        let rows: Vec<(Uuid, String, i32)> = products::table
            .filter(products::id.eq_any(ids))
            .select((products::id, products::name, products::stock_quantity))
            .load(&mut conn)?;

        Ok(rows
            .into_iter()
            .map(|(id, name, stock_quantity)| ProductSnapshot {
                id,
                name,
                stock_quantity,
            })
            .collect())
    }

    fn commit_order(
        &self,
        order: &OrderRecord,
        details: &[OrderDetailRecord],
        decrements: &[StockDecrement],
        logs: &[InventoryLogRecord],
    ) -> Result<(), CheckoutError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, CheckoutError, _>(|conn| {
            diesel::insert_into(orders::table)
                .values(&NewOrder {
                    id: order.id,
                    customer_id: order.customer_id,
                    status: order.status.clone(),
                    total_amount: order.total_amount.clone(),
                    notes: order.notes.clone(),
                    created_at: order.created_at,
                })
                .execute(conn)?;

            let detail_rows: Vec<NewOrderDetail> = details
                .iter()
                .map(|d| NewOrderDetail {
                    id: d.id,
                    order_id: d.order_id,
                    product_id: d.product_id,
                    quantity: d.quantity,
                    unit_price: d.unit_price.clone(),
                })
                .collect();
            diesel::insert_into(order_details::table)
                .values(&detail_rows)
                .execute(conn)?;

            // The service already validated stock from a snapshot, but that
            // read can race with a concurrent checkout. The `ge` guard makes
            // the decrement conditional at the row level: zero affected rows
            // means the stock moved under us, and the whole transaction
            // rolls back.
            for d in decrements {
                let updated = diesel::update(
                    products::table.filter(
                        products::id
                            .eq(d.product_id)
                            .and(products::stock_quantity.ge(d.quantity)),
                    ),
                )
                .set((
                    products::stock_quantity.eq(products::stock_quantity - d.quantity),
                    products::updated_at.eq(diesel::dsl::now),
                ))
                .execute(conn)?;

                if updated == 0 {
                    let available: Option<i32> = products::table
                        .filter(products::id.eq(d.product_id))
                        .select(products::stock_quantity)
                        .first(conn)
                        .optional()?;
                    return Err(match available {
                        Some(available) => CheckoutError::InsufficientStock {
                            product_id: d.product_id,
                            requested: d.quantity,
                            available,
                        },
                        None => CheckoutError::ProductNotFound(d.product_id),
                    });
                }
            }

            let log_rows: Vec<NewInventoryLog> = logs
                .iter()
                .map(|l| NewInventoryLog {
                    id: l.id,
                    product_id: l.product_id,
                    quantity_change: l.quantity_change,
                    new_quantity: l.new_quantity,
                    reason: l.reason.clone(),
                })
                .collect();
            diesel::insert_into(inventory_logs::table)
                .values(&log_rows)
                .execute(conn)?;

            Ok(())
        })
    }
}
