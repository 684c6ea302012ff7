use actix_web::{web, HttpResponse};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::DbPool;
use crate::errors::AppError;
use crate::handlers::products::{default_limit, default_page, parse_price};
use crate::models::inventory_log::NewInventoryLog;
use crate::models::purchase_order::{
    NewPurchaseOrder, NewPurchaseOrderItem, PurchaseOrder, PurchaseOrderItem, PO_STATUS_OPEN,
    PO_STATUS_RECEIVED,
};
use crate::schema::{inventory_logs, products, purchase_order_items, purchase_orders, suppliers};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePurchaseOrderItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Decimal cost as a string, e.g. "4.50"
    pub unit_cost: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePurchaseOrderRequest {
    pub supplier_id: Uuid,
    pub items: Vec<CreatePurchaseOrderItemRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseOrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_cost: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseOrderResponse {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub status: String,
    pub created_at: String,
    pub received_at: Option<String>,
    pub items: Vec<PurchaseOrderItemResponse>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListPurchaseOrdersParams {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListPurchaseOrdersResponse {
    pub items: Vec<PurchaseOrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

fn po_response(po: PurchaseOrder, items: Vec<PurchaseOrderItem>) -> PurchaseOrderResponse {
    PurchaseOrderResponse {
        id: po.id,
        supplier_id: po.supplier_id,
        status: po.status,
        created_at: po.created_at.to_rfc3339(),
        received_at: po.received_at.map(|t| t.to_rfc3339()),
        items: items
            .into_iter()
            .map(|i| PurchaseOrderItemResponse {
                id: i.id,
                product_id: i.product_id,
                quantity: i.quantity,
                unit_cost: i.unit_cost.to_string(),
            })
            .collect(),
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /purchase-orders
///
/// Creates an open purchase order with its item lines in one transaction.
#[utoipa::path(
    post,
    path = "/purchase-orders",
    request_body = CreatePurchaseOrderRequest,
    responses(
        (status = 201, description = "Purchase order created", body = PurchaseOrderResponse),
        (status = 400, description = "No items or non-positive quantity"),
        (status = 404, description = "Supplier or product not found"),
    ),
    tag = "purchase-orders"
)]
pub async fn create_purchase_order(
    pool: web::Data<DbPool>,
    body: web::Json<CreatePurchaseOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    if body.items.is_empty() {
        return Err(AppError::Validation(
            "a purchase order needs at least one item".to_string(),
        ));
    }
    if body.items.iter().any(|i| i.quantity <= 0) {
        return Err(AppError::Validation(
            "item quantities must be positive".to_string(),
        ));
    }

    let result = web::block(move || {
        let mut conn = pool.get()?;

        conn.transaction::<_, AppError, _>(|conn| {
            let supplier_exists: Option<Uuid> = suppliers::table
                .filter(suppliers::id.eq(body.supplier_id))
                .select(suppliers::id)
                .first(conn)
                .optional()?;
            if supplier_exists.is_none() {
                return Err(AppError::NotFound);
            }

            let po_id = Uuid::new_v4();
            let po = diesel::insert_into(purchase_orders::table)
                .values(&NewPurchaseOrder {
                    id: po_id,
                    supplier_id: body.supplier_id,
                    status: PO_STATUS_OPEN.to_string(),
                })
                .returning(PurchaseOrder::as_returning())
                .get_result::<PurchaseOrder>(conn)?;

            let item_rows: Result<Vec<NewPurchaseOrderItem>, AppError> = body
                .items
                .iter()
                .map(|i| {
                    Ok(NewPurchaseOrderItem {
                        id: Uuid::new_v4(),
                        purchase_order_id: po_id,
                        product_id: i.product_id,
                        quantity: i.quantity,
                        unit_cost: parse_price(&i.unit_cost)?,
                    })
                })
                .collect();
            diesel::insert_into(purchase_order_items::table)
                .values(&item_rows?)
                .execute(conn)?;

            let items = purchase_order_items::table
                .filter(purchase_order_items::purchase_order_id.eq(po_id))
                .select(PurchaseOrderItem::as_select())
                .load(conn)?;

            Ok(po_response(po, items))
        })
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(result))
}

/// GET /purchase-orders/{id}
#[utoipa::path(
    get,
    path = "/purchase-orders/{id}",
    params(("id" = Uuid, Path, description = "Purchase order UUID")),
    responses(
        (status = 200, description = "Purchase order found", body = PurchaseOrderResponse),
        (status = 404, description = "Purchase order not found"),
    ),
    tag = "purchase-orders"
)]
pub async fn get_purchase_order(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let po_id = path.into_inner();

    let result = web::block(move || {
        let mut conn = pool.get()?;

        let po = purchase_orders::table
            .filter(purchase_orders::id.eq(po_id))
            .select(PurchaseOrder::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(po) = po else {
            return Ok::<_, AppError>(None);
        };

        let items = purchase_order_items::table
            .filter(purchase_order_items::purchase_order_id.eq(po.id))
            .select(PurchaseOrderItem::as_select())
            .load(&mut conn)?;

        Ok(Some(po_response(po, items)))
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    match result {
        Some(po) => Ok(HttpResponse::Ok().json(po)),
        None => Err(AppError::NotFound),
    }
}

/// GET /purchase-orders
#[utoipa::path(
    get,
    path = "/purchase-orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "Paginated list of purchase orders", body = ListPurchaseOrdersResponse),
    ),
    tag = "purchase-orders"
)]
pub async fn list_purchase_orders(
    pool: web::Data<DbPool>,
    query: web::Query<ListPurchaseOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);
    let offset = (page - 1) * limit;

    let result = web::block(move || {
        let mut conn = pool.get()?;

        let total: i64 = purchase_orders::table.count().get_result(&mut conn)?;

        let rows = purchase_orders::table
            .select(PurchaseOrder::as_select())
            .order(purchase_orders::created_at.desc())
            .limit(limit)
            .offset(offset)
            .load(&mut conn)?;

        let items: Vec<PurchaseOrderResponse> =
            rows.into_iter().map(|po| po_response(po, vec![])).collect();

        Ok::<_, AppError>(ListPurchaseOrdersResponse {
            items,
            total,
            page,
            limit,
        })
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(result))
}

/// POST /purchase-orders/{id}/receive
///
/// Books the delivery in: every item's stock is incremented and audited
/// with a positive-delta inventory log, and the purchase order flips to
/// RECEIVED, all in one transaction. Receiving twice is a conflict.
#[utoipa::path(
    post,
    path = "/purchase-orders/{id}/receive",
    params(("id" = Uuid, Path, description = "Purchase order UUID")),
    responses(
        (status = 200, description = "Stock received", body = PurchaseOrderResponse),
        (status = 404, description = "Purchase order not found"),
        (status = 409, description = "Purchase order already received"),
    ),
    tag = "purchase-orders"
)]
pub async fn receive_purchase_order(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let po_id = path.into_inner();

    let result = web::block(move || {
        let mut conn = pool.get()?;

        conn.transaction::<_, AppError, _>(|conn| {
            let po = purchase_orders::table
                .filter(purchase_orders::id.eq(po_id))
                .select(PurchaseOrder::as_select())
                .for_update()
                .first(conn)
                .optional()?;

            let Some(po) = po else {
                return Err(AppError::NotFound);
            };
            if po.status != PO_STATUS_OPEN {
                return Err(AppError::Conflict(format!(
                    "Purchase order {po_id} was already received"
                )));
            }

            let items = purchase_order_items::table
                .filter(purchase_order_items::purchase_order_id.eq(po_id))
                .select(PurchaseOrderItem::as_select())
                .load(conn)?;

            for item in &items {
                let new_quantity: i32 = diesel::update(
                    products::table.filter(products::id.eq(item.product_id)),
                )
                .set((
                    products::stock_quantity.eq(products::stock_quantity + item.quantity),
                    products::updated_at.eq(diesel::dsl::now),
                ))
                .returning(products::stock_quantity)
                .get_result(conn)?;

                diesel::insert_into(inventory_logs::table)
                    .values(&NewInventoryLog {
                        id: Uuid::new_v4(),
                        product_id: item.product_id,
                        quantity_change: item.quantity,
                        new_quantity,
                        reason: format!("Received purchase order #{po_id}"),
                    })
                    .execute(conn)?;
            }

            let po = diesel::update(purchase_orders::table.filter(purchase_orders::id.eq(po_id)))
                .set((
                    purchase_orders::status.eq(PO_STATUS_RECEIVED),
                    purchase_orders::received_at.eq(diesel::dsl::now),
                ))
                .returning(PurchaseOrder::as_returning())
                .get_result::<PurchaseOrder>(conn)?;

            Ok(po_response(po, items))
        })
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(result))
}
