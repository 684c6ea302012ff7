use actix_web::{web, HttpResponse};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::DbPool;
use crate::errors::AppError;
use crate::handlers::products::{default_limit, default_page};
use crate::models::order::Order;
use crate::models::order_detail::OrderDetail;
use crate::schema::{order_details, orders};

// ── Response DTOs ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetailResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: String,
    pub total_amount: String,
    pub notes: Option<String>,
    pub created_at: String,
    pub details: Vec<OrderDetailResponse>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListOrdersParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

fn order_response(order: Order, details: Vec<OrderDetailResponse>) -> OrderResponse {
    OrderResponse {
        id: order.id,
        customer_id: order.customer_id,
        status: order.status,
        total_amount: order.total_amount.to_string(),
        notes: order.notes,
        created_at: order.created_at.to_rfc3339(),
        details,
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /orders/{id}
///
/// Returns the order together with its detail lines.
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let result = web::block(move || {
        let mut conn = pool.get()?;

        let order = orders::table
            .filter(orders::id.eq(order_id))
            .select(Order::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(order) = order else {
            return Ok::<_, AppError>(None);
        };

        let details = order_details::table
            .filter(order_details::order_id.eq(order.id))
            .select(OrderDetail::as_select())
            .load(&mut conn)?;

        let detail_responses: Vec<OrderDetailResponse> = details
            .into_iter()
            .map(|d| OrderDetailResponse {
                id: d.id,
                product_id: d.product_id,
                quantity: d.quantity,
                unit_price: d.unit_price.to_string(),
            })
            .collect();

        Ok(Some(order_response(order, detail_responses)))
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    match result {
        Some(order) => Ok(HttpResponse::Ok().json(order)),
        None => Err(AppError::NotFound),
    }
}

/// GET /orders
///
/// Returns a paginated list of orders (without their detail lines).
/// Use `page` (1-based) and `limit` to control pagination.
#[utoipa::path(
    get,
    path = "/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    pool: web::Data<DbPool>,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);
    let offset = (page - 1) * limit;

    let result = web::block(move || {
        let mut conn = pool.get()?;

        let total: i64 = orders::table.count().get_result(&mut conn)?;

        let rows = orders::table
            .select(Order::as_select())
            .order(orders::created_at.desc())
            .limit(limit)
            .offset(offset)
            .load(&mut conn)?;

        let items: Vec<OrderResponse> = rows
            .into_iter()
            .map(|o| order_response(o, vec![]))
            .collect();

        Ok::<_, AppError>(ListOrdersResponse {
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
