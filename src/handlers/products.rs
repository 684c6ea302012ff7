use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::DbPool;
use crate::errors::AppError;
use crate::models::inventory_log::{InventoryLog, NewInventoryLog};
use crate::models::product::{NewProduct, Product};
use crate::schema::{inventory_logs, products};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    /// Decimal price as a string to avoid floating-point issues, e.g. "9.99"
    pub price: String,
    #[serde(default)]
    pub stock_quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: String,
    pub price: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdjustStockRequest {
    /// Signed delta; positive restocks, negative removes stock.
    pub quantity_change: i32,
    pub reason: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub price: String,
    pub stock_quantity: i32,
    pub created_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryLogResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity_change: i32,
    pub new_quantity: i32,
    pub reason: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

pub(crate) fn default_page() -> i64 {
    1
}

pub(crate) fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListInventoryLogsResponse {
    pub items: Vec<InventoryLogResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListProductsResponse {
    pub items: Vec<ProductResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        ProductResponse {
            id: p.id,
            name: p.name,
            price: p.price.to_string(),
            stock_quantity: p.stock_quantity,
            created_at: p.created_at.to_rfc3339(),
        }
    }
}

pub(crate) fn parse_price(raw: &str) -> Result<BigDecimal, AppError> {
    BigDecimal::from_str(raw)
        .map_err(|e| AppError::Validation(format!("Invalid price '{raw}': {e}")))
}

/// Checks an adjustment request and returns the negated delta used as the
/// row-level stock guard. `i32::MIN` has no negation, so it is rejected
/// here along with zero and blank reasons.
fn validate_adjustment(quantity_change: i32, reason: &str) -> Result<i32, AppError> {
    if quantity_change == 0 {
        return Err(AppError::Validation(
            "quantity_change must be non-zero".to_string(),
        ));
    }
    let Some(negated) = quantity_change.checked_neg() else {
        return Err(AppError::Validation(
            "quantity_change is out of range".to_string(),
        ));
    };
    if reason.trim().is_empty() {
        return Err(AppError::Validation("reason must not be empty".to_string()));
    }
    Ok(negated)
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /products
#[utoipa::path(
    post,
    path = "/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid price or negative stock"),
    ),
    tag = "products"
)]
pub async fn create_product(
    pool: web::Data<DbPool>,
    body: web::Json<CreateProductRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    if body.stock_quantity < 0 {
        return Err(AppError::Validation(
            "stock_quantity must not be negative".to_string(),
        ));
    }
    let price = parse_price(&body.price)?;

    let created = web::block(move || {
        let mut conn = pool.get()?;
        let new_product = NewProduct {
            id: Uuid::new_v4(),
            name: body.name,
            price,
            stock_quantity: body.stock_quantity,
        };
        diesel::insert_into(products::table)
            .values(&new_product)
            .returning(Product::as_returning())
            .get_result::<Product>(&mut conn)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(ProductResponse::from(created)))
}

/// GET /products/{id}
#[utoipa::path(
    get,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, description = "Product not found"),
    ),
    tag = "products"
)]
pub async fn get_product(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();

    let product = web::block(move || {
        let mut conn = pool.get()?;
        products::table
            .filter(products::id.eq(product_id))
            .select(Product::as_select())
            .first(&mut conn)
            .optional()
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    match product {
        Some(p) => Ok(HttpResponse::Ok().json(ProductResponse::from(p))),
        None => Err(AppError::NotFound),
    }
}

/// GET /products
#[utoipa::path(
    get,
    path = "/products",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "Paginated list of products", body = ListProductsResponse),
    ),
    tag = "products"
)]
pub async fn list_products(
    pool: web::Data<DbPool>,
    query: web::Query<ListParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);
    let offset = (page - 1) * limit;

    let result = web::block(move || {
        let mut conn = pool.get()?;

        let total: i64 = products::table.count().get_result(&mut conn)?;

        let rows = products::table
            .select(Product::as_select())
            .order(products::name.asc())
            .limit(limit)
            .offset(offset)
            .load(&mut conn)?;

        Ok::<_, AppError>(ListProductsResponse {
            items: rows.into_iter().map(ProductResponse::from).collect(),
            total,
            page,
            limit,
        })
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(result))
}

/// PUT /products/{id}
#[utoipa::path(
    put,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product UUID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 404, description = "Product not found"),
    ),
    tag = "products"
)]
pub async fn update_product(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateProductRequest>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();
    let body = body.into_inner();
    let price = parse_price(&body.price)?;

    let updated = web::block(move || {
        let mut conn = pool.get()?;
        diesel::update(products::table.filter(products::id.eq(product_id)))
            .set((
                products::name.eq(body.name),
                products::price.eq(price),
                products::updated_at.eq(diesel::dsl::now),
            ))
            .returning(Product::as_returning())
            .get_result::<Product>(&mut conn)
            .optional()
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    match updated {
        Some(p) => Ok(HttpResponse::Ok().json(ProductResponse::from(p))),
        None => Err(AppError::NotFound),
    }
}

/// POST /products/{id}/stock-adjustments
///
/// Manual stock correction. The adjustment and its audit log are written
/// in one transaction, and an adjustment that would drive the counter
/// negative is refused.
#[utoipa::path(
    post,
    path = "/products/{id}/stock-adjustments",
    params(("id" = Uuid, Path, description = "Product UUID")),
    request_body = AdjustStockRequest,
    responses(
        (status = 200, description = "Stock adjusted", body = ProductResponse),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Adjustment would make stock negative"),
    ),
    tag = "products"
)]
pub async fn adjust_stock(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    body: web::Json<AdjustStockRequest>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();
    let body = body.into_inner();
    let negated_delta = validate_adjustment(body.quantity_change, &body.reason)?;

    let product = web::block(move || {
        let mut conn = pool.get()?;

        conn.transaction::<_, AppError, _>(|conn| {
            let exists: Option<Uuid> = products::table
                .filter(products::id.eq(product_id))
                .select(products::id)
                .first(conn)
                .optional()?;
            if exists.is_none() {
                return Err(AppError::NotFound);
            }

            // stock + delta >= 0, enforced at the row so concurrent
            // adjustments cannot slip below zero.
            let updated: Option<Product> = diesel::update(
                products::table.filter(
                    products::id
                        .eq(product_id)
                        .and(products::stock_quantity.ge(negated_delta)),
                ),
            )
            .set((
                products::stock_quantity.eq(products::stock_quantity + body.quantity_change),
                products::updated_at.eq(diesel::dsl::now),
            ))
            .returning(Product::as_returning())
            .get_result(conn)
            .optional()?;

            let Some(product) = updated else {
                return Err(AppError::Conflict(
                    "Adjustment would make stock negative".to_string(),
                ));
            };

            diesel::insert_into(inventory_logs::table)
                .values(&NewInventoryLog {
                    id: Uuid::new_v4(),
                    product_id,
                    quantity_change: body.quantity_change,
                    new_quantity: product.stock_quantity,
                    reason: body.reason,
                })
                .execute(conn)?;

            Ok(product)
        })
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

/// GET /products/{id}/inventory-logs
#[utoipa::path(
    get,
    path = "/products/{id}/inventory-logs",
    params(("id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 200, description = "Audit trail for the product, newest first", body = ListInventoryLogsResponse),
        (status = 404, description = "Product not found"),
    ),
    tag = "products"
)]
pub async fn list_inventory_logs(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();

    let logs = web::block(move || {
        let mut conn = pool.get()?;

        let exists: Option<Uuid> = products::table
            .filter(products::id.eq(product_id))
            .select(products::id)
            .first(&mut conn)
            .optional()?;
        if exists.is_none() {
            return Err(AppError::NotFound);
        }

        let rows = inventory_logs::table
            .filter(inventory_logs::product_id.eq(product_id))
            .select(InventoryLog::as_select())
            .order(inventory_logs::created_at.desc())
            .load(&mut conn)?;

        Ok::<_, AppError>(rows)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    let items: Vec<InventoryLogResponse> = logs
        .into_iter()
        .map(|l| InventoryLogResponse {
            id: l.id,
            product_id: l.product_id,
            quantity_change: l.quantity_change,
            new_quantity: l.new_quantity,
            reason: l.reason,
            created_at: l.created_at.to_rfc3339(),
        })
        .collect();

    Ok(HttpResponse::Ok().json(ListInventoryLogsResponse { items }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjustment_delta_of_zero_is_rejected() {
        let err = validate_adjustment(0, "stocktake").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn adjustment_delta_without_a_negation_is_rejected() {
        let err = validate_adjustment(i32::MIN, "stocktake").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn adjustment_with_blank_reason_is_rejected() {
        let err = validate_adjustment(5, "   ").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn valid_adjustment_returns_the_stock_guard_bound() {
        assert_eq!(validate_adjustment(-3, "damaged in transit").unwrap(), 3);
        assert_eq!(validate_adjustment(10, "stocktake").unwrap(), -10);
    }
}
