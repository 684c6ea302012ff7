use actix_web::{web, HttpResponse};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::cart::{Cart, CartProduct, SessionCarts};
use crate::db::DbPool;
use crate::domain::order::OrderDraft;
use crate::errors::AppError;
use crate::schema::products;
use crate::AppCheckoutService;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddItemRequest {
    pub product_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetQuantityRequest {
    /// Zero or less removes the line.
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub customer_id: Uuid,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemResponse {
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: String,
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    pub items: Vec<CartItemResponse>,
    pub total: String,
}

fn cart_response(cart: &Cart) -> CartResponse {
    CartResponse {
        items: cart
            .items()
            .iter()
            .map(|i| CartItemResponse {
                product_id: i.product_id,
                product_name: i.product_name.clone(),
                unit_price: i.unit_price.to_string(),
                quantity: i.quantity,
            })
            .collect(),
        total: cart.total().to_string(),
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /carts/{session_id}
#[utoipa::path(
    get,
    path = "/carts/{session_id}",
    params(("session_id" = Uuid, Path, description = "Session UUID")),
    responses(
        (status = 200, description = "Current cart contents and total", body = CartResponse),
    ),
    tag = "cart"
)]
pub async fn get_cart(
    carts: web::Data<SessionCarts>,
    path: web::Path<Uuid>,
) -> HttpResponse {
    let session_id = path.into_inner();
    let view = carts.with_cart(session_id, |cart| cart_response(cart));
    HttpResponse::Ok().json(view)
}

/// POST /carts/{session_id}/items
///
/// Adds one unit of a catalog product to the cart, snapshotting its name
/// and price at add time.
#[utoipa::path(
    post,
    path = "/carts/{session_id}/items",
    params(("session_id" = Uuid, Path, description = "Session UUID")),
    request_body = AddItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 404, description = "Product not found"),
    ),
    tag = "cart"
)]
pub async fn add_item(
    pool: web::Data<DbPool>,
    carts: web::Data<SessionCarts>,
    path: web::Path<Uuid>,
    body: web::Json<AddItemRequest>,
) -> Result<HttpResponse, AppError> {
    let session_id = path.into_inner();
    let product_id = body.into_inner().product_id;

    let view = web::block(move || {
        let mut conn = pool.get()?;

        let row: Option<(Uuid, String, bigdecimal::BigDecimal)> = products::table
            .filter(products::id.eq(product_id))
            .select((products::id, products::name, products::price))
            .first(&mut conn)
            .optional()?;

        let Some((id, name, price)) = row else {
            return Err(AppError::NotFound);
        };

        let product = CartProduct { id, name, price };
        Ok::<_, AppError>(carts.with_cart(session_id, |cart| {
            cart.add_item(&product);
            cart_response(cart)
        }))
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(view))
}

/// PUT /carts/{session_id}/items/{product_id}
#[utoipa::path(
    put,
    path = "/carts/{session_id}/items/{product_id}",
    params(
        ("session_id" = Uuid, Path, description = "Session UUID"),
        ("product_id" = Uuid, Path, description = "Product UUID"),
    ),
    request_body = SetQuantityRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
    ),
    tag = "cart"
)]
pub async fn set_quantity(
    carts: web::Data<SessionCarts>,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<SetQuantityRequest>,
) -> HttpResponse {
    let (session_id, product_id) = path.into_inner();
    let quantity = body.into_inner().quantity;
    let view = carts.with_cart(session_id, |cart| {
        cart.set_quantity(product_id, quantity);
        cart_response(cart)
    });
    HttpResponse::Ok().json(view)
}

/// DELETE /carts/{session_id}/items/{product_id}
#[utoipa::path(
    delete,
    path = "/carts/{session_id}/items/{product_id}",
    params(
        ("session_id" = Uuid, Path, description = "Session UUID"),
        ("product_id" = Uuid, Path, description = "Product UUID"),
    ),
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
    ),
    tag = "cart"
)]
pub async fn remove_item(
    carts: web::Data<SessionCarts>,
    path: web::Path<(Uuid, Uuid)>,
) -> HttpResponse {
    let (session_id, product_id) = path.into_inner();
    let view = carts.with_cart(session_id, |cart| {
        cart.remove_item(product_id);
        cart_response(cart)
    });
    HttpResponse::Ok().json(view)
}

/// DELETE /carts/{session_id}
#[utoipa::path(
    delete,
    path = "/carts/{session_id}",
    params(("session_id" = Uuid, Path, description = "Session UUID")),
    responses(
        (status = 204, description = "Cart cleared"),
    ),
    tag = "cart"
)]
pub async fn clear_cart(carts: web::Data<SessionCarts>, path: web::Path<Uuid>) -> HttpResponse {
    let session_id = path.into_inner();
    carts.with_cart(session_id, |cart| cart.clear());
    HttpResponse::NoContent().finish()
}

/// POST /carts/{session_id}/checkout
///
/// Places an order for the cart's current contents. On success the cart
/// is cleared and the new order id returned; validation failures (empty
/// cart, vanished product, insufficient stock) leave cart and inventory
/// untouched.
#[utoipa::path(
    post,
    path = "/carts/{session_id}/checkout",
    params(("session_id" = Uuid, Path, description = "Session UUID")),
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Order placed", body = CheckoutResponse),
        (status = 400, description = "Empty cart"),
        (status = 409, description = "Insufficient stock or product no longer available"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "cart"
)]
pub async fn checkout(
    service: web::Data<AppCheckoutService>,
    carts: web::Data<SessionCarts>,
    path: web::Path<Uuid>,
    body: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, AppError> {
    let session_id = path.into_inner();
    let body = body.into_inner();

    let order_id = web::block(move || {
        let draft = OrderDraft {
            customer_id: body.customer_id,
            notes: body.notes,
        };
        carts
            .with_cart(session_id, |cart| service.place_order(cart, draft))
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(json!({ "id": order_id })))
}
