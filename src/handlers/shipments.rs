use actix_web::{web, HttpResponse};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::DbPool;
use crate::errors::AppError;
use crate::models::shipment::{NewShipment, Shipment};
use crate::schema::{orders, shipments};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateShipmentRequest {
    pub shipping_provider: Option<String>,
    pub tracking_number: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShipmentResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub shipping_provider: Option<String>,
    pub tracking_number: Option<String>,
    pub dispatched_at: String,
    pub delivered_at: Option<String>,
}

impl From<Shipment> for ShipmentResponse {
    fn from(s: Shipment) -> Self {
        ShipmentResponse {
            id: s.id,
            order_id: s.order_id,
            shipping_provider: s.shipping_provider,
            tracking_number: s.tracking_number,
            dispatched_at: s.dispatched_at.to_rfc3339(),
            delivered_at: s.delivered_at.map(|t| t.to_rfc3339()),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders/{order_id}/shipment
///
/// Dispatches an order. An order has at most one shipment, so a second
/// dispatch is a conflict.
#[utoipa::path(
    post,
    path = "/orders/{order_id}/shipment",
    params(("order_id" = Uuid, Path, description = "Order UUID")),
    request_body = CreateShipmentRequest,
    responses(
        (status = 201, description = "Shipment created", body = ShipmentResponse),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order already has a shipment"),
    ),
    tag = "shipments"
)]
pub async fn create_shipment(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    body: web::Json<CreateShipmentRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let body = body.into_inner();

    let created = web::block(move || {
        let mut conn = pool.get()?;

        conn.transaction::<_, AppError, _>(|conn| {
            let order_exists: Option<Uuid> = orders::table
                .filter(orders::id.eq(order_id))
                .select(orders::id)
                .first(conn)
                .optional()?;
            if order_exists.is_none() {
                return Err(AppError::NotFound);
            }

            let existing: Option<Uuid> = shipments::table
                .filter(shipments::order_id.eq(order_id))
                .select(shipments::id)
                .first(conn)
                .optional()?;
            if existing.is_some() {
                return Err(AppError::Conflict(format!(
                    "Order {order_id} already has a shipment"
                )));
            }

            let shipment = diesel::insert_into(shipments::table)
                .values(&NewShipment {
                    id: Uuid::new_v4(),
                    order_id,
                    shipping_provider: body.shipping_provider,
                    tracking_number: body.tracking_number,
                })
                .returning(Shipment::as_returning())
                .get_result::<Shipment>(conn)?;

            Ok(shipment)
        })
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(ShipmentResponse::from(created)))
}

/// GET /orders/{order_id}/shipment
#[utoipa::path(
    get,
    path = "/orders/{order_id}/shipment",
    params(("order_id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Shipment found", body = ShipmentResponse),
        (status = 404, description = "No shipment for this order"),
    ),
    tag = "shipments"
)]
pub async fn get_shipment(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let shipment = web::block(move || {
        let mut conn = pool.get()?;
        shipments::table
            .filter(shipments::order_id.eq(order_id))
            .select(Shipment::as_select())
            .first(&mut conn)
            .optional()
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    match shipment {
        Some(s) => Ok(HttpResponse::Ok().json(ShipmentResponse::from(s))),
        None => Err(AppError::NotFound),
    }
}

/// POST /shipments/{id}/delivered
#[utoipa::path(
    post,
    path = "/shipments/{id}/delivered",
    params(("id" = Uuid, Path, description = "Shipment UUID")),
    responses(
        (status = 200, description = "Shipment marked delivered", body = ShipmentResponse),
        (status = 404, description = "Shipment not found"),
        (status = 409, description = "Shipment already delivered"),
    ),
    tag = "shipments"
)]
pub async fn mark_delivered(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let shipment_id = path.into_inner();

    let updated = web::block(move || {
        let mut conn = pool.get()?;

        let delivered = diesel::update(
            shipments::table.filter(
                shipments::id
                    .eq(shipment_id)
                    .and(shipments::delivered_at.is_null()),
            ),
        )
        .set(shipments::delivered_at.eq(diesel::dsl::now))
        .returning(Shipment::as_returning())
        .get_result::<Shipment>(&mut conn)
        .optional()?;

        if let Some(s) = delivered {
            return Ok::<_, AppError>(Some(s));
        }

        // Either missing or already delivered; look again to tell them apart.
        let existing = shipments::table
            .filter(shipments::id.eq(shipment_id))
            .select(Shipment::as_select())
            .first(&mut conn)
            .optional()?;
        match existing {
            Some(_) => Err(AppError::Conflict(format!(
                "Shipment {shipment_id} was already delivered"
            ))),
            None => Ok(None),
        }
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    match updated {
        Some(s) => Ok(HttpResponse::Ok().json(ShipmentResponse::from(s))),
        None => Err(AppError::NotFound),
    }
}
