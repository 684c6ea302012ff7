use actix_web::{web, HttpResponse};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::DbPool;
use crate::errors::AppError;
use crate::handlers::products::{default_limit, default_page};
use crate::models::supplier::{NewSupplier, Supplier};
use crate::schema::suppliers;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct SupplierRequest {
    pub name: String,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SupplierResponse {
    pub id: Uuid,
    pub name: String,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListSuppliersParams {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListSuppliersResponse {
    pub items: Vec<SupplierResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

impl From<Supplier> for SupplierResponse {
    fn from(s: Supplier) -> Self {
        SupplierResponse {
            id: s.id,
            name: s.name,
            contact_email: s.contact_email,
            phone: s.phone,
            created_at: s.created_at.to_rfc3339(),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /suppliers
#[utoipa::path(
    post,
    path = "/suppliers",
    request_body = SupplierRequest,
    responses(
        (status = 201, description = "Supplier created", body = SupplierResponse),
        (status = 400, description = "Empty supplier name"),
    ),
    tag = "suppliers"
)]
pub async fn create_supplier(
    pool: web::Data<DbPool>,
    body: web::Json<SupplierRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    if body.name.trim().is_empty() {
        return Err(AppError::Validation("name must not be empty".to_string()));
    }

    let created = web::block(move || {
        let mut conn = pool.get()?;
        diesel::insert_into(suppliers::table)
            .values(&NewSupplier {
                id: Uuid::new_v4(),
                name: body.name,
                contact_email: body.contact_email,
                phone: body.phone,
            })
            .returning(Supplier::as_returning())
            .get_result::<Supplier>(&mut conn)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(SupplierResponse::from(created)))
}

/// GET /suppliers/{id}
#[utoipa::path(
    get,
    path = "/suppliers/{id}",
    params(("id" = Uuid, Path, description = "Supplier UUID")),
    responses(
        (status = 200, description = "Supplier found", body = SupplierResponse),
        (status = 404, description = "Supplier not found"),
    ),
    tag = "suppliers"
)]
pub async fn get_supplier(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let supplier_id = path.into_inner();

    let supplier = web::block(move || {
        let mut conn = pool.get()?;
        suppliers::table
            .filter(suppliers::id.eq(supplier_id))
            .select(Supplier::as_select())
            .first(&mut conn)
            .optional()
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    match supplier {
        Some(s) => Ok(HttpResponse::Ok().json(SupplierResponse::from(s))),
        None => Err(AppError::NotFound),
    }
}

/// GET /suppliers
#[utoipa::path(
    get,
    path = "/suppliers",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "Paginated list of suppliers", body = ListSuppliersResponse),
    ),
    tag = "suppliers"
)]
pub async fn list_suppliers(
    pool: web::Data<DbPool>,
    query: web::Query<ListSuppliersParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);
    let offset = (page - 1) * limit;

    let result = web::block(move || {
        let mut conn = pool.get()?;

        let total: i64 = suppliers::table.count().get_result(&mut conn)?;

        let rows = suppliers::table
            .select(Supplier::as_select())
            .order(suppliers::name.asc())
            .limit(limit)
            .offset(offset)
            .load(&mut conn)?;

        Ok::<_, AppError>(ListSuppliersResponse {
            items: rows.into_iter().map(SupplierResponse::from).collect(),
            total,
            page,
            limit,
        })
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(result))
}

/// PUT /suppliers/{id}
#[utoipa::path(
    put,
    path = "/suppliers/{id}",
    params(("id" = Uuid, Path, description = "Supplier UUID")),
    request_body = SupplierRequest,
    responses(
        (status = 200, description = "Supplier updated", body = SupplierResponse),
        (status = 404, description = "Supplier not found"),
    ),
    tag = "suppliers"
)]
pub async fn update_supplier(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    body: web::Json<SupplierRequest>,
) -> Result<HttpResponse, AppError> {
    let supplier_id = path.into_inner();
    let body = body.into_inner();
    if body.name.trim().is_empty() {
        return Err(AppError::Validation("name must not be empty".to_string()));
    }

    let updated = web::block(move || {
        let mut conn = pool.get()?;
        diesel::update(suppliers::table.filter(suppliers::id.eq(supplier_id)))
            .set((
                suppliers::name.eq(body.name),
                suppliers::contact_email.eq(body.contact_email),
                suppliers::phone.eq(body.phone),
            ))
            .returning(Supplier::as_returning())
            .get_result::<Supplier>(&mut conn)
            .optional()
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    match updated {
        Some(s) => Ok(HttpResponse::Ok().json(SupplierResponse::from(s))),
        None => Err(AppError::NotFound),
    }
}
