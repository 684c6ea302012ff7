use actix_web::HttpResponse;
use diesel::result::DatabaseErrorInformation;
use thiserror::Error;

use crate::domain::errors::CheckoutError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CheckoutError> for AppError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::EmptyCart => AppError::Validation(e.to_string()),
            CheckoutError::ProductNotFound(_) | CheckoutError::InsufficientStock { .. } => {
                AppError::Conflict(e.to_string())
            }
            // Storage detail stays out of the response; operators get the
            // full picture from the log.
            CheckoutError::Persistence(detail) => {
                log::error!("order persistence failed: {detail}");
                AppError::Internal(detail)
            }
        }
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            // Pre-insert existence checks can race; the unique constraint
            // is the arbiter, and losing that race is a conflict, not a
            // server fault.
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                info,
            ) => AppError::Conflict(info.message().to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<r2d2::Error> for AppError {
    fn from(e: r2d2::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl actix_web::ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::NotFound => HttpResponse::NotFound().json(serde_json::json!({
                "error": self.to_string()
            })),
            AppError::Validation(_) => HttpResponse::BadRequest().json(serde_json::json!({
                "error": self.to_string()
            })),
            AppError::Conflict(_) => HttpResponse::Conflict().json(serde_json::json!({
                "error": self.to_string()
            })),
            AppError::Internal(_) => HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Internal server error"
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;
    use uuid::Uuid;

    #[test]
    fn not_found_returns_404() {
        let resp = AppError::NotFound.error_response();
        assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_returns_400() {
        let resp = AppError::Validation("bad".to_string()).error_response();
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn conflict_returns_409() {
        let resp = AppError::Conflict("taken".to_string()).error_response();
        assert_eq!(resp.status(), actix_web::http::StatusCode::CONFLICT);
    }

    #[test]
    fn internal_error_returns_500() {
        let err = AppError::Internal("something went wrong".to_string());
        assert_eq!(
            err.error_response().status(),
            actix_web::http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_error_body_stays_generic() {
        let err = AppError::Internal("connection to 10.0.0.3 refused".to_string());
        let resp = err.error_response();
        assert_eq!(
            resp.status(),
            actix_web::http::StatusCode::INTERNAL_SERVER_ERROR
        );
        // The detail is logged, never returned.
        assert_eq!(err.to_string(), "Internal error: connection to 10.0.0.3 refused");
    }

    #[test]
    fn empty_cart_maps_to_validation() {
        let app_err: AppError = CheckoutError::EmptyCart.into();
        assert!(matches!(app_err, AppError::Validation(_)));
    }

    #[test]
    fn insufficient_stock_maps_to_conflict() {
        let app_err: AppError = CheckoutError::InsufficientStock {
            product_id: Uuid::new_v4(),
            requested: 3,
            available: 1,
        }
        .into();
        assert!(matches!(app_err, AppError::Conflict(_)));
    }

    #[test]
    fn vanished_product_maps_to_conflict() {
        let app_err: AppError = CheckoutError::ProductNotFound(Uuid::new_v4()).into();
        assert!(matches!(app_err, AppError::Conflict(_)));
    }

    #[test]
    fn unique_violation_maps_to_conflict() {
        let db_err = diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key value violates unique constraint".to_string()),
        );
        let app_err: AppError = db_err.into();
        assert!(matches!(app_err, AppError::Conflict(_)));
    }

    #[test]
    fn other_database_errors_map_to_internal() {
        let app_err: AppError = diesel::result::Error::NotFound.into();
        assert!(matches!(app_err, AppError::Internal(_)));
    }

    #[test]
    fn persistence_maps_to_internal() {
        let app_err: AppError = CheckoutError::Persistence("oops".to_string()).into();
        assert!(matches!(app_err, AppError::Internal(_)));
    }

    #[test]
    fn checkout_messages_distinguish_each_case() {
        assert_eq!(
            AppError::from(CheckoutError::EmptyCart).to_string(),
            "Your cart is empty"
        );
        let id = Uuid::new_v4();
        assert_eq!(
            AppError::from(CheckoutError::ProductNotFound(id)).to_string(),
            format!("Product {id} is no longer available")
        );
    }
}
