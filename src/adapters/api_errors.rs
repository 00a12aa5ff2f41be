use crate::domain::error::MarketError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Newtype over the domain error so the HTTP mapping lives in the adapter
/// layer, not the domain.
pub struct ApiError(pub MarketError);

impl From<MarketError> for ApiError {
    fn from(err: MarketError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self.0 {
            MarketError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                msg.clone(),
            ),
            MarketError::StaleBid { .. } => {
                (StatusCode::CONFLICT, "stale_bid", self.0.to_string())
            }
            MarketError::AuctionNotActive => {
                (StatusCode::CONFLICT, "auction_not_active", self.0.to_string())
            }
            MarketError::PriceMismatch { .. } => {
                (StatusCode::BAD_REQUEST, "price_mismatch", self.0.to_string())
            }
            MarketError::NoPaymentMethod => (
                StatusCode::PAYMENT_REQUIRED,
                "no_payment_method",
                self.0.to_string(),
            ),
            MarketError::ProviderDeclined(_) => (
                StatusCode::PAYMENT_REQUIRED,
                "authorization_declined",
                self.0.to_string(),
            ),
            // Retryable: the caller (or the sweep) re-invokes close.
            MarketError::CaptureFailed(_) => {
                (StatusCode::CONFLICT, "capture_failed", self.0.to_string())
            }
            MarketError::OutsideJoinWindow { .. } => {
                (StatusCode::FORBIDDEN, "outside_join_window", self.0.to_string())
            }
            MarketError::Forbidden(_) => {
                (StatusCode::FORBIDDEN, "forbidden", self.0.to_string())
            }
            MarketError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "not_found", self.0.to_string())
            }
            MarketError::Provider(err) => {
                tracing::error!("provider error: {err}");
                (
                    StatusCode::BAD_GATEWAY,
                    "provider_error",
                    "upstream provider error".to_string(),
                )
            }
            MarketError::Database(err) => {
                tracing::error!("database error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal error".to_string(),
                )
            }
            MarketError::Serialization(err) => {
                tracing::error!("serialization error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error_code": error_code,
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}
