use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Error messages shared by more than one handler.
pub mod msg {
    pub const ORDER_NOT_FOUND: &str = "Order not found";
    pub const ORDER_ALREADY_PAID: &str = "Order is already paid";
    pub const MISSING_ORDER_ID: &str = "orderId is required";
    pub const INVALID_AMOUNT: &str = "amount must be greater than zero";
    pub const AMOUNT_TOO_LARGE: &str = "amount exceeds the maximum allowed";
    pub const PAYMENT_ORDER_MISMATCH: &str = "Payment does not belong to this order";
    pub const INVALID_SIGNATURE: &str = "Invalid signature";
    pub const INVALID_SIGNATURE_FORMAT: &str = "Invalid signature format";
    pub const INVALID_TIMESTAMP_IN_SIGNATURE: &str = "Invalid timestamp in signature";
    pub const INVALID_WEBHOOK_SECRET: &str = "Invalid webhook secret";
    pub const STRIPE_NOT_CONFIGURED: &str = "Stripe is not configured";
    pub const PHONEPE_NOT_CONFIGURED: &str = "PhonePe is not configured";
    pub const RAZORPAY_NOT_CONFIGURED: &str = "Razorpay is not configured";
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Signature error: {0}")]
    Signature(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Payment provider error: {0}")]
    Provider(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Signature(_) | AppError::Json(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Provider(_)
            | AppError::Database(_)
            | AppError::Pool(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (error, details) = match &self {
            AppError::Validation(msg) => (msg.clone(), None),
            AppError::Signature(msg) => (msg.clone(), None),
            AppError::NotFound(msg) => (msg.clone(), None),
            AppError::Provider(msg) => {
                tracing::error!("Payment provider error: {}", msg);
                ("Payment provider error".to_string(), Some(msg.clone()))
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                ("Persistence error".to_string(), None)
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                ("Persistence error".to_string(), None)
            }
            AppError::Json(e) => {
                tracing::warn!("JSON error: {}", e);
                ("Invalid JSON".to_string(), Some(e.to_string()))
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("Internal server error".to_string(), None)
            }
        };

        let body = ErrorResponse { error, details };

        (self.status(), Json(body)).into_response()
    }
}

/// Converts `Ok(None)` lookups into `AppError::NotFound`.
pub trait OptionExt<T> {
    fn or_not_found(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_not_found(self, message: &str) -> Result<T> {
        self.ok_or_else(|| AppError::NotFound(message.to_string()))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
