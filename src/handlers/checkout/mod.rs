//! Hosted payment session creation, one handler per provider.

mod phonepe;
mod razorpay;
mod stripe;

pub use phonepe::*;
pub use razorpay::*;
pub use stripe::*;

use axum::{Router, routing::post};

use crate::db::{AppState, queries};
use crate::error::{AppError, OptionExt, Result, msg};
use crate::models::{CreateSessionRequest, Order};

/// Validate the request and load the order it pays for. Paid orders are
/// refused so a customer cannot be charged twice.
fn load_payable_order(state: &AppState, request: &CreateSessionRequest) -> Result<Order> {
    request.validate()?;

    let conn = state.db.get()?;
    // Callers may pass either the order id or its customer-facing number
    let order = match queries::get_order_by_id(&conn, &request.order_id)? {
        Some(order) => order,
        None => queries::get_order_by_number(&conn, &request.order_id)?
            .or_not_found(msg::ORDER_NOT_FOUND)?,
    };

    if order.is_paid() {
        return Err(AppError::Validation(msg::ORDER_ALREADY_PAID.into()));
    }

    if order.amount_cents != request.amount_minor() {
        // The storefront owns pricing; the session is charged what it asks for.
        tracing::warn!(
            "Checkout amount {} differs from order {} total {}",
            request.amount_minor(),
            order.order_number,
            order.amount_cents
        );
    }

    Ok(order)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/checkout/stripe", post(create_stripe_session))
        .route("/api/checkout/phonepe", post(create_phonepe_session))
        .route("/api/checkout/razorpay", post(create_razorpay_order))
}
