use axum::extract::State;
use serde::Serialize;

use crate::db::AppState;
use crate::error::{AppError, Result, msg};
use crate::extractors::Json;
use crate::models::CreateSessionRequest;
use crate::payments::{CheckoutSessionParams, StripeClient};

use super::load_payable_order;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StripeSessionResponse {
    pub redirect_url: String,
    pub session_id: String,
}

pub async fn create_stripe_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Json<StripeSessionResponse>> {
    let config = state
        .stripe
        .as_ref()
        .ok_or_else(|| AppError::Validation(msg::STRIPE_NOT_CONFIGURED.into()))?;

    let order = load_payable_order(&state, &request)?;

    let encoded_id = urlencoding::encode(&order.id);
    let success_url = request
        .redirect_url
        .clone()
        .unwrap_or_else(|| format!("{}/order-success?orderId={}", state.base_url, encoded_id));
    let cancel_url = format!("{}/cart?cancelled=true&orderId={}", state.base_url, encoded_id);

    let line_items = request.line_items();
    let customer_email = request
        .customer_email
        .as_deref()
        .or(order.customer_email.as_deref());

    let client = StripeClient::new(state.http.clone(), config);
    let (session_id, redirect_url) = client
        .create_checkout_session(&CheckoutSessionParams {
            order_id: &order.id,
            currency: &state.currency,
            line_items: &line_items,
            customer_email,
            coupon_code: request.metadata.coupon_code.as_deref(),
            user_id: request.metadata.user_id.as_deref(),
            success_url: &success_url,
            cancel_url: &cancel_url,
        })
        .await?;

    tracing::info!(
        "Stripe checkout session {} created for order {} ({} line items)",
        session_id,
        order.order_number,
        line_items.len()
    );

    Ok(Json(StripeSessionResponse {
        redirect_url,
        session_id,
    }))
}
