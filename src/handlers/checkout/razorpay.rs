use std::collections::BTreeMap;

use axum::extract::State;
use serde::Serialize;

use crate::db::AppState;
use crate::error::{AppError, Result, msg};
use crate::extractors::Json;
use crate::models::CreateSessionRequest;
use crate::payments::RazorpayClient;

use super::load_payable_order;

/// Parameters for the browser checkout widget.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RazorpayOrderResponse {
    /// Provider order id (`order_...`)
    pub session_id: String,
    pub amount: i64,
    pub currency: String,
    pub key: String,
    pub prefill: Prefill,
    pub theme: Theme,
}

#[derive(Debug, Serialize)]
pub struct Prefill {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Theme {
    pub color: &'static str,
}

const THEME_COLOR: &str = "#3399cc";

pub async fn create_razorpay_order(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Json<RazorpayOrderResponse>> {
    let config = state
        .razorpay
        .as_ref()
        .ok_or_else(|| AppError::Validation(msg::RAZORPAY_NOT_CONFIGURED.into()))?;

    let order = load_payable_order(&state, &request)?;

    let mut notes = BTreeMap::new();
    notes.insert("orderId".to_string(), order.id.clone());
    notes.insert("orderNumber".to_string(), order.order_number.clone());
    if let Some(code) = &request.metadata.coupon_code {
        notes.insert("couponCode".to_string(), code.clone());
    }
    if let Some(user_id) = &request.metadata.user_id {
        notes.insert("userId".to_string(), user_id.clone());
    }

    let client = RazorpayClient::new(state.http.clone(), config);
    let provider_order = client
        .create_order(request.amount_minor(), &state.currency, &order.id, &notes)
        .await?;

    tracing::info!(
        "Razorpay order {} created for order {}",
        provider_order.id,
        order.order_number
    );

    Ok(Json(RazorpayOrderResponse {
        session_id: provider_order.id,
        amount: provider_order.amount,
        currency: provider_order.currency,
        key: client.key_id().to_string(),
        prefill: Prefill {
            email: request.customer_email.or(order.customer_email),
            contact: request.customer_phone,
        },
        theme: Theme { color: THEME_COLOR },
    }))
}
