use axum::extract::State;
use serde::Serialize;

use crate::db::AppState;
use crate::error::{AppError, Result, msg};
use crate::extractors::Json;
use crate::models::CreateSessionRequest;
use crate::payments::{PayParams, PhonePeClient};

use super::load_payable_order;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhonePeSessionResponse {
    pub redirect_url: String,
}

pub async fn create_phonepe_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Json<PhonePeSessionResponse>> {
    let config = state
        .phonepe
        .as_ref()
        .ok_or_else(|| AppError::Validation(msg::PHONEPE_NOT_CONFIGURED.into()))?;

    let order = load_payable_order(&state, &request)?;

    // The callback correlates on the order number
    let merchant_transaction_id = order.order_number.as_str();
    let merchant_user_id = request
        .metadata
        .user_id
        .clone()
        .unwrap_or_else(|| format!("GUEST_{}", order.id));

    let redirect_url = request.redirect_url.clone().unwrap_or_else(|| {
        format!(
            "{}/order-success?orderNumber={}",
            state.base_url,
            urlencoding::encode(merchant_transaction_id)
        )
    });
    let callback_url = format!("{}/api/phonepe/callback", state.base_url);

    let client = PhonePeClient::new(state.http.clone(), config);
    let pay_page_url = client
        .create_payment(&PayParams {
            merchant_transaction_id,
            merchant_user_id: &merchant_user_id,
            amount_minor: request.amount_minor(),
            redirect_url: &redirect_url,
            callback_url: &callback_url,
            mobile_number: request.customer_phone.as_deref(),
        })
        .await?;

    tracing::info!(
        "PhonePe payment initiated for order {} ({} minor units)",
        order.order_number,
        request.amount_minor()
    );

    Ok(Json(PhonePeSessionResponse {
        redirect_url: pay_page_url,
    }))
}
