use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::AppState;
use crate::error::{AppError, Result, msg};
use crate::extractors::Json;
use crate::payments::{PaymentProvider, RazorpayClient};

use super::common::{OrderRef, PaymentNotice, PaymentUpdate, reconcile};

/// Values the checkout widget hands back to the browser after payment.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    #[serde(default)]
    pub provider_order_id: String,
    #[serde(default)]
    pub provider_payment_id: String,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub order_id: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyPaymentResponse {
    pub success: bool,
}

/// Verify the client-side checkout signature and mark the order paid.
/// The signature is checked before anything is read from the store.
///
/// The signature only covers the provider ids, so the provider order is
/// fetched and its `receipt` must name the order being paid.
pub async fn verify_razorpay_payment(
    State(state): State<AppState>,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<VerifyPaymentResponse>> {
    let config = state
        .razorpay
        .as_ref()
        .ok_or_else(|| AppError::Validation(msg::RAZORPAY_NOT_CONFIGURED.into()))?;

    if request.provider_order_id.is_empty()
        || request.provider_payment_id.is_empty()
        || request.signature.is_empty()
    {
        return Err(AppError::Validation(
            "providerOrderId, providerPaymentId and signature are required".into(),
        ));
    }
    if request.order_id.is_empty() {
        return Err(AppError::Validation(msg::MISSING_ORDER_ID.into()));
    }

    let client = RazorpayClient::new(state.http.clone(), config);
    if !client.verify_payment_signature(
        &request.provider_order_id,
        &request.provider_payment_id,
        &request.signature,
    )? {
        tracing::warn!(
            "Razorpay signature mismatch for order {} (provider order {})",
            request.order_id,
            request.provider_order_id
        );
        return Err(AppError::Signature(msg::INVALID_SIGNATURE.into()));
    }

    let provider_order = client.fetch_order(&request.provider_order_id).await?;
    if provider_order.receipt.as_deref() != Some(request.order_id.as_str()) {
        tracing::warn!(
            "Razorpay order {} was created for {:?}, not order {}",
            provider_order.id,
            provider_order.receipt,
            request.order_id
        );
        return Err(AppError::Signature(msg::PAYMENT_ORDER_MISMATCH.into()));
    }

    let notice = PaymentNotice {
        order: OrderRef::Id(request.order_id),
        update: PaymentUpdate::Paid {
            payment_id: request.provider_payment_id.clone(),
        },
        event_id: Some(request.provider_payment_id),
        amount_minor: Some(provider_order.amount),
    };
    reconcile(&state, PaymentProvider::Razorpay.as_str(), &notice)?;

    Ok(Json(VerifyPaymentResponse { success: true }))
}
