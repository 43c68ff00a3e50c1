use axum::{body::Bytes, extract::State, http::HeaderMap};
use serde::Serialize;

use crate::db::AppState;
use crate::error::{AppError, Result, msg};
use crate::extractors::Json;
use crate::models::PaymentStatus;
use crate::payments::{PaymentProvider, PhonePeCallback, PhonePeCallbackBody, PhonePeClient};

use super::common::{
    OrderRef, PaymentNotice, PaymentUpdate, WebhookEvent, WebhookProvider, handle_webhook,
    header_value,
};

/// PhonePe server-to-server callback. The signature covers the base64
/// `response` field, so the body is parsed only to pull that string out.
pub struct PhonePeWebhookProvider {
    client: PhonePeClient,
}

fn callback_body(body: &Bytes) -> Result<PhonePeCallbackBody> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::warn!("Malformed PhonePe callback body: {}", e);
        AppError::Validation("Invalid callback body".into())
    })
}

impl WebhookProvider for PhonePeWebhookProvider {
    fn provider_name(&self) -> &'static str {
        PaymentProvider::PhonePe.as_str()
    }

    fn extract_signature(&self, headers: &HeaderMap) -> Result<String> {
        header_value(headers, "x-verify")
    }

    fn verify_signature(&self, body: &Bytes, signature: &str) -> Result<bool> {
        let body = callback_body(body)?;
        Ok(self.client.verify_callback(&body.response, signature))
    }

    /// Every callback code maps to paid or failed; nothing is ignored.
    fn parse_event(&self, body: &Bytes) -> Result<WebhookEvent> {
        let callback = PhonePeCallback::decode(&callback_body(body)?.response)?;
        let success = callback.is_success();
        let data = callback.data;

        if data.merchant_transaction_id.is_empty() {
            return Err(AppError::Validation("merchantTransactionId is required".into()));
        }

        let reference = data
            .transaction_id
            .clone()
            .unwrap_or_else(|| data.merchant_transaction_id.clone());
        // One ledger entry per transaction outcome; a success after a
        // failure for the same transaction is a distinct event.
        let event_id = format!("{}:{}", reference, callback.code);

        let update = if success {
            PaymentUpdate::Paid {
                payment_id: reference,
            }
        } else {
            tracing::info!(
                "PhonePe reported {} for {}: {:?}",
                callback.code,
                data.merchant_transaction_id,
                callback.message
            );
            PaymentUpdate::Failed
        };

        Ok(WebhookEvent::Payment(PaymentNotice {
            order: OrderRef::Number(data.merchant_transaction_id),
            update,
            event_id: Some(event_id),
            amount_minor: data.amount,
        }))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackAck {
    pub success: bool,
    pub payment_status: PaymentStatus,
}

/// Axum handler for `POST /api/phonepe/callback`.
pub async fn handle_phonepe_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<CallbackAck>> {
    let config = state
        .phonepe
        .as_ref()
        .ok_or_else(|| AppError::Validation(msg::PHONEPE_NOT_CONFIGURED.into()))?;

    let provider = PhonePeWebhookProvider {
        client: PhonePeClient::new(state.http.clone(), config),
    };

    // parse_event never yields Ignored, so a verified callback always
    // reaches an order
    let Some((order, _)) = handle_webhook(&provider, &state, &headers, &body)? else {
        return Err(AppError::Internal("PhonePe callback produced no update".into()));
    };

    Ok(Json(CallbackAck {
        success: true,
        payment_status: order.payment_status,
    }))
}
