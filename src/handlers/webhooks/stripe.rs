use axum::{body::Bytes, extract::State, http::HeaderMap};
use serde::Serialize;

use crate::db::AppState;
use crate::error::{AppError, Result, msg};
use crate::extractors::Json;
use crate::payments::{
    PaymentProvider, StripeCheckoutSession, StripeClient, StripePaymentIntent, StripeWebhookEvent,
};

use super::common::{
    OrderRef, PaymentNotice, PaymentUpdate, WebhookEvent, WebhookProvider, handle_webhook,
    header_value,
};

/// Stripe webhook provider implementation.
pub struct StripeWebhookProvider {
    client: StripeClient,
}

impl WebhookProvider for StripeWebhookProvider {
    fn provider_name(&self) -> &'static str {
        PaymentProvider::Stripe.as_str()
    }

    fn extract_signature(&self, headers: &HeaderMap) -> Result<String> {
        header_value(headers, "stripe-signature")
    }

    fn verify_signature(&self, body: &Bytes, signature: &str) -> Result<bool> {
        self.client.verify_webhook_signature(body, signature)
    }

    fn parse_event(&self, body: &Bytes) -> Result<WebhookEvent> {
        let event: StripeWebhookEvent = serde_json::from_slice(body).map_err(|e| {
            tracing::error!("Failed to parse Stripe webhook: {}", e);
            AppError::Validation("Invalid JSON".into())
        })?;

        let event_type = event.event_type.clone();
        match event_type.as_str() {
            // Delayed methods complete unpaid and settle with async_payment_succeeded
            "checkout.session.completed" | "checkout.session.async_payment_succeeded" => {
                parse_checkout_completed(event)
            }
            "payment_intent.payment_failed" => parse_payment_failed(&event),
            other => {
                tracing::debug!("Stripe event {} ({}) ignored", event.id, other);
                Ok(WebhookEvent::Ignored)
            }
        }
    }
}

/// A settled checkout session. Sessions that are not yet `paid` (delayed
/// payment methods) are acknowledged and left for the follow-up event.
fn parse_checkout_completed(event: StripeWebhookEvent) -> Result<WebhookEvent> {
    let session: StripeCheckoutSession =
        serde_json::from_value(event.data.object).map_err(|e| {
            tracing::error!("Failed to parse checkout session: {}", e);
            AppError::Validation("Invalid checkout session".into())
        })?;

    if session.payment_status != "paid" {
        tracing::info!(
            "Stripe checkout session {} completed with payment_status={}, ignoring",
            session.id,
            session.payment_status
        );
        return Ok(WebhookEvent::Ignored);
    }

    let order_id = session
        .metadata
        .order_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            tracing::warn!("Stripe checkout session {} has no orderId metadata", session.id);
            AppError::Validation(msg::MISSING_ORDER_ID.into())
        })?;

    // payment_intent is the charge reference; fall back to the session id
    let payment_id = session.payment_intent.unwrap_or(session.id);

    Ok(WebhookEvent::Payment(PaymentNotice {
        order: OrderRef::Id(order_id),
        update: PaymentUpdate::Paid { payment_id },
        event_id: Some(event.id),
        amount_minor: session.amount_total,
    }))
}

/// Failed card attempts are logged only; the customer can retry on the
/// hosted page and the order stays awaiting payment.
fn parse_payment_failed(event: &StripeWebhookEvent) -> Result<WebhookEvent> {
    match serde_json::from_value::<StripePaymentIntent>(event.data.object.clone()) {
        Ok(intent) => tracing::warn!(
            "Stripe payment failed: intent={}, order={:?}, reason={:?}",
            intent.id,
            intent.metadata.order_id,
            intent.last_payment_error.and_then(|e| e.message)
        ),
        Err(e) => tracing::warn!("Stripe payment failed (unparsed intent): {}", e),
    }
    Ok(WebhookEvent::Ignored)
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Axum handler for Stripe webhooks.
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>> {
    let config = state
        .stripe
        .as_ref()
        .ok_or_else(|| AppError::Validation(msg::STRIPE_NOT_CONFIGURED.into()))?;

    let provider = StripeWebhookProvider {
        client: StripeClient::new(state.http.clone(), config),
    };
    handle_webhook(&provider, &state, &headers, &body)?;

    Ok(Json(WebhookAck { received: true }))
}
