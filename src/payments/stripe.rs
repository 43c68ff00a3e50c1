use reqwest::Client;
use serde::Deserialize;

use crate::config::StripeConfig;
use crate::error::{AppError, Result, msg};
use crate::models::LineItem;

use super::{hmac_sha256_hex, signatures_match};

#[derive(Debug, Deserialize)]
struct CreateCheckoutSessionResponse {
    id: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    message: Option<String>,
}

/// Parameters for a hosted checkout session. Line items are already in
/// minor units.
#[derive(Debug)]
pub struct CheckoutSessionParams<'a> {
    pub order_id: &'a str,
    pub currency: &'a str,
    pub line_items: &'a [LineItem],
    pub customer_email: Option<&'a str>,
    pub coupon_code: Option<&'a str>,
    pub user_id: Option<&'a str>,
    pub success_url: &'a str,
    pub cancel_url: &'a str,
}

#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    webhook_secret: String,
    api_base: String,
}

impl StripeClient {
    pub fn new(client: Client, config: &StripeConfig) -> Self {
        Self {
            client,
            secret_key: config.secret_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Create a Checkout Session with ad-hoc `price_data` line items.
    /// Returns `(session_id, checkout_url)`.
    pub async fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams<'_>,
    ) -> Result<(String, String)> {
        let form = checkout_form(params);

        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Stripe API error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StripeErrorResponse>(&error_text)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or(error_text);
            return Err(AppError::Provider(format!(
                "Stripe API error ({}): {}",
                status, message
            )));
        }

        let session: CreateCheckoutSessionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to parse Stripe response: {}", e)))?;

        Ok((session.id, session.url))
    }

    /// Maximum age of a webhook timestamp before it's rejected (in seconds).
    /// Stripe recommends 300 seconds (5 minutes).
    const WEBHOOK_TIMESTAMP_TOLERANCE_SECS: i64 = 300;

    /// Allowed clock skew for timestamps from the future.
    const WEBHOOK_FUTURE_TOLERANCE_SECS: i64 = 60;

    /// Verify a `Stripe-Signature` header (`t=<ts>,v1=<hex>`) against the raw
    /// request body. Malformed headers are errors; a wrong or stale
    /// signature is `Ok(false)`.
    pub fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> Result<bool> {
        let mut timestamp = None;
        let mut sig_v1 = None;

        for part in signature.split(',') {
            let part = part.trim();
            if let Some(t) = part.strip_prefix("t=") {
                timestamp = Some(t);
            } else if let Some(s) = part.strip_prefix("v1=") {
                sig_v1 = Some(s);
            }
        }

        let timestamp_str =
            timestamp.ok_or_else(|| AppError::Signature(msg::INVALID_SIGNATURE_FORMAT.into()))?;
        let sig_v1 =
            sig_v1.ok_or_else(|| AppError::Signature(msg::INVALID_SIGNATURE_FORMAT.into()))?;

        let timestamp: i64 = timestamp_str
            .parse()
            .map_err(|_| AppError::Signature(msg::INVALID_TIMESTAMP_IN_SIGNATURE.into()))?;

        let age = chrono::Utc::now().timestamp() - timestamp;

        if age > Self::WEBHOOK_TIMESTAMP_TOLERANCE_SECS {
            tracing::warn!(
                "Stripe webhook rejected: timestamp too old (age={}s, max={}s)",
                age,
                Self::WEBHOOK_TIMESTAMP_TOLERANCE_SECS
            );
            return Ok(false);
        }

        if age < -Self::WEBHOOK_FUTURE_TOLERANCE_SECS {
            tracing::warn!("Stripe webhook rejected: timestamp in the future (age={}s)", age);
            return Ok(false);
        }

        // Signed payload is "{t}.{raw body}", byte for byte
        let mut signed_payload = Vec::with_capacity(timestamp_str.len() + 1 + payload.len());
        signed_payload.extend_from_slice(timestamp_str.as_bytes());
        signed_payload.push(b'.');
        signed_payload.extend_from_slice(payload);

        let expected = hmac_sha256_hex(&self.webhook_secret, &signed_payload)?;
        Ok(signatures_match(&expected, sig_v1))
    }
}

/// Form-encoded body for `POST /v1/checkout/sessions`.
fn checkout_form(params: &CheckoutSessionParams<'_>) -> Vec<(String, String)> {
    let mut form: Vec<(String, String)> = vec![
        ("mode".into(), "payment".into()),
        ("success_url".into(), params.success_url.into()),
        ("cancel_url".into(), params.cancel_url.into()),
        ("client_reference_id".into(), params.order_id.into()),
        ("metadata[orderId]".into(), params.order_id.into()),
    ];

    for (i, item) in params.line_items.iter().enumerate() {
        let prefix = format!("line_items[{}]", i);
        form.push((
            format!("{}[price_data][currency]", prefix),
            params.currency.to_lowercase(),
        ));
        form.push((
            format!("{}[price_data][product_data][name]", prefix),
            item.name.clone(),
        ));
        form.push((
            format!("{}[price_data][unit_amount]", prefix),
            item.unit_amount.to_string(),
        ));
        form.push((format!("{}[quantity]", prefix), item.quantity.to_string()));
    }

    if let Some(email) = params.customer_email {
        form.push(("customer_email".into(), email.into()));
    }
    if let Some(code) = params.coupon_code {
        form.push(("metadata[couponCode]".into(), code.into()));
    }
    if let Some(user_id) = params.user_id {
        form.push(("metadata[userId]".into(), user_id.into()));
    }

    form
}

/// Generic Stripe webhook event - object is parsed based on event_type
#[derive(Debug, Deserialize)]
pub struct StripeWebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct StripeMetadata {
    #[serde(rename = "orderId")]
    pub order_id: Option<String>,
}

// ============ checkout.session.completed ============

#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub payment_status: String, // "paid", "unpaid", "no_payment_required"
    pub payment_intent: Option<String>,
    /// Total charged, in minor units
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub metadata: StripeMetadata,
}

// ============ payment_intent.payment_failed ============

#[derive(Debug, Deserialize)]
pub struct StripePaymentIntent {
    pub id: String,
    #[serde(default)]
    pub metadata: StripeMetadata,
    pub last_payment_error: Option<StripePaymentError>,
}

#[derive(Debug, Deserialize)]
pub struct StripePaymentError {
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> StripeClient {
        StripeClient::new(
            Client::new(),
            &StripeConfig {
                secret_key: "sk_test_123".into(),
                webhook_secret: "whsec_test".into(),
                api_base: "http://localhost/".into(),
            },
        )
    }

    fn sign(payload: &[u8], timestamp: i64) -> String {
        let mut signed = format!("{}.", timestamp).into_bytes();
        signed.extend_from_slice(payload);
        format!("t={},v1={}", timestamp, hmac_sha256_hex("whsec_test", &signed).unwrap())
    }

    #[test]
    fn test_valid_signature() {
        let payload = br#"{"id":"evt_1","type":"ping"}"#;
        let header = sign(payload, chrono::Utc::now().timestamp());
        assert!(client().verify_webhook_signature(payload, &header).unwrap());
    }

    #[test]
    fn test_tampered_body_rejected() {
        let payload = br#"{"id":"evt_1","type":"ping"}"#;
        let header = sign(payload, chrono::Utc::now().timestamp());
        let tampered = br#"{"id":"evt_2","type":"ping"}"#;
        assert!(!client().verify_webhook_signature(tampered, &header).unwrap());
    }

    #[test]
    fn test_stale_and_future_timestamps_rejected() {
        let payload = b"{}";
        let now = chrono::Utc::now().timestamp();
        assert!(!client().verify_webhook_signature(payload, &sign(payload, now - 301)).unwrap());
        assert!(!client().verify_webhook_signature(payload, &sign(payload, now + 120)).unwrap());
        assert!(client().verify_webhook_signature(payload, &sign(payload, now + 30)).unwrap());
    }

    #[test]
    fn test_malformed_header_is_error() {
        let c = client();
        assert!(matches!(
            c.verify_webhook_signature(b"{}", "v1=abc"),
            Err(AppError::Signature(_))
        ));
        assert!(matches!(
            c.verify_webhook_signature(b"{}", "t=abc,v1=abc"),
            Err(AppError::Signature(_))
        ));
    }

    #[test]
    fn test_checkout_form_line_items() {
        let items = vec![
            LineItem {
                name: "Photo Mug (Large)".into(),
                unit_amount: 29950,
                quantity: 2,
            },
            LineItem {
                name: "Shipping".into(),
                unit_amount: 4000,
                quantity: 1,
            },
        ];
        let params = CheckoutSessionParams {
            order_id: "abc123",
            currency: "INR",
            line_items: &items,
            customer_email: Some("buyer@example.com"),
            coupon_code: None,
            user_id: Some("user_1"),
            success_url: "https://shop.test/order-success?orderId=abc123",
            cancel_url: "https://shop.test/cart?cancelled=true&orderId=abc123",
        };
        let form = checkout_form(&params);
        let get = |k: &str| form.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());

        assert_eq!(get("metadata[orderId]"), Some("abc123"));
        assert_eq!(get("line_items[0][price_data][currency]"), Some("inr"));
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("29950"));
        assert_eq!(get("line_items[0][quantity]"), Some("2"));
        assert_eq!(get("line_items[1][price_data][product_data][name]"), Some("Shipping"));
        assert_eq!(get("metadata[userId]"), Some("user_1"));
        assert_eq!(get("metadata[couponCode]"), None);
    }
}
