use std::collections::BTreeMap;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::RazorpayConfig;
use crate::error::{AppError, Result};

use super::{hmac_sha256_hex, signatures_match};

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    notes: &'a BTreeMap<String, String>,
}

/// Order returned by `POST /v1/orders`.
#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub receipt: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorResponse {
    error: RazorpayErrorBody,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorBody {
    description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RazorpayClient {
    client: Client,
    key_id: String,
    key_secret: String,
    api_base: String,
}

impl RazorpayClient {
    pub fn new(client: Client, config: &RazorpayConfig) -> Self {
        Self {
            client,
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Public key id handed to the browser checkout widget.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Create a provider order. `receipt` carries our order id.
    pub async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
        notes: &BTreeMap<String, String>,
    ) -> Result<RazorpayOrder> {
        let response = self
            .client
            .post(format!("{}/v1/orders", self.api_base))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&CreateOrderRequest {
                amount: amount_minor,
                currency,
                receipt,
                notes,
            })
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Razorpay API error: {}", e)))?;

        read_order(response).await
    }

    /// Look up a provider order. Its `receipt` is the id of the order it
    /// was created for.
    pub async fn fetch_order(&self, provider_order_id: &str) -> Result<RazorpayOrder> {
        let response = self
            .client
            .get(format!(
                "{}/v1/orders/{}",
                self.api_base,
                urlencoding::encode(provider_order_id)
            ))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Razorpay API error: {}", e)))?;

        read_order(response).await
    }

    /// Checkout signature: hex HMAC-SHA256 of `"{order_id}|{payment_id}"`
    /// keyed by the key secret.
    pub fn verify_payment_signature(
        &self,
        provider_order_id: &str,
        provider_payment_id: &str,
        signature: &str,
    ) -> Result<bool> {
        let message = format!("{}|{}", provider_order_id, provider_payment_id);
        let expected = hmac_sha256_hex(&self.key_secret, message.as_bytes())?;
        Ok(signatures_match(&expected, signature.trim()))
    }
}

async fn read_order(response: reqwest::Response) -> Result<RazorpayOrder> {
    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<RazorpayErrorResponse>(&error_text)
            .ok()
            .and_then(|e| e.error.description)
            .unwrap_or(error_text);
        return Err(AppError::Provider(format!(
            "Razorpay API error ({}): {}",
            status, message
        )));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Provider(format!("Failed to parse Razorpay response: {}", e)))
}
