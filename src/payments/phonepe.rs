//! PhonePe PG: signed pay requests and callback verification.
//!
//! Both directions use the same checksum scheme: `sha256_hex(payload + path +
//! salt_key) + "###" + salt_index`, sent in the `X-VERIFY` header.

use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::PhonePeConfig;
use crate::error::{AppError, Result};

use super::signatures_match;

pub const PAY_PATH: &str = "/pg/v1/pay";
/// Fixed path segment of the callback checksum.
pub const STATUS_PATH: &str = "/pg/v1/status/";
/// Callback `code` for a completed payment.
pub const PAYMENT_SUCCESS: &str = "PAYMENT_SUCCESS";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PayRequest<'a> {
    merchant_id: &'a str,
    merchant_transaction_id: &'a str,
    merchant_user_id: &'a str,
    amount: i64,
    redirect_url: &'a str,
    redirect_mode: &'static str,
    callback_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    mobile_number: Option<&'a str>,
    payment_instrument: PaymentInstrument,
}

#[derive(Debug, Serialize)]
struct PaymentInstrument {
    #[serde(rename = "type")]
    instrument_type: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
struct EncodedRequest {
    request: String,
}

#[derive(Debug, Deserialize)]
struct PayResponse {
    success: bool,
    code: Option<String>,
    message: Option<String>,
    data: Option<PayResponseData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PayResponseData {
    instrument_response: Option<InstrumentResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstrumentResponse {
    redirect_info: Option<RedirectInfo>,
}

#[derive(Debug, Deserialize)]
struct RedirectInfo {
    url: String,
}

/// Inputs for a pay-page request.
#[derive(Debug)]
pub struct PayParams<'a> {
    pub merchant_transaction_id: &'a str,
    pub merchant_user_id: &'a str,
    pub amount_minor: i64,
    pub redirect_url: &'a str,
    pub callback_url: &'a str,
    pub mobile_number: Option<&'a str>,
}

/// Callback body: `{"response": "<base64 JSON>"}`.
#[derive(Debug, Deserialize)]
pub struct PhonePeCallbackBody {
    pub response: String,
}

/// Decoded callback payload.
#[derive(Debug, Deserialize)]
pub struct PhonePeCallback {
    #[serde(default)]
    pub success: bool,
    pub code: String,
    pub message: Option<String>,
    pub data: PhonePeCallbackData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhonePeCallbackData {
    pub merchant_transaction_id: String,
    pub transaction_id: Option<String>,
    pub amount: Option<i64>,
    pub state: Option<String>,
}

impl PhonePeCallback {
    pub fn decode(response_b64: &str) -> Result<Self> {
        let raw = STANDARD
            .decode(response_b64.trim())
            .map_err(|e| AppError::Validation(format!("Invalid base64 response: {}", e)))?;
        serde_json::from_slice(&raw)
            .map_err(|e| AppError::Validation(format!("Invalid callback payload: {}", e)))
    }

    pub fn is_success(&self) -> bool {
        self.code == PAYMENT_SUCCESS
    }
}

#[derive(Debug, Clone)]
pub struct PhonePeClient {
    client: Client,
    merchant_id: String,
    salt_key: String,
    salt_index: String,
    api_base: String,
}

impl PhonePeClient {
    pub fn new(client: Client, config: &PhonePeConfig) -> Self {
        Self {
            client,
            merchant_id: config.merchant_id.clone(),
            salt_key: config.salt_key.clone(),
            salt_index: config.salt_index.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        }
    }

    /// `X-VERIFY` value for `payload` sent to (or received for) `path`.
    pub fn checksum(&self, payload: &str, path: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(payload.as_bytes());
        hasher.update(path.as_bytes());
        hasher.update(self.salt_key.as_bytes());
        format!("{}###{}", hex::encode(hasher.finalize()), self.salt_index)
    }

    /// Create a pay-page transaction. Returns the hosted page URL.
    pub async fn create_payment(&self, params: &PayParams<'_>) -> Result<String> {
        let request = PayRequest {
            merchant_id: &self.merchant_id,
            merchant_transaction_id: params.merchant_transaction_id,
            merchant_user_id: params.merchant_user_id,
            amount: params.amount_minor,
            redirect_url: params.redirect_url,
            redirect_mode: "REDIRECT",
            callback_url: params.callback_url,
            mobile_number: params.mobile_number,
            payment_instrument: PaymentInstrument {
                instrument_type: "PAY_PAGE",
            },
        };

        let encoded = STANDARD.encode(serde_json::to_vec(&request)?);
        let x_verify = self.checksum(&encoded, PAY_PATH);

        let response = self
            .client
            .post(format!("{}{}", self.api_base, PAY_PATH))
            .header("X-VERIFY", x_verify)
            .header("X-MERCHANT-ID", &self.merchant_id)
            .json(&EncodedRequest { request: encoded })
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("PhonePe API error: {}", e)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let parsed: Option<PayResponse> = serde_json::from_str(&body).ok();

        let pay = match parsed {
            Some(p) if status.is_success() && p.success => p,
            Some(p) => {
                let message = p.message.or(p.code).unwrap_or_else(|| status.to_string());
                return Err(AppError::Provider(format!("PhonePe API error: {}", message)));
            }
            None => {
                return Err(AppError::Provider(format!(
                    "PhonePe API error ({}): {}",
                    status, body
                )));
            }
        };

        pay.data
            .and_then(|d| d.instrument_response)
            .and_then(|i| i.redirect_info)
            .map(|r| r.url)
            .ok_or_else(|| AppError::Provider("PhonePe response missing redirect URL".into()))
    }

    /// Verify a callback `X-VERIFY` header against the base64 `response`
    /// string exactly as received.
    pub fn verify_callback(&self, response_b64: &str, x_verify: &str) -> bool {
        let canonical = format!("{}{}", STATUS_PATH, self.merchant_id);
        let expected = self.checksum(response_b64, &canonical);
        signatures_match(&expected, x_verify.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> PhonePeClient {
        PhonePeClient::new(
            Client::new(),
            &PhonePeConfig {
                merchant_id: "MERCHANTUAT".into(),
                salt_key: "salt-key".into(),
                salt_index: "1".into(),
                api_base: "http://localhost".into(),
            },
        )
    }

    #[test]
    fn test_checksum_format() {
        let c = client();
        let checksum = c.checksum("eyJhIjoxfQ==", PAY_PATH);
        let (hash, index) = checksum.split_once("###").unwrap();
        assert_eq!(index, "1");
        assert_eq!(hash.len(), 64);

        let expected = hex::encode(Sha256::digest(b"eyJhIjoxfQ==/pg/v1/paysalt-key"));
        assert_eq!(hash, expected);
    }

    #[test]
    fn test_verify_callback() {
        let c = client();
        let response = STANDARD.encode(br#"{"code":"PAYMENT_SUCCESS"}"#);
        let hash = hex::encode(Sha256::digest(
            format!("{}/pg/v1/status/MERCHANTUATsalt-key", response).as_bytes(),
        ));
        let header = format!("{}###1", hash);

        assert!(c.verify_callback(&response, &header));
        assert!(!c.verify_callback(&response, &format!("{}###2", hash)));

        let mut tampered = header.clone().into_bytes();
        tampered[0] = if tampered[0] == b'0' { b'1' } else { b'0' };
        assert!(!c.verify_callback(&response, &String::from_utf8(tampered).unwrap()));
    }

    #[test]
    fn test_decode_callback() {
        let response = STANDARD.encode(
            br#"{"success":true,"code":"PAYMENT_SUCCESS","message":"ok",
                "data":{"merchantId":"M","merchantTransactionId":"ORD-1001","transactionId":"T1","amount":49950,"state":"COMPLETED"}}"#,
        );
        let callback = PhonePeCallback::decode(&response).unwrap();
        assert!(callback.is_success());
        assert_eq!(callback.data.merchant_transaction_id, "ORD-1001");
        assert_eq!(callback.data.transaction_id.as_deref(), Some("T1"));

        assert!(PhonePeCallback::decode("not base64!").is_err());
    }
}
