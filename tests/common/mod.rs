//! Test utilities and fixtures for orderpay integration tests

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use http_body_util::BodyExt;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use tower::ServiceExt;

pub use orderpay::config::{PhonePeConfig, RazorpayConfig, StripeConfig};
pub use orderpay::db::{AppState, init_db, queries};
pub use orderpay::handlers;
pub use orderpay::models::*;

type HmacSha256 = Hmac<Sha256>;

pub const STRIPE_WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const PHONEPE_MERCHANT_ID: &str = "MERCHANTUAT";
pub const PHONEPE_SALT_KEY: &str = "099eb0cd-02cf-4e2a-8aca-3e6c6aff0399";
pub const PHONEPE_SALT_INDEX: &str = "1";
pub const RAZORPAY_KEY_ID: &str = "rzp_test_key";
pub const RAZORPAY_KEY_SECRET: &str = "rzp_test_secret";

/// Create an in-memory test database with schema initialized
pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    init_db(&conn).expect("Failed to initialize schema");
    conn
}

/// App state backed by a single in-memory connection, no providers enabled.
///
/// Each in-memory connection is its own database, so the pool holds exactly
/// one. Tests must drop any connection they hold before calling the app.
pub fn create_test_app_state() -> AppState {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder().max_size(1).build(manager).unwrap();
    {
        let conn = pool.get().unwrap();
        init_db(&conn).unwrap();
    }

    AppState {
        db: pool,
        base_url: "http://localhost:3000".to_string(),
        currency: "INR".to_string(),
        stripe: None,
        phonepe: None,
        razorpay: None,
        http: reqwest::Client::new(),
    }
}

pub fn stripe_config(api_base: &str) -> StripeConfig {
    StripeConfig {
        secret_key: "sk_test_xxx".to_string(),
        webhook_secret: STRIPE_WEBHOOK_SECRET.to_string(),
        api_base: api_base.to_string(),
    }
}

pub fn phonepe_config(api_base: &str) -> PhonePeConfig {
    PhonePeConfig {
        merchant_id: PHONEPE_MERCHANT_ID.to_string(),
        salt_key: PHONEPE_SALT_KEY.to_string(),
        salt_index: PHONEPE_SALT_INDEX.to_string(),
        api_base: api_base.to_string(),
    }
}

pub fn razorpay_config(api_base: &str) -> RazorpayConfig {
    RazorpayConfig {
        key_id: RAZORPAY_KEY_ID.to_string(),
        key_secret: RAZORPAY_KEY_SECRET.to_string(),
        api_base: api_base.to_string(),
    }
}

/// App state with all three providers pointed at `api_base`.
pub fn create_configured_app_state(api_base: &str) -> AppState {
    let mut state = create_test_app_state();
    state.stripe = Some(stripe_config(api_base));
    state.phonepe = Some(phonepe_config(api_base));
    state.razorpay = Some(razorpay_config(api_base));
    state
}

/// Full router with state, no middleware.
pub fn app(state: AppState) -> Router {
    handlers::router().with_state(state)
}

/// Create a pending/unpaid order with a known id and number.
pub fn create_test_order(conn: &Connection, id: &str, order_number: &str) -> Order {
    queries::create_order(
        conn,
        &CreateOrder {
            id: Some(id.to_string()),
            order_number: order_number.to_string(),
            amount_cents: 49950,
            currency: "INR".to_string(),
            customer_email: Some("buyer@example.com".to_string()),
        },
    )
    .expect("Failed to create test order")
}

/// Create a test order through the app state's pool.
pub fn seed_order(state: &AppState, id: &str, order_number: &str) -> Order {
    let conn = state.db.get().unwrap();
    create_test_order(&conn, id, order_number)
}

/// Re-read an order through the app state's pool.
pub fn reload_order(state: &AppState, id: &str) -> Order {
    let conn = state.db.get().unwrap();
    queries::get_order_by_id(&conn, id)
        .unwrap()
        .expect("order should exist")
}

/// Rows in the replay ledger for `provider`.
pub fn ledger_count(state: &AppState, provider: &str) -> i64 {
    let conn = state.db.get().unwrap();
    conn.query_row(
        "SELECT COUNT(*) FROM webhook_events WHERE provider = ?1",
        [provider],
        |row| row.get(0),
    )
    .unwrap()
}

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
}

// ============ Provider signatures ============

pub fn hmac_hex(secret: &str, message: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// `Stripe-Signature` header for `payload` signed at `timestamp`.
pub fn stripe_signature_header(payload: &str, timestamp: i64) -> String {
    let signed = format!("{}.{}", timestamp, payload);
    format!(
        "t={},v1={}",
        timestamp,
        hmac_hex(STRIPE_WEBHOOK_SECRET, signed.as_bytes())
    )
}

pub fn stripe_checkout_completed(event_id: &str, order_id: &str, payment_intent: &str) -> String {
    serde_json::json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": "cs_test_123",
                "object": "checkout.session",
                "payment_status": "paid",
                "payment_intent": payment_intent,
                "metadata": { "orderId": order_id }
            }
        }
    })
    .to_string()
}

pub fn stripe_webhook_request(payload: &str, signature: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/webhooks/stripe")
        .header("content-type", "application/json")
        .header("stripe-signature", signature)
        .body(Body::from(payload.to_string()))
        .unwrap()
}

/// Base64 `response` field for a PhonePe callback.
pub fn phonepe_response(code: &str, merchant_transaction_id: &str, transaction_id: &str) -> String {
    let payload = serde_json::json!({
        "success": code == "PAYMENT_SUCCESS",
        "code": code,
        "message": "Callback",
        "data": {
            "merchantId": PHONEPE_MERCHANT_ID,
            "merchantTransactionId": merchant_transaction_id,
            "transactionId": transaction_id,
            "amount": 49950,
            "state": if code == "PAYMENT_SUCCESS" { "COMPLETED" } else { "FAILED" },
            "responseCode": code
        }
    });
    STANDARD.encode(payload.to_string())
}

/// `X-VERIFY` for a callback `response` string.
pub fn phonepe_x_verify(response: &str) -> String {
    let digest = Sha256::digest(
        format!(
            "{}/pg/v1/status/{}{}",
            response, PHONEPE_MERCHANT_ID, PHONEPE_SALT_KEY
        )
        .as_bytes(),
    );
    format!("{}###{}", hex::encode(digest), PHONEPE_SALT_INDEX)
}

pub fn phonepe_callback_request(response: &str, x_verify: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/phonepe/callback")
        .header("content-type", "application/json")
        .header("x-verify", x_verify)
        .body(Body::from(
            serde_json::json!({ "response": response }).to_string(),
        ))
        .unwrap()
}

pub fn razorpay_signature(provider_order_id: &str, provider_payment_id: &str) -> String {
    hmac_hex(
        RAZORPAY_KEY_SECRET,
        format!("{}|{}", provider_order_id, provider_payment_id).as_bytes(),
    )
}

// ============ Fake provider APIs ============

/// Serve `router` on an ephemeral local port; returns its base URL.
pub async fn spawn_fake_provider(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}
