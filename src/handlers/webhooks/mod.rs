pub mod common;
pub mod phonepe;
pub mod razorpay;
pub mod stripe;

pub use phonepe::handle_phonepe_callback;
pub use razorpay::verify_razorpay_payment;
pub use stripe::handle_stripe_webhook;

use axum::{Router, routing::post};

use crate::db::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/webhooks/stripe", post(handle_stripe_webhook))
        .route("/api/phonepe/callback", post(handle_phonepe_callback))
        .route("/api/razorpay/verify", post(verify_razorpay_payment))
}
