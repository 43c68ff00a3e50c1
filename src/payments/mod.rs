mod phonepe;
mod razorpay;
mod stripe;

pub use phonepe::*;
pub use razorpay::*;
pub use stripe::*;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentProvider {
    Stripe,
    PhonePe,
    Razorpay,
}

impl PaymentProvider {
    /// Name stored in `orders.payment_provider` and the replay ledger.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::Stripe => "stripe",
            PaymentProvider::PhonePe => "phonepe",
            PaymentProvider::Razorpay => "razorpay",
        }
    }
}

/// Convert a major-unit amount (e.g. rupees) to minor units (paise).
/// This is the only conversion done at the provider boundary.
pub fn to_minor_units(major: f64) -> i64 {
    (major * 100.0).round() as i64
}

/// Hex HMAC-SHA256 of `message` keyed by `secret`.
fn hmac_sha256_hex(secret: &str, message: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Internal(crate::error::msg::INVALID_WEBHOOK_SECRET.into()))?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time comparison of two signature strings.
///
/// The length check is not constant-time, but signature length is not
/// secret (always 64 hex chars for SHA-256).
fn signatures_match(expected: &str, provided: &str) -> bool {
    let expected = expected.as_bytes();
    let provided = provided.as_bytes();
    if expected.len() != provided.len() {
        return false;
    }
    expected.ct_eq(provided).into()
}
