//! orderpay - storefront order/payment reconciliation service
//!
//! Creates hosted payment sessions (Stripe, PhonePe, Razorpay), verifies
//! provider notifications, and applies one idempotent update per verified
//! notification to the order store.

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod payments;
