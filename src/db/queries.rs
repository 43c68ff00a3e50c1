use chrono::Utc;
use rusqlite::{Connection, params};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::*;

use super::from_row::{ORDER_COLS, query_one};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

// ============ Orders ============

/// Insert a `pending/unpaid` order. Orders are normally placed by the
/// storefront; this exists for seeding and tests.
pub fn create_order(conn: &Connection, input: &CreateOrder) -> Result<Order> {
    if input.amount_cents <= 0 {
        return Err(AppError::Validation(crate::error::msg::INVALID_AMOUNT.into()));
    }

    let id = input.id.clone().unwrap_or_else(gen_id);
    let now = now();

    conn.execute(
        "INSERT INTO orders (id, order_number, status, payment_status, amount_cents, currency, customer_email, created_at, updated_at)
         VALUES (?1, ?2, 'pending', 'unpaid', ?3, ?4, ?5, ?6, ?6)",
        params![
            &id,
            &input.order_number,
            input.amount_cents,
            &input.currency,
            &input.customer_email,
            now
        ],
    )?;

    Ok(Order {
        id,
        order_number: input.order_number.clone(),
        status: OrderStatus::Pending,
        payment_status: PaymentStatus::Unpaid,
        payment_id: None,
        payment_provider: None,
        amount_cents: input.amount_cents,
        currency: input.currency.clone(),
        customer_email: input.customer_email.clone(),
        created_at: now,
        updated_at: now,
    })
}

pub fn get_order_by_id(conn: &Connection, id: &str) -> Result<Option<Order>> {
    query_one(
        conn,
        &format!("SELECT {} FROM orders WHERE id = ?1", ORDER_COLS),
        &[&id],
    )
}

pub fn get_order_by_number(conn: &Connection, order_number: &str) -> Result<Option<Order>> {
    query_one(
        conn,
        &format!("SELECT {} FROM orders WHERE order_number = ?1", ORDER_COLS),
        &[&order_number],
    )
}

/// Mark an order paid and confirmed. Only applies while the order is not
/// already paid, so a replayed or concurrent confirmation cannot overwrite
/// the recorded `payment_id`.
/// Returns true if this call performed the transition.
pub fn mark_order_paid(
    conn: &Connection,
    order_id: &str,
    payment_id: &str,
    provider: &str,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE orders
         SET payment_status = 'paid', status = 'confirmed', payment_id = ?1,
             payment_provider = ?2, updated_at = ?3
         WHERE id = ?4 AND payment_status != 'paid'",
        params![payment_id, provider, now(), order_id],
    )?;
    Ok(affected > 0)
}

/// Mark an order's payment as failed. Paid orders are never reverted and a
/// repeated failure is a no-op. Fulfilment status is left untouched.
/// Returns true if this call performed the transition.
pub fn mark_order_failed(conn: &Connection, order_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE orders SET payment_status = 'failed', updated_at = ?1
         WHERE id = ?2 AND payment_status NOT IN ('paid', 'failed')",
        params![now(), order_id],
    )?;
    Ok(affected > 0)
}

// ============ Webhook Replay Prevention ============

/// Record a provider event id. Returns false if it was already recorded.
pub fn try_record_webhook_event(conn: &Connection, provider: &str, event_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "INSERT OR IGNORE INTO webhook_events (provider, event_id, created_at) VALUES (?1, ?2, ?3)",
        params![provider, event_id, now()],
    )?;
    Ok(affected > 0)
}

/// Purge webhook events beyond the retention period. Providers retry for a
/// few days at most, so old ids no longer protect against anything.
/// Returns the number of deleted records.
pub fn purge_old_webhook_events(conn: &Connection, retention_days: i64) -> Result<usize> {
    let cutoff = now() - (retention_days * 86400);
    let deleted = conn.execute(
        "DELETE FROM webhook_events WHERE created_at < ?1",
        params![cutoff],
    )?;
    Ok(deleted)
}
