//! Common reconciliation infrastructure for payment providers.
//!
//! Signed notifications go through `WebhookProvider` + `handle_webhook`;
//! every verified outcome is applied through `reconcile_atomic`, which
//! records the provider event id and updates the order in one transaction.

use axum::{body::Bytes, http::HeaderMap};
use rusqlite::Connection;

use crate::db::{AppState, queries};
use crate::error::{AppError, OptionExt, Result, msg};
use crate::models::Order;

/// How a notification identifies its order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderRef {
    Id(String),
    Number(String),
}

impl OrderRef {
    fn lookup(&self, conn: &Connection) -> Result<Option<Order>> {
        match self {
            OrderRef::Id(id) => queries::get_order_by_id(conn, id),
            OrderRef::Number(number) => queries::get_order_by_number(conn, number),
        }
    }
}

impl std::fmt::Display for OrderRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderRef::Id(id) => write!(f, "id={}", id),
            OrderRef::Number(number) => write!(f, "number={}", number),
        }
    }
}

/// Internal outcome a provider notification maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentUpdate {
    Paid { payment_id: String },
    Failed,
}

/// A verified, actionable notification.
#[derive(Debug)]
pub struct PaymentNotice {
    pub order: OrderRef,
    pub update: PaymentUpdate,
    /// Provider event identifier for replay prevention
    pub event_id: Option<String>,
    /// Amount the provider reports, in minor units
    pub amount_minor: Option<i64>,
}

/// Provider-agnostic parse result.
#[derive(Debug)]
pub enum WebhookEvent {
    Payment(PaymentNotice),
    /// Acknowledged without touching any order
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// This notification performed the transition
    Applied,
    /// The order was already in a state the update may not change
    /// (paid, or failed for a repeated failure)
    Unchanged,
    /// Event id already recorded (idempotent replay)
    AlreadyProcessed,
}

/// Trait for signed provider notifications (header signature over the raw body).
pub trait WebhookProvider: Send + Sync {
    /// Provider name for logging and database storage (e.g., "stripe", "phonepe")
    fn provider_name(&self) -> &'static str;

    /// Extract signature from request headers.
    fn extract_signature(&self, headers: &HeaderMap) -> Result<String>;

    /// Verify the signature against the exact received bytes.
    fn verify_signature(&self, body: &Bytes, signature: &str) -> Result<bool>;

    /// Parse the webhook payload into a provider-agnostic event.
    fn parse_event(&self, body: &Bytes) -> Result<WebhookEvent>;
}

/// Read a header as a string, mapping absence to a signature error.
pub fn header_value(headers: &HeaderMap, name: &str) -> Result<String> {
    headers
        .get(name)
        .ok_or_else(|| AppError::Signature(format!("Missing {} header", name)))?
        .to_str()
        .map(|s| s.to_string())
        .map_err(|e| {
            tracing::debug!("Invalid UTF-8 in {} header: {}", name, e);
            AppError::Signature("Invalid signature header".into())
        })
}

/// Apply a verified payment update ATOMICALLY: replay prevention, order
/// lookup and the guarded status change share one database transaction.
///
/// Either everything commits or nothing does, so a provider retry after a
/// persistence failure is processed normally. An unknown order rolls back
/// the ledger row as well.
pub fn reconcile_atomic(
    conn: &mut Connection,
    provider: &str,
    notice: &PaymentNotice,
) -> Result<(Order, ReconcileOutcome)> {
    let tx = conn.transaction()?;

    // 1. Replay prevention (inside transaction - rolls back if later steps fail)
    if let Some(event_id) = notice.event_id.as_deref() {
        if !queries::try_record_webhook_event(&tx, provider, event_id)? {
            let order = notice
                .order
                .lookup(&tx)?
                .or_not_found(msg::ORDER_NOT_FOUND)?;
            return Ok((order, ReconcileOutcome::AlreadyProcessed));
        }
    }

    // 2. Order lookup
    let order = notice
        .order
        .lookup(&tx)?
        .or_not_found(msg::ORDER_NOT_FOUND)?;

    if let Some(amount) = notice.amount_minor {
        if amount != order.amount_cents {
            tracing::warn!(
                "{} reported amount {} for order {} but {} was expected",
                provider,
                amount,
                order.order_number,
                order.amount_cents
            );
        }
    }

    // 3. Guarded transition (conditional update, never paid -> *)
    let applied = match &notice.update {
        PaymentUpdate::Paid { payment_id } => {
            queries::mark_order_paid(&tx, &order.id, payment_id, provider)?
        }
        PaymentUpdate::Failed => queries::mark_order_failed(&tx, &order.id)?,
    };

    let order = queries::get_order_by_id(&tx, &order.id)?.or_not_found(msg::ORDER_NOT_FOUND)?;
    tx.commit()?;

    let outcome = if applied {
        ReconcileOutcome::Applied
    } else {
        ReconcileOutcome::Unchanged
    };
    Ok((order, outcome))
}

/// Run `reconcile_atomic` with a pooled connection and log the result.
pub fn reconcile(
    state: &AppState,
    provider: &str,
    notice: &PaymentNotice,
) -> Result<(Order, ReconcileOutcome)> {
    let mut conn = state.db.get()?;

    let (order, outcome) = reconcile_atomic(&mut conn, provider, notice).inspect_err(|e| {
        tracing::warn!(
            "{} notification for order {} not applied: {}",
            provider,
            notice.order,
            e
        );
    })?;

    match outcome {
        ReconcileOutcome::Applied => tracing::info!(
            "{} reconciled order {}: payment_status={}, status={}",
            provider,
            order.order_number,
            order.payment_status.as_ref(),
            order.status.as_ref()
        ),
        ReconcileOutcome::Unchanged => tracing::info!(
            "{} notification left order {} unchanged (payment_status={})",
            provider,
            order.order_number,
            order.payment_status.as_ref()
        ),
        ReconcileOutcome::AlreadyProcessed => tracing::info!(
            "{} event {:?} already processed for order {}",
            provider,
            notice.event_id,
            order.order_number
        ),
    }

    Ok((order, outcome))
}

/// Shared flow for header-signed notifications: signature first (nothing is
/// looked up for an unverified body), then parse, then reconcile.
///
/// Returns `None` for acknowledged-but-ignored events.
pub fn handle_webhook<P: WebhookProvider>(
    provider: &P,
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Option<(Order, ReconcileOutcome)>> {
    let signature = provider.extract_signature(headers)?;

    if !provider.verify_signature(body, &signature)? {
        tracing::warn!("{} notification rejected: invalid signature", provider.provider_name());
        return Err(AppError::Signature(msg::INVALID_SIGNATURE.into()));
    }

    match provider.parse_event(body)? {
        WebhookEvent::Payment(notice) => {
            reconcile(state, provider.provider_name(), &notice).map(Some)
        }
        WebhookEvent::Ignored => Ok(None),
    }
}
