use axum::extract::State;
use serde::Deserialize;

use crate::db::{AppState, queries};
use crate::error::{AppError, OptionExt, Result, msg};
use crate::extractors::{Json, Path, Query};
use crate::models::OrderPaymentView;

/// `GET /api/orders/{id}`: payment state for the success/cancel pages.
pub async fn get_order_status(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<OrderPaymentView>> {
    let conn = state.db.get()?;
    let order = queries::get_order_by_id(&conn, &order_id)?.or_not_found(msg::ORDER_NOT_FOUND)?;
    Ok(Json(order.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhonePeStatusQuery {
    pub merchant_transaction_id: String,
}

/// `GET /api/phonepe/status`: read-only lookup by order number, used by the
/// PhonePe redirect page while the callback may still be in flight.
pub async fn get_phonepe_status(
    State(state): State<AppState>,
    Query(query): Query<PhonePeStatusQuery>,
) -> Result<Json<OrderPaymentView>> {
    if query.merchant_transaction_id.is_empty() {
        return Err(AppError::Validation("merchantTransactionId is required".into()));
    }

    let conn = state.db.get()?;
    let order = queries::get_order_by_number(&conn, &query.merchant_transaction_id)?
        .or_not_found(msg::ORDER_NOT_FOUND)?;
    Ok(Json(order.into()))
}
