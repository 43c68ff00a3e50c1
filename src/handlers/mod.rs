pub mod checkout;
pub mod public;
pub mod webhooks;

use axum::Router;

use crate::db::AppState;

/// All routes, without middleware layers or state.
pub fn router() -> Router<AppState> {
    Router::new()
        // Health and order read models
        .merge(public::router())
        // Session creation
        .merge(checkout::router())
        // Provider notifications (signature-authenticated)
        .merge(webhooks::router())
}
