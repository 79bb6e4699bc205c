//! Axum router and shared handler helpers.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. All handlers are `pub(crate)` so the scenario tests in
//! `tests/` can compose the router directly.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Serialize;

use crate::{
    api_types::{ErrorBody, HealthResponse, PendingBody},
    error::ApiError,
    state::AppState,
};
use mensa_db::orders::AdvanceOutcome;
use mensa_lifecycle::ActingRole;

pub(crate) mod orders;
pub(crate) mod users;
pub(crate) mod vendors;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/auth/register", post(users::register))
        .nest("/api", api_router())
        .with_state(state)
}

fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // User self-service.
        .route(
            "/user",
            get(users::read_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .route("/user/role", get(users::read_role))
        .route("/user/role/:role_id", patch(users::update_role))
        // Vendor store management.
        .route("/vendor", post(vendors::create_vendor))
        .route(
            "/vendor/:vendor_id",
            get(vendors::read_vendors)
                .patch(vendors::update_vendor)
                .delete(vendors::delete_vendor),
        )
        .route("/vendor/:vendor_id/dishes", post(vendors::create_dish))
        .route(
            "/vendor/:vendor_id/dishes/:dish_id",
            get(vendors::read_dishes)
                .patch(vendors::update_dish)
                .delete(vendors::delete_dish),
        )
        // Vendor-side fulfillment.
        .route(
            "/vendor/:vendor_id/order-dishes",
            get(vendors::read_incoming_lines),
        )
        .route(
            "/vendor/:vendor_id/order-dishes/:order_dish_id/status",
            patch(vendors::advance_line),
        )
        .route(
            "/vendor/:vendor_id/orders/:order_id/status",
            patch(vendors::advance_order),
        )
        // Customer-side orders.
        .route("/orders", post(orders::create_order))
        .route(
            "/orders/:order_id",
            get(orders::read_orders).delete(orders::delete_order),
        )
        .route("/orders/:order_id/status", patch(orders::advance_order))
        .route(
            "/orders/:order_id/dishes/:dish_id",
            post(orders::add_dishes)
                .get(orders::read_lines)
                .delete(orders::delete_lines),
        )
        .route(
            "/orders/:order_id/dishes/:dish_id/status",
            patch(orders::advance_line),
        )
        .route(
            "/orders/:order_id/dishes/:dish_id/rating/:rating_id",
            patch(orders::rate_line),
        )
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
        }),
    )
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a path segment holding one id or a comma-separated id list
/// ("7" or "3,5,8"). `None` = not a usable id list.
pub(crate) fn parse_id_list(raw: &str) -> Option<Vec<i64>> {
    if raw.trim().is_empty() {
        return None;
    }
    raw.split(',')
        .map(|part| part.trim().parse::<i64>().ok())
        .collect()
}

/// Map an advance outcome onto the wire: 200 with the updated entity,
/// 202 while the other party owns the step, 400 once the walk is exhausted.
/// Waiting and exhausted responses both name the entity's current status.
pub(crate) fn advance_response<T: Serialize>(
    kind: &str,
    role: ActingRole,
    out: AdvanceOutcome<T>,
) -> Result<Response, ApiError> {
    match out {
        AdvanceOutcome::Advanced { entity, .. } => {
            Ok((StatusCode::OK, Json(entity)).into_response())
        }
        AdvanceOutcome::Pending { current } => {
            let other = match role {
                ActingRole::Customer => "the vendor",
                ActingRole::Vendor => "the customer",
            };
            Ok((
                StatusCode::ACCEPTED,
                Json(PendingBody {
                    status: "Pending".to_string(),
                    message: format!(
                        "Please wait for {other} to act; the {kind} is currently {}.",
                        current.name
                    ),
                }),
            )
                .into_response())
        }
        AdvanceOutcome::Invalid { current } => Ok((
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: "Invalid request".to_string(),
                message: format!("Cannot change {kind} status after {}", current.name),
            }),
        )
            .into_response()),
        AdvanceOutcome::NotFound => Err(ApiError::NotFound(format!(
            "{kind} not found, or unauthorized.",
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_id_list;

    #[test]
    fn id_list_parsing() {
        assert_eq!(parse_id_list("7"), Some(vec![7]));
        assert_eq!(parse_id_list("3,5,8"), Some(vec![3, 5, 8]));
        assert_eq!(parse_id_list(" 3 , 5 "), Some(vec![3, 5]));
        assert_eq!(parse_id_list(""), None);
        assert_eq!(parse_id_list("abc"), None);
        assert_eq!(parse_id_list("3,x"), None);
    }
}
