//! Customer-side handlers: carts, order lines, the customer-acting status
//! advances, and ratings.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;

use crate::{
    auth::require_identity,
    error::ApiError,
    routes::{advance_response, parse_id_list},
    state::AppState,
};
use mensa_db::orders::{AddDishes, DeleteOrder, RateLine};
use mensa_lifecycle::ActingRole;

// ---------------------------------------------------------------------------
// POST /api/orders
// ---------------------------------------------------------------------------

/// Open a cart: a fresh order on the first rung of the order ladder.
pub(crate) async fn create_order(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let ident = require_identity(&st, &headers).await?;

    let mut tx = st.db.begin().await?;
    let order = mensa_db::orders::insert_order(&mut *tx, &ident.sub).await?;
    tx.commit().await?;

    match order {
        Some(order) => {
            info!(order_id = order.id, "order created");
            Ok((StatusCode::CREATED, Json(order)).into_response())
        }
        None => Err(ApiError::Unauthorized(
            "Unauthorized. Please sign in or register.".to_string(),
        )),
    }
}

// ---------------------------------------------------------------------------
// GET /api/orders/:order_id  (accepts a comma-separated id list)
// ---------------------------------------------------------------------------

pub(crate) async fn read_orders(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(order_ids): Path<String>,
) -> Result<Response, ApiError> {
    let ids = parse_id_list(&order_ids).ok_or_else(|| {
        ApiError::BadRequest("Invalid or missing orderId parameter".to_string())
    })?;

    let ident = require_identity(&st, &headers).await?;

    let mut tx = st.db.begin().await?;
    let orders = mensa_db::orders::find_orders(&mut *tx, &ident.sub, &ids).await?;
    tx.commit().await?;

    if orders.is_empty() {
        return Err(ApiError::NotFound("Order(s) not found".to_string()));
    }
    Ok((StatusCode::OK, Json(orders)).into_response())
}

// ---------------------------------------------------------------------------
// DELETE /api/orders/:order_id
// ---------------------------------------------------------------------------

/// Destroy a cart. Once the order leaves the cart rung it is part of the
/// cooperative walk and can no longer be deleted.
pub(crate) async fn delete_order(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(order_id): Path<i64>,
) -> Result<Response, ApiError> {
    let ident = require_identity(&st, &headers).await?;

    let mut tx = st.db.begin().await?;
    let out = mensa_db::orders::delete_order(&mut *tx, &ident.sub, order_id).await?;
    tx.commit().await?;

    match out {
        DeleteOrder::Deleted => {
            info!(order_id, "order deleted");
            Ok(StatusCode::OK.into_response())
        }
        DeleteOrder::NotFound => Err(ApiError::NotFound(format!(
            "Order not found with id:{order_id}"
        ))),
        DeleteOrder::NotInCart { current } => Err(ApiError::BadRequest(format!(
            "Cannot delete an order after {}; only carts can be deleted.",
            current.name
        ))),
    }
}

// ---------------------------------------------------------------------------
// PATCH /api/orders/:order_id/status
// ---------------------------------------------------------------------------

pub(crate) async fn advance_order(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(order_id): Path<i64>,
) -> Result<Response, ApiError> {
    let ident = require_identity(&st, &headers).await?;

    let mut tx = st.db.begin().await?;
    let out =
        mensa_db::orders::advance_order_as_customer(&mut *tx, &ident.sub, order_id).await?;
    tx.commit().await?;

    advance_response("order", ActingRole::Customer, out)
}

// ---------------------------------------------------------------------------
// POST /api/orders/:order_id/dishes/:dish_id  (comma list of dish ids)
// ---------------------------------------------------------------------------

pub(crate) async fn add_dishes(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((order_id, dish_ids)): Path<(i64, String)>,
) -> Result<Response, ApiError> {
    let ids = parse_id_list(&dish_ids)
        .ok_or_else(|| ApiError::BadRequest("Invalid or missing dishId parameter".to_string()))?;

    let ident = require_identity(&st, &headers).await?;

    let mut tx = st.db.begin().await?;
    let out = mensa_db::orders::add_dishes_to_order(&mut *tx, &ident.sub, order_id, &ids)
        .await?;
    tx.commit().await?;

    match out {
        AddDishes::Added(lines) => Ok((StatusCode::CREATED, Json(lines)).into_response()),
        AddDishes::OrderNotFound => Err(ApiError::NotFound(
            "Cannot find order. Please create an order first.".to_string(),
        )),
        AddDishes::NoDishes => Err(ApiError::NotFound(format!(
            "Dish with id: {dish_ids} not found or invalid."
        ))),
    }
}

// ---------------------------------------------------------------------------
// GET /api/orders/:order_id/dishes/:dish_id  (comma list of line ids)
// ---------------------------------------------------------------------------

pub(crate) async fn read_lines(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((order_id, line_ids)): Path<(i64, String)>,
) -> Result<Response, ApiError> {
    let ids = parse_id_list(&line_ids)
        .ok_or_else(|| ApiError::BadRequest("Invalid or missing parameters".to_string()))?;

    let ident = require_identity(&st, &headers).await?;

    let mut tx = st.db.begin().await?;
    let lines = mensa_db::orders::find_order_dishes(&mut *tx, &ident.sub, order_id, &ids)
        .await?;
    tx.commit().await?;

    if lines.is_empty() {
        return Err(ApiError::NotFound("Order Dish(es) not found".to_string()));
    }
    Ok((StatusCode::OK, Json(lines)).into_response())
}

// ---------------------------------------------------------------------------
// DELETE /api/orders/:order_id/dishes/:dish_id  (comma list of line ids)
// ---------------------------------------------------------------------------

pub(crate) async fn delete_lines(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((order_id, line_ids)): Path<(i64, String)>,
) -> Result<Response, ApiError> {
    let ids = parse_id_list(&line_ids)
        .ok_or_else(|| ApiError::BadRequest("Invalid request. Missing parameters".to_string()))?;

    let ident = require_identity(&st, &headers).await?;

    let mut tx = st.db.begin().await?;
    let removed =
        mensa_db::orders::delete_order_dishes(&mut *tx, &ident.sub, order_id, &ids).await?;
    tx.commit().await?;

    if removed == 0 {
        return Err(ApiError::NotFound(format!(
            "Order dish(es) invalid or not found with id(s):{line_ids}"
        )));
    }
    Ok(StatusCode::OK.into_response())
}

// ---------------------------------------------------------------------------
// PATCH /api/orders/:order_id/dishes/:dish_id/status
// ---------------------------------------------------------------------------

pub(crate) async fn advance_line(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((order_id, order_dish_id)): Path<(i64, i64)>,
) -> Result<Response, ApiError> {
    let ident = require_identity(&st, &headers).await?;

    let mut tx = st.db.begin().await?;
    let out = mensa_db::orders::advance_line_as_customer(
        &mut *tx,
        &ident.sub,
        order_id,
        order_dish_id,
    )
    .await?;
    tx.commit().await?;

    advance_response("order dish", ActingRole::Customer, out)
}

// ---------------------------------------------------------------------------
// PATCH /api/orders/:order_id/dishes/:dish_id/rating/:rating_id
// ---------------------------------------------------------------------------

pub(crate) async fn rate_line(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((order_id, order_dish_id, rating_id)): Path<(i64, i64, i64)>,
) -> Result<Response, ApiError> {
    let ident = require_identity(&st, &headers).await?;

    let mut tx = st.db.begin().await?;
    let out = mensa_db::orders::rate_line(
        &mut *tx,
        &ident.sub,
        order_id,
        order_dish_id,
        rating_id,
    )
    .await?;
    tx.commit().await?;

    match out {
        RateLine::Rated(line) => Ok((StatusCode::OK, Json(line)).into_response()),
        RateLine::NotFound => Err(ApiError::NotFound(
            "Order dish not found, or unauthorized.".to_string(),
        )),
        RateLine::NotDeliveredYet { current } => Err(ApiError::BadRequest(format!(
            "Cannot rate an order dish before delivery; it is currently {}.",
            current.name
        ))),
        RateLine::NoSuchRating => Err(ApiError::BadRequest("Invalid ratingId".to_string())),
    }
}
