//! Vendor-side handlers: store and dish management plus fulfillment
//! (the vendor's view of incoming lines and the vendor-acting advances).

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;

use crate::{
    api_types::{CreateVendorRequest, DishRequest, UpdateVendorRequest},
    auth::require_identity,
    error::ApiError,
    routes::{advance_response, parse_id_list},
    state::AppState,
};
use mensa_db::vendors::VendorCreate;
use mensa_lifecycle::ActingRole;

// ---------------------------------------------------------------------------
// POST /api/vendor
// ---------------------------------------------------------------------------

pub(crate) async fn create_vendor(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateVendorRequest>,
) -> Result<Response, ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Invalid request, missing body parameters".to_string(),
        ));
    }

    let ident = require_identity(&st, &headers).await?;

    let mut tx = st.db.begin().await?;
    let out = mensa_db::vendors::create_vendor(&mut *tx, &ident.sub, &body.name).await?;
    tx.commit().await?;

    match out {
        VendorCreate::Created(vendor) => {
            info!(vendor_id = vendor.id, "vendor created");
            Ok((StatusCode::CREATED, Json(vendor)).into_response())
        }
        VendorCreate::NoUser => Err(ApiError::Unauthorized("User not found".to_string())),
        VendorCreate::DuplicateStore => Err(ApiError::Conflict(
            "Duplicate entry. Only one store allowed per user.".to_string(),
        )),
    }
}

// ---------------------------------------------------------------------------
// GET /api/vendor/:vendor_id  (accepts a comma-separated id list)
// ---------------------------------------------------------------------------

pub(crate) async fn read_vendors(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(vendor_ids): Path<String>,
) -> Result<Response, ApiError> {
    let ids = parse_id_list(&vendor_ids)
        .ok_or_else(|| ApiError::BadRequest("Invalid vendorId parameter".to_string()))?;

    let ident = require_identity(&st, &headers).await?;

    let mut tx = st.db.begin().await?;
    let vendors = mensa_db::vendors::find_vendors_owned(&mut *tx, &ident.sub, &ids).await?;
    tx.commit().await?;

    if vendors.is_empty() {
        return Err(ApiError::NotFound("Vendor not found".to_string()));
    }
    Ok((StatusCode::OK, Json(vendors)).into_response())
}

// ---------------------------------------------------------------------------
// PATCH /api/vendor/:vendor_id
// ---------------------------------------------------------------------------

pub(crate) async fn update_vendor(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(vendor_id): Path<i64>,
    Json(body): Json<UpdateVendorRequest>,
) -> Result<Response, ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Invalid request, missing body parameters".to_string(),
        ));
    }

    let ident = require_identity(&st, &headers).await?;

    let mut tx = st.db.begin().await?;
    let vendor =
        mensa_db::vendors::update_vendor_name(&mut *tx, &ident.sub, vendor_id, &body.name)
            .await?;
    tx.commit().await?;

    match vendor {
        Some(vendor) => Ok((StatusCode::OK, Json(vendor)).into_response()),
        None => Err(ApiError::NotFound("Not Found".to_string())),
    }
}

// ---------------------------------------------------------------------------
// DELETE /api/vendor/:vendor_id
// ---------------------------------------------------------------------------

pub(crate) async fn delete_vendor(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(vendor_id): Path<i64>,
) -> Result<Response, ApiError> {
    let ident = require_identity(&st, &headers).await?;

    let mut tx = st.db.begin().await?;
    let deleted = match mensa_db::vendors::delete_vendor(&mut *tx, &ident.sub, vendor_id).await
    {
        Ok(d) => d,
        Err(e) => {
            if e.downcast_ref::<sqlx::Error>()
                .map(mensa_db::is_foreign_key_violation)
                .unwrap_or(false)
            {
                return Err(ApiError::Conflict(
                    "Vendor still has dishes; remove those first.".to_string(),
                ));
            }
            return Err(e.into());
        }
    };
    tx.commit().await?;

    if !deleted {
        return Err(ApiError::NotFound("Not Found".to_string()));
    }

    info!(vendor_id, "vendor deleted");
    Ok(StatusCode::OK.into_response())
}

// ---------------------------------------------------------------------------
// POST /api/vendor/:vendor_id/dishes
// ---------------------------------------------------------------------------

pub(crate) async fn create_dish(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(vendor_id): Path<i64>,
    Json(body): Json<DishRequest>,
) -> Result<Response, ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Invalid Request. Missing name field in request.".to_string(),
        ));
    }
    if body.price_cents < 0 {
        return Err(ApiError::BadRequest(
            "Invalid Request. Price must not be negative.".to_string(),
        ));
    }

    let ident = require_identity(&st, &headers).await?;

    let mut tx = st.db.begin().await?;
    let dish = mensa_db::vendors::insert_dish(
        &mut *tx,
        &ident.sub,
        vendor_id,
        &body.name,
        body.price_cents,
    )
    .await?;
    tx.commit().await?;

    match dish {
        Some(dish) => Ok((StatusCode::CREATED, Json(dish)).into_response()),
        None => Err(ApiError::NotFound(
            "Vendor Not Found. Please create a vendor first.".to_string(),
        )),
    }
}

// ---------------------------------------------------------------------------
// GET /api/vendor/:vendor_id/dishes/:dish_id  (comma list)
// ---------------------------------------------------------------------------

pub(crate) async fn read_dishes(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((vendor_id, dish_ids)): Path<(i64, String)>,
) -> Result<Response, ApiError> {
    let ids = parse_id_list(&dish_ids)
        .ok_or_else(|| ApiError::BadRequest("Invalid or missing dishId parameter".to_string()))?;

    let ident = require_identity(&st, &headers).await?;

    let mut tx = st.db.begin().await?;
    let dishes = mensa_db::vendors::find_dishes(&mut *tx, &ident.sub, vendor_id, &ids).await?;
    tx.commit().await?;

    if dishes.is_empty() {
        return Err(ApiError::NotFound("Dishes not found".to_string()));
    }
    Ok((StatusCode::OK, Json(dishes)).into_response())
}

// ---------------------------------------------------------------------------
// PATCH /api/vendor/:vendor_id/dishes/:dish_id
// ---------------------------------------------------------------------------

pub(crate) async fn update_dish(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((vendor_id, dish_id)): Path<(i64, i64)>,
    Json(body): Json<DishRequest>,
) -> Result<Response, ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Invalid request, missing body parameters".to_string(),
        ));
    }
    if body.price_cents < 0 {
        return Err(ApiError::BadRequest(
            "Invalid Request. Price must not be negative.".to_string(),
        ));
    }

    let ident = require_identity(&st, &headers).await?;

    let mut tx = st.db.begin().await?;
    let dish = mensa_db::vendors::update_dish(
        &mut *tx,
        &ident.sub,
        vendor_id,
        dish_id,
        &body.name,
        body.price_cents,
    )
    .await?;
    tx.commit().await?;

    match dish {
        Some(dish) => Ok((StatusCode::OK, Json(dish)).into_response()),
        None => Err(ApiError::NotFound(
            "Dish not found, or unauthorized.".to_string(),
        )),
    }
}

// ---------------------------------------------------------------------------
// DELETE /api/vendor/:vendor_id/dishes/:dish_id
// ---------------------------------------------------------------------------

pub(crate) async fn delete_dish(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((vendor_id, dish_id)): Path<(i64, i64)>,
) -> Result<Response, ApiError> {
    let ident = require_identity(&st, &headers).await?;

    let mut tx = st.db.begin().await?;
    let deleted =
        mensa_db::vendors::delete_dish(&mut *tx, &ident.sub, vendor_id, dish_id).await?;
    tx.commit().await?;

    if !deleted {
        return Err(ApiError::NotFound(format!(
            "Dish not found with id:{dish_id}"
        )));
    }
    Ok(StatusCode::OK.into_response())
}

// ---------------------------------------------------------------------------
// GET /api/vendor/:vendor_id/order-dishes
// ---------------------------------------------------------------------------

/// The vendor's work queue: every line that references one of its dishes.
pub(crate) async fn read_incoming_lines(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(vendor_id): Path<i64>,
) -> Result<Response, ApiError> {
    let ident = require_identity(&st, &headers).await?;

    let mut tx = st.db.begin().await?;
    if mensa_db::vendors::vendor_owned_by(&mut *tx, &ident.sub, vendor_id)
        .await?
        .is_none()
    {
        return Err(ApiError::NotFound("Vendor not found".to_string()));
    }
    let lines =
        mensa_db::orders::find_vendor_order_dishes(&mut *tx, &ident.sub, vendor_id).await?;
    tx.commit().await?;

    Ok((StatusCode::OK, Json(lines)).into_response())
}

// ---------------------------------------------------------------------------
// PATCH /api/vendor/:vendor_id/order-dishes/:order_dish_id/status
// ---------------------------------------------------------------------------

pub(crate) async fn advance_line(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((vendor_id, order_dish_id)): Path<(i64, i64)>,
) -> Result<Response, ApiError> {
    let ident = require_identity(&st, &headers).await?;

    let mut tx = st.db.begin().await?;
    let out = mensa_db::orders::advance_line_as_vendor(
        &mut *tx,
        &ident.sub,
        vendor_id,
        order_dish_id,
    )
    .await?;
    tx.commit().await?;

    advance_response("order dish", ActingRole::Vendor, out)
}

// ---------------------------------------------------------------------------
// PATCH /api/vendor/:vendor_id/orders/:order_id/status
// ---------------------------------------------------------------------------

/// Vendor-acting advance of a whole order. Permitted when the vendor has at
/// least one dish in the order.
pub(crate) async fn advance_order(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((vendor_id, order_id)): Path<(i64, i64)>,
) -> Result<Response, ApiError> {
    let ident = require_identity(&st, &headers).await?;

    let mut tx = st.db.begin().await?;
    let out =
        mensa_db::orders::advance_order_as_vendor(&mut *tx, &ident.sub, vendor_id, order_id)
            .await?;
    tx.commit().await?;

    advance_response("order", ActingRole::Vendor, out)
}
