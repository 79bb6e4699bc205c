//! User self-service handlers: registration, profile, and role switching.
//! The identity provider owns credentials and email; the only locally
//! editable profile field is the display name.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;

use crate::{
    api_types::{UpdateUserRequest, UserProfileResponse, UserRoleResponse},
    auth::require_identity,
    error::ApiError,
    state::AppState,
};

// ---------------------------------------------------------------------------
// POST /auth/register
// ---------------------------------------------------------------------------

pub(crate) async fn register(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let ident = require_identity(&st, &headers).await?;

    let mut tx = st.db.begin().await?;
    let user =
        mensa_db::users::register_user(&mut *tx, &ident.sub, &ident.email, &ident.name)
            .await?;
    tx.commit().await?;

    info!(user_id = user.id, "user registered");
    Ok((StatusCode::CREATED, Json(user)).into_response())
}

// ---------------------------------------------------------------------------
// GET /api/user
// ---------------------------------------------------------------------------

pub(crate) async fn read_user(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let ident = require_identity(&st, &headers).await?;

    let mut tx = st.db.begin().await?;
    let user = mensa_db::users::find_user_by_sub(&mut *tx, &ident.sub).await?;
    tx.commit().await?;

    let Some(user) = user else {
        return Err(ApiError::Unauthorized("No user exists.".to_string()));
    };

    Ok((
        StatusCode::OK,
        Json(UserProfileResponse {
            name: user.name,
            email: user.email,
        }),
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// PATCH /api/user
// ---------------------------------------------------------------------------

pub(crate) async fn update_user(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Response, ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Invalid request, missing body parameters".to_string(),
        ));
    }

    let ident = require_identity(&st, &headers).await?;

    let mut tx = st.db.begin().await?;
    let user = mensa_db::users::update_user_name(&mut *tx, &ident.sub, &body.name).await?;
    tx.commit().await?;

    match user {
        Some(user) => Ok((StatusCode::OK, Json(user)).into_response()),
        None => Err(ApiError::Unauthorized("No user exists.".to_string())),
    }
}

// ---------------------------------------------------------------------------
// DELETE /api/user
// ---------------------------------------------------------------------------

pub(crate) async fn delete_user(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let ident = require_identity(&st, &headers).await?;

    let mut tx = st.db.begin().await?;
    let deleted = match mensa_db::users::delete_user(&mut *tx, &ident.sub).await {
        Ok(d) => d,
        Err(e) => {
            if e.downcast_ref::<sqlx::Error>()
                .map(mensa_db::is_foreign_key_violation)
                .unwrap_or(false)
            {
                return Err(ApiError::Conflict(
                    "User still owns orders or a store; remove those first.".to_string(),
                ));
            }
            return Err(e.into());
        }
    };
    tx.commit().await?;

    if !deleted {
        return Err(ApiError::NotFound("Not Found".to_string()));
    }

    info!(sub = %ident.sub, "user deleted");
    Ok(StatusCode::OK.into_response())
}

// ---------------------------------------------------------------------------
// GET /api/user/role
// ---------------------------------------------------------------------------

pub(crate) async fn read_role(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let ident = require_identity(&st, &headers).await?;

    let mut tx = st.db.begin().await?;
    let role = mensa_db::users::find_role_of_sub(&mut *tx, &ident.sub).await?;
    tx.commit().await?;

    match role {
        Some(role) => Ok((
            StatusCode::OK,
            Json(UserRoleResponse { role: role.name }),
        )
            .into_response()),
        None => Err(ApiError::Unauthorized("No role exists.".to_string())),
    }
}

// ---------------------------------------------------------------------------
// PATCH /api/user/role/:role_id
// ---------------------------------------------------------------------------

pub(crate) async fn update_role(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(role_id): Path<i64>,
) -> Result<Response, ApiError> {
    let ident = require_identity(&st, &headers).await?;

    let mut tx = st.db.begin().await?;

    let current = mensa_db::users::find_role_of_sub(&mut *tx, &ident.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("No role exists.".to_string()))?;

    let requested = mensa_db::users::find_role_by_id(&mut *tx, role_id)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Invalid roleId".to_string()))?;

    if requested.id == current.id {
        return Err(ApiError::Conflict(format!(
            "Role unchanged; current role is already {}.",
            current.name
        )));
    }

    let user = mensa_db::users::update_user_role(&mut *tx, &ident.sub, requested.id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("No user exists.".to_string()))?;

    tx.commit().await?;

    info!(user_id = user.id, role = %requested.name, "user role updated");
    Ok((StatusCode::OK, Json(user)).into_response())
}
