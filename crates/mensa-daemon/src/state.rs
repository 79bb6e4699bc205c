//! Shared runtime state for mensa-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum; this module owns
//! nothing async itself.

use sqlx::PgPool;

use crate::auth::IdentityVerifier;

/// Static build metadata included in the health response.
#[derive(Clone, Debug)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

/// Cloneable (via Arc) handle shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Connection pool; every mutating handler opens its own transaction.
    pub db: PgPool,
    /// Bearer-token verification strategy.
    pub verifier: IdentityVerifier,
    pub build: BuildInfo,
}

impl AppState {
    pub fn new(db: PgPool, verifier: IdentityVerifier) -> Self {
        Self {
            db,
            verifier,
            build: BuildInfo {
                service: "mensa-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
        }
    }
}
