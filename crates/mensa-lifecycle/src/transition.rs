//! The transition walk: who may move an entity one rung forward.
//!
//! # Design
//!
//! One rule carries the whole cooperative workflow: look up the entity's
//! current rung in its ladder, take the *single* next rung, and compare that
//! rung's `is_vendor_controlled` flag against the acting role.
//!
//! ```text
//! InCart ──customer──► Confirmed ──vendor──► Preparing ──vendor──► Queued
//!   ──vendor──► Delivering ──►* Delivered ──customer──► CleanUp
//!   ──customer──► Complete (terminal)
//! ```
//!
//! (*) The Delivered step is customer-owned on the Order ladder and
//! vendor-owned on the OrderLine ladder; the rule itself does not care, it
//! reads the flag off whichever ladder it was handed.
//!
//! "Blocked, waiting on the other party" and "no further transition" are
//! first-class results, not errors: callers surface them distinctly
//! (202 vs 400 at the HTTP layer).

use crate::ladder::{Ladder, StatusDef};

// ---------------------------------------------------------------------------
// ActingRole
// ---------------------------------------------------------------------------

/// The capacity the current request acts in, derived by the caller from
/// ownership (never stored on the entity): vendor-acting iff the subject
/// owns the vendor fulfilling the entity, customer-acting iff the subject
/// owns the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActingRole {
    Customer,
    Vendor,
}

impl ActingRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActingRole::Customer => "customer",
            ActingRole::Vendor => "vendor",
        }
    }
}

// ---------------------------------------------------------------------------
// NextStatus
// ---------------------------------------------------------------------------

/// Outcome of one advance attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStatus {
    /// The acting role owns the next step; callers persist the new rung.
    Advanced(StatusDef),
    /// The transition exists but belongs to the other party. Recoverable;
    /// retry after they act.
    Pending,
    /// No further transition: the current rung is terminal, or is not a
    /// member of the given ladder (corrupt reference).
    Invalid,
}

// ---------------------------------------------------------------------------
// advance
// ---------------------------------------------------------------------------

/// Compute the next rung for `current` on `ladder` when acted on by `role`.
///
/// `current` must come from the same domain as `ladder`; evaluating an order
/// status against the order-line ladder is a programming error upstream and
/// simply falls out as [`NextStatus::Invalid`] (the id will not be found).
///
/// The walk is strictly monotonic and single-step: there is no path that
/// skips a rung, moves backwards, or lets a role act on a step it does not
/// own.
pub fn advance(current: &StatusDef, ladder: &Ladder, role: ActingRole) -> NextStatus {
    let pos = match ladder.position_of(current.id) {
        Some(p) => p,
        None => return NextStatus::Invalid,
    };

    let next = match ladder.rungs().get(pos + 1) {
        Some(n) => n,
        None => return NextStatus::Invalid, // terminal rung
    };

    match (role, next.is_vendor_controlled) {
        (ActingRole::Vendor, true) | (ActingRole::Customer, false) => {
            NextStatus::Advanced(next.clone())
        }
        _ => NextStatus::Pending,
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
