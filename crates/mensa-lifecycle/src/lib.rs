//! Order-lifecycle core: status ladders and the transition walk.
//!
//! An order (and, independently, each line within an order) moves along a
//! fixed, seeded sequence of statuses, a *ladder*. Each rung carries a flag
//! saying whether the step **into** it belongs to the vendor or to the
//! customer. The only legal move is one rung forward, made by the party that
//! owns that step; there is no reject, skip, or rollback.
//!
//! This crate is pure: it knows nothing about HTTP or the database. Callers
//! load a ladder (freshly, after seeding) and hand it to [`advance`] together
//! with the entity's current rung and the role the request is acting in.

pub mod ladder;
pub mod transition;

pub use ladder::{Ladder, LadderDomain, StatusDef, StatusName};
pub use transition::{advance, ActingRole, NextStatus};
