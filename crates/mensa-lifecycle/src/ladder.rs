//! Status ladders: the two canonical rung sequences and their loaded form.
//!
//! Rung order is defined by insertion order at seed time, not by a rank
//! column. The seeder inserts [`LadderDomain::canonical_rungs`] in one batch,
//! so ascending row id reproduces the canonical sequence.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// StatusName
// ---------------------------------------------------------------------------

/// The eight statuses an order or order line walks through.
///
/// Display strings are the exact seeded names; `parse` accepts only those.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusName {
    /// Open cart, nothing committed yet.
    InCart,
    /// Customer paid / confirmed the order.
    Confirmed,
    Preparing,
    Queued,
    Delivering,
    /// Handed over to the customer.
    Delivered,
    CleanUp,
    /// Terminal.
    Complete,
}

impl StatusName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusName::InCart => "Pending/InCart",
            StatusName::Confirmed => "Paid/Confirmed",
            StatusName::Preparing => "Preparing",
            StatusName::Queued => "Queued",
            StatusName::Delivering => "Delivering",
            StatusName::Delivered => "Eating/Delivered",
            StatusName::CleanUp => "CleanUp",
            StatusName::Complete => "Complete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending/InCart" => Some(StatusName::InCart),
            "Paid/Confirmed" => Some(StatusName::Confirmed),
            "Preparing" => Some(StatusName::Preparing),
            "Queued" => Some(StatusName::Queued),
            "Delivering" => Some(StatusName::Delivering),
            "Eating/Delivered" => Some(StatusName::Delivered),
            "CleanUp" => Some(StatusName::CleanUp),
            "Complete" => Some(StatusName::Complete),
            _ => None,
        }
    }
}

impl std::fmt::Display for StatusName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// LadderDomain
// ---------------------------------------------------------------------------

/// Which ladder an entity lives on.
///
/// Whole orders and individual order lines progress independently, on
/// ladders of identical shape but separate identity spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LadderDomain {
    Order,
    OrderLine,
}

impl LadderDomain {
    /// The canonical seed sequence for this domain: `(name, is_vendor_controlled)`
    /// in ladder order.
    ///
    /// The two tables differ in exactly one flag: `Eating/Delivered` is
    /// customer-controlled on the Order ladder but vendor-controlled on the
    /// OrderLine ladder. That asymmetry is carried over from the production
    /// seed data as-is; unifying it is a product decision, not ours.
    pub fn canonical_rungs(&self) -> &'static [(StatusName, bool)] {
        match self {
            LadderDomain::Order => &[
                (StatusName::InCart, false),
                (StatusName::Confirmed, false),
                (StatusName::Preparing, true),
                (StatusName::Queued, true),
                (StatusName::Delivering, true),
                (StatusName::Delivered, false),
                (StatusName::CleanUp, false),
                (StatusName::Complete, false),
            ],
            LadderDomain::OrderLine => &[
                (StatusName::InCart, false),
                (StatusName::Confirmed, false),
                (StatusName::Preparing, true),
                (StatusName::Queued, true),
                (StatusName::Delivering, true),
                (StatusName::Delivered, true),
                (StatusName::CleanUp, false),
                (StatusName::Complete, false),
            ],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LadderDomain::Order => "order",
            LadderDomain::OrderLine => "order_line",
        }
    }
}

// ---------------------------------------------------------------------------
// StatusDef
// ---------------------------------------------------------------------------

/// One rung of a loaded ladder, with its seed-time row identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDef {
    pub id: i64,
    pub name: StatusName,
    /// True if only the vendor-acting party may advance an entity *into*
    /// this rung.
    pub is_vendor_controlled: bool,
}

// ---------------------------------------------------------------------------
// Ladder
// ---------------------------------------------------------------------------

/// A fully loaded ladder: the ordered rung sequence for one domain.
///
/// Callers must load this fresh for each unit of work; ladders are
/// read-only after seeding, so a fresh load is cheap and never stale.
#[derive(Debug, Clone)]
pub struct Ladder {
    domain: LadderDomain,
    rungs: Vec<StatusDef>,
}

impl Ladder {
    pub fn new(domain: LadderDomain, rungs: Vec<StatusDef>) -> Self {
        Self { domain, rungs }
    }

    pub fn domain(&self) -> LadderDomain {
        self.domain
    }

    pub fn rungs(&self) -> &[StatusDef] {
        &self.rungs
    }

    pub fn is_empty(&self) -> bool {
        self.rungs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rungs.len()
    }

    /// First rung: the status every freshly created entity starts on.
    pub fn first(&self) -> Option<&StatusDef> {
        self.rungs.first()
    }

    /// Position of a rung by row identity, or `None` if the id is not a
    /// member of this ladder.
    pub fn position_of(&self, status_id: i64) -> Option<usize> {
        self.rungs.iter().position(|r| r.id == status_id)
    }

    /// Look up a rung by row identity.
    pub fn get(&self, status_id: i64) -> Option<&StatusDef> {
        self.rungs.iter().find(|r| r.id == status_id)
    }

    /// Whether the given rung is on or past `at` in ladder order.
    /// Returns `None` when either id is not a member.
    pub fn is_at_or_past(&self, status_id: i64, at: StatusName) -> Option<bool> {
        let pos = self.position_of(status_id)?;
        let at_pos = self.rungs.iter().position(|r| r.name == at)?;
        Some(pos >= at_pos)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
