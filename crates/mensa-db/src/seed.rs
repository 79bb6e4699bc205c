//! Idempotent seeding of the static tables: roles, ratings, and both status
//! ladders.
//!
//! Invoked explicitly at daemon startup and by `mensa db seed`, never as a
//! side effect of module load. Everything runs in one transaction: a partial
//! failure rolls back to zero rows, so a retry starts clean. A table that
//! already has rows is left untouched.

use anyhow::{Context, Result};
use mensa_lifecycle::LadderDomain;
use sqlx::{PgConnection, PgPool};

/// Scores offered to customers when rating a delivered line.
/// Historical seed set: 3 is absent and 4 doubled; kept as-is.
const RATING_SCORES: [i32; 6] = [0, 1, 2, 4, 4, 5];

/// Which tables this run actually populated (false = already seeded).
#[derive(Debug, Clone, Copy, Default)]
pub struct SeedOutcome {
    pub roles: bool,
    pub ratings: bool,
    pub order_statuses: bool,
    pub order_dish_statuses: bool,
}

impl SeedOutcome {
    pub fn inserted_anything(&self) -> bool {
        self.roles || self.ratings || self.order_statuses || self.order_dish_statuses
    }
}

/// Seed all static tables. Safe to call on every boot.
pub async fn seed_static_tables(pool: &PgPool) -> Result<SeedOutcome> {
    let mut tx = pool.begin().await.context("seed: begin failed")?;

    let outcome = SeedOutcome {
        roles: seed_roles(&mut *tx).await?,
        ratings: seed_ratings(&mut *tx).await?,
        order_statuses: seed_ladder(&mut *tx, LadderDomain::Order).await?,
        order_dish_statuses: seed_ladder(&mut *tx, LadderDomain::OrderLine).await?,
    };

    tx.commit().await.context("seed: commit failed")?;
    Ok(outcome)
}

async fn seed_roles(conn: &mut PgConnection) -> Result<bool> {
    if !table_is_empty(conn, "roles").await? {
        return Ok(false);
    }

    sqlx::query("insert into roles (name) values ('Admin'), ('Vendor'), ('Customer')")
        .execute(&mut *conn)
        .await
        .context("seed roles failed")?;

    Ok(true)
}

async fn seed_ratings(conn: &mut PgConnection) -> Result<bool> {
    if !table_is_empty(conn, "ratings").await? {
        return Ok(false);
    }

    for score in RATING_SCORES {
        sqlx::query("insert into ratings (score) values ($1)")
            .bind(score)
            .execute(&mut *conn)
            .await
            .context("seed ratings failed")?;
    }

    Ok(true)
}

/// Insert the canonical rung sequence for one ladder, in order, so ascending
/// id reproduces ladder order.
async fn seed_ladder(conn: &mut PgConnection, domain: LadderDomain) -> Result<bool> {
    let table = match domain {
        LadderDomain::Order => "order_statuses",
        LadderDomain::OrderLine => "order_dish_statuses",
    };

    if !table_is_empty(conn, table).await? {
        return Ok(false);
    }

    for (name, is_vendor_controlled) in domain.canonical_rungs() {
        let sql = match domain {
            LadderDomain::Order => {
                "insert into order_statuses (name, is_vendor_controlled) values ($1, $2)"
            }
            LadderDomain::OrderLine => {
                "insert into order_dish_statuses (name, is_vendor_controlled) values ($1, $2)"
            }
        };
        sqlx::query(sql)
            .bind(name.as_str())
            .bind(is_vendor_controlled)
            .execute(&mut *conn)
            .await
            .with_context(|| format!("seed {table} failed at rung {name}"))?;
    }

    Ok(true)
}

async fn table_is_empty(conn: &mut PgConnection, table: &str) -> Result<bool> {
    // `table` is one of our own literals, never user input.
    let sql = format!("select count(*) from {table}");
    let (n,): (i64,) = sqlx::query_as(&sql)
        .fetch_one(&mut *conn)
        .await
        .with_context(|| format!("count {table} failed"))?;
    Ok(n == 0)
}
