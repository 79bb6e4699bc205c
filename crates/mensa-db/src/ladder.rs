//! Ladder loading: the seeded status sequences, in insertion (id) order.

use anyhow::{anyhow, Context, Result};
use mensa_lifecycle::{Ladder, LadderDomain, StatusDef, StatusName};
use sqlx::{postgres::PgRow, PgConnection, Row};

/// Load the full ordered ladder for a domain. Callers load this fresh inside
/// the unit of work that uses it; ladder rows never change after seeding.
pub async fn load_ladder(conn: &mut PgConnection, domain: LadderDomain) -> Result<Ladder> {
    let sql = match domain {
        LadderDomain::Order => {
            "select id, name, is_vendor_controlled from order_statuses order by id asc"
        }
        LadderDomain::OrderLine => {
            "select id, name, is_vendor_controlled from order_dish_statuses order by id asc"
        }
    };

    let rows = sqlx::query(sql)
        .fetch_all(&mut *conn)
        .await
        .with_context(|| format!("load_ladder({}) query failed", domain.as_str()))?;

    let mut rungs = Vec::with_capacity(rows.len());
    for row in &rows {
        rungs.push(status_def_from_row(row, "id", "name", "is_vendor_controlled")?);
    }

    Ok(Ladder::new(domain, rungs))
}

/// Map status columns out of a row. A name that does not parse means the
/// ladder rows were tampered with; surfaced as an error, never repaired.
pub(crate) fn status_def_from_row(
    row: &PgRow,
    id_col: &str,
    name_col: &str,
    flag_col: &str,
) -> Result<StatusDef> {
    let id: i64 = row.try_get(id_col)?;
    let name_s: String = row.try_get(name_col)?;
    let name = StatusName::parse(&name_s)
        .ok_or_else(|| anyhow!("corrupt status row id={id}: unknown name {name_s:?}"))?;
    Ok(StatusDef {
        id,
        name,
        is_vendor_controlled: row.try_get(flag_col)?,
    })
}
