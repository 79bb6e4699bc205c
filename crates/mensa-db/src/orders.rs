//! Orders and order lines: CRUD plus the status-advance units of work.
//!
//! Every advance follows the same shape inside the caller's transaction:
//! load the ladder, lock the entity row (`SELECT ... FOR UPDATE`) together
//! with its current status, compute the next rung with
//! [`mensa_lifecycle::advance`], and persist only on `Advanced`. Two
//! concurrent attempts on one entity serialize on the row lock; the loser
//! re-reads the post-commit status and resolves to `Pending`/`Invalid`
//! instead of double-advancing.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use mensa_lifecycle::{advance, ActingRole, LadderDomain, NextStatus, StatusDef, StatusName};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, PgConnection, Row};

use crate::ladder::{load_ladder, status_def_from_row};

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRow {
    pub id: i64,
    pub user_id: i64,
    pub order_status_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDishRow {
    pub id: i64,
    pub order_id: i64,
    pub dish_id: i64,
    pub order_dish_status_id: i64,
    pub rating_id: Option<i64>,
}

fn order_from_row(row: &PgRow) -> Result<OrderRow> {
    Ok(OrderRow {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        order_status_id: row.try_get("order_status_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        delivered_at: row.try_get("delivered_at")?,
        completed_at: row.try_get("completed_at")?,
    })
}

fn order_dish_from_row(row: &PgRow) -> Result<OrderDishRow> {
    Ok(OrderDishRow {
        id: row.try_get("id")?,
        order_id: row.try_get("order_id")?,
        dish_id: row.try_get("dish_id")?,
        order_dish_status_id: row.try_get("order_dish_status_id")?,
        rating_id: row.try_get("rating_id")?,
    })
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of one advance unit of work, parameterized over the entity row.
#[derive(Debug, Clone)]
pub enum AdvanceOutcome<T> {
    /// Persisted; `entity` is the refreshed row.
    Advanced { entity: T, next: StatusDef },
    /// The next step belongs to the other party; nothing persisted.
    Pending { current: StatusDef },
    /// Terminal (or corrupt): no further transition from `current`.
    Invalid { current: StatusDef },
    /// Entity missing or not owned by the acting subject.
    NotFound,
}

#[derive(Debug, Clone)]
pub enum DeleteOrder {
    Deleted,
    NotFound,
    /// Orders can only be destroyed while still in the cart.
    NotInCart { current: StatusDef },
}

#[derive(Debug, Clone)]
pub enum AddDishes {
    Added(Vec<OrderDishRow>),
    OrderNotFound,
    /// No orderable dish matched: unknown ids, or all owned by the ordering
    /// subject's own store.
    NoDishes,
}

#[derive(Debug, Clone)]
pub enum RateLine {
    Rated(OrderDishRow),
    NotFound,
    /// Rating opens once the line has reached Eating/Delivered.
    NotDeliveredYet { current: StatusDef },
    NoSuchRating,
}

// ---------------------------------------------------------------------------
// Order CRUD
// ---------------------------------------------------------------------------

/// Open a cart: a new order on the first rung of the order ladder.
/// `None` = the subject has no user row.
pub async fn insert_order(conn: &mut PgConnection, sub: &str) -> Result<Option<OrderRow>> {
    let user: Option<(i64,)> = sqlx::query_as("select id from users where sub = $1")
        .bind(sub)
        .fetch_optional(&mut *conn)
        .await
        .context("insert_order: user lookup failed")?;

    let Some((user_id,)) = user else {
        return Ok(None);
    };

    let ladder = load_ladder(conn, LadderDomain::Order).await?;
    let first = ladder
        .first()
        .context("no order statuses seeded in datasource")?;

    let row = sqlx::query(
        r#"
        insert into orders (user_id, order_status_id)
        values ($1, $2)
        returning id, user_id, order_status_id, created_at, updated_at,
                  delivered_at, completed_at
        "#,
    )
    .bind(user_id)
    .bind(first.id)
    .fetch_one(&mut *conn)
    .await
    .context("insert_order failed")?;

    order_from_row(&row).map(Some)
}

pub async fn find_orders(
    conn: &mut PgConnection,
    sub: &str,
    order_ids: &[i64],
) -> Result<Vec<OrderRow>> {
    let rows = sqlx::query(
        r#"
        select o.id, o.user_id, o.order_status_id, o.created_at, o.updated_at,
               o.delivered_at, o.completed_at
        from orders o
        join users u on u.id = o.user_id
        where u.sub = $1 and o.id = any($2)
        order by o.id asc
        "#,
    )
    .bind(sub)
    .bind(order_ids)
    .fetch_all(&mut *conn)
    .await
    .context("find_orders failed")?;

    rows.iter().map(order_from_row).collect()
}

/// Delete an order the subject owns, but only while it still sits on the
/// first rung. Lines cascade.
pub async fn delete_order(conn: &mut PgConnection, sub: &str, order_id: i64) -> Result<DeleteOrder> {
    let ladder = load_ladder(conn, LadderDomain::Order).await?;

    let Some((order, current)) = lock_order_owned(conn, sub, order_id).await? else {
        return Ok(DeleteOrder::NotFound);
    };

    if ladder.position_of(current.id) != Some(0) {
        return Ok(DeleteOrder::NotInCart { current });
    }

    sqlx::query("delete from orders where id = $1")
        .bind(order.id)
        .execute(&mut *conn)
        .await
        .context("delete_order failed")?;

    Ok(DeleteOrder::Deleted)
}

// ---------------------------------------------------------------------------
// Order line CRUD
// ---------------------------------------------------------------------------

/// Add dishes (by id) to an owned order. Dishes sold by the subject's own
/// store are excluded; you cannot order from yourself. New lines start on
/// the first rung of the line ladder.
pub async fn add_dishes_to_order(
    conn: &mut PgConnection,
    sub: &str,
    order_id: i64,
    dish_ids: &[i64],
) -> Result<AddDishes> {
    let owned = find_orders(conn, sub, &[order_id]).await?;
    if owned.is_empty() {
        return Ok(AddDishes::OrderNotFound);
    }

    let dish_rows = sqlx::query(
        r#"
        select d.id
        from dishes d
        join vendors v on v.id = d.vendor_id
        join vendor_users vu on vu.id = v.vendor_user_id
        join users owner on owner.id = vu.user_id
        where d.id = any($1) and owner.sub <> $2
        order by d.id asc
        "#,
    )
    .bind(dish_ids)
    .bind(sub)
    .fetch_all(&mut *conn)
    .await
    .context("add_dishes_to_order: dish lookup failed")?;

    if dish_rows.is_empty() {
        return Ok(AddDishes::NoDishes);
    }

    let ladder = load_ladder(conn, LadderDomain::OrderLine).await?;
    let first = ladder
        .first()
        .context("no order dish statuses seeded in datasource")?;

    let mut lines = Vec::with_capacity(dish_rows.len());
    for dish in &dish_rows {
        let dish_id: i64 = dish.try_get("id")?;
        let row = sqlx::query(
            r#"
            insert into order_dishes (order_id, dish_id, order_dish_status_id)
            values ($1, $2, $3)
            returning id, order_id, dish_id, order_dish_status_id, rating_id
            "#,
        )
        .bind(order_id)
        .bind(dish_id)
        .bind(first.id)
        .fetch_one(&mut *conn)
        .await
        .context("add_dishes_to_order: insert failed")?;
        lines.push(order_dish_from_row(&row)?);
    }

    Ok(AddDishes::Added(lines))
}

pub async fn find_order_dishes(
    conn: &mut PgConnection,
    sub: &str,
    order_id: i64,
    order_dish_ids: &[i64],
) -> Result<Vec<OrderDishRow>> {
    let rows = sqlx::query(
        r#"
        select od.id, od.order_id, od.dish_id, od.order_dish_status_id, od.rating_id
        from order_dishes od
        join orders o on o.id = od.order_id
        join users u on u.id = o.user_id
        where u.sub = $1 and od.order_id = $2 and od.id = any($3)
        order by od.id asc
        "#,
    )
    .bind(sub)
    .bind(order_id)
    .bind(order_dish_ids)
    .fetch_all(&mut *conn)
    .await
    .context("find_order_dishes failed")?;

    rows.iter().map(order_dish_from_row).collect()
}

pub async fn delete_order_dishes(
    conn: &mut PgConnection,
    sub: &str,
    order_id: i64,
    order_dish_ids: &[i64],
) -> Result<u64> {
    let done = sqlx::query(
        r#"
        delete from order_dishes od
        using orders o, users u
        where od.id = any($3)
          and od.order_id = $2
          and o.id = od.order_id
          and u.id = o.user_id
          and u.sub = $1
        "#,
    )
    .bind(sub)
    .bind(order_id)
    .bind(order_dish_ids)
    .execute(&mut *conn)
    .await
    .context("delete_order_dishes failed")?;

    Ok(done.rows_affected())
}

/// Lines that touch one of the vendor's dishes: the vendor's work queue.
pub async fn find_vendor_order_dishes(
    conn: &mut PgConnection,
    sub: &str,
    vendor_id: i64,
) -> Result<Vec<OrderDishRow>> {
    let rows = sqlx::query(
        r#"
        select od.id, od.order_id, od.dish_id, od.order_dish_status_id, od.rating_id
        from order_dishes od
        join dishes d on d.id = od.dish_id
        join vendors v on v.id = d.vendor_id
        join vendor_users vu on vu.id = v.vendor_user_id
        join users u on u.id = vu.user_id
        where u.sub = $1 and v.id = $2
        order by od.id asc
        "#,
    )
    .bind(sub)
    .bind(vendor_id)
    .fetch_all(&mut *conn)
    .await
    .context("find_vendor_order_dishes failed")?;

    rows.iter().map(order_dish_from_row).collect()
}

// ---------------------------------------------------------------------------
// Row locks (read-for-update; the serialization point of every advance)
// ---------------------------------------------------------------------------

async fn lock_order_owned(
    conn: &mut PgConnection,
    sub: &str,
    order_id: i64,
) -> Result<Option<(OrderRow, StatusDef)>> {
    let row = sqlx::query(
        r#"
        select o.id, o.user_id, o.order_status_id, o.created_at, o.updated_at,
               o.delivered_at, o.completed_at,
               s.id as status_id, s.name as status_name, s.is_vendor_controlled
        from orders o
        join users u on u.id = o.user_id
        join order_statuses s on s.id = o.order_status_id
        where o.id = $1 and u.sub = $2
        for update of o
        "#,
    )
    .bind(order_id)
    .bind(sub)
    .fetch_optional(&mut *conn)
    .await
    .context("lock_order_owned failed")?;

    row.map(|r| {
        Ok::<_, anyhow::Error>((
            order_from_row(&r)?,
            status_def_from_row(&r, "status_id", "status_name", "is_vendor_controlled")?,
        ))
    })
    .transpose()
}

/// Lock an order for a vendor-acting subject: the vendor must be owned by
/// the subject and have at least one dish in the order.
async fn lock_order_for_vendor(
    conn: &mut PgConnection,
    sub: &str,
    vendor_id: i64,
    order_id: i64,
) -> Result<Option<(OrderRow, StatusDef)>> {
    let row = sqlx::query(
        r#"
        select o.id, o.user_id, o.order_status_id, o.created_at, o.updated_at,
               o.delivered_at, o.completed_at,
               s.id as status_id, s.name as status_name, s.is_vendor_controlled
        from orders o
        join order_statuses s on s.id = o.order_status_id
        where o.id = $1
          and exists (
              select 1
              from order_dishes od
              join dishes d on d.id = od.dish_id
              join vendors v on v.id = d.vendor_id
              join vendor_users vu on vu.id = v.vendor_user_id
              join users owner on owner.id = vu.user_id
              where od.order_id = o.id and v.id = $2 and owner.sub = $3
          )
        for update of o
        "#,
    )
    .bind(order_id)
    .bind(vendor_id)
    .bind(sub)
    .fetch_optional(&mut *conn)
    .await
    .context("lock_order_for_vendor failed")?;

    row.map(|r| {
        Ok::<_, anyhow::Error>((
            order_from_row(&r)?,
            status_def_from_row(&r, "status_id", "status_name", "is_vendor_controlled")?,
        ))
    })
    .transpose()
}

async fn lock_line_owned(
    conn: &mut PgConnection,
    sub: &str,
    order_id: i64,
    order_dish_id: i64,
) -> Result<Option<(OrderDishRow, StatusDef)>> {
    let row = sqlx::query(
        r#"
        select od.id, od.order_id, od.dish_id, od.order_dish_status_id, od.rating_id,
               s.id as status_id, s.name as status_name, s.is_vendor_controlled
        from order_dishes od
        join orders o on o.id = od.order_id
        join users u on u.id = o.user_id
        join order_dish_statuses s on s.id = od.order_dish_status_id
        where od.id = $1 and od.order_id = $2 and u.sub = $3
        for update of od
        "#,
    )
    .bind(order_dish_id)
    .bind(order_id)
    .bind(sub)
    .fetch_optional(&mut *conn)
    .await
    .context("lock_line_owned failed")?;

    row.map(|r| {
        Ok::<_, anyhow::Error>((
            order_dish_from_row(&r)?,
            status_def_from_row(&r, "status_id", "status_name", "is_vendor_controlled")?,
        ))
    })
    .transpose()
}

/// Lock a line for a vendor-acting subject: the line's dish must belong to a
/// vendor owned by the subject.
async fn lock_line_for_vendor(
    conn: &mut PgConnection,
    sub: &str,
    vendor_id: i64,
    order_dish_id: i64,
) -> Result<Option<(OrderDishRow, StatusDef)>> {
    let row = sqlx::query(
        r#"
        select od.id, od.order_id, od.dish_id, od.order_dish_status_id, od.rating_id,
               s.id as status_id, s.name as status_name, s.is_vendor_controlled
        from order_dishes od
        join dishes d on d.id = od.dish_id
        join vendors v on v.id = d.vendor_id
        join vendor_users vu on vu.id = v.vendor_user_id
        join users u on u.id = vu.user_id
        join order_dish_statuses s on s.id = od.order_dish_status_id
        where od.id = $1 and v.id = $2 and u.sub = $3
        for update of od
        "#,
    )
    .bind(order_dish_id)
    .bind(vendor_id)
    .bind(sub)
    .fetch_optional(&mut *conn)
    .await
    .context("lock_line_for_vendor failed")?;

    row.map(|r| {
        Ok::<_, anyhow::Error>((
            order_dish_from_row(&r)?,
            status_def_from_row(&r, "status_id", "status_name", "is_vendor_controlled")?,
        ))
    })
    .transpose()
}

// ---------------------------------------------------------------------------
// Status persistence
// ---------------------------------------------------------------------------

async fn persist_order_status(
    conn: &mut PgConnection,
    order_id: i64,
    next: &StatusDef,
) -> Result<OrderRow> {
    let row = sqlx::query(
        r#"
        update orders
        set order_status_id = $2,
            updated_at = now(),
            delivered_at = case when $3 then now() else delivered_at end,
            completed_at = case when $4 then now() else completed_at end
        where id = $1
        returning id, user_id, order_status_id, created_at, updated_at,
                  delivered_at, completed_at
        "#,
    )
    .bind(order_id)
    .bind(next.id)
    .bind(next.name == StatusName::Delivered)
    .bind(next.name == StatusName::Complete)
    .fetch_one(&mut *conn)
    .await
    .context("persist_order_status failed")?;

    order_from_row(&row)
}

async fn persist_line_status(
    conn: &mut PgConnection,
    order_dish_id: i64,
    next: &StatusDef,
) -> Result<OrderDishRow> {
    let row = sqlx::query(
        r#"
        update order_dishes
        set order_dish_status_id = $2
        where id = $1
        returning id, order_id, dish_id, order_dish_status_id, rating_id
        "#,
    )
    .bind(order_dish_id)
    .bind(next.id)
    .fetch_one(&mut *conn)
    .await
    .context("persist_line_status failed")?;

    order_dish_from_row(&row)
}

// ---------------------------------------------------------------------------
// Advance units of work
// ---------------------------------------------------------------------------

pub async fn advance_order_as_customer(
    conn: &mut PgConnection,
    sub: &str,
    order_id: i64,
) -> Result<AdvanceOutcome<OrderRow>> {
    let ladder = load_ladder(conn, LadderDomain::Order).await?;

    let Some((order, current)) = lock_order_owned(conn, sub, order_id).await? else {
        return Ok(AdvanceOutcome::NotFound);
    };

    match advance(&current, &ladder, ActingRole::Customer) {
        NextStatus::Advanced(next) => {
            let entity = persist_order_status(conn, order.id, &next).await?;
            Ok(AdvanceOutcome::Advanced { entity, next })
        }
        NextStatus::Pending => Ok(AdvanceOutcome::Pending { current }),
        NextStatus::Invalid => Ok(AdvanceOutcome::Invalid { current }),
    }
}

pub async fn advance_order_as_vendor(
    conn: &mut PgConnection,
    sub: &str,
    vendor_id: i64,
    order_id: i64,
) -> Result<AdvanceOutcome<OrderRow>> {
    let ladder = load_ladder(conn, LadderDomain::Order).await?;

    let Some((order, current)) = lock_order_for_vendor(conn, sub, vendor_id, order_id).await?
    else {
        return Ok(AdvanceOutcome::NotFound);
    };

    match advance(&current, &ladder, ActingRole::Vendor) {
        NextStatus::Advanced(next) => {
            let entity = persist_order_status(conn, order.id, &next).await?;
            Ok(AdvanceOutcome::Advanced { entity, next })
        }
        NextStatus::Pending => Ok(AdvanceOutcome::Pending { current }),
        NextStatus::Invalid => Ok(AdvanceOutcome::Invalid { current }),
    }
}

pub async fn advance_line_as_customer(
    conn: &mut PgConnection,
    sub: &str,
    order_id: i64,
    order_dish_id: i64,
) -> Result<AdvanceOutcome<OrderDishRow>> {
    let ladder = load_ladder(conn, LadderDomain::OrderLine).await?;

    let Some((line, current)) = lock_line_owned(conn, sub, order_id, order_dish_id).await? else {
        return Ok(AdvanceOutcome::NotFound);
    };

    match advance(&current, &ladder, ActingRole::Customer) {
        NextStatus::Advanced(next) => {
            let entity = persist_line_status(conn, line.id, &next).await?;
            Ok(AdvanceOutcome::Advanced { entity, next })
        }
        NextStatus::Pending => Ok(AdvanceOutcome::Pending { current }),
        NextStatus::Invalid => Ok(AdvanceOutcome::Invalid { current }),
    }
}

pub async fn advance_line_as_vendor(
    conn: &mut PgConnection,
    sub: &str,
    vendor_id: i64,
    order_dish_id: i64,
) -> Result<AdvanceOutcome<OrderDishRow>> {
    let ladder = load_ladder(conn, LadderDomain::OrderLine).await?;

    let Some((line, current)) = lock_line_for_vendor(conn, sub, vendor_id, order_dish_id).await?
    else {
        return Ok(AdvanceOutcome::NotFound);
    };

    match advance(&current, &ladder, ActingRole::Vendor) {
        NextStatus::Advanced(next) => {
            let entity = persist_line_status(conn, line.id, &next).await?;
            Ok(AdvanceOutcome::Advanced { entity, next })
        }
        NextStatus::Pending => Ok(AdvanceOutcome::Pending { current }),
        NextStatus::Invalid => Ok(AdvanceOutcome::Invalid { current }),
    }
}

// ---------------------------------------------------------------------------
// Ratings
// ---------------------------------------------------------------------------

/// Attach one of the seeded rating rows to an owned line. Opens once the
/// line has reached Eating/Delivered.
pub async fn rate_line(
    conn: &mut PgConnection,
    sub: &str,
    order_id: i64,
    order_dish_id: i64,
    rating_id: i64,
) -> Result<RateLine> {
    let ladder = load_ladder(conn, LadderDomain::OrderLine).await?;

    let Some((line, current)) = lock_line_owned(conn, sub, order_id, order_dish_id).await? else {
        return Ok(RateLine::NotFound);
    };

    if ladder.is_at_or_past(current.id, StatusName::Delivered) != Some(true) {
        return Ok(RateLine::NotDeliveredYet { current });
    }

    let rating: Option<(i64,)> = sqlx::query_as("select id from ratings where id = $1")
        .bind(rating_id)
        .fetch_optional(&mut *conn)
        .await
        .context("rate_line: rating lookup failed")?;

    if rating.is_none() {
        return Ok(RateLine::NoSuchRating);
    }

    let row = sqlx::query(
        r#"
        update order_dishes
        set rating_id = $2
        where id = $1
        returning id, order_id, dish_id, order_dish_status_id, rating_id
        "#,
    )
    .bind(line.id)
    .bind(rating_id)
    .fetch_one(&mut *conn)
    .await
    .context("rate_line: update failed")?;

    order_dish_from_row(&row).map(RateLine::Rated)
}
