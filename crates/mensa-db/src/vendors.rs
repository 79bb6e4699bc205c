//! Vendors, the one-store-per-user link, and dish CRUD scoped to the owning
//! vendor.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, PgConnection, Row};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorRow {
    pub id: i64,
    pub name: String,
    pub vendor_user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DishRow {
    pub id: i64,
    pub vendor_id: i64,
    pub name: String,
    /// Integer cents.
    pub price_cents: i64,
}

fn vendor_from_row(row: &PgRow) -> Result<VendorRow> {
    Ok(VendorRow {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        vendor_user_id: row.try_get("vendor_user_id")?,
    })
}

fn dish_from_row(row: &PgRow) -> Result<DishRow> {
    Ok(DishRow {
        id: row.try_get("id")?,
        vendor_id: row.try_get("vendor_id")?,
        name: row.try_get("name")?,
        price_cents: row.try_get("price_cents")?,
    })
}

// ---------------------------------------------------------------------------
// Vendor CRUD
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum VendorCreate {
    Created(VendorRow),
    /// The subject has no user row yet.
    NoUser,
    /// One store per user; the subject already owns one.
    DuplicateStore,
}

pub async fn create_vendor(
    conn: &mut PgConnection,
    sub: &str,
    name: &str,
) -> Result<VendorCreate> {
    let user_id: Option<(i64,)> = sqlx::query_as("select id from users where sub = $1")
        .bind(sub)
        .fetch_optional(&mut *conn)
        .await
        .context("create_vendor: user lookup failed")?;

    let Some((user_id,)) = user_id else {
        return Ok(VendorCreate::NoUser);
    };

    let link = sqlx::query("insert into vendor_users (user_id) values ($1) returning id")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await;

    let link_id: i64 = match link {
        Ok(row) => row.try_get("id")?,
        // unique(user_id): the second store attempt loses.
        Err(e) if crate::is_unique_violation(&e, None) => {
            return Ok(VendorCreate::DuplicateStore)
        }
        Err(e) => return Err(anyhow::Error::new(e).context("create_vendor: link insert failed")),
    };

    let row = sqlx::query(
        r#"
        insert into vendors (name, vendor_user_id)
        values ($1, $2)
        returning id, name, vendor_user_id
        "#,
    )
    .bind(name)
    .bind(link_id)
    .fetch_one(&mut *conn)
    .await
    .context("create_vendor: vendor insert failed")?;

    let vendor = vendor_from_row(&row)?;

    sqlx::query("update vendor_users set vendor_id = $1 where id = $2")
        .bind(vendor.id)
        .bind(link_id)
        .execute(&mut *conn)
        .await
        .context("create_vendor: back-link failed")?;

    Ok(VendorCreate::Created(vendor))
}

pub async fn find_vendors_owned(
    conn: &mut PgConnection,
    sub: &str,
    vendor_ids: &[i64],
) -> Result<Vec<VendorRow>> {
    let rows = sqlx::query(
        r#"
        select v.id, v.name, v.vendor_user_id
        from vendors v
        join vendor_users vu on vu.id = v.vendor_user_id
        join users u on u.id = vu.user_id
        where u.sub = $1 and v.id = any($2)
        order by v.id asc
        "#,
    )
    .bind(sub)
    .bind(vendor_ids)
    .fetch_all(&mut *conn)
    .await
    .context("find_vendors_owned failed")?;

    rows.iter().map(vendor_from_row).collect()
}

/// Ownership check used when deriving the vendor-acting role.
pub async fn vendor_owned_by(
    conn: &mut PgConnection,
    sub: &str,
    vendor_id: i64,
) -> Result<Option<VendorRow>> {
    let mut found = find_vendors_owned(conn, sub, &[vendor_id]).await?;
    Ok(found.pop())
}

pub async fn update_vendor_name(
    conn: &mut PgConnection,
    sub: &str,
    vendor_id: i64,
    name: &str,
) -> Result<Option<VendorRow>> {
    let row = sqlx::query(
        r#"
        update vendors v
        set name = $3
        from vendor_users vu, users u
        where v.id = $2
          and vu.id = v.vendor_user_id
          and u.id = vu.user_id
          and u.sub = $1
        returning v.id, v.name, v.vendor_user_id
        "#,
    )
    .bind(sub)
    .bind(vendor_id)
    .bind(name)
    .fetch_optional(&mut *conn)
    .await
    .context("update_vendor_name failed")?;

    row.as_ref().map(vendor_from_row).transpose()
}

/// Delete the vendor and its owner link. Fails with a foreign-key violation
/// while dishes remain (RESTRICT); callers surface that as a conflict.
pub async fn delete_vendor(conn: &mut PgConnection, sub: &str, vendor_id: i64) -> Result<bool> {
    let Some(vendor) = vendor_owned_by(conn, sub, vendor_id).await? else {
        return Ok(false);
    };

    sqlx::query("update vendor_users set vendor_id = null where id = $1")
        .bind(vendor.vendor_user_id)
        .execute(&mut *conn)
        .await
        .context("delete_vendor: unlink failed")?;

    sqlx::query("delete from vendors where id = $1")
        .bind(vendor.id)
        .execute(&mut *conn)
        .await
        .context("delete_vendor: vendor delete failed")?;

    sqlx::query("delete from vendor_users where id = $1")
        .bind(vendor.vendor_user_id)
        .execute(&mut *conn)
        .await
        .context("delete_vendor: link delete failed")?;

    Ok(true)
}

// ---------------------------------------------------------------------------
// Dish CRUD (always scoped to the owning vendor)
// ---------------------------------------------------------------------------

/// Insert a dish for a vendor the subject owns. `None` = vendor not found or
/// not owned.
pub async fn insert_dish(
    conn: &mut PgConnection,
    sub: &str,
    vendor_id: i64,
    name: &str,
    price_cents: i64,
) -> Result<Option<DishRow>> {
    if vendor_owned_by(conn, sub, vendor_id).await?.is_none() {
        return Ok(None);
    }

    let row = sqlx::query(
        r#"
        insert into dishes (vendor_id, name, price_cents)
        values ($1, $2, $3)
        returning id, vendor_id, name, price_cents
        "#,
    )
    .bind(vendor_id)
    .bind(name)
    .bind(price_cents)
    .fetch_one(&mut *conn)
    .await
    .context("insert_dish failed")?;

    dish_from_row(&row).map(Some)
}

pub async fn find_dishes(
    conn: &mut PgConnection,
    sub: &str,
    vendor_id: i64,
    dish_ids: &[i64],
) -> Result<Vec<DishRow>> {
    let rows = sqlx::query(
        r#"
        select d.id, d.vendor_id, d.name, d.price_cents
        from dishes d
        join vendors v on v.id = d.vendor_id
        join vendor_users vu on vu.id = v.vendor_user_id
        join users u on u.id = vu.user_id
        where u.sub = $1 and v.id = $2 and d.id = any($3)
        order by d.id asc
        "#,
    )
    .bind(sub)
    .bind(vendor_id)
    .bind(dish_ids)
    .fetch_all(&mut *conn)
    .await
    .context("find_dishes failed")?;

    rows.iter().map(dish_from_row).collect()
}

pub async fn update_dish(
    conn: &mut PgConnection,
    sub: &str,
    vendor_id: i64,
    dish_id: i64,
    name: &str,
    price_cents: i64,
) -> Result<Option<DishRow>> {
    let row = sqlx::query(
        r#"
        update dishes d
        set name = $4, price_cents = $5
        from vendors v, vendor_users vu, users u
        where d.id = $3
          and d.vendor_id = $2
          and v.id = d.vendor_id
          and vu.id = v.vendor_user_id
          and u.id = vu.user_id
          and u.sub = $1
        returning d.id, d.vendor_id, d.name, d.price_cents
        "#,
    )
    .bind(sub)
    .bind(vendor_id)
    .bind(dish_id)
    .bind(name)
    .bind(price_cents)
    .fetch_optional(&mut *conn)
    .await
    .context("update_dish failed")?;

    row.as_ref().map(dish_from_row).transpose()
}

pub async fn delete_dish(
    conn: &mut PgConnection,
    sub: &str,
    vendor_id: i64,
    dish_id: i64,
) -> Result<bool> {
    let done = sqlx::query(
        r#"
        delete from dishes d
        using vendors v, vendor_users vu, users u
        where d.id = $3
          and d.vendor_id = $2
          and v.id = d.vendor_id
          and vu.id = v.vendor_user_id
          and u.id = vu.user_id
          and u.sub = $1
        "#,
    )
    .bind(sub)
    .bind(vendor_id)
    .bind(dish_id)
    .execute(&mut *conn)
    .await
    .context("delete_dish failed")?;

    Ok(done.rows_affected() > 0)
}
