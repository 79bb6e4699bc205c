//! User and role rows. Authorization everywhere reduces to "does the
//! authenticated subject (`sub`) own this row", so every query is scoped by
//! `sub` rather than by a caller-supplied user id.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, PgConnection, Row};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub sub: String,
    pub email: String,
    pub role_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleRow {
    pub id: i64,
    pub name: String,
}

fn user_from_row(row: &PgRow) -> Result<UserRow> {
    Ok(UserRow {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        sub: row.try_get("sub")?,
        email: row.try_get("email")?,
        role_id: row.try_get("role_id")?,
    })
}

pub async fn find_user_by_sub(conn: &mut PgConnection, sub: &str) -> Result<Option<UserRow>> {
    let row = sqlx::query("select id, name, sub, email, role_id from users where sub = $1")
        .bind(sub)
        .fetch_optional(&mut *conn)
        .await
        .context("find_user_by_sub failed")?;

    row.as_ref().map(user_from_row).transpose()
}

/// Register (or refresh) the user row for a verified identity. New users get
/// the Customer role; an existing row keeps its role and picks up the
/// provider's current name/email.
pub async fn register_user(
    conn: &mut PgConnection,
    sub: &str,
    email: &str,
    name: &str,
) -> Result<UserRow> {
    let row = sqlx::query(
        r#"
        insert into users (name, sub, email, role_id)
        values ($1, $2, $3, (select id from roles where name = 'Customer'))
        on conflict (sub) do update
            set name = excluded.name,
                email = excluded.email
        returning id, name, sub, email, role_id
        "#,
    )
    .bind(name)
    .bind(sub)
    .bind(email)
    .fetch_one(&mut *conn)
    .await
    .context("register_user failed")?;

    user_from_row(&row)
}

pub async fn update_user_name(
    conn: &mut PgConnection,
    sub: &str,
    name: &str,
) -> Result<Option<UserRow>> {
    let row = sqlx::query(
        r#"
        update users
        set name = $2
        where sub = $1
        returning id, name, sub, email, role_id
        "#,
    )
    .bind(sub)
    .bind(name)
    .fetch_optional(&mut *conn)
    .await
    .context("update_user_name failed")?;

    row.as_ref().map(user_from_row).transpose()
}

/// Remove the user row. Fails with a foreign-key violation while the user
/// still owns orders or a store (RESTRICT); callers surface that as a
/// conflict rather than cascading.
pub async fn delete_user(conn: &mut PgConnection, sub: &str) -> Result<bool> {
    let done = sqlx::query("delete from users where sub = $1")
        .bind(sub)
        .execute(&mut *conn)
        .await
        .context("delete_user failed")?;

    Ok(done.rows_affected() > 0)
}

pub async fn find_role_of_sub(conn: &mut PgConnection, sub: &str) -> Result<Option<RoleRow>> {
    let row = sqlx::query(
        r#"
        select r.id, r.name
        from roles r
        join users u on u.role_id = r.id
        where u.sub = $1
        "#,
    )
    .bind(sub)
    .fetch_optional(&mut *conn)
    .await
    .context("find_role_of_sub failed")?;

    Ok(row.map(|r| {
        Ok::<_, anyhow::Error>(RoleRow {
            id: r.try_get("id")?,
            name: r.try_get("name")?,
        })
    })
    .transpose()?)
}

pub async fn find_role_by_id(conn: &mut PgConnection, role_id: i64) -> Result<Option<RoleRow>> {
    let row = sqlx::query("select id, name from roles where id = $1")
        .bind(role_id)
        .fetch_optional(&mut *conn)
        .await
        .context("find_role_by_id failed")?;

    Ok(row.map(|r| {
        Ok::<_, anyhow::Error>(RoleRow {
            id: r.try_get("id")?,
            name: r.try_get("name")?,
        })
    })
    .transpose()?)
}

pub async fn update_user_role(
    conn: &mut PgConnection,
    sub: &str,
    role_id: i64,
) -> Result<Option<UserRow>> {
    let row = sqlx::query(
        r#"
        update users
        set role_id = $2
        where sub = $1
        returning id, name, sub, email, role_id
        "#,
    )
    .bind(sub)
    .bind(role_id)
    .fetch_optional(&mut *conn)
    .await
    .context("update_user_role failed")?;

    row.as_ref().map(user_from_row).transpose()
}
