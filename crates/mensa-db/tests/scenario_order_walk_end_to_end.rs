//! Scenario: a full cooperative walk of one order from cart to Complete,
//! with every blocked and terminal outcome checked along the way.
//!
//! DB-backed test. Skips if MENSA_DATABASE_URL is not set.

use std::sync::atomic::{AtomicU64, Ordering};

use mensa_db::orders::{AdvanceOutcome, AddDishes};
use mensa_db::vendors::VendorCreate;
use mensa_lifecycle::StatusName;

static SEQ: AtomicU64 = AtomicU64::new(0);

/// Unique-per-call suffix so repeated test runs never collide on unique
/// columns in a developer DB.
fn unique(tag: &str) -> String {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0);
    let n = SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{tag}-{nanos}-{n}")
}

async fn connect_or_skip() -> Option<sqlx::PgPool> {
    if std::env::var(mensa_db::ENV_DB_URL).is_err() {
        eprintln!("SKIP: MENSA_DATABASE_URL not set");
        return None;
    }
    let pool = mensa_db::connect_from_env(4).await.expect("connect failed");
    mensa_db::migrate(&pool).await.expect("migrate failed");
    mensa_db::seed::seed_static_tables(&pool).await.expect("seed failed");
    Some(pool)
}

struct Fixture {
    customer_sub: String,
    vendor_sub: String,
    vendor_id: i64,
    order_id: i64,
    line_id: i64,
}

/// Customer A orders one dish from vendor-owner B.
async fn fixture(pool: &sqlx::PgPool) -> anyhow::Result<Fixture> {
    let mut tx = pool.begin().await?;

    let customer_sub = unique("cust");
    let vendor_sub = unique("vend");

    mensa_db::users::register_user(
        &mut *tx,
        &customer_sub,
        &unique("cust-mail"),
        "Test Customer",
    )
    .await?;
    mensa_db::users::register_user(
        &mut *tx,
        &vendor_sub,
        &unique("vend-mail"),
        "Test Vendor Owner",
    )
    .await?;

    let VendorCreate::Created(vendor) =
        mensa_db::vendors::create_vendor(&mut *tx, &vendor_sub, "Test Kitchen").await?
    else {
        anyhow::bail!("vendor creation failed");
    };

    let dish = mensa_db::vendors::insert_dish(&mut *tx, &vendor_sub, vendor.id, "Goulash", 850)
        .await?
        .expect("dish insert");

    let order = mensa_db::orders::insert_order(&mut *tx, &customer_sub)
        .await?
        .expect("order insert");

    let AddDishes::Added(lines) =
        mensa_db::orders::add_dishes_to_order(&mut *tx, &customer_sub, order.id, &[dish.id])
            .await?
    else {
        anyhow::bail!("adding dishes failed");
    };

    tx.commit().await?;

    Ok(Fixture {
        customer_sub,
        vendor_sub,
        vendor_id: vendor.id,
        order_id: order.id,
        line_id: lines[0].id,
    })
}

#[tokio::test]
async fn order_walks_cart_to_complete_with_blocked_steps() -> anyhow::Result<()> {
    let Some(pool) = connect_or_skip().await else {
        return Ok(());
    };
    let fx = fixture(&pool).await?;

    // Cart -> Confirmed: the customer's step.
    let mut tx = pool.begin().await?;
    let out =
        mensa_db::orders::advance_order_as_customer(&mut *tx, &fx.customer_sub, fx.order_id)
            .await?;
    tx.commit().await?;
    match out {
        AdvanceOutcome::Advanced { next, .. } => assert_eq!(next.name, StatusName::Confirmed),
        other => panic!("expected Advanced(Confirmed), got {other:?}"),
    }

    // Confirmed -> Preparing belongs to the vendor: customer is told to wait.
    let mut tx = pool.begin().await?;
    let out =
        mensa_db::orders::advance_order_as_customer(&mut *tx, &fx.customer_sub, fx.order_id)
            .await?;
    tx.commit().await?;
    match out {
        AdvanceOutcome::Pending { current } => assert_eq!(current.name, StatusName::Confirmed),
        other => panic!("expected Pending at Confirmed, got {other:?}"),
    }

    // Vendor pushes through Preparing, Queued, Delivering.
    for expected in [
        StatusName::Preparing,
        StatusName::Queued,
        StatusName::Delivering,
    ] {
        let mut tx = pool.begin().await?;
        let out = mensa_db::orders::advance_order_as_vendor(
            &mut *tx,
            &fx.vendor_sub,
            fx.vendor_id,
            fx.order_id,
        )
        .await?;
        tx.commit().await?;
        match out {
            AdvanceOutcome::Advanced { next, .. } => assert_eq!(next.name, expected),
            other => panic!("expected Advanced({expected}), got {other:?}"),
        }
    }

    // Delivering -> Delivered is the customer's again on the order ladder;
    // the vendor is blocked here.
    let mut tx = pool.begin().await?;
    let out = mensa_db::orders::advance_order_as_vendor(
        &mut *tx,
        &fx.vendor_sub,
        fx.vendor_id,
        fx.order_id,
    )
    .await?;
    tx.commit().await?;
    assert!(
        matches!(out, AdvanceOutcome::Pending { .. }),
        "vendor must wait at Delivering on the order ladder: {out:?}"
    );

    // Customer closes out: Delivered, CleanUp, Complete.
    for expected in [
        StatusName::Delivered,
        StatusName::CleanUp,
        StatusName::Complete,
    ] {
        let mut tx = pool.begin().await?;
        let out = mensa_db::orders::advance_order_as_customer(
            &mut *tx,
            &fx.customer_sub,
            fx.order_id,
        )
        .await?;
        tx.commit().await?;
        match out {
            AdvanceOutcome::Advanced { next, entity } => {
                assert_eq!(next.name, expected);
                if expected == StatusName::Delivered {
                    assert!(entity.delivered_at.is_some(), "delivered_at stamped");
                }
                if expected == StatusName::Complete {
                    assert!(entity.completed_at.is_some(), "completed_at stamped");
                }
            }
            other => panic!("expected Advanced({expected}), got {other:?}"),
        }
    }

    // Terminal: no further transition, for either party.
    let mut tx = pool.begin().await?;
    let out =
        mensa_db::orders::advance_order_as_customer(&mut *tx, &fx.customer_sub, fx.order_id)
            .await?;
    tx.commit().await?;
    match out {
        AdvanceOutcome::Invalid { current } => assert_eq!(current.name, StatusName::Complete),
        other => panic!("expected Invalid at Complete, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn line_walk_delivered_step_belongs_to_the_vendor() -> anyhow::Result<()> {
    let Some(pool) = connect_or_skip().await else {
        return Ok(());
    };
    let fx = fixture(&pool).await?;

    // Customer confirms the line.
    let mut tx = pool.begin().await?;
    let out = mensa_db::orders::advance_line_as_customer(
        &mut *tx,
        &fx.customer_sub,
        fx.order_id,
        fx.line_id,
    )
    .await?;
    tx.commit().await?;
    assert!(matches!(
        out,
        AdvanceOutcome::Advanced { ref next, .. } if next.name == StatusName::Confirmed
    ));

    // Vendor runs Preparing, Queued, Delivering and, on the line ladder,
    // Delivered as well.
    for expected in [
        StatusName::Preparing,
        StatusName::Queued,
        StatusName::Delivering,
        StatusName::Delivered,
    ] {
        let mut tx = pool.begin().await?;
        let out = mensa_db::orders::advance_line_as_vendor(
            &mut *tx,
            &fx.vendor_sub,
            fx.vendor_id,
            fx.line_id,
        )
        .await?;
        tx.commit().await?;
        match out {
            AdvanceOutcome::Advanced { next, .. } => assert_eq!(next.name, expected),
            other => panic!("expected Advanced({expected}), got {other:?}"),
        }
    }

    // The customer could not have taken the Delivered step on this ladder;
    // verify the symmetric block one rung earlier with a fresh fixture.
    let fx2 = fixture(&pool).await?;
    let mut tx = pool.begin().await?;
    mensa_db::orders::advance_line_as_customer(
        &mut *tx,
        &fx2.customer_sub,
        fx2.order_id,
        fx2.line_id,
    )
    .await?; // -> Confirmed
    tx.commit().await?;
    for _ in 0..3 {
        let mut tx = pool.begin().await?;
        mensa_db::orders::advance_line_as_vendor(
            &mut *tx,
            &fx2.vendor_sub,
            fx2.vendor_id,
            fx2.line_id,
        )
        .await?; // -> Preparing, Queued, Delivering
        tx.commit().await?;
    }
    let mut tx = pool.begin().await?;
    let out = mensa_db::orders::advance_line_as_customer(
        &mut *tx,
        &fx2.customer_sub,
        fx2.order_id,
        fx2.line_id,
    )
    .await?;
    tx.commit().await?;
    assert!(
        matches!(out, AdvanceOutcome::Pending { .. }),
        "customer must wait at Delivering on the line ladder: {out:?}"
    );

    Ok(())
}

#[tokio::test]
async fn own_store_dishes_cannot_be_ordered() -> anyhow::Result<()> {
    let Some(pool) = connect_or_skip().await else {
        return Ok(());
    };

    let mut tx = pool.begin().await?;
    let sub = unique("owner");
    mensa_db::users::register_user(&mut *tx, &sub, &unique("owner-mail"), "Owner").await?;
    let VendorCreate::Created(vendor) =
        mensa_db::vendors::create_vendor(&mut *tx, &sub, "Own Kitchen").await?
    else {
        anyhow::bail!("vendor creation failed");
    };
    let dish = mensa_db::vendors::insert_dish(&mut *tx, &sub, vendor.id, "Soup", 400)
        .await?
        .expect("dish insert");
    let order = mensa_db::orders::insert_order(&mut *tx, &sub)
        .await?
        .expect("order insert");

    let out =
        mensa_db::orders::add_dishes_to_order(&mut *tx, &sub, order.id, &[dish.id]).await?;
    tx.commit().await?;

    assert!(
        matches!(out, AddDishes::NoDishes),
        "ordering from your own store must be refused: {out:?}"
    );
    Ok(())
}

#[tokio::test]
async fn delete_order_is_cart_only() -> anyhow::Result<()> {
    let Some(pool) = connect_or_skip().await else {
        return Ok(());
    };
    let fx = fixture(&pool).await?;

    // Confirm first, then attempt deletion: refused.
    let mut tx = pool.begin().await?;
    mensa_db::orders::advance_order_as_customer(&mut *tx, &fx.customer_sub, fx.order_id)
        .await?;
    tx.commit().await?;

    let mut tx = pool.begin().await?;
    let out = mensa_db::orders::delete_order(&mut *tx, &fx.customer_sub, fx.order_id).await?;
    tx.commit().await?;
    assert!(
        matches!(out, mensa_db::orders::DeleteOrder::NotInCart { .. }),
        "confirmed orders must not be deletable: {out:?}"
    );

    // A fresh cart deletes fine.
    let fx2 = fixture(&pool).await?;
    let mut tx = pool.begin().await?;
    let out = mensa_db::orders::delete_order(&mut *tx, &fx2.customer_sub, fx2.order_id).await?;
    tx.commit().await?;
    assert!(matches!(out, mensa_db::orders::DeleteOrder::Deleted));
    Ok(())
}
