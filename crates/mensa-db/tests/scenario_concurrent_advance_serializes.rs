//! Scenario: two concurrent advance attempts on the same order serialize on
//! the row lock: exactly one advances, the other observes the committed
//! status and is told to wait instead of double-advancing.
//!
//! DB-backed test. Skips if MENSA_DATABASE_URL is not set.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use mensa_db::orders::{AdvanceOutcome, AddDishes};
use mensa_db::vendors::VendorCreate;
use mensa_lifecycle::StatusName;

static SEQ: AtomicU64 = AtomicU64::new(0);

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
    let pool = mensa_db::connect_from_env(6).await.expect("connect failed");
    mensa_db::migrate(&pool).await.expect("migrate failed");
    mensa_db::seed::seed_static_tables(&pool).await.expect("seed failed");
    Some(pool)
}

#[tokio::test]
async fn concurrent_customer_advances_do_not_double_advance() -> anyhow::Result<()> {
    let Some(pool) = connect_or_skip().await else {
        return Ok(());
    };

    // Fixture: customer with one order (in cart) containing another
    // vendor's dish.
    let customer_sub = unique("cust");
    let vendor_sub = unique("vend");
    let order_id = {
        let mut tx = pool.begin().await?;
        mensa_db::users::register_user(&mut *tx, &customer_sub, &unique("m"), "C").await?;
        mensa_db::users::register_user(&mut *tx, &vendor_sub, &unique("m"), "V").await?;
        let VendorCreate::Created(vendor) =
            mensa_db::vendors::create_vendor(&mut *tx, &vendor_sub, "Kitchen").await?
        else {
            anyhow::bail!("vendor creation failed");
        };
        let dish = mensa_db::vendors::insert_dish(&mut *tx, &vendor_sub, vendor.id, "Pho", 950)
            .await?
            .expect("dish");
        let order = mensa_db::orders::insert_order(&mut *tx, &customer_sub)
            .await?
            .expect("order");
        let AddDishes::Added(_) =
            mensa_db::orders::add_dishes_to_order(&mut *tx, &customer_sub, order.id, &[dish.id])
                .await?
        else {
            anyhow::bail!("add dishes failed");
        };
        tx.commit().await?;
        order.id
    };

    // Two tasks race the same customer advance. Each runs its own
    // transaction; whichever takes the row lock first wins, the other blocks
    // on FOR UPDATE until the winner commits and then re-evaluates against
    // the committed (already advanced) status.
    let race = |hold: Duration| {
        let pool = pool.clone();
        let sub = customer_sub.clone();
        async move {
            let mut tx = pool.begin().await?;
            let out = mensa_db::orders::advance_order_as_customer(&mut *tx, &sub, order_id)
                .await?;
            // Hold the lock briefly so the race reliably overlaps.
            tokio::time::sleep(hold).await;
            tx.commit().await?;
            anyhow::Ok(out)
        }
    };

    let (a, b) = tokio::join!(race(Duration::from_millis(300)), race(Duration::from_millis(0)));
    let (a, b) = (a?, b?);

    let advanced = [&a, &b]
        .iter()
        .filter(|o| matches!(o, AdvanceOutcome::Advanced { .. }))
        .count();
    let pending = [&a, &b]
        .iter()
        .filter(|o| matches!(o, AdvanceOutcome::Pending { .. }))
        .count();

    assert_eq!(advanced, 1, "exactly one attempt may advance: {a:?} / {b:?}");
    assert_eq!(pending, 1, "the loser must be told to wait: {a:?} / {b:?}");

    for out in [&a, &b] {
        if let AdvanceOutcome::Advanced { next, .. } = out {
            assert_eq!(next.name, StatusName::Confirmed);
        }
        if let AdvanceOutcome::Pending { current } = out {
            // The loser re-read the winner's committed state: Confirmed,
            // whose successor (Preparing) is the vendor's step.
            assert_eq!(current.name, StatusName::Confirmed);
        }
    }

    // The order sits exactly one rung forward.
    let mut conn = pool.acquire().await?;
    let orders = mensa_db::orders::find_orders(&mut conn, &customer_sub, &[order_id]).await?;
    let ladder =
        mensa_db::ladder::load_ladder(&mut conn, mensa_lifecycle::LadderDomain::Order).await?;
    let current = ladder
        .get(orders[0].order_status_id)
        .expect("status in ladder");
    assert_eq!(current.name, StatusName::Confirmed, "no double-advance");

    Ok(())
}
