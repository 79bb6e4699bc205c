//! Scenario: seeding the static tables is idempotent and reproduces the
//! canonical ladders in id order.
//!
//! DB-backed test. Skips if MENSA_DATABASE_URL is not set.

use mensa_lifecycle::LadderDomain;

async fn connect_or_skip() -> Option<sqlx::PgPool> {
    if std::env::var(mensa_db::ENV_DB_URL).is_err() {
        eprintln!("SKIP: MENSA_DATABASE_URL not set");
        return None;
    }
    let pool = mensa_db::connect_from_env(4).await.expect("connect failed");
    mensa_db::migrate(&pool).await.expect("migrate failed");
    Some(pool)
}

async fn count(pool: &sqlx::PgPool, table: &str) -> i64 {
    let sql = format!("select count(*) from {table}");
    let (n,): (i64,) = sqlx::query_as(&sql).fetch_one(pool).await.expect("count");
    n
}

#[tokio::test]
async fn second_seed_run_changes_nothing() -> anyhow::Result<()> {
    let Some(pool) = connect_or_skip().await else {
        return Ok(());
    };

    // First run: tables either fill now or were filled by an earlier test
    // run against the same DB; idempotency holds either way.
    mensa_db::seed::seed_static_tables(&pool).await?;

    let before = (
        count(&pool, "roles").await,
        count(&pool, "ratings").await,
        count(&pool, "order_statuses").await,
        count(&pool, "order_dish_statuses").await,
    );

    let second = mensa_db::seed::seed_static_tables(&pool).await?;
    assert!(
        !second.inserted_anything(),
        "second seed run must be a no-op: {second:?}"
    );

    let after = (
        count(&pool, "roles").await,
        count(&pool, "ratings").await,
        count(&pool, "order_statuses").await,
        count(&pool, "order_dish_statuses").await,
    );
    assert_eq!(before, after, "row counts must not change on re-seed");
    Ok(())
}

#[tokio::test]
async fn seeded_ladders_match_canonical_tables() -> anyhow::Result<()> {
    let Some(pool) = connect_or_skip().await else {
        return Ok(());
    };
    mensa_db::seed::seed_static_tables(&pool).await?;

    let mut conn = pool.acquire().await?;

    for domain in [LadderDomain::Order, LadderDomain::OrderLine] {
        let ladder = mensa_db::ladder::load_ladder(&mut conn, domain).await?;
        let canonical = domain.canonical_rungs();

        assert!(!ladder.is_empty(), "{domain:?} ladder must be seeded");
        assert_eq!(ladder.len(), canonical.len());

        let mut prev_id = 0i64;
        for (rung, (name, vendor)) in ladder.rungs().iter().zip(canonical.iter()) {
            assert_eq!(rung.name, *name, "{domain:?}: rung order must be canonical");
            assert_eq!(
                rung.is_vendor_controlled, *vendor,
                "{domain:?}: flag mismatch at {name}"
            );
            assert!(rung.id > prev_id, "ids must ascend in ladder order");
            prev_id = rung.id;
        }
    }
    Ok(())
}
