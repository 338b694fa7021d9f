use chrono::{TimeZone, Utc};
use modmail_db::migration::MIGRATOR;
use modmail_db::test_support::TestDatabase;
use modmail_db::{ArchiveRecord, ModmailArchiveStore};
use sqlx::PgPool;
use uuid::Uuid;

async fn provision() -> TestDatabase {
    TestDatabase::new_from_env()
        .await
        .expect("failed to provision test database")
}

async fn table_count(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = 'public' AND table_name = $1",
    )
    .bind(table)
    .fetch_one(pool)
    .await
    .expect("lookup succeeded")
}

#[tokio::test]
async fn migrations_apply_and_revert_cleanly() {
    let test_db = provision().await;
    let pool = test_db.pool_clone();

    // Already applied by TestDatabase; a second run must be a no-op.
    MIGRATOR.run(&pool).await.expect("migrations rerun is idempotent");

    for table in ["modmail_archive", "multi_panel_targets", "panels", "multi_panels"] {
        assert_eq!(table_count(&pool, table).await, 1, "{table} should exist");
    }

    MIGRATOR.undo(&pool, 0).await.expect("migrations revert");

    assert_eq!(
        table_count(&pool, "modmail_archive").await,
        0,
        "modmail_archive should be dropped after revert"
    );
    assert_eq!(table_count(&pool, "multi_panel_targets").await, 0);
    for table in ["panels", "multi_panels"] {
        assert_eq!(
            table_count(&pool, table).await,
            1,
            "{table} belongs to the panel subsystem and must survive a revert"
        );
    }

    MIGRATOR.run(&pool).await.expect("migrations rerun");

    assert_eq!(table_count(&pool, "modmail_archive").await, 1);
    assert_eq!(table_count(&pool, "multi_panel_targets").await, 1);

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn reverting_keeps_existing_panel_rows() {
    let test_db = provision().await;
    let pool = test_db.pool_clone();

    sqlx::query(
        "INSERT INTO panels (message_id, channel_id, guild_id, title, content, colour, target_category, reaction_emote) VALUES (1000, 1001, 1, 'Appeals', 'Appeals content', 0, 1002, 'x')",
    )
    .execute(&pool)
    .await
    .expect("panel inserted");

    MIGRATOR.undo(&pool, 0).await.expect("migrations revert");

    let panels: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM panels")
        .fetch_one(&pool)
        .await
        .expect("count succeeded");
    assert_eq!(panels, 1);

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn archive_table_with_timestamp_column_is_converted_in_place() {
    let test_db = provision().await;
    let pool = test_db.pool_clone();

    MIGRATOR.undo(&pool, 0).await.expect("migrations revert");

    // Shape of the table as earlier bot versions created it.
    sqlx::query(
        r#"
        CREATE TABLE modmail_archive(
            "uuid" uuid NOT NULL UNIQUE,
            "guild_id" int8 NOT NULL,
            "user_id" int8 NOT NULL,
            "close_time" timestamp NOT NULL,
            PRIMARY KEY("uuid")
        )
        "#,
    )
    .execute(&pool)
    .await
    .expect("table created");

    let stored_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO modmail_archive (uuid, guild_id, user_id, close_time) VALUES ($1, 1, 10, '2024-03-01 12:00:00')",
    )
    .bind(stored_id)
    .execute(&pool)
    .await
    .expect("row inserted");

    MIGRATOR.run(&pool).await.expect("migrations apply");

    let column_type: String = sqlx::query_scalar(
        "SELECT data_type::text FROM information_schema.columns WHERE table_name = 'modmail_archive' AND column_name = 'close_time'",
    )
    .fetch_one(&pool)
    .await
    .expect("column lookup succeeded");
    assert_eq!(column_type, "timestamp with time zone");

    let store = ModmailArchiveStore::new(pool.clone());
    let stored = ArchiveRecord::new(
        stored_id,
        1,
        10,
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
    );
    let fresh = ArchiveRecord::new(
        Uuid::new_v4(),
        1,
        10,
        Utc.with_ymd_and_hms(2024, 3, 1, 13, 0, 0).unwrap(),
    );
    assert!(store.insert(&fresh).await.expect("insert succeeded"));

    let page = store
        .list_by_guild(1, 10, None, None)
        .await
        .expect("list succeeded");
    assert!(page.is_complete());
    assert_eq!(page.into_rows(), vec![fresh, stored]);

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn association_table_cascades_from_both_parents() {
    let test_db = provision().await;

    // confdeltype/confupdtype: 'c' = cascade, 'a' = no action.
    let rules: Vec<(String, String, String)> = sqlx::query_as(
        r#"
        SELECT confrelid::regclass::text, confdeltype::text, confupdtype::text
        FROM pg_constraint
        WHERE conrelid = 'multi_panel_targets'::regclass AND contype = 'f'
        ORDER BY 1
        "#,
    )
    .fetch_all(test_db.pool())
    .await
    .expect("constraint lookup succeeded");

    assert_eq!(
        rules,
        vec![
            ("multi_panels".to_string(), "c".to_string(), "a".to_string()),
            ("panels".to_string(), "c".to_string(), "c".to_string()),
        ]
    );

    test_db.close().await.expect("failed to drop test database");
}
