//! Tests for database initialization

use pwz_common::db::init::{init_database, init_memory_database};

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("drafts.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("drafts.db");

    let pool1 = init_database(&db_path).await.unwrap();
    sqlx::query("INSERT INTO drafts (id) VALUES ('keep-me')")
        .execute(&pool1)
        .await
        .unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM drafts")
        .fetch_one(&pool2)
        .await
        .unwrap();
    assert_eq!(count, 1, "Re-opening must not drop existing drafts");
}

#[tokio::test]
async fn test_drafts_table_defaults() {
    let pool = init_memory_database().await.unwrap();

    sqlx::query("INSERT INTO drafts (id) VALUES ('d1')")
        .execute(&pool)
        .await
        .unwrap();

    let (status, document, steps, pct, version): (String, String, String, i64, i64) =
        sqlx::query_as(
            "SELECT status, document, completed_steps, completion_percentage, version \
             FROM drafts WHERE id = 'd1'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();

    assert_eq!(status, "draft");
    assert_eq!(document, "{}");
    assert_eq!(steps, "[]");
    assert_eq!(pct, 0);
    assert_eq!(version, 0);
}

#[tokio::test]
async fn test_status_check_constraint() {
    let pool = init_memory_database().await.unwrap();

    let result = sqlx::query("INSERT INTO drafts (id, status) VALUES ('d1', 'archived')")
        .execute(&pool)
        .await;

    assert!(result.is_err(), "Unknown status must be rejected by the schema");
}
