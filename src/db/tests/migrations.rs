use super::*;

#[tokio::test]
async fn test_database_creation() {
    let (db, _file) = test_db().await;

    let mut conn = db.pool.acquire().await.unwrap();

    let tables: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .fetch_all(&mut *conn)
            .await
            .unwrap();

    for table in [
        "article_batches",
        "batch_articles",
        "processing_logs",
        "runtime_state",
        "schema_version",
    ] {
        assert!(tables.contains(&table.to_string()), "missing table {table}");
    }

    let indexes: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='index'")
            .fetch_all(&mut *conn)
            .await
            .unwrap();
    assert!(indexes.contains(&"idx_items_batch_status".to_string()));
    assert!(indexes.contains(&"idx_batches_status_created".to_string()));

    drop(conn);
    db.close().await;
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let temp_file = NamedTempFile::new().unwrap();

    let db = Database::new(temp_file.path()).await.unwrap();
    let batch = db
        .create_batch_with_items(&new_batch("alice"), &new_items(&["a"]))
        .await
        .unwrap();
    db.close().await;

    // Reopening must not re-run v1 or lose data
    let db = Database::new(temp_file.path()).await.unwrap();
    let versions: Vec<i64> = sqlx::query_scalar("SELECT version FROM schema_version")
        .fetch_all(db.pool())
        .await
        .unwrap();
    assert_eq!(versions, vec![1]);
    assert!(db.get_batch(&batch.batch_id).await.unwrap().is_some());

    db.close().await;
}

#[tokio::test]
async fn test_parent_directory_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("state").join("batches.db");

    let db = Database::new(&path).await.unwrap();
    assert!(path.exists());
    db.close().await;
}

#[tokio::test]
async fn test_counters_cannot_exceed_total() {
    let (db, _file) = test_db().await;
    let batch = db
        .create_batch_with_items(&new_batch("alice"), &new_items(&["a"]))
        .await
        .unwrap();

    let result = sqlx::query("UPDATE article_batches SET completed_count = 2 WHERE id = ?")
        .bind(batch.id)
        .execute(db.pool())
        .await;
    assert!(result.is_err(), "CHECK constraint must reject the update");

    db.close().await;
}

#[tokio::test]
async fn test_deleting_batch_cascades() {
    let (db, _file) = test_db().await;
    let batch = db
        .create_batch_with_items(&new_batch("alice"), &new_items(&["a", "b"]))
        .await
        .unwrap();

    sqlx::query("DELETE FROM article_batches WHERE id = ?")
        .bind(batch.id)
        .execute(db.pool())
        .await
        .unwrap();

    assert!(db.list_items(batch.id).await.unwrap().is_empty());
    assert!(db.list_logs(batch.id, 0, 100).await.unwrap().is_empty());

    db.close().await;
}
