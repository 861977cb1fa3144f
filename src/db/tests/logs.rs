use super::*;
use crate::types::LogLevel;

#[tokio::test]
async fn test_lifecycle_writes_log_entries() {
    let (db, _file) = test_db().await;
    let batch = running_batch(&db, &["a"]).await;

    let item = db.next_queued_item(batch.id).await.unwrap().unwrap();
    db.claim_item(&item).await.unwrap();
    db.complete_item(&item, &article("a"), 1.0).await.unwrap().unwrap();

    let logs = db.list_logs(batch.id, 0, 100).await.unwrap();
    let entries: Vec<_> = logs
        .iter()
        .map(|l| (l.level.as_str(), l.message.as_str(), l.item_id))
        .collect();
    assert_eq!(
        entries,
        vec![
            ("INFO", "Batch status changed to completed", None),
            ("INFO", "Article status changed to completed", Some(item.id)),
            ("INFO", "Article status changed to processing", Some(item.id)),
            ("INFO", "Batch status changed to processing", None),
            ("INFO", "Batch created with 1 articles", None),
        ]
    );
}

#[tokio::test]
async fn test_insert_log_with_details() {
    let (db, _file) = test_db().await;
    let batch = db
        .create_batch_with_items(&new_batch("alice"), &new_items(&["a"]))
        .await
        .unwrap();

    db.insert_log(
        batch.id,
        None,
        LogLevel::Warning,
        "Custom note",
        &serde_json::json!({ "reason": "manual" }),
    )
    .await
    .unwrap();

    let logs = db.list_logs(batch.id, 0, 1).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].level, "WARNING");
    assert_eq!(logs[0].message, "Custom note");
    let details: serde_json::Value = serde_json::from_str(&logs[0].details).unwrap();
    assert_eq!(details["reason"], "manual");

    let older = db.list_logs(batch.id, 1, 10).await.unwrap();
    assert_eq!(older.len(), 1);
    assert_eq!(older[0].message, "Batch created with 1 articles");
}
