use crate::db::*;
use crate::types::BatchId;
use tempfile::NamedTempFile;

mod logs;
mod migrations;

/// Fresh database in a temp file (keep the file alive for the test)
async fn test_db() -> (Database, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    (db, temp_file)
}

fn new_batch(owner: &str) -> NewBatch {
    NewBatch {
        batch_id: BatchId::generate(),
        owner: owner.to_string(),
        name: "Test batch".to_string(),
        description: None,
        source_filename: Some("topics.csv".to_string()),
        default_config: None,
    }
}

fn new_item(topic: &str) -> NewItem {
    NewItem {
        topic: topic.to_string(),
        keywords: String::new(),
        tone: "professional".to_string(),
        word_count: 1000,
        custom_persona: String::new(),
        link_count: 5,
        use_inline_links: true,
        use_apa_style: false,
        extra_fields: None,
    }
}

fn new_items(topics: &[&str]) -> Vec<NewItem> {
    topics.iter().map(|t| new_item(t)).collect()
}

fn article(title: &str) -> crate::generation::GeneratedArticle {
    crate::generation::GeneratedArticle {
        title: title.to_string(),
        content: "one two three".to_string(),
        meta_description: format!("{title}..."),
        word_count: 3,
    }
}

/// Create a batch with `topics` and claim it for processing
async fn running_batch(db: &Database, topics: &[&str]) -> BatchRow {
    let batch = db
        .create_batch_with_items(&new_batch("alice"), &new_items(topics))
        .await
        .unwrap();
    assert!(db.claim_batch(batch.id).await.unwrap());
    batch
}
