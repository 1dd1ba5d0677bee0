//! Long-term memory behavior through the engine facade.

mod helpers;

use cognos::{CoreError, MemoryType};
use helpers::engine_with;
use std::collections::HashMap;

#[tokio::test]
async fn inserted_memory_is_the_top_search_hit() {
    let engine = engine_with(100, 1);
    engine
        .insert_memory("apples keep well in the cold", MemoryType::Knowledge, 0.8, HashMap::new())
        .await
        .unwrap();
    engine
        .insert_memory("trains run on rails", MemoryType::Knowledge, 0.8, HashMap::new())
        .await
        .unwrap();

    // Shares a first byte with the apple memory, so it ranks first.
    let hits = engine.search_memories("anything about fruit", 2, None).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].record.content, "apples keep well in the cold");
    assert!(hits[0].similarity > hits[1].similarity);
    assert!(hits[0].score >= hits[1].score);
}

#[tokio::test]
async fn type_filter_restricts_results() {
    let engine = engine_with(100, 1);
    engine
        .insert_memory("user lives in Lisbon", MemoryType::UserInfo, 0.8, HashMap::new())
        .await
        .unwrap();
    engine
        .insert_memory("user asked about trains", MemoryType::Conversation, 0.5, HashMap::new())
        .await
        .unwrap();

    let hits = engine
        .search_memories("user", 5, Some(MemoryType::UserInfo))
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].record.memory_type, MemoryType::UserInfo);
}

#[tokio::test]
async fn second_delete_reports_not_found() {
    let engine = engine_with(100, 1);
    let id = engine
        .insert_memory("to be removed", MemoryType::Knowledge, 0.5, HashMap::new())
        .await
        .unwrap();

    engine.delete_memory(id).await.unwrap();
    assert!(matches!(
        engine.delete_memory(id).await,
        Err(CoreError::NotFound(_))
    ));
    assert!(matches!(
        engine.get_memory(id).await,
        Err(CoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn capacity_two_evicts_the_least_important() {
    let engine = engine_with(2, 1);
    let a = engine
        .insert_memory("alpha fact", MemoryType::Knowledge, 0.9, HashMap::new())
        .await
        .unwrap();
    let b = engine
        .insert_memory("beta fact", MemoryType::Knowledge, 0.2, HashMap::new())
        .await
        .unwrap();
    let c = engine
        .insert_memory("gamma fact", MemoryType::Knowledge, 0.5, HashMap::new())
        .await
        .unwrap();

    let stats = engine.memory_stats().await;
    assert_eq!(stats.total, 2);
    assert!(engine.get_memory(a).await.is_ok());
    assert!(matches!(engine.get_memory(b).await, Err(CoreError::NotFound(_))));
    assert!(engine.get_memory(c).await.is_ok());
}

#[tokio::test]
async fn capacity_is_never_exceeded_under_churn() {
    let engine = engine_with(5, 1);
    for i in 0..25 {
        engine
            .insert_memory(
                &format!("churn memory {i}"),
                MemoryType::Conversation,
                0.1 + (i as f64 % 9.0) / 10.0,
                HashMap::new(),
            )
            .await
            .unwrap();
        assert!(engine.memory_stats().await.total <= 5);
    }
    assert_eq!(engine.memory_stats().await.total, 5);
}

#[tokio::test]
async fn stats_break_down_by_type() {
    let engine = engine_with(100, 1);
    engine
        .insert_memory("user prefers tea", MemoryType::UserInfo, 0.8, HashMap::new())
        .await
        .unwrap();
    engine
        .insert_memory("water boils at 100C", MemoryType::Knowledge, 0.9, HashMap::new())
        .await
        .unwrap();
    engine
        .insert_memory("pure water freezes at 0C", MemoryType::Knowledge, 0.9, HashMap::new())
        .await
        .unwrap();

    let stats = engine.memory_stats().await;
    assert_eq!(stats.total, 3);
    assert_eq!(stats.by_type["user_info"], 1);
    assert_eq!(stats.by_type["knowledge"], 2);
    assert_eq!(stats.by_type["conversation"], 0);
    assert_eq!(stats.by_type["preference"], 0);
    assert!(stats.avg_age_days < 1.0);
    assert!(stats.oldest.is_some() && stats.newest.is_some());
    assert!(stats.oldest <= stats.newest);
}

#[tokio::test]
async fn ids_are_never_reused() {
    let engine = engine_with(100, 1);
    engine
        .insert_memory("one", MemoryType::Knowledge, 0.5, HashMap::new())
        .await
        .unwrap();
    let second = engine
        .insert_memory("two", MemoryType::Knowledge, 0.5, HashMap::new())
        .await
        .unwrap();

    assert_eq!(engine.delete_all_memories().await, 2);
    assert_eq!(engine.memory_stats().await.total, 0);

    let next = engine
        .insert_memory("three", MemoryType::Knowledge, 0.5, HashMap::new())
        .await
        .unwrap();
    assert!(next > second);
}

#[tokio::test]
async fn export_returns_records_in_id_order() {
    let engine = engine_with(100, 1);
    for content in ["first", "second", "third"] {
        engine
            .insert_memory(content, MemoryType::Knowledge, 0.5, HashMap::new())
            .await
            .unwrap();
    }

    let exported = engine.export_memories().await;
    assert_eq!(exported.len(), 3);
    assert!(exported.windows(2).all(|w| w[0].id < w[1].id));
    assert_eq!(exported[0].content, "first");
}

#[tokio::test]
async fn search_reinforces_accessed_memories() {
    let engine = engine_with(100, 1);
    let id = engine
        .insert_memory("often recalled", MemoryType::Knowledge, 0.5, HashMap::new())
        .await
        .unwrap();

    for _ in 0..3 {
        engine.search_memories("often", 1, None).await.unwrap();
    }

    let record = engine.get_memory(id).await.unwrap();
    assert_eq!(record.access_count, 3);
    assert!(record.last_accessed_at >= record.created_at);
}

#[tokio::test]
async fn invalid_importance_is_rejected() {
    let engine = engine_with(100, 1);
    assert!(matches!(
        engine
            .insert_memory("bad", MemoryType::Knowledge, 1.5, HashMap::new())
            .await,
        Err(CoreError::Validation(_))
    ));
    assert!(matches!(
        engine
            .insert_memory("bad", MemoryType::Knowledge, -0.1, HashMap::new())
            .await,
        Err(CoreError::Validation(_))
    ));
}
