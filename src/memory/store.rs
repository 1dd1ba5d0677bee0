//! Authoritative record store — embedding, capacity, eviction, search, stats.
//!
//! [`MemoryStore`] owns the vector index and the parallel metadata map behind a
//! read/write lock: searches run concurrently under the read lock, every index
//! mutation (insert, delete, capacity eviction) holds the write lock. Embedding
//! happens before the lock is taken, and metadata is only written after the
//! index write, so a cancelled insert never leaves the two out of sync.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::{MemoryConfig, RetrievalConfig};
use crate::error::{CoreError, Result};
use crate::index::{FlatIndex, VectorIndex};
use crate::memory::rank;
use crate::memory::types::{MemoryRecord, MemoryType};
use crate::ports::{with_timeout, EmbeddingPort};

/// A single search result: the record plus its raw similarity and composite rank.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub record: MemoryRecord,
    /// Normalized vector similarity in `(0, 1]`.
    pub similarity: f64,
    /// Composite rank the result ordering is based on.
    pub score: f64,
}

/// Store statistics over current live records.
#[derive(Debug, Serialize)]
pub struct MemoryStats {
    pub total: usize,
    pub avg_age_days: f64,
    pub by_type: HashMap<String, u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest: Option<DateTime<Utc>>,
}

struct StoreInner {
    index: FlatIndex,
    records: BTreeMap<u64, MemoryRecord>,
    slot_of: HashMap<u64, usize>,
    id_of_slot: HashMap<usize, u64>,
    next_id: u64,
}

/// Long-term memory store shared across concurrent chat requests.
///
/// Constructed once at process start and passed by handle to every consumer —
/// an explicitly owned singleton-by-convention, not an implicit global.
pub struct MemoryStore {
    config: MemoryConfig,
    weights: RetrievalConfig,
    embedder: Arc<dyn EmbeddingPort>,
    port_timeout: Duration,
    inner: RwLock<StoreInner>,
}

impl MemoryStore {
    /// Create an empty store.
    ///
    /// Fails with a dimension mismatch if the embedding port's declared
    /// dimension differs from the configured one.
    pub fn new(
        config: MemoryConfig,
        weights: RetrievalConfig,
        embedder: Arc<dyn EmbeddingPort>,
        port_timeout: Duration,
    ) -> Result<Self> {
        if embedder.dimensions() != config.vector_dim {
            return Err(CoreError::DimensionMismatch {
                expected: config.vector_dim,
                actual: embedder.dimensions(),
            });
        }
        let index = FlatIndex::new(config.vector_dim);
        Ok(Self {
            config,
            weights,
            embedder,
            port_timeout,
            inner: RwLock::new(StoreInner {
                index,
                records: BTreeMap::new(),
                slot_of: HashMap::new(),
                id_of_slot: HashMap::new(),
                next_id: 0,
            }),
        })
    }

    /// Embed text through the port under the store's timeout, validating the
    /// returned dimension.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = with_timeout(self.port_timeout, self.embedder.embed(text)).await?;
        if embedding.len() != self.config.vector_dim {
            return Err(CoreError::DimensionMismatch {
                expected: self.config.vector_dim,
                actual: embedding.len(),
            });
        }
        Ok(embedding)
    }

    /// Full write path: validate → embed → evict if at capacity → index insert
    /// → metadata insert. Returns the new record's id.
    pub async fn insert(
        &self,
        content: &str,
        memory_type: MemoryType,
        importance: f64,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Result<u64> {
        if !(0.0..=1.0).contains(&importance) {
            return Err(CoreError::Validation(format!(
                "importance must be in [0.0, 1.0], got {importance}"
            )));
        }
        if self.config.max_memories == 0 {
            return Err(CoreError::Capacity(
                "configured capacity is zero".to_string(),
            ));
        }

        // Embed outside the lock; a slow or cancelled port call must not stall
        // or corrupt the index.
        let embedding = self.embed(content).await?;

        let mut inner = self.inner.write().await;
        let now = Utc::now();
        while inner.records.len() >= self.config.max_memories {
            self.evict_lowest(&mut inner, now);
        }

        let id = inner.next_id;
        inner.next_id += 1;

        // Index first, metadata second: the two can only drift toward an
        // orphaned (tombstonable) vector, never a record without a vector.
        let slot = inner.index.insert(embedding.clone());
        inner.slot_of.insert(id, slot);
        inner.id_of_slot.insert(slot, id);
        inner.records.insert(
            id,
            MemoryRecord {
                id,
                content: content.to_string(),
                memory_type,
                embedding,
                importance,
                created_at: now,
                last_accessed_at: now,
                access_count: 0,
                metadata,
            },
        );

        info!(id, %memory_type, importance, "stored memory");
        Ok(id)
    }

    /// Evict the record with the lowest eviction rank. Ties broken by oldest
    /// `created_at`, then by id, so the choice is deterministic.
    fn evict_lowest(&self, inner: &mut StoreInner, now: DateTime<Utc>) {
        let victim = inner
            .records
            .values()
            .map(|r| (rank::eviction_score(r, now, &self.config), r.created_at, r.id))
            .min_by(|a, b| {
                a.0.partial_cmp(&b.0)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.1.cmp(&b.1))
                    .then(a.2.cmp(&b.2))
            });

        if let Some((score, _, id)) = victim {
            if let Some(slot) = inner.slot_of.remove(&id) {
                inner.index.remove(slot);
                inner.id_of_slot.remove(&slot);
            }
            inner.records.remove(&id);
            debug!(id, score, "evicted lowest-ranked memory");
        }
    }

    /// Nearest-neighbor search ordered by descending composite rank.
    ///
    /// Over-fetches from the index, applies the optional type filter, ranks by
    /// the similarity/importance composite, and returns at most `k` hits.
    /// Each returned record has its `access_count` incremented and
    /// `last_accessed_at` updated before the call returns.
    pub async fn search(
        &self,
        query_embedding: &[f32],
        k: usize,
        memory_type_filter: Option<MemoryType>,
    ) -> Result<Vec<SearchHit>> {
        if query_embedding.len() != self.config.vector_dim {
            return Err(CoreError::DimensionMismatch {
                expected: self.config.vector_dim,
                actual: query_embedding.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let now = Utc::now();

        // Score under the read lock; concurrent searches proceed in parallel.
        let mut ranked: Vec<(u64, f64, f64)> = {
            let inner = self.inner.read().await;
            let candidate_limit = k.saturating_mul(4);
            let neighbors = inner.index.search(query_embedding, candidate_limit);

            let mut candidates = Vec::with_capacity(neighbors.len());
            for (slot, distance) in neighbors {
                let Some(&id) = inner.id_of_slot.get(&slot) else {
                    continue;
                };
                let Some(record) = inner.records.get(&id) else {
                    continue;
                };
                if let Some(filter) = memory_type_filter {
                    if record.memory_type != filter {
                        continue;
                    }
                }
                let similarity = rank::similarity_from_distance(distance);
                let effective = rank::effective_importance(record, now, &self.config);
                let score = rank::retrieval_score(similarity, effective, &self.weights);
                candidates.push((id, similarity, score));
            }

            // Total order: score descending, id ascending — repeated identical
            // queries return a stable sequence.
            candidates.sort_by(|a, b| {
                b.2.partial_cmp(&a.2)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.0.cmp(&b.0))
            });
            candidates.truncate(k);
            candidates
        };

        // Access tracking is a mutation; apply it under the write lock.
        let mut inner = self.inner.write().await;
        let mut hits = Vec::with_capacity(ranked.len());
        ranked.retain(|(id, _, _)| inner.records.contains_key(id));
        for (id, similarity, score) in ranked {
            let record = inner
                .records
                .get_mut(&id)
                .expect("retained ids are present");
            record.access_count += 1;
            record.last_accessed_at = now;
            hits.push(SearchHit {
                record: record.clone(),
                similarity,
                score,
            });
        }

        debug!(returned = hits.len(), k, "memory search");
        Ok(hits)
    }

    /// Fetch a record by id.
    pub async fn get(&self, id: u64) -> Result<MemoryRecord> {
        let inner = self.inner.read().await;
        inner
            .records
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound(id))
    }

    /// Delete a record: tombstone its index slot and drop its metadata.
    ///
    /// Safe to apply in any order across a batch — ids never shift. A second
    /// delete of the same id reports `NotFound`, nothing worse.
    pub async fn delete(&self, id: u64) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.records.remove(&id).is_none() {
            return Err(CoreError::NotFound(id));
        }
        if let Some(slot) = inner.slot_of.remove(&id) {
            inner.index.remove(slot);
            inner.id_of_slot.remove(&slot);
        }
        info!(id, "deleted memory");
        Ok(())
    }

    /// Clear all records and reset the vector index. Returns the number removed.
    ///
    /// The id counter is not reset, so ids stay unique across the store's
    /// full history.
    pub async fn delete_all(&self) -> usize {
        let mut inner = self.inner.write().await;
        let removed = inner.records.len();
        inner.records.clear();
        inner.slot_of.clear();
        inner.id_of_slot.clear();
        inner.index.clear();
        info!(removed, "cleared all memories");
        removed
    }

    /// Statistics over current live records only.
    pub async fn stats(&self) -> MemoryStats {
        let inner = self.inner.read().await;
        let now = Utc::now();

        let mut by_type: HashMap<String, u64> = MemoryType::ALL
            .iter()
            .map(|t| (t.as_str().to_string(), 0))
            .collect();
        for record in inner.records.values() {
            *by_type.entry(record.memory_type.as_str().to_string()).or_insert(0) += 1;
        }

        let total = inner.records.len();
        let avg_age_days = if total == 0 {
            0.0
        } else {
            inner.records.values().map(|r| r.age_days(now)).sum::<f64>() / total as f64
        };

        MemoryStats {
            total,
            avg_age_days,
            by_type,
            oldest: inner.records.values().map(|r| r.created_at).min(),
            newest: inner.records.values().map(|r| r.created_at).max(),
        }
    }

    /// Full snapshot of all live records, ordered by id.
    pub async fn export(&self) -> Vec<MemoryRecord> {
        let inner = self.inner.read().await;
        inner.records.values().cloned().collect()
    }

    /// Rebuild the index without tombstoned rows. Maintenance operation — ids
    /// are untouched, only internal slots are remapped. Returns the number of
    /// rows reclaimed.
    pub async fn compact_index(&self) -> usize {
        let mut inner = self.inner.write().await;
        let (reclaimed, remap) = inner.index.compact();
        if reclaimed > 0 {
            let new_slots: HashMap<usize, usize> = remap.into_iter().collect();
            for slot in inner.slot_of.values_mut() {
                if let Some(&new_slot) = new_slots.get(slot) {
                    *slot = new_slot;
                }
            }
            inner.id_of_slot = inner
                .slot_of
                .iter()
                .map(|(&id, &slot)| (slot, id))
                .collect();
            info!(reclaimed, "compacted vector index");
        }
        reclaimed
    }

    /// Number of live records.
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
