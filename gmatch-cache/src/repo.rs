// Queue and edge repositories over the cache adapter

use tracing::warn;
use uuid::Uuid;

use crate::error::{CacheError, CacheResult};
use crate::model::{edge_key, queue_key, Edge, QueueEntry, EDGE_PATTERN, QUEUE_PATTERN};
use crate::ops::CacheOps;

/// Decoded queue state plus the keys of entries that failed to decode.
/// Corrupt entries are retried every tick until fixed or evicted; they are
/// never marked processed and never paired.
#[derive(Debug, Default)]
pub struct QueueSnapshot {
    pub entries: Vec<QueueEntry>,
    pub corrupt: Vec<String>,
}

/// Edge snapshot; corrupt keys are reclaimed by the scheduler alongside
/// orphans.
#[derive(Debug, Default)]
pub struct EdgeSnapshot {
    pub edges: Vec<Edge>,
    pub corrupt: Vec<String>,
}

async fn load_values(
    cache: &dyn CacheOps,
    pattern: &str,
    batch: usize,
) -> CacheResult<Vec<(String, String)>> {
    let keys = cache.keys(pattern).await?;
    let mut values = Vec::with_capacity(keys.len());

    for chunk in keys.chunks(batch.max(1)) {
        let fetched = cache.mget(chunk).await?;
        for (key, value) in chunk.iter().zip(fetched) {
            // A key can vanish between KEYS and MGET; skip it.
            if let Some(value) = value {
                values.push((key.clone(), value));
            }
        }
    }

    Ok(values)
}

pub async fn load_queue_snapshot(
    cache: &dyn CacheOps,
    batch: usize,
) -> CacheResult<QueueSnapshot> {
    let mut snapshot = QueueSnapshot::default();

    for (key, value) in load_values(cache, QUEUE_PATTERN, batch).await? {
        match serde_json::from_str::<QueueEntry>(&value) {
            Ok(entry) => snapshot.entries.push(entry),
            Err(e) => {
                warn!(key = %key, error = %e, "skipping malformed queue entry");
                snapshot.corrupt.push(key);
            }
        }
    }

    Ok(snapshot)
}

pub async fn load_edges(cache: &dyn CacheOps, batch: usize) -> CacheResult<EdgeSnapshot> {
    let mut snapshot = EdgeSnapshot::default();

    for (key, value) in load_values(cache, EDGE_PATTERN, batch).await? {
        match serde_json::from_str::<Edge>(&value) {
            Ok(edge) => snapshot.edges.push(edge),
            Err(e) => {
                warn!(key = %key, error = %e, "skipping malformed edge");
                snapshot.corrupt.push(key);
            }
        }
    }

    Ok(snapshot)
}

pub async fn put_entry(cache: &dyn CacheOps, entry: &QueueEntry) -> CacheResult<()> {
    let value = serde_json::to_string(entry).map_err(|e| CacheError::Format {
        key: entry.key(),
        reason: e.to_string(),
    })?;
    cache.set(&entry.key(), &value).await
}

pub async fn delete_entry(cache: &dyn CacheOps, user_id: Uuid) -> CacheResult<()> {
    cache.del(&queue_key(user_id)).await
}

pub async fn put_edge(cache: &dyn CacheOps, edge: &Edge) -> CacheResult<()> {
    let value = serde_json::to_string(edge).map_err(|e| CacheError::Format {
        key: edge.key(),
        reason: e.to_string(),
    })?;
    cache.set(&edge.key(), &value).await
}

pub async fn delete_edge(cache: &dyn CacheOps, u: Uuid, v: Uuid) -> CacheResult<()> {
    cache.del(&edge_key(u, v)).await
}

/// Flip `edge_calculated` on the freshly-read entry, preserving any
/// `priority` a concurrent scheduler cycle wrote. Returns `false` when the
/// entry is gone, in which case the flip is a no-op by design of §5's
/// field-ownership rule.
pub async fn mark_edge_calculated(cache: &dyn CacheOps, user_id: Uuid) -> CacheResult<bool> {
    let key = queue_key(user_id);
    let Some(value) = cache.get(&key).await? else {
        return Ok(false);
    };

    let mut entry: QueueEntry =
        serde_json::from_str(&value).map_err(|e| CacheError::Format {
            key: key.clone(),
            reason: e.to_string(),
        })?;
    entry.edge_calculated = true;
    put_entry(cache, &entry).await?;
    Ok(true)
}

/// Increment `priority` on the freshly-read entry, preserving a concurrent
/// `edge_calculated` flip. Returns the new priority, or `None` when the
/// entry is gone.
pub async fn bump_priority(cache: &dyn CacheOps, user_id: Uuid) -> CacheResult<Option<u32>> {
    let key = queue_key(user_id);
    let Some(value) = cache.get(&key).await? else {
        return Ok(None);
    };

    let mut entry: QueueEntry =
        serde_json::from_str(&value).map_err(|e| CacheError::Format {
            key: key.clone(),
            reason: e.to_string(),
        })?;
    entry.priority += 1;
    put_entry(cache, &entry).await?;
    Ok(Some(entry.priority))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryCache;
    use crate::model::{
        BasicProfile, Gender, MatePreference, SurveyVector, WeightVector, DIMENSION_COUNT,
    };
    use chrono::Utc;

    fn entry(user_id: Uuid) -> QueueEntry {
        QueueEntry {
            user_id,
            property_id: 1,
            survey_id: 1,
            basic: BasicProfile {
                gender: Gender::Female,
                dorm_building: 'G',
                stay_period: 2,
                is_smoker: false,
                has_fridge: false,
                mate_fridge: MatePreference::DontCare,
                has_router: false,
                mate_router: MatePreference::DontCare,
            },
            survey: SurveyVector([3; DIMENSION_COUNT]),
            weights: WeightVector([1.0; DIMENSION_COUNT]),
            priority: 0,
            registered_at: Utc::now(),
            edge_calculated: false,
        }
    }

    #[tokio::test]
    async fn test_snapshot_separates_corrupt_entries() {
        let cache = MemoryCache::new();
        let good = entry(Uuid::new_v4());
        put_entry(&cache, &good).await.unwrap();
        cache.set("queue:broken", "{not json").await.unwrap();

        let snapshot = load_queue_snapshot(&cache, 500).await.unwrap();
        assert_eq!(snapshot.entries.len(), 1);
        assert_eq!(snapshot.corrupt, vec!["queue:broken".to_string()]);
    }

    #[tokio::test]
    async fn test_mark_edge_calculated_preserves_priority() {
        let cache = MemoryCache::new();
        let mut e = entry(Uuid::new_v4());
        e.priority = 3;
        put_entry(&cache, &e).await.unwrap();

        assert!(mark_edge_calculated(&cache, e.user_id).await.unwrap());

        let raw = cache.get(&e.key()).await.unwrap().unwrap();
        let back: QueueEntry = serde_json::from_str(&raw).unwrap();
        assert!(back.edge_calculated);
        assert_eq!(back.priority, 3);
    }

    #[tokio::test]
    async fn test_mark_edge_calculated_missing_entry_noop() {
        let cache = MemoryCache::new();
        assert!(!mark_edge_calculated(&cache, Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn test_bump_priority_preserves_watermark() {
        let cache = MemoryCache::new();
        let mut e = entry(Uuid::new_v4());
        e.edge_calculated = true;
        put_entry(&cache, &e).await.unwrap();

        assert_eq!(bump_priority(&cache, e.user_id).await.unwrap(), Some(1));
        assert_eq!(bump_priority(&cache, e.user_id).await.unwrap(), Some(2));

        let raw = cache.get(&e.key()).await.unwrap().unwrap();
        let back: QueueEntry = serde_json::from_str(&raw).unwrap();
        assert!(back.edge_calculated);
        assert_eq!(back.priority, 2);
    }

    #[tokio::test]
    async fn test_mget_batching_reads_all_keys() {
        let cache = MemoryCache::new();
        let mut ids: Vec<Uuid> = (0..7).map(|_| Uuid::new_v4()).collect();
        ids.sort();
        for id in &ids {
            put_entry(&cache, &entry(*id)).await.unwrap();
        }

        // Batch smaller than the key count forces multiple MGET rounds.
        let snapshot = load_queue_snapshot(&cache, 2).await.unwrap();
        assert_eq!(snapshot.entries.len(), 7);
    }
}
