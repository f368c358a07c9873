// Edge calculator worker
//
// Single-instance polling loop. Each tick partitions the queue into
// processed and new entries, computes compatibility edges for the new ones
// in registration order, and flips `edge_calculated` on a fresh read so a
// concurrent scheduler priority write is never clobbered. The watermark is
// the only durable state; a restart simply recomputes from it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use gmatch_cache::repo;
use gmatch_cache::{CacheError, CacheOps, Edge, QueueEntry};
use tracing::{debug, error, info, warn};

use crate::error::MatcherResult;
use crate::scoring;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickStats {
    pub processed: usize,
    pub edges_created: usize,
    pub corrupt_skipped: usize,
}

pub struct EdgeCalculator {
    cache: Arc<dyn CacheOps>,
    poll_interval: Duration,
    mget_batch: usize,
}

impl EdgeCalculator {
    pub fn new(cache: Arc<dyn CacheOps>, poll_interval: Duration, mget_batch: usize) -> Self {
        Self {
            cache,
            poll_interval,
            mget_batch,
        }
    }

    /// One polling tick.
    pub async fn run_once(&self) -> MatcherResult<TickStats> {
        let snapshot = repo::load_queue_snapshot(self.cache.as_ref(), self.mget_batch).await?;
        let mut stats = TickStats {
            corrupt_skipped: snapshot.corrupt.len(),
            ..TickStats::default()
        };

        let (mut calculated, mut fresh): (Vec<QueueEntry>, Vec<QueueEntry>) = snapshot
            .entries
            .into_iter()
            .partition(|entry| entry.edge_calculated);

        if fresh.is_empty() {
            debug!("no new queue entries");
            return Ok(stats);
        }

        // Oldest registrations first; the id tiebreak keeps replays stable.
        fresh.sort_by(|a, b| {
            a.registered_at
                .cmp(&b.registered_at)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });

        info!(count = fresh.len(), "processing new queue entries");

        for entry in fresh {
            let edges = self.process_entry(&entry, &calculated).await?;
            stats.processed += 1;
            stats.edges_created += edges;

            // Entries processed earlier in this pass count as calculated for
            // the ones that follow.
            match repo::mark_edge_calculated(self.cache.as_ref(), entry.user_id).await {
                Ok(true) => calculated.push(entry),
                Ok(false) => {
                    // Deleted by the scheduler mid-pass; the flip is a no-op.
                    debug!(user_id = %entry.user_id, "entry vanished before watermark flip");
                }
                Err(CacheError::Format { key, reason }) => {
                    warn!(key = %key, reason = %reason, "entry overwritten with malformed data, leaving unprocessed");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(stats)
    }

    async fn process_entry(
        &self,
        entry: &QueueEntry,
        calculated: &[QueueEntry],
    ) -> MatcherResult<usize> {
        let mut edges_created = 0;

        for other in calculated {
            if other.user_id == entry.user_id {
                continue;
            }
            if !scoring::hard_filter(&entry.basic, &other.basic) {
                continue;
            }

            let score = scoring::compatibility(entry, other);
            let edge = Edge::new(entry.user_id, other.user_id, score, Utc::now());
            repo::put_edge(self.cache.as_ref(), &edge).await?;
            edges_created += 1;
        }

        info!(user_id = %entry.user_id, edges = edges_created, "entry processed");
        Ok(edges_created)
    }

    /// Polling loop. Runs until `shutdown` resolves; the current tick always
    /// finishes first.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        info!(
            interval_secs = self.poll_interval.as_secs(),
            "edge calculator started"
        );
        tokio::pin!(shutdown);

        loop {
            match self.run_once().await {
                Ok(stats) if stats.processed > 0 => {
                    info!(
                        processed = stats.processed,
                        edges = stats.edges_created,
                        "tick complete"
                    );
                }
                Ok(_) => {}
                // Transient by policy: retried with a fresh snapshot next tick.
                Err(e) => error!(error = %e, "tick failed"),
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("edge calculator shutting down");
                    break;
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use gmatch_cache::{
        edge_key, BasicProfile, Gender, MatePreference, MemoryCache, SurveyVector, WeightVector,
        DIMENSION_COUNT,
    };
    use uuid::Uuid;

    fn entry_at(registered_at: DateTime<Utc>) -> QueueEntry {
        QueueEntry {
            user_id: Uuid::new_v4(),
            property_id: 1,
            survey_id: 1,
            basic: BasicProfile {
                gender: Gender::Male,
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
            registered_at,
            edge_calculated: false,
        }
    }

    fn calculator(cache: Arc<MemoryCache>) -> EdgeCalculator {
        EdgeCalculator::new(cache, Duration::from_secs(10), 500)
    }

    async fn load_entry(cache: &MemoryCache, id: Uuid) -> QueueEntry {
        let raw = cache.get(&gmatch_cache::queue_key(id)).await.unwrap().unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[tokio::test]
    async fn test_pair_produces_one_edge_and_flips_watermarks() {
        let cache = Arc::new(MemoryCache::new());
        let t0 = Utc.with_ymd_and_hms(2026, 8, 1, 9, 0, 0).unwrap();
        let a = entry_at(t0);
        let b = entry_at(t0 + chrono::Duration::seconds(1));
        repo::put_entry(cache.as_ref(), &a).await.unwrap();
        repo::put_entry(cache.as_ref(), &b).await.unwrap();

        let stats = calculator(cache.clone()).run_once().await.unwrap();
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.edges_created, 1);

        let raw = cache
            .get(&edge_key(a.user_id, b.user_id))
            .await
            .unwrap()
            .unwrap();
        let edge: Edge = serde_json::from_str(&raw).unwrap();
        assert_eq!(edge.score, 100.00);

        assert!(load_entry(&cache, a.user_id).await.edge_calculated);
        assert!(load_entry(&cache, b.user_id).await.edge_calculated);
    }

    #[tokio::test]
    async fn test_hard_filter_suppresses_edges() {
        let cache = Arc::new(MemoryCache::new());
        let t0 = Utc.with_ymd_and_hms(2026, 8, 1, 9, 0, 0).unwrap();
        let a = entry_at(t0);
        let mut b = entry_at(t0 + chrono::Duration::seconds(1));
        b.basic.gender = Gender::Female;
        repo::put_entry(cache.as_ref(), &a).await.unwrap();
        repo::put_entry(cache.as_ref(), &b).await.unwrap();

        let stats = calculator(cache.clone()).run_once().await.unwrap();
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.edges_created, 0);
        assert!(cache.keys("edge:*").await.unwrap().is_empty());

        // Both entries are still marked processed.
        assert!(load_entry(&cache, a.user_id).await.edge_calculated);
        assert!(load_entry(&cache, b.user_id).await.edge_calculated);
    }

    #[tokio::test]
    async fn test_rerun_without_new_entries_is_noop() {
        let cache = Arc::new(MemoryCache::new());
        let t0 = Utc.with_ymd_and_hms(2026, 8, 1, 9, 0, 0).unwrap();
        repo::put_entry(cache.as_ref(), &entry_at(t0)).await.unwrap();
        repo::put_entry(cache.as_ref(), &entry_at(t0 + chrono::Duration::seconds(1)))
            .await
            .unwrap();

        let calc = calculator(cache.clone());
        calc.run_once().await.unwrap();
        let edges_before = cache.keys("edge:*").await.unwrap();

        let stats = calc.run_once().await.unwrap();
        assert_eq!(stats.processed, 0);
        assert_eq!(stats.edges_created, 0);
        assert_eq!(cache.keys("edge:*").await.unwrap(), edges_before);
    }

    #[tokio::test]
    async fn test_full_coverage_after_batch() {
        // Three entries arriving in one tick still produce all three edges:
        // later entries see earlier ones from the same pass.
        let cache = Arc::new(MemoryCache::new());
        let t0 = Utc.with_ymd_and_hms(2026, 8, 1, 9, 0, 0).unwrap();
        for i in 0..3 {
            repo::put_entry(
                cache.as_ref(),
                &entry_at(t0 + chrono::Duration::seconds(i)),
            )
            .await
            .unwrap();
        }

        let stats = calculator(cache.clone()).run_once().await.unwrap();
        assert_eq!(stats.processed, 3);
        assert_eq!(stats.edges_created, 3);
        assert_eq!(cache.keys("edge:*").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_corrupt_entry_skipped_not_marked() {
        let cache = Arc::new(MemoryCache::new());
        cache.set("queue:broken", "{oops").await.unwrap();
        let t0 = Utc.with_ymd_and_hms(2026, 8, 1, 9, 0, 0).unwrap();
        repo::put_entry(cache.as_ref(), &entry_at(t0)).await.unwrap();

        let stats = calculator(cache.clone()).run_once().await.unwrap();
        assert_eq!(stats.corrupt_skipped, 1);
        assert_eq!(stats.processed, 1);
        // The corrupt value is untouched and will be retried next tick.
        assert_eq!(cache.get("queue:broken").await.unwrap().as_deref(), Some("{oops"));
    }

    #[tokio::test]
    async fn test_priority_update_not_clobbered_by_flip() {
        // Scheduler bumps priority between the snapshot and the flip; the
        // fresh-read flip must preserve it.
        let cache = Arc::new(MemoryCache::new());
        let t0 = Utc.with_ymd_and_hms(2026, 8, 1, 9, 0, 0).unwrap();
        let a = entry_at(t0);
        repo::put_entry(cache.as_ref(), &a).await.unwrap();

        // Simulate the concurrent write before the calculator runs its flip;
        // a single-entry pass reads the snapshot, computes nothing, then
        // re-reads for the flip.
        repo::bump_priority(cache.as_ref(), a.user_id).await.unwrap();
        repo::bump_priority(cache.as_ref(), a.user_id).await.unwrap();
        repo::bump_priority(cache.as_ref(), a.user_id).await.unwrap();

        calculator(cache.clone()).run_once().await.unwrap();

        let after = load_entry(&cache, a.user_id).await;
        assert!(after.edge_calculated);
        assert_eq!(after.priority, 3);
    }
}
