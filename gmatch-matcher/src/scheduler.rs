// Match scheduler worker
//
// Single-active-instance cycle under the distributed lock:
// snapshot -> orphan GC -> selection -> DB commit -> cache evict -> notify
// -> expire -> age -> release. A cache or DB error aborts the cycle where it
// stands; the lock is released on every path and the next tick retries from
// a fresh snapshot.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use gmatch_cache::repo;
use gmatch_cache::{CacheError, CacheOps, CycleLock, Edge, QueueEntry};
use gmatch_config::SchedulerSection;
use gmatch_notifier::{MatchEvent, Notifier};
use gmatch_store::{Contact, MatchStore, NewMatch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::MatcherResult;
use crate::selection::{self, SelectionParams};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleStats {
    pub orphans_removed: usize,
    pub pairs_committed: usize,
    pub expired: usize,
    pub aged: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Another instance holds the lock; nothing ran.
    Skipped,
    Completed(CycleStats),
}

pub struct MatchScheduler {
    cache: Arc<dyn CacheOps>,
    store: Arc<dyn MatchStore>,
    notifier: Arc<dyn Notifier>,
    config: SchedulerSection,
    lock: CycleLock,
}

impl MatchScheduler {
    pub fn new(
        cache: Arc<dyn CacheOps>,
        store: Arc<dyn MatchStore>,
        notifier: Arc<dyn Notifier>,
        config: SchedulerSection,
    ) -> Self {
        let lock = CycleLock::new(Duration::from_secs(config.lock_expire_secs));
        Self {
            cache,
            store,
            notifier,
            config,
            lock,
        }
    }

    /// One scheduler tick: take leadership, run the cycle, release.
    pub async fn tick(&self, now: DateTime<Utc>) -> MatcherResult<CycleOutcome> {
        let Some(token) = self.lock.acquire(self.cache.as_ref()).await? else {
            // Expected during deploys; another instance is leading.
            debug!("leadership lock held elsewhere, skipping cycle");
            return Ok(CycleOutcome::Skipped);
        };

        let result = self.run_cycle(now).await;

        match self.lock.release(self.cache.as_ref(), &token).await {
            Ok(true) => debug!("leadership lock released"),
            Ok(false) => warn!("leadership lock expired before release"),
            Err(e) => warn!(error = %e, "failed to release leadership lock"),
        }

        result.map(CycleOutcome::Completed)
    }

    async fn run_cycle(&self, now: DateTime<Utc>) -> MatcherResult<CycleStats> {
        let cache = self.cache.as_ref();
        let batch = self.config.mget_batch;
        let mut stats = CycleStats::default();

        // 1. Snapshot.
        let queue = repo::load_queue_snapshot(cache, batch).await?;
        let edge_snapshot = repo::load_edges(cache, batch).await?;
        let users: HashMap<Uuid, QueueEntry> = queue
            .entries
            .into_iter()
            .map(|entry| (entry.user_id, entry))
            .collect();

        // 2. Orphan GC. Undecodable edge values are reclaimed the same way.
        let mut live_edges = Vec::with_capacity(edge_snapshot.edges.len());
        for edge in edge_snapshot.edges {
            if users.contains_key(&edge.user_a) && users.contains_key(&edge.user_b) {
                live_edges.push(edge);
            } else {
                repo::delete_edge(cache, edge.user_a, edge.user_b).await?;
                stats.orphans_removed += 1;
            }
        }
        for key in &edge_snapshot.corrupt {
            cache.del(key).await?;
            stats.orphans_removed += 1;
        }

        // 3..5. Admission, deterministic sort, greedy selection.
        let params = SelectionParams {
            threshold: self.config.match_threshold,
            priority_bypass: self
                .config
                .priority_bypass_enabled
                .then_some(self.config.priority_bypass),
        };
        let selected = selection::select_pairs(&live_edges, &users, &params);

        let mut paired: HashSet<Uuid> = HashSet::new();
        for edge in &selected {
            paired.insert(edge.user_a);
            paired.insert(edge.user_b);
        }

        // 6. Commit all pairings in one transaction. Failure aborts here:
        // no cache mutation has happened for any pair.
        if !selected.is_empty() {
            let mut rows = Vec::with_capacity(selected.len());
            let mut matched_props = Vec::with_capacity(selected.len() * 2);
            for edge in &selected {
                let (Some(a), Some(b)) = (users.get(&edge.user_a), users.get(&edge.user_b))
                else {
                    continue;
                };
                rows.push(NewMatch {
                    matched_at: now,
                    user_a: a.user_id,
                    user_b: b.user_id,
                    prop_a: a.property_id,
                    prop_b: b.property_id,
                    surv_a: a.survey_id,
                    surv_b: b.survey_id,
                    compatibility_score: edge.score,
                });
                matched_props.push(a.property_id);
                matched_props.push(b.property_id);
            }

            self.store.commit_matches(&rows, &matched_props).await?;
            stats.pairs_committed = rows.len();
            for row in &rows {
                info!(
                    user_a = %row.user_a,
                    user_b = %row.user_b,
                    score = row.compatibility_score,
                    "pair committed"
                );
            }
        }

        // 7. Evict paired entries. The rows are durable, so a failed delete
        // is only deferred cleanup: the entry comes back as an orphan
        // endpoint next cycle.
        for user_id in &paired {
            if let Err(e) = repo::delete_entry(cache, *user_id).await {
                warn!(user_id = %user_id, error = %e, "failed to evict paired entry");
            }
        }

        // 8. Matched notifications, strictly best-effort.
        self.notify_matched(&selected, &users).await;

        // 9. Expire long-waiters. The status transition lands before the
        // queue eviction so no eviction can go unrecorded.
        let expire_after = chrono::Duration::seconds(self.config.expire_after_secs as i64);
        let expired: Vec<&QueueEntry> = users
            .values()
            .filter(|entry| {
                !paired.contains(&entry.user_id) && now - entry.registered_at > expire_after
            })
            .collect();

        if !expired.is_empty() {
            let property_ids: Vec<i64> = expired.iter().map(|entry| entry.property_id).collect();
            self.store.expire_properties(&property_ids).await?;

            for entry in &expired {
                if let Err(e) = repo::delete_entry(cache, entry.user_id).await {
                    warn!(user_id = %entry.user_id, error = %e, "failed to evict expired entry");
                }
                info!(
                    user_id = %entry.user_id,
                    registered_at = %entry.registered_at,
                    "expired candidate removed from queue"
                );
            }
            stats.expired = expired.len();

            self.notify_expired(&expired).await;
        }

        // 10. Age the survivors on a fresh read so a concurrent watermark
        // flip is preserved.
        let expired_ids: HashSet<Uuid> = expired.iter().map(|entry| entry.user_id).collect();
        for entry in users.values() {
            if paired.contains(&entry.user_id) || expired_ids.contains(&entry.user_id) {
                continue;
            }
            match repo::bump_priority(cache, entry.user_id).await {
                Ok(Some(_)) => stats.aged += 1,
                // Cancelled by the producer since the snapshot.
                Ok(None) => {}
                Err(CacheError::Format { key, reason }) => {
                    warn!(key = %key, reason = %reason, "skipping aging of malformed entry");
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(
            orphans = stats.orphans_removed,
            pairs = stats.pairs_committed,
            expired = stats.expired,
            aged = stats.aged,
            "cycle complete"
        );
        Ok(stats)
    }

    async fn notify_matched(&self, selected: &[Edge], users: &HashMap<Uuid, QueueEntry>) {
        if selected.is_empty() {
            return;
        }

        let user_ids: Vec<Uuid> = selected
            .iter()
            .flat_map(|edge| [edge.user_a, edge.user_b])
            .collect();
        let contacts = match self.store.fetch_contacts(&user_ids).await {
            Ok(contacts) => contacts
                .into_iter()
                .map(|contact| (contact.user_id, contact))
                .collect::<HashMap<Uuid, Contact>>(),
            Err(e) => {
                warn!(error = %e, "contact lookup failed, skipping matched notifications");
                return;
            }
        };

        for edge in selected {
            if !users.contains_key(&edge.user_a) || !users.contains_key(&edge.user_b) {
                continue;
            }
            for (user_id, partner_id) in [(edge.user_a, edge.user_b), (edge.user_b, edge.user_a)] {
                let Some(contact) = contacts.get(&user_id) else {
                    continue;
                };
                let Some(email) = contact.email.as_deref().filter(|e| !e.is_empty()) else {
                    continue;
                };
                let partner_name = contacts
                    .get(&partner_id)
                    .and_then(|partner| partner.nickname.clone());

                self.notifier.enqueue(MatchEvent::Matched {
                    email: email.to_string(),
                    display_name: contact.display_name(),
                    partner_name,
                    score: edge.score,
                });
            }
        }
    }

    async fn notify_expired(&self, expired: &[&QueueEntry]) {
        let user_ids: Vec<Uuid> = expired.iter().map(|entry| entry.user_id).collect();
        let contacts = match self.store.fetch_contacts(&user_ids).await {
            Ok(contacts) => contacts,
            Err(e) => {
                warn!(error = %e, "contact lookup failed, skipping expired notifications");
                return;
            }
        };

        for contact in contacts {
            let Some(email) = contact.email.as_deref().filter(|e| !e.is_empty()) else {
                continue;
            };
            self.notifier.enqueue(MatchEvent::Expired {
                email: email.to_string(),
                display_name: contact.display_name(),
            });
        }
    }

    /// Scheduler loop with the sleep discipline
    /// `max(0, interval - cycle_elapsed)`; an overrun logs a warning and
    /// triggers the next cycle immediately.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        let interval = Duration::from_secs(self.config.interval_secs);
        info!(interval_secs = interval.as_secs(), "match scheduler started");
        tokio::pin!(shutdown);

        loop {
            let started = Instant::now();
            match self.tick(Utc::now()).await {
                Ok(CycleOutcome::Completed(_)) => {}
                Ok(CycleOutcome::Skipped) => {}
                // Transient by policy: next tick retries from a fresh snapshot.
                Err(e) => error!(error = %e, "cycle failed"),
            }

            let elapsed = started.elapsed();
            let wait = if elapsed >= interval {
                warn!(
                    elapsed_secs = elapsed.as_secs(),
                    interval_secs = interval.as_secs(),
                    "cycle overran the interval, triggering immediately"
                );
                Duration::ZERO
            } else {
                interval - elapsed
            };

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("match scheduler shutting down");
                    break;
                }
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }
}
