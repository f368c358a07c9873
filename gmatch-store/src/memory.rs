// In-memory store backend for tests and local runs

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::model::{
    ApprovalState, Contact, FinalMatchStatus, MatchRecord, NewMatch, PropertyMatchStatus,
};
use crate::store::MatchStore;

#[derive(Default)]
struct Inner {
    matches: Vec<MatchRecord>,
    property_status: BTreeMap<i64, i16>,
    contacts: BTreeMap<Uuid, Contact>,
    next_match_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    fail_commits: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `commit_matches` fail, for exercising the
    /// abort-before-cache-mutation path.
    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    pub fn insert_contact(&self, contact: Contact) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.contacts.insert(contact.user_id, contact);
        }
    }

    pub fn matches(&self) -> Vec<MatchRecord> {
        self.inner
            .lock()
            .map(|inner| inner.matches.clone())
            .unwrap_or_default()
    }

    pub fn property_status(&self, property_id: i64) -> Option<i16> {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.property_status.get(&property_id).copied())
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn commit_matches(
        &self,
        rows: &[NewMatch],
        matched_property_ids: &[i64],
    ) -> StoreResult<()> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Transient("injected commit failure".to_string()));
        }

        let mut inner = self
            .inner
            .lock()
            .map_err(|_| StoreError::Transient("memory store poisoned".to_string()))?;

        for row in rows {
            inner.next_match_id += 1;
            let match_id = inner.next_match_id;
            inner.matches.push(MatchRecord {
                match_id,
                matched_at: row.matched_at,
                user_a: row.user_a,
                user_b: row.user_b,
                prop_a: row.prop_a,
                prop_b: row.prop_b,
                surv_a: row.surv_a,
                surv_b: row.surv_b,
                compatibility_score: row.compatibility_score,
                a_approval: ApprovalState::Pending,
                b_approval: ApprovalState::Pending,
                final_match_status: FinalMatchStatus::Pending,
            });
        }

        for property_id in matched_property_ids {
            inner
                .property_status
                .insert(*property_id, PropertyMatchStatus::Matched as i16);
        }

        Ok(())
    }

    async fn expire_properties(&self, property_ids: &[i64]) -> StoreResult<u64> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| StoreError::Transient("memory store poisoned".to_string()))?;

        for property_id in property_ids {
            inner
                .property_status
                .insert(*property_id, PropertyMatchStatus::Expired as i16);
        }

        Ok(property_ids.len() as u64)
    }

    async fn fetch_contacts(&self, user_ids: &[Uuid]) -> StoreResult<Vec<Contact>> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| StoreError::Transient("memory store poisoned".to_string()))?;

        Ok(user_ids
            .iter()
            .filter_map(|id| inner.contacts.get(id).cloned())
            .collect())
    }
}
