// Store adapter interface

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::model::{Contact, NewMatch};

#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Commit one scheduler cycle's pairings: insert every `match_history`
    /// row and flip every listed property row to `match_status = 2`, in a
    /// single transaction. Either everything lands or nothing does; on
    /// error no cache mutation for the cycle may proceed.
    async fn commit_matches(
        &self,
        rows: &[NewMatch],
        matched_property_ids: &[i64],
    ) -> StoreResult<()>;

    /// Mark expired candidates with `match_status = 9` in one batched
    /// statement. Returns the number of rows updated.
    async fn expire_properties(&self, property_ids: &[i64]) -> StoreResult<u64>;

    /// Look up mail contacts for the given users. Users without an account
    /// row are simply absent from the result.
    async fn fetch_contacts(&self, user_ids: &[Uuid]) -> StoreResult<Vec<Contact>>;
}
