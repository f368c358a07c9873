// Relational row types and status encodings

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Approval column encoding in `match_history`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum ApprovalState {
    Pending = 0,
    Approved = 1,
    Rejected = 2,
}

/// `final_match_status` column encoding in `match_history`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum FinalMatchStatus {
    Pending = 0,
    Success = 1,
    Failed = 2,
}

/// `match_status` column encoding in `match_properties`. The core writes
/// only `Matched` (on pairing) and `Expired` (on queue timeout); every other
/// transition belongs to the web-facing service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum PropertyMatchStatus {
    NotStarted = 0,
    InQueue = 1,
    Matched = 2,
    MyApproved = 3,
    BothApproved = 4,
    PartnerRejected = 5,
    PartnerRematched = 6,
    Expired = 9,
}

/// A pairing to be inserted into `match_history`; both approvals start
/// pending.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMatch {
    pub matched_at: DateTime<Utc>,
    pub user_a: Uuid,
    pub user_b: Uuid,
    pub prop_a: i64,
    pub prop_b: i64,
    pub surv_a: i64,
    pub surv_b: i64,
    pub compatibility_score: f64,
}

/// A committed `match_history` row.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub match_id: i64,
    pub matched_at: DateTime<Utc>,
    pub user_a: Uuid,
    pub user_b: Uuid,
    pub prop_a: i64,
    pub prop_b: i64,
    pub surv_a: i64,
    pub surv_b: i64,
    pub compatibility_score: f64,
    pub a_approval: ApprovalState,
    pub b_approval: ApprovalState,
    pub final_match_status: FinalMatchStatus,
}

/// Contact details for notification fan-out, read from the account table.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub nickname: Option<String>,
    pub name: Option<String>,
}

impl Contact {
    /// Preferred display name for mail bodies.
    pub fn display_name(&self) -> String {
        self.nickname
            .clone()
            .or_else(|| self.name.clone())
            .unwrap_or_else(|| "resident".to_string())
    }
}
