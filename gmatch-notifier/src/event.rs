// Notification events emitted by the match scheduler

#[derive(Debug, Clone, PartialEq)]
pub enum MatchEvent {
    /// A pairing was committed; one event per candidate.
    Matched {
        email: String,
        display_name: String,
        partner_name: Option<String>,
        score: f64,
    },
    /// The candidate's queue entry timed out.
    Expired {
        email: String,
        display_name: String,
    },
}

impl MatchEvent {
    pub fn recipient(&self) -> &str {
        match self {
            MatchEvent::Matched { email, .. } => email,
            MatchEvent::Expired { email, .. } => email,
        }
    }
}
