// gmatch-store: Relational adapter
// Match history rows and property-status transitions in Postgres. The table
// schema is owned by the web-facing service; this crate only performs the
// writes the matching core is responsible for (initial history rows, the
// matched/expired status transitions) and the contact lookup for mail.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod error;
pub mod memory;
pub mod model;
pub mod pg;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use model::{
    ApprovalState, Contact, FinalMatchStatus, MatchRecord, NewMatch, PropertyMatchStatus,
};
pub use pg::PgStore;
pub use store::MatchStore;
