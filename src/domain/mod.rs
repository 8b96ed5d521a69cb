//! Domain layer: feed snapshots and their identifiers.
//!
//! Snapshots are immutable once fetched. The poller keeps at most one
//! "last accepted" value of each kind and replaces it wholesale when a
//! newer fetch differs.

pub mod competition_id;
pub mod fetched;
pub mod odds;
pub mod snapshot;

pub use competition_id::CompetitionId;
pub use fetched::Fetched;
pub use odds::MatchOdds;
pub use snapshot::{Channel, Match, MatchesSnapshot, SnapshotKind, TimingsSnapshot};
