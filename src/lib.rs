//! # vfl-poller
//!
//! Adaptive poller for a live virtual-football timing feed.
//!
//! The feed exposes two JSON resources: *timings* (per-channel phase
//! boundaries plus the server clock) and *matches* (the schedule of the
//! active competition). The poller fetches both, records only snapshots
//! that differ from the last accepted ones, and schedules the next poll
//! from the soonest phase end the feed reports instead of a fixed
//! interval.
//!
//! ## Architecture
//!
//! ```text
//! CLI / host process (main, api/)
//!     │
//!     ├── Poller (poller/)
//!     │     ├── Change detector
//!     │     └── Delay calculator
//!     │
//!     ├── FeedSource → HttpFeed (feed/)
//!     │
//!     └── Sink (persistence/)
//!           ├── JSONL log
//!           ├── CSV export
//!           └── latest snapshot files
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod feed;
pub mod persistence;
pub mod poller;
pub mod report;
