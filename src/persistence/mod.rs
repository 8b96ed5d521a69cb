//! Persistence layer: append-only logs and latest-snapshot files.
//!
//! [`Sink`] is the only entry point the poller uses. It owns up to three
//! independent outputs: a line-delimited JSON log, a CSV export, and the
//! latest raw snapshots inside a data directory.

pub mod line_log;
pub mod records;
pub mod sink;
pub mod snapshot_files;
pub mod tabular;

pub use line_log::LineLog;
pub use records::LineRecord;
pub use sink::{Sink, WriteReport};
pub use snapshot_files::SnapshotFiles;
pub use tabular::{TabularLog, write_table};
