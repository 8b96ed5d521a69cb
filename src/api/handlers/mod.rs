//! Endpoint handlers organized by resource.

pub mod snapshots;
pub mod system;
