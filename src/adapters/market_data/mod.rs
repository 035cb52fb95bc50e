//! Market Data Adapters
//!
//! - `SnapshotMarketData`: JSON snapshot of the candidate universe, read from
//!   a local file or fetched over HTTP on every scan

mod snapshot;

pub use snapshot::{parse_snapshot, SnapshotMarketData, SnapshotSource};
