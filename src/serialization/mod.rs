//! Persisted session formats.
//!
//! [`GameSnapshot`] is the single in-memory form. It is written either as
//! camelCase JSON (the interchange format) or as a compact postcard payload
//! inside a checksummed container. Both readers validate the full snapshot
//! before handing it back.

mod binary;
mod snapshot;

pub use binary::{decode_snapshot, encode_snapshot, BinaryError};
pub use snapshot::{GameSnapshot, GridSnapshot, SnapshotError, MAX_TILE};
