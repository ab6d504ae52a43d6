//! Domain models for `CodeShelf`.
//!
//! ## Submodules
//!
//! - [`record`] - Persisted code records (CodeRecord, Provenance, GeoPoint)
//! - [`payload`] - Classification of decoded payloads

mod payload;
mod record;

pub use payload::PayloadKind;
pub use record::{CodeRecord, GeoPoint, Provenance, RecordId};
#[cfg(test)]
mod serde_tests;
