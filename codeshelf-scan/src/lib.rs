// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # CodeShelf Scan
//!
//! Turns decoded QR payloads into history records.
//!
//! - [`ScanPipeline`] - Long-lived camera session: debounce, classify,
//!   resolve redirects, record
//! - [`ShareIngestPipeline`] - One-shot ingest of a shared URL or text
//! - [`Recorder`] - The recording step both pipelines end in
//!
//! Platform collaborators are plain trait objects from `codeshelf-core`:
//! [`PngRenderer`] renders codes, [`KnownSchemes`] decides which custom
//! schemes count as deep links, and the [`location`] module has simple
//! location providers.
//!
//! ## Example
//!
//! ```ignore
//! use codeshelf_scan::{ScanEvent, ScanPipeline};
//!
//! let session = ScanPipeline::new(recorder, resolver, opener).start();
//! let mut events = session.subscribe();
//!
//! session.payload_decoded("https://bit.ly/demo").await?;
//! while let Ok(event) = events.recv().await {
//!     if let ScanEvent::Recorded(record) = event {
//!         println!("{}", record.display_text());
//!         break;
//!     }
//! }
//! session.stop().await;
//! ```

pub mod classify;
pub mod error;
pub mod events;
pub mod location;
pub mod opener;
pub mod pipeline;
pub mod recorder;
pub mod render;
pub mod share;

pub use classify::{classify, display_text};
pub use error::ScanError;
pub use events::ScanEvent;
pub use location::{DeniedLocation, FixedLocation, NoLocation};
pub use opener::KnownSchemes;
pub use pipeline::{ScanPipeline, ScanSession};
pub use recorder::Recorder;
pub use render::PngRenderer;
pub use share::ShareIngestPipeline;

#[cfg(test)]
mod pipeline_tests;
