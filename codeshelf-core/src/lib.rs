// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `CodeShelf` Core
//!
//! Core types, link sanitizing, and scan debouncing for the `CodeShelf`
//! application.
//!
//! This crate provides the foundational abstractions used across all other
//! `CodeShelf` crates, including:
//!
//! - Domain models (code records, provenance, scan locations, payload kinds)
//! - Link helpers (tracking-parameter filter, link extraction, prettifying)
//! - The scan debouncer
//! - Collaborator traits (location, scheme opening, QR rendering)
//!
//! ## Key Types
//!
//! ### Records
//! - [`CodeRecord`] - One generated, scanned, or shared code
//! - [`Provenance`] - How a record was produced
//! - [`GeoPoint`] - Latitude/longitude captured at scan time
//!
//! ### Payloads
//! - [`PayloadKind`] - Web URL, deep link, or plain text
//! - [`TrackingFilter`] - Removes marketing query parameters
//! - [`extract_link`] - First hyperlink in free-form text
//!
//! ### Scanning
//! - [`ScanDebouncer`] - Suppresses repeated detections of the same payload

pub mod debounce;
pub mod error;
pub mod link;
pub mod models;
pub mod traits;

pub use debounce::{Observation, ScanDebouncer};
pub use error::CoreError;
pub use link::{
    TRACKING_PARAMETERS, TrackingFilter, extract_link, prettify, strip_tracking_parameters,
};
pub use models::{CodeRecord, GeoPoint, PayloadKind, Provenance, RecordId};
pub use traits::{LocationError, LocationProvider, QrRenderer, SchemeOpener};
