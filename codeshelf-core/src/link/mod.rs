//! Link helpers.
//!
//! Pure functions over URL strings, no I/O:
//!
//! - [`tracking`] - Removes marketing/attribution query parameters
//! - [`extract`] - Finds the first hyperlink inside free-form text
//! - [`pretty`] - Short display form of a URL

pub mod extract;
pub mod pretty;
pub mod tracking;

pub use extract::{extract_link, find_link};
pub use pretty::prettify;
pub use tracking::{TRACKING_PARAMETERS, TrackingFilter, strip_tracking_parameters};
