// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # CodeShelf Fetch
//!
//! Network side of link resolution for the CodeShelf application.
//!
//! Scanned QR codes often point at link shorteners whose redirect chain
//! carries attribution parameters. This crate follows such chains without
//! leaking state between lookups:
//!
//! - [`client::HttpClient`] - A throwaway, cookie-free HTTP session that
//!   never follows redirects on its own
//! - [`resolver::RedirectResolver`] - Follows redirects hop by hop, stripping
//!   tracking parameters from every target before requesting it
//! - [`resolver::LinkResolver`] - Seam used by the scan pipeline
//!
//! ## Example
//!
//! ```ignore
//! use codeshelf_fetch::{RedirectResolver, ResolverConfig};
//!
//! let resolver = RedirectResolver::new(ResolverConfig::default());
//! let resolution = resolver.follow(&"https://bit.ly/demo".parse()?).await?;
//! println!("{}", resolution.final_url);
//! ```

pub mod client;
pub mod error;
pub mod resolver;

pub use client::HttpClient;
pub use error::FetchError;
pub use resolver::{LinkResolver, RedirectResolver, Resolution, ResolverConfig};
