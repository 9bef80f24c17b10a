//! Core library for onenote-md
//!
//! This crate implements the **Functional Core** of the onenote-md application,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! - **`onenote_md_core`** (this crate): transformations with no network access
//! - **`onenote-md`**: HTTP, filesystem writes, prompting and orchestration (the Imperative Shell)
//!
//! The only module touching the filesystem is [`cache`], which owns the
//! conversion cache file the same way the rest of the core owns its data types.
//!
//! # Module Organization
//!
//! - [`graph`]: Microsoft Graph OneNote payloads, domain models and endpoint URLs
//! - [`convert`]: HTML to Markdown conversion
//! - [`filename`]: output file naming, date prefixes and collision handling
//! - [`cache`]: durable set of converted page ids
//! - [`retry`]: status classification and backoff policy
//! - [`prompt`]: parsing of interactive answers
//!
//! # Example Usage
//!
//! ```rust
//! use onenote_md_core::convert::convert;
//!
//! let markdown = convert("<h1>Trip</h1><p>Pack <b>sunscreen</b></p>");
//! assert_eq!(markdown, "# Trip\n\nPack **sunscreen**\n");
//! ```

pub mod cache;
pub mod convert;
pub mod filename;
pub mod graph;
pub mod prompt;
pub mod retry;
