//! Domain types shared by every detectq crate.
//!
//! Nothing in here performs I/O on the request path; the HTTP server,
//! worker pool and pipeline crates build on these values.

pub mod artifacts;
pub mod correlation;
pub mod detection;
pub mod error;
pub mod job;
pub mod labels;
pub mod types;
