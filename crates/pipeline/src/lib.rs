//! Per-job image processing: decode, detect, annotate, encode.
//!
//! [`Pipeline::process`] runs every stage for one job and writes the
//! annotated result next to the persisted input. CPU-heavy stages run on
//! Tokio's blocking pool.

pub mod annotate;
pub mod codec;
pub mod error;
mod font;
pub mod pipeline;

pub use error::PipelineError;
pub use pipeline::{JobReport, Pipeline, PipelineSettings};
