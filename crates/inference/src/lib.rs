//! Object-detection engines.
//!
//! [`InferenceEngine`] is the seam between the worker pipeline and whatever
//! runs the model. The crate ships [`TfServingEngine`], a REST client for a
//! TensorFlow-Serving style model server hosting an SSD-type detector.

pub mod engine;
pub mod tfserving;

pub use engine::{DecodedImage, InferenceEngine, InferenceError, RawDetections};
pub use tfserving::{InputFormat, TfServingConfig, TfServingEngine};
