//! Ready-made decoders and encoders.

pub mod json;

pub use json::{object_decoder, object_encoder, FieldSpec};
