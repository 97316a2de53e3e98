//! Core data model shared by every input and output.
//!
//! - [`value`]: the tagged-union field type
//! - [`record`]: the positional record and the decoder/encoder signatures

pub mod record;
pub mod value;

pub use record::{Decoder, Encoder, Record};
pub use value::{Value, ValueKind};
