//! JSON object codecs.
//!
//! A list of [`FieldSpec`]s fixes which key lands at which record position.
//! [`object_decoder`] reads one JSON object per raw item; [`object_encoder`]
//! writes one JSON object per record, keys in field order.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{Decoder, Encoder, Record, Value, ValueKind};
use crate::error::{GallonError, Result};

/// One named, optionally typed, record position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,

    /// Expected kind; `None` accepts any scalar.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ValueKind>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind: Some(kind),
        }
    }

    pub fn any(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
        }
    }

    fn check(&self, value: Value) -> Result<Value> {
        let Some(kind) = self.kind else {
            return Ok(value);
        };
        match (kind, value) {
            (_, Value::Null) => Ok(Value::Null),
            (ValueKind::Float, Value::Int(i)) => Ok(Value::Float(i as f64)),
            (kind, value) if value.kind() == kind => Ok(value),
            (kind, value) => Err(GallonError::decode(format!(
                "field '{}' expected {}, got {}",
                self.name,
                kind,
                value.kind()
            ))),
        }
    }
}

/// Decode one JSON object into a record following `fields`.
///
/// Missing keys decode to [`Value::Null`]; keys not listed are ignored.
pub fn decode_object(fields: &[FieldSpec], raw: &[u8]) -> Result<Record> {
    let json: serde_json::Value = serde_json::from_slice(raw)?;
    let serde_json::Value::Object(mut object) = json else {
        return Err(GallonError::decode("expected a JSON object"));
    };

    fields
        .iter()
        .map(|field| {
            let value = match object.remove(&field.name) {
                Some(json) => Value::from_json(json)
                    .map_err(|e| GallonError::decode(format!("field '{}': {}", field.name, e)))?,
                None => Value::Null,
            };
            field.check(value)
        })
        .collect()
}

/// Encode a record as a JSON object with keys in `fields` order.
pub fn encode_object(fields: &[FieldSpec], record: &Record) -> Result<Vec<u8>> {
    if record.len() != fields.len() {
        return Err(GallonError::encode(format!(
            "record has {} fields, expected {}",
            record.len(),
            fields.len()
        )));
    }

    let mut out = Vec::with_capacity(16 * fields.len() + 2);
    out.push(b'{');
    for (i, (field, value)) in fields.iter().zip(record).enumerate() {
        if i > 0 {
            out.push(b',');
        }
        serde_json::to_writer(&mut out, &field.name)?;
        out.push(b':');
        serde_json::to_writer(&mut out, &value.to_json())?;
    }
    out.push(b'}');
    Ok(out)
}

/// [`Decoder`] built on [`decode_object`].
pub fn object_decoder(fields: Vec<FieldSpec>) -> Decoder {
    Arc::new(move |raw: &[u8]| decode_object(&fields, raw))
}

/// [`Encoder`] built on [`encode_object`].
pub fn object_encoder(fields: Vec<FieldSpec>) -> Encoder {
    Arc::new(move |record: &Record| encode_object(&fields, record))
}
