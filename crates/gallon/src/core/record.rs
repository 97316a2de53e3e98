//! The record interchange type and the codec function signatures.

use std::sync::Arc;

use super::value::Value;
use crate::error::Result;

/// An ordered, position-addressed tuple of field values.
///
/// Position `i` carries the same field in every record of a run; what that
/// field means is agreed between the input's decoder and the output's encoder.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Field at position `index`, if the record has that many fields.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl From<Vec<Value>> for Record {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

impl FromIterator<Value> for Record {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl std::ops::Index<usize> for Record {
    type Output = Value;

    fn index(&self, index: usize) -> &Self::Output {
        &self.values[index]
    }
}

/// Build a [`Record`] from a list of expressions convertible into [`Value`].
///
/// ```rust
/// use gallon::{record, Value};
///
/// let r = record!["a", 1i64, true];
/// assert_eq!(r.get(1), Some(&Value::Int(1)));
/// ```
#[macro_export]
macro_rules! record {
    ($($value:expr),* $(,)?) => {
        $crate::Record::new(vec![$($crate::Value::from($value)),*])
    };
}

/// Turns one raw item from a source into a record.
pub type Decoder = Arc<dyn Fn(&[u8]) -> Result<Record> + Send + Sync>;

/// Turns one record into the raw bytes a sink persists.
pub type Encoder = Arc<dyn Fn(&Record) -> Result<Vec<u8>> + Send + Sync>;
