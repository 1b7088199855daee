//! # Measurement Sets
//!
//! The output of one successfully decoded telegram: a sparse map from
//! [`CodeType`] to a numeric or text value. Quantities the meter did not send
//! are simply absent.

use crate::cosem::obis::CodeType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single decoded value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeasurementValue {
    Numeric(f64),
    Text(String),
}

impl MeasurementValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MeasurementValue::Numeric(value) => Some(*value),
            MeasurementValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MeasurementValue::Numeric(_) => None,
            MeasurementValue::Text(text) => Some(text),
        }
    }
}

impl fmt::Display for MeasurementValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasurementValue::Numeric(value) => write!(f, "{value}"),
            MeasurementValue::Text(text) => f.write_str(text),
        }
    }
}

/// All quantities decoded from one telegram, ordered by [`CodeType`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeasurementSet {
    values: BTreeMap<CodeType, MeasurementValue>,
}

impl MeasurementSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value, returning the previous one if the telegram repeated
    /// the quantity.
    pub fn insert(
        &mut self,
        code_type: CodeType,
        value: MeasurementValue,
    ) -> Option<MeasurementValue> {
        self.values.insert(code_type, value)
    }

    pub fn get(&self, code_type: CodeType) -> Option<&MeasurementValue> {
        self.values.get(&code_type)
    }

    pub fn numeric(&self, code_type: CodeType) -> Option<f64> {
        self.get(code_type).and_then(MeasurementValue::as_f64)
    }

    pub fn text(&self, code_type: CodeType) -> Option<&str> {
        self.get(code_type).and_then(MeasurementValue::as_str)
    }

    pub fn contains(&self, code_type: CodeType) -> bool {
        self.values.contains_key(&code_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CodeType, &MeasurementValue)> {
        self.values.iter().map(|(code_type, value)| (*code_type, value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The meter clock, if the telegram carried one.
    pub fn timestamp(&self) -> Option<&str> {
        self.text(CodeType::Timestamp)
    }
}

impl fmt::Display for MeasurementSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (code_type, value) in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{code_type}={value}{}", code_type.unit())?;
        }
        Ok(())
    }
}
