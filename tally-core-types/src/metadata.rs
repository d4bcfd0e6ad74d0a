use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

pub const MAX_METADATA_ENTRIES: usize = 100;
pub const MAX_METADATA_KEY_LEN: usize = 100;
pub const MAX_METADATA_VALUE_LEN: usize = 2000;

/// A flat metadata value. Nested objects and arrays are not representable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Integer(i64),
    Text(String),
    Decimal(Decimal),
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<Decimal> for Scalar {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("MetadataError - TooManyEntries: at most {MAX_METADATA_ENTRIES} entries are allowed, got {0}")]
    TooManyEntries(usize),
    #[error("MetadataError - InvalidKey: key '{0}' must be 1-{MAX_METADATA_KEY_LEN} characters")]
    InvalidKey(String),
    #[error("MetadataError - ValueTooLong: value of '{0}' exceeds {MAX_METADATA_VALUE_LEN} characters")]
    ValueTooLong(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, Scalar>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Option<Scalar> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Scalar)> {
        self.0.iter()
    }

    pub fn validate(&self) -> Result<(), MetadataError> {
        if self.0.len() > MAX_METADATA_ENTRIES {
            return Err(MetadataError::TooManyEntries(self.0.len()));
        }
        for (key, value) in self.0.iter() {
            if key.is_empty() || key.chars().count() > MAX_METADATA_KEY_LEN {
                return Err(MetadataError::InvalidKey(key.clone()));
            }
            if let Scalar::Text(text) = value {
                if text.chars().count() > MAX_METADATA_VALUE_LEN {
                    return Err(MetadataError::ValueTooLong(key.clone()));
                }
            }
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<Scalar>> FromIterator<(K, V)> for Metadata {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
