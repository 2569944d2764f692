//! Legacy (flat) and structured data identifiers.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{DataIdValue, DatasetTypeName, ModelError};

/// Flat Gen2 data ID: legacy key to value, keys unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LegacyDataId(BTreeMap<String, DataIdValue>);

impl LegacyDataId {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `KEY=VALUE` tokens as given on a command line.
    ///
    /// Values that look like integers become [`DataIdValue::Int`]. A key given
    /// twice is an error rather than a silent overwrite.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut data_id = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let Some((key, value)) = pair.split_once('=') else {
                return Err(ModelError::MalformedPair(pair.to_string()));
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(ModelError::InvalidKey(pair.to_string()));
            }
            if data_id.contains(key) {
                return Err(ModelError::DuplicateKey(key.to_string()));
            }
            data_id.insert(key, DataIdValue::parse(value));
        }
        Ok(data_id)
    }

    /// Builder-style insert used by walkers and tests.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<DataIdValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<DataIdValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&DataIdValue> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, DataIdValue> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, DataIdValue)> for LegacyDataId {
    fn from_iter<T: IntoIterator<Item = (String, DataIdValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for LegacyDataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_mapping(f, self.0.iter())
    }
}

/// Gen3 data ID: dimension name to value.
///
/// Built incrementally by the translator; insertion never overwrites, the
/// caller decides what to do with a disagreeing value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredIdentifier(BTreeMap<String, DataIdValue>);

impl StructuredIdentifier {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, dimension: impl Into<String>, value: impl Into<DataIdValue>) -> Self {
        self.0.insert(dimension.into(), value.into());
        self
    }

    /// Insert a value for a dimension that is not yet set.
    ///
    /// Returns the existing value instead when the dimension is already set.
    pub fn try_insert(
        &mut self,
        dimension: &str,
        value: DataIdValue,
    ) -> Result<(), &DataIdValue> {
        match self.0.entry(dimension.to_string()) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
            btree_map::Entry::Occupied(slot) => Err(&*slot.into_mut()),
        }
    }

    pub fn get(&self, dimension: &str) -> Option<&DataIdValue> {
        self.0.get(dimension)
    }

    pub fn contains(&self, dimension: &str) -> bool {
        self.0.contains_key(dimension)
    }

    pub fn dimensions(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, DataIdValue> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for StructuredIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_mapping(f, self.0.iter())
    }
}

/// One legacy dataset as produced by a repository walker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyRecord {
    pub dataset_type: DatasetTypeName,
    pub data_id: LegacyDataId,
}

impl LegacyRecord {
    pub fn new(dataset_type: DatasetTypeName, data_id: LegacyDataId) -> Self {
        Self {
            dataset_type,
            data_id,
        }
    }
}

impl fmt::Display for LegacyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.dataset_type, self.data_id)
    }
}

fn write_mapping<'a>(
    f: &mut fmt::Formatter<'_>,
    entries: impl Iterator<Item = (&'a String, &'a DataIdValue)>,
) -> fmt::Result {
    f.write_str("{")?;
    for (idx, (key, value)) in entries.enumerate() {
        if idx > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{key}: {value}")?;
    }
    f.write_str("}")
}
