use std::fmt;

use gen2to3_model::{DatasetTypeName, StructuredIdentifier};
use sha2::{Digest, Sha256};

/// Deterministic dataset identifier.
///
/// The first 16 bytes of SHA-256 over run, dataset type and the canonical
/// data ID, rendered as lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DatasetId([u8; 16]);

impl DatasetId {
    pub fn compute(run: &str, dataset_type: &DatasetTypeName, data_id: &StructuredIdentifier) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(run.as_bytes());
        hasher.update([0u8]);
        hasher.update(dataset_type.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(data_id.to_string().as_bytes());
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&hasher.finalize());
        Self::from_first_16_bytes_of_sha256(digest)
    }

    pub fn from_first_16_bytes_of_sha256(digest: [u8; 32]) -> Self {
        let mut out = [0u8; 16];
        out.copy_from_slice(&digest[..16]);
        Self(out)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl serde::Serialize for DatasetId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for DatasetId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        let bytes: [u8; 16] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("dataset_id must be 16 bytes"))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
