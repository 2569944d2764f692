use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WriteError};

/// How payload files reach the destination repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    /// Leave the file in place and record its absolute path.
    #[default]
    None,
    Copy,
    Hardlink,
}

impl TransferMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Copy => "copy",
            Self::Hardlink => "hardlink",
        }
    }

    /// Whether payloads are placed under the destination root.
    pub fn places_files(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Place `source` at `target`. `target`'s parent directory must exist.
    pub(crate) fn transfer(self, source: &Path, target: &Path) -> Result<()> {
        if self.places_files() && target.exists() {
            return Err(WriteError::TargetExists {
                path: target.to_path_buf(),
            });
        }
        match self {
            Self::None => Ok(()),
            Self::Copy => std::fs::copy(source, target)
                .map(|_| ())
                .map_err(|e| WriteError::io(source, e)),
            Self::Hardlink => {
                std::fs::hard_link(source, target).map_err(|e| WriteError::io(source, e))
            }
        }
    }
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransferMode {
    type Err = WriteError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "copy" => Ok(Self::Copy),
            "hardlink" | "link" => Ok(Self::Hardlink),
            _ => Err(WriteError::UnknownTransferMode(value.to_string())),
        }
    }
}
