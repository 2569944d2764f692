#![deny(unsafe_code)]

//! On-disk TOML layout of a rule catalog.

use std::collections::BTreeMap;

use gen2to3_model::DataIdValue;
use serde::{Deserialize, Serialize};

pub const CATALOG_SCHEMA: &str = "gen2to3.rule-catalog";
pub const CATALOG_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogFile {
    pub catalog: CatalogHeader,
    #[serde(default)]
    pub rules: Vec<RuleEntry>,
    #[serde(default)]
    pub dataset_types: Vec<DatasetTypeEntry>,
    #[serde(default)]
    pub runs: BTreeMap<String, String>,
    #[serde(default)]
    pub ignore: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogHeader {
    pub schema: String,
    pub schema_version: u32,
    #[serde(default)]
    pub instrument: Option<String>,
    #[serde(default)]
    pub placement: Placement,
    #[serde(default)]
    pub description: Option<String>,
}

/// Where override rules go relative to the rules already loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    #[default]
    Prepend,
    Append,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub instrument: Option<String>,
    #[serde(default)]
    pub dataset_type: Option<String>,
    #[serde(default)]
    pub gen2_keys: Vec<String>,
    #[serde(default)]
    pub consume: ConsumeEntry,
    pub handler: HandlerEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConsumeEntry {
    Flag(bool),
    Keys(Vec<String>),
}

impl Default for ConsumeEntry {
    fn default() -> Self {
        Self::Flag(true)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum HandlerEntry {
    Constant {
        target: String,
        value: DataIdValue,
    },
    Copy {
        target: String,
        #[serde(default)]
        source: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetTypeEntry {
    pub name: String,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub dimensions: Vec<String>,
}
