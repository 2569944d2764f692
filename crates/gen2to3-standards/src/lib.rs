#![deny(unsafe_code)]

//! Rule catalogs: the TOML files that describe translation rules, dataset
//! types, run routing and ignored dataset types for one instrument.

pub mod error;
pub mod file;
pub mod paths;
pub mod registry;

pub use crate::error::CatalogError;
pub use crate::file::{CATALOG_SCHEMA, CATALOG_SCHEMA_VERSION, Placement};
pub use crate::paths::{
    CATALOG_ENV_VAR, builtin_catalog, catalog_override_path, layer_overrides,
    load_effective_catalog,
};
pub use crate::registry::{DatasetTypeDef, RuleCatalog};
