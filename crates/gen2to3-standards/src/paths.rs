//! Catalog resolution.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::CatalogError;
use crate::registry::RuleCatalog;

/// Environment variable naming a catalog file that replaces the built-in one.
pub const CATALOG_ENV_VAR: &str = "GEN2TO3_CATALOG";

const BUILTIN_ORIGIN: &str = "<builtin:hsc>";
const BUILTIN_HSC: &str = include_str!("../catalogs/hsc.toml");

/// The HSC catalog compiled into the binary.
pub fn builtin_catalog() -> Result<RuleCatalog, CatalogError> {
    RuleCatalog::parse(BUILTIN_HSC, BUILTIN_ORIGIN)
}

/// Path of the base catalog selected through [`CATALOG_ENV_VAR`], if any.
pub fn catalog_override_path() -> Option<PathBuf> {
    std::env::var_os(CATALOG_ENV_VAR)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Resolve the base catalog and layer `overrides` on top, in order.
///
/// Resolution order for the base:
/// 1. `GEN2TO3_CATALOG` environment variable
/// 2. the built-in HSC catalog
pub fn load_effective_catalog(overrides: &[PathBuf]) -> Result<RuleCatalog, CatalogError> {
    let base = match catalog_override_path() {
        Some(path) => {
            info!(path = %path.display(), "using catalog from {CATALOG_ENV_VAR}");
            RuleCatalog::load(&path)?
        }
        None => builtin_catalog()?,
    };
    layer_overrides(base, overrides)
}

/// Merge each override file into `base`, first to last.
pub fn layer_overrides(
    mut base: RuleCatalog,
    overrides: &[PathBuf],
) -> Result<RuleCatalog, CatalogError> {
    for path in overrides {
        base.merge(load_override(path)?);
    }
    Ok(base)
}

fn load_override(path: &Path) -> Result<RuleCatalog, CatalogError> {
    info!(path = %path.display(), "applying catalog override");
    RuleCatalog::load(path)
}
