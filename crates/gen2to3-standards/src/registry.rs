#![deny(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use gen2to3_model::{DatasetTypeName, InstrumentName};
use gen2to3_translate::{ConsumeSpec, KeyHandler, RuleSet, RuleSpec};
use tracing::debug;

use crate::error::CatalogError;
use crate::file::{
    CATALOG_SCHEMA, CATALOG_SCHEMA_VERSION, CatalogFile, ConsumeEntry, DatasetTypeEntry,
    HandlerEntry, Placement, RuleEntry,
};

/// A dataset type the walker can discover and the translator must resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetTypeDef {
    pub name: DatasetTypeName,
    /// Gen2 path template relative to the repository root.
    pub template: Option<String>,
    /// Gen3 dimensions every translated data ID must carry.
    pub dimensions: Vec<String>,
}

/// A validated rule catalog, possibly merged from several files.
#[derive(Debug, Clone, Default)]
pub struct RuleCatalog {
    instrument: Option<InstrumentName>,
    placement: Placement,
    origins: Vec<String>,
    rules: Vec<(KeyHandler, RuleSpec)>,
    dataset_types: Vec<DatasetTypeDef>,
    runs: BTreeMap<DatasetTypeName, String>,
    ignore: BTreeSet<DatasetTypeName>,
}

impl RuleCatalog {
    /// Parse and validate catalog TOML. `origin` names the source in errors.
    pub fn parse(contents: &str, origin: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(contents).map_err(|e| CatalogError::Toml {
            origin: origin.to_string(),
            source: e,
        })?;
        Self::from_file(file, origin)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path).map_err(|e| CatalogError::io(path, e))?;
        Self::parse(&contents, &path.display().to_string())
    }

    fn from_file(file: CatalogFile, origin: &str) -> Result<Self, CatalogError> {
        if file.catalog.schema != CATALOG_SCHEMA {
            return Err(CatalogError::InvalidCatalog {
                origin: origin.to_string(),
                message: format!("unsupported schema: {}", file.catalog.schema),
            });
        }
        if file.catalog.schema_version != CATALOG_SCHEMA_VERSION {
            return Err(CatalogError::InvalidCatalog {
                origin: origin.to_string(),
                message: format!(
                    "unsupported schema_version: {}",
                    file.catalog.schema_version
                ),
            });
        }

        let instrument = file
            .catalog
            .instrument
            .map(InstrumentName::new)
            .transpose()
            .map_err(|e| CatalogError::model(origin, e))?;

        let rules = file
            .rules
            .into_iter()
            .enumerate()
            .map(|(index, entry)| convert_rule(entry, index, origin))
            .collect::<Result<Vec<_>, _>>()?;

        let mut dataset_types: Vec<DatasetTypeDef> = Vec::new();
        for entry in file.dataset_types {
            let def = convert_dataset_type(entry, origin)?;
            if dataset_types.iter().any(|d| d.name == def.name) {
                return Err(CatalogError::DuplicateDatasetType {
                    origin: origin.to_string(),
                    name: def.name.to_string(),
                });
            }
            dataset_types.push(def);
        }

        let mut runs = BTreeMap::new();
        for (dataset_type, run) in file.runs {
            let dataset_type =
                DatasetTypeName::new(dataset_type).map_err(|e| CatalogError::model(origin, e))?;
            let run = run.trim();
            if run.is_empty() {
                return Err(CatalogError::InvalidCatalog {
                    origin: origin.to_string(),
                    message: format!("blank run for dataset type {dataset_type}"),
                });
            }
            runs.insert(dataset_type, run.to_string());
        }

        let ignore = file
            .ignore
            .into_iter()
            .map(DatasetTypeName::new)
            .collect::<Result<BTreeSet<_>, _>>()
            .map_err(|e| CatalogError::model(origin, e))?;

        debug!(
            origin,
            rules = rules.len(),
            dataset_types = dataset_types.len(),
            "catalog loaded"
        );

        Ok(Self {
            instrument,
            placement: file.catalog.placement,
            origins: vec![origin.to_string()],
            rules,
            dataset_types,
            runs,
            ignore,
        })
    }

    /// Layer an override catalog on top of this one.
    ///
    /// Override rules are prepended or appended according to the override's
    /// placement; dataset types replace same-named entries; runs, ignore
    /// lists and the instrument are overridden key by key.
    pub fn merge(&mut self, other: RuleCatalog) {
        let RuleCatalog {
            instrument,
            placement,
            origins,
            rules,
            dataset_types,
            runs,
            ignore,
        } = other;

        match placement {
            Placement::Prepend => {
                let existing = std::mem::replace(&mut self.rules, rules);
                self.rules.extend(existing);
            }
            Placement::Append => self.rules.extend(rules),
        }
        for def in dataset_types {
            match self.dataset_types.iter_mut().find(|d| d.name == def.name) {
                Some(slot) => *slot = def,
                None => self.dataset_types.push(def),
            }
        }
        self.runs.extend(runs);
        self.ignore.extend(ignore);
        if instrument.is_some() {
            self.instrument = instrument;
        }
        self.origins.extend(origins);
    }

    /// Register every rule, in catalog order, into a sealed rule set.
    pub fn rule_set(&self) -> RuleSet {
        let mut builder = RuleSet::builder();
        for (handler, spec) in &self.rules {
            builder.add_rule(handler.clone(), spec.clone());
        }
        builder.build()
    }

    /// Required dimensions per dataset type.
    pub fn schema(&self) -> BTreeMap<DatasetTypeName, Vec<String>> {
        self.dataset_types
            .iter()
            .map(|def| (def.name.clone(), def.dimensions.clone()))
            .collect()
    }

    pub fn instrument(&self) -> Option<&InstrumentName> {
        self.instrument.as_ref()
    }

    pub fn origins(&self) -> &[String] {
        &self.origins
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn dataset_types(&self) -> &[DatasetTypeDef] {
        &self.dataset_types
    }

    pub fn dataset_type(&self, name: &DatasetTypeName) -> Option<&DatasetTypeDef> {
        self.dataset_types.iter().find(|def| &def.name == name)
    }

    /// Dedicated output run for a dataset type, if the catalog routes it.
    pub fn run_for(&self, dataset_type: &DatasetTypeName) -> Option<&str> {
        self.runs.get(dataset_type).map(String::as_str)
    }

    pub fn runs(&self) -> &BTreeMap<DatasetTypeName, String> {
        &self.runs
    }

    pub fn is_ignored(&self, dataset_type: &DatasetTypeName) -> bool {
        self.ignore.contains(dataset_type)
    }

    pub fn ignored(&self) -> &BTreeSet<DatasetTypeName> {
        &self.ignore
    }
}

fn convert_rule(
    entry: RuleEntry,
    index: usize,
    origin: &str,
) -> Result<(KeyHandler, RuleSpec), CatalogError> {
    let invalid = |message: String| CatalogError::InvalidRule {
        origin: origin.to_string(),
        index,
        message,
    };

    let handler = match entry.handler {
        HandlerEntry::Constant { target, value } => {
            KeyHandler::constant(non_blank(target, "handler target").map_err(invalid)?, value)
        }
        HandlerEntry::Copy { target, source } => {
            let target = non_blank(target, "handler target").map_err(invalid)?;
            match source {
                Some(source) => KeyHandler::copy_from(
                    target,
                    non_blank(source, "handler source").map_err(invalid)?,
                ),
                None => KeyHandler::copy(target),
            }
        }
    };

    let mut spec = RuleSpec::new();
    if let Some(name) = entry.name {
        spec = spec.named(non_blank(name, "rule name").map_err(invalid)?);
    }
    if let Some(instrument) = entry.instrument {
        spec = spec.instrument(
            InstrumentName::new(instrument).map_err(|e| CatalogError::model(origin, e))?,
        );
    }
    if let Some(dataset_type) = entry.dataset_type {
        spec = spec.dataset_type(
            DatasetTypeName::new(dataset_type).map_err(|e| CatalogError::model(origin, e))?,
        );
    }
    let gen2_keys = entry
        .gen2_keys
        .into_iter()
        .map(|key| non_blank(key, "gen2 key"))
        .collect::<Result<Vec<_>, _>>()
        .map_err(invalid)?;
    let consume = match entry.consume {
        ConsumeEntry::Flag(true) => ConsumeSpec::Gen2Keys,
        ConsumeEntry::Flag(false) => ConsumeSpec::Nothing,
        ConsumeEntry::Keys(keys) => ConsumeSpec::keys(
            keys.into_iter()
                .map(|key| non_blank(key, "consumed key"))
                .collect::<Result<Vec<_>, _>>()
                .map_err(invalid)?,
        ),
    };
    Ok((handler, spec.gen2_keys(gen2_keys).consume(consume)))
}

fn convert_dataset_type(
    entry: DatasetTypeEntry,
    origin: &str,
) -> Result<DatasetTypeDef, CatalogError> {
    let name = DatasetTypeName::new(entry.name).map_err(|e| CatalogError::model(origin, e))?;
    let invalid = |message: String| CatalogError::InvalidCatalog {
        origin: origin.to_string(),
        message: format!("dataset type {name}: {message}"),
    };
    let template = entry
        .template
        .map(|template| non_blank(template, "template"))
        .transpose()
        .map_err(invalid)?;
    let dimensions = entry
        .dimensions
        .into_iter()
        .map(|dim| non_blank(dim, "dimension"))
        .collect::<Result<Vec<_>, _>>()
        .map_err(invalid)?;
    Ok(DatasetTypeDef {
        name,
        template,
        dimensions,
    })
}

fn non_blank(value: String, what: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("blank {what}"));
    }
    Ok(trimmed.to_string())
}
