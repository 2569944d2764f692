//! Rule set construction and translation.
//!
//! A [`RuleSetBuilder`] collects rules in registration order and is consumed
//! by [`RuleSetBuilder::build`]; the resulting [`RuleSet`] has no mutating
//! methods, so nothing can be registered once translation has started.
//!
//! # Translation
//!
//! Translation is a single forward sweep over the rules:
//!
//! 1. a rule fires when its predicate matches the record and none of its
//!    required keys has been consumed by an earlier rule;
//! 2. the emitted value is merged into the structured identifier (setting the
//!    same value twice is fine, a different value is a conflict);
//! 3. the rule's consumed keys are added to the consumed set, which later
//!    rules see immediately.
//!
//! Earlier rules are never re-evaluated.

use std::collections::{BTreeMap, BTreeSet};

use gen2to3_model::{
    DataIdValue, DatasetTypeName, InstrumentName, LegacyRecord, StructuredIdentifier,
};
use tracing::{debug, trace};

use crate::error::TranslateError;
use crate::handler::KeyHandler;
use crate::rule::{ConsumeSpec, Rule, RulePredicate};
use crate::schema::DimensionSchema;

/// Predicate fields and options for one [`RuleSetBuilder::add_rule`] call.
#[derive(Debug, Clone, Default)]
pub struct RuleSpec {
    name: Option<String>,
    instrument: Option<InstrumentName>,
    dataset_type: Option<DatasetTypeName>,
    gen2_keys: BTreeSet<String>,
    consume: ConsumeSpec,
}

impl RuleSpec {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn instrument(mut self, instrument: InstrumentName) -> Self {
        self.instrument = Some(instrument);
        self
    }

    #[must_use]
    pub fn dataset_type(mut self, dataset_type: DatasetTypeName) -> Self {
        self.dataset_type = Some(dataset_type);
        self
    }

    #[must_use]
    pub fn gen2_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.gen2_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn consume(mut self, consume: ConsumeSpec) -> Self {
        self.consume = consume;
        self
    }
}

/// Mutable registration phase of a [`RuleSet`].
#[derive(Debug, Default)]
pub struct RuleSetBuilder {
    rules: Vec<Rule>,
}

impl RuleSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule. Registration order is evaluation order.
    pub fn add_rule(&mut self, handler: KeyHandler, spec: RuleSpec) -> &mut Self {
        let RuleSpec {
            name,
            instrument,
            dataset_type,
            gen2_keys,
            consume,
        } = spec;
        let name = name.unwrap_or_else(|| generated_name(self.rules.len(), &handler));
        let consumes = consume.resolve(&gen2_keys);
        self.rules.push(Rule {
            name,
            predicate: RulePredicate {
                instrument,
                dataset_type,
                gen2_keys,
            },
            handler,
            consumes,
        });
        self
    }

    /// Append already-constructed rules, keeping their order.
    pub fn extend(&mut self, rules: impl IntoIterator<Item = Rule>) -> &mut Self {
        self.rules.extend(rules);
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn build(self) -> RuleSet {
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.predicate.is_unscoped() {
                debug!(
                    rule = %rule.name,
                    index,
                    wildcard = rule.predicate.is_wildcard(),
                    "rule has no instrument or dataset type constraint"
                );
            }
        }
        debug!(rule_count = self.rules.len(), "rule set sealed");
        RuleSet { rules: self.rules }
    }
}

fn generated_name(index: usize, handler: &KeyHandler) -> String {
    format!("#{index} {handler}")
}

/// Immutable, ordered rule set. Safe to share across threads.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

/// One rule firing during a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredRule {
    /// Position of the rule in registration order.
    pub rule_index: usize,
    pub dimension: String,
    pub value: DataIdValue,
    /// False when the dimension already held this value.
    pub newly_set: bool,
    /// Size of the consumed-key set after this rule fired.
    pub consumed_count: usize,
}

/// Result of a sweep before required dimensions are checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub data_id: StructuredIdentifier,
    pub consumed: BTreeSet<String>,
    pub fired: Vec<FiredRule>,
}

impl Translation {
    /// Missing required dimensions, in schema order.
    pub fn missing_dimensions(
        &self,
        dataset_type: &DatasetTypeName,
        schema: &impl DimensionSchema,
    ) -> Vec<String> {
        schema
            .required_dimensions(dataset_type)
            .into_iter()
            .filter(|dim| !self.data_id.contains(dim))
            .map(str::to_string)
            .collect()
    }

    /// Check required dimensions and hand over the identifier.
    pub fn resolve(
        self,
        record: &LegacyRecord,
        schema: &impl DimensionSchema,
    ) -> Result<StructuredIdentifier, TranslateError> {
        let missing = self.missing_dimensions(&record.dataset_type, schema);
        if missing.is_empty() {
            return Ok(self.data_id);
        }
        Err(TranslateError::Unresolved {
            dataset_type: record.dataset_type.clone(),
            data_id: record.data_id.clone(),
            missing,
            partial: self.data_id,
        })
    }
}

impl RuleSet {
    pub fn builder() -> RuleSetBuilder {
        RuleSetBuilder::new()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run the rule sweep for one record without checking required dimensions.
    pub fn apply(
        &self,
        instrument: &InstrumentName,
        record: &LegacyRecord,
    ) -> Result<Translation, TranslateError> {
        let mut data_id = StructuredIdentifier::new();
        let mut consumed: BTreeSet<String> = BTreeSet::new();
        let mut set_by: BTreeMap<String, usize> = BTreeMap::new();
        let mut fired = Vec::new();

        for (index, rule) in self.rules.iter().enumerate() {
            if !rule.matches(instrument, &record.dataset_type, &record.data_id, &consumed) {
                continue;
            }
            let value = rule.handler.emit(&record.data_id).map_err(|missing| {
                TranslateError::HandlerInputMissing {
                    rule: rule.name.clone(),
                    source_key: missing.0,
                    dataset_type: record.dataset_type.clone(),
                    data_id: record.data_id.clone(),
                }
            })?;
            let dimension = rule.handler.target();
            let newly_set = match data_id.try_insert(dimension, value.clone()) {
                Ok(()) => {
                    set_by.insert(dimension.to_string(), index);
                    true
                }
                Err(existing) if *existing == value => false,
                Err(existing) => {
                    let first_rule = set_by
                        .get(dimension)
                        .map(|&first| self.rules[first].name.clone())
                        .unwrap_or_default();
                    return Err(TranslateError::Conflict {
                        dataset_type: record.dataset_type.clone(),
                        data_id: record.data_id.clone(),
                        dimension: dimension.to_string(),
                        first_rule,
                        first_value: existing.clone(),
                        second_rule: rule.name.clone(),
                        second_value: value,
                    });
                }
            };
            consumed.extend(rule.consumes.iter().cloned());
            trace!(
                rule = %rule.name,
                dimension,
                value = %value,
                newly_set,
                consumed = consumed.len(),
                "rule fired"
            );
            fired.push(FiredRule {
                rule_index: index,
                dimension: dimension.to_string(),
                value,
                newly_set,
                consumed_count: consumed.len(),
            });
        }

        Ok(Translation {
            data_id,
            consumed,
            fired,
        })
    }

    /// Translate one legacy record into a complete structured identifier.
    pub fn translate(
        &self,
        instrument: &InstrumentName,
        record: &LegacyRecord,
        schema: &impl DimensionSchema,
    ) -> Result<StructuredIdentifier, TranslateError> {
        self.apply(instrument, record)?.resolve(record, schema)
    }
}
