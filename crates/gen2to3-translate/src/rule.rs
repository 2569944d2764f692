//! Rules: a handler guarded by a predicate, plus the legacy keys it consumes.

use std::collections::BTreeSet;
use std::fmt;

use gen2to3_model::{DatasetTypeName, InstrumentName, LegacyDataId};
use serde::Serialize;

use crate::handler::KeyHandler;

/// Conditions under which a rule applies.
///
/// Every constraint that is set must hold; an empty predicate matches
/// every record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RulePredicate {
    pub instrument: Option<InstrumentName>,
    pub dataset_type: Option<DatasetTypeName>,
    pub gen2_keys: BTreeSet<String>,
}

impl RulePredicate {
    /// No instrument, dataset type or key constraint at all.
    pub fn is_wildcard(&self) -> bool {
        self.is_unscoped() && self.gen2_keys.is_empty()
    }

    /// No instrument and no dataset type constraint (keys may still be required).
    pub fn is_unscoped(&self) -> bool {
        self.instrument.is_none() && self.dataset_type.is_none()
    }

    pub fn matches(
        &self,
        instrument: &InstrumentName,
        dataset_type: &DatasetTypeName,
        data_id: &LegacyDataId,
        consumed: &BTreeSet<String>,
    ) -> bool {
        if self
            .instrument
            .as_ref()
            .is_some_and(|required| required != instrument)
        {
            return false;
        }
        if self
            .dataset_type
            .as_ref()
            .is_some_and(|required| required != dataset_type)
        {
            return false;
        }
        self.gen2_keys
            .iter()
            .all(|key| data_id.contains(key) && !consumed.contains(key))
    }
}

impl fmt::Display for RulePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(instrument) = &self.instrument {
            parts.push(format!("instrument={instrument}"));
        }
        if let Some(dataset_type) = &self.dataset_type {
            parts.push(format!("dataset_type={dataset_type}"));
        }
        if !self.gen2_keys.is_empty() {
            let keys: Vec<&str> = self.gen2_keys.iter().map(String::as_str).collect();
            parts.push(format!("keys=[{}]", keys.join(", ")));
        }
        if parts.is_empty() {
            f.write_str("*")
        } else {
            f.write_str(&parts.join(" "))
        }
    }
}

/// Which legacy keys a rule consumes once it fires.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConsumeSpec {
    /// Consume nothing; later rules may still use the same keys.
    Nothing,
    /// Consume exactly the keys the predicate requires.
    #[default]
    Gen2Keys,
    /// Consume an explicit key set.
    Keys(BTreeSet<String>),
}

impl ConsumeSpec {
    pub fn keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Keys(keys.into_iter().map(Into::into).collect())
    }

    pub(crate) fn resolve(self, gen2_keys: &BTreeSet<String>) -> BTreeSet<String> {
        match self {
            Self::Nothing => BTreeSet::new(),
            Self::Gen2Keys => gen2_keys.clone(),
            Self::Keys(keys) => keys,
        }
    }
}

/// A registered translation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub name: String,
    pub predicate: RulePredicate,
    pub handler: KeyHandler,
    pub consumes: BTreeSet<String>,
}

impl Rule {
    pub fn matches(
        &self,
        instrument: &InstrumentName,
        dataset_type: &DatasetTypeName,
        data_id: &LegacyDataId,
        consumed: &BTreeSet<String>,
    ) -> bool {
        self.predicate
            .matches(instrument, dataset_type, data_id, consumed)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.name, self.predicate, self.handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hsc() -> InstrumentName {
        InstrumentName::new("HSC").unwrap()
    }

    fn raw() -> DatasetTypeName {
        DatasetTypeName::new("raw").unwrap()
    }

    fn keys(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn empty_predicate_is_wildcard_and_matches_anything() {
        let predicate = RulePredicate::default();
        assert!(predicate.is_wildcard());
        assert!(predicate.matches(&hsc(), &raw(), &LegacyDataId::new(), &BTreeSet::new()));
    }

    #[test]
    fn instrument_match_is_case_sensitive() {
        let predicate = RulePredicate {
            instrument: Some(InstrumentName::new("hsc").unwrap()),
            ..Default::default()
        };
        assert!(!predicate.matches(&hsc(), &raw(), &LegacyDataId::new(), &BTreeSet::new()));
    }

    #[test]
    fn dataset_type_must_match_exactly() {
        let predicate = RulePredicate {
            dataset_type: Some(raw()),
            ..Default::default()
        };
        let calexp = DatasetTypeName::new("calexp").unwrap();
        assert!(predicate.matches(&hsc(), &raw(), &LegacyDataId::new(), &BTreeSet::new()));
        assert!(!predicate.matches(&hsc(), &calexp, &LegacyDataId::new(), &BTreeSet::new()));
    }

    #[test]
    fn required_keys_must_be_present_and_unconsumed() {
        let predicate = RulePredicate {
            gen2_keys: keys(&["visit"]),
            ..Default::default()
        };
        let with_visit = LegacyDataId::new().with("visit", 1);
        assert!(predicate.matches(&hsc(), &raw(), &with_visit, &BTreeSet::new()));
        assert!(!predicate.matches(&hsc(), &raw(), &LegacyDataId::new(), &BTreeSet::new()));
        assert!(!predicate.matches(&hsc(), &raw(), &with_visit, &keys(&["visit"])));
    }

    #[test]
    fn consume_spec_resolution() {
        let gen2 = keys(&["visit"]);
        assert!(ConsumeSpec::Nothing.resolve(&gen2).is_empty());
        assert_eq!(ConsumeSpec::Gen2Keys.resolve(&gen2), gen2);
        assert_eq!(
            ConsumeSpec::keys(["visit", "filter"]).resolve(&gen2),
            keys(&["filter", "visit"])
        );
    }

    #[test]
    fn predicate_display() {
        let predicate = RulePredicate {
            instrument: Some(hsc()),
            dataset_type: Some(raw()),
            gen2_keys: keys(&["visit"]),
        };
        assert_eq!(
            predicate.to_string(),
            "instrument=HSC dataset_type=raw keys=[visit]"
        );
        assert_eq!(RulePredicate::default().to_string(), "*");
    }
}
