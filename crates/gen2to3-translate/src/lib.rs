#![deny(unsafe_code)]
//! Gen2 to Gen3 data ID translation engine.
//!
//! Rules are registered once through a [`RuleSetBuilder`] and evaluated in
//! registration order against each legacy record. See [`ruleset`] for the
//! sweep semantics.

pub mod error;
pub mod handler;
pub mod rule;
pub mod ruleset;
pub mod schema;

pub use error::{TranslateError, TranslateErrorKind};
pub use handler::{KeyHandler, MissingSourceKey};
pub use rule::{ConsumeSpec, Rule, RulePredicate};
pub use ruleset::{FiredRule, RuleSet, RuleSetBuilder, RuleSpec, Translation};
pub use schema::{DimensionSchema, NoRequirements};
