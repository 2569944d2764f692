//! Machine-readable output for `translate` and `rules`.

use serde_json::{Value, json};

use gen2to3_standards::RuleCatalog;

use crate::pipeline::TranslateOutcome;

pub fn translation_json(outcome: &TranslateOutcome) -> Value {
    let rules = outcome.rules.rules();
    let fired: Vec<Value> = outcome
        .trace
        .iter()
        .flat_map(|trace| trace.fired.iter())
        .map(|fired| {
            json!({
                "rule": rules[fired.rule_index].name,
                "dimension": fired.dimension,
                "value": fired.value,
                "newly_set": fired.newly_set,
                "consumed_count": fired.consumed_count,
            })
        })
        .collect();
    let consumed: Vec<&String> = outcome
        .trace
        .iter()
        .flat_map(|trace| trace.consumed.iter())
        .collect();
    let mut value = json!({
        "dataset_type": outcome.record.dataset_type,
        "gen2": outcome.record.data_id,
        "fired": fired,
        "consumed": consumed,
    });
    match &outcome.result {
        Ok(data_id) => value["data_id"] = json!(data_id),
        Err(error) => {
            value["error"] = json!({
                "kind": error.kind().as_str(),
                "message": error.to_string(),
            });
        }
    }
    value
}

pub fn catalog_json(catalog: &RuleCatalog) -> Value {
    let rules = catalog.rule_set();
    let dataset_types: Vec<Value> = catalog
        .dataset_types()
        .iter()
        .map(|def| {
            json!({
                "name": def.name,
                "template": def.template,
                "dimensions": def.dimensions,
                "run": catalog.run_for(&def.name),
                "ignored": catalog.is_ignored(&def.name),
            })
        })
        .collect();
    json!({
        "origins": catalog.origins(),
        "instrument": catalog.instrument(),
        "rules": rules.rules(),
        "dataset_types": dataset_types,
    })
}
