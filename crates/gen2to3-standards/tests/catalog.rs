//! Catalog loading, validation and the built-in HSC rules.

use std::io::Write;

use gen2to3_model::{DataIdValue, DatasetTypeName, InstrumentName, LegacyDataId, LegacyRecord};
use gen2to3_standards::{CatalogError, Placement, RuleCatalog, builtin_catalog, layer_overrides};
use gen2to3_translate::TranslateErrorKind;

const HEADER: &str = r#"
[catalog]
schema = "gen2to3.rule-catalog"
schema_version = 1
"#;

fn name(value: &str) -> DatasetTypeName {
    DatasetTypeName::new(value).unwrap()
}

fn record(dataset_type: &str, pairs: &[&str]) -> LegacyRecord {
    LegacyRecord::new(name(dataset_type), LegacyDataId::from_pairs(pairs).unwrap())
}

fn write_catalog(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn builtin_catalog_loads() {
    let catalog = builtin_catalog().unwrap();
    assert_eq!(catalog.instrument().map(InstrumentName::as_str), Some("HSC"));
    assert_eq!(catalog.origins(), &["<builtin:hsc>".to_string()]);
    assert!(catalog.rule_count() >= 8);
    assert!(catalog.dataset_type(&name("raw")).is_some());
    assert!(catalog.is_ignored(&name("processCcd_config")));
    assert_eq!(catalog.run_for(&name("jointcal_wcs")), Some("HSC/external"));
    assert_eq!(catalog.run_for(&name("raw")), None);
}

#[test]
fn builtin_translates_raw() {
    let catalog = builtin_catalog().unwrap();
    let rules = catalog.rule_set();
    let instrument = catalog.instrument().unwrap().clone();
    let id = rules
        .translate(
            &instrument,
            &record(
                "raw",
                &[
                    "field=STRIPE82L",
                    "dateObs=2013-06-17",
                    "pointing=533",
                    "filter=HSC-R",
                    "visit=903334",
                    "ccd=16",
                ],
            ),
            &catalog.schema(),
        )
        .unwrap();
    insta::assert_snapshot!(id.to_string(), @r#"{detector: 16, exposure: 903334, instrument: "HSC", physical_filter: "HSC-R"}"#);
}

#[test]
fn builtin_translates_calexp_and_calibrations() {
    let catalog = builtin_catalog().unwrap();
    let rules = catalog.rule_set();
    let instrument = catalog.instrument().unwrap().clone();
    let schema = catalog.schema();

    let calexp = rules
        .translate(
            &instrument,
            &record("calexp", &["pointing=533", "filter=HSC-R", "visit=903334", "ccd=16"]),
            &schema,
        )
        .unwrap();
    assert_eq!(calexp.get("visit"), Some(&DataIdValue::Int(903334)));
    assert!(!calexp.contains("physical_filter"));
    assert!(!calexp.contains("exposure"));

    let flat = rules
        .translate(
            &instrument,
            &record("flat", &["calibDate=2013-11-03", "filter=HSC-I", "ccd=5"]),
            &schema,
        )
        .unwrap();
    assert_eq!(flat.get("physical_filter"), Some(&DataIdValue::from("HSC-I")));
    assert_eq!(flat.get("detector"), Some(&DataIdValue::Int(5)));

    let bias = rules
        .translate(
            &instrument,
            &record("bias", &["calibDate=2013-11-03", "ccd=5"]),
            &schema,
        )
        .unwrap();
    assert_eq!(bias.len(), 2);
}

#[test]
fn builtin_flat_without_filter_is_fatal() {
    let catalog = builtin_catalog().unwrap();
    let instrument = catalog.instrument().unwrap().clone();
    let err = catalog
        .rule_set()
        .translate(
            &instrument,
            &record("flat", &["calibDate=2013-11-03", "ccd=5"]),
            &catalog.schema(),
        )
        .unwrap_err();
    assert_eq!(err.kind(), TranslateErrorKind::HandlerInputMissing);
    assert!(err.is_fatal());
}

#[test]
fn builtin_jointcal_gets_skymap() {
    let catalog = builtin_catalog().unwrap();
    let instrument = catalog.instrument().unwrap().clone();
    let id = catalog
        .rule_set()
        .translate(
            &instrument,
            &record("jointcal_wcs", &["tract=0", "visit=903334", "ccd=16"]),
            &catalog.schema(),
        )
        .unwrap();
    assert_eq!(id.get("skymap"), Some(&DataIdValue::from("discrete/ci_hsc")));
    assert_eq!(id.get("tract"), Some(&DataIdValue::Int(0)));
}

#[test]
fn unknown_handler_kind_is_a_parse_error() {
    let text = format!(
        "{HEADER}{}",
        r#"
[[rules]]
handler = { kind = "lookup", target = "instrument" }
"#
    );
    let err = RuleCatalog::parse(&text, "bad").unwrap_err();
    assert!(matches!(err, CatalogError::Toml { .. }), "{err}");
}

#[test]
fn misspelled_handler_field_is_a_parse_error() {
    for handler in [
        r#"{ kind = "copy", target = "physical_filter", sorce = "filter" }"#,
        r#"{ kind = "constant", target = "instrument", value = "HSC", valu = "x" }"#,
    ] {
        let text = format!("{HEADER}\n[[rules]]\nhandler = {handler}\n");
        let err = RuleCatalog::parse(&text, "bad").unwrap_err();
        assert!(matches!(err, CatalogError::Toml { .. }), "{handler}: {err}");
    }
}

#[test]
fn unknown_top_level_key_is_rejected() {
    let text = format!("surprise = 1\n{HEADER}");
    assert!(matches!(
        RuleCatalog::parse(&text, "bad"),
        Err(CatalogError::Toml { .. })
    ));
}

#[test]
fn wrong_schema_is_rejected() {
    let text = r#"
[catalog]
schema = "something.else"
schema_version = 1
"#;
    let err = RuleCatalog::parse(text, "bad").unwrap_err();
    assert!(err.to_string().contains("unsupported schema"), "{err}");

    let text = r#"
[catalog]
schema = "gen2to3.rule-catalog"
schema_version = 7
"#;
    let err = RuleCatalog::parse(text, "bad").unwrap_err();
    assert!(err.to_string().contains("schema_version"), "{err}");
}

#[test]
fn duplicate_dataset_type_is_rejected() {
    let text = format!(
        "{HEADER}{}",
        r#"
[[dataset_types]]
name = "raw"

[[dataset_types]]
name = "raw"
"#
    );
    let err = RuleCatalog::parse(&text, "dup").unwrap_err();
    assert!(
        matches!(err, CatalogError::DuplicateDatasetType { ref name, .. } if name == "raw"),
        "{err}"
    );
}

#[test]
fn blank_run_is_rejected() {
    let text = format!("{HEADER}\n[runs]\nraw = \"  \"\n");
    assert!(matches!(
        RuleCatalog::parse(&text, "runs"),
        Err(CatalogError::InvalidCatalog { .. })
    ));
}

#[test]
fn missing_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.toml");
    let err = RuleCatalog::load(&path).unwrap_err();
    assert!(matches!(err, CatalogError::Io { .. }));
    assert!(err.to_string().contains("missing.toml"));
}

#[test]
fn appended_override_runs_after_builtin_rules() {
    let file = write_catalog(&format!(
        "{}{}",
        HEADER.replace("schema_version = 1", "schema_version = 1\nplacement = \"append\""),
        r#"
[[rules]]
name = "late"
gen2_keys = ["pointing"]
handler = { kind = "copy", target = "pointing" }
"#
    ));
    let override_catalog = RuleCatalog::load(file.path()).unwrap();
    assert_eq!(override_catalog.rule_count(), 1);

    let base = builtin_catalog().unwrap();
    let base_count = base.rule_count();
    let merged = layer_overrides(base, &[file.path().to_path_buf()]).unwrap();
    let rules = merged.rule_set();
    assert_eq!(rules.len(), base_count + 1);
    assert_eq!(rules.rules().last().map(|r| r.name.as_str()), Some("late"));
    assert_eq!(merged.origins().len(), 2);
}

#[test]
fn prepended_override_takes_precedence() {
    let file = write_catalog(&format!(
        "{HEADER}{}",
        r#"
[[rules]]
name = "detector-override"
instrument = "HSC"
gen2_keys = ["ccd"]
consume = false
handler = { kind = "constant", target = "detector", value = 0 }
"#
    ));
    let merged = layer_overrides(builtin_catalog().unwrap(), &[file.path().to_path_buf()]).unwrap();
    assert_eq!(merged.rule_set().rules()[0].name, "detector-override");

    let instrument = merged.instrument().unwrap().clone();
    let err = merged
        .rule_set()
        .translate(
            &instrument,
            &record("bias", &["calibDate=2013-11-03", "ccd=5"]),
            &merged.schema(),
        )
        .unwrap_err();
    assert_eq!(err.kind(), TranslateErrorKind::Conflict);
    let message = err.to_string();
    assert!(message.contains("rule 'detector-override' set 0"), "{message}");
    assert!(message.contains("rule 'detector' produced 5"), "{message}");
    assert_eq!(Placement::default(), Placement::Prepend);
}
