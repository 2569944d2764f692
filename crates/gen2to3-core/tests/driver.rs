//! Driver behaviour over in-memory records.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use gen2to3_core::{
    CancelFlag, ConversionDriver, ConvertError, ConvertOptions, DatasetRef, DatasetWriter,
    FailureStage,
};
use gen2to3_ingest::{WalkError, WalkedRecord};
use gen2to3_model::{DatasetTypeName, InstrumentName, LegacyDataId, LegacyRecord};
use gen2to3_standards::builtin_catalog;
use gen2to3_translate::{KeyHandler, RuleSet, RuleSpec, TranslateErrorKind};

#[derive(Debug, thiserror::Error)]
#[error("duplicate dataset {0}")]
struct DuplicateError(String);

#[derive(Debug, Default)]
struct MemoryWriter {
    written: Vec<String>,
    reserved: Vec<String>,
    keys: BTreeSet<String>,
    flushed: bool,
}

impl MemoryWriter {
    fn key(dataset: &DatasetRef<'_>) -> String {
        format!("{} {} {}", dataset.run, dataset.dataset_type, dataset.data_id)
    }
}

impl DatasetWriter for MemoryWriter {
    type Error = DuplicateError;

    fn write(&mut self, dataset: &DatasetRef<'_>) -> Result<(), Self::Error> {
        let key = Self::key(dataset);
        if !self.keys.insert(key.clone()) {
            return Err(DuplicateError(key));
        }
        self.written.push(key);
        Ok(())
    }

    fn reserve(&mut self, dataset: &DatasetRef<'_>) -> Result<(), Self::Error> {
        let key = Self::key(dataset);
        if !self.keys.insert(key.clone()) {
            return Err(DuplicateError(key));
        }
        self.reserved.push(key);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.flushed = true;
        Ok(())
    }
}

fn walked(dataset_type: &str, pairs: &[&str]) -> Result<WalkedRecord, WalkError> {
    let record = LegacyRecord::new(
        DatasetTypeName::new(dataset_type).unwrap(),
        LegacyDataId::from_pairs(pairs).unwrap(),
    );
    let relative = format!("{dataset_type}/{}", pairs.join("-"));
    Ok(WalkedRecord {
        record,
        path: PathBuf::from("/repo").join(&relative),
        relative,
    })
}

fn raw(visit: i64, ccd: i64) -> Result<WalkedRecord, WalkError> {
    walked(
        "raw",
        &[
            "filter=HSC-R",
            &format!("visit={visit}"),
            &format!("ccd={ccd}"),
        ],
    )
}

fn driver(options: impl FnOnce(&mut ConvertOptions)) -> ConversionDriver {
    let catalog = builtin_catalog().unwrap();
    let mut opts = ConvertOptions::new(InstrumentName::new("HSC").unwrap(), "HSC/raw/all");
    options(&mut opts);
    ConversionDriver::from_catalog(&catalog, opts)
}

fn mixed_records() -> Vec<Result<WalkedRecord, WalkError>> {
    vec![
        raw(903334, 16),
        // No ccd: detector can never be resolved.
        walked("raw", &["filter=HSC-R", "visit=903334"]),
        raw(903334, 17),
        walked("processCcd_config", &[]),
        Err(WalkError::NonUtf8Path {
            path: PathBuf::from("/repo/bad"),
        }),
        walked("jointcal_wcs", &["tract=0", "visit=903334", "ccd=16"]),
        walked("bias", &["calibDate=2013-11-03", "ccd=5"]),
        raw(903334, 16),
    ]
}

#[test]
fn bad_records_are_reported_and_scan_continues() {
    let driver = driver(|_| {});
    let mut writer = MemoryWriter::default();
    let report = driver.run(mixed_records(), &mut writer).unwrap();

    assert_eq!(report.seen, 8);
    assert_eq!(report.translated, 5);
    assert_eq!(report.written, 4);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed(), 3);
    assert!(!report.cancelled);
    assert!(writer.flushed);

    let stages: Vec<FailureStage> = report.failures.iter().map(|f| f.stage).collect();
    assert_eq!(
        stages,
        vec![FailureStage::Unresolved, FailureStage::Walk, FailureStage::Write]
    );
    assert!(report.failures[0].message.contains("detector"));
    assert!(report.failures[2].message.contains("duplicate dataset"));

    let raw = DatasetTypeName::new("raw").unwrap();
    let counts = report.by_dataset_type[&raw];
    assert_eq!(counts.translated, 3);
    assert_eq!(counts.written, 2);
    assert_eq!(counts.failed, 2);
}

#[test]
fn runs_are_routed_by_dataset_type() {
    let driver = driver(|_| {});
    let mut writer = MemoryWriter::default();
    let report = driver.run(mixed_records(), &mut writer).unwrap();

    assert_eq!(report.by_run.get("HSC/raw/all"), Some(&3));
    assert_eq!(report.by_run.get("HSC/external"), Some(&1));
    assert!(writer.written.iter().any(|key| key.starts_with("HSC/external jointcal_wcs")));
}

#[test]
fn conflicts_are_record_level() {
    let mut catalog = builtin_catalog().unwrap();
    catalog.merge(
        gen2to3_standards::RuleCatalog::parse(
            r#"
[catalog]
schema = "gen2to3.rule-catalog"
schema_version = 1

[[rules]]
name = "pinned-detector"
gen2_keys = ["ccd"]
consume = false
handler = { kind = "constant", target = "detector", value = 16 }
"#,
            "pin",
        )
        .unwrap(),
    );
    let options = ConvertOptions::new(InstrumentName::new("HSC").unwrap(), "run");
    let driver = ConversionDriver::from_catalog(&catalog, options);
    let report = driver
        .run(vec![raw(1, 16), raw(1, 17), raw(2, 16)], MemoryWriter::default())
        .unwrap();
    assert_eq!(report.written, 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.failures[0].stage, FailureStage::Conflict);
    assert!(report.failures[0].message.contains("pinned-detector"));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["failures"][0]["stage"], "conflict");
    assert_eq!(json["failures"][0]["data_id"]["ccd"], 17);
}

#[test]
fn missing_handler_input_aborts() {
    let driver = driver(|_| {});
    let mut writer = MemoryWriter::default();
    let records = vec![
        raw(903334, 16),
        walked("flat", &["calibDate=2013-11-03", "ccd=5"]),
        raw(903334, 17),
    ];
    let err = driver.run(records, &mut writer).unwrap_err();
    match err {
        ConvertError::Fatal { source } => {
            assert_eq!(source.kind(), TranslateErrorKind::HandlerInputMissing);
        }
        other => panic!("unexpected error: {other}"),
    }
    // Records before the fatal one were stored; nothing after it was.
    assert_eq!(writer.written.len(), 1);
}

#[test]
fn cancelled_before_start_pulls_nothing() {
    let cancel = CancelFlag::new();
    cancel.cancel();
    let driver = driver(|_| {}).with_cancel_flag(cancel);
    let report = driver.run(mixed_records(), MemoryWriter::default()).unwrap();
    assert!(report.cancelled);
    assert_eq!(report.seen, 0);
}

#[test]
fn cancel_stops_between_batches() {
    let driver = driver(|opts| opts.batch_size = 2);
    let cancel = driver.cancel_flag();
    let mut pulled = 0;
    let records = (0..10).map(move |ccd| {
        pulled += 1;
        if pulled == 3 {
            cancel.cancel();
        }
        raw(903334, ccd)
    });
    let report = driver.run(records, MemoryWriter::default()).unwrap();
    assert!(report.cancelled);
    // The batch in flight when the flag was raised still completes.
    assert_eq!(report.seen, 4);
    assert_eq!(report.written, 4);
}

#[test]
fn parallel_and_sequential_reports_match() {
    let records = || {
        let mut records = mixed_records();
        records.extend((0..40).map(|ccd| raw(903336, ccd)));
        records.push(walked("raw", &["filter=HSC-I", "visit=903336"]));
        records
    };

    let sequential = driver(|opts| opts.batch_size = 3);
    let mut seq_writer = MemoryWriter::default();
    let seq_report = sequential.run(records(), &mut seq_writer).unwrap();

    let parallel = driver(|opts| {
        opts.batch_size = 3;
        opts.jobs = 4;
    });
    let mut par_writer = MemoryWriter::default();
    let par_report = parallel.run(records(), &mut par_writer).unwrap();

    assert_eq!(seq_report, par_report);
    assert_eq!(seq_writer.written, par_writer.written);
}

#[test]
fn dry_run_reserves_instead_of_writing() {
    let driver = driver(|opts| opts.dry_run = true);
    let mut writer = MemoryWriter::default();
    let report = driver.run(mixed_records(), &mut writer).unwrap();
    assert!(report.dry_run);
    assert!(writer.written.is_empty());
    assert_eq!(writer.reserved.len(), 4);
    assert_eq!(report.written, 4);
    // Duplicates inside a dry run are still caught.
    assert_eq!(report.failed(), 3);
}

#[test]
fn hand_built_driver_applies_schema_routing_and_ignore_list() {
    let name = |value: &str| DatasetTypeName::new(value).unwrap();
    let mut builder = RuleSet::builder();
    builder
        .add_rule(
            KeyHandler::constant("instrument", "HSC"),
            RuleSpec::new().named("instrument"),
        )
        .add_rule(
            KeyHandler::copy_from("detector", "ccd"),
            RuleSpec::new().named("detector").gen2_keys(["ccd"]),
        );
    let detector_only = vec!["instrument".to_string(), "detector".to_string()];
    let options = ConvertOptions::new(InstrumentName::new("HSC").unwrap(), "HSC/calib");
    let driver = ConversionDriver::new(builder.build(), options)
        .with_schema(BTreeMap::from([
            (name("bias"), detector_only.clone()),
            (name("dark"), detector_only),
            (
                name("flat"),
                vec![
                    "instrument".to_string(),
                    "detector".to_string(),
                    "physical_filter".to_string(),
                ],
            ),
        ]))
        .with_runs(BTreeMap::from([(name("dark"), "HSC/calib/dark".to_string())]))
        .with_ignored(BTreeSet::from([name("processCcd_config")]));
    assert_eq!(driver.run_for(&name("bias")), "HSC/calib");
    assert_eq!(driver.run_for(&name("dark")), "HSC/calib/dark");

    let records = vec![
        walked("bias", &["calibDate=2013-11-03", "ccd=5"]),
        walked("dark", &["calibDate=2013-11-03", "ccd=5"]),
        walked("flat", &["calibDate=2013-11-03", "ccd=5"]),
        walked("processCcd_config", &[]),
        // No schema entry: nothing is required.
        walked("notes", &["page=1"]),
    ];
    let mut writer = MemoryWriter::default();
    let report = driver.run(records, &mut writer).unwrap();

    assert_eq!(report.seen, 5);
    assert_eq!(report.written, 3);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.failures[0].stage, FailureStage::Unresolved);
    assert!(report.failures[0].message.contains("physical_filter"));
    assert_eq!(
        writer.written,
        vec![
            r#"HSC/calib bias {detector: 5, instrument: "HSC"}"#,
            r#"HSC/calib/dark dark {detector: 5, instrument: "HSC"}"#,
            r#"HSC/calib notes {instrument: "HSC"}"#,
        ]
    );
}
