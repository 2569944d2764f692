//! Walking a small on-disk Gen2 layout.

use std::fs;
use std::path::Path;

use gen2to3_ingest::{PathTemplate, RepoWalker, WalkError, compile_templates};
use gen2to3_model::{DataIdValue, DatasetTypeName};

fn name(value: &str) -> DatasetTypeName {
    DatasetTypeName::new(value).unwrap()
}

fn touch(root: &Path, relative: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"payload").unwrap();
}

fn templates() -> Vec<PathTemplate> {
    let raw = name("raw");
    let calexp = name("calexp");
    let config = name("processCcd_config");
    compile_templates([
        (&raw, "%(field)s/%(dateObs)s/%(pointing)05d/%(filter)s/HSC-%(visit)07d-%(ccd)03d.fits"),
        (
            &calexp,
            "rerun/ci/%(pointing)05d/%(filter)s/corr/CORR-%(visit)07d-%(ccd)03d.fits",
        ),
        (&config, "rerun/ci/config/processCcd.py"),
    ])
    .unwrap()
}

#[test]
fn walks_in_sorted_order_and_skips_unknown_files() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    touch(root, "STRIPE82L/2013-06-17/00533/HSC-R/HSC-0903334-100.fits");
    touch(root, "STRIPE82L/2013-06-17/00533/HSC-R/HSC-0903334-016.fits");
    touch(root, "STRIPE82L/2013-06-17/00533/HSC-R/notes.txt");
    touch(root, "rerun/ci/00533/HSC-R/corr/CORR-0903334-016.fits");
    touch(root, "rerun/ci/config/processCcd.py");
    touch(root, "_mapper");

    let mut walker = RepoWalker::new(root, templates()).unwrap();
    let found: Vec<_> = walker.by_ref().map(Result::unwrap).collect();
    let relative: Vec<&str> = found.iter().map(|r| r.relative.as_str()).collect();
    assert_eq!(
        relative,
        vec![
            "STRIPE82L/2013-06-17/00533/HSC-R/HSC-0903334-016.fits",
            "STRIPE82L/2013-06-17/00533/HSC-R/HSC-0903334-100.fits",
            "rerun/ci/00533/HSC-R/corr/CORR-0903334-016.fits",
            "rerun/ci/config/processCcd.py",
        ]
    );
    assert_eq!(found[0].record.dataset_type, name("raw"));
    assert_eq!(
        found[0].record.data_id.get("visit"),
        Some(&DataIdValue::Int(903334))
    );
    assert_eq!(found[2].record.dataset_type, name("calexp"));
    assert!(found[3].record.data_id.is_empty());
    assert!(found[0].path.ends_with("HSC-0903334-016.fits"));

    let stats = walker.stats();
    assert_eq!(stats.files, 6);
    assert_eq!(stats.matched, 4);
    assert_eq!(stats.unmatched, 2);
}

#[test]
fn inconsistent_path_is_reported_and_walk_continues() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let flat = name("flat");
    let templates = compile_templates([(
        &flat,
        "FLAT/%(calibDate)s/FLAT-%(calibDate)s-%(ccd)03d.fits",
    )])
    .unwrap();
    touch(root, "FLAT/2013-11-03/FLAT-2013-11-03-005.fits");
    touch(root, "FLAT/2013-11-03/FLAT-2014-01-01-006.fits");

    let results: Vec<_> = RepoWalker::new(root, templates).unwrap().collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(
        results[1],
        Err(WalkError::InconsistentKey { ref key, .. }) if key == "calibDate"
    ));
}

#[test]
fn missing_root_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = RepoWalker::new(dir.path().join("absent"), templates()).unwrap_err();
    assert!(matches!(err, WalkError::RootNotFound { .. }));
}

#[test]
fn first_matching_template_wins() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let specific = name("specific");
    let generic = name("generic");
    let templates = compile_templates([
        (&specific, "data/%(visit)07d.fits"),
        (&generic, "data/%(name)s.fits"),
    ])
    .unwrap();
    touch(root, "data/0000042.fits");
    touch(root, "data/other.fits");

    let types: Vec<String> = RepoWalker::new(root, templates)
        .unwrap()
        .map(|r| r.unwrap().record.dataset_type.to_string())
        .collect();
    assert_eq!(types, vec!["specific", "generic"]);
}

#[cfg(unix)]
#[test]
fn rerun_parent_link_is_not_followed() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    touch(root, "rerun/ci/00533/HSC-R/corr/CORR-0903334-016.fits");
    std::os::unix::fs::symlink("../..", root.join("rerun/ci/_parent")).unwrap();
    touch(root, "STRIPE82L/2013-06-17/00533/HSC-R/HSC-0903334-016.fits");
    std::os::unix::fs::symlink(
        root.join("STRIPE82L/2013-06-17/00533/HSC-R/HSC-0903334-016.fits"),
        root.join("STRIPE82L/2013-06-17/00533/HSC-R/HSC-0903334-022.fits"),
    )
    .unwrap();

    let mut walker = RepoWalker::new(root, templates()).unwrap();
    let relative: Vec<String> = walker
        .by_ref()
        .map(|record| record.unwrap().relative)
        .collect();
    assert_eq!(
        relative,
        vec![
            "STRIPE82L/2013-06-17/00533/HSC-R/HSC-0903334-016.fits",
            "STRIPE82L/2013-06-17/00533/HSC-R/HSC-0903334-022.fits",
            "rerun/ci/00533/HSC-R/corr/CORR-0903334-016.fits",
        ]
    );
    let stats = walker.stats();
    assert_eq!(stats.files, 3);
    assert_eq!(stats.skipped_links, 1);
}
