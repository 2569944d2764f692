//! Command implementations shared by the binary and its tests.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, anyhow, bail};
use gen2to3_core::{ConversionDriver, ConversionReport, ConvertOptions};
use gen2to3_ingest::{RepoWalker, WalkStats, compile_templates};
use gen2to3_model::{
    DatasetTypeName, InstrumentName, LegacyDataId, LegacyRecord, StructuredIdentifier,
};
use gen2to3_output::{RegistryWriter, TransferMode};
use gen2to3_standards::{RuleCatalog, load_effective_catalog};
use gen2to3_translate::{RuleSet, TranslateError, Translation};
use tracing::{info, info_span};

/// Inputs of one `convert` run.
#[derive(Debug, Clone)]
pub struct ConvertRequest {
    pub source: PathBuf,
    pub dest: PathBuf,
    /// Default output run; derived from the instrument when absent.
    pub collection: Option<String>,
    pub config: Vec<PathBuf>,
    pub instrument: Option<String>,
    pub transfer: TransferMode,
    pub jobs: usize,
    pub dry_run: bool,
}

#[derive(Debug)]
pub struct ConvertResult {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub registry: PathBuf,
    pub instrument: InstrumentName,
    pub default_run: String,
    pub report: ConversionReport,
    pub walk: WalkStats,
}

/// Load the built-in (or `GEN2TO3_CATALOG`) catalog plus overrides.
pub fn load_catalog(overrides: &[PathBuf]) -> Result<RuleCatalog> {
    let catalog = load_effective_catalog(overrides).context("load rule catalog")?;
    info!(
        origins = %catalog.origins().join(", "),
        rules = catalog.rule_count(),
        dataset_types = catalog.dataset_types().len(),
        "rule catalog ready"
    );
    Ok(catalog)
}

/// The instrument given on the command line, else the catalog's.
pub fn resolve_instrument(explicit: Option<&str>, catalog: &RuleCatalog) -> Result<InstrumentName> {
    match explicit {
        Some(name) => InstrumentName::new(name).context("invalid --instrument"),
        None => catalog
            .instrument()
            .cloned()
            .ok_or_else(|| anyhow!("no instrument: pass --instrument or set one in the catalog")),
    }
}

/// Default output run when `--collection` is not given.
pub fn default_collection(instrument: &InstrumentName) -> String {
    format!("{instrument}/gen2")
}

pub fn run_convert(request: &ConvertRequest) -> Result<ConvertResult> {
    let catalog = load_catalog(&request.config)?;
    let instrument = resolve_instrument(request.instrument.as_deref(), &catalog)?;
    let default_run = match &request.collection {
        Some(run) if run.trim().is_empty() => bail!("--collection must not be blank"),
        Some(run) => run.trim().to_string(),
        None => default_collection(&instrument),
    };
    if request.jobs == 0 {
        bail!("--jobs must be at least 1");
    }

    let span = info_span!(
        "convert",
        source = %request.source.display(),
        dest = %request.dest.display()
    );
    let _guard = span.enter();
    let start = Instant::now();

    let templates = compile_templates(
        catalog
            .dataset_types()
            .iter()
            .filter_map(|def| def.template.as_deref().map(|template| (&def.name, template))),
    )
    .context("compile dataset type templates")?;
    let mut walker = RepoWalker::new(&request.source, templates)
        .with_context(|| format!("open source repository {}", request.source.display()))?;
    let mut writer = RegistryWriter::open(&request.dest, request.transfer)
        .with_context(|| format!("open destination {}", request.dest.display()))?;
    let registry = writer.registry_path().to_path_buf();

    let mut options = ConvertOptions::new(instrument.clone(), default_run.clone());
    options.jobs = request.jobs;
    options.dry_run = request.dry_run;
    let driver = ConversionDriver::from_catalog(&catalog, options);
    let report = driver
        .run(&mut walker, &mut writer)
        .context("conversion aborted")?;

    info!(
        translated = report.translated,
        failed = report.failed(),
        written = report.written,
        duration_ms = start.elapsed().as_millis(),
        "run finished"
    );
    Ok(ConvertResult {
        source: request.source.clone(),
        dest: request.dest.clone(),
        registry,
        instrument,
        default_run,
        report,
        walk: walker.stats(),
    })
}

/// Result of `translate`: the record, the sweep trace and the outcome.
#[derive(Debug)]
pub struct TranslateOutcome {
    pub record: LegacyRecord,
    /// The rules the record was swept against.
    pub rules: RuleSet,
    /// Absent when the sweep itself failed.
    pub trace: Option<Translation>,
    pub result: std::result::Result<StructuredIdentifier, TranslateError>,
}

/// Parse `KEY=VALUE` arguments and run the rule sweep for one record.
///
/// The sweep trace is kept even when required dimensions are missing, so
/// callers can show which rules fired.
pub fn translate_one(
    catalog: &RuleCatalog,
    instrument: &InstrumentName,
    dataset_type: &str,
    pairs: &[String],
) -> Result<TranslateOutcome> {
    let dataset_type = DatasetTypeName::new(dataset_type).context("invalid dataset type")?;
    let data_id = LegacyDataId::from_pairs(pairs).context("invalid data ID")?;
    let record = LegacyRecord::new(dataset_type, data_id);
    let rules = catalog.rule_set();
    let (trace, result) = match rules.apply(instrument, &record) {
        Ok(translation) => {
            let result = translation.clone().resolve(&record, &catalog.schema());
            (Some(translation), result)
        }
        Err(err) => (None, Err(err)),
    };
    Ok(TranslateOutcome {
        record,
        rules,
        trace,
        result,
    })
}
