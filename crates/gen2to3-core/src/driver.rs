//! Conversion driver.
//!
//! Pulls walked records in batches, translates each batch (in a rayon pool
//! when more than one job is requested) and hands the results to the writer
//! one at a time, in walk order.

use std::collections::{BTreeMap, BTreeSet};

use gen2to3_ingest::{WalkError, WalkedRecord};
use gen2to3_model::{DatasetTypeName, InstrumentName, StructuredIdentifier};
use gen2to3_standards::RuleCatalog;
use gen2to3_translate::{RuleSet, TranslateError, TranslateErrorKind};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, error, info, info_span, warn};

use crate::cancel::CancelFlag;
use crate::error::ConvertError;
use crate::report::{ConversionReport, FailureStage, RecordFailure};
use crate::writer::{DatasetRef, DatasetWriter};

/// Records translated per batch; the cancel flag is checked between batches.
pub const DEFAULT_BATCH_SIZE: usize = 256;

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub instrument: InstrumentName,
    /// Run for dataset types the catalog does not route elsewhere.
    pub default_run: String,
    pub jobs: usize,
    pub batch_size: usize,
    pub dry_run: bool,
}

impl ConvertOptions {
    pub fn new(instrument: InstrumentName, default_run: impl Into<String>) -> Self {
        Self {
            instrument,
            default_run: default_run.into(),
            jobs: 1,
            batch_size: DEFAULT_BATCH_SIZE,
            dry_run: false,
        }
    }
}

enum Outcome {
    Ignored,
    Translated(StructuredIdentifier),
    Failed(TranslateError),
}

#[derive(Debug)]
pub struct ConversionDriver {
    rules: RuleSet,
    schema: BTreeMap<DatasetTypeName, Vec<String>>,
    runs: BTreeMap<DatasetTypeName, String>,
    ignore: BTreeSet<DatasetTypeName>,
    options: ConvertOptions,
    cancel: CancelFlag,
}

impl ConversionDriver {
    /// A driver with no dimension requirements, run routing or ignore list.
    pub fn new(rules: RuleSet, options: ConvertOptions) -> Self {
        Self {
            rules,
            schema: BTreeMap::new(),
            runs: BTreeMap::new(),
            ignore: BTreeSet::new(),
            options,
            cancel: CancelFlag::new(),
        }
    }

    /// Rules, required dimensions, run routing and ignore list from a catalog.
    pub fn from_catalog(catalog: &RuleCatalog, options: ConvertOptions) -> Self {
        Self {
            rules: catalog.rule_set(),
            schema: catalog.schema(),
            runs: catalog.runs().clone(),
            ignore: catalog.ignored().clone(),
            options,
            cancel: CancelFlag::new(),
        }
    }

    #[must_use]
    pub fn with_schema(mut self, schema: BTreeMap<DatasetTypeName, Vec<String>>) -> Self {
        self.schema = schema;
        self
    }

    #[must_use]
    pub fn with_runs(mut self, runs: BTreeMap<DatasetTypeName, String>) -> Self {
        self.runs = runs;
        self
    }

    #[must_use]
    pub fn with_ignored(mut self, ignore: BTreeSet<DatasetTypeName>) -> Self {
        self.ignore = ignore;
        self
    }

    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Output run for a dataset type.
    pub fn run_for(&self, dataset_type: &DatasetTypeName) -> &str {
        self.runs
            .get(dataset_type)
            .map_or(self.options.default_run.as_str(), String::as_str)
    }

    /// Convert every record the iterator yields.
    ///
    /// Record-level failures are collected in the report. A handler whose
    /// input is missing stops the run with [`ConvertError::Fatal`].
    pub fn run<I, W>(&self, records: I, mut writer: W) -> Result<ConversionReport, ConvertError>
    where
        I: IntoIterator<Item = Result<WalkedRecord, WalkError>>,
        W: DatasetWriter,
    {
        let span = info_span!(
            "convert",
            instrument = %self.options.instrument,
            run = %self.options.default_run,
            jobs = self.options.jobs,
            dry_run = self.options.dry_run
        );
        let _guard = span.enter();

        let pool = if self.options.jobs > 1 {
            Some(
                ThreadPoolBuilder::new()
                    .num_threads(self.options.jobs)
                    .build()?,
            )
        } else {
            None
        };

        let mut report = ConversionReport {
            dry_run: self.options.dry_run,
            ..ConversionReport::default()
        };
        let batch_size = self.options.batch_size.max(1);
        let mut records = records.into_iter();

        loop {
            if self.cancel.is_cancelled() {
                warn!(seen = report.seen, "conversion cancelled");
                report.cancelled = true;
                break;
            }
            let batch: Vec<_> = records.by_ref().take(batch_size).collect();
            if batch.is_empty() {
                break;
            }
            let outcomes = self.translate_batch(&batch, pool.as_ref());
            for (item, outcome) in batch.into_iter().zip(outcomes) {
                self.handle(item, outcome, &mut writer, &mut report)?;
            }
        }

        writer.flush().map_err(|e| ConvertError::Flush {
            source: Box::new(e),
        })?;

        info!(
            seen = report.seen,
            translated = report.translated,
            written = report.written,
            failed = report.failed(),
            skipped = report.skipped,
            cancelled = report.cancelled,
            "conversion complete"
        );
        Ok(report)
    }

    fn translate_batch(
        &self,
        batch: &[Result<WalkedRecord, WalkError>],
        pool: Option<&ThreadPool>,
    ) -> Vec<Option<Outcome>> {
        match pool {
            Some(pool) => pool.install(|| batch.par_iter().map(|item| self.outcome(item)).collect()),
            None => batch.iter().map(|item| self.outcome(item)).collect(),
        }
    }

    /// `None` for walker failures, which have nothing to translate.
    fn outcome(&self, item: &Result<WalkedRecord, WalkError>) -> Option<Outcome> {
        let walked = item.as_ref().ok()?;
        let record = &walked.record;
        if self.ignore.contains(&record.dataset_type) {
            return Some(Outcome::Ignored);
        }
        Some(
            match self
                .rules
                .translate(&self.options.instrument, record, &self.schema)
            {
                Ok(data_id) => Outcome::Translated(data_id),
                Err(err) => Outcome::Failed(err),
            },
        )
    }

    fn handle<W: DatasetWriter>(
        &self,
        item: Result<WalkedRecord, WalkError>,
        outcome: Option<Outcome>,
        writer: &mut W,
        report: &mut ConversionReport,
    ) -> Result<(), ConvertError> {
        report.seen += 1;
        let walked = match item {
            Ok(walked) => walked,
            Err(err) => {
                warn!(error = %err, "walk failed");
                report.record_failure(RecordFailure {
                    stage: FailureStage::Walk,
                    dataset_type: None,
                    data_id: None,
                    path: None,
                    message: err.to_string(),
                });
                return Ok(());
            }
        };
        let record = &walked.record;

        let data_id = match outcome {
            Some(Outcome::Translated(data_id)) => data_id,
            Some(Outcome::Ignored) => {
                debug!(path = %walked.relative, dataset_type = %record.dataset_type, "ignored");
                report.skipped += 1;
                report.counts(&record.dataset_type).skipped += 1;
                return Ok(());
            }
            Some(Outcome::Failed(err)) if err.is_fatal() => {
                error!(path = %walked.relative, error = %err, "fatal translation error");
                return Err(ConvertError::Fatal { source: err });
            }
            Some(Outcome::Failed(err)) => {
                warn!(path = %walked.relative, error = %err, "translation failed");
                let stage = match err.kind() {
                    TranslateErrorKind::Conflict => FailureStage::Conflict,
                    _ => FailureStage::Unresolved,
                };
                report.record_failure(RecordFailure {
                    stage,
                    dataset_type: Some(record.dataset_type.clone()),
                    data_id: Some(record.data_id.clone()),
                    path: Some(walked.path.clone()),
                    message: err.to_string(),
                });
                return Ok(());
            }
            None => return Ok(()),
        };
        report.translated += 1;
        report.counts(&record.dataset_type).translated += 1;

        let run = self.run_for(&record.dataset_type);
        let dataset = DatasetRef {
            run,
            dataset_type: &record.dataset_type,
            data_id: &data_id,
            source: &walked.path,
        };
        let stored = if self.options.dry_run {
            writer.reserve(&dataset)
        } else {
            writer.write(&dataset)
        };
        match stored {
            Ok(()) => {
                debug!(path = %walked.relative, run, data_id = %data_id, "stored");
                report.written += 1;
                report.counts(&record.dataset_type).written += 1;
                *report.by_run.entry(run.to_string()).or_default() += 1;
            }
            Err(err) => {
                warn!(path = %walked.relative, error = %err, "write failed");
                report.record_failure(RecordFailure {
                    stage: FailureStage::Write,
                    dataset_type: Some(record.dataset_type.clone()),
                    data_id: Some(record.data_id.clone()),
                    path: Some(walked.path.clone()),
                    message: err.to_string(),
                });
            }
        }
        Ok(())
    }
}
