//! JSON-lines dataset registry.

use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use gen2to3_core::{DatasetRef, DatasetWriter};
use gen2to3_model::{DatasetTypeName, StructuredIdentifier};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, WriteError};
use crate::id::DatasetId;
use crate::transfer::TransferMode;

/// Registry file name under the destination root.
pub const REGISTRY_FILE: &str = "registry.jsonl";

/// One line of `registry.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub dataset_id: DatasetId,
    pub run: String,
    pub dataset_type: DatasetTypeName,
    pub data_id: StructuredIdentifier,
    /// Absolute source path for `none` transfers, otherwise relative to the
    /// destination root.
    pub uri: String,
    pub ingest_date: DateTime<Utc>,
}

/// Appends datasets to a destination repository.
///
/// Entries already present in the registry are loaded on open, so a second
/// conversion into the same destination rejects datasets it already holds.
#[derive(Debug)]
pub struct RegistryWriter {
    root: PathBuf,
    registry_path: PathBuf,
    mode: TransferMode,
    known: BTreeSet<DatasetId>,
    reserved: BTreeSet<DatasetId>,
    out: Option<BufWriter<File>>,
    written: usize,
}

impl RegistryWriter {
    /// Open the registry under `root`. Nothing is created until the first
    /// write.
    pub fn open(root: impl Into<PathBuf>, mode: TransferMode) -> Result<Self> {
        let root = root.into();
        let registry_path = root.join(REGISTRY_FILE);
        let known = if registry_path.is_file() {
            read_entries(&registry_path)?
                .into_iter()
                .map(|entry| entry.dataset_id)
                .collect()
        } else {
            BTreeSet::new()
        };
        info!(
            root = %root.display(),
            mode = %mode,
            existing = known.len(),
            "registry opened"
        );
        Ok(Self {
            root,
            registry_path,
            mode,
            known,
            reserved: BTreeSet::new(),
            out: None,
            written: 0,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry_path(&self) -> &Path {
        &self.registry_path
    }

    pub fn mode(&self) -> TransferMode {
        self.mode
    }

    /// Datasets registered so far, including those loaded on open.
    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    pub fn contains(&self, id: &DatasetId) -> bool {
        self.known.contains(id)
    }

    /// Datasets written by this writer.
    pub fn written(&self) -> usize {
        self.written
    }

    fn check_unique(&self, id: DatasetId, dataset: &DatasetRef<'_>) -> Result<()> {
        if self.known.contains(&id) || self.reserved.contains(&id) {
            return Err(WriteError::Duplicate {
                dataset_id: id,
                run: dataset.run.to_string(),
                dataset_type: dataset.dataset_type.to_string(),
                data_id: dataset.data_id.to_string(),
            });
        }
        Ok(())
    }

    fn output(&mut self) -> Result<&mut BufWriter<File>> {
        if self.out.is_none() {
            std::fs::create_dir_all(&self.root).map_err(|e| WriteError::io(&self.root, e))?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.registry_path)
                .map_err(|e| WriteError::io(&self.registry_path, e))?;
            self.out = Some(BufWriter::new(file));
        }
        let path = &self.registry_path;
        self.out.as_mut().ok_or_else(|| {
            WriteError::io(path, std::io::Error::other("registry not open"))
        })
    }

    fn place(&self, dataset: &DatasetRef<'_>) -> Result<String> {
        if !self.mode.places_files() {
            let absolute = std::path::absolute(dataset.source)
                .map_err(|e| WriteError::io(dataset.source, e))?;
            return Ok(absolute.display().to_string());
        }
        let file_name = dataset
            .source
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| WriteError::MissingFileName {
                path: dataset.source.to_path_buf(),
            })?;
        let relative = format!("{}/{}/{}", dataset.run, dataset.dataset_type, file_name);
        let target = self.root.join(&relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| WriteError::io(parent, e))?;
        }
        self.mode.transfer(dataset.source, &target)?;
        Ok(relative)
    }
}

impl DatasetWriter for RegistryWriter {
    type Error = WriteError;

    fn write(&mut self, dataset: &DatasetRef<'_>) -> Result<()> {
        let dataset_id = DatasetId::compute(dataset.run, dataset.dataset_type, dataset.data_id);
        self.check_unique(dataset_id, dataset)?;
        let uri = self.place(dataset)?;
        let entry = RegistryEntry {
            dataset_id,
            run: dataset.run.to_string(),
            dataset_type: dataset.dataset_type.clone(),
            data_id: dataset.data_id.clone(),
            uri,
            ingest_date: Utc::now(),
        };
        let line = serde_json::to_string(&entry)?;
        let path = self.registry_path.clone();
        let out = self.output()?;
        writeln!(out, "{line}").map_err(|e| WriteError::io(&path, e))?;
        self.known.insert(dataset_id);
        self.written += 1;
        debug!(dataset_id = %dataset_id, uri = %entry.uri, "registered");
        Ok(())
    }

    fn reserve(&mut self, dataset: &DatasetRef<'_>) -> Result<()> {
        let dataset_id = DatasetId::compute(dataset.run, dataset.dataset_type, dataset.data_id);
        self.check_unique(dataset_id, dataset)?;
        self.reserved.insert(dataset_id);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(out) = self.out.as_mut() {
            out.flush()
                .map_err(|e| WriteError::io(&self.registry_path, e))?;
        }
        Ok(())
    }
}

/// Read every entry of a registry file.
pub fn read_entries(path: &Path) -> Result<Vec<RegistryEntry>> {
    let file = File::open(path).map_err(|e| WriteError::io(path, e))?;
    let mut entries = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| WriteError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let entry = serde_json::from_str(&line).map_err(|source| WriteError::CorruptRegistry {
            path: path.to_path_buf(),
            line: index + 1,
            source,
        })?;
        entries.push(entry);
    }
    Ok(entries)
}
