//! Lazy repository walk.

use std::cmp::Ordering;
use std::path::{Component, Path, PathBuf};

use gen2to3_model::LegacyRecord;
use tracing::{debug, trace};
use walkdir::{DirEntry, WalkDir};

use crate::error::{Result, WalkError};
use crate::template::PathTemplate;

/// A legacy dataset found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedRecord {
    pub record: LegacyRecord,
    /// Path to the payload file.
    pub path: PathBuf,
    /// Root-relative path with `/` separators.
    pub relative: String,
}

/// Counters accumulated while walking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub directories: usize,
    pub files: usize,
    pub matched: usize,
    pub unmatched: usize,
    /// Symlinks to directories, which are never descended.
    pub skipped_links: usize,
}

/// Depth-first walk of a Gen2 repository.
///
/// Entries of each directory are visited in name order, files before
/// subdirectories. Directories are only read when the iterator reaches them.
/// Symlinked files are followed; symlinked directories are not, so the
/// `_parent` link of a rerun does not loop back into the repository.
#[derive(Debug)]
pub struct RepoWalker {
    root: PathBuf,
    templates: Vec<PathTemplate>,
    entries: walkdir::IntoIter,
    stats: WalkStats,
}

impl RepoWalker {
    pub fn new(root: impl Into<PathBuf>, templates: Vec<PathTemplate>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(WalkError::RootNotFound { path: root });
        }
        let entries = WalkDir::new(&root)
            .follow_links(false)
            .sort_by(files_first)
            .into_iter();
        Ok(Self {
            root,
            templates,
            entries,
            stats: WalkStats::default(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stats(&self) -> WalkStats {
        self.stats
    }

    /// Payload path of `entry`, or `None` for directories and other entries
    /// that are not walked as files.
    fn payload(&mut self, entry: DirEntry) -> Option<PathBuf> {
        let file_type = entry.file_type();
        if file_type.is_dir() {
            self.stats.directories += 1;
            return None;
        }
        if file_type.is_symlink() {
            if entry.path().is_dir() {
                self.stats.skipped_links += 1;
                debug!(path = %entry.path().display(), "not following directory link");
                return None;
            }
            if !entry.path().is_file() {
                return None;
            }
        } else if !file_type.is_file() {
            return None;
        }
        Some(entry.into_path())
    }

    fn match_file(&mut self, path: PathBuf) -> Option<Result<WalkedRecord>> {
        self.stats.files += 1;
        let relative = match relative_path(&self.root, &path) {
            Ok(relative) => relative,
            Err(err) => return Some(Err(err)),
        };
        for template in &self.templates {
            match template.parse_path(&relative) {
                Ok(Some(data_id)) => {
                    self.stats.matched += 1;
                    trace!(path = %relative, dataset_type = %template.dataset_type(), "matched");
                    return Some(Ok(WalkedRecord {
                        record: LegacyRecord::new(template.dataset_type().clone(), data_id),
                        path,
                        relative,
                    }));
                }
                Ok(None) => {}
                Err(err) => return Some(Err(err)),
            }
        }
        self.stats.unmatched += 1;
        debug!(path = %relative, "no template matches");
        None
    }
}

impl Iterator for RepoWalker {
    type Item = Result<WalkedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(source) => {
                    let path = source
                        .path()
                        .map_or_else(|| self.root.clone(), Path::to_path_buf);
                    return Some(Err(WalkError::DirectoryRead { path, source }));
                }
            };
            let Some(path) = self.payload(entry) else {
                continue;
            };
            if let Some(result) = self.match_file(path) {
                return Some(result);
            }
        }
    }
}

fn files_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    let a_dir = a.file_type().is_dir();
    let b_dir = b.file_type().is_dir();
    a_dir
        .cmp(&b_dir)
        .then_with(|| a.file_name().cmp(b.file_name()))
}

fn relative_path(root: &Path, path: &Path) -> Result<String> {
    let non_utf8 = || WalkError::NonUtf8Path {
        path: path.to_path_buf(),
    };
    let relative = path.strip_prefix(root).map_err(|_| non_utf8())?;
    let mut parts = Vec::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            parts.push(part.to_str().ok_or_else(non_utf8)?);
        }
    }
    Ok(parts.join("/"))
}
