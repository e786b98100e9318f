// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Candidate pools: every file that is eligible to land in a category folder.
//!
//! Pools are built once per run by walking the category's source directories (and optionally
//! a rule-classified library) and are read-only afterwards. Allocation draws from copies.

use std::collections::HashSet;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::classify::LibraryIndex;

/// The only container the device accepts.
const SAMPLE_EXTENSION: &str = "wav";

/// A resolved category: where its samples come from and which of them qualify.
#[derive(Clone, Debug)]
pub struct CategoryDefinition {
    name: String,
    source_dirs: Vec<PathBuf>,
    pattern: Option<String>,
    include_dirs: Vec<String>,
    exclude_dirs: Vec<String>,
    channels: u16,
    max_file_size: u64,
}

impl CategoryDefinition {
    /// Creates a new category definition. Include and exclude filters are matched
    /// case-insensitively, so they're stored lower cased.
    pub fn new(
        name: String,
        source_dirs: Vec<PathBuf>,
        pattern: Option<String>,
        include_dirs: Vec<String>,
        exclude_dirs: Vec<String>,
        channels: u16,
        max_file_size: u64,
    ) -> CategoryDefinition {
        CategoryDefinition {
            name,
            source_dirs,
            pattern,
            include_dirs: include_dirs.iter().map(|s| s.to_lowercase()).collect(),
            exclude_dirs: exclude_dirs.iter().map(|s| s.to_lowercase()).collect(),
            channels,
            max_file_size,
        }
    }

    /// Gets the category name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the source directories.
    pub fn source_dirs(&self) -> &[PathBuf] {
        &self.source_dirs
    }

    /// Gets the (lower cased) include filters.
    pub fn include_dirs(&self) -> &[String] {
        &self.include_dirs
    }

    /// Gets the (lower cased) exclude filters.
    pub fn exclude_dirs(&self) -> &[String] {
        &self.exclude_dirs
    }

    /// Gets the channel count samples are converted to.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Gets the per-file size ceiling in bytes.
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Returns true if the directory matches an exclude filter. Its whole subtree is skipped.
    fn excludes_dir(&self, dir: &Path) -> bool {
        let dir = dir.to_string_lossy().to_lowercase();
        self.exclude_dirs.iter().any(|excl| dir.contains(excl))
    }

    /// Returns true if files directly in this directory may be used. Subdirectories of a
    /// directory that misses every include filter are still searched.
    fn includes_dir(&self, dir: &Path) -> bool {
        if self.include_dirs.is_empty() {
            return true;
        }
        let dir = dir.to_string_lossy().to_lowercase();
        self.include_dirs.iter().any(|incl| dir.contains(incl))
    }

    fn accepts_file(&self, path: &Path) -> bool {
        path.parent()
            .is_some_and(|dir| !self.excludes_dir(dir) && self.includes_dir(dir))
    }

    fn compile_pattern(&self) -> Result<Option<Regex>, regex::Error> {
        self.pattern
            .as_deref()
            .map(|pattern| RegexBuilder::new(pattern).case_insensitive(true).build())
            .transpose()
    }
}

/// A reference to a candidate sample on disk. Two references are the same file if their paths
/// are equal.
#[derive(Clone, Debug, Serialize)]
pub struct FileRef {
    path: PathBuf,
    size: u64,
}

impl FileRef {
    /// Creates a new file reference.
    pub fn new(path: PathBuf, size: u64) -> FileRef {
        FileRef { path, size }
    }

    /// Gets the path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets the size of the file in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl PartialEq for FileRef {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for FileRef {}

impl Hash for FileRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

/// All eligible files for one category.
#[derive(Clone, Debug)]
pub struct CandidatePool {
    category: String,
    files: Vec<FileRef>,
}

impl CandidatePool {
    /// Creates a new pool.
    pub fn new(category: &str, files: Vec<FileRef>) -> CandidatePool {
        CandidatePool {
            category: category.to_string(),
            files,
        }
    }

    /// Gets the category this pool belongs to.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Gets the files in this pool.
    pub fn files(&self) -> &[FileRef] {
        &self.files
    }

    /// The number of files in this pool.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the pool has no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Every candidate pool for a run, in pool-build (configuration) order.
#[derive(Clone, Debug, Default)]
pub struct Pools {
    pools: Vec<CandidatePool>,
}

impl Pools {
    /// Creates a new set of pools. Order is preserved.
    pub fn new(pools: Vec<CandidatePool>) -> Pools {
        Pools { pools }
    }

    /// Gets the pool for the given category.
    pub fn get(&self, category: &str) -> Option<&CandidatePool> {
        self.pools.iter().find(|pool| pool.category() == category)
    }

    /// Iterates over the pools in build order.
    pub fn iter(&self) -> impl Iterator<Item = &CandidatePool> {
        self.pools.iter()
    }

    /// The number of pools, empty or not.
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    /// Whether there are no pools.
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

/// Builds the candidate pool for a category from its source directories and any library files
/// that were classified into it. A bad pattern yields an empty pool rather than an error.
pub fn build(definition: &CategoryDefinition, library: Option<&LibraryIndex>) -> CandidatePool {
    let pattern = match definition.compile_pattern() {
        Ok(pattern) => pattern,
        Err(e) => {
            error!(
                category = definition.name(),
                err = %e,
                "Invalid file name pattern, category will be empty"
            );
            return CandidatePool::new(definition.name(), Vec::new());
        }
    };

    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut files = Vec::new();

    for root in definition.source_dirs() {
        // Sorted so a seed reproduces the same packs on any filesystem.
        let walker = WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                !entry.file_type().is_dir() || !definition.excludes_dir(entry.path())
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(
                        category = definition.name(),
                        root = ?root,
                        err = %e,
                        "Unable to read entry, skipping"
                    );
                    continue;
                }
            };

            if !entry.file_type().is_file() || !definition.accepts_file(entry.path()) {
                continue;
            }

            // Files can disappear between the directory listing and the stat.
            let size = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    warn!(path = ?entry.path(), err = %e, "File not found");
                    continue;
                }
            };

            consider(
                definition,
                pattern.as_ref(),
                entry.path(),
                size,
                &mut seen,
                &mut files,
            );
        }
    }

    if let Some(library) = library {
        for path in library.files(definition.name()) {
            if !definition.accepts_file(path) {
                continue;
            }
            let size = match fs::metadata(path) {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    warn!(path = ?path, err = %e, "File not found");
                    continue;
                }
            };
            consider(
                definition,
                pattern.as_ref(),
                path,
                size,
                &mut seen,
                &mut files,
            );
        }
    }

    info!(
        category = definition.name(),
        files = files.len(),
        include = ?definition.include_dirs(),
        exclude = ?definition.exclude_dirs(),
        "Collected candidate files"
    );

    CandidatePool::new(definition.name(), files)
}

/// Builds the pools for every category, one category per rayon task.
pub fn build_all(definitions: &[CategoryDefinition], library: Option<&LibraryIndex>) -> Pools {
    Pools::new(
        definitions
            .par_iter()
            .map(|definition| build(definition, library))
            .collect(),
    )
}

fn consider(
    definition: &CategoryDefinition,
    pattern: Option<&Regex>,
    path: &Path,
    size: u64,
    seen: &mut HashSet<PathBuf>,
    files: &mut Vec<FileRef>,
) {
    if !is_sample(path) || size > definition.max_file_size() {
        return;
    }

    if let Some(pattern) = pattern {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();
        if !pattern.is_match(&file_name) {
            return;
        }
    }

    if seen.insert(path.to_path_buf()) {
        files.push(FileRef::new(path.to_path_buf(), size));
    } else {
        debug!(category = definition.name(), path = ?path, "Duplicate candidate ignored");
    }
}

/// Returns true if the path has the sample extension, ignoring case. Hidden files (such as
/// `._kick.wav` resource forks) are never samples.
pub fn is_sample(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('.'));
    let wav = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(SAMPLE_EXTENSION));
    wav && !hidden
}
