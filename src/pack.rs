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
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs::{self, File, Permissions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::Serialize;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::allocate::{AllocationPlan, Slot};
use crate::normalize::Normalizer;
use crate::pool::CategoryDefinition;

/// Channel count used for a category without a definition.
const DEFAULT_CHANNELS: u16 = 2;

#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    #[error("Unable to create pack directory {0}: {1}")]
    CreateDir(String, io::Error),

    #[error("Unable to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// A named pack and the files planned for it.
#[derive(Debug, Serialize)]
pub struct Pack {
    name: String,
    root: PathBuf,
    plan: AllocationPlan,
}

impl Pack {
    /// Creates a new pack rooted at `output_dir/name`.
    pub fn new(name: &str, output_dir: &Path, plan: AllocationPlan) -> Pack {
        Pack {
            name: name.to_string(),
            root: output_dir.join(name),
            plan,
        }
    }

    /// Gets the pack name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the pack directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Gets the allocation plan.
    pub fn plan(&self) -> &AllocationPlan {
        &self.plan
    }
}

/// A file that didn't make it into the pack.
#[derive(Debug)]
pub struct Failure {
    category: String,
    source: PathBuf,
    reason: String,
}

impl Failure {
    /// Gets the category the file was planned for.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Gets the source file in the library.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Why the file failed.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// What happened to each planned file.
#[derive(Debug, Default)]
pub struct MaterializeReport {
    materialized: Vec<PathBuf>,
    failed: Vec<Failure>,
}

impl MaterializeReport {
    /// Destination paths of the files now in the pack.
    pub fn materialized(&self) -> &[PathBuf] {
        &self.materialized
    }

    /// Files that were dropped, with the reason.
    pub fn failed(&self) -> &[Failure] {
        &self.failed
    }

    /// Consumes the report, keeping only the failures.
    pub fn into_failed(self) -> Vec<Failure> {
        self.failed
    }

    fn merge(&mut self, other: MaterializeReport) {
        self.materialized.extend(other.materialized);
        self.failed.extend(other.failed);
    }
}

/// Writes packs to disk. Categories are written concurrently on a dedicated worker pool; the
/// files of one category are written one at a time.
pub struct Materializer {
    normalizer: Box<dyn Normalizer>,
    pool: rayon::ThreadPool,
}

impl Materializer {
    /// Creates a new materializer with the given number of worker threads.
    pub fn new(
        normalizer: Box<dyn Normalizer>,
        workers: usize,
    ) -> Result<Materializer, MaterializeError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("packfactory-materialize-{i}"))
            .build()?;
        Ok(Materializer { normalizer, pool })
    }

    /// Copies and normalizes every planned file into the pack directory. A file that fails is
    /// removed from the pack and reported; it never stops the rest of the pack.
    pub fn materialize(
        &self,
        pack: &Pack,
        definitions: &[CategoryDefinition],
    ) -> Result<MaterializeReport, MaterializeError> {
        fs::create_dir_all(pack.root())
            .map_err(|e| MaterializeError::CreateDir(pack.root().display().to_string(), e))?;

        let slots: Vec<&Slot> = pack.plan().slots().collect();
        let reports: Vec<MaterializeReport> = self.pool.install(|| {
            slots
                .par_iter()
                .map(|slot| {
                    let channels = definitions
                        .iter()
                        .find(|definition| definition.name() == slot.category())
                        .map(|definition| definition.channels())
                        .unwrap_or(DEFAULT_CHANNELS);
                    self.materialize_slot(pack.root(), slot, channels)
                })
                .collect()
        });

        let mut report = MaterializeReport::default();
        for category_report in reports {
            report.merge(category_report);
        }

        match remove_hidden_files(pack.root()) {
            Ok(0) => {}
            Ok(removed) => info!(pack = pack.name(), removed, "Removed hidden files"),
            Err(e) => warn!(pack = pack.name(), err = %e, "Unable to remove hidden files"),
        }

        Ok(report)
    }

    fn materialize_slot(&self, root: &Path, slot: &Slot, channels: u16) -> MaterializeReport {
        let mut report = MaterializeReport::default();
        let dir = root.join(slot.category());
        let fail = |report: &mut MaterializeReport, source: &Path, reason: String| {
            report.failed.push(Failure {
                category: slot.category().to_string(),
                source: source.to_path_buf(),
                reason,
            });
        };

        if let Err(e) = fs::create_dir_all(&dir) {
            error!(dir = ?dir, err = %e, "Unable to create category directory");
            for file in slot.files() {
                fail(&mut report, file.path(), e.to_string());
            }
            return report;
        }

        let mut used: HashSet<OsString> = HashSet::new();
        for file in slot.files() {
            let destination = unique_destination(&dir, file.path(), &mut used);

            if let Err(e) = copy_preserving_metadata(file.path(), &destination) {
                warn!(path = ?file.path(), err = %e, "Unable to copy sample, skipping");
                remove_partial(&destination);
                fail(&mut report, file.path(), e.to_string());
                continue;
            }

            if let Err(e) = self.normalizer.normalize(&destination, channels) {
                if e.is_decode() {
                    warn!(path = ?file.path(), err = %e, "Could not decode sample, skipping");
                } else {
                    error!(path = ?file.path(), err = %e, "Error processing sample, skipping");
                }
                remove_partial(&destination);
                fail(&mut report, file.path(), e.to_string());
                continue;
            }

            report.materialized.push(destination);
        }

        info!(
            category = slot.category(),
            materialized = report.materialized.len(),
            failed = report.failed.len(),
            "Materialized category"
        );
        report
    }
}

/// Picks a destination in `dir` for the source file that no other file of this pack uses. Name
/// clashes get `-2`, `-3`, ... appended to the stem.
fn unique_destination(dir: &Path, source: &Path, used: &mut HashSet<OsString>) -> PathBuf {
    let stem = source.file_stem().unwrap_or_default();
    let extension = source.extension();

    let mut candidate = source.file_name().unwrap_or_default().to_os_string();
    let mut suffix = 2;
    while used.contains(&candidate) || dir.join(&candidate).exists() {
        candidate = stem.to_os_string();
        candidate.push(format!("-{suffix}"));
        if let Some(extension) = extension {
            candidate.push(".");
            candidate.push(extension);
        }
        suffix += 1;
    }

    used.insert(candidate.clone());
    dir.join(candidate)
}

/// Copies a file, keeping its permissions and modification time. A copy of a read only file is
/// made writable just long enough to set its modification time.
fn copy_preserving_metadata(source: &Path, destination: &Path) -> io::Result<()> {
    fs::copy(source, destination)?;
    let modified = fs::metadata(source)?.modified()?;
    let permissions = fs::metadata(destination)?.permissions();

    let Some(writable) = owner_writable(&permissions) else {
        return set_modified(destination, modified);
    };
    fs::set_permissions(destination, writable)?;
    let result = set_modified(destination, modified);
    fs::set_permissions(destination, permissions)?;
    result
}

fn set_modified(path: &Path, modified: SystemTime) -> io::Result<()> {
    File::options().write(true).open(path)?.set_modified(modified)
}

/// The permissions with the owner write bit added, or `None` if the owner can already write.
#[cfg(unix)]
fn owner_writable(permissions: &Permissions) -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;

    let mode = permissions.mode();
    (mode & 0o200 == 0).then(|| Permissions::from_mode(mode | 0o200))
}

#[cfg(not(unix))]
fn owner_writable(permissions: &Permissions) -> Option<Permissions> {
    permissions.readonly().then(|| {
        let mut writable = permissions.clone();
        writable.set_readonly(false);
        writable
    })
}

/// Removes what's left of a sample that failed. A file that was never created is fine.
fn remove_partial(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => error!(path = ?path, err = %e, "Unable to remove failed sample"),
    }
}

/// Removes hidden files (names starting with a dot) anywhere under `dir`. Returns how many were
/// removed.
pub fn remove_hidden_files(dir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_file() && entry.file_name().to_string_lossy().starts_with('.') {
            fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}
