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

//! Rule based classification of library samples.
//!
//! Large expansion libraries are laid out as `.../<Drums|Instruments|One Shots>/<Kind>/file.wav`.
//! The kind directory is a decent hint about what a sample is, but kinds are named
//! inconsistently across libraries, so an ordered list of rules maps a file to a category.
//! The first rule that matches wins. Files that are ignored or match nothing are dropped and
//! counted rather than forced into a category.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::pool::is_sample;

/// Case-insensitive conditions on a library file. Any one condition matching is a match.
#[derive(Clone, Debug, Default)]
pub struct Matcher {
    kind_is: Vec<String>,
    kind_contains: Vec<String>,
    file_contains: Vec<String>,
    path_contains: Vec<String>,
}

impl Matcher {
    /// Matches when the kind (parent directory name) equals one of these.
    pub fn kind_is<S: AsRef<str>>(mut self, values: &[S]) -> Matcher {
        self.kind_is.extend(lower(values));
        self
    }

    /// Matches when the kind contains one of these.
    pub fn kind_contains<S: AsRef<str>>(mut self, values: &[S]) -> Matcher {
        self.kind_contains.extend(lower(values));
        self
    }

    /// Matches when the file name contains one of these.
    pub fn file_contains<S: AsRef<str>>(mut self, values: &[S]) -> Matcher {
        self.file_contains.extend(lower(values));
        self
    }

    /// Matches when the full path contains one of these.
    pub fn path_contains<S: AsRef<str>>(mut self, values: &[S]) -> Matcher {
        self.path_contains.extend(lower(values));
        self
    }

    fn matches(&self, sample: &SampleName) -> bool {
        self.kind_is.iter().any(|v| sample.kind == *v)
            || self.kind_contains.iter().any(|v| sample.kind.contains(v))
            || self.file_contains.iter().any(|v| sample.file.contains(v))
            || self.path_contains.iter().any(|v| sample.path.contains(v))
    }
}

fn lower<S: AsRef<str>>(values: &[S]) -> impl Iterator<Item = String> + '_ {
    values.iter().map(|v| v.as_ref().to_lowercase())
}

/// Maps matching files to a category.
#[derive(Clone, Debug)]
pub struct Rule {
    category: String,
    matcher: Matcher,
}

impl Rule {
    /// Creates a new rule.
    pub fn new(category: &str, matcher: Matcher) -> Rule {
        Rule {
            category: category.to_string(),
            matcher,
        }
    }

    /// Gets the category this rule assigns.
    pub fn category(&self) -> &str {
        &self.category
    }
}

/// The lower cased pieces of a path the rules look at.
struct SampleName {
    kind: String,
    file: String,
    path: String,
}

impl SampleName {
    fn new(path: &Path) -> Option<SampleName> {
        let kind = path.parent()?.file_name()?.to_string_lossy().to_lowercase();
        let file = path.file_name()?.to_string_lossy().to_lowercase();
        // Rules are written with forward slashes.
        let path = path.to_string_lossy().replace('\\', "/").to_lowercase();
        Some(SampleName { kind, file, path })
    }
}

/// An ignore list followed by an ordered list of rules.
#[derive(Clone, Debug)]
pub struct Classifier {
    ignore: Matcher,
    rules: Vec<Rule>,
}

impl Classifier {
    /// Creates a new classifier. Rules are evaluated in order.
    pub fn new(ignore: Matcher, rules: Vec<Rule>) -> Classifier {
        Classifier { ignore, rules }
    }

    /// Gets the ignore matcher.
    pub fn ignore(&self) -> &Matcher {
        &self.ignore
    }

    /// Gets the rules in evaluation order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Returns the category for the given file, or None if the file is ignored or unmatched.
    pub fn classify(&self, path: &Path) -> Option<&str> {
        let sample = SampleName::new(path)?;
        if self.ignore.matches(&sample) {
            return None;
        }

        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(&sample))
            .map(|rule| rule.category())
    }
}

impl Default for Classifier {
    /// Rules for Native Instruments style expansion libraries. The fill keys come first and in
    /// device order, so a kind like "Kick & Snare" is a Kick. Kind based rules come before file
    /// name based ones.
    fn default() -> Self {
        let ignore = Matcher::default()
            .kind_is(&["Combo", "Lick", "Scratch"])
            .path_contains(&["/loops/"]);

        let keepers = [
            "Percussion",
            "Tom",
            "Cymbal",
            "Vocal",
            "Hand Drum",
            "Mallet Drum",
            "Noise",
            "Chord",
            "Stab & Hit",
        ];

        let mut rules = vec![
            Rule::new("Kick", Matcher::default().kind_contains(&["kick"])),
            Rule::new("Snare", Matcher::default().kind_contains(&["snare"])),
            Rule::new("HiHat", Matcher::default().kind_contains(&["hihat"])),
            Rule::new("Synth", Matcher::default().kind_contains(&["synth"])),
            Rule::new("Bass", Matcher::default().kind_contains(&["bass"])),
            Rule::new("Snare", Matcher::default().kind_is(&["Clap"])),
            Rule::new("HiHat", Matcher::default().kind_is(&["Shaker"])),
            Rule::new("Bass", Matcher::default().file_contains(&["bass ", "sub "])),
            Rule::new("HiHat", Matcher::default().file_contains(&["tamb"])),
            Rule::new("Percussion", Matcher::default().kind_is(&["Wooden", "Click"])),
            Rule::new(
                "Blip",
                Matcher::default().kind_is(&["Blip & Blop", "Buzz", "Glitch", "Laser", "Zap"]),
            ),
            Rule::new(
                "Metal",
                Matcher::default()
                    .kind_contains(&["metal"])
                    .kind_is(&["Strike"]),
            ),
            Rule::new(
                "Synth",
                Matcher::default()
                    .path_contains(&["/instruments/"])
                    .kind_is(&["Guitar", "Keys"])
                    .kind_contains(&["note"]),
            ),
        ];
        rules.extend(
            keepers
                .iter()
                .map(|keeper| Rule::new(keeper, Matcher::default().kind_is(&[keeper]))),
        );

        Classifier::new(ignore, rules)
    }
}

/// Library files grouped by library and by the category they were classified into. A library is
/// the top level directory under a library root, e.g. one expansion.
#[derive(Clone, Debug, Default)]
pub struct LibraryIndex {
    libraries: BTreeMap<String, BTreeMap<String, Vec<PathBuf>>>,
    dropped: usize,
}

impl LibraryIndex {
    /// Gets the files classified into the given category, across all libraries.
    pub fn files<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Path> + 'a {
        self.libraries
            .values()
            .filter_map(move |categories| categories.get(category))
            .flatten()
            .map(PathBuf::as_path)
    }

    /// Gets the number of classified files per category, sorted by category.
    pub fn counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for (category, files) in self.libraries.values().flatten() {
            *counts.entry(category.as_str()).or_insert(0) += files.len();
        }
        counts
    }

    /// Gets every category that has at least one file, sorted.
    pub fn categories(&self) -> BTreeSet<&str> {
        self.libraries
            .values()
            .flat_map(|categories| categories.keys())
            .map(String::as_str)
            .collect()
    }

    /// Whether any file was classified into the given category.
    pub fn has_category(&self, category: &str) -> bool {
        self.libraries
            .values()
            .any(|categories| categories.contains_key(category))
    }

    /// Gets the library names, sorted.
    pub fn libraries(&self) -> impl Iterator<Item = &str> {
        self.libraries.keys().map(String::as_str)
    }

    /// Gets an index holding only the given library.
    pub fn library(&self, name: &str) -> Option<LibraryIndex> {
        self.libraries.get(name).map(|categories| LibraryIndex {
            libraries: BTreeMap::from([(name.to_string(), categories.clone())]),
            dropped: 0,
        })
    }

    /// Gets the number of samples that were ignored or matched no rule.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

/// The library a file belongs to: the first directory below the root. Files sitting directly in
/// the root belong to a library named after the root.
fn library_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut components = relative.components();
    match (components.next(), components.next()) {
        (Some(first), Some(_)) => first.as_os_str().to_string_lossy().to_string(),
        _ => root
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default(),
    }
}

/// Walks the library roots and classifies every sample found.
pub fn index_library(roots: &[PathBuf], classifier: &Classifier) -> LibraryIndex {
    let mut index = LibraryIndex::default();

    for root in roots {
        for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(root = ?root, err = %e, "Unable to read library entry, skipping");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_sample(entry.path()) {
                continue;
            }

            match classifier.classify(entry.path()) {
                Some(category) => index
                    .libraries
                    .entry(library_name(root, entry.path()))
                    .or_default()
                    .entry(category.to_string())
                    .or_default()
                    .push(entry.into_path()),
                None => {
                    debug!(path = ?entry.path(), "Sample not classified");
                    index.dropped += 1;
                }
            }
        }
    }

    info!(
        libraries = index.libraries.len(),
        categories = index.categories().len(),
        dropped = index.dropped,
        "Classified library"
    );

    index
}
