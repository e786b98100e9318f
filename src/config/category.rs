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
use std::path::PathBuf;

use serde::Deserialize;

use super::error::ConfigError;
use super::limits::Limits;
use crate::pool::CategoryDefinition;

/// Stereo unless a category says otherwise.
const DEFAULT_CHANNELS: u16 = 2;

/// A YAML representation of a pack category (one folder on the device).
#[derive(Deserialize, Clone, Debug)]
pub struct Category {
    /// The folder name for this category, e.g. "Kick".
    name: String,

    /// Directories searched recursively for candidate samples.
    #[serde(default)]
    source_dirs: Vec<PathBuf>,

    /// Regular expression searched (case-insensitively) in each file name.
    pattern: Option<String>,

    /// If set, only directories whose path contains one of these are searched.
    #[serde(default)]
    include_dirs: Vec<String>,

    /// Directories whose path contains any of these are skipped.
    #[serde(default)]
    exclude_dirs: Vec<String>,

    /// The channel count samples are converted to (1 = mono, 2 = stereo).
    channels: Option<u16>,

    /// Overrides the global per-file size ceiling for this category.
    max_file_size_kb: Option<u64>,
}

impl Category {
    /// Gets the category name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the channel count samples in this category are converted to.
    pub fn channels(&self) -> u16 {
        self.channels.unwrap_or(DEFAULT_CHANNELS)
    }

    /// Resolves this configuration into a definition the pool builder can use.
    pub fn to_definition(&self, limits: &Limits) -> CategoryDefinition {
        let max_file_size = self
            .max_file_size_kb
            .map(|kb| kb * 1024)
            .unwrap_or_else(|| limits.max_file_size());

        CategoryDefinition::new(
            self.name.clone(),
            self.source_dirs.clone(),
            self.pattern.clone(),
            self.include_dirs.clone(),
            self.exclude_dirs.clone(),
            self.channels(),
            max_file_size,
        )
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        match self.channels() {
            1 | 2 => Ok(()),
            channels => Err(ConfigError::UnsupportedChannels(
                self.name.clone(),
                channels,
            )),
        }
    }
}

#[cfg(test)]
impl Category {
    /// Creates a new category configuration (test only).
    pub fn new(name: &str, source_dirs: Vec<PathBuf>, channels: u16) -> Category {
        Category {
            name: name.to_string(),
            source_dirs,
            pattern: None,
            include_dirs: Vec::new(),
            exclude_dirs: Vec::new(),
            channels: Some(channels),
            max_file_size_kb: None,
        }
    }

    /// Sets the filename pattern (test only).
    pub fn with_pattern(mut self, pattern: &str) -> Category {
        self.pattern = Some(pattern.to_string());
        self
    }

    /// Sets the include and exclude filters (test only).
    pub fn with_filters(mut self, include_dirs: &[&str], exclude_dirs: &[&str]) -> Category {
        self.include_dirs = include_dirs.iter().map(|s| s.to_string()).collect();
        self.exclude_dirs = exclude_dirs.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Sets the per-category size ceiling (test only).
    pub fn with_max_file_size_kb(mut self, max_file_size_kb: u64) -> Category {
        self.max_file_size_kb = Some(max_file_size_kb);
        self
    }
}
