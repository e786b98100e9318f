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
use serde::Deserialize;

use super::error::ConfigError;

/// Polyend Play limits: 20 folders, 255 files, 400KB per file.
pub const DEFAULT_MAX_FOLDERS: usize = 20;
pub const DEFAULT_MAX_FILES: usize = 255;
pub const DEFAULT_MAX_FILE_SIZE_KB: u64 = 400;

/// The structural limits of the target device.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Limits {
    /// Maximum number of category folders in a pack.
    max_folders: Option<usize>,

    /// Maximum number of files in a pack.
    max_files: Option<usize>,

    /// Maximum size of a single source file in kilobytes.
    max_file_size_kb: Option<u64>,
}

impl Limits {
    /// Returns the maximum number of folders per pack.
    pub fn max_folders(&self) -> usize {
        self.max_folders.unwrap_or(DEFAULT_MAX_FOLDERS)
    }

    /// Returns the maximum number of files per pack.
    pub fn max_files(&self) -> usize {
        self.max_files.unwrap_or(DEFAULT_MAX_FILES)
    }

    /// Returns the default per-file size ceiling in bytes.
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size_kb.unwrap_or(DEFAULT_MAX_FILE_SIZE_KB) * 1024
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.max_folders() == 0 {
            return Err(ConfigError::ZeroLimit("max_folders"));
        }
        if self.max_files() == 0 {
            return Err(ConfigError::ZeroLimit("max_files"));
        }
        Ok(())
    }
}

#[cfg(test)]
impl Limits {
    /// Creates a new set of limits (test only).
    pub fn new(max_folders: usize, max_files: usize, max_file_size_kb: u64) -> Limits {
        Limits {
            max_folders: Some(max_folders),
            max_files: Some(max_files),
            max_file_size_kb: Some(max_file_size_kb),
        }
    }
}
