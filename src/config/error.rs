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

/// Typed error for config load/parse failures so callers can distinguish
/// a malformed file from a file that parsed but describes an impossible factory.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config load/parse error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Duplicate category name: {0}")]
    DuplicateCategory(String),

    #[error("Category {0} has unsupported channel count {1} (expected 1 or 2)")]
    UnsupportedChannels(String, u16),

    #[error("Unsupported bits per sample {0} (expected 16 or 24)")]
    UnsupportedBitDepth(u16),

    #[error("Limit {0} must be greater than zero")]
    ZeroLimit(&'static str),
}
