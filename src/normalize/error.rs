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
/// Error types for normalization.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("Could not decode audio file {0}: {1}")]
    Decode(String, String),

    #[error("Resampling failed: {0}Hz -> {1}Hz")]
    Resample(u32, u32),

    #[error("Unable to write {0}: {1}")]
    Write(String, hound::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NormalizeError {
    /// Whether the source file could not be decoded at all.
    pub fn is_decode(&self) -> bool {
        matches!(self, NormalizeError::Decode(..))
    }
}
