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

const DEFAULT_SAMPLE_RATE: u32 = 44100;
const DEFAULT_BITS_PER_SAMPLE: u16 = 16;
const DEFAULT_SILENCE_THRESHOLD_DB: f32 = -48.0;
const DEFAULT_MIN_SILENCE_MS: u32 = 250;

/// A YAML representation of the audio normalization settings. Every sample copied into a pack
/// is rewritten to this format.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Audio {
    /// Target sample rate in Hz (default: 44100)
    sample_rate: Option<u32>,

    /// Target bits per sample (default: 16)
    bits_per_sample: Option<u16>,

    /// Level in dBFS below which trailing audio counts as silence (default: -48.0)
    silence_threshold_db: Option<f32>,

    /// Trailing silence shorter than this is left alone (default: 250)
    min_silence_ms: Option<u32>,
}

impl Audio {
    /// Returns the target sample rate (default: 44100)
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    /// Returns the target bits per sample (default: 16)
    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample.unwrap_or(DEFAULT_BITS_PER_SAMPLE)
    }

    /// Returns the silence threshold in dBFS.
    pub fn silence_threshold_db(&self) -> f32 {
        self.silence_threshold_db
            .unwrap_or(DEFAULT_SILENCE_THRESHOLD_DB)
    }

    /// Returns the minimum length of trailing silence worth trimming.
    pub fn min_silence_ms(&self) -> u32 {
        self.min_silence_ms.unwrap_or(DEFAULT_MIN_SILENCE_MS)
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        match self.bits_per_sample() {
            16 | 24 => {}
            bits => return Err(ConfigError::UnsupportedBitDepth(bits)),
        }
        if self.sample_rate() == 0 {
            return Err(ConfigError::ZeroLimit("sample_rate"));
        }
        Ok(())
    }
}

#[cfg(test)]
impl Audio {
    /// Creates an audio configuration (test only).
    pub fn new(sample_rate: u32, bits_per_sample: u16) -> Audio {
        Audio {
            sample_rate: Some(sample_rate),
            bits_per_sample: Some(bits_per_sample),
            silence_threshold_db: None,
            min_silence_ms: None,
        }
    }
}
