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

//! Audio normalization: rewrites a sample in place so the device can load it.
//!
//! The pipeline is decode, trim trailing silence, remix to the category's channel count,
//! resample to the target rate, then write integer PCM at the target bit depth.

mod decode;
mod error;
mod resample;
mod silence;

use std::fs;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::debug;

use crate::config;
use crate::util::filename_display;

pub use error::NormalizeError;

/// Rewrites an audio file in place.
pub trait Normalizer: Send + Sync {
    /// Normalizes the file at `path` to the given channel count.
    fn normalize(&self, path: &Path, channels: u16) -> Result<(), NormalizeError>;
}

/// Normalizes files to WAV at a fixed sample rate and bit depth.
pub struct WavNormalizer {
    sample_rate: u32,
    bits_per_sample: u16,
    silence_threshold_db: f32,
    min_silence_ms: u32,
}

impl WavNormalizer {
    /// Creates a normalizer from the audio configuration.
    pub fn new(config: &config::Audio) -> WavNormalizer {
        WavNormalizer {
            sample_rate: config.sample_rate(),
            bits_per_sample: config.bits_per_sample(),
            silence_threshold_db: config.silence_threshold_db(),
            min_silence_ms: config.min_silence_ms(),
        }
    }

    fn write(&self, path: &Path, planes: &[Vec<f32>]) -> Result<(), NormalizeError> {
        let spec = WavSpec {
            channels: planes.len() as u16,
            sample_rate: self.sample_rate,
            bits_per_sample: self.bits_per_sample,
            sample_format: SampleFormat::Int,
        };
        let write_error = |e: hound::Error| NormalizeError::Write(path.display().to_string(), e);

        let max = ((1i64 << (self.bits_per_sample - 1)) - 1) as f32;
        let mut writer = WavWriter::create(path, spec).map_err(write_error)?;
        let frames = planes.first().map(|plane| plane.len()).unwrap_or(0);
        for frame in 0..frames {
            for plane in planes {
                let sample = (plane[frame].clamp(-1.0, 1.0) * max).round() as i32;
                writer.write_sample(sample).map_err(write_error)?;
            }
        }
        writer.finalize().map_err(write_error)
    }
}

impl Normalizer for WavNormalizer {
    fn normalize(&self, path: &Path, channels: u16) -> Result<(), NormalizeError> {
        let decoded = decode::decode(path)?;
        let source_rate = decoded.sample_rate;
        let source_channels = decoded.planes.len();
        let source_frames = decoded.frames();

        let mut planes = decoded.planes;
        let trimmed = silence::trim_trailing_silence(
            &mut planes,
            source_rate,
            self.silence_threshold_db,
            self.min_silence_ms,
        );
        let planes = remix(planes, channels);
        let planes = resample::resample(&planes, source_rate, self.sample_rate)?;

        // Write next to the original and swap it in, so a failed write never leaves a torn file.
        let temp = temp_path(path);
        if let Err(e) = self.write(&temp, &planes) {
            let _ = fs::remove_file(&temp);
            return Err(e);
        }
        fs::rename(&temp, path)?;

        debug!(
            file = filename_display(path),
            source_rate,
            source_channels,
            source_frames,
            trimmed,
            channels,
            frames = planes.first().map(|plane| plane.len()).unwrap_or(0),
            "Normalized sample"
        );
        Ok(())
    }
}

/// Remixes planar audio to the given channel count. Mono is the average of all channels, stereo
/// from mono duplicates the channel, and wider sources keep their first channels.
fn remix(planes: Vec<Vec<f32>>, channels: u16) -> Vec<Vec<f32>> {
    let target = usize::from(channels.max(1));
    if planes.len() == target {
        return planes;
    }

    if target == 1 {
        let count = planes.len() as f32;
        let frames = planes.first().map(|plane| plane.len()).unwrap_or(0);
        let mono = (0..frames)
            .map(|frame| planes.iter().map(|plane| plane[frame]).sum::<f32>() / count)
            .collect();
        return vec![mono];
    }

    if planes.len() == 1 {
        return vec![planes[0].clone(); target];
    }

    let mut planes = planes;
    if planes.len() > target {
        planes.truncate(target);
    } else {
        let last = planes[planes.len() - 1].clone();
        planes.resize(target, last);
    }
    planes
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.normalizing", name))
}
