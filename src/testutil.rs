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
use std::error::Error;
use std::f32::consts::PI;
use std::fs;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

/// Generate a sine wave.
pub fn sine(frequency: f32, amplitude: f32, sample_rate: u32, duration_seconds: f32) -> Vec<f32> {
    let sample_count = (sample_rate as f32 * duration_seconds) as usize;
    (0..sample_count)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            amplitude * (2.0 * PI * frequency * t).sin()
        })
        .collect()
}

/// Calculate RMS (Root Mean Square) of a signal
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|&x| x * x).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Writes planar samples to an integer PCM wav file.
pub fn write_wav(
    path: &Path,
    planes: &[Vec<f32>],
    sample_rate: u32,
    bits_per_sample: u16,
) -> Result<(), Box<dyn Error>> {
    let mut writer = WavWriter::create(
        path,
        WavSpec {
            channels: planes.len() as u16,
            sample_rate,
            bits_per_sample,
            sample_format: SampleFormat::Int,
        },
    )?;

    let max = ((1i64 << (bits_per_sample - 1)) - 1) as f32;
    let frames = planes.first().map(|plane| plane.len()).unwrap_or(0);
    for frame in 0..frames {
        for plane in planes {
            writer.write_sample((plane[frame] * max).round() as i32)?;
        }
    }
    writer.finalize()?;

    Ok(())
}

/// Reads an integer PCM wav file back as interleaved samples.
pub fn read_wav(path: &Path) -> Result<(WavSpec, Vec<i32>), Box<dyn Error>> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    let samples = reader.samples::<i32>().collect::<Result<Vec<_>, _>>()?;
    Ok((spec, samples))
}

/// Writes a short mono wav file, creating parent directories as needed.
pub fn write_sample(path: &Path, frames: usize) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    write_wav(path, &[vec![0.5; frames]], 44100, 16)
}
