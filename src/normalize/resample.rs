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
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use super::error::NormalizeError;

/// Input block size for the sinc resampler.
const INPUT_BLOCK_SIZE: usize = 1024;

/// Resamples planar audio from one rate to another.
///
/// The resampler's output delay is removed, so the result starts at the same point in time as
/// the input and is `ceil(frames * to / from)` frames long.
pub(super) fn resample(
    planes: &[Vec<f32>],
    from: u32,
    to: u32,
) -> Result<Vec<Vec<f32>>, NormalizeError> {
    let frames = planes.first().map(|plane| plane.len()).unwrap_or(0);
    if from == to || frames == 0 {
        return Ok(planes.to_vec());
    }

    let sinc_params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        oversampling_factor: 128,
        interpolation: SincInterpolationType::Linear,
        window: WindowFunction::BlackmanHarris2,
    };
    let ratio = to as f64 / from as f64;
    let mut resampler =
        SincFixedIn::<f32>::new(ratio, 1.0, sinc_params, INPUT_BLOCK_SIZE, planes.len())
            .map_err(|_e| NormalizeError::Resample(from, to))?;

    let delay = resampler.output_delay();
    let expected = (frames as u64 * to as u64).div_ceil(from as u64) as usize;
    let mut scratch = resampler.output_buffer_allocate(true);
    let mut output = vec![Vec::with_capacity(delay + expected); planes.len()];

    let mut position = 0;
    while frames - position >= resampler.input_frames_next() {
        let needed = resampler.input_frames_next();
        let block: Vec<&[f32]> = planes
            .iter()
            .map(|plane| &plane[position..position + needed])
            .collect();
        let (consumed, produced) = resampler
            .process_into_buffer(&block, &mut scratch, None)
            .map_err(|_e| NormalizeError::Resample(from, to))?;
        push_frames(&mut output, &scratch, produced);
        position += consumed;
    }

    if position < frames {
        let block: Vec<&[f32]> = planes.iter().map(|plane| &plane[position..]).collect();
        let (_, produced) = resampler
            .process_partial_into_buffer(Some(block.as_slice()), &mut scratch, None)
            .map_err(|_e| NormalizeError::Resample(from, to))?;
        push_frames(&mut output, &scratch, produced);
    }

    // Flush the tail still held back by the filter delay.
    while output[0].len() < delay + expected {
        let (_, produced) = resampler
            .process_partial_into_buffer(None::<&[Vec<f32>]>, &mut scratch, None)
            .map_err(|_e| NormalizeError::Resample(from, to))?;
        if produced == 0 {
            break;
        }
        push_frames(&mut output, &scratch, produced);
    }

    Ok(output
        .into_iter()
        .map(|channel| channel.into_iter().skip(delay).take(expected).collect())
        .collect())
}

fn push_frames(output: &mut [Vec<f32>], scratch: &[Vec<f32>], frames: usize) {
    for (out, produced) in output.iter_mut().zip(scratch) {
        out.extend_from_slice(&produced[..frames.min(produced.len())]);
    }
}
