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
use std::fs::File;
use std::path::Path;

use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use symphonia::default::{get_codecs, get_probe};
use tracing::debug;

use super::error::NormalizeError;

/// A fully decoded file, one plane of samples per channel.
pub(super) struct Decoded {
    pub sample_rate: u32,
    pub planes: Vec<Vec<f32>>,
}

impl Decoded {
    pub fn frames(&self) -> usize {
        self.planes.first().map(|plane| plane.len()).unwrap_or(0)
    }
}

/// Decodes the whole file into memory. One-shots are small, so there is no streaming here.
pub(super) fn decode(path: &Path) -> Result<Decoded, NormalizeError> {
    let file_path = path.display().to_string();
    let decode_error = |e: SymphoniaError| NormalizeError::Decode(file_path.clone(), e.to_string());

    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let probed = get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(decode_error)?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| NormalizeError::Decode(file_path.clone(), "No audio track found".into()))?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    let sample_rate = params.sample_rate.ok_or_else(|| {
        NormalizeError::Decode(file_path.clone(), "Sample rate not specified".into())
    })?;

    let mut decoder = get_codecs()
        .make(&params, &DecoderOptions::default())
        .map_err(decode_error)?;

    let mut planes: Vec<Vec<f32>> = Vec::new();
    while let Some(packet) = next_packet(format_reader.as_mut(), decoder.as_mut())
        .map_err(decode_error)?
    {
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                decoder.decode(&packet).map_err(decode_error)?
            }
            // A corrupt packet is skipped, the rest of the file may still be usable.
            Err(SymphoniaError::DecodeError(e)) => {
                debug!(file = %file_path, err = %e, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(decode_error(e)),
        };
        append_planes(decoded, &mut planes);
    }

    if planes.iter().all(|plane| plane.is_empty()) {
        return Err(NormalizeError::Decode(file_path, "No audio frames found".into()));
    }

    Ok(Decoded { sample_rate, planes })
}

/// Reads the next packet. `Ok(None)` means the end of the stream.
fn next_packet(
    format_reader: &mut dyn FormatReader,
    decoder: &mut dyn Decoder,
) -> Result<Option<Packet>, SymphoniaError> {
    loop {
        match format_reader.next_packet() {
            Ok(packet) => return Ok(Some(packet)),
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Ok(None)
            }
            // Some demuxers report a decode error at the end of the stream.
            Err(SymphoniaError::DecodeError(_)) => return Ok(None),
            Err(e) => return Err(e),
        }
    }
}

fn append_planes(decoded: AudioBufferRef, planes: &mut Vec<Vec<f32>>) {
    match decoded {
        AudioBufferRef::F32(buf) => append_converted(&buf, planes, |sample| sample),
        AudioBufferRef::F64(buf) => append_converted(&buf, planes, |sample| sample as f32),
        AudioBufferRef::S8(buf) => append_converted(&buf, planes, scale_s8),
        AudioBufferRef::S16(buf) => append_converted(&buf, planes, scale_s16),
        AudioBufferRef::S24(buf) => {
            append_converted(&buf, planes, |sample| scale_s24(sample.inner()))
        }
        AudioBufferRef::S32(buf) => append_converted(&buf, planes, scale_s32),
        AudioBufferRef::U8(buf) => append_converted(&buf, planes, scale_u8),
        AudioBufferRef::U16(buf) => append_converted(&buf, planes, scale_u16),
        AudioBufferRef::U24(buf) => {
            append_converted(&buf, planes, |sample| scale_u24(sample.inner()))
        }
        AudioBufferRef::U32(buf) => append_converted(&buf, planes, scale_u32),
    }
}

fn append_converted<T, F>(buf: &AudioBuffer<T>, planes: &mut Vec<Vec<f32>>, convert: F)
where
    T: Sample,
    F: Fn(T) -> f32,
{
    let channels = buf.spec().channels.count();
    if planes.len() < channels {
        let frames = planes.first().map(|plane| plane.len()).unwrap_or(0);
        planes.resize(channels, vec![0.0; frames]);
    }

    for (plane, samples) in planes.iter_mut().zip(buf.planes().planes()) {
        plane.extend(samples.iter().map(|sample| convert(*sample)));
    }
}

#[inline]
fn scale_s8(sample: i8) -> f32 {
    sample as f32 / (1i64 << 7) as f32
}

#[inline]
fn scale_s16(sample: i16) -> f32 {
    sample as f32 / (1i64 << 15) as f32
}

#[inline]
fn scale_s24(sample: i32) -> f32 {
    sample as f32 / (1i64 << 23) as f32
}

#[inline]
fn scale_s32(sample: i32) -> f32 {
    sample as f32 / (1i64 << 31) as f32
}

#[inline]
fn scale_u8(sample: u8) -> f32 {
    (sample as f32 / u8::MAX as f32) * 2.0 - 1.0
}

#[inline]
fn scale_u16(sample: u16) -> f32 {
    (sample as f32 / u16::MAX as f32) * 2.0 - 1.0
}

#[inline]
fn scale_u24(sample: u32) -> f32 {
    let max = (1u32 << 24) - 1;
    (sample as f32 / max as f32) * 2.0 - 1.0
}

#[inline]
fn scale_u32(sample: u32) -> f32 {
    (sample as f32 / u32::MAX as f32) * 2.0 - 1.0
}
