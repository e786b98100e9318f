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

/// Converts a dBFS level to a linear amplitude.
fn db_to_amplitude(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Removes trailing silence from planar audio and returns the number of frames removed.
///
/// A frame is silent when every channel is below `threshold_db`. The trailing silent run is
/// only cut when it lasts at least `min_silence_ms`. A file that is silent from start to end is
/// left alone.
pub(super) fn trim_trailing_silence(
    planes: &mut [Vec<f32>],
    sample_rate: u32,
    threshold_db: f32,
    min_silence_ms: u32,
) -> usize {
    let frames = planes.first().map(|plane| plane.len()).unwrap_or(0);
    let threshold = db_to_amplitude(threshold_db);
    let is_silent = |frame: usize| planes.iter().all(|plane| plane[frame].abs() < threshold);

    let mut end = frames;
    while end > 0 && is_silent(end - 1) {
        end -= 1;
    }

    let silent = frames - end;
    let min_frames = (sample_rate as u64 * min_silence_ms as u64 / 1000) as usize;
    if end == 0 || silent == 0 || silent < min_frames {
        return 0;
    }

    for plane in planes.iter_mut() {
        plane.truncate(end);
    }
    silent
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_long_tail() {
        let mut planes = vec![[vec![0.5; 1000], vec![0.0; 500]].concat()];
        let removed = trim_trailing_silence(&mut planes, 1000, -48.0, 250);
        assert_eq!(removed, 500);
        assert_eq!(planes[0].len(), 1000);
    }

    #[test]
    fn test_keeps_short_tail() {
        let mut planes = vec![[vec![0.5; 1000], vec![0.0; 200]].concat()];
        assert_eq!(trim_trailing_silence(&mut planes, 1000, -48.0, 250), 0);
        assert_eq!(planes[0].len(), 1200);
    }

    #[test]
    fn test_any_loud_channel_is_not_silence() {
        let mut planes = vec![
            [vec![0.5; 100], vec![0.0; 900]].concat(),
            vec![0.5; 1000],
        ];
        assert_eq!(trim_trailing_silence(&mut planes, 1000, -48.0, 250), 0);
    }

    #[test]
    fn test_quiet_noise_counts_as_silence() {
        // -60 dBFS is under the -48 dBFS threshold.
        let quiet = db_to_amplitude(-60.0);
        let mut planes = vec![[vec![0.5; 1000], vec![quiet; 1000]].concat()];
        assert_eq!(trim_trailing_silence(&mut planes, 1000, -48.0, 250), 1000);
    }

    #[test]
    fn test_all_silent_is_untouched() {
        let mut planes = vec![vec![0.0; 1000]];
        assert_eq!(trim_trailing_silence(&mut planes, 1000, -48.0, 250), 0);
        assert_eq!(planes[0].len(), 1000);

        let mut empty: Vec<Vec<f32>> = vec![Vec::new()];
        assert_eq!(trim_trailing_silence(&mut empty, 1000, -48.0, 250), 0);
    }
}
