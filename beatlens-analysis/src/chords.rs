//! Chord detection from pitch class profiles
//!
//! Each analysed segment is correlated against 24 triad templates (12 major,
//! 12 minor). Free-running mode emits one chord per hop using a sliding
//! window of profiles; beat-synchronized mode emits exactly one chord per
//! beat tick.

use crate::chroma::{ChromaFrames, Chromagram};
use crate::error::AnalysisError;
use crate::key::{correlate, PITCH_NAMES};
use crate::types::{ChordAnalysis, ChordParams, ChromaPick};

/// Triad templates, index 0 = root
const MAJOR_TRIAD: [f32; 12] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0];
const MINOR_TRIAD: [f32; 12] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0];

pub struct ChordDetector {
    sample_rate: u32,
    params: ChordParams,
    chromagram: Chromagram,
}

impl ChordDetector {
    pub fn new(sample_rate: u32, params: ChordParams) -> Self {
        Self {
            sample_rate,
            params,
            chromagram: Chromagram::new(sample_rate, params.frame_size, params.hop_size),
        }
    }

    /// Detect chords; `ticks` switches to beat-synchronized mode
    pub fn detect(
        &self,
        samples: &[f32],
        ticks: Option<&[f32]>,
    ) -> Result<ChordAnalysis, AnalysisError> {
        let frames = self.chromagram.compute(samples);
        if frames.is_empty() {
            return Err(AnalysisError::TooShort {
                seconds: samples.len() as f32 / self.sample_rate as f32,
            });
        }

        let analysis = match ticks {
            Some(ticks) if !ticks.is_empty() => self.detect_beats(&frames, ticks),
            _ => self.detect_windowed(&frames),
        };
        Ok(analysis)
    }

    fn detect_windowed(&self, frames: &ChromaFrames) -> ChordAnalysis {
        let hop_seconds = self.params.hop_size.max(1) as f32 / self.sample_rate as f32;
        let half = ((self.params.window_size / hop_seconds) / 2.0).round() as usize;

        let (chords, strengths) = (0..frames.len())
            .map(|i| {
                let lo = i.saturating_sub(half);
                let hi = (i + half + 1).min(frames.len());
                best_triad(&mean_profile(&frames.frames[lo..hi]))
            })
            .unzip();

        ChordAnalysis {
            chords,
            strengths,
            delay: hop_seconds,
            beat_synced: false,
        }
    }

    fn detect_beats(&self, frames: &ChromaFrames, ticks: &[f32]) -> ChordAnalysis {
        let (chords, strengths) = ticks
            .iter()
            .enumerate()
            .map(|(k, &tick)| {
                let start = frames.frame_at(tick);
                let end = ticks
                    .get(k + 1)
                    .map(|next| frames.frame_at(*next))
                    .unwrap_or(frames.len())
                    .max(start + 1)
                    .min(frames.len());

                let profile = match self.params.chroma_pick {
                    ChromaPick::StartingBeat => frames.frames[start],
                    ChromaPick::InterbeatMedian => median_profile(&frames.frames[start..end]),
                };
                best_triad(&profile)
            })
            .unzip();

        ChordAnalysis {
            chords,
            strengths,
            delay: 0.0,
            beat_synced: true,
        }
    }
}

fn mean_profile(frames: &[[f32; 12]]) -> [f32; 12] {
    let mut acc = [0.0f32; 12];
    for frame in frames {
        for (a, v) in acc.iter_mut().zip(frame) {
            *a += v;
        }
    }
    if !frames.is_empty() {
        for a in &mut acc {
            *a /= frames.len() as f32;
        }
    }
    acc
}

fn median_profile(frames: &[[f32; 12]]) -> [f32; 12] {
    let mut out = [0.0f32; 12];
    if frames.is_empty() {
        return out;
    }
    let mut column = Vec::with_capacity(frames.len());
    for (bin, slot) in out.iter_mut().enumerate() {
        column.clear();
        column.extend(frames.iter().map(|f| f[bin]));
        column.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        *slot = column[column.len() / 2];
    }
    out
}

/// Label and correlation of the best matching triad
fn best_triad(profile: &[f32; 12]) -> (String, f32) {
    let mut best = (0usize, false, f32::MIN);
    for root in 0..12 {
        let rotated = crate::key::rotate(profile, root);
        let major = correlate(&rotated, &MAJOR_TRIAD);
        if major > best.2 {
            best = (root, false, major);
        }
        let minor = correlate(&rotated, &MINOR_TRIAD);
        if minor > best.2 {
            best = (root, true, minor);
        }
    }

    let (root, minor, strength) = best;
    let label = if minor {
        format!("{}m", PITCH_NAMES[root])
    } else {
        PITCH_NAMES[root].to_string()
    };
    (label, strength.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chroma::sine_mix;

    fn params() -> ChordParams {
        ChordParams {
            frame_size: 4096,
            hop_size: 2048,
            ..Default::default()
        }
    }

    #[test]
    fn test_best_triad_labels() {
        let mut a_minor = [0.0f32; 12];
        a_minor[0] = 1.0; // A
        a_minor[3] = 1.0; // C
        a_minor[7] = 1.0; // E
        let (label, strength) = best_triad(&a_minor);
        assert_eq!(label, "Am");
        assert!((strength - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_median_profile() {
        let frames = [[1.0; 12], [3.0; 12], [2.0; 12]];
        assert_eq!(median_profile(&frames), [2.0; 12]);
        assert_eq!(median_profile(&[]), [0.0; 12]);
    }

    #[test]
    fn test_free_running_delay_and_length() {
        let detector = ChordDetector::new(44100, params());
        let samples = sine_mix(&[261.63, 329.63, 392.0], 2.0, 44100);
        let chords = detector.detect(&samples, None).unwrap();

        assert!(!chords.beat_synced);
        assert!((chords.delay - 2048.0 / 44100.0).abs() < 1e-6);
        assert_eq!(chords.chords.len(), chords.strengths.len());
        assert!(chords.chords.iter().filter(|c| c.as_str() == "C").count() > chords.chords.len() / 2);
    }

    #[test]
    fn test_beat_synced_one_chord_per_tick() {
        let samples = sine_mix(&[220.0, 261.63, 329.63], 3.0, 44100);
        let ticks = [0.0, 0.5, 1.0, 1.5, 2.0, 2.9];

        for pick in ChromaPick::ALL {
            let detector = ChordDetector::new(
                44100,
                ChordParams {
                    chroma_pick: pick,
                    ..params()
                },
            );
            let chords = detector.detect(&samples, Some(&ticks)).unwrap();
            assert!(chords.beat_synced);
            assert_eq!(chords.chords.len(), ticks.len());
            assert_eq!(chords.delay, 0.0);
        }
    }

    #[test]
    fn test_empty_ticks_fall_back_to_free_running() {
        let detector = ChordDetector::new(44100, params());
        let samples = sine_mix(&[440.0], 1.0, 44100);
        let chords = detector.detect(&samples, Some(&[])).unwrap();
        assert!(!chords.beat_synced);
    }
}
