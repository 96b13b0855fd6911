//! Key estimation by profile correlation
//!
//! The mean pitch class profile of the whole signal is correlated against
//! rotated Krumhansl-Kessler major and minor profiles; the best of the 24
//! candidates wins.

use crate::chroma::Chromagram;
use crate::error::AnalysisError;
use crate::types::KeyAnalysis;

/// Krumhansl-Kessler major profile, index 0 = tonic
const MAJOR_PROFILE: [f32; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];

/// Krumhansl-Kessler minor profile, index 0 = tonic
const MINOR_PROFILE: [f32; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

/// Pitch class names, index 0 = A (matches the chromagram layout)
pub(crate) const PITCH_NAMES: [&str; 12] = [
    "A", "Bb", "B", "C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab",
];

/// Whole-track key detector
pub struct KeyDetector {
    chromagram: Chromagram,
}

impl KeyDetector {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            chromagram: Chromagram::new(sample_rate, 4096, 2048),
        }
    }

    pub fn detect(&self, samples: &[f32]) -> Result<KeyAnalysis, AnalysisError> {
        let frames = self.chromagram.compute(samples);
        if frames.is_empty() {
            return Err(AnalysisError::TooShort {
                seconds: samples.len() as f32 / crate::ANALYSIS_SAMPLE_RATE as f32,
            });
        }

        let profile = frames.mean();
        if profile.iter().all(|v| *v == 0.0) {
            return Err(AnalysisError::Extraction("no tonal content".into()));
        }

        let (root, minor, correlation) = match_profile(&profile);
        Ok(KeyAnalysis {
            key: PITCH_NAMES[root].to_string(),
            scale: if minor { "minor" } else { "major" }.to_string(),
            // Pearson correlation mapped from [-1, 1] to [0, 1]
            strength: ((correlation + 1.0) / 2.0).clamp(0.0, 1.0),
        })
    }
}

/// Best (root, is_minor, correlation) over all 24 keys
fn match_profile(chroma: &[f32; 12]) -> (usize, bool, f32) {
    let mut best = (0, false, f32::MIN);
    for root in 0..12 {
        let rotated = rotate(chroma, root);
        let major = correlate(&rotated, &MAJOR_PROFILE);
        if major > best.2 {
            best = (root, false, major);
        }
        let minor = correlate(&rotated, &MINOR_PROFILE);
        if minor > best.2 {
            best = (root, true, minor);
        }
    }
    best
}

pub(crate) fn rotate(chroma: &[f32; 12], root: usize) -> [f32; 12] {
    let mut rotated = [0.0f32; 12];
    for (i, slot) in rotated.iter_mut().enumerate() {
        *slot = chroma[(i + root) % 12];
    }
    rotated
}

/// Pearson correlation of two profiles
pub(crate) fn correlate(a: &[f32; 12], b: &[f32; 12]) -> f32 {
    let mean_a = a.iter().sum::<f32>() / 12.0;
    let mean_b = b.iter().sum::<f32>() / 12.0;

    let (mut num, mut den_a, mut den_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        let (da, db) = (x - mean_a, y - mean_b);
        num += da * db;
        den_a += da * da;
        den_b += db * db;
    }

    let den = (den_a * den_b).sqrt();
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chroma::sine_mix;

    #[test]
    fn test_rotate() {
        let chroma = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0];
        assert_eq!(rotate(&chroma, 0), chroma);
        let rotated = rotate(&chroma, 3);
        assert_eq!(rotated[0], 4.0);
        assert_eq!(rotated[9], 1.0);
    }

    #[test]
    fn test_profile_matches_itself() {
        let mut chroma = [0.0f32; 12];
        // D major profile: tonic at pitch class 5 (A-based)
        for (i, v) in MAJOR_PROFILE.iter().enumerate() {
            chroma[(i + 5) % 12] = *v;
        }
        let (root, minor, corr) = match_profile(&chroma);
        assert_eq!(PITCH_NAMES[root], "D");
        assert!(!minor);
        assert!((corr - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_c_major_triad() {
        let detector = KeyDetector::new(44100);
        let samples = sine_mix(&[261.63, 329.63, 392.0], 3.0, 44100);
        let key = detector.detect(&samples).unwrap();
        // A pure triad is ambiguous between C major and its relatives
        assert!(
            ["C", "A", "G", "F", "E"].contains(&key.key.as_str()),
            "got {} {}",
            key.key,
            key.scale
        );
        assert!(key.strength > 0.5);
    }

    #[test]
    fn test_silence_is_error() {
        let detector = KeyDetector::new(44100);
        assert!(detector.detect(&vec![0.0; 44100 * 2]).is_err());
    }
}
