//! Framewise pitch class profiles
//!
//! Folds the magnitude spectrum of overlapping, Blackman-Harris windowed
//! frames into 12 pitch classes (index 0 = A). Both the key detector and the
//! chord detector are built on these frames.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// Reference frequency for A4
const A4_FREQ: f32 = 440.0;

/// Lowest and highest frequencies folded into the profile
const MIN_FREQ: f32 = 40.0;
const MAX_FREQ: f32 = 5000.0;

/// Sequence of per-frame pitch class profiles
#[derive(Debug, Clone, Default)]
pub struct ChromaFrames {
    pub frames: Vec<[f32; 12]>,
    pub hop_size: usize,
    pub sample_rate: u32,
}

impl ChromaFrames {
    /// Start time of a frame in seconds
    pub fn frame_time(&self, index: usize) -> f32 {
        (index * self.hop_size) as f32 / self.sample_rate as f32
    }

    /// Frame whose start is closest to (but not after) `seconds`
    pub fn frame_at(&self, seconds: f32) -> usize {
        if self.frames.is_empty() || seconds <= 0.0 {
            return 0;
        }
        let idx = (seconds * self.sample_rate as f32 / self.hop_size as f32) as usize;
        idx.min(self.frames.len() - 1)
    }

    /// Average profile over all frames, normalized to unit sum
    pub fn mean(&self) -> [f32; 12] {
        let mut acc = [0.0f32; 12];
        for frame in &self.frames {
            for (a, v) in acc.iter_mut().zip(frame) {
                *a += v;
            }
        }
        let sum: f32 = acc.iter().sum();
        if sum > 0.0 {
            for v in &mut acc {
                *v /= sum;
            }
        }
        acc
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// STFT based chromagram extractor
pub struct Chromagram {
    sample_rate: u32,
    frame_size: usize,
    hop_size: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    /// Pitch class and weight per FFT bin, `None` outside the musical range
    bins: Vec<Option<(u8, f32)>>,
}

impl Chromagram {
    pub fn new(sample_rate: u32, frame_size: usize, hop_size: usize) -> Self {
        let frame_size = frame_size.max(256);
        let hop_size = hop_size.max(1);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(frame_size);

        Self {
            sample_rate,
            frame_size,
            hop_size,
            fft,
            window: blackman_harris(frame_size),
            bins: Self::pitch_class_mapping(frame_size, sample_rate),
        }
    }

    fn pitch_class_mapping(frame_size: usize, sample_rate: u32) -> Vec<Option<(u8, f32)>> {
        let nyquist = sample_rate as f32 / 2.0;
        (0..frame_size / 2)
            .map(|bin| {
                let freq = bin as f32 * sample_rate as f32 / frame_size as f32;
                if !(MIN_FREQ..=MAX_FREQ).contains(&freq) || freq >= nyquist {
                    return None;
                }
                // Semitones above A, folded into one octave
                let semitones = 12.0 * (freq / A4_FREQ).log2();
                let nearest = semitones.round();
                let pitch_class = ((nearest as i32 % 12 + 12) % 12) as u8;

                // Squared cosine falloff towards the quarter-tone boundary
                let detune = (semitones - nearest).abs();
                let weight = (PI * detune).cos().powi(2);
                Some((pitch_class, weight))
            })
            .collect()
    }

    /// Compute one profile per hop over the whole signal
    pub fn compute(&self, samples: &[f32]) -> ChromaFrames {
        let mut frames = Vec::new();
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.frame_size];

        let mut pos = 0;
        while pos + self.frame_size <= samples.len() {
            let frame = &samples[pos..pos + self.frame_size];
            for ((slot, s), w) in buffer.iter_mut().zip(frame).zip(&self.window) {
                *slot = Complex::new(s * w, 0.0);
            }
            self.fft.process(&mut buffer);
            frames.push(self.fold(&buffer));
            pos += self.hop_size;
        }

        ChromaFrames {
            frames,
            hop_size: self.hop_size,
            sample_rate: self.sample_rate,
        }
    }

    fn fold(&self, spectrum: &[Complex<f32>]) -> [f32; 12] {
        let mut chroma = [0.0f32; 12];
        for (c, mapping) in spectrum.iter().zip(&self.bins) {
            if let Some((pc, weight)) = mapping {
                chroma[*pc as usize] += c.norm_sqr() * weight;
            }
        }

        // Unit max normalization keeps silent frames at zero
        let max = chroma.iter().cloned().fold(0.0f32, f32::max);
        if max > 0.0 {
            for v in &mut chroma {
                *v /= max;
            }
        }
        chroma
    }
}

fn blackman_harris(len: usize) -> Vec<f32> {
    let (a0, a1, a2, a3) = (0.35875f32, 0.48829f32, 0.14128f32, 0.01168f32);
    let n = (len - 1).max(1) as f32;
    (0..len)
        .map(|i| {
            let x = 2.0 * PI * i as f32 / n;
            a0 - a1 * x.cos() + a2 * (2.0 * x).cos() - a3 * (3.0 * x).cos()
        })
        .collect()
}

#[cfg(test)]
pub(crate) fn sine_mix(freqs: &[f32], seconds: f32, sample_rate: u32) -> Vec<f32> {
    let len = (seconds * sample_rate as f32) as usize;
    (0..len)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            freqs.iter().map(|f| (2.0 * PI * f * t).sin()).sum::<f32>() / freqs.len() as f32
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a440_lands_on_pitch_class_zero() {
        let chroma = Chromagram::new(44100, 4096, 2048);
        let frames = chroma.compute(&sine_mix(&[440.0], 1.0, 44100));
        assert!(!frames.is_empty());

        let profile = frames.mean();
        let peak = profile
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 0);
    }

    #[test]
    fn test_frame_count_follows_hop() {
        let chroma = Chromagram::new(44100, 1024, 512);
        let frames = chroma.compute(&vec![0.0; 1024 + 512 * 9]);
        assert_eq!(frames.len(), 10);
        assert!((frames.frame_time(2) - 1024.0 / 44100.0).abs() < 1e-6);
    }

    #[test]
    fn test_silence_stays_zero() {
        let chroma = Chromagram::new(44100, 1024, 512);
        let frames = chroma.compute(&vec![0.0; 4096]);
        assert!(frames.frames.iter().all(|f| f.iter().all(|v| *v == 0.0)));
    }

    #[test]
    fn test_frame_at_clamps() {
        let frames = ChromaFrames {
            frames: vec![[0.0; 12]; 4],
            hop_size: 441,
            sample_rate: 44100,
        };
        assert_eq!(frames.frame_at(0.025), 2);
        assert_eq!(frames.frame_at(10.0), 3);
        assert_eq!(frames.frame_at(-1.0), 0);
    }
}
