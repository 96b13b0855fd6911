//! Tempo estimation and beat tracking
//!
//! Builds an onset detection function from spectral flux (plus an energy
//! flux feature in multifeature mode), estimates the beat period by
//! autocorrelation and then walks the signal placing one tick per period,
//! snapping each tick to the strongest onset near its predicted position.

use crate::error::AnalysisError;
use crate::types::{TempoAnalysis, TempoMethod, TempoParams};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

const MIN_BPM: f32 = 60.0;
const MAX_BPM: f32 = 200.0;

/// Shortest signal a tempo can be estimated from, in seconds
const MIN_SECONDS: f32 = 4.0;

/// Tempo extractor producing a beat grid for a whole signal
pub struct RhythmExtractor {
    sample_rate: u32,
    fft_size: usize,
    hop_size: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
}

impl RhythmExtractor {
    pub fn new(sample_rate: u32) -> Self {
        let fft_size = 2048;
        let hop_size = 512;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        // Hann window
        let window: Vec<f32> = (0..fft_size)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / fft_size as f32).cos()))
            .collect();

        Self {
            sample_rate,
            fft_size,
            hop_size,
            fft,
            window,
        }
    }

    /// Onset function frames per second
    fn frame_rate(&self) -> f32 {
        self.sample_rate as f32 / self.hop_size as f32
    }

    pub fn extract(
        &self,
        samples: &[f32],
        params: &TempoParams,
    ) -> Result<TempoAnalysis, AnalysisError> {
        let seconds = samples.len() as f32 / self.sample_rate as f32;
        if seconds < MIN_SECONDS {
            return Err(AnalysisError::TooShort { seconds });
        }

        let onsets = self.onset_function(samples, params.method);
        let fps = self.frame_rate();

        let candidates = self.period_candidates(&onsets);
        let (best_lag, strength) = candidates
            .first()
            .copied()
            .ok_or_else(|| AnalysisError::Extraction("no periodicity found".into()))?;

        let period = disambiguate_octave(best_lag, fps);
        let ticks = self.track_beats(&onsets, period);
        if ticks.len() < 2 {
            return Err(AnalysisError::Extraction("not enough beats detected".into()));
        }

        let intervals: Vec<f32> = ticks.windows(2).map(|w| w[1] - w[0]).collect();
        let estimates: Vec<f32> = candidates
            .iter()
            .map(|(lag, _)| 60.0 * fps / *lag as f32)
            .collect();

        let bpm = 60.0 * fps / period;
        let confidence = match params.method {
            TempoMethod::MultiFeature => strength.clamp(0.0, 1.0),
            TempoMethod::Degara => 0.0,
        };

        tracing::debug!(
            bpm,
            beats = ticks.len(),
            method = %params.method,
            "tempo extracted"
        );

        Ok(TempoAnalysis {
            bpm: bpm.trunc() as u32,
            confidence,
            ticks,
            intervals,
            estimates,
            method: params.method,
        })
    }

    /// Normalized onset strength per hop
    fn onset_function(&self, samples: &[f32], method: TempoMethod) -> Vec<f32> {
        let bins = self.fft_size / 2;
        let mut spectral = Vec::new();
        let mut energy = Vec::new();
        let mut prev_spectrum = vec![0.0f32; bins];
        let mut prev_energy = 0.0f32;
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.fft_size];

        let mut pos = 0;
        while pos + self.fft_size <= samples.len() {
            let frame = &samples[pos..pos + self.fft_size];
            for ((slot, s), w) in buffer.iter_mut().zip(frame).zip(&self.window) {
                *slot = Complex::new(s * w, 0.0);
            }
            self.fft.process(&mut buffer);

            // Half-wave rectified difference of log magnitudes
            let mut flux = 0.0f32;
            for (c, prev) in buffer[..bins].iter().zip(prev_spectrum.iter_mut()) {
                let mag = (1.0 + 100.0 * c.norm()).ln();
                flux += (mag - *prev).max(0.0);
                *prev = mag;
            }
            spectral.push(flux);

            let e = frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32;
            energy.push((e - prev_energy).max(0.0));
            prev_energy = e;

            pos += self.hop_size;
        }

        normalize(&mut spectral);
        if method == TempoMethod::MultiFeature {
            normalize(&mut energy);
            for (s, e) in spectral.iter_mut().zip(&energy) {
                *s = 0.7 * *s + 0.3 * e;
            }
        }
        spectral
    }

    /// Autocorrelation peaks in the tempo range, strongest first
    fn period_candidates(&self, onsets: &[f32]) -> Vec<(usize, f32)> {
        let fps = self.frame_rate();
        let min_lag = (fps * 60.0 / MAX_BPM).floor() as usize;
        let max_lag = (fps * 60.0 / MIN_BPM).ceil() as usize;
        if onsets.len() < max_lag * 2 {
            return Vec::new();
        }

        let scores: Vec<f32> = (0..=max_lag)
            .map(|lag| {
                if lag < min_lag {
                    0.0
                } else {
                    correlation_at_lag(onsets, lag)
                }
            })
            .collect();

        let mut peaks: Vec<(usize, f32)> = (min_lag.max(1)..max_lag)
            .filter(|&lag| scores[lag] > scores[lag - 1] && scores[lag] >= scores[lag + 1])
            .map(|lag| (lag, scores[lag]))
            .collect();
        peaks.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        peaks.truncate(5);
        peaks
    }

    /// Place ticks one period apart, each snapped to the local onset maximum
    fn track_beats(&self, onsets: &[f32], period: f32) -> Vec<f32> {
        let fps = self.frame_rate();
        let tolerance = (period * 0.1).max(1.0) as usize;

        // Phase: the offset within the first period with the largest comb sum
        let first_period = (period.ceil() as usize).min(onsets.len());
        let phase = (0..first_period)
            .max_by(|&a, &b| {
                comb_sum(onsets, a, period)
                    .partial_cmp(&comb_sum(onsets, b, period))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(0);

        let mut ticks = Vec::new();
        let mut predicted = phase as f32;
        let mut last: Option<usize> = None;
        while (predicted as usize) < onsets.len() {
            let center = predicted.round() as usize;
            let lo = center.saturating_sub(tolerance);
            let hi = (center + tolerance).min(onsets.len() - 1);
            let snapped = (lo..=hi)
                .max_by(|&a, &b| {
                    onsets[a]
                        .partial_cmp(&onsets[b])
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .unwrap_or(center);

            if last.map_or(true, |l| snapped > l) {
                ticks.push(snapped as f32 / fps);
                last = Some(snapped);
                predicted = snapped as f32 + period;
            } else {
                predicted += period;
            }
        }
        ticks
    }
}

fn normalize(values: &mut [f32]) {
    let max = values.iter().cloned().fold(0.0f32, f32::max);
    if max > 0.0 {
        for v in values.iter_mut() {
            *v /= max;
        }
    }
}

fn comb_sum(onsets: &[f32], phase: usize, period: f32) -> f32 {
    let mut sum = 0.0;
    let mut pos = phase as f32;
    while (pos as usize) < onsets.len() {
        sum += onsets[pos as usize];
        pos += period;
    }
    sum
}

fn correlation_at_lag(onsets: &[f32], lag: usize) -> f32 {
    if lag == 0 || lag >= onsets.len() {
        return 0.0;
    }
    let mut correlation = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for i in 0..onsets.len() - lag {
        correlation += onsets[i] * onsets[i + lag];
        norm_a += onsets[i] * onsets[i];
        norm_b += onsets[i + lag] * onsets[i + lag];
    }
    let norm = (norm_a * norm_b).sqrt();
    if norm > 0.0 {
        correlation / norm
    } else {
        0.0
    }
}

/// Fold a beat period (in onset frames) into the 70-180 BPM range
fn disambiguate_octave(lag: usize, fps: f32) -> f32 {
    let mut period = lag as f32;
    while 60.0 * fps / period < 70.0 {
        period /= 2.0;
    }
    while 60.0 * fps / period > 180.0 {
        period *= 2.0;
    }
    period
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Short noise bursts every `interval` seconds
    fn click_track(interval: f32, seconds: f32, sample_rate: u32) -> Vec<f32> {
        let len = (seconds * sample_rate as f32) as usize;
        let step = (interval * sample_rate as f32) as usize;
        let burst = (0.01 * sample_rate as f32) as usize;
        let mut samples = vec![0.0f32; len];
        let mut seed = 1u32;
        let mut start = 0;
        while start < len {
            for s in samples.iter_mut().skip(start).take(burst) {
                seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
                *s = ((seed >> 16) as f32 / 32768.0) - 1.0;
            }
            start += step;
        }
        samples
    }

    #[test]
    fn test_too_short() {
        let extractor = RhythmExtractor::new(44100);
        let err = extractor
            .extract(&vec![0.0; 44100], &TempoParams::default())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::TooShort { .. }));
    }

    #[test]
    fn test_click_track_tempo() {
        let extractor = RhythmExtractor::new(44100);
        let samples = click_track(0.5, 12.0, 44100);
        let tempo = extractor
            .extract(&samples, &TempoParams { method: TempoMethod::MultiFeature })
            .unwrap();

        assert!((115..=125).contains(&tempo.bpm), "got {} BPM", tempo.bpm);
        assert_eq!(tempo.intervals.len(), tempo.ticks.len() - 1);
        assert!(tempo.ticks.windows(2).all(|w| w[1] > w[0]));
        assert!(tempo.confidence > 0.0);
    }

    #[test]
    fn test_degara_has_no_confidence() {
        let extractor = RhythmExtractor::new(44100);
        let samples = click_track(0.5, 8.0, 44100);
        let tempo = extractor.extract(&samples, &TempoParams::default()).unwrap();
        assert_eq!(tempo.method, TempoMethod::Degara);
        assert_eq!(tempo.confidence, 0.0);
    }

    #[test]
    fn test_octave_folding() {
        let fps = 44100.0 / 512.0;
        // 50 BPM lag folds up to 100 BPM
        let lag = (fps * 60.0 / 50.0) as usize;
        let bpm = 60.0 * fps / disambiguate_octave(lag, fps);
        assert!((95.0..=105.0).contains(&bpm));
    }
}
