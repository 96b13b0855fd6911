//! The extraction seam between the session layer and signal analysis

use crate::chords::ChordDetector;
use crate::error::AnalysisError;
use crate::key::KeyDetector;
use crate::loader::MonoLoader;
use crate::rhythm::RhythmExtractor;
use crate::types::{ChordAnalysis, ChordParams, KeyAnalysis, TempoAnalysis, TempoParams};
use std::path::Path;

/// Feature extraction against a whole audio file
///
/// Implementations are called from worker threads and must not share
/// mutable state between calls. Every call is a pure function of the file
/// and its parameters.
pub trait Extractor: Send + Sync {
    fn tempo(&self, path: &Path, params: &TempoParams) -> Result<TempoAnalysis, AnalysisError>;

    fn key(&self, path: &Path) -> Result<KeyAnalysis, AnalysisError>;

    /// Chord progression; with `ticks` the result is indexed by beat
    fn chords(
        &self,
        path: &Path,
        params: &ChordParams,
        ticks: Option<&[f32]>,
    ) -> Result<ChordAnalysis, AnalysisError>;
}

/// Extractor backed by the analyzers in this crate
///
/// Each call decodes the file again; decoder and FFT state live on the
/// calling thread's stack and are released when the call returns.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeExtractor;

impl NativeExtractor {
    pub fn new() -> Self {
        Self
    }

    fn load(&self, path: &Path) -> Result<(Vec<f32>, u32), AnalysisError> {
        let loader = MonoLoader::new();
        let samples = loader.load(path)?;
        Ok((samples, loader.sample_rate()))
    }
}

impl Extractor for NativeExtractor {
    fn tempo(&self, path: &Path, params: &TempoParams) -> Result<TempoAnalysis, AnalysisError> {
        let (samples, sample_rate) = self.load(path)?;
        RhythmExtractor::new(sample_rate).extract(&samples, params)
    }

    fn key(&self, path: &Path) -> Result<KeyAnalysis, AnalysisError> {
        let (samples, sample_rate) = self.load(path)?;
        KeyDetector::new(sample_rate).detect(&samples)
    }

    fn chords(
        &self,
        path: &Path,
        params: &ChordParams,
        ticks: Option<&[f32]>,
    ) -> Result<ChordAnalysis, AnalysisError> {
        let (samples, sample_rate) = self.load(path)?;
        ChordDetector::new(sample_rate, *params).detect(&samples, ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_fails_every_channel() {
        let extractor = NativeExtractor::new();
        let path = Path::new("/nonexistent/beatlens.wav");
        assert!(extractor.tempo(path, &TempoParams::default()).is_err());
        assert!(extractor.key(path).is_err());
        assert!(extractor.chords(path, &ChordParams::default(), None).is_err());
    }

    #[test]
    fn test_extractor_is_object_safe() {
        let extractor: Box<dyn Extractor> = Box::new(NativeExtractor::new());
        assert!(extractor.key(Path::new("")).is_err());
    }
}
