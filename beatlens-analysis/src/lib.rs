//! Feature extraction for beatlens
//!
//! Provides the payload types produced by the three analyses (tempo, key,
//! chords), the [`Extractor`] seam the session layer calls into, and a
//! native implementation built on symphonia and rustfft.

mod chords;
mod chroma;
mod error;
mod extractor;
mod key;
mod loader;
mod rhythm;
mod types;

pub use chords::ChordDetector;
pub use chroma::{ChromaFrames, Chromagram};
pub use error::AnalysisError;
pub use extractor::{Extractor, NativeExtractor};
pub use key::KeyDetector;
pub use loader::{MonoLoader, ANALYSIS_SAMPLE_RATE};
pub use rhythm::RhythmExtractor;
pub use types::{
    ChordAnalysis, ChordParams, ChromaPick, KeyAnalysis, TempoAnalysis, TempoMethod, TempoParams,
};
