//! Errors raised by feature extraction

use thiserror::Error;

/// Errors that can occur while extracting features from an audio source
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No audio track found in file")]
    NoAudioTrack,
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Audio too short for analysis ({seconds:.1}s)")]
    TooShort { seconds: f32 },
    #[error("Extraction failed: {0}")]
    Extraction(String),
}
