//! Payloads and parameters for the three analyses

use std::fmt;
use std::str::FromStr;

/// Beat tracking method used by the tempo extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TempoMethod {
    /// Several onset features combined; reports a meaningful confidence
    MultiFeature,
    /// Single onset feature; confidence is not computed
    #[default]
    Degara,
}

impl TempoMethod {
    pub const ALL: [TempoMethod; 2] = [TempoMethod::MultiFeature, TempoMethod::Degara];

    pub fn as_str(&self) -> &'static str {
        match self {
            TempoMethod::MultiFeature => "multifeature",
            TempoMethod::Degara => "degara",
        }
    }
}

impl fmt::Display for TempoMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TempoMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "multifeature" => Ok(TempoMethod::MultiFeature),
            "degara" => Ok(TempoMethod::Degara),
            other => Err(format!("unknown tempo method '{}'", other)),
        }
    }
}

/// How a beat-synchronized chord detector picks the chroma for each beat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChromaPick {
    /// Chroma of the frame at the start of the beat
    StartingBeat,
    /// Per-bin median of all frames between two beats
    #[default]
    InterbeatMedian,
}

impl ChromaPick {
    pub const ALL: [ChromaPick; 2] = [ChromaPick::StartingBeat, ChromaPick::InterbeatMedian];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChromaPick::StartingBeat => "starting_beat",
            ChromaPick::InterbeatMedian => "interbeat_median",
        }
    }
}

impl fmt::Display for ChromaPick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChromaPick {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "starting_beat" => Ok(ChromaPick::StartingBeat),
            "interbeat_median" => Ok(ChromaPick::InterbeatMedian),
            other => Err(format!("unknown chroma pick '{}'", other)),
        }
    }
}

/// Parameters for the tempo extractor
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TempoParams {
    pub method: TempoMethod,
}

/// Parameters for the chord detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChordParams {
    pub chroma_pick: ChromaPick,
    /// Length of the free-running smoothing window in seconds
    pub window_size: f32,
    pub frame_size: usize,
    pub hop_size: usize,
}

impl Default for ChordParams {
    fn default() -> Self {
        Self {
            chroma_pick: ChromaPick::InterbeatMedian,
            window_size: 1.8,
            frame_size: 8192,
            hop_size: 1024,
        }
    }
}

/// Result of tempo extraction
#[derive(Debug, Clone, PartialEq)]
pub struct TempoAnalysis {
    /// Global tempo estimate, truncated to whole beats per minute
    pub bpm: u32,
    pub confidence: f32,
    /// Beat positions in seconds, strictly increasing
    pub ticks: Vec<f32>,
    /// Seconds between consecutive ticks (one fewer than `ticks`)
    pub intervals: Vec<f32>,
    /// Candidate tempo values the global estimate was chosen from
    pub estimates: Vec<f32>,
    pub method: TempoMethod,
}

impl TempoAnalysis {
    /// Interval that applies at a beat index, clamped to the last interval
    pub fn interval_at(&self, index: usize) -> Option<f32> {
        if self.intervals.is_empty() {
            return None;
        }
        Some(self.intervals[index.min(self.intervals.len() - 1)])
    }

    /// Whether the secondary confidence figure is meaningful for display
    pub fn reports_confidence(&self) -> bool {
        self.method == TempoMethod::MultiFeature
    }
}

/// Result of key extraction
#[derive(Debug, Clone, PartialEq)]
pub struct KeyAnalysis {
    /// Tonic name, e.g. `"F#"`
    pub key: String,
    /// `"major"` or `"minor"`
    pub scale: String,
    pub strength: f32,
}

/// Result of chord detection
#[derive(Debug, Clone, PartialEq)]
pub struct ChordAnalysis {
    pub chords: Vec<String>,
    /// Parallel to `chords`
    pub strengths: Vec<f32>,
    /// Seconds between chords; only meaningful when not beat-synchronized
    pub delay: f32,
    /// Chords are indexed by beat position instead of wall-clock time
    pub beat_synced: bool,
}
