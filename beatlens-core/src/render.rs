//! Fixed-rate display derivation
//!
//! Each tick the render loop consumes any newly finished outcome from the
//! store, advances the beat pulse against the playback position and derives
//! the three label texts. The labels are kept even while a channel is
//! disabled; only the state pushed to the sink hides them.

use crate::config::Config;
use crate::display::{DisplaySink, DisplayState, CHORDS_ERROR, KEY_ERROR, TEMPO_ERROR};
use crate::store::{Outcome, ResultStore};
use beatlens_analysis::{ChordAnalysis, TempoAnalysis};
use std::sync::Arc;
use std::time::Duration;

/// What the scheduler should do after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    /// Stop the current schedule and continue at a new period
    Reschedule(Duration),
}

#[derive(Debug)]
pub struct RenderLoop {
    tempo: Option<Arc<TempoAnalysis>>,
    chords: Option<Arc<ChordAnalysis>>,
    beat_index: usize,
    brightness: f32,
    config_changed: bool,
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self {
            tempo: None,
            chords: None,
            beat_index: 0,
            brightness: 1.0,
            config_changed: false,
        }
    }
}

impl RenderLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn beat_index(&self) -> usize {
        self.beat_index
    }

    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    /// Restart the pulse at the first beat, fully lit
    pub fn reset_beat(&mut self) {
        self.beat_index = 0;
        self.brightness = 1.0;
    }

    /// Forget cached payloads of the previous round
    pub fn clear(&mut self) {
        self.tempo = None;
        self.chords = None;
        self.reset_beat();
    }

    /// The next tick reschedules at the configured period
    pub fn mark_config_changed(&mut self) {
        self.config_changed = true;
    }

    pub fn tick(
        &mut self,
        config: &Config,
        position: f32,
        store: &ResultStore,
        labels: &mut DisplayState,
        sink: &mut dyn DisplaySink,
    ) -> TickOutcome {
        if config.bpm_enable {
            self.tick_tempo(config, position, store, labels);
        }
        if config.key_enable {
            if let Some(outcome) = store.key.take_finished() {
                match outcome {
                    Outcome::Success(key) => {
                        labels.key = Some(format!(
                            "{} {}({})",
                            key.key,
                            key.scale,
                            format_confidence(key.strength, config.strength_length)
                        ))
                    }
                    Outcome::Failure(_) => labels.key = Some(KEY_ERROR.to_string()),
                    Outcome::Pending => {}
                }
            }
        }
        if config.chords_enable {
            self.tick_chords(config, position, store, labels);
        }

        labels.brightness = self.brightness;
        sink.apply(&visible(config, labels));

        if self.config_changed {
            self.config_changed = false;
            return TickOutcome::Reschedule(config.tick_period());
        }
        TickOutcome::Continue
    }

    fn tick_tempo(
        &mut self,
        config: &Config,
        position: f32,
        store: &ResultStore,
        labels: &mut DisplayState,
    ) {
        match store.tempo.take_finished() {
            Some(Outcome::Success(tempo)) => self.tempo = Some(tempo),
            Some(Outcome::Failure(_)) => {
                self.tempo = None;
                labels.tempo = Some(TEMPO_ERROR.to_string());
            }
            _ => {}
        }

        let Some(tempo) = self.tempo.clone() else {
            return;
        };
        let tick_secs = config.tick_seconds();

        if let Some(interval) = tempo.interval_at(self.beat_index) {
            let span = interval * config.circle_attenuration_speed;
            self.brightness = if span > 0.0 {
                (self.brightness - tick_secs / span).max(0.0)
            } else {
                0.0
            };
        }

        // Fire every beat due before the next tick
        while self.beat_index + 1 < tempo.ticks.len()
            && tempo.ticks[self.beat_index + 1] - position <= tick_secs
        {
            self.beat_index += 1;
            self.brightness = 1.0;
        }

        let current = current_bpm(&tempo.intervals, self.beat_index, config.bpm_averaging)
            .map_or(0, |bpm| bpm as u32);
        labels.tempo = Some(if tempo.reports_confidence() {
            format!(
                "{}({}) BPM({})",
                tempo.bpm,
                current,
                format_confidence(tempo.confidence, config.strength_length)
            )
        } else {
            format!("{}({}) BPM", tempo.bpm, current)
        });
    }

    fn tick_chords(
        &mut self,
        config: &Config,
        position: f32,
        store: &ResultStore,
        labels: &mut DisplayState,
    ) {
        match store.chords.take_finished() {
            Some(Outcome::Success(chords)) => self.chords = Some(chords),
            Some(Outcome::Failure(_)) => {
                self.chords = None;
                labels.chords = Some(CHORDS_ERROR.to_string());
            }
            _ => {}
        }

        let Some(chords) = &self.chords else {
            return;
        };
        let index = if chords.beat_synced {
            // The pulse stops while tempo is hidden; follow the cached grid instead
            let beat = match &self.tempo {
                Some(tempo) if !config.bpm_enable => beat_at(&tempo.ticks, position),
                _ => self.beat_index,
            };
            chords.chords.len().checked_sub(1).map(|last| beat.min(last))
        } else {
            free_chord_index(position, chords.delay, chords.chords.len())
        };
        if let Some(i) = index {
            let strength = chords.strengths.get(i).copied().unwrap_or(0.0);
            labels.chords = Some(format!(
                "{}({})",
                chords.chords[i],
                format_confidence(strength, config.strength_length)
            ));
        }
    }
}

/// Labels as shown, with disabled channels hidden
fn visible(config: &Config, labels: &DisplayState) -> DisplayState {
    let shown = |enabled: bool, text: &Option<String>| if enabled { text.clone() } else { None };
    DisplayState {
        tempo: shown(config.bpm_enable, &labels.tempo),
        key: shown(config.key_enable, &labels.key),
        chords: shown(config.chords_enable, &labels.chords),
        brightness: labels.brightness,
    }
}

/// Tempo over the trailing `averaging + 1` beat intervals ending at `index`
pub fn current_bpm(intervals: &[f32], index: usize, averaging: usize) -> Option<f32> {
    let last = intervals.len().checked_sub(1)?;
    let end = index.min(last);
    let window = &intervals[end.saturating_sub(averaging)..=end];
    let mean = window.iter().sum::<f32>() / window.len() as f32;
    (mean > 0.0).then(|| 60.0 / mean)
}

/// Index of the last beat at or before `position`
pub fn beat_at(ticks: &[f32], position: f32) -> usize {
    ticks.partition_point(|t| *t <= position).saturating_sub(1)
}

/// Chord index of a free-running progression, clamped to the last chord
pub fn free_chord_index(position: f32, delay: f32, len: usize) -> Option<usize> {
    let last = len.checked_sub(1)?;
    if delay <= 0.0 || position <= 0.0 {
        return Some(0);
    }
    Some(((position / delay).trunc() as usize).min(last))
}

/// Score printed with six decimals, cut to `len` characters
pub fn format_confidence(value: f32, len: usize) -> String {
    format!("{:.6}", value).chars().take(len).collect()
}
