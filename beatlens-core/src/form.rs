//! Settings form model
//!
//! Widget-agnostic state behind the "Configure" dialog. Every field knows
//! its input range and step; values are clamped by the form as they are
//! edited, so the rest of the crate never validates configuration.

use crate::config::Config;
use beatlens_analysis::{ChromaPick, TempoMethod};

/// Editable fields, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    StrengthLength,
    UpdateFps,
    BpmEnable,
    BpmMethod,
    AttenuationSpeed,
    BpmAveraging,
    KeyEnable,
    ChordsEnable,
    ChromaPick,
    WindowSize,
    FrameSize,
    HopSize,
    FollowTheRhythm,
}

impl Field {
    pub const ALL: [Field; 13] = [
        Field::StrengthLength,
        Field::UpdateFps,
        Field::BpmEnable,
        Field::BpmMethod,
        Field::AttenuationSpeed,
        Field::BpmAveraging,
        Field::KeyEnable,
        Field::ChordsEnable,
        Field::ChromaPick,
        Field::WindowSize,
        Field::FrameSize,
        Field::HopSize,
        Field::FollowTheRhythm,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Field::StrengthLength => "strength length",
            Field::UpdateFps => "update fps",
            Field::BpmEnable => "enable BPM extractor",
            Field::BpmMethod => "method",
            Field::AttenuationSpeed => "circle attenuation speed",
            Field::BpmAveraging => "averaging",
            Field::KeyEnable => "enable key detection",
            Field::ChordsEnable => "enable chords detection",
            Field::ChromaPick => "chromaPick",
            Field::WindowSize => "windowSize",
            Field::FrameSize => "frame size",
            Field::HopSize => "hop size",
            Field::FollowTheRhythm => "follow the rhythm",
        }
    }

    /// Section header the field is listed under
    pub fn section(&self) -> &'static str {
        match self {
            Field::StrengthLength | Field::UpdateFps => "GENERAL",
            Field::BpmEnable | Field::BpmMethod | Field::AttenuationSpeed | Field::BpmAveraging => {
                "BPM"
            }
            Field::KeyEnable => "KEY",
            _ => "CHORDS",
        }
    }

    /// Numeric range and step, `None` for toggles and choices
    pub fn range(&self) -> Option<(f32, f32, f32)> {
        match self {
            Field::StrengthLength => Some((0.0, 10.0, 1.0)),
            Field::UpdateFps => Some((10.0, 120.0, 1.0)),
            Field::AttenuationSpeed => Some((0.0, 2.0, 0.05)),
            Field::BpmAveraging => Some((1.0, 100.0, 1.0)),
            Field::WindowSize => Some((0.0, 100.0, 0.1)),
            Field::FrameSize => Some((1024.0, 16384.0, 1024.0)),
            Field::HopSize => Some((1024.0, 8192.0, 1024.0)),
            _ => None,
        }
    }
}

/// How the dialog was closed or confirmed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormResponse {
    /// Commit and keep the form open
    Apply,
    /// Commit and close
    Ok,
    /// Discard and close
    Cancel,
}

/// Editable copy of the configuration
#[derive(Debug, Clone)]
pub struct ConfigForm {
    draft: Config,
    selected: usize,
}

impl ConfigForm {
    pub fn new(config: &Config) -> Self {
        let mut draft = config.clone();
        Self::clamp_all(&mut draft);
        Self { draft, selected: 0 }
    }

    pub fn draft(&self) -> &Config {
        &self.draft
    }

    pub fn selected(&self) -> Field {
        Field::ALL[self.selected]
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1) % Field::ALL.len();
    }

    pub fn select_prev(&mut self) {
        self.selected = (self.selected + Field::ALL.len() - 1) % Field::ALL.len();
    }

    /// Display value of a field
    pub fn value_text(&self, field: Field) -> String {
        let c = &self.draft;
        let on_off = |b: bool| if b { "[x]" } else { "[ ]" }.to_string();
        match field {
            Field::StrengthLength => c.strength_length.to_string(),
            Field::UpdateFps => c.update_fps.to_string(),
            Field::BpmEnable => on_off(c.bpm_enable),
            Field::BpmMethod => c.bpm_method.to_string(),
            Field::AttenuationSpeed => format!("{:.2}", c.circle_attenuration_speed),
            Field::BpmAveraging => c.bpm_averaging.to_string(),
            Field::KeyEnable => on_off(c.key_enable),
            Field::ChordsEnable => on_off(c.chords_enable),
            Field::ChromaPick => c.chords_chroma_pick.to_string(),
            Field::WindowSize => format!("{:.1}", c.chords_window_size),
            Field::FrameSize => c.chords_frame_size.to_string(),
            Field::HopSize => c.chords_hop_size.to_string(),
            Field::FollowTheRhythm => on_off(c.chords_follow_the_rhythm),
        }
    }

    /// Step the selected field up (`+1`) or down (`-1`); toggles flip
    pub fn adjust(&mut self, direction: i32) {
        let field = self.selected();
        let c = &mut self.draft;

        if let Some((_, _, step)) = field.range() {
            let delta = step * direction.signum() as f32;
            match field {
                Field::StrengthLength => {
                    c.strength_length = step_int(c.strength_length as f32, delta, field)
                }
                Field::UpdateFps => c.update_fps = step_int(c.update_fps as f32, delta, field) as u32,
                Field::AttenuationSpeed => {
                    c.circle_attenuration_speed = step_float(c.circle_attenuration_speed, delta, field)
                }
                Field::BpmAveraging => c.bpm_averaging = step_int(c.bpm_averaging as f32, delta, field),
                Field::WindowSize => c.chords_window_size = step_float(c.chords_window_size, delta, field),
                Field::FrameSize => {
                    c.chords_frame_size = step_int(c.chords_frame_size as f32, delta, field)
                }
                Field::HopSize => c.chords_hop_size = step_int(c.chords_hop_size as f32, delta, field),
                _ => {}
            }
            return;
        }

        match field {
            Field::BpmEnable => c.bpm_enable = !c.bpm_enable,
            Field::KeyEnable => c.key_enable = !c.key_enable,
            Field::ChordsEnable => c.chords_enable = !c.chords_enable,
            Field::FollowTheRhythm => c.chords_follow_the_rhythm = !c.chords_follow_the_rhythm,
            Field::BpmMethod => c.bpm_method = cycle(&TempoMethod::ALL, c.bpm_method, direction),
            Field::ChromaPick => {
                c.chords_chroma_pick = cycle(&ChromaPick::ALL, c.chords_chroma_pick, direction)
            }
            _ => {}
        }
    }

    /// Resolve a dialog response into the configuration to apply, if any
    pub fn respond(&self, response: FormResponse) -> Option<Config> {
        match response {
            FormResponse::Apply | FormResponse::Ok => {
                let mut config = self.draft.clone();
                // Following the rhythm needs the tempo extractor
                if !config.bpm_enable {
                    config.chords_follow_the_rhythm = false;
                }
                Some(config)
            }
            FormResponse::Cancel => None,
        }
    }

    fn clamp_all(c: &mut Config) {
        let clamp = |v: f32, f: Field| {
            let (lo, hi, _) = f.range().unwrap_or((f32::MIN, f32::MAX, 1.0));
            v.clamp(lo, hi)
        };
        c.strength_length = clamp(c.strength_length as f32, Field::StrengthLength) as usize;
        c.update_fps = clamp(c.update_fps as f32, Field::UpdateFps) as u32;
        c.circle_attenuration_speed = clamp(c.circle_attenuration_speed, Field::AttenuationSpeed);
        c.bpm_averaging = clamp(c.bpm_averaging as f32, Field::BpmAveraging) as usize;
        c.chords_window_size = clamp(c.chords_window_size, Field::WindowSize);
        c.chords_frame_size = clamp(c.chords_frame_size as f32, Field::FrameSize) as usize;
        c.chords_hop_size = clamp(c.chords_hop_size as f32, Field::HopSize) as usize;
    }
}

fn step_float(value: f32, delta: f32, field: Field) -> f32 {
    let (lo, hi, step) = field.range().unwrap_or((f32::MIN, f32::MAX, 1.0));
    // Snap to the step grid so repeated float steps do not drift
    let stepped = ((value + delta) / step).round() * step;
    stepped.clamp(lo, hi)
}

fn step_int(value: f32, delta: f32, field: Field) -> usize {
    step_float(value, delta, field).round() as usize
}

fn cycle<T: Copy + PartialEq>(all: &[T], current: T, direction: i32) -> T {
    let idx = all.iter().position(|v| *v == current).unwrap_or(0) as i32;
    let len = all.len() as i32;
    all[((idx + direction.signum()).rem_euclid(len)) as usize]
}
