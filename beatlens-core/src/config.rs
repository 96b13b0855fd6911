//! Analysis tunables and their persistence
//!
//! [`Config`] is a flat set of values read by the session coordinator and
//! the render loop. The host persists it through a [`ConfigStore`]; a
//! `key=value` file store and an in-memory store are provided.

use crate::error::ConfigError;
use beatlens_analysis::{ChordParams, ChromaPick, TempoMethod, TempoParams};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Keys under which each tunable is persisted
pub mod keys {
    pub const BPM_METHOD: &str = "bpm_method";
    pub const CHORDS_CHROMA_PICK: &str = "chords_chromaPick";
    pub const UPDATE_FPS: &str = "update_fps";
    pub const STRENGTH_LENGTH: &str = "strength_length";
    pub const CHORDS_FRAME_SIZE: &str = "chords_frame_size";
    pub const CHORDS_HOP_SIZE: &str = "chords_hop_size";
    pub const BPM_AVERAGING: &str = "bpm_averaging";
    pub const CIRCLE_ATTENUATION_SPEED: &str = "circle_attenuration_speed";
    pub const CHORDS_WINDOW_SIZE: &str = "chords_windowSize";
    pub const CHORDS_FOLLOW_THE_RHYTHM: &str = "chords_follow_the_rhythm";
    pub const CHORDS_ENABLE: &str = "chords_enable";
    pub const KEY_ENABLE: &str = "key_enable";
    pub const BPM_ENABLE: &str = "bpm_enable";
}

/// Host-provided persistent key/value configuration
pub trait ConfigStore {
    fn get_str(&self, key: &str, default: &str) -> String;
    fn get_int(&self, key: &str, default: i64) -> i64;
    fn get_float(&self, key: &str, default: f32) -> f32;
    fn set_str(&mut self, key: &str, value: &str);
    fn set_int(&mut self, key: &str, value: i64);
    fn set_float(&mut self, key: &str, value: f32);
}

/// Analysis configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bpm_method: TempoMethod,
    pub chords_chroma_pick: ChromaPick,
    /// Render loop rate in ticks per second
    pub update_fps: u32,
    /// Number of characters of a confidence score that are displayed
    pub strength_length: usize,
    pub chords_frame_size: usize,
    pub chords_hop_size: usize,
    /// Number of trailing beat intervals in the current BPM average
    pub bpm_averaging: usize,
    /// Pulse decay speed relative to the current beat interval
    pub circle_attenuration_speed: f32,
    pub chords_window_size: f32,
    pub chords_follow_the_rhythm: bool,
    pub chords_enable: bool,
    pub key_enable: bool,
    pub bpm_enable: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bpm_method: TempoMethod::Degara,
            chords_chroma_pick: ChromaPick::InterbeatMedian,
            update_fps: 60,
            strength_length: 4,
            chords_frame_size: 8192,
            chords_hop_size: 1024,
            bpm_averaging: 15,
            circle_attenuration_speed: 0.75,
            chords_window_size: 1.8,
            chords_follow_the_rhythm: false,
            chords_enable: true,
            key_enable: true,
            bpm_enable: true,
        }
    }
}

impl Config {
    /// Read every tunable from the store, falling back to defaults
    pub fn load(store: &dyn ConfigStore) -> Self {
        let d = Self::default();
        let bool_of = |key: &str, default: bool| store.get_int(key, default as i64) != 0;
        let usize_of =
            |key: &str, default: usize| store.get_int(key, default as i64).max(0) as usize;

        Self {
            bpm_method: store
                .get_str(keys::BPM_METHOD, d.bpm_method.as_str())
                .parse()
                .unwrap_or(d.bpm_method),
            chords_chroma_pick: store
                .get_str(keys::CHORDS_CHROMA_PICK, d.chords_chroma_pick.as_str())
                .parse()
                .unwrap_or(d.chords_chroma_pick),
            update_fps: store
                .get_int(keys::UPDATE_FPS, d.update_fps as i64)
                .clamp(1, u32::MAX as i64) as u32,
            strength_length: usize_of(keys::STRENGTH_LENGTH, d.strength_length),
            chords_frame_size: usize_of(keys::CHORDS_FRAME_SIZE, d.chords_frame_size),
            chords_hop_size: usize_of(keys::CHORDS_HOP_SIZE, d.chords_hop_size),
            bpm_averaging: usize_of(keys::BPM_AVERAGING, d.bpm_averaging),
            circle_attenuration_speed: store
                .get_float(keys::CIRCLE_ATTENUATION_SPEED, d.circle_attenuration_speed),
            chords_window_size: store.get_float(keys::CHORDS_WINDOW_SIZE, d.chords_window_size),
            chords_follow_the_rhythm: bool_of(
                keys::CHORDS_FOLLOW_THE_RHYTHM,
                d.chords_follow_the_rhythm,
            ),
            chords_enable: bool_of(keys::CHORDS_ENABLE, d.chords_enable),
            key_enable: bool_of(keys::KEY_ENABLE, d.key_enable),
            bpm_enable: bool_of(keys::BPM_ENABLE, d.bpm_enable),
        }
    }

    /// Write every tunable to the store
    pub fn save(&self, store: &mut dyn ConfigStore) {
        store.set_str(keys::BPM_METHOD, self.bpm_method.as_str());
        store.set_str(keys::CHORDS_CHROMA_PICK, self.chords_chroma_pick.as_str());
        store.set_int(keys::UPDATE_FPS, self.update_fps as i64);
        store.set_int(keys::STRENGTH_LENGTH, self.strength_length as i64);
        store.set_int(keys::CHORDS_FRAME_SIZE, self.chords_frame_size as i64);
        store.set_int(keys::CHORDS_HOP_SIZE, self.chords_hop_size as i64);
        store.set_int(keys::BPM_AVERAGING, self.bpm_averaging as i64);
        store.set_float(keys::CIRCLE_ATTENUATION_SPEED, self.circle_attenuration_speed);
        store.set_float(keys::CHORDS_WINDOW_SIZE, self.chords_window_size);
        store.set_int(
            keys::CHORDS_FOLLOW_THE_RHYTHM,
            self.chords_follow_the_rhythm as i64,
        );
        store.set_int(keys::CHORDS_ENABLE, self.chords_enable as i64);
        store.set_int(keys::KEY_ENABLE, self.key_enable as i64);
        store.set_int(keys::BPM_ENABLE, self.bpm_enable as i64);
    }

    /// Render loop period, `1000 / update_fps` milliseconds
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(1000 / self.update_fps.max(1) as u64)
    }

    /// Length of one render tick in seconds
    pub fn tick_seconds(&self) -> f32 {
        1.0 / self.update_fps.max(1) as f32
    }

    /// Chords wait for the tempo result and are indexed by beat
    pub fn beat_synced_chords(&self) -> bool {
        self.chords_enable && self.chords_follow_the_rhythm && self.bpm_enable
    }

    pub fn tempo_params(&self) -> TempoParams {
        TempoParams {
            method: self.bpm_method,
        }
    }

    pub fn chord_params(&self) -> ChordParams {
        ChordParams {
            chroma_pick: self.chords_chroma_pick,
            window_size: self.chords_window_size,
            frame_size: self.chords_frame_size,
            hop_size: self.chords_hop_size,
        }
    }
}

/// In-memory store
#[derive(Debug, Default, Clone)]
pub struct MemoryConfigStore {
    entries: BTreeMap<String, String>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    fn parsed<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.entries.get(key).and_then(|v| v.trim().parse().ok())
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get_str(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }

    fn get_int(&self, key: &str, default: i64) -> i64 {
        self.parsed(key).unwrap_or(default)
    }

    fn get_float(&self, key: &str, default: f32) -> f32 {
        self.parsed(key).unwrap_or(default)
    }

    fn set_str(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn set_int(&mut self, key: &str, value: i64) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn set_float(&mut self, key: &str, value: f32) {
        self.entries.insert(key.to_string(), value.to_string());
    }
}

/// Store persisted as a simple `key=value` text file
///
/// Lines starting with `#` are comments. Keys this crate does not know
/// about are kept and written back unchanged.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
    entries: MemoryConfigStore,
}

impl FileConfigStore {
    /// Open the store at the default location
    pub fn open_default() -> Result<Self, ConfigError> {
        Self::open(Self::default_path())
    }

    /// Open a store; a missing file yields an empty store
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => MemoryConfigStore::new(),
            Err(source) => return Err(ConfigError::Read { path, source }),
        };
        Ok(Self { path, entries })
    }

    /// Default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("beatlens")
            .join("config.txt")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write all entries back to disk
    pub fn flush(&self) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(&self.path, self.serialize()).map_err(write_err)
    }

    fn parse(content: &str) -> MemoryConfigStore {
        let mut entries = MemoryConfigStore::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                entries.set_str(key.trim(), value.trim());
            }
        }
        entries
    }

    fn serialize(&self) -> String {
        let mut lines = vec!["# beatlens configuration".to_string()];
        lines.extend(
            self.entries
                .entries
                .iter()
                .map(|(k, v)| format!("{}={}", k, v)),
        );
        lines.push(String::new());
        lines.join("\n")
    }
}

impl ConfigStore for FileConfigStore {
    fn get_str(&self, key: &str, default: &str) -> String {
        self.entries.get_str(key, default)
    }

    fn get_int(&self, key: &str, default: i64) -> i64 {
        self.entries.get_int(key, default)
    }

    fn get_float(&self, key: &str, default: f32) -> f32 {
        self.entries.get_float(key, default)
    }

    fn set_str(&mut self, key: &str, value: &str) {
        self.entries.set_str(key, value)
    }

    fn set_int(&mut self, key: &str, value: i64) {
        self.entries.set_int(key, value)
    }

    fn set_float(&mut self, key: &str, value: f32) {
        self.entries.set_float(key, value)
    }
}
