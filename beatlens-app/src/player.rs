//! Simulated playback host
//!
//! Walks a playlist on a wall clock without producing sound. Track
//! changes and seeks are announced on a channel, the way a media player
//! notifies its plugins.

use beatlens_analysis::MonoLoader;
use beatlens_core::{PlaybackHost, SourceId};
use crossbeam_channel::{Receiver, Sender};
use std::path::PathBuf;
use std::time::Instant;

/// Notifications sent to the UI context
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerEvent {
    TrackChanged(usize),
    Seeked(f32),
    Paused(bool),
}

struct Entry {
    path: PathBuf,
    /// Length from the file header, if known
    duration: Option<f32>,
}

pub struct Player {
    playlist: Vec<Entry>,
    index: usize,
    /// Position at `resumed_at`
    offset: f32,
    resumed_at: Instant,
    paused: bool,
    event_tx: Sender<PlayerEvent>,
    event_rx: Receiver<PlayerEvent>,
}

impl Player {
    pub fn new(files: Vec<PathBuf>, now: Instant) -> Self {
        let loader = MonoLoader::new();
        let playlist = files
            .into_iter()
            .map(|path| {
                let duration = match loader.duration(&path) {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("cannot probe {}: {}", path.display(), e);
                        None
                    }
                };
                Entry { path, duration }
            })
            .collect();
        Self::with_entries(playlist, now)
    }

    fn with_entries(playlist: Vec<Entry>, now: Instant) -> Self {
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        Self {
            playlist,
            index: 0,
            offset: 0.0,
            resumed_at: now,
            paused: false,
            event_tx,
            event_rx,
        }
    }

    /// Receiver for host notifications
    pub fn events(&self) -> Receiver<PlayerEvent> {
        self.event_rx.clone()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn titles(&self) -> Vec<String> {
        self.playlist
            .iter()
            .map(|e| {
                e.path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| e.path.display().to_string())
            })
            .collect()
    }

    pub fn position_at(&self, now: Instant) -> f32 {
        if self.paused {
            self.offset
        } else {
            self.offset + now.saturating_duration_since(self.resumed_at).as_secs_f32()
        }
    }

    pub fn next(&mut self, now: Instant) {
        if self.playlist.is_empty() {
            return;
        }
        self.jump((self.index + 1) % self.playlist.len(), now);
    }

    pub fn prev(&mut self, now: Instant) {
        if self.playlist.is_empty() {
            return;
        }
        let len = self.playlist.len();
        self.jump((self.index + len - 1) % len, now);
    }

    pub fn toggle_pause(&mut self, now: Instant) {
        self.offset = self.position_at(now);
        self.resumed_at = now;
        self.paused = !self.paused;
        self.notify(PlayerEvent::Paused(self.paused));
    }

    /// Relative seek, clamped to the start of the track
    pub fn seek(&mut self, delta: f32, now: Instant) {
        let mut target = (self.position_at(now) + delta).max(0.0);
        if let Some(duration) = self.current_duration() {
            target = target.min(duration);
        }
        self.offset = target;
        self.resumed_at = now;
        self.notify(PlayerEvent::Seeked(target));
    }

    /// Move to the next track once the current one has played out
    pub fn update(&mut self, now: Instant) {
        if let Some(duration) = self.current_duration() {
            if !self.paused && self.position_at(now) >= duration {
                self.next(now);
            }
        }
    }

    fn current_duration(&self) -> Option<f32> {
        self.playlist.get(self.index).and_then(|e| e.duration)
    }

    fn jump(&mut self, index: usize, now: Instant) {
        self.index = index;
        self.offset = 0.0;
        self.resumed_at = now;
        tracing::info!("now playing {}", self.playlist[index].path.display());
        self.notify(PlayerEvent::TrackChanged(index));
    }

    fn notify(&self, event: PlayerEvent) {
        // Receiver lives in self, so the send cannot fail
        let _ = self.event_tx.send(event);
    }
}

impl PlaybackHost for Player {
    fn position_secs(&self) -> f32 {
        self.position_at(Instant::now())
    }

    fn current_source(&self) -> Option<SourceId> {
        self.playlist
            .get(self.index)
            .map(|e| SourceId::new(e.path.to_string_lossy()))
    }

    fn source_path(&self, source: &SourceId) -> PathBuf {
        PathBuf::from(source.as_str())
    }
}
