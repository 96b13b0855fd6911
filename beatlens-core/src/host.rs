//! Interface to the media player hosting the panel

use crate::channel::SourceId;
use std::path::PathBuf;

/// Playback state the panel reads from its host
pub trait PlaybackHost {
    /// Playback position of the current item in seconds
    fn position_secs(&self) -> f32;

    /// Item currently playing, if any
    fn current_source(&self) -> Option<SourceId>;

    /// Local file behind a source
    fn source_path(&self, source: &SourceId) -> PathBuf;
}

/// A source together with the file the extractors read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: SourceId,
    pub path: PathBuf,
}

impl Track {
    pub fn new(id: impl Into<SourceId>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
        }
    }

    /// Resolve the host's current item
    pub fn current(host: &dyn PlaybackHost) -> Option<Self> {
        host.current_source().map(|id| {
            let path = host.source_path(&id);
            Self { id, path }
        })
    }
}
