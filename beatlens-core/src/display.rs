//! What the rendering side receives each tick

/// Shown on a channel whose job is running
pub const CALCULATING: &str = "Calculating...";
/// Shown on chords while they wait for the beat grid
pub const WAITING: &str = "Waiting...";
/// Shown on a channel that was not launched
pub const IDLE: &str = "...";

pub const TEMPO_ERROR: &str = "BPM error!";
pub const KEY_ERROR: &str = "Key error!";
pub const CHORDS_ERROR: &str = "Chord error!";

/// One batched display update
///
/// `None` hides the channel's label.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayState {
    pub tempo: Option<String>,
    pub key: Option<String>,
    pub chords: Option<String>,
    /// Beat pulse intensity in `[0, 1]`
    pub brightness: f32,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            tempo: Some(IDLE.to_string()),
            key: Some(IDLE.to_string()),
            chords: Some(IDLE.to_string()),
            brightness: 1.0,
        }
    }
}

/// Receiver of display updates, called on the UI context only
pub trait DisplaySink {
    fn apply(&mut self, state: &DisplayState);
}

/// Collects every applied state; handy for embedding and tests
impl DisplaySink for Vec<DisplayState> {
    fn apply(&mut self, state: &DisplayState) {
        self.push(state.clone());
    }
}

/// Entries of the panel's context menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Configure,
    Recalculate,
}

impl MenuAction {
    pub const ALL: [MenuAction; 2] = [MenuAction::Configure, MenuAction::Recalculate];

    pub fn label(&self) -> &'static str {
        match self {
            MenuAction::Configure => "Configure",
            MenuAction::Recalculate => "Recalculate",
        }
    }
}
