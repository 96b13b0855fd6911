//! Display sink backing the terminal UI

use beatlens_core::{DisplaySink, DisplayState};

/// Latest display state pushed by the panel, read when drawing a frame
#[derive(Debug, Default)]
pub struct AnalysisView {
    state: DisplayState,
}

impl AnalysisView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }
}

impl DisplaySink for AnalysisView {
    fn apply(&mut self, state: &DisplayState) {
        self.state.clone_from(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_latest_state() {
        let mut view = AnalysisView::new();
        let state = DisplayState {
            key: None,
            brightness: 0.25,
            ..Default::default()
        };
        view.apply(&DisplayState::default());
        view.apply(&state);
        assert_eq!(view.state(), &state);
    }
}
