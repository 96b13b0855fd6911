//! Terminal UI for beatlens - analysis strip, settings form and themes

mod input;
mod theme;
mod view;
pub mod widgets;

pub use input::{Command, InputHandler, Mode, SEEK_STEP};
pub use theme::{Theme, AMBER, PHOSPHOR};
pub use view::AnalysisView;
pub use widgets::{
    centered_rect, AnalysisStripWidget, ContextMenuWidget, SettingsWidget, StatusBarWidget,
};
