//! UI widgets for beatlens

mod analysis;
mod menu;
mod settings;
mod status_bar;

pub use analysis::{AnalysisStripWidget, PULSE_GLYPH};
pub use menu::ContextMenuWidget;
pub use settings::SettingsWidget;
pub use status_bar::StatusBarWidget;

use ratatui::layout::Rect;

/// Rectangle of at most `width` x `height` centered in `area`
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

#[cfg(test)]
pub(crate) fn row_text(buf: &ratatui::buffer::Buffer, y: u16) -> String {
    let area = buf.area;
    (area.x..area.x + area.width)
        .map(|x| buf[(x, y)].symbol().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect_fits() {
        let area = Rect::new(0, 0, 80, 24);
        assert_eq!(centered_rect(20, 4, area), Rect::new(30, 10, 20, 4));
        assert_eq!(centered_rect(200, 40, area), area);
    }
}
