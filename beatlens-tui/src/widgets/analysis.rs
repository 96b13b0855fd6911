//! Analysis strip widget - beat pulse, tempo, key and chord labels

use crate::theme::Theme;
use beatlens_core::display::{DisplayState, CHORDS_ERROR, KEY_ERROR, TEMPO_ERROR};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

/// Glyph drawn for the beat pulse
pub const PULSE_GLYPH: &str = "●";

/// Widget showing the panel's current display state on one line
///
/// Hidden channels are left out entirely. The pulse glyph is only drawn
/// when the tempo channel is visible.
pub struct AnalysisStripWidget<'a> {
    state: &'a DisplayState,
    theme: &'a Theme,
    title: Option<&'a str>,
}

impl<'a> AnalysisStripWidget<'a> {
    pub fn new(state: &'a DisplayState, theme: &'a Theme) -> Self {
        Self {
            state,
            theme,
            title: None,
        }
    }

    pub fn title(mut self, title: Option<&'a str>) -> Self {
        self.title = title;
        self
    }

    fn label_style(&self, text: &str) -> Style {
        if [TEMPO_ERROR, KEY_ERROR, CHORDS_ERROR].contains(&text) {
            self.theme.error()
        } else {
            self.theme.value()
        }
    }

    fn line(&self) -> Line<'a> {
        let mut spans = Vec::new();
        if self.state.tempo.is_some() {
            spans.push(Span::styled(
                PULSE_GLYPH,
                self.theme.pulse_style(self.state.brightness),
            ));
            spans.push(Span::raw(" "));
        }

        let labels = [
            ("BPM", &self.state.tempo),
            ("KEY", &self.state.key),
            ("CHORD", &self.state.chords),
        ];
        let mut first = true;
        for (name, text) in labels {
            let Some(text) = text else { continue };
            if !first {
                spans.push(Span::styled("  │  ", self.theme.dim()));
            }
            first = false;
            spans.push(Span::styled(format!("{} ", name), self.theme.dim()));
            spans.push(Span::styled(text.clone(), self.label_style(text)));
        }
        Line::from(spans)
    }
}

impl Widget for AnalysisStripWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = match self.title {
            Some(t) => format!(" {} ", t),
            None => " analysis ".to_string(),
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border())
            .title(Span::styled(title, self.theme.title()));

        let inner = block.inner(area);
        let line = self.line();
        block.render(area, buf);
        if inner.height == 0 {
            return;
        }
        Paragraph::new(line).render(inner, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::PHOSPHOR;
    use crate::widgets::row_text;

    fn render(state: &DisplayState) -> Buffer {
        let area = Rect::new(0, 0, 70, 3);
        let mut buf = Buffer::empty(area);
        AnalysisStripWidget::new(state, &PHOSPHOR).render(area, &mut buf);
        buf
    }

    #[test]
    fn test_all_channels_shown() {
        let state = DisplayState {
            tempo: Some("120(118) BPM".into()),
            key: Some("A minor(0.91)".into()),
            chords: Some("Am(0.50)".into()),
            brightness: 1.0,
        };
        let row = row_text(&render(&state), 1);
        assert!(row.contains(PULSE_GLYPH));
        assert!(row.contains("120(118) BPM"));
        assert!(row.contains("A minor(0.91)"));
        assert!(row.contains("Am(0.50)"));
    }

    #[test]
    fn test_hidden_tempo_drops_pulse() {
        let state = DisplayState {
            tempo: None,
            key: Some(KEY_ERROR.into()),
            chords: None,
            brightness: 1.0,
        };
        let buf = render(&state);
        let row = row_text(&buf, 1);
        assert!(!row.contains(PULSE_GLYPH));
        assert!(!row.contains("BPM"));
        assert!(row.contains(KEY_ERROR));
    }

    #[test]
    fn test_pulse_color_tracks_brightness() {
        let dark = DisplayState {
            brightness: 0.0,
            ..Default::default()
        };
        let buf = render(&dark);
        assert_eq!(buf[(1, 1)].symbol(), PULSE_GLYPH);
        assert_eq!(Some(buf[(1, 1)].fg), PHOSPHOR.pulse_style(0.0).fg);
    }
}
