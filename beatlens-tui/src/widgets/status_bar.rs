//! Status bar widget - mode, now playing and key hints

use crate::input::Mode;
use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

pub struct StatusBarWidget<'a> {
    mode: Mode,
    track: Option<&'a str>,
    position: f32,
    paused: bool,
    theme: &'a Theme,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(mode: Mode, theme: &'a Theme) -> Self {
        Self {
            mode,
            track: None,
            position: 0.0,
            paused: false,
            theme,
        }
    }

    pub fn track(mut self, track: Option<&'a str>, position: f32, paused: bool) -> Self {
        self.track = track;
        self.position = position;
        self.paused = paused;
        self
    }

    fn format_time(secs: f32) -> String {
        let secs = secs.max(0.0) as u64;
        format!("{}:{:02}", secs / 60, secs % 60)
    }
}

impl Widget for StatusBarWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 1 {
            return;
        }

        let chunks = Layout::horizontal([
            Constraint::Length(11),
            Constraint::Min(20),
            Constraint::Length(34),
        ])
        .split(area);

        let mode_line = Line::from(vec![
            Span::raw("["),
            Span::styled(self.mode.display_name(), self.theme.highlight()),
            Span::raw("]"),
        ]);
        Paragraph::new(mode_line).render(chunks[0], buf);

        let now_playing = match self.track {
            Some(track) => Line::from(vec![
                Span::styled(if self.paused { "⏸ " } else { "▶ " }, self.theme.value()),
                Span::styled(track, self.theme.normal()),
                Span::styled(
                    format!("  {}", Self::format_time(self.position)),
                    self.theme.dim(),
                ),
            ]),
            None => Line::from(Span::styled("Nothing playing", self.theme.dim())),
        };
        Paragraph::new(now_playing).render(chunks[1], buf);

        let help = match self.mode {
            Mode::Normal => "n/p:track  h/l:seek  m:menu  q:quit",
            Mode::Menu => "j/k:select  Enter:run  Esc",
            Mode::Settings => "a:apply  Enter:ok  Esc:cancel",
        };
        Paragraph::new(Line::from(Span::styled(help, self.theme.dim()))).render(chunks[2], buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(StatusBarWidget::format_time(0.0), "0:00");
        assert_eq!(StatusBarWidget::format_time(61.9), "1:01");
        assert_eq!(StatusBarWidget::format_time(-3.0), "0:00");
    }
}
