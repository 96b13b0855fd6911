//! Settings form overlay

use crate::theme::Theme;
use beatlens_core::form::{ConfigForm, Field};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};

/// Overlay listing every tunable grouped by section
pub struct SettingsWidget<'a> {
    form: &'a ConfigForm,
    theme: &'a Theme,
}

impl<'a> SettingsWidget<'a> {
    pub fn new(form: &'a ConfigForm, theme: &'a Theme) -> Self {
        Self { form, theme }
    }

    /// Rows needed to show the whole form, borders included
    pub fn height() -> u16 {
        let mut sections = 0;
        let mut last = "";
        for field in Field::ALL {
            if field.section() != last {
                sections += 1;
                last = field.section();
            }
        }
        (Field::ALL.len() + sections + 2 + 2) as u16
    }

    fn lines(&self) -> Vec<Line<'a>> {
        let mut lines = Vec::new();
        let mut section = "";
        for field in Field::ALL {
            if field.section() != section {
                section = field.section();
                lines.push(Line::from(Span::styled(section, self.theme.title())));
            }
            let selected = field == self.form.selected();
            let value = self.form.value_text(field);
            let text = format!("  {:<26}{:>14}", field.label(), value);
            let style = if selected {
                self.theme.highlight()
            } else {
                self.theme.normal()
            };
            lines.push(Line::from(Span::styled(text, style)));
        }
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "j/k:field  h/l:change  a:apply  Enter:ok  Esc:cancel",
            self.theme.dim(),
        )));
        lines
    }
}

impl Widget for SettingsWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Clear.render(area, buf);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border())
            .title(Span::styled(" Configure ", self.theme.title()));
        let inner = block.inner(area);
        let lines = self.lines();
        block.render(area, buf);
        Paragraph::new(lines).render(inner, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::PHOSPHOR;
    use crate::widgets::row_text;
    use beatlens_core::Config;

    #[test]
    fn test_form_rows_rendered() {
        let mut form = ConfigForm::new(&Config::default());
        form.select_next();
        let area = Rect::new(0, 0, 60, SettingsWidget::height());
        let mut buf = Buffer::empty(area);
        SettingsWidget::new(&form, &PHOSPHOR).render(area, &mut buf);

        let rows: Vec<String> = (0..area.height).map(|y| row_text(&buf, y)).collect();
        assert!(rows[1].contains("GENERAL"));
        assert!(rows[3].contains("update fps") && rows[3].contains("60"));
        assert!(rows.iter().any(|r| r.contains("chromaPick")));
        assert_eq!(buf[(1, 3)].bg, PHOSPHOR.highlight);
    }
}
