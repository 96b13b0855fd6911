//! Context menu overlay

use crate::theme::Theme;
use beatlens_core::MenuAction;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};

pub struct ContextMenuWidget<'a> {
    selected: usize,
    theme: &'a Theme,
}

impl<'a> ContextMenuWidget<'a> {
    pub fn new(selected: usize, theme: &'a Theme) -> Self {
        Self { selected, theme }
    }

    pub fn size() -> (u16, u16) {
        (20, MenuAction::ALL.len() as u16 + 2)
    }
}

impl Widget for ContextMenuWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Clear.render(area, buf);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border());
        let inner = block.inner(area);
        block.render(area, buf);

        let lines: Vec<Line> = MenuAction::ALL
            .iter()
            .enumerate()
            .map(|(i, action)| {
                let style = if i == self.selected {
                    self.theme.highlight()
                } else {
                    self.theme.normal()
                };
                Line::from(Span::styled(
                    format!(" {:<width$}", action.label(), width = inner.width.saturating_sub(1) as usize),
                    style,
                ))
            })
            .collect();
        Paragraph::new(lines).render(inner, buf);
    }
}
