//! Color themes for the beatlens terminal UI

use ratatui::style::{Color, Modifier, Style};

/// Theme configuration for the UI
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: &'static str,
    /// Primary foreground color (text, borders)
    pub fg: Color,
    /// Dimmed foreground (secondary text)
    pub fg_dim: Color,
    pub bg: Color,
    /// Selected items and titles
    pub highlight: Color,
    /// Analysis values
    pub accent: Color,
    pub danger: Color,
    /// Pulse color at full brightness
    pub pulse: (u8, u8, u8),
}

impl Theme {
    pub fn normal(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    pub fn dim(&self) -> Style {
        Style::default().fg(self.fg_dim).bg(self.bg)
    }

    /// Get style for highlighted/selected items
    pub fn highlight(&self) -> Style {
        Style::default()
            .fg(self.bg)
            .bg(self.highlight)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border(&self) -> Style {
        Style::default().fg(self.fg_dim)
    }

    pub fn title(&self) -> Style {
        Style::default()
            .fg(self.highlight)
            .add_modifier(Modifier::BOLD)
    }

    pub fn value(&self) -> Style {
        Style::default().fg(self.accent)
    }

    pub fn error(&self) -> Style {
        Style::default().fg(self.danger).add_modifier(Modifier::BOLD)
    }

    /// Pulse glyph style, fading toward the background as brightness drops
    pub fn pulse_style(&self, brightness: f32) -> Style {
        let b = brightness.clamp(0.0, 1.0);
        let bg = match self.bg {
            Color::Rgb(r, g, b) => (r, g, b),
            _ => (0, 0, 0),
        };
        let mix = |hi: u8, lo: u8| (lo as f32 + (hi as f32 - lo as f32) * b).round() as u8;
        let (r, g, bl) = self.pulse;
        Style::default().fg(Color::Rgb(mix(r, bg.0), mix(g, bg.1), mix(bl, bg.2)))
    }
}

/// Phosphor green CRT theme
pub const PHOSPHOR: Theme = Theme {
    name: "phosphor",
    fg: Color::Rgb(51, 255, 51),
    fg_dim: Color::Rgb(25, 128, 25),
    bg: Color::Rgb(0, 10, 0),
    highlight: Color::Rgb(180, 255, 180),
    accent: Color::Rgb(100, 255, 100),
    danger: Color::Rgb(255, 100, 100),
    pulse: (255, 255, 255),
};

/// Amber monochrome theme
pub const AMBER: Theme = Theme {
    name: "amber",
    fg: Color::Rgb(255, 176, 0),
    fg_dim: Color::Rgb(128, 88, 0),
    bg: Color::Rgb(10, 5, 0),
    highlight: Color::Rgb(255, 220, 128),
    accent: Color::Rgb(255, 200, 64),
    danger: Color::Rgb(255, 100, 100),
    pulse: (255, 240, 200),
};

impl Default for Theme {
    fn default() -> Self {
        PHOSPHOR
    }
}

impl Theme {
    /// Look a theme up by name
    pub fn by_name(name: &str) -> Option<Theme> {
        [PHOSPHOR, AMBER].into_iter().find(|t| t.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pulse_fades_to_background() {
        let theme = PHOSPHOR;
        assert_eq!(theme.pulse_style(1.0).fg, Some(Color::Rgb(255, 255, 255)));
        assert_eq!(theme.pulse_style(0.0).fg, Some(Color::Rgb(0, 10, 0)));
        assert_eq!(theme.pulse_style(7.0), theme.pulse_style(1.0));
    }

    #[test]
    fn test_by_name() {
        assert_eq!(Theme::by_name("amber").map(|t| t.name), Some("amber"));
        assert!(Theme::by_name("neon").is_none());
    }
}
