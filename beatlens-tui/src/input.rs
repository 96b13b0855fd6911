//! Modal keyboard handling

use beatlens_core::{FormResponse, MenuAction};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Seek step for the arrow keys, in seconds
pub const SEEK_STEP: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    /// Context menu open
    Menu,
    /// Settings form open
    Settings,
}

impl Mode {
    pub fn display_name(&self) -> &'static str {
        match self {
            Mode::Normal => "PLAY",
            Mode::Menu => "MENU",
            Mode::Settings => "SETTINGS",
        }
    }
}

/// Commands produced by key presses
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Quit,
    NextTrack,
    PrevTrack,
    TogglePause,
    /// Relative seek in seconds
    Seek(f32),
    OpenMenu,
    CloseMenu,
    Menu(MenuAction),
    FormNext,
    FormPrev,
    FormAdjust(i32),
    FormRespond(FormResponse),
}

/// Turns key events into commands, tracking the current mode
#[derive(Debug, Default)]
pub struct InputHandler {
    mode: Mode,
    menu_index: usize,
}

impl InputHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Highlighted context menu entry
    pub fn menu_index(&self) -> usize {
        self.menu_index
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Command> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(Command::Quit);
        }
        match self.mode {
            Mode::Normal => self.handle_normal_mode(key),
            Mode::Menu => self.handle_menu_mode(key),
            Mode::Settings => self.handle_settings_mode(key),
        }
    }

    fn handle_normal_mode(&mut self, key: KeyEvent) -> Option<Command> {
        match key.code {
            KeyCode::Char('q') => Some(Command::Quit),
            KeyCode::Char('n') => Some(Command::NextTrack),
            KeyCode::Char('p') => Some(Command::PrevTrack),
            KeyCode::Char(' ') => Some(Command::TogglePause),
            KeyCode::Char('h') | KeyCode::Left => Some(Command::Seek(-SEEK_STEP)),
            KeyCode::Char('l') | KeyCode::Right => Some(Command::Seek(SEEK_STEP)),
            KeyCode::Char('m') | KeyCode::Tab => {
                self.mode = Mode::Menu;
                self.menu_index = 0;
                Some(Command::OpenMenu)
            }
            // Menu shortcuts
            KeyCode::Char('c') => {
                self.mode = Mode::Settings;
                Some(Command::Menu(MenuAction::Configure))
            }
            KeyCode::Char('r') => Some(Command::Menu(MenuAction::Recalculate)),
            _ => None,
        }
    }

    fn handle_menu_mode(&mut self, key: KeyEvent) -> Option<Command> {
        let len = MenuAction::ALL.len();
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.menu_index = (self.menu_index + 1) % len;
                None
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.menu_index = (self.menu_index + len - 1) % len;
                None
            }
            KeyCode::Enter => {
                let action = MenuAction::ALL[self.menu_index];
                self.mode = match action {
                    MenuAction::Configure => Mode::Settings,
                    MenuAction::Recalculate => Mode::Normal,
                };
                Some(Command::Menu(action))
            }
            KeyCode::Esc | KeyCode::Char('m') | KeyCode::Tab => {
                self.mode = Mode::Normal;
                Some(Command::CloseMenu)
            }
            _ => None,
        }
    }

    fn handle_settings_mode(&mut self, key: KeyEvent) -> Option<Command> {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => Some(Command::FormNext),
            KeyCode::Char('k') | KeyCode::Up => Some(Command::FormPrev),
            KeyCode::Char('h') | KeyCode::Left | KeyCode::Char('-') => Some(Command::FormAdjust(-1)),
            KeyCode::Char('l') | KeyCode::Right | KeyCode::Char('+') | KeyCode::Char(' ') => {
                Some(Command::FormAdjust(1))
            }
            KeyCode::Char('a') => Some(Command::FormRespond(FormResponse::Apply)),
            KeyCode::Enter => {
                self.mode = Mode::Normal;
                Some(Command::FormRespond(FormResponse::Ok))
            }
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                Some(Command::FormRespond(FormResponse::Cancel))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(handler: &mut InputHandler, code: KeyCode) -> Option<Command> {
        handler.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn test_menu_navigation() {
        let mut handler = InputHandler::new();
        assert_eq!(press(&mut handler, KeyCode::Char('m')), Some(Command::OpenMenu));
        assert_eq!(handler.mode(), Mode::Menu);

        press(&mut handler, KeyCode::Down);
        assert_eq!(handler.menu_index(), 1);
        assert_eq!(
            press(&mut handler, KeyCode::Enter),
            Some(Command::Menu(MenuAction::Recalculate))
        );
        assert_eq!(handler.mode(), Mode::Normal);
    }

    #[test]
    fn test_settings_mode_round_trip() {
        let mut handler = InputHandler::new();
        assert_eq!(
            press(&mut handler, KeyCode::Char('c')),
            Some(Command::Menu(MenuAction::Configure))
        );
        assert_eq!(handler.mode(), Mode::Settings);
        assert_eq!(press(&mut handler, KeyCode::Right), Some(Command::FormAdjust(1)));
        assert_eq!(
            press(&mut handler, KeyCode::Char('a')),
            Some(Command::FormRespond(FormResponse::Apply))
        );
        assert_eq!(handler.mode(), Mode::Settings);
        assert_eq!(
            press(&mut handler, KeyCode::Esc),
            Some(Command::FormRespond(FormResponse::Cancel))
        );
        assert_eq!(handler.mode(), Mode::Normal);
    }

    #[test]
    fn test_ctrl_c_quits_from_any_mode() {
        let mut handler = InputHandler::new();
        press(&mut handler, KeyCode::Char('c'));
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handler.handle_key(ctrl_c), Some(Command::Quit));
    }
}
