use std::time::Duration;
use tracing::trace;

use csvbrowse::domain::{BrowseConfig, BrowseError, Message};
use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};

use crate::model::Model;

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &BrowseConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, BrowseError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            match event::read()? {
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    if model.raw_keyevents() {
                        return Ok(Some(Message::RawKey(key)));
                    }
                    return Ok(self.handle_key(key));
                }
                Event::Resize(width, height) => {
                    return Ok(Some(Message::Resize(width as usize, height as usize)));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    pub fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') => Some(Message::Quit),
                _ => None,
            };
        }
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Esc => Some(Message::Exit),
            KeyCode::Up | KeyCode::Char('k') => Some(Message::MoveUp),
            KeyCode::Down | KeyCode::Char('j') => Some(Message::MoveDown),
            KeyCode::Left | KeyCode::Char('h') => Some(Message::MoveLeft),
            KeyCode::Right | KeyCode::Char('l') => Some(Message::MoveRight),
            KeyCode::PageDown | KeyCode::Char('n') => Some(Message::NextPage),
            KeyCode::PageUp | KeyCode::Char('p') => Some(Message::PrevPage),
            KeyCode::Home | KeyCode::Char('g') => Some(Message::FirstPage),
            KeyCode::End | KeyCode::Char('G') => Some(Message::LastPage),
            KeyCode::Char('P') => Some(Message::GotoPage),
            KeyCode::Char('/') => Some(Message::Search),
            KeyCode::Char('f') => Some(Message::Filter),
            KeyCode::Char('F') => Some(Message::RemoveFilter),
            KeyCode::Char('c') => Some(Message::ClearFilters),
            KeyCode::Char('s') => Some(Message::Sort),
            KeyCode::Char('S') => Some(Message::ClearSort),
            KeyCode::Char('x') => Some(Message::HideColumn),
            KeyCode::Char('a') => Some(Message::ShowAllColumns),
            KeyCode::Char('<') => Some(Message::MoveColumnLeft),
            KeyCode::Char('>') => Some(Message::MoveColumnRight),
            KeyCode::Char('+') => Some(Message::CyclePageSize),
            KeyCode::Char('o') => Some(Message::Open),
            KeyCode::Char('D') => Some(Message::RemoveFile),
            KeyCode::Char('e') => Some(Message::Export),
            KeyCode::Char('y') => Some(Message::CopyCell),
            KeyCode::Char('Y') => Some(Message::CopyRow),
            KeyCode::Char(':') => Some(Message::EnterCommand),
            KeyCode::Char('?') => Some(Message::Help),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn maps_keys_to_messages() {
        let controller = Controller::new(&BrowseConfig::default());
        assert_eq!(controller.handle_key(key(KeyCode::Char('q'))), Some(Message::Quit));
        assert_eq!(controller.handle_key(key(KeyCode::Char('/'))), Some(Message::Search));
        assert_eq!(controller.handle_key(key(KeyCode::PageDown)), Some(Message::NextPage));
        assert_eq!(controller.handle_key(key(KeyCode::Char('G'))), Some(Message::LastPage));
        assert_eq!(controller.handle_key(key(KeyCode::Char('Z'))), None);
        assert_eq!(
            controller.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Message::Quit)
        );
    }
}
