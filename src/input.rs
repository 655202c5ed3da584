use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use log::{debug, error};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::controller::Command;

pub fn command_for_key(key: &KeyEvent) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Command::Quit),
        KeyCode::Char('s') | KeyCode::Char('S') | KeyCode::Char(' ') => Some(Command::Toggle),
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(Command::Quit),
        _ => None,
    }
}

/// Forwards key presses from the terminal as loop commands until the
/// receiver goes away.
pub fn spawn_keyboard(tx: UnboundedSender<Command>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut events = EventStream::new();
        while let Some(event) = events.next().await {
            match event {
                Ok(Event::Key(key)) => {
                    if let Some(command) = command_for_key(&key) {
                        debug!("key {:?} -> {command:?}", key.code);
                        if tx.send(command).is_err() {
                            break;
                        }
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    error!("terminal event error: {err}");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(command_for_key(&press(KeyCode::Char('s'))), Some(Command::Toggle));
        assert_eq!(command_for_key(&press(KeyCode::Char(' '))), Some(Command::Toggle));
        assert_eq!(command_for_key(&press(KeyCode::Char('q'))), Some(Command::Quit));
        assert_eq!(command_for_key(&press(KeyCode::Esc)), Some(Command::Quit));
        assert_eq!(command_for_key(&press(KeyCode::Char('x'))), None);
    }

    #[test]
    fn test_ctrl_c_quits() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(command_for_key(&key), Some(Command::Quit));
        assert_eq!(command_for_key(&press(KeyCode::Char('c'))), None);
    }

    #[test]
    fn test_key_release_ignored() {
        let key = KeyEvent::new_with_kind(KeyCode::Char('s'), KeyModifiers::NONE, KeyEventKind::Release);
        assert_eq!(command_for_key(&key), None);
    }
}
