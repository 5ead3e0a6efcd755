//! Keyboard commands understood outside of input prompts.

use crate::keys::KeyInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    /// `p`
    TogglePause,
    /// `s`
    Stop,
    /// `t`
    ToggleStopwatch,
    /// `i`
    AddPurpose,
    /// `g`
    ChangeTag,
}

impl KeyCommand {
    pub fn from_key(key: KeyInput) -> Option<Self> {
        match key {
            KeyInput::Char('p') => Some(KeyCommand::TogglePause),
            KeyInput::Char('s') => Some(KeyCommand::Stop),
            KeyInput::Char('t') => Some(KeyCommand::ToggleStopwatch),
            KeyInput::Char('i') => Some(KeyCommand::AddPurpose),
            KeyInput::Char('g') => Some(KeyCommand::ChangeTag),
            _ => None,
        }
    }

    /// The key echoed in `KeyPressed`.
    pub fn key(&self) -> char {
        match self {
            KeyCommand::TogglePause => 'p',
            KeyCommand::Stop => 's',
            KeyCommand::ToggleStopwatch => 't',
            KeyCommand::AddPurpose => 'i',
            KeyCommand::ChangeTag => 'g',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_key() {
        for c in ['p', 's', 't', 'i', 'g'] {
            let command = KeyCommand::from_key(KeyInput::Char(c)).unwrap();
            assert_eq!(command.key(), c);
        }
        assert_eq!(KeyCommand::from_key(KeyInput::Char('x')), None);
        assert_eq!(KeyCommand::from_key(KeyInput::Enter), None);
    }
}
