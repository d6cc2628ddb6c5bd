//! Page-advance keystroke injection.
//!
//! The document viewer is driven by synthetic key presses sent to the
//! foreground window. `enigo` does the OS work; the pipeline only sees
//! the `KeyInjector` trait.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Keys that move a document viewer to its next page.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum PageKey {
    #[default]
    PageDown,
    Space,
    Enter,
    RightArrow,
    DownArrow,
}

impl PageKey {
    pub const ALL: [PageKey; 5] = [
        PageKey::PageDown,
        PageKey::Space,
        PageKey::Enter,
        PageKey::RightArrow,
        PageKey::DownArrow,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PageKey::PageDown => "Page Down",
            PageKey::Space => "Space",
            PageKey::Enter => "Enter",
            PageKey::RightArrow => "Right Arrow",
            PageKey::DownArrow => "Down Arrow",
        }
    }

    fn to_enigo(self) -> enigo::Key {
        use enigo::Key;
        match self {
            PageKey::PageDown => Key::PageDown,
            PageKey::Space => Key::Space,
            PageKey::Enter => Key::Return,
            PageKey::RightArrow => Key::RightArrow,
            PageKey::DownArrow => Key::DownArrow,
        }
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Sends one page-advance keystroke to the foreground window.
pub trait KeyInjector {
    fn press(&mut self, key: PageKey) -> Result<(), KeyError>;
}

impl<K: KeyInjector + ?Sized> KeyInjector for Box<K> {
    fn press(&mut self, key: PageKey) -> Result<(), KeyError> {
        (**self).press(key)
    }
}

/// Real keyboard backed by `enigo`.
///
/// A fresh `Enigo` connection is opened per press, so the injector itself
/// carries no platform handle and can move to the worker thread freely.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnigoKeyboard;

impl KeyInjector for EnigoKeyboard {
    fn press(&mut self, key: PageKey) -> Result<(), KeyError> {
        use enigo::{Direction, Enigo, Keyboard, Settings};

        log::debug!("Sending {} via enigo", key);

        let mut enigo =
            Enigo::new(&Settings::default()).map_err(|e| KeyError::Connect(e.to_string()))?;
        enigo
            .key(key.to_enigo(), Direction::Click)
            .map_err(|e| KeyError::Send {
                key,
                reason: e.to_string(),
            })?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("Failed to open keyboard injection backend: {0}")]
    Connect(String),

    #[error("Failed to send {key}: {reason}")]
    Send { key: PageKey, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_key_is_page_down() {
        assert_eq!(PageKey::default(), PageKey::PageDown);
    }

    #[test]
    fn labels_match_operator_wording() {
        let labels: Vec<&str> = PageKey::ALL.iter().map(|k| k.label()).collect();
        assert_eq!(
            labels,
            ["Page Down", "Space", "Enter", "Right Arrow", "Down Arrow"]
        );
    }

    #[test]
    fn serializes_as_kebab_case() {
        let json = serde_json::to_string(&PageKey::RightArrow).unwrap();
        assert_eq!(json, "\"right-arrow\"");
        let key: PageKey = serde_json::from_str("\"down-arrow\"").unwrap();
        assert_eq!(key, PageKey::DownArrow);
    }
}
