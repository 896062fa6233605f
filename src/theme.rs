use anyhow::Result;
use std::sync::{Arc, Mutex};

use crate::store::{LocalStore, THEME_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// Persisted light/dark preference.
pub struct ThemeStore {
    store: Arc<LocalStore>,
    current: Mutex<Theme>,
}

impl ThemeStore {
    pub fn hydrate(store: Arc<LocalStore>, system_default: Theme) -> Result<Self> {
        let stored = store.get(THEME_KEY)?;
        let current = stored
            .as_deref()
            .and_then(Theme::parse)
            .unwrap_or(system_default);
        Ok(Self {
            store,
            current: Mutex::new(current),
        })
    }

    pub fn theme(&self) -> Theme {
        *self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set(&self, theme: Theme) -> Result<()> {
        let mut current = self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.store.set(THEME_KEY, theme.as_str())?;
        *current = theme;
        Ok(())
    }

    pub fn toggle(&self) -> Result<Theme> {
        let next = self.theme().toggled();
        self.set(next)?;
        Ok(next)
    }
}
