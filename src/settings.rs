use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::format::SUPPORTED_CURRENCIES;
use crate::storage::{SlotStore, StorageError, SETTINGS_SLOT};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("unsupported currency {0:?}, expected one of GHS, USD, EUR, GBP")]
    UnsupportedCurrency(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub currency: String,
    pub is_dark_mode: bool,
    pub language: String,
    pub timezone: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            currency: "GHS".to_string(),
            is_dark_mode: false,
            language: "en".to_string(),
            timezone: "Africa/Accra".to_string(),
        }
    }
}

/// Display preferences backed by the settings slot.
#[derive(Debug)]
pub struct Settings {
    slots: SlotStore,
    preferences: Preferences,
}

impl Settings {
    pub fn open(slots: SlotStore) -> Result<Self, SettingsError> {
        let preferences = slots.load(SETTINGS_SLOT)?;
        Ok(Self { slots, preferences })
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn set_currency(&mut self, code: &str) -> Result<(), SettingsError> {
        let code = code.trim().to_ascii_uppercase();
        if !SUPPORTED_CURRENCIES.contains(&code.as_str()) {
            return Err(SettingsError::UnsupportedCurrency(code));
        }
        info!(currency = %code, "currency updated");
        self.preferences.currency = code;
        self.save()
    }

    /// Flips dark mode and returns the new value.
    pub fn toggle_dark_mode(&mut self) -> Result<bool, SettingsError> {
        self.preferences.is_dark_mode = !self.preferences.is_dark_mode;
        self.save()?;
        Ok(self.preferences.is_dark_mode)
    }

    pub fn set_language(&mut self, language: &str) -> Result<(), SettingsError> {
        self.preferences.language = language.to_string();
        self.save()
    }

    pub fn set_timezone(&mut self, timezone: &str) -> Result<(), SettingsError> {
        self.preferences.timezone = timezone.to_string();
        self.save()
    }

    fn save(&self) -> Result<(), SettingsError> {
        self.slots.save(SETTINGS_SLOT, &self.preferences)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_slot_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::open(SlotStore::new(dir.path())).unwrap();
        assert_eq!(settings.preferences(), &Preferences::default());
        assert_eq!(settings.preferences().currency, "GHS");
    }

    #[test]
    fn currency_change_persists() {
        let dir = tempfile::tempdir().unwrap();
        let slots = SlotStore::new(dir.path());
        let mut settings = Settings::open(slots.clone()).unwrap();
        settings.set_currency("usd").unwrap();
        settings.toggle_dark_mode().unwrap();

        let reopened = Settings::open(slots).unwrap();
        assert_eq!(reopened.preferences().currency, "USD");
        assert!(reopened.preferences().is_dark_mode);
    }

    #[test]
    fn rejects_unsupported_currency() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::open(SlotStore::new(dir.path())).unwrap();
        let err = settings.set_currency("XYZ").unwrap_err();
        assert!(matches!(err, SettingsError::UnsupportedCurrency(code) if code == "XYZ"));
        assert_eq!(settings.preferences().currency, "GHS");
    }

    #[test]
    fn partial_slot_fills_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let slots = SlotStore::new(dir.path());
        std::fs::write(slots.slot_path(SETTINGS_SLOT), r#"{"currency":"EUR"}"#).unwrap();
        let settings = Settings::open(slots).unwrap();
        assert_eq!(settings.preferences().currency, "EUR");
        assert_eq!(settings.preferences().timezone, "Africa/Accra");
    }
}
