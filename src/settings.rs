use std::path::Path;

use serde_json::{
    Map,
    Value,
};

use crate::{
    core::SyncError,
    persistence::load_json,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    ApiKey,
    SessionToken,
    MiningDeck,
    WordFields,
}

impl SettingKey {
    pub const ALL: [SettingKey; 4] =
        [SettingKey::ApiKey, SettingKey::SessionToken, SettingKey::MiningDeck, SettingKey::WordFields];

    pub fn name(&self) -> &'static str {
        match self {
            SettingKey::ApiKey => "jpdb_api_key",
            SettingKey::SessionToken => "jpdb_session_token",
            SettingKey::MiningDeck => "jpdb_mining_deck",
            SettingKey::WordFields => "word_fields",
        }
    }

    pub fn default_value(&self) -> Value {
        match self {
            SettingKey::ApiKey | SettingKey::SessionToken => Value::Null,
            SettingKey::MiningDeck => Value::from(1),
            SettingKey::WordFields => Value::from("Target"),
        }
    }

    pub fn from_name(name: &str) -> Result<Self, SyncError> {
        Self::ALL
            .into_iter()
            .find(|key| key.name() == name)
            .ok_or_else(|| SyncError::UnknownSetting(name.to_string()))
    }
}

/// Add-on configuration as the host stores it, falling back to fixed defaults.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: Map<String, Value>,
}

impl Settings {
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let values: Map<String, Value> = load_json(path)?;
        Ok(Self { values })
    }

    pub fn set(&mut self, key: SettingKey, value: impl Into<Value>) {
        self.values.insert(key.name().to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Result<Value, SyncError> {
        let key = SettingKey::from_name(key)?;
        Ok(self.value(key))
    }

    fn value(&self, key: SettingKey) -> Value {
        self.values.get(key.name()).cloned().unwrap_or_else(|| key.default_value())
    }

    fn optional_string(&self, key: SettingKey) -> Result<Option<String>, SyncError> {
        match self.value(key) {
            Value::Null => Ok(None),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Err(invalid(key, format!("expected a string, got {other}"))),
        }
    }

    pub fn api_key(&self) -> Result<Option<String>, SyncError> {
        self.optional_string(SettingKey::ApiKey)
    }

    pub fn session_token(&self) -> Result<Option<String>, SyncError> {
        self.optional_string(SettingKey::SessionToken)
    }

    pub fn mining_deck(&self) -> Result<u64, SyncError> {
        let key = SettingKey::MiningDeck;
        match self.value(key) {
            Value::Number(n) => n.as_u64().ok_or_else(|| invalid(key, format!("{n} is not a deck id"))),
            Value::String(s) => {
                s.trim().parse().map_err(|_| invalid(key, format!("{s:?} is not a deck id")))
            }
            other => Err(invalid(key, format!("expected a deck id, got {other}"))),
        }
    }

    /// Candidate note fields, in the order they should be tried.
    pub fn word_fields(&self) -> Result<Vec<String>, SyncError> {
        let key = SettingKey::WordFields;
        match self.value(key) {
            Value::String(s) => Ok(s
                .split(',')
                .map(str::trim)
                .filter(|field| !field.is_empty())
                .map(str::to_string)
                .collect()),
            other => Err(invalid(key, format!("expected a comma separated list, got {other}"))),
        }
    }
}

fn invalid(key: SettingKey, reason: String) -> SyncError {
    SyncError::InvalidSetting { key: key.name().to_string(), reason }
}
