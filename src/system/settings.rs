// src/system/settings.rs

use crate::{
    constants::COMMANDS_SETTING,
    models::AppConfig,
    system::services::{SettingValue, SettingsProvider},
};
use std::collections::BTreeMap;

/// Settings read from the `[settings]` table, plus the `commands` list.
#[derive(Debug, Clone, Default)]
pub struct TomlSettings {
    table: toml::Table,
    commands: Vec<String>,
}

impl TomlSettings {
    /// Creates a provider over a settings table and the persisted command lines.
    pub fn new(table: toml::Table, commands: Vec<String>) -> Self {
        Self { table, commands }
    }

    /// Creates a provider from a loaded configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.settings.clone(), config.commands.clone())
    }
}

impl SettingsProvider for TomlSettings {
    fn lookup(&self, name: &str) -> Option<SettingValue> {
        if name == COMMANDS_SETTING {
            return Some(SettingValue::List(self.commands.clone()));
        }
        self.table.get(name).map(to_setting_value)
    }
}

fn to_setting_value(value: &toml::Value) -> SettingValue {
    match value {
        toml::Value::String(s) => SettingValue::String(s.clone()),
        toml::Value::Boolean(b) => SettingValue::Boolean(*b),
        toml::Value::Integer(n) => SettingValue::Long(*n),
        toml::Value::Array(items) => SettingValue::List(items.iter().map(to_plain_text).collect()),
        toml::Value::Table(table) => SettingValue::Map(
            table
                .iter()
                .map(|(k, v)| (k.clone(), to_plain_text(v)))
                .collect::<BTreeMap<_, _>>(),
        ),
        other => SettingValue::String(to_plain_text(other)),
    }
}

/// Strings without quotes, everything else in TOML notation.
fn to_plain_text(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
