//! Configuration schemas shared by every configurable subsystem.
//!
//! A subsystem (session options, mobility models, EMANE models) declares its
//! options in a fixed order together with named groups that cover contiguous,
//! 1-based inclusive ranges of that order. Current values always travel as
//! strings; the declared [`ConfigValue`] of each option decides how a string
//! is validated and which wire type code it carries.
//!
//! [`build_groups`] turns a value map plus a schema into display groups.
//! It assumes the groups partition the option list and does not check it.

use crate::emulator::events::{ConfigData, ConfigFlag};
use crate::emulator::node::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Wire type codes for configuration values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigDataType {
    Int32,
    Float,
    String,
    Bool,
}

impl ConfigDataType {
    pub fn code(self) -> u32 {
        match self {
            ConfigDataType::Int32 => 7,
            ConfigDataType::Float => 9,
            ConfigDataType::String => 10,
            ConfigDataType::Bool => 11,
        }
    }
}

/// A typed configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConfigValue {
    String(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl ConfigValue {
    pub fn data_type(&self) -> ConfigDataType {
        match self {
            ConfigValue::String(_) => ConfigDataType::String,
            ConfigValue::Bool(_) => ConfigDataType::Bool,
            ConfigValue::Int(_) => ConfigDataType::Int32,
            ConfigValue::Float(_) => ConfigDataType::Float,
        }
    }

    /// Parses `raw` as a value of the same variant as `self`.
    pub fn parse_like(&self, raw: &str) -> Option<ConfigValue> {
        let trimmed = raw.trim();
        match self {
            ConfigValue::String(_) => Some(ConfigValue::String(raw.to_string())),
            ConfigValue::Bool(_) => match trimmed.to_ascii_lowercase().as_str() {
                "1" | "true" | "on" => Some(ConfigValue::Bool(true)),
                "0" | "false" | "off" => Some(ConfigValue::Bool(false)),
                _ => None,
            },
            ConfigValue::Int(_) => trimmed.parse().ok().map(ConfigValue::Int),
            ConfigValue::Float(_) => trimmed.parse().ok().map(ConfigValue::Float),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::String(value) => write!(f, "{}", value),
            ConfigValue::Bool(true) => write!(f, "1"),
            ConfigValue::Bool(false) => write!(f, "0"),
            ConfigValue::Int(value) => write!(f, "{}", value),
            ConfigValue::Float(value) => write!(f, "{}", value),
        }
    }
}

/// One declared option of a subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurableOption {
    pub id: String,
    pub label: String,
    pub default: ConfigValue,
    pub choices: Vec<String>,
}

impl ConfigurableOption {
    pub fn string(id: &str, label: &str, default: &str) -> Self {
        Self::new(id, label, ConfigValue::String(default.to_string()))
    }

    pub fn boolean(id: &str, label: &str, default: bool) -> Self {
        Self::new(id, label, ConfigValue::Bool(default)).with_choices(&["On", "Off"])
    }

    pub fn int(id: &str, label: &str, default: i64) -> Self {
        Self::new(id, label, ConfigValue::Int(default))
    }

    pub fn float(id: &str, label: &str, default: f64) -> Self {
        Self::new(id, label, ConfigValue::Float(default))
    }

    pub fn with_choices(mut self, choices: &[&str]) -> Self {
        self.choices = choices.iter().map(|c| c.to_string()).collect();
        self
    }

    fn new(id: &str, label: &str, default: ConfigValue) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            default,
            choices: Vec::new(),
        }
    }
}

/// A named, 1-based inclusive range over a schema's option order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigGroupDecl {
    pub name: String,
    pub start: usize,
    pub stop: usize,
}

/// A rejected value for a declared option.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError {
    pub key: String,
    pub value: String,
    pub expected: ConfigDataType,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid value '{}' for '{}' (expected {:?})",
            self.value, self.key, self.expected
        )
    }
}

impl std::error::Error for ConfigError {}

/// Declared options and groups of one configurable subsystem.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSchema {
    name: String,
    bitmap: Option<String>,
    options: Vec<ConfigurableOption>,
    groups: Vec<ConfigGroupDecl>,
}

impl ConfigSchema {
    pub fn builder(name: &str) -> ConfigSchemaBuilder {
        ConfigSchemaBuilder {
            schema: ConfigSchema {
                name: name.to_string(),
                bitmap: None,
                options: Vec::new(),
                groups: Vec::new(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bitmap(&self) -> Option<&str> {
        self.bitmap.as_deref()
    }

    pub fn options(&self) -> &[ConfigurableOption] {
        &self.options
    }

    pub fn groups(&self) -> &[ConfigGroupDecl] {
        &self.groups
    }

    pub fn option(&self, id: &str) -> Option<&ConfigurableOption> {
        self.options.iter().find(|option| option.id == id)
    }

    /// Default value of every declared option, stringified.
    pub fn defaults(&self) -> BTreeMap<String, String> {
        self.options
            .iter()
            .map(|option| (option.id.clone(), option.default.to_string()))
            .collect()
    }

    /// Checks every declared key in `values` against its declared type.
    /// Keys the schema does not declare are accepted as-is.
    pub fn validate(&self, values: &BTreeMap<String, String>) -> Result<(), ConfigError> {
        for (key, value) in values {
            if let Some(option) = self.option(key) {
                if option.default.parse_like(value).is_none() {
                    return Err(ConfigError {
                        key: key.clone(),
                        value: value.clone(),
                        expected: option.default.data_type(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Validates `updates` and applies them on top of `base`. Nothing is
    /// applied when any value is rejected.
    pub fn apply(
        &self,
        base: &mut BTreeMap<String, String>,
        updates: BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        self.validate(&updates)?;
        base.extend(updates);
        Ok(())
    }

    /// Flattens `values` into the pipe separated config payload carried by
    /// config events. Missing values fall back to defaults.
    pub fn config_data(
        &self,
        node: Option<NodeId>,
        flag: ConfigFlag,
        values: &BTreeMap<String, String>,
    ) -> ConfigData {
        let value_of = |option: &ConfigurableOption| {
            values
                .get(&option.id)
                .cloned()
                .unwrap_or_else(|| option.default.to_string())
        };
        let join = |parts: Vec<String>| parts.join("|");
        ConfigData {
            message_type: 0,
            node,
            object: self.name.clone(),
            config_type: flag.code(),
            data_types: self
                .options
                .iter()
                .map(|option| option.default.data_type().code())
                .collect(),
            data_values: join(
                self.options
                    .iter()
                    .map(|option| format!("{}={}", option.id, value_of(option)))
                    .collect(),
            ),
            captions: Some(join(
                self.options.iter().map(|option| option.label.clone()).collect(),
            )),
            bitmap: self.bitmap.clone(),
            possible_values: Some(join(
                self.options
                    .iter()
                    .map(|option| option.choices.join(","))
                    .collect(),
            )),
            groups: Some(join(
                self.groups
                    .iter()
                    .map(|group| format!("{}:{}-{}", group.name, group.start, group.stop))
                    .collect(),
            )),
            ..ConfigData::default()
        }
    }
}

pub struct ConfigSchemaBuilder {
    schema: ConfigSchema,
}

impl ConfigSchemaBuilder {
    pub fn option(mut self, option: ConfigurableOption) -> Self {
        self.schema.options.push(option);
        self
    }

    /// Adds a group covering `start..=stop` (1-based) of the options.
    pub fn group(mut self, name: &str, start: usize, stop: usize) -> Self {
        self.schema.groups.push(ConfigGroupDecl {
            name: name.to_string(),
            start,
            stop,
        });
        self
    }

    pub fn bitmap(mut self, bitmap: &str) -> Self {
        self.schema.bitmap = Some(bitmap.to_string());
        self
    }

    pub fn build(self) -> ConfigSchema {
        self.schema
    }
}

/// Display record for one option.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigOptionView {
    pub label: String,
    pub id: String,
    pub value: String,
    pub data_type: ConfigDataType,
    pub choices: Vec<String>,
}

/// A named group of option records in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigGroup {
    pub name: String,
    pub options: Vec<ConfigOptionView>,
}

/// Builds the display groups of `schema` using `values`, falling back to
/// each option's default for keys missing from `values`.
pub fn build_groups(values: &BTreeMap<String, String>, schema: &ConfigSchema) -> Vec<ConfigGroup> {
    let records: Vec<ConfigOptionView> = schema
        .options()
        .iter()
        .map(|option| ConfigOptionView {
            label: option.label.clone(),
            id: option.id.clone(),
            value: values
                .get(&option.id)
                .cloned()
                .unwrap_or_else(|| option.default.to_string()),
            data_type: option.default.data_type(),
            choices: option.choices.clone(),
        })
        .collect();

    schema
        .groups()
        .iter()
        .map(|group| {
            let start = group.start.saturating_sub(1);
            let stop = group.stop.min(records.len());
            let options = records
                .get(start..stop)
                .map(|slice| slice.to_vec())
                .unwrap_or_default();
            ConfigGroup {
                name: group.name.clone(),
                options,
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "tests/configurable_tests.rs"]
mod tests;
