//! Core configuration types
//!
//! This module defines the data structures that represent a tasks.yaml configuration file.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Top-level configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Schema version (informational)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Static variables substituted into `{{.NAME}}` placeholders
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub vars: HashMap<String, String>,

    /// Tasks defined in the configuration
    #[serde(default)]
    pub tasks: BTreeMap<String, Task>,

    /// Shell used to run commands (e.g., ["bash", "-c"])
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<Vec<String>>,
}

/// A task definition
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Task {
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,

    /// Tasks that must complete before this one
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "deserialize_string_list"
    )]
    pub deps: Vec<String>,

    /// Command templates, run in order
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "deserialize_string_list"
    )]
    pub cmds: Vec<String>,

    /// Interactive fields, in the order they are declared
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "deserialize_prompts",
        serialize_with = "serialize_prompts"
    )]
    pub interactive: Vec<(String, Prompt)>,
}

/// An interactive prompt definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Prompt {
    /// Message shown to the operator
    #[serde(default)]
    pub message: String,

    /// Whether an empty answer is an error
    #[serde(default)]
    pub required: bool,

    /// Value used when the answer is empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Prompt {
    /// The default value, treating an empty string as absent
    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref().filter(|d| !d.is_empty())
    }
}

impl Config {
    /// Look up a task by name
    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }
}

/// Custom deserializer for lists that also accept a single string
fn deserialize_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    use serde_yaml::Value;

    let value = Value::deserialize(deserializer)?;

    match value {
        Value::String(s) => Ok(vec![s]),
        Value::Sequence(seq) => seq
            .into_iter()
            .map(|item| String::deserialize(item).map_err(D::Error::custom))
            .collect(),
        Value::Null => Ok(Vec::new()),
        _ => Err(D::Error::custom("expected a string or a list of strings")),
    }
}

/// Custom deserializer keeping interactive fields in declaration order
fn deserialize_prompts<'de, D>(deserializer: D) -> Result<Vec<(String, Prompt)>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    use serde_yaml::Value;

    let value = Value::deserialize(deserializer)?;

    match value {
        // serde_yaml::Mapping preserves insertion order
        Value::Mapping(map) => {
            let mut prompts = Vec::with_capacity(map.len());
            for (key, spec) in map {
                let name = match key {
                    Value::String(s) => s,
                    other => {
                        return Err(D::Error::custom(format!(
                            "interactive field name must be a string, got {:?}",
                            other
                        )))
                    }
                };
                let prompt = match spec {
                    // `field: "Message"` shorthand
                    Value::String(message) => Prompt {
                        message,
                        ..Prompt::default()
                    },
                    Value::Null => Prompt::default(),
                    other => Prompt::deserialize(other).map_err(D::Error::custom)?,
                };
                prompts.push((name, prompt));
            }
            Ok(prompts)
        }
        Value::Null => Ok(Vec::new()),
        _ => Err(D::Error::custom("interactive must be a mapping")),
    }
}

fn serialize_prompts<S>(prompts: &[(String, Prompt)], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeMap;

    let mut map = serializer.serialize_map(Some(prompts.len()))?;
    for (name, prompt) in prompts {
        map.serialize_entry(name, prompt)?;
    }
    map.end()
}
