use std::path::Path;

use figment::{
    providers::{Format, Toml},
    Figment,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Result, SetupError};

/// How many `$name` hops a single lookup may take before we call it a cycle.
const MAX_INDIRECTION_DEPTH: usize = 32;

/// The parsed task-definition document (foreman.toml).
///
/// Sections other than the four known ones are ignored; task and job tables
/// stay as raw [`Value`]s because their argument keys are slave-specific and
/// only get typed by the converter pipeline at load time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Document {
    /// Default values for `$name` resolution, overridable by real env vars.
    #[serde(default)]
    pub env: Map<String, Value>,

    /// Extensions to load before any task is constructed.
    #[serde(default)]
    pub ext: ExtNames,

    /// Carrier configuration, keyed by carrier name.
    #[serde(default)]
    pub notifications: Map<String, Value>,

    /// Task configuration, keyed by task id.
    #[serde(default)]
    pub tasks: Map<String, Value>,
}

impl Document {
    /// Load and deserialise a TOML definition file.
    pub fn load(path: &Path) -> Result<Self> {
        Figment::new()
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| SetupError::Config(e.to_string()))
    }

    /// Parse a definition from an in-memory TOML string.
    pub fn from_toml(toml: &str) -> Result<Self> {
        Figment::new()
            .merge(Toml::string(toml))
            .extract()
            .map_err(|e| SetupError::Config(e.to_string()))
    }
}

/// The `ext` key accepts a single name or a list of names.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ExtNames {
    One(String),
    Many(Vec<String>),
}

impl ExtNames {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        match self {
            ExtNames::One(name) => std::slice::from_ref(name).iter().map(String::as_str),
            ExtNames::Many(names) => names.as_slice().iter().map(String::as_str),
        }
    }
}

impl Default for ExtNames {
    fn default() -> Self {
        ExtNames::Many(Vec::new())
    }
}

/// Two-tier `$name` resolution: live process environment first, then the
/// static `[env]` section of the document.
///
/// A string value starting with `$` anywhere in the document redirects
/// through this table; the redirect target may itself redirect.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    defaults: Map<String, Value>,
}

impl Environment {
    pub fn new(defaults: Map<String, Value>) -> Self {
        Self { defaults }
    }

    /// Look up `key`, preferring a real environment variable over the
    /// `[env]` section. Missing in both tiers is a Setup failure.
    pub fn get(&self, key: &str) -> Result<Value> {
        self.get_at_depth(key, 0)
    }

    fn get_at_depth(&self, key: &str, depth: usize) -> Result<Value> {
        if depth >= MAX_INDIRECTION_DEPTH {
            return Err(SetupError::EnvLoop {
                key: key.to_string(),
            });
        }

        if let Ok(raw) = std::env::var(key) {
            let value = parse_env_value(key, &raw)?;
            return self.resolve_at_depth(&value, depth + 1);
        }

        match self.defaults.get(key) {
            Some(value) => self.resolve_at_depth(value, depth + 1),
            None => Err(SetupError::Env {
                key: key.to_string(),
            }),
        }
    }

    /// Resolve a single value: `"$name"` strings redirect, everything else
    /// is returned as-is. Nested containers are not descended into — see
    /// [`Environment::resolve_deep`] for that.
    pub fn resolve(&self, value: &Value) -> Result<Value> {
        self.resolve_at_depth(value, 0)
    }

    fn resolve_at_depth(&self, value: &Value, depth: usize) -> Result<Value> {
        match value {
            Value::String(s) => match s.strip_prefix('$') {
                Some(key) => self.get_at_depth(key, depth),
                None => Ok(value.clone()),
            },
            other => Ok(other.clone()),
        }
    }

    /// Resolve a value and every string inside it, recursively. This is what
    /// normalises a raw config subtree into a plain map/array structure.
    pub fn resolve_deep(&self, value: &Value) -> Result<Value> {
        match self.resolve(value)? {
            Value::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (k, v) in &map {
                    out.insert(k.clone(), self.resolve_deep(v)?);
                }
                Ok(Value::Object(out))
            }
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for v in &items {
                    out.push(self.resolve_deep(v)?);
                }
                Ok(Value::Array(out))
            }
            scalar => Ok(scalar),
        }
    }
}

/// Parse an environment variable into a typed value.
///
/// JSON-looking content (`{…}`, `[…]`, `"…"`) must parse as JSON or the key
/// is rejected; anything else is taken as a plain string, so `PORT=8080`
/// becomes a number and `NAME=alice` stays a string.
fn parse_env_value(key: &str, raw: &str) -> Result<Value> {
    match serde_json::from_str(raw) {
        Ok(value) => Ok(value),
        Err(_) => {
            let trimmed = raw.trim_start();
            if trimmed.starts_with('{') || trimmed.starts_with('[') || trimmed.starts_with('"') {
                return Err(SetupError::EnvParse {
                    key: key.to_string(),
                    value: raw.to_string(),
                });
            }
            Ok(Value::String(raw.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(pairs: &[(&str, Value)]) -> Environment {
        let mut defaults = Map::new();
        for (k, v) in pairs {
            defaults.insert(k.to_string(), v.clone());
        }
        Environment::new(defaults)
    }

    #[test]
    fn section_value_is_returned_when_no_env_var_exists() {
        let env = env(&[("answer", json!(42))]);
        assert_eq!(env.get("answer").unwrap(), json!(42));
    }

    #[test]
    fn live_env_var_wins_over_section() {
        std::env::set_var("FOREMAN_TEST_PRIORITY", "7");
        let env = env(&[("FOREMAN_TEST_PRIORITY", json!(1))]);
        assert_eq!(env.get("FOREMAN_TEST_PRIORITY").unwrap(), json!(7));
        std::env::remove_var("FOREMAN_TEST_PRIORITY");
    }

    #[test]
    fn missing_key_carries_a_hint() {
        let err = env(&[]).get("nope").unwrap_err();
        assert!(matches!(err, SetupError::Env { ref key } if key == "nope"));
        assert!(!err.hint().is_empty());
    }

    #[test]
    fn dollar_values_chain() {
        let env = env(&[("a", json!("$b")), ("b", json!("target"))]);
        assert_eq!(env.resolve(&json!("$a")).unwrap(), json!("target"));
    }

    #[test]
    fn reference_cycle_is_detected() {
        let env = env(&[("a", json!("$b")), ("b", json!("$a"))]);
        assert!(matches!(
            env.get("a").unwrap_err(),
            SetupError::EnvLoop { .. }
        ));
    }

    #[test]
    fn resolve_deep_normalises_nested_containers() {
        let env = env(&[("token", json!("s3cr3t"))]);
        let raw = json!({"auth": {"token": "$token"}, "ids": ["$token", 1]});
        let resolved = env.resolve_deep(&raw).unwrap();
        assert_eq!(
            resolved,
            json!({"auth": {"token": "s3cr3t"}, "ids": ["s3cr3t", 1]})
        );
    }

    #[test]
    fn malformed_structured_env_value_is_rejected() {
        std::env::set_var("FOREMAN_TEST_BROKEN", "{not json");
        let err = env(&[]).get("FOREMAN_TEST_BROKEN").unwrap_err();
        assert!(matches!(err, SetupError::EnvParse { .. }));
        std::env::remove_var("FOREMAN_TEST_BROKEN");
    }

    #[test]
    fn ext_accepts_string_or_list() {
        let one: Document = Document::from_toml(r#"ext = "network""#).unwrap();
        assert_eq!(one.ext.iter().collect::<Vec<_>>(), vec!["network"]);

        let many: Document = Document::from_toml(r#"ext = ["network", "shell"]"#).unwrap();
        assert_eq!(many.ext.iter().collect::<Vec<_>>(), vec!["network", "shell"]);
    }
}
