use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use foreman_core::{ConversionError, Environment, Result};
use serde_json::Value;

/// The type a slave parameter expects its argument coerced to.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    /// Accept anything; `$name` indirection is still resolved.
    Any,
    String,
    Int,
    Float,
    Bool,
    /// A plain table — nested `$name` values are resolved deeply.
    Map,
    /// A plain array — nested `$name` values are resolved deeply.
    List,
    /// Alternatives tried left-to-right; the first success wins.
    Union(Vec<ParamType>),
    /// Dispatched through the registered-function table by tag.
    Custom(String),
}

impl ParamType {
    pub fn union(alternatives: impl IntoIterator<Item = ParamType>) -> Self {
        ParamType::Union(alternatives.into_iter().collect())
    }

    pub fn custom(tag: impl Into<String>) -> Self {
        ParamType::Custom(tag.into())
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Any => write!(f, "any"),
            ParamType::String => write!(f, "string"),
            ParamType::Int => write!(f, "int"),
            ParamType::Float => write!(f, "float"),
            ParamType::Bool => write!(f, "bool"),
            ParamType::Map => write!(f, "map"),
            ParamType::List => write!(f, "list"),
            ParamType::Union(alts) => {
                let names: Vec<String> = alts.iter().map(ParamType::to_string).collect();
                write!(f, "union<{}>", names.join("|"))
            }
            ParamType::Custom(tag) => write!(f, "{tag}"),
        }
    }
}

/// A registered conversion function for a custom type tag.
pub type ConvertFn =
    Arc<dyn Fn(&Environment, &Value) -> std::result::Result<Value, String> + Send + Sync>;

/// Type-directed argument conversion.
///
/// Built-in targets are handled structurally; custom tags dispatch through
/// an explicit function table populated at startup and threaded to every
/// call site — there is no ambient global registry.
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    custom: HashMap<String, ConvertFn>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a conversion function for a custom type tag, replacing any
    /// previous one.
    pub fn register<F>(&mut self, tag: impl Into<String>, convert: F)
    where
        F: Fn(&Environment, &Value) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        self.custom.insert(tag.into(), Arc::new(convert));
    }

    /// Coerce `raw` to `target`. `$name` indirection is resolved before the
    /// type is considered, so a redirected value converts like an inline one.
    ///
    /// Failures wrap into a [`ConversionError`] carrying the parameter key,
    /// the raw value, and the converter that gave up — always a Setup-time
    /// failure.
    pub fn convert(
        &self,
        env: &Environment,
        target: &ParamType,
        key: &str,
        raw: &Value,
    ) -> Result<Value> {
        let resolved = env.resolve(raw)?;
        self.coerce(env, target, &resolved)
            .map_err(|reason| {
                ConversionError {
                    key: key.to_string(),
                    value: raw.clone(),
                    converter: target.to_string(),
                    reason,
                }
                .into()
            })
    }

    fn coerce(
        &self,
        env: &Environment,
        target: &ParamType,
        value: &Value,
    ) -> std::result::Result<Value, String> {
        match target {
            ParamType::Any => env
                .resolve_deep(value)
                .map_err(|e| e.to_string()),

            ParamType::String => match value {
                Value::String(s) => Ok(Value::String(s.clone())),
                other => Err(format!("expected a string, got {}", type_name(other))),
            },

            ParamType::Int => match value {
                Value::Number(n) if n.as_i64().is_some() => Ok(value.clone()),
                Value::String(s) => s
                    .parse::<i64>()
                    .map(Value::from)
                    .map_err(|_| format!("\"{s}\" is not an integer")),
                other => Err(format!("expected an integer, got {}", type_name(other))),
            },

            ParamType::Float => match value {
                Value::Number(n) => match n.as_f64() {
                    Some(f) => Ok(Value::from(f)),
                    None => Err("number does not fit a float".to_string()),
                },
                Value::String(s) => s
                    .parse::<f64>()
                    .map(Value::from)
                    .map_err(|_| format!("\"{s}\" is not a number")),
                other => Err(format!("expected a number, got {}", type_name(other))),
            },

            ParamType::Bool => match value {
                Value::Bool(_) => Ok(value.clone()),
                Value::String(s) => match s.as_str() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    _ => Err(format!("\"{s}\" is not a boolean")),
                },
                other => Err(format!("expected a boolean, got {}", type_name(other))),
            },

            ParamType::Map => match value {
                Value::Object(_) => env.resolve_deep(value).map_err(|e| e.to_string()),
                other => Err(format!("expected a table, got {}", type_name(other))),
            },

            ParamType::List => match value {
                Value::Array(_) => env.resolve_deep(value).map_err(|e| e.to_string()),
                other => Err(format!("expected an array, got {}", type_name(other))),
            },

            ParamType::Union(alternatives) => {
                for alt in alternatives {
                    if let Ok(converted) = self.coerce(env, alt, value) {
                        return Ok(converted);
                    }
                }
                Err(format!(
                    "value {value} matched no alternative of the union"
                ))
            }

            ParamType::Custom(tag) => match self.custom.get(tag) {
                Some(convert) => convert(env, value),
                None => Err(format!("no converter registered for <{tag}>")),
            },
        }
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a table",
    }
}
