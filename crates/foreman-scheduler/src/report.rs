use std::collections::BTreeMap;

use foreman_core::{Environment, Result, SetupError};
use foreman_notify::{Level, Notification};
use foreman_registry::Context;
use serde_json::{json, Value};

/// The template used when a task just says `report = true`.
const DEFAULT_TEMPLATE: &str = "Task {task.id} completed";

/// An optional per-task notification template.
///
/// Rendering substitutes `{task.id}`, `{<job>.result}` and `{<job>.error}`
/// variables from the cycle's outcome contexts; the "main" job additionally
/// aliases plain `{result}` and `{error}`.
#[derive(Debug)]
pub struct Report {
    template: Option<Notification>,
}

impl Report {
    pub fn none() -> Self {
        Self { template: None }
    }

    /// Build from a task's `report` value: absent/false disables reporting,
    /// `true` selects the default template, a table or an array of embeds
    /// configures one fully.
    pub fn load(env: &Environment, config: Option<&Value>) -> Result<Report> {
        let template = match config {
            None | Some(Value::Bool(false)) => None,
            Some(Value::Bool(true)) => Some(Notification::with_text(DEFAULT_TEMPLATE)),
            Some(value @ (Value::Object(_) | Value::Array(_))) => {
                let resolved = env.resolve_deep(value)?;
                Some(parse_template(resolved)?)
            }
            Some(other) => {
                return Err(SetupError::Config(format!(
                    "report must be a boolean, a table, or an array of embeds, not {other}"
                )))
            }
        };
        Ok(Report { template })
    }

    pub fn should_report(&self) -> bool {
        self.template.is_some()
    }

    /// Render the template against one cycle's outcomes. Embeds left at the
    /// default level are promoted to Success, or to Error if any job failed.
    pub fn create(
        &self,
        task_id: &str,
        outcomes: &BTreeMap<String, Context>,
    ) -> Option<Notification> {
        let template = self.template.as_ref()?;
        let vars = prepare_vars(task_id, outcomes);
        let mut rendered = template.render(&vars);

        let outcome_level = if outcomes.values().any(Context::failed) {
            Level::Error
        } else {
            Level::Success
        };
        for embed in &mut rendered.embeds {
            if embed.level == Level::Info {
                embed.level = outcome_level;
            }
        }

        Some(rendered)
    }
}

/// A table with `title` or `fields` at the top level is shorthand for a
/// single embed; an array is a list of embeds.
fn parse_template(value: Value) -> Result<Notification> {
    let normalised = match &value {
        Value::Object(map) if map.contains_key("title") || map.contains_key("fields") => {
            json!({ "embeds": [value] })
        }
        Value::Array(_) => json!({ "embeds": value }),
        _ => value,
    };

    serde_json::from_value(normalised)
        .map_err(|e| SetupError::Config(format!("bad report template: {e}")))
}

fn prepare_vars(task_id: &str, outcomes: &BTreeMap<String, Context>) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    vars.insert("task.id".to_string(), task_id.to_string());

    for (name, ctx) in outcomes {
        let result = ctx.result.as_ref().map(display_value).unwrap_or_default();
        let error = ctx
            .error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_default();
        vars.insert(format!("{name}.result"), result.clone());
        vars.insert(format!("{name}.error"), error.clone());

        if name == "main" {
            vars.insert("result".to_string(), result);
            vars.insert("error".to_string(), error);
        }
    }

    vars
}

/// Strings render bare; everything else renders as compact JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
