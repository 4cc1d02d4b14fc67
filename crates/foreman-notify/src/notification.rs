use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Severity of an embed, mapped to a fixed display color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl Level {
    pub fn color(self) -> &'static str {
        match self {
            Level::Info => "#64FFDF",
            Level::Success => "#46FF38",
            Level::Warning => "#FFC94C",
            Level::Error => "#FF4438",
        }
    }
}

/// A titled key/value pair inside an embed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub title: String,
    pub value: String,
}

/// A titled field-group within a notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub level: Level,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub footer: Option<String>,
    #[serde(default, deserialize_with = "fields_from_list_or_map")]
    pub fields: Vec<Field>,
}

/// A structured outcome message: free text plus titled field-groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub embeds: Vec<Embed>,
}

impl Notification {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            embeds: Vec::new(),
        }
    }

    /// Produce a copy with every `{name}` placeholder substituted from
    /// `vars`. Placeholders with no matching variable are left as written.
    pub fn render(&self, vars: &BTreeMap<String, String>) -> Notification {
        let sub_opt = |s: &Option<String>| s.as_ref().map(|s| substitute(s, vars));

        Notification {
            text: sub_opt(&self.text),
            embeds: self
                .embeds
                .iter()
                .map(|embed| Embed {
                    title: sub_opt(&embed.title),
                    level: embed.level,
                    text: sub_opt(&embed.text),
                    footer: sub_opt(&embed.footer),
                    fields: embed
                        .fields
                        .iter()
                        .map(|field| Field {
                            title: substitute(&field.title, vars),
                            value: substitute(&field.value, vars),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Replace `{name}` placeholders in `template` with values from `vars`.
pub fn substitute(template: &str, vars: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) if !after[..end].contains('{') => {
                let key = &after[..end];
                match vars.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Embed fields accept either a list of `{title, value}` tables or a plain
/// map of title → value.
fn fields_from_list_or_map<'de, D>(deserializer: D) -> Result<Vec<Field>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Spec {
        List(Vec<Field>),
        Map(BTreeMap<String, String>),
    }

    Ok(match Spec::deserialize(deserializer)? {
        Spec::List(fields) => fields,
        Spec::Map(map) => map
            .into_iter()
            .map(|(title, value)| Field { title, value })
            .collect(),
    })
}
