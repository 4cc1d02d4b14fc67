//! `network` extension — HTTP slaves.

use anyhow::Context as _;
use async_trait::async_trait;
use foreman_core::Result;
use foreman_registry::{Context, Extension, Param, ParamType, Slave, SlaveCallback};
use serde_json::{json, Value};
use tracing::debug;

pub struct NetworkExt;

impl Extension for NetworkExt {
    fn name(&self) -> &str {
        "network"
    }

    fn setup(&self, registry: &mut Slave) -> Result<()> {
        let mut group = Slave::group("network");
        group.add_slave(
            Slave::new("get_url", GetUrl::new())
                .with_description("HTTP GET a URL and return status and body")
                .with_param(Param::required("url", ParamType::String))
                .with_param(Param::optional("params", ParamType::Map, json!({}))),
        )?;
        registry.add_slave(group)?;
        Ok(())
    }
}

/// `network.get_url` — fetch a URL with optional query parameters.
struct GetUrl {
    client: reqwest::Client,
}

impl GetUrl {
    fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SlaveCallback for GetUrl {
    async fn call(&self, ctx: &Context) -> anyhow::Result<Value> {
        let url = ctx
            .kwargs
            .get("url")
            .and_then(Value::as_str)
            .context("url argument missing")?;

        let query: Vec<(String, String)> = ctx
            .kwargs
            .get("params")
            .and_then(Value::as_object)
            .map(|params| {
                params
                    .iter()
                    .map(|(k, v)| (k.clone(), display(v)))
                    .collect()
            })
            .unwrap_or_default();

        debug!(url, params = query.len(), "requesting url");
        let response = self.client.get(url).query(&query).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(json!({ "status": status, "body": body }))
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
