//! `shell` extension — one-shot shell commands via `sh -c`.

use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use foreman_core::Result;
use foreman_registry::{Context, Extension, Param, ParamType, Slave, SlaveCallback};
use serde_json::{json, Value};
use tracing::debug;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub struct ShellExt;

impl Extension for ShellExt {
    fn name(&self) -> &str {
        "shell"
    }

    fn setup(&self, registry: &mut Slave) -> Result<()> {
        let mut group = Slave::group("shell");
        group.add_slave(
            Slave::new("run", Run)
                .with_description("Run a shell command and return its exit status and output")
                .with_param(Param::required("command", ParamType::String))
                .with_param(Param::optional(
                    "timeout_secs",
                    ParamType::Int,
                    json!(DEFAULT_TIMEOUT_SECS),
                )),
        )?;
        registry.add_slave(group)?;
        Ok(())
    }
}

/// `shell.run` — execute a command, capturing stdout/stderr, with a timeout.
struct Run;

#[async_trait]
impl SlaveCallback for Run {
    async fn call(&self, ctx: &Context) -> anyhow::Result<Value> {
        let command = ctx
            .kwargs
            .get("command")
            .and_then(Value::as_str)
            .context("command argument missing")?;
        let timeout_secs = ctx
            .kwargs
            .get("timeout_secs")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        debug!(command, timeout_secs, "running shell command");
        let output = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            tokio::process::Command::new("sh")
                .arg("-c")
                .arg(command)
                .output(),
        )
        .await
        .map_err(|_| anyhow::anyhow!("command timed out after {timeout_secs}s"))??;

        Ok(json!({
            "status": output.status.code(),
            "stdout": String::from_utf8_lossy(&output.stdout),
            "stderr": String::from_utf8_lossy(&output.stderr),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_run_under_the_shell_group() {
        let mut root = Slave::root();
        ShellExt.setup(&mut root).unwrap();
        assert!(root.get_slave("shell.run").is_ok());
    }

    #[tokio::test]
    async fn captures_stdout_and_exit_status() {
        let mut root = Slave::root();
        ShellExt.setup(&mut root).unwrap();
        let slave = root.get_slave("shell.run").unwrap();

        let mut ctx = Context::new();
        ctx.kwargs
            .insert("command".to_string(), json!("echo hello"));
        ctx.kwargs.insert("timeout_secs".to_string(), json!(5));

        let result = slave.invoke(&ctx).await.unwrap();
        assert_eq!(result["status"], json!(0));
        assert_eq!(result["stdout"], json!("hello\n"));
    }

    #[tokio::test]
    async fn timeout_surfaces_as_an_error() {
        let mut root = Slave::root();
        ShellExt.setup(&mut root).unwrap();
        let slave = root.get_slave("shell.run").unwrap();

        let mut ctx = Context::new();
        ctx.kwargs.insert("command".to_string(), json!("sleep 5"));
        ctx.kwargs.insert("timeout_secs".to_string(), json!(1));

        let err = slave.invoke(&ctx).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
