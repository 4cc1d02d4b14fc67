use std::sync::Arc;

use foreman_core::{Environment, Result, SetupError};
use foreman_registry::{Context, ConverterRegistry, Slave};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Keys of the job table that configure the job itself rather than feed the
/// slave's parameters.
const RESERVED_KEYS: &[&str] = &["slave", "priority", "enabled"];

/// One configured invocation of a slave within a task.
///
/// Everything expensive happens at load: the slave is resolved by dotted
/// path and every declared parameter is converted against the raw job table.
/// Run time only stamps the context and invokes.
#[derive(Debug)]
pub struct Job {
    task_id: String,
    name: String,
    pub priority: i64,
    slave: Arc<Slave>,
    raw_args: Map<String, Value>,
    kwargs: Map<String, Value>,
}

impl Job {
    /// Build a job from its table (or bare-string shorthand naming a slave).
    pub fn load(
        env: &Environment,
        registry: &Slave,
        converters: &ConverterRegistry,
        task_id: &str,
        name: &str,
        config: &Value,
    ) -> Result<Job> {
        let id = format!("{task_id}-{name}");

        let shorthand;
        let table: &Map<String, Value> = match config {
            Value::String(path) => {
                let mut map = Map::new();
                map.insert("slave".to_string(), Value::String(path.clone()));
                shorthand = map;
                &shorthand
            }
            Value::Object(map) => map,
            other => {
                return Err(SetupError::Config(format!(
                    "job \"{id}\" must be a table or a slave path, not {other}"
                )))
            }
        };

        let slave_path = match table.get("slave").map(|v| env.resolve(v)).transpose()? {
            Some(Value::String(path)) => path,
            _ => {
                return Err(SetupError::MissingArgument {
                    job: id,
                    param: "slave".to_string(),
                })
            }
        };
        let slave = registry.get_slave(&slave_path)?;

        let priority = match table.get("priority").map(|v| env.resolve(v)).transpose()? {
            Some(value) => value.as_i64().unwrap_or(0),
            None => 0,
        };

        // Convert every declared parameter eagerly — a bad argument must
        // fail startup, not the first 3am run.
        let mut kwargs = Map::new();
        for param in slave.params() {
            match table.get(&param.name) {
                Some(raw) => {
                    let converted = converters.convert(env, &param.ty, &param.name, raw)?;
                    kwargs.insert(param.name.clone(), converted);
                }
                None if param.required => {
                    return Err(SetupError::MissingArgument {
                        job: id,
                        param: param.name.clone(),
                    })
                }
                None => {
                    if let Some(default) = &param.default {
                        kwargs.insert(param.name.clone(), default.clone());
                    }
                }
            }
        }

        let raw_args: Map<String, Value> = table
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        debug!(job = %id, slave = %slave.path(), "job loaded");

        Ok(Job {
            task_id: task_id.to_string(),
            name: name.to_string(),
            priority,
            slave,
            raw_args,
            kwargs,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `taskId + "-" + jobName`.
    pub fn id(&self) -> String {
        format!("{}-{}", self.task_id, self.name)
    }

    pub fn slave(&self) -> &Slave {
        &self.slave
    }

    pub fn kwargs(&self) -> &Map<String, Value> {
        &self.kwargs
    }

    /// Stamp the context and invoke the slave.
    ///
    /// A failing callback is captured on the context and goes no further —
    /// the scheduler outlives every worker failure.
    pub async fn run(&self, ctx: &mut Context) {
        ctx.job_id = Some(self.id());
        ctx.slave = Some(self.slave.path().to_string());
        ctx.raw_args = self.raw_args.clone();
        ctx.kwargs = self.kwargs.clone();

        debug!(job = %self.id(), "running job");
        match self.slave.invoke(ctx).await {
            Ok(result) => {
                ctx.result = Some(result);
            }
            Err(error) => {
                warn!(job = %self.id(), error = %error, "job failed");
                ctx.error = Some(Arc::new(error));
            }
        }
    }
}
