use std::collections::BTreeMap;
use std::collections::HashMap;

use chrono::{NaiveDateTime, Utc};
use foreman_core::{Document, Environment, Result, SetupError};
use foreman_notify::Manager;
use foreman_registry::{Context, ConverterRegistry, Extension, Slave};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::task::Task;

/// Owns the task list and drives the wait → execute → replan loop.
///
/// One logical thread of control: the loop blocks until the earliest due
/// instant, executes every due task sequentially in priority order, then
/// waits again. The registry tree is immutable once [`Scheduler::load`]
/// returns, so nothing here needs a lock.
pub struct Scheduler {
    env: Environment,
    registry: Slave,
    notifier: Manager,
    tasks: Vec<Task>,
}

impl Scheduler {
    /// Resolve the whole definition into a ready-to-run schedule.
    ///
    /// Extensions load first — jobs resolve their slaves at load time — then
    /// every enabled task is constructed and the list is sorted by
    /// descending priority (stable, so equal priorities keep the order the
    /// document loader yields). Any failure aborts startup.
    pub fn load(
        document: Document,
        extensions: Vec<Box<dyn Extension>>,
        converters: ConverterRegistry,
    ) -> Result<Scheduler> {
        let env = Environment::new(document.env);

        let catalog: HashMap<&str, &dyn Extension> = extensions
            .iter()
            .map(|ext| (ext.name(), ext.as_ref()))
            .collect();

        let mut registry = Slave::root();
        for name in document.ext.iter() {
            let extension = catalog
                .get(name)
                .ok_or_else(|| SetupError::UnknownExtension {
                    name: name.to_string(),
                })?;
            extension.setup(&mut registry)?;
            info!(extension = %name, "extension loaded");
        }

        let notifier = Manager::load(&env, &document.notifications)?;

        let mut tasks = Vec::new();
        for (id, config) in &document.tasks {
            let enabled = config
                .get("enabled")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(true);
            if !enabled {
                info!(task = %id, "task is disabled, skipping");
                continue;
            }
            tasks.push(Task::load(&env, &registry, &converters, id, config)?);
        }
        tasks.sort_by_key(|task| std::cmp::Reverse(task.priority));

        info!(
            tasks = tasks.len(),
            slaves = registry.walk().len(),
            "schedule loaded"
        );

        Ok(Scheduler {
            env,
            registry,
            notifier,
            tasks,
        })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn registry(&self) -> &Slave {
        &self.registry
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// The blocking loop: wait until the earliest `next_execution`, run every
    /// due task, replan, repeat. Runs until the shutdown watch flips.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let now = Self::now();
        for task in &mut self.tasks {
            task.plan_next_execution(now);
        }
        info!("scheduler started");

        loop {
            let Some(min_next) = self.tasks.iter().filter_map(|t| t.next_execution).min()
            else {
                warn!("nothing to schedule, stopping");
                return;
            };

            let now = Self::now();
            if min_next > now {
                let wait = (min_next - now).to_std().unwrap_or_default();
                debug!(due = %min_next, "waiting for next execution");
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            info!("scheduler shutting down");
                            return;
                        }
                    }
                }
            } else {
                // Not fatal: catch-up replans onto future slots, skipping
                // the ticks that were missed.
                warn!(due = %min_next, "behind schedule, executing immediately");
            }

            self.execute_due(Self::now()).await;
        }
    }

    /// Execute every task whose `next_execution` has arrived, in priority
    /// order, reporting each as it completes.
    async fn execute_due(&mut self, now: NaiveDateTime) {
        let ctx = Context::new();
        for task in self.tasks.iter_mut() {
            if let Some(outcomes) = task.execute_if_due(now, &ctx).await {
                report(&self.notifier, task, &outcomes).await;
            }
        }
    }

    /// Validation mode: run every enabled task's full job chain once,
    /// immediately, bypassing the wait loop.
    pub async fn run_once(&mut self) {
        info!(tasks = self.tasks.len(), "test mode, executing every task once");
        let ctx = Context::new();
        for task in self.tasks.iter_mut() {
            let outcomes = task.execute(&ctx).await;
            report(&self.notifier, task, &outcomes).await;
        }
    }

    fn now() -> NaiveDateTime {
        Utc::now().naive_utc()
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("tasks", &self.tasks.iter().map(|t| &t.id).collect::<Vec<_>>())
            .field("slaves", &self.registry.walk().len())
            .finish()
    }
}

async fn report(
    notifier: &Manager,
    task: &Task,
    outcomes: &BTreeMap<String, Context>,
) {
    if !task.report.should_report() {
        return;
    }
    if let Some(notification) = task.report.create(&task.id, outcomes) {
        notifier.send(&notification).await;
    }
}
