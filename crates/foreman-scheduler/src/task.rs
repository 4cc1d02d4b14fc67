use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use foreman_calendar::{Calendar, CalendarSpec};
use foreman_core::{Environment, Result, SetupError};
use foreman_registry::{Context, ConverterRegistry, Slave};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::job::Job;
use crate::report::Report;

/// A named, scheduled unit owning a calendar and an ordered job list.
#[derive(Debug)]
pub struct Task {
    pub id: String,
    pub calendar: Calendar,
    pub priority: i64,
    pub report: Report,
    jobs: Vec<Job>,
    /// Recomputed after every execution; `None` until first planned.
    pub next_execution: Option<NaiveDateTime>,
}

impl Task {
    /// Build a task from its `[tasks.<id>]` table.
    pub fn load(
        env: &Environment,
        registry: &Slave,
        converters: &ConverterRegistry,
        id: &str,
        config: &Value,
    ) -> Result<Task> {
        let table = config.as_object().ok_or_else(|| {
            SetupError::Config(format!("task \"{id}\" must be a table"))
        })?;

        let run = table.get("run").ok_or_else(|| SetupError::Calendar {
            task: id.to_string(),
            reason: "missing the run field".to_string(),
        })?;
        let run = env.resolve(run)?;
        let spec: CalendarSpec =
            serde_json::from_value(run).map_err(|e| SetupError::Calendar {
                task: id.to_string(),
                reason: e.to_string(),
            })?;
        let calendar = Calendar::from_config(&spec).map_err(|e| SetupError::Calendar {
            task: id.to_string(),
            reason: e.to_string(),
        })?;

        let priority = match table.get("priority").map(|v| env.resolve(v)).transpose()? {
            Some(value) => value.as_i64().unwrap_or(0),
            None => 0,
        };

        let report = Report::load(env, table.get("report"))?;

        let mut jobs = Vec::new();
        for (job_name, job_config) in job_entries(table) {
            let enabled = job_config
                .get("enabled")
                .and_then(Value::as_bool)
                .unwrap_or(true);
            if !enabled {
                debug!(job = %format!("{id}-{job_name}"), "job is disabled, skipping");
                continue;
            }
            jobs.push(Job::load(env, registry, converters, id, job_name, job_config)?);
        }

        // Stable sort: equal priorities keep their declaration order.
        jobs.sort_by_key(|job| std::cmp::Reverse(job.priority));

        Ok(Task {
            id: id.to_string(),
            calendar,
            priority,
            report,
            jobs,
            next_execution: None,
        })
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Run every job sequentially, each against its own context clone, and
    /// return the outcome contexts keyed by job name.
    pub async fn execute(&self, ctx: &Context) -> BTreeMap<String, Context> {
        let mut base = ctx.clone();
        base.task_id = Some(self.id.clone());

        info!(task = %self.id, jobs = self.jobs.len(), "running jobs");
        let mut outcomes = BTreeMap::new();
        for job in &self.jobs {
            let mut job_ctx = base.clone();
            job.run(&mut job_ctx).await;
            outcomes.insert(job.name().to_string(), job_ctx);
        }
        outcomes
    }

    /// Execute when due, then replan. Returns `None` (and does nothing) when
    /// the task isn't due yet or was never planned.
    pub async fn execute_if_due(
        &mut self,
        now: NaiveDateTime,
        ctx: &Context,
    ) -> Option<BTreeMap<String, Context>> {
        match self.next_execution {
            Some(next) if next <= now => {}
            _ => return None,
        }

        let outcomes = self.execute(ctx).await;
        self.plan_next_execution(now);
        Some(outcomes)
    }

    /// Ask the calendar for the next occurrence strictly after `now` — a
    /// behind-schedule task lands on its next future slot, never a missed one.
    pub fn plan_next_execution(&mut self, now: NaiveDateTime) {
        let next = self.calendar.next_event(now);
        debug!(task = %self.id, next = %next, "planned next execution");
        self.next_execution = Some(next);
    }
}

/// A `job` table is a single job named "main"; a `jobs` table holds one job
/// per entry.
fn job_entries(table: &Map<String, Value>) -> Vec<(&str, &Value)> {
    if let Some(job) = table.get("job") {
        return vec![("main", job)];
    }
    match table.get("jobs").and_then(Value::as_object) {
        Some(jobs) => jobs.iter().map(|(name, cfg)| (name.as_str(), cfg)).collect(),
        None => Vec::new(),
    }
}
