use std::fmt::Write as _;
use std::sync::Arc;

use serde_json::{Map, Value};

/// The mutable per-invocation record threaded through a job's execution.
///
/// The scheduler stamps task/job/slave identifiers and the argument maps on
/// it before each invocation; the slave leaves its result (or its captured
/// failure) behind. Each job runs against its own clone so sibling jobs
/// never share mutable state.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub task_id: Option<String>,
    pub job_id: Option<String>,
    /// Qualified dotted path of the slave being invoked.
    pub slave: Option<String>,
    /// Arguments exactly as they appear in the job table.
    pub raw_args: Map<String, Value>,
    /// Arguments after type-directed conversion, keyed by parameter name.
    pub kwargs: Map<String, Value>,
    /// What the slave returned, if it returned at all.
    pub result: Option<Value>,
    /// A failure raised by the slave's own logic — captured here, never
    /// propagated past the job boundary.
    pub error: Option<Arc<anyhow::Error>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failed(&self) -> bool {
        self.error.is_some()
    }

    /// Multi-line summary of the non-empty fields, for logs and reports.
    pub fn prettify(&self) -> String {
        let mut out = String::new();
        let mut line = |key: &str, value: String| {
            if !value.is_empty() {
                let _ = writeln!(out, "{key}: {value}");
            }
        };

        line("task", self.task_id.clone().unwrap_or_default());
        line("job", self.job_id.clone().unwrap_or_default());
        line("slave", self.slave.clone().unwrap_or_default());
        if !self.kwargs.is_empty() {
            line("kwargs", Value::Object(self.kwargs.clone()).to_string());
        }
        if let Some(result) = &self.result {
            line("result", result.to_string());
        }
        if let Some(error) = &self.error {
            line("error", error.to_string());
        }

        out.trim_end().to_string()
    }
}
