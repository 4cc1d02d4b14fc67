// Load full TOML definitions through the scheduler and verify ordering,
// isolation, and setup-failure behavior end to end.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use foreman_core::{Document, Result, SetupError};
use foreman_registry::{Context, ConverterRegistry, Extension, Param, ParamType, Slave, SlaveCallback};
use foreman_scheduler::Scheduler;
use serde_json::{json, Value};

/// Test extension: `probe.record` appends its `tag` argument to a shared
/// log, `probe.need` requires an argument, `probe.fail` always errors.
struct Probe {
    log: Arc<Mutex<Vec<String>>>,
}

struct Record {
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl SlaveCallback for Record {
    async fn call(&self, ctx: &Context) -> anyhow::Result<Value> {
        let tag = ctx
            .kwargs
            .get("tag")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.log.lock().unwrap().push(tag.clone());
        Ok(json!(tag))
    }
}

struct Fail;

#[async_trait]
impl SlaveCallback for Fail {
    async fn call(&self, _ctx: &Context) -> anyhow::Result<Value> {
        anyhow::bail!("intentional failure")
    }
}

impl Extension for Probe {
    fn name(&self) -> &str {
        "probe"
    }

    fn setup(&self, registry: &mut Slave) -> Result<()> {
        let mut group = Slave::group("probe");
        group.add_slave(
            Slave::new(
                "record",
                Record {
                    log: Arc::clone(&self.log),
                },
            )
            .with_param(Param::optional("tag", ParamType::String, json!(""))),
        )?;
        group.add_slave(
            Slave::new(
                "need",
                Record {
                    log: Arc::clone(&self.log),
                },
            )
            .with_param(Param::required("tag", ParamType::String)),
        )?;
        group.add_slave(Slave::new("fail", Fail))?;
        registry.add_slave(group)?;
        Ok(())
    }
}

fn load(toml: &str) -> (Result<Scheduler>, Arc<Mutex<Vec<String>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let document = Document::from_toml(toml).expect("definition parses");
    let scheduler = Scheduler::load(
        document,
        vec![Box::new(Probe {
            log: Arc::clone(&log),
        })],
        ConverterRegistry::new(),
    );
    (scheduler, log)
}

#[tokio::test]
async fn tasks_execute_in_descending_priority_order() {
    let (scheduler, log) = load(
        r#"
        ext = "probe"

        [tasks.alpha]
        run = "daily"
        priority = 5
        job = { slave = "probe.record", tag = "alpha" }

        [tasks.beta]
        run = "daily"
        priority = 10
        job = { slave = "probe.record", tag = "beta" }

        [tasks.gamma]
        run = "daily"
        priority = 1
        job = { slave = "probe.record", tag = "gamma" }
        "#,
    );

    let mut scheduler = scheduler.unwrap();
    let ids: Vec<&str> = scheduler.tasks().iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["beta", "alpha", "gamma"]);

    scheduler.run_once().await;
    assert_eq!(*log.lock().unwrap(), vec!["beta", "alpha", "gamma"]);
}

#[tokio::test]
async fn disabled_tasks_are_skipped_at_load() {
    let (scheduler, log) = load(
        r#"
        ext = "probe"

        [tasks.on]
        run = "daily"
        job = { slave = "probe.record", tag = "on" }

        [tasks.off]
        run = "daily"
        enabled = false
        job = { slave = "probe.record", tag = "off" }
        "#,
    );

    let mut scheduler = scheduler.unwrap();
    assert_eq!(scheduler.tasks().len(), 1);

    scheduler.run_once().await;
    assert_eq!(*log.lock().unwrap(), vec!["on"]);
}

#[tokio::test]
async fn failing_job_does_not_stop_the_cycle() {
    let (scheduler, log) = load(
        r#"
        ext = "probe"

        [tasks.mixed]
        run = "daily"

        [tasks.mixed.jobs.broken]
        slave = "probe.fail"
        priority = 10

        [tasks.mixed.jobs.working]
        slave = "probe.record"
        tag = "survived"
        "#,
    );

    scheduler.unwrap().run_once().await;
    assert_eq!(*log.lock().unwrap(), vec!["survived"]);
}

#[test]
fn missing_required_argument_fails_load_naming_the_parameter() {
    let (scheduler, _) = load(
        r#"
        ext = "probe"

        [tasks.broken]
        run = "daily"
        job = { slave = "probe.need" }
        "#,
    );

    match scheduler.unwrap_err() {
        SetupError::MissingArgument { job, param } => {
            assert_eq!(job, "broken-main");
            assert_eq!(param, "tag");
        }
        other => panic!("expected MissingArgument, got {other}"),
    }
}

#[test]
fn unknown_extension_fails_load() {
    let (scheduler, _) = load(
        r#"
        ext = ["probe", "imaginary"]
        "#,
    );
    assert!(matches!(
        scheduler.unwrap_err(),
        SetupError::UnknownExtension { ref name } if name == "imaginary"
    ));
}

#[test]
fn path_to_a_namespace_fails_load() {
    let (scheduler, _) = load(
        r#"
        ext = "probe"

        [tasks.bad]
        run = "daily"
        job = { slave = "probe" }
        "#,
    );
    assert!(matches!(
        scheduler.unwrap_err(),
        SetupError::NotInvocable { ref path } if path == "probe"
    ));
}

#[test]
fn bad_recurrence_rule_fails_load_naming_the_task() {
    let (scheduler, _) = load(
        r#"
        ext = "probe"

        [tasks.bad]
        run = "[*y @3x]"
        job = { slave = "probe.record" }
        "#,
    );
    assert!(matches!(
        scheduler.unwrap_err(),
        SetupError::Calendar { ref task, .. } if task == "bad"
    ));
}

#[test]
fn unknown_notification_carrier_fails_load() {
    let (scheduler, _) = load(
        r#"
        ext = "probe"

        [notifications.pigeon]
        coop = "roof"
        "#,
    );
    assert!(matches!(
        scheduler.unwrap_err(),
        SetupError::UnknownCarrier { ref name } if name == "pigeon"
    ));
}

#[tokio::test]
async fn env_section_feeds_job_arguments() {
    let (scheduler, log) = load(
        r#"
        ext = "probe"

        [env]
        greeting = "hello from env"

        [tasks.greet]
        run = "daily"
        job = { slave = "probe.record", tag = "$greeting" }
        "#,
    );

    scheduler.unwrap().run_once().await;
    assert_eq!(*log.lock().unwrap(), vec!["hello from env"]);
}
