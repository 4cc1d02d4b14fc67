use foreman_core::{Environment, Result, SetupError};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::carrier::{find_carrier, Carrier};
use crate::notification::Notification;

/// Owns the configured carriers and fans deliveries out to them.
#[derive(Debug)]
pub struct Manager {
    carriers: Vec<Box<dyn Carrier>>,
}

impl Manager {
    pub fn new() -> Self {
        Self {
            carriers: Vec::new(),
        }
    }

    /// Build carriers from the `[notifications]` section.
    ///
    /// Each key names a carrier; its value is one options table or an array
    /// of them (one carrier instance each). An unknown key is a Setup
    /// failure — a silently dropped channel would swallow every report.
    pub fn load(env: &Environment, config: &Map<String, Value>) -> Result<Self> {
        let mut manager = Self::new();

        for (name, value) in config {
            let factory = find_carrier(name).ok_or_else(|| SetupError::UnknownCarrier {
                name: name.clone(),
            })?;

            let instances: Vec<&Value> = match value {
                Value::Array(items) => items.iter().collect(),
                single => vec![single],
            };

            for options in instances {
                let options = options.as_object().ok_or_else(|| SetupError::Carrier {
                    name: name.clone(),
                    reason: "options must be a table".to_string(),
                })?;
                manager.carriers.push(factory(env, options)?);
                info!(carrier = %name, "carrier configured");
            }
        }

        Ok(manager)
    }

    pub fn is_empty(&self) -> bool {
        self.carriers.is_empty()
    }

    /// Hand the notification to every carrier in turn.
    ///
    /// Delivery failures are logged and never propagate — losing a report
    /// must not take the scheduler down.
    pub async fn send(&self, notification: &Notification) {
        for carrier in &self.carriers {
            if let Err(e) = carrier.deliver(notification).await {
                warn!(
                    carrier = %carrier.name(),
                    error = %e,
                    "failed to deliver notification"
                );
            }
        }
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carrier::CarrierError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct Flaky {
        attempts: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Carrier for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn deliver(&self, _n: &Notification) -> std::result::Result<(), CarrierError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(CarrierError::Delivery("boom".to_string()))
        }
    }

    #[tokio::test]
    async fn delivery_failure_does_not_propagate_and_later_carriers_run() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let manager = Manager {
            carriers: vec![
                Box::new(Flaky {
                    attempts: Arc::clone(&first),
                }),
                Box::new(Flaky {
                    attempts: Arc::clone(&second),
                }),
            ],
        };

        manager.send(&Notification::with_text("hi")).await;
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_carrier_is_a_setup_failure() {
        let env = Environment::default();
        let mut config = Map::new();
        config.insert("pigeon".to_string(), json!({"coop": "roof"}));
        let err = Manager::load(&env, &config).unwrap_err();
        assert!(matches!(err, SetupError::UnknownCarrier { ref name } if name == "pigeon"));
    }

    #[test]
    fn array_value_builds_one_carrier_per_entry() {
        let env = Environment::default();
        let mut config = Map::new();
        config.insert(
            "webhook".to_string(),
            json!([
                {"url": "https://a.test/hook"},
                {"url": "https://b.test/hook", "username": "Other"}
            ]),
        );
        let manager = Manager::load(&env, &config).unwrap();
        assert_eq!(manager.carriers.len(), 2);
    }
}
