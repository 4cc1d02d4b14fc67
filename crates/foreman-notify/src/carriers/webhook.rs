use async_trait::async_trait;
use foreman_core::{Environment, Result, SetupError};
use serde_json::{json, Map, Value};

use crate::carrier::{Carrier, CarrierError};
use crate::notification::Notification;

const DEFAULT_USERNAME: &str = "Foreman";

/// Posts notifications as JSON to a webhook URL.
#[derive(Debug)]
pub struct WebhookCarrier {
    url: String,
    username: String,
    client: reqwest::Client,
}

impl WebhookCarrier {
    /// Build from a `[notifications.webhook]` table. `url` is required;
    /// `username` defaults to "Foreman". `$name` values resolve first.
    pub fn from_options(env: &Environment, options: &Map<String, Value>) -> Result<Box<dyn Carrier>> {
        let options = env.resolve_deep(&Value::Object(options.clone()))?;

        let url = options
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| SetupError::Carrier {
                name: "webhook".to_string(),
                reason: "requires key \"url\"".to_string(),
            })?
            .to_string();

        let username = options
            .get("username")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_USERNAME)
            .to_string();

        Ok(Box::new(Self {
            url,
            username,
            client: reqwest::Client::new(),
        }))
    }

    fn build_message(&self, notification: &Notification) -> Value {
        json!({
            "username": self.username,
            "text": notification.text,
        })
    }
}

#[async_trait]
impl Carrier for WebhookCarrier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn deliver(&self, notification: &Notification) -> std::result::Result<(), CarrierError> {
        let body = self.build_message(notification);
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CarrierError::Delivery(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CarrierError::Rejected {
                status: response.status().as_u16(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_is_required() {
        let env = Environment::default();
        let err = WebhookCarrier::from_options(&env, &Map::new()).unwrap_err();
        assert!(matches!(err, SetupError::Carrier { ref name, .. } if name == "webhook"));
    }

    #[test]
    fn options_resolve_through_the_environment() {
        let mut defaults = Map::new();
        defaults.insert("hook_url".to_string(), json!("https://example.test/hook"));
        let env = Environment::new(defaults);

        let mut options = Map::new();
        options.insert("url".to_string(), json!("$hook_url"));
        let carrier = WebhookCarrier::from_options(&env, &options).unwrap();
        assert_eq!(carrier.name(), "webhook");
    }

    #[test]
    fn message_carries_username_and_text() {
        let carrier = WebhookCarrier {
            url: "https://example.test".to_string(),
            username: "Foreman".to_string(),
            client: reqwest::Client::new(),
        };
        let message = carrier.build_message(&Notification::with_text("done"));
        assert_eq!(message, json!({"username": "Foreman", "text": "done"}));
    }
}
