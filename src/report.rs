//! Failure reporting.
//!
//! A scenario that ends with a non-empty narrative is reported exactly once,
//! to a webhook if `VALIDATION_ALERT_URL` is set and to the log otherwise.
//! Reporting is best-effort: a failing webhook degrades to a log line rather
//! than failing the scenario that's trying to report.

use serde_json::json;

const ALERT_URL_VAR: &str = "VALIDATION_ALERT_URL";

/// Where scenario failures go.
pub struct AlertSink {
    webhook: Option<Webhook>,
}

struct Webhook {
    http: reqwest::Client,
    url: String,
}

impl AlertSink {
    /// Builds a sink from `VALIDATION_ALERT_URL`; unset means log-only.
    pub fn from_env() -> Self {
        match std::env::var(ALERT_URL_VAR) {
            Ok(url) if !url.is_empty() => AlertSink {
                webhook: Some(Webhook {
                    http: reqwest::Client::new(),
                    url,
                }),
            },
            _ => {
                tracing::info!(
                    "{ALERT_URL_VAR} not set, validation failures will only be logged"
                );
                AlertSink { webhook: None }
            }
        }
    }

    /// Log-only sink, used in tests.
    pub fn unconfigured() -> Self {
        AlertSink { webhook: None }
    }

    /// Delivers one failure report.
    pub async fn report(&self, message: &str) {
        let Some(webhook) = &self.webhook else {
            tracing::warn!(report = %message, "validation failure");
            return;
        };

        let result = webhook
            .http
            .post(&webhook.url)
            .json(&json!({ "text": message }))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                tracing::warn!(
                    status = %response.status(),
                    report = %message,
                    "alert webhook rejected the report"
                );
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    report = %message,
                    "failed to deliver the report to the alert webhook"
                );
            }
        }
    }
}
