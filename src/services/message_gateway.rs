use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::info;

use crate::config::MailConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryOutcome {
    pub delivered: bool,
    pub detail: String,
}

impl DeliveryOutcome {
    pub fn delivered(detail: impl Into<String>) -> Self {
        Self {
            delivered: true,
            detail: detail.into(),
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            delivered: false,
            detail: detail.into(),
        }
    }
}

/// Outbound email transport. Sending never fails: problems come back as an
/// undelivered outcome.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageGateway: Send + Sync {
    async fn send(&self, message: OutboundMessage) -> DeliveryOutcome;
}

/// Stand-in used when mail credentials are absent.
#[derive(Debug, Clone, Default)]
pub struct UnconfiguredGateway;

#[async_trait]
impl MessageGateway for UnconfiguredGateway {
    async fn send(&self, _message: OutboundMessage) -> DeliveryOutcome {
        DeliveryOutcome::failed("mail gateway credentials missing; message recorded but not sent")
    }
}

/// SendGrid-style JSON mail API.
#[derive(Clone)]
pub struct HttpMessageGateway {
    client: Client,
    api_url: String,
    api_key: String,
    from_address: String,
}

impl HttpMessageGateway {
    pub fn new(client: Client, api_url: String, api_key: String, from_address: String) -> Self {
        Self {
            client,
            api_url,
            api_key,
            from_address,
        }
    }
}

#[async_trait]
impl MessageGateway for HttpMessageGateway {
    async fn send(&self, message: OutboundMessage) -> DeliveryOutcome {
        let payload = serde_json::json!({
            "personalizations": [{ "to": [{ "email": message.to }] }],
            "from": { "email": self.from_address },
            "subject": message.subject,
            "content": [{ "type": "text/plain", "value": message.body }]
        });

        let res = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await;

        match res {
            Ok(resp) if resp.status().is_success() => {
                DeliveryOutcome::delivered(format!("accepted ({})", resp.status().as_u16()))
            }
            Ok(resp) => {
                let status = resp.status().as_u16();
                let body = resp.text().await.unwrap_or_default();
                let snippet: String = body.chars().take(200).collect();
                DeliveryOutcome::failed(format!("gateway returned {}: {}", status, snippet))
            }
            Err(err) => DeliveryOutcome::failed(format!("gateway unreachable: {}", err)),
        }
    }
}

/// HTTP gateway when URL, key and sender are all configured; otherwise the
/// unconfigured stand-in.
pub fn from_config(config: &MailConfig, client: Client) -> Arc<dyn MessageGateway> {
    match (&config.api_url, &config.api_key, &config.from_address) {
        (Some(url), Some(key), Some(from)) => {
            info!(api_url = %url, from = %from, "mail gateway enabled");
            Arc::new(HttpMessageGateway::new(client, url.clone(), key.clone(), from.clone()))
        }
        _ => {
            info!("mail gateway disabled (MAIL_API_URL, MAIL_API_KEY or MAIL_FROM not set)");
            Arc::new(UnconfiguredGateway)
        }
    }
}
