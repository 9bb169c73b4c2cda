use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::application::services::delivery::{DeliveryBackend, ProviderReceipt};

pub const DEFAULT_API_BASE: &str = "https://api.twilio.com";

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub status_callback_url: Option<String>,
    pub api_base: String,
}

pub struct TwilioBackend {
    http: Client,
    config: TwilioConfig,
}

impl TwilioBackend {
    pub fn new(config: TwilioConfig) -> anyhow::Result<Arc<dyn DeliveryBackend>> {
        let http = Client::builder()
            .user_agent("sms-scheduler/twilio")
            .build()?;
        Ok(Arc::new(Self { http, config }) as Arc<dyn DeliveryBackend>)
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        )
    }

    fn form<'a>(&'a self, recipient: &'a str, body: &'a str) -> Vec<(&'static str, &'a str)> {
        let mut form = vec![
            ("To", recipient),
            ("From", self.config.from_number.as_str()),
            ("Body", body),
        ];
        if let Some(callback) = &self.config.status_callback_url {
            form.push(("StatusCallback", callback.as_str()));
        }
        form
    }
}

#[async_trait]
impl DeliveryBackend for TwilioBackend {
    fn name(&self) -> &'static str {
        "twilio"
    }

    async fn send(&self, recipient: &str, body: &str) -> anyhow::Result<ProviderReceipt> {
        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&self.form(recipient, body))
            .send()
            .await?;

        let status = response.status();
        let payload = response.text().await?;
        parse_response(status, &payload)
    }
}

fn parse_response(status: reqwest::StatusCode, payload: &str) -> anyhow::Result<ProviderReceipt> {
    if !status.is_success() {
        let error: TwilioErrorResponse = serde_json::from_str(payload).unwrap_or_default();
        anyhow::bail!(
            "twilio api returned {}: {} (code {})",
            status,
            error
                .message
                .unwrap_or_else(|| "unknown error".to_string()),
            error
                .code
                .map(|code| code.to_string())
                .unwrap_or_else(|| "n/a".to_string())
        );
    }

    let message: TwilioMessageResponse = serde_json::from_str(payload)?;
    if let Some(error) = message.error_message.filter(|e| !e.is_empty()) {
        anyhow::bail!("twilio rejected message: {error}");
    }

    Ok(ProviderReceipt {
        provider_ref: message.sid.unwrap_or_default(),
        status: message.status,
    })
}

#[derive(Debug, Deserialize)]
struct TwilioMessageResponse {
    sid: Option<String>,
    status: Option<String>,
    error_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TwilioErrorResponse {
    code: Option<i64>,
    message: Option<String>,
}
