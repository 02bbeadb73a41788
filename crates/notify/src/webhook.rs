//! HTTP webhook channel.
//!
//! Each recorded change is POSTed as its JSON document. Identifying headers
//! let receivers route or deduplicate without parsing the body.

use std::collections::HashMap;

use kubetrail_core::ChangeEvent;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::traits::{Notifier, NotifyError};

pub const EVENT_ID_HEADER: &str = "x-kubetrail-event-id";
pub const OPERATION_HEADER: &str = "x-kubetrail-operation";
pub const DECISION_HEADER: &str = "x-kubetrail-decision";

#[derive(Debug)]
pub struct WebhookNotifier {
    url: Url,
    /// Static headers, sent ahead of the per-event ones.
    headers: HeaderMap,
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// `${VAR}` references in the URL and header values are expanded from
    /// the environment here, so tokens never sit in plain configuration.
    pub fn new(url: &str, headers: &HashMap<String, String>) -> Result<Self, NotifyError> {
        let url = parse_webhook_url(&expand_env(url)?)?;

        let mut header_map = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| NotifyError::Config(format!("invalid header name: {name}")))?;
            let value = HeaderValue::from_str(&expand_env(value)?)
                .map_err(|_| NotifyError::Config(format!("invalid value for header {name}")))?;
            header_map.insert(name, value);
        }

        Ok(Self {
            url,
            headers: header_map,
            client: reqwest::Client::new(),
        })
    }

    pub fn from_url(url: &str) -> Result<Self, NotifyError> {
        Self::new(url, &HashMap::new())
    }

    fn event_headers(&self, event: &ChangeEvent) -> HeaderMap {
        let mut headers = self.headers.clone();
        let decision = if event.allowed { "allowed" } else { "denied" };
        headers.insert(OPERATION_HEADER, HeaderValue::from_static(event.operation.as_str()));
        headers.insert(DECISION_HEADER, HeaderValue::from_static(decision));
        // IDs embed resource names, which are always valid header text.
        if let Ok(id) = HeaderValue::from_str(&event.id) {
            headers.insert(EVENT_ID_HEADER, id);
        }
        headers
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, event: &ChangeEvent) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(self.url.clone())
            .headers(self.event_headers(event))
            .json(event)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(event_id = %event.id, status = %status, "webhook accepted change event");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "webhook"
    }
}

/// Expand every `${NAME}` from the environment; unset names are an error.
fn expand_env(input: &str) -> Result<String, NotifyError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| NotifyError::Config(format!("unterminated ${{...}} in {input:?}")))?;
        let name = &after[..end];
        let value = std::env::var(name)
            .map_err(|_| NotifyError::Config(format!("environment variable {name} is not set")))?;
        out.push_str(&value);
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Parse and check an expanded webhook URL. Errors never echo credentials.
fn parse_webhook_url(raw: &str) -> Result<Url, NotifyError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| NotifyError::Config(format!("invalid webhook URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(NotifyError::Config(format!(
            "webhook URL must be http(s) with a host: {}",
            redact_url(&url)
        )));
    }
    Ok(url)
}

/// Scheme and host only, for logs and error messages.
pub fn redact_url(url: &Url) -> String {
    match url.host_str() {
        Some(host) => format!("{}://{}", url.scheme(), host),
        None => format!("{}:", url.scheme()),
    }
}
