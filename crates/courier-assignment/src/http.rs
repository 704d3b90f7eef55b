//! REST backend for the shipping-log API.

use crate::backend::AssignmentBackend;
use crate::model::{ShippingAssignment, StatusUpdate};
use crate::session::Session;
use async_trait::async_trait;
use courier_core::{CourierError, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const API_PREFIX: &str = "/api/v1/shipping-logs";

/// `{statusCode, message, data, timestamp}` wrapper around every response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    #[allow(dead_code)]
    #[serde(default)]
    status_code: Option<u16>,
    #[serde(default)]
    message: Option<String>,
    data: T,
}

#[derive(Debug, Clone)]
pub struct HttpAssignmentBackend {
    base_url: String,
    client: Client,
}

impl HttpAssignmentBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CourierError::network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &courier_core::config::BackendConfig) -> Result<Self> {
        Self::new(&config.base_url, config.timeout())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        session: &Session,
    ) -> Result<T> {
        let response = request
            .bearer_auth(session.access_token())
            .send()
            .await
            .map_err(|e| CourierError::network(format!("backend request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CourierError::network(format!("failed to read backend response: {}", e)))?;

        if !status.is_success() {
            let err = classify_failure(status, &body);
            warn!(%status, error = %err, "Backend rejected request");
            return Err(err);
        }

        let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| {
            CourierError::network(format!("unexpected backend response: {}", e))
        })?;
        if let Some(message) = &envelope.message {
            debug!(%message, "Backend response");
        }
        Ok(envelope.data)
    }
}

/// Map a non-success HTTP response onto the error taxonomy.
///
/// 409 is `Conflict`, any other 4xx is `Validation` and everything else is
/// `Network`. The server's message becomes the detail when one is present.
pub(crate) fn classify_failure(status: StatusCode, body: &str) -> CourierError {
    let message = server_message(body).unwrap_or_else(|| body.trim().to_string());
    let detail = format!("{} ({})", message, status);

    if status == StatusCode::CONFLICT {
        CourierError::conflict(detail)
    } else if status.is_client_error() {
        CourierError::validation(detail)
    } else {
        CourierError::network(detail)
    }
}

/// Extract `message` from an error body; validation errors carry a list.
fn server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("message")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| item.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        ),
        _ => None,
    }
}

#[async_trait]
impl AssignmentBackend for HttpAssignmentBackend {
    #[instrument(skip(self, session))]
    async fn available(&self, session: &Session) -> Result<Vec<ShippingAssignment>> {
        self.send(self.client.get(self.url("/available")), session).await
    }

    #[instrument(skip(self, session))]
    async fn my_deliveries(&self, session: &Session) -> Result<Vec<ShippingAssignment>> {
        self.send(self.client.get(self.url("/my-deliveries")), session)
            .await
    }

    #[instrument(skip(self, session))]
    async fn detail(&self, session: &Session, id: &str) -> Result<ShippingAssignment> {
        self.send(self.client.get(self.url(&format!("/{}", id))), session)
            .await
    }

    #[instrument(skip(self, session))]
    async fn by_order(&self, session: &Session, order_id: &str) -> Result<Vec<ShippingAssignment>> {
        self.send(
            self.client.get(self.url(&format!("/order/{}", order_id))),
            session,
        )
        .await
    }

    #[instrument(skip(self, session))]
    async fn assign_to_me(&self, session: &Session, id: &str) -> Result<ShippingAssignment> {
        self.send(
            self.client
                .post(self.url(&format!("/{}/assign-to-me", id)))
                .json(&serde_json::json!({})),
            session,
        )
        .await
    }

    #[instrument(skip(self, session, update), fields(status = %update.status))]
    async fn update_status(
        &self,
        session: &Session,
        id: &str,
        update: &StatusUpdate,
    ) -> Result<ShippingAssignment> {
        self.send(
            self.client.patch(self.url(&format!("/{}", id))).json(update),
            session,
        )
        .await
    }
}
