//! HTTP directions provider for Goong-style `Direction` endpoints.

use crate::provider::{DirectionsRequest, DirectionsResponse, RoutingProvider};
use async_trait::async_trait;
use courier_core::{CourierError, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

/// Directions provider backed by `GET {base_url}/Direction`.
#[derive(Debug, Clone)]
pub struct GoongRoutingProvider {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl GoongRoutingProvider {
    /// Create a provider with a request timeout
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CourierError::network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    /// Create a provider from the routing section of the app config
    pub fn from_config(config: &courier_core::config::RoutingConfig) -> Result<Self> {
        Self::new(&config.base_url, config.api_key.clone(), config.timeout())
    }

    fn query(&self, request: &DirectionsRequest) -> Vec<(&'static str, String)> {
        let mut query = vec![
            (
                "origin",
                format!("{},{}", request.origin.latitude, request.origin.longitude),
            ),
            (
                "destination",
                format!(
                    "{},{}",
                    request.destination.latitude, request.destination.longitude
                ),
            ),
            ("vehicle", request.mode.as_vehicle().to_string()),
        ];
        if let Some(key) = &self.api_key {
            query.push(("api_key", key.clone()));
        }
        query
    }
}

#[async_trait]
impl RoutingProvider for GoongRoutingProvider {
    #[instrument(skip(self), fields(mode = %request.mode))]
    async fn directions(&self, request: &DirectionsRequest) -> Result<DirectionsResponse> {
        let url = format!("{}/Direction", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&self.query(request))
            .send()
            .await
            .map_err(|e| CourierError::network(format!("directions request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CourierError::network(format!(
                "directions request failed ({}): {}",
                status, error_text
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| {
                CourierError::network(format!("failed to read directions response: {}", e))
            })?;

        let parsed: DirectionsResponse = serde_json::from_slice(&body)
            .map_err(|e| CourierError::decode(format!("invalid directions response: {}", e)))?;

        debug!(routes = parsed.routes.len(), "Directions received");
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{GeoPoint, TravelMode};

    #[test]
    fn test_query_parameters() {
        let provider = GoongRoutingProvider::new(
            "https://rsapi.goong.io/",
            Some("secret".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(provider.base_url, "https://rsapi.goong.io");

        let request = DirectionsRequest {
            origin: GeoPoint::new(10.7769, 106.7009).unwrap(),
            destination: GeoPoint::new(10.7626, 106.6826).unwrap(),
            mode: TravelMode::Bike,
        };
        let query = provider.query(&request);

        assert_eq!(query[0], ("origin", "10.7769,106.7009".to_string()));
        assert_eq!(query[1], ("destination", "10.7626,106.6826".to_string()));
        assert_eq!(query[2], ("vehicle", "bike".to_string()));
        assert_eq!(query[3], ("api_key", "secret".to_string()));
    }

    #[test]
    fn test_query_without_key() {
        let provider =
            GoongRoutingProvider::new("https://rsapi.goong.io", None, Duration::from_secs(5))
                .unwrap();
        let request = DirectionsRequest {
            origin: GeoPoint::new(1.0, 2.0).unwrap(),
            destination: GeoPoint::new(3.0, 4.0).unwrap(),
            mode: TravelMode::Car,
        };
        let query = provider.query(&request);
        assert_eq!(query.len(), 3);
        assert_eq!(query[2].1, "car");
    }

    /// Answer a single HTTP request with `body` and return the base URL
    async fn serve_once(body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request: Vec<u8> = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_invalid_json_body_is_decode_error() {
        let base = serve_once(r#"{"routes": [{"legs": "#).await;
        let provider = GoongRoutingProvider::new(base, None, Duration::from_secs(5)).unwrap();
        let request = DirectionsRequest {
            origin: GeoPoint::new(10.7769, 106.7009).unwrap(),
            destination: GeoPoint::new(10.7626, 106.6826).unwrap(),
            mode: TravelMode::Bike,
        };

        let err = provider.directions(&request).await.unwrap_err();
        assert_eq!(err.kind(), courier_core::ErrorKind::Decode);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let provider =
            GoongRoutingProvider::new("http://127.0.0.1:9", None, Duration::from_millis(500))
                .unwrap();
        let request = DirectionsRequest {
            origin: GeoPoint::new(1.0, 2.0).unwrap(),
            destination: GeoPoint::new(3.0, 4.0).unwrap(),
            mode: TravelMode::Bike,
        };

        let err = provider.directions(&request).await.unwrap_err();
        assert_eq!(err.kind(), courier_core::ErrorKind::Network);
    }
}
