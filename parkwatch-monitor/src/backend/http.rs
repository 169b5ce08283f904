use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::Backend;
use super::wire::{
    EnvironmentRecord, EnvironmentResponse, MetricRecord, MetricsResponse, diagnose_from_value,
};
use crate::error::{Error, Result};
use crate::risk::DiagnoseMap;
use crate::tracing::prelude::*;

/// [`Backend`] over the REST API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request<T: DeserializeOwned>(&self, method: Method, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        trace!(%method, %url, "Backend request");

        let response = self.client.request(method, &url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::BackendStatus {
                endpoint: path.to_string(),
                status,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn fetch_metrics(&self) -> Result<Vec<MetricRecord>> {
        let response: MetricsResponse = self.request(Method::GET, "/api/metrics").await?;
        Ok(response.metrics)
    }

    async fn fetch_environment(&self) -> Result<Vec<EnvironmentRecord>> {
        let response: EnvironmentResponse = self.request(Method::GET, "/api/temperature").await?;
        Ok(response.data)
    }

    async fn run_diagnose(&self) -> Result<DiagnoseMap> {
        let value: Value = self.request(Method::POST, "/api/diagnose").await?;
        Ok(diagnose_from_value(value))
    }

    async fn decrease_speed(&self) -> Result<()> {
        let path = "/api/decrease-speed";
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Error::BackendStatus {
                endpoint: path.to_string(),
                status,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::Json;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use serde_json::json;
    use tokio::net::TcpListener;

    use super::*;

    async fn serve(router: Router) -> HttpBackend {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        HttpBackend::new(format!("http://{addr}/"), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn fetches_feeds() {
        let router = Router::new()
            .route(
                "/api/metrics",
                get(|| async {
                    Json(json!({"metrics": [
                        {"time": "t0", "temperature": 30.5, "vibration": "2.1 mm/s"},
                        {"time": "t1", "temperature": "31", "vibration": 6.0, "battery": 3.1}
                    ]}))
                }),
            )
            .route(
                "/api/temperature",
                get(|| async { Json(json!({"data": [{"humidity": "81.5", "battery_v": 3.0}]})) }),
            );
        let backend = serve(router).await;

        let metrics = backend.fetch_metrics().await.unwrap();
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].vibration, Some(2.1));
        assert_eq!(metrics[1].temperature, Some(31.0));

        let environment = backend.fetch_environment().await.unwrap();
        assert_eq!(environment[0].humidity, Some(81.5));
    }

    #[tokio::test]
    async fn diagnose_is_posted() {
        let router = Router::new().route(
            "/api/diagnose",
            post(|| async {
                Json(json!({"A1": {"damage_report": {"triggered": true, "type_of_damage": "crack"}}}))
            }),
        );
        let backend = serve(router).await;

        let map = backend.run_diagnose().await.unwrap();
        assert!(map["A1"].damage_report.is_some());
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let router = Router::new()
            .route(
                "/api/metrics",
                get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
            )
            .route(
                "/api/decrease-speed",
                get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
            );
        let backend = serve(router).await;

        match backend.fetch_metrics().await {
            Err(Error::BackendStatus { endpoint, status }) => {
                assert_eq!(endpoint, "/api/metrics");
                assert_eq!(status, reqwest::StatusCode::SERVICE_UNAVAILABLE);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            backend.decrease_speed().await,
            Err(Error::BackendStatus { .. })
        ));
    }

    #[tokio::test]
    async fn decrease_speed_accepts_any_success() {
        let router = Router::new().route(
            "/api/decrease-speed",
            get(|| async { (StatusCode::ACCEPTED, "slowing down") }),
        );
        let backend = serve(router).await;

        backend.decrease_speed().await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_backend_is_transport_error() {
        let backend = HttpBackend::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        assert!(matches!(
            backend.fetch_metrics().await,
            Err(Error::Backend(_))
        ));
    }
}
