//! Client for the daemon's HTTP API.

pub mod types;

use anyhow::{Context, Result, bail};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::risk::DiagnoseMap;
use types::{
    AlarmSnapshot, ErrorBody, KeyPressRequest, KeyPressResponse, PressKind, RiskState,
    TelemetrySnapshot,
};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:7786";

pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v0{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .with_context(|| format!("failed to reach daemon at {}", self.base_url))?;
        decode(response).await
    }

    async fn post(&self, path: &str) -> Result<reqwest::Response> {
        self.http
            .post(self.url(path))
            .send()
            .await
            .with_context(|| format!("failed to reach daemon at {}", self.base_url))
    }

    pub async fn get_alarm(&self) -> Result<AlarmSnapshot> {
        self.get("/alarm").await
    }

    pub async fn get_risk(&self) -> Result<RiskState> {
        self.get("/risk").await
    }

    pub async fn get_telemetry(&self) -> Result<TelemetrySnapshot> {
        self.get("/telemetry").await
    }

    pub async fn press_key(&self, key: &str) -> Result<PressKind> {
        let response = self
            .http
            .post(self.url("/alarm/keypress"))
            .json(&KeyPressRequest {
                key: key.to_string(),
            })
            .send()
            .await
            .with_context(|| format!("failed to reach daemon at {}", self.base_url))?;
        let response: KeyPressResponse = decode(response).await?;
        Ok(response.kind)
    }

    pub async fn unlock(&self) -> Result<()> {
        expect_success(self.post("/alarm/unlock").await?).await
    }

    /// Silence the alarm and request a speed decrease.
    pub async fn acknowledge(&self) -> Result<()> {
        expect_success(self.post("/alarm/acknowledge").await?).await
    }

    pub async fn diagnose(&self) -> Result<DiagnoseMap> {
        decode(self.post("/diagnose").await?).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let response = check_status(response).await?;
    response.json().await.context("malformed response from daemon")
}

async fn expect_success(response: reqwest::Response) -> Result<()> {
    check_status(response).await.map(|_| ())
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .json::<ErrorBody>()
        .await
        .map(|body| body.message)
        .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unknown").to_string());
    match status {
        StatusCode::SERVICE_UNAVAILABLE => bail!("daemon busy or shutting down: {message}"),
        _ => bail!("{status}: {message}"),
    }
}
