use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::ProviderError;

/// Flux 1.1 Pro, pinned to the version this bridge was built against.
const MODEL_VERSION: &str = "1d0c7f00f7ab62aa5871a9a7806cb99061727ff09fb2acc31fbe98ce7cb7fe99";

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Pure image-generation call. Merged parameters in, raw model output out.
/// No retries, no timeout; the caller upstream owns resubmission.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    async fn generate(&self, input: &Map<String, Value>) -> Result<Value, ProviderError>;
}

/// Replicate API client running the pinned Flux model.
pub struct ReplicateProvider {
    client: reqwest::Client,
    api_token: String,
    base_url: String,
}

impl ReplicateProvider {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_token: api_token.into(),
            base_url: "https://api.replicate.com".into(),
        }
    }

    pub fn with_client(client: reqwest::Client, api_token: impl Into<String>) -> Self {
        Self {
            client,
            api_token: api_token.into(),
            base_url: "https://api.replicate.com".into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Create a prediction. `Prefer: wait` asks Replicate to hold the
    /// connection until the run finishes, so most calls never poll.
    async fn create_prediction(&self, input: &Map<String, Value>) -> Result<Value, ProviderError> {
        let body = json!({ "version": MODEL_VERSION, "input": input });

        let resp = self
            .client
            .post(format!("{}/v1/predictions", self.base_url))
            .header("authorization", format!("Bearer {}", self.api_token))
            .header("prefer", "wait")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        Self::read_json(resp).await
    }

    async fn poll_prediction(&self, url: &str) -> Result<Value, ProviderError> {
        let resp = self
            .client
            .get(url)
            .header("authorization", format!("Bearer {}", self.api_token))
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        Self::read_json(resp).await
    }

    async fn read_json(resp: reqwest::Response) -> Result<Value, ProviderError> {
        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(ProviderError::Api { status, body: text });
        }

        serde_json::from_str(&text).map_err(|e| ProviderError::Parse(e.to_string()))
    }
}

/// One reading of a prediction object's lifecycle state.
pub(crate) enum Prediction {
    Succeeded(Value),
    Failed(String),
    /// Still running; carries the poll URL when the API supplied one.
    Pending(Option<String>),
}

pub(crate) fn parse_prediction(prediction: &Value) -> Result<Prediction, ProviderError> {
    let status = prediction["status"]
        .as_str()
        .ok_or_else(|| ProviderError::Parse("prediction has no status".into()))?;

    match status {
        "succeeded" => Ok(Prediction::Succeeded(prediction["output"].clone())),
        "failed" | "canceled" => {
            let detail = prediction["error"]
                .as_str()
                .unwrap_or("prediction did not succeed")
                .to_string();
            Ok(Prediction::Failed(detail))
        }
        _ => Ok(Prediction::Pending(
            prediction["urls"]["get"].as_str().map(str::to_string),
        )),
    }
}

#[async_trait]
impl ImageProvider for ReplicateProvider {
    async fn generate(&self, input: &Map<String, Value>) -> Result<Value, ProviderError> {
        let mut prediction = self.create_prediction(input).await?;

        loop {
            match parse_prediction(&prediction)? {
                Prediction::Succeeded(output) => return Ok(output),
                Prediction::Failed(detail) => return Err(ProviderError::Model(detail)),
                Prediction::Pending(url) => {
                    let url = url.ok_or_else(|| {
                        ProviderError::Parse("pending prediction has no poll URL".into())
                    })?;
                    debug!(url = %url, "prediction still running, polling");
                    tokio::time::sleep(POLL_INTERVAL).await;
                    prediction = self.poll_prediction(&url).await?;
                }
            }
        }
    }
}
