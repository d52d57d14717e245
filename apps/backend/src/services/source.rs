//! Content source that produces new card batches on demand.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use srs_core::{Card, ValidationError};

/// Generation errors. None of them are fatal to the session.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Content source error: {status} - {message}")]
    Backend { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Content source rejected the request: {0}")]
    Provider(String),

    #[error("Generated batch is invalid: {0}")]
    Validation(#[from] ValidationError),
}

/// Produces a batch of new cards for the given existing units.
#[async_trait]
pub trait CardSource: Send + Sync {
    async fn generate_batch(&self, existing_units: &[String]) -> Result<Vec<Card>, GenerationError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    existing_units: &'a [String],
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    cards: Vec<Card>,
    #[serde(default)]
    error: Option<String>,
}

/// Card source reached over HTTP with a bearer credential.
#[derive(Clone)]
pub struct HttpCardSource {
    client: Client,
    url: String,
    api_key: String,
}

impl HttpCardSource {
    pub fn new(url: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl CardSource for HttpCardSource {
    async fn generate_batch(&self, existing_units: &[String]) -> Result<Vec<Card>, GenerationError> {
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&GenerateRequest { existing_units })
            .send()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Backend { status, message });
        }

        let body: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| GenerationError::Parse(e.to_string()))?;

        match body.error {
            Some(error) => Err(GenerationError::Provider(error)),
            None => Ok(body.cards),
        }
    }
}
