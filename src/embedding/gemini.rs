use super::{Embedder, EmbeddingError};
use crate::config::EmbeddingConfig;
use crate::metrics::EMBEDDING_REQUESTS_TOTAL;
use async_trait::async_trait;
use std::time::Duration;

/// Gemini `embedContent` REST client
pub struct GeminiEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    dimensions: usize,
}

impl GeminiEmbedder {
    pub fn new(config: &EmbeddingConfig, api_key: String) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            // Strip trailing slash for consistent URL building
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            model: config.model.clone(),
            api_key,
            dimensions: config.dimensions,
        })
    }

    /// Build from config, reading the API key from `api_key_env`
    pub fn from_env(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| EmbeddingError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(config, api_key)
    }

    async fn request(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/models/{}:embedContent", self.base_url, self.model);
        let body = serde_json::json!({
            "model": format!("models/{}", self.model),
            "content": { "parts": [{ "text": text }] }
        });

        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .text()
                .await
                .unwrap_or_else(|_| "failed to read response body".into());
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let response: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| EmbeddingError::MalformedResponse(e.to_string()))?;

        let values = response
            .get("embedding")
            .and_then(|e| e.get("values"))
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                EmbeddingError::MalformedResponse("missing `embedding.values` array".into())
            })?;

        let vector = values
            .iter()
            .map(|v| {
                v.as_f64().map(|f| f as f32).ok_or_else(|| {
                    EmbeddingError::MalformedResponse(format!("non-numeric value: {v}"))
                })
            })
            .collect::<Result<Vec<f32>, _>>()?;

        self.validate_vector(&vector)?;
        Ok(vector)
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let result = self.request(text).await;
        match &result {
            Ok(_) => EMBEDDING_REQUESTS_TOTAL.with_label_values(&["success"]).inc(),
            Err(e) => {
                EMBEDDING_REQUESTS_TOTAL.with_label_values(&["error"]).inc();
                tracing::warn!(model = %self.model, error = %e, "Embedding request failed");
            }
        }
        result
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
