//! Embedding provider HTTP client: `POST /embeddings` with
//! `{model, input}`, up to 2048 texts per call.

use serde::{Deserialize, Serialize};

use crate::error::{ConnectorError, Result};

const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const MAX_BATCH_SIZE: usize = 2048;

#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

impl EmbeddingClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("reqwest client builder should never fail with no custom TLS config");
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        }
    }

    /// Embeds `texts` in a single request and returns vectors realigned to
    /// the input order via `data[i].index` - the provider is free to
    /// return entries out of order.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        if texts.len() > MAX_BATCH_SIZE {
            return Err(ConnectorError::Permanent(format!(
                "batch of {} exceeds max embedding batch size {MAX_BATCH_SIZE}",
                texts.len()
            )));
        }

        let url = format!("{}/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return if status.as_u16() == 429 || status.is_server_error() {
                Err(ConnectorError::Transient(format!(
                    "embedding provider returned {status}: {body}"
                )))
            } else {
                Err(ConnectorError::Permanent(format!(
                    "embedding provider returned {status}: {body}"
                )))
            };
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| ConnectorError::MalformedResponse(e.to_string()))?;

        if parsed.data.len() != texts.len() {
            return Err(ConnectorError::MalformedResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        let mut out: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        for datum in parsed.data {
            if datum.index >= out.len() {
                return Err(ConnectorError::MalformedResponse(format!(
                    "embedding index {} out of range for batch of {}",
                    datum.index,
                    texts.len()
                )));
            }
            out[datum.index] = Some(datum.embedding);
        }

        out.into_iter()
            .enumerate()
            .map(|(i, v)| {
                v.ok_or_else(|| {
                    ConnectorError::MalformedResponse(format!("missing embedding for index {i}"))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_batches_over_the_limit() {
        let client = EmbeddingClient::new("https://embed.example.com", "key", "text-embedding-3-small");
        let texts: Vec<String> = (0..MAX_BATCH_SIZE + 1).map(|i| i.to_string()).collect();
        let result = client.embed_batch(&texts).await;
        assert!(matches!(result, Err(ConnectorError::Permanent(_))));
    }

    #[tokio::test]
    async fn empty_batch_short_circuits() {
        let client = EmbeddingClient::new("https://embed.example.com", "key", "text-embedding-3-small");
        let result = client.embed_batch(&[]).await;
        assert_eq!(result.unwrap(), Vec::<Vec<f32>>::new());
    }
}
