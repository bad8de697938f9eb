use async_trait::async_trait;
use fleetguard_module_predictor::traits::{Embedder, EmbedderError};
use serde::{Deserialize, Serialize};

/// `Embedder` implementation for a remote embedding service reachable over
/// plain JSON/HTTP (`spec.md` §4.3 "Tier 2" external collaborator). Posts the
/// summary text and expects a single fixed-width vector back.
pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpEmbedder {
    pub fn new(endpoint: String) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("fleetguardd/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client, endpoint }
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbedRequest { text })
            .send()
            .await
            .map_err(|err| EmbedderError(err.to_string()))?
            .error_for_status()
            .map_err(|err| EmbedderError(err.to_string()))?;

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|err| EmbedderError(err.to_string()))?;

        Ok(body.embedding)
    }
}
