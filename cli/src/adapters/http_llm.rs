use async_trait::async_trait;
use fleetguard_module_predictor::traits::{LlmBackend, LlmBackendError, LlmRequest, LlmResponse};

/// `LlmBackend` implementation for a remote label-inference service
/// (`spec.md` §4.3 "Tier 3" external collaborator). The request body is the
/// deterministic prompt `LabelPredictor` already built; this adapter only
/// owns the transport.
pub struct HttpLlmBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpLlmBackend {
    pub fn new(endpoint: String) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("fleetguardd/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client, endpoint }
    }
}

#[async_trait]
impl LlmBackend for HttpLlmBackend {
    async fn infer(&self, request: LlmRequest) -> Result<LlmResponse, LlmBackendError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|err| LlmBackendError(err.to_string()))?
            .error_for_status()
            .map_err(|err| LlmBackendError(err.to_string()))?;

        response
            .json()
            .await
            .map_err(|err| LlmBackendError(err.to_string()))
    }
}
