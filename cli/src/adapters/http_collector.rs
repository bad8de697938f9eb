use async_trait::async_trait;
use fleetguard_module_orchestrator::traits::{Collector, CollectorError, DeviceSnapshot, TransportCredential};

/// `Collector` implementation for devices that expose a REST management API
/// (`spec.md` §4.5(b) external collaborator). `host` is the device's base
/// URL; the credential is sent as a bearer token. SSH/NETCONF transports
/// would be separate adapters behind the same trait.
pub struct HttpCollector {
    client: reqwest::Client,
}

impl Default for HttpCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpCollector {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Collector for HttpCollector {
    async fn collect(
        &self,
        host: &str,
        credential: &TransportCredential,
        deadline: std::time::Duration,
    ) -> Result<DeviceSnapshot, CollectorError> {
        let url = format!("{host}/api/device-info");

        let response = tokio::time::timeout(
            deadline,
            self.client
                .get(&url)
                .bearer_auth(&credential.0)
                .send(),
        )
        .await
        .map_err(|_| CollectorError::Timeout)?
        .map_err(|err| CollectorError::Transport(err.to_string()))?
        .error_for_status()
        .map_err(|err| CollectorError::Transport(err.to_string()))?;

        response
            .json()
            .await
            .map_err(|err| CollectorError::Parse(err.to_string()))
    }
}
