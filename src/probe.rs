use async_trait::async_trait;
use tracing::debug;

/// Determines whether a remote endpoint is currently reachable.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn check(&self, base_url: &str) -> bool;
}

/// Probes `{base_url}/health`; any 2xx means reachable, everything else
/// (including transport errors) means not.
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectivityProbe for HttpProbe {
    async fn check(&self, base_url: &str) -> bool {
        let url = format!("{}/health", base_url.trim_end_matches('/'));
        match self.client.get(&url).send().await {
            Ok(response) => {
                debug!("health check {}: {}", url, response.status());
                response.status().is_success()
            }
            Err(err) => {
                debug!("health check {} failed: {}", url, err);
                false
            }
        }
    }
}
