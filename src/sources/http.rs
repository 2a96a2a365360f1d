//! Probe registry backed by the probe info HTTP service

use super::ProbeRegistrySource;
use crate::probes::ProbeRegistry;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info_span, Instrument};
use url::Url;

/// Fetches the probe listing with a single GET
#[derive(Debug, Clone)]
pub struct HttpProbeRegistry {
    client: Client,
    url: Url,
}

impl HttpProbeRegistry {
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| Error::Config(format!("invalid probe info URL '{}': {}", url, e)))?;
        Ok(Self {
            client: Client::new(),
            url,
        })
    }
}

#[async_trait]
impl ProbeRegistrySource for HttpProbeRegistry {
    async fn fetch_registry(&self) -> Result<ProbeRegistry> {
        let span = info_span!("probe_info_get", url = %self.url);
        let body = async {
            let response = self
                .client
                .get(self.url.clone())
                .send()
                .await
                .map_err(|e| Error::RegistryFetch(format!("GET {}: {e}", self.url)))?;

            let status = response.status();
            if !status.is_success() {
                return Err(Error::RegistryFetch(format!(
                    "GET {} returned {}",
                    self.url, status
                )));
            }

            response
                .text()
                .await
                .map_err(|e| Error::RegistryFetch(format!("reading body of {}: {e}", self.url)))
        }
        .instrument(span)
        .await?;

        let registry = ProbeRegistry::from_json(&body)?;
        debug!(url = %self.url, probes = registry.len(), "Fetched probe registry");
        Ok(registry)
    }

    fn describe(&self) -> String {
        self.url.to_string()
    }
}
