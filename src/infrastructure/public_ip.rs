//! Public IP resolution via an address-echo service

use reqwest::Client;
use tracing::debug;

use crate::domain::PublicIp;
use crate::error::PublicIpError;
use crate::infrastructure::http::error_body;

/// Default echo endpoint; answers with the caller's IPv4 address as plain text
pub const PUBLIC_IP_URL: &str = "https://api.ipify.org";

/// Resolves the caller's externally observed address
pub struct PublicIpResolver {
    client: Client,
    endpoint: String,
}

impl PublicIpResolver {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Query the echo service
    ///
    /// Every failure is returned to the caller; there is no fallback address.
    pub async fn resolve(&self) -> Result<PublicIp, PublicIpError> {
        debug!("GET {}?format=text", self.endpoint);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("format", "text")])
            .send()
            .await
            .map_err(|source| PublicIpError::Transport {
                url: self.endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PublicIpError::Status {
                url: self.endpoint.clone(),
                status: status.as_u16(),
                body: error_body(response).await,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| PublicIpError::Transport {
                url: self.endpoint.clone(),
                source,
            })?;

        PublicIp::parse_response(&body)
    }
}
