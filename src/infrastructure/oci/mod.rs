//! OCI network security group rule updates
//!
//! Talks to the Core Services `UpdateNetworkSecurityGroupSecurityRules`
//! action directly, signing each request with the profile's API key.
//!
//! The action replaces the whole rule: any attribute not sent is cleared on
//! the remote side, so [`SecurityRuleUpdate`] always carries the full body.

pub mod signer;

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::OciProfile;
use crate::domain::PublicIp;
use crate::error::OciError;

pub use signer::RequestSigner;

/// Core Services API version prefix
const API_VERSION: &str = "20160918";

/// Description written on every managed rule
pub const RULE_DESCRIPTION: &str = "Allow Traffic from home";

/// Full replacement body for one security rule
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityRuleUpdate {
    pub direction: String,
    pub id: String,
    pub protocol: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icmp_options: Option<serde_json::Value>,
    pub is_stateless: bool,
    pub source: String,
    pub source_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tcp_options: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub udp_options: Option<serde_json::Value>,
}

impl SecurityRuleUpdate {
    /// Stateful ingress rule allowing every protocol from a single host
    pub fn allow_all_from(rule_id: impl Into<String>, ip: &PublicIp) -> Self {
        Self {
            direction: "INGRESS".to_string(),
            id: rule_id.into(),
            protocol: "all".to_string(),
            description: RULE_DESCRIPTION.to_string(),
            destination: None,
            destination_type: None,
            icmp_options: None,
            is_stateless: false,
            source: ip.host_cidr(),
            source_type: "CIDR_BLOCK".to_string(),
            tcp_options: None,
            udp_options: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateSecurityRulesDetails {
    security_rules: Vec<SecurityRuleUpdate>,
}

/// Rule as echoed back by the API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityRule {
    pub id: String,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatedSecurityRules {
    #[serde(default)]
    security_rules: Vec<SecurityRule>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Client for one tenancy's network security groups
pub struct NsgClient {
    client: Client,
    endpoint: String,
    signer: RequestSigner,
}

impl NsgClient {
    pub fn new(client: Client, endpoint: impl Into<String>, signer: RequestSigner) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            signer,
        }
    }

    /// Build a client from a loaded profile
    ///
    /// `endpoint` overrides the regional Core Services endpoint.
    pub fn from_profile(
        client: Client,
        profile: &OciProfile,
        endpoint: Option<&str>,
    ) -> Result<Self, OciError> {
        let signer = RequestSigner::from_profile(profile)?;
        let endpoint = endpoint
            .map(str::to_string)
            .unwrap_or_else(|| profile.core_endpoint());
        Ok(Self::new(client, endpoint, signer))
    }

    /// Replace `rule_id` on `nsg_id` with an ingress rule from `ip`
    pub async fn update_ingress_rule(
        &self,
        nsg_id: &str,
        rule_id: &str,
        ip: &PublicIp,
    ) -> Result<Vec<SecurityRule>, OciError> {
        self.update_rules(nsg_id, vec![SecurityRuleUpdate::allow_all_from(rule_id, ip)])
            .await
    }

    /// Submit full replacements for existing rules on a security group
    pub async fn update_rules(
        &self,
        nsg_id: &str,
        rules: Vec<SecurityRuleUpdate>,
    ) -> Result<Vec<SecurityRule>, OciError> {
        let raw_url = format!(
            "{}/{}/networkSecurityGroups/{}/actions/updateSecurityRules",
            self.endpoint.trim_end_matches('/'),
            API_VERSION,
            nsg_id
        );
        let url = Url::parse(&raw_url).map_err(|e| OciError::InvalidRequest {
            message: format!("invalid endpoint URL {}: {}", raw_url, e),
        })?;

        let body = serde_json::to_vec(&UpdateSecurityRulesDetails {
            security_rules: rules,
        })
        .map_err(|e| OciError::InvalidRequest {
            message: format!("failed to encode request body: {}", e),
        })?;

        let signed = self.signer.sign("POST", &url, &body)?;
        debug!("POST {} (keyId={})", url, self.signer.key_id());

        let response = self
            .client
            .post(url.clone())
            .header("date", &signed.date)
            .header("x-content-sha256", &signed.x_content_sha256)
            .header("content-type", signer::CONTENT_TYPE)
            .header("authorization", &signed.authorization)
            .body(body)
            .send()
            .await
            .map_err(|source| OciError::Transport {
                url: raw_url.clone(),
                source,
            })?;

        let status = response.status();
        let request_id = response
            .headers()
            .get("opc-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let parsed: ApiErrorBody = serde_json::from_str(&text).unwrap_or(ApiErrorBody {
                code: String::new(),
                message: text,
            });
            return Err(OciError::Api {
                status: status.as_u16(),
                code: parsed.code,
                message: parsed.message,
                request_id,
            });
        }

        let updated: UpdatedSecurityRules =
            response
                .json()
                .await
                .map_err(|source| OciError::Transport {
                    url: raw_url.clone(),
                    source,
                })?;

        info!(
            "   {} rule(s) updated on {} [opc-request-id: {}]",
            updated.security_rules.len(),
            nsg_id,
            request_id
        );
        Ok(updated.security_rules)
    }
}
