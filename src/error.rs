//! Centralized error types for firewall-sync
//!
//! Uses thiserror for typed errors that can be matched on,
//! while still being compatible with anyhow for propagation.

use thiserror::Error;

/// Top-level error type for a sync run
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error(transparent)]
    PublicIp(#[from] PublicIpError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("OCI error ({target} security group)")]
    Nsg {
        target: String,
        #[source]
        source: OciError,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable {name} is not set")]
    MissingEnvVar { name: String },
}

/// GitHub Contents API errors
#[derive(Error, Debug)]
pub enum GitHubError {
    #[error("Request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GitHub returned {status} for {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("{path} changed since revision {sha} was read; push rejected")]
    RevisionConflict { path: String, sha: String },

    #[error("Failed to decode file content: {message}")]
    InvalidContent { message: String },
}

/// Public IP resolution errors
#[derive(Error, Debug)]
pub enum PublicIpError {
    #[error("Failed to query {url}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Echo service returned an invalid IPv4 address: {body:?}")]
    InvalidAddress { body: String },
}

/// Network policy document errors
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Failed to parse policy YAML")]
    Parse(#[source] serde_yaml::Error),

    #[error("Unexpected policy document shape at {path}: {reason}")]
    UnexpectedShape { path: String, reason: String },

    #[error("Failed to serialize policy YAML")]
    Serialize(#[source] serde_yaml::Error),
}

/// OCI configuration, signing and API errors
#[derive(Error, Debug)]
pub enum OciError {
    #[error("Invalid OCI config {path}: {message}")]
    Config { path: String, message: String },

    #[error("Failed to load API signing key {path}: {message}")]
    Key { path: String, message: String },

    #[error("Failed to sign request: {message}")]
    Signing { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("OCI API returned {status} ({code}): {message} [opc-request-id: {request_id}]")]
    Api {
        status: u16,
        code: String,
        message: String,
        request_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_env_var_display() {
        let err = ConfigError::MissingEnvVar {
            name: "GITHUB_TOKEN".to_string(),
        };
        assert!(err.to_string().contains("GITHUB_TOKEN"));
    }

    #[test]
    fn test_error_conversion() {
        let config_err = ConfigError::MissingEnvVar {
            name: "NSG_ID".to_string(),
        };
        let sync_err: SyncError = config_err.into();
        assert!(matches!(sync_err, SyncError::Config(_)));
    }

    #[test]
    fn test_nsg_error_names_target() {
        let err = SyncError::Nsg {
            target: "management".to_string(),
            source: OciError::Api {
                status: 404,
                code: "NotAuthorizedOrNotFound".to_string(),
                message: "Authorization failed or requested resource not found".to_string(),
                request_id: "abc".to_string(),
            },
        };
        assert_eq!(err.to_string(), "OCI error (management security group)");

        let chain = format!("{:#}", anyhow::Error::from(err));
        assert!(chain.contains("management"));
        assert!(chain.contains("NotAuthorizedOrNotFound"));
    }

    #[test]
    fn test_error_chain_prints_each_cause_once() {
        let err: SyncError = GitHubError::Status {
            url: "https://api.github.com/repos/o/r/contents/p".to_string(),
            status: 404,
            body: "Not Found".to_string(),
        }
        .into();

        let chain = format!("{:#}", anyhow::Error::from(err));
        assert_eq!(chain.matches("GitHub returned 404").count(), 1);

        let err: SyncError = PolicyError::Parse(
            serde_yaml::from_str::<serde_yaml::Value>("spec: [unterminated").unwrap_err(),
        )
        .into();
        let chain = format!("{:#}", anyhow::Error::from(err));
        assert!(chain.starts_with("Failed to parse policy YAML: "));
        assert_eq!(chain.matches("Failed to parse policy YAML").count(), 1);
    }
}
