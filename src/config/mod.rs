//! # Run Configuration
//!
//! Every value the sync needs comes from the process environment. All eleven
//! variables are required; the first missing one aborts the run before any
//! network call is made.
//!
//! ## Environment
//!
//! | Variable           | Used for                                   |
//! |--------------------|--------------------------------------------|
//! | `GITHUB_TOKEN`     | GitHub Contents API token                  |
//! | `REPO_OWNER`       | Repository owner                           |
//! | `REPO_NAME`        | Repository name                            |
//! | `FILE_PATH`        | Path of the policy YAML in the repository  |
//! | `BRANCH_NAME`      | Branch the policy is read from / pushed to |
//! | `NSG_ID`           | Primary network security group OCID        |
//! | `NSG_RULE_ID`      | Primary security rule id                   |
//! | `OCI_CONFIG`       | OCI config file for the primary tenancy    |
//! | `MGMT_NSG_ID`      | Management network security group OCID     |
//! | `MGMT_NSG_RULE_ID` | Management security rule id                |
//! | `MGMT_OCI_CONFIG`  | OCI config file for the management tenancy |

pub mod oci;

use std::path::PathBuf;

use crate::error::ConfigError;

pub use oci::{OciProfile, DEFAULT_PROFILE};

/// Repository coordinates of the policy document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubSettings {
    pub token: String,
    pub owner: String,
    pub repo: String,
    pub file_path: String,
    pub branch: String,
}

/// One security rule to keep pointed at the current address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsgTarget {
    /// Human-readable name used in logs and errors
    pub label: String,
    pub nsg_id: String,
    pub rule_id: String,
    /// OCI SDK config file holding the credentials for this tenancy
    pub oci_config: PathBuf,
    pub profile: String,
}

/// Complete configuration for one sync run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub github: GitHubSettings,
    pub primary: NsgTarget,
    pub management: NsgTarget,
}

impl Settings {
    /// Load settings through an arbitrary variable lookup
    ///
    /// Values that are empty or whitespace-only are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &str| -> Result<String, ConfigError> {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar {
                    name: name.to_string(),
                })
        };

        let github = GitHubSettings {
            token: require("GITHUB_TOKEN")?,
            owner: require("REPO_OWNER")?,
            repo: require("REPO_NAME")?,
            file_path: require("FILE_PATH")?,
            branch: require("BRANCH_NAME")?,
        };

        let primary = NsgTarget {
            label: "primary".to_string(),
            nsg_id: require("NSG_ID")?,
            rule_id: require("NSG_RULE_ID")?,
            oci_config: PathBuf::from(require("OCI_CONFIG")?),
            profile: DEFAULT_PROFILE.to_string(),
        };

        let management = NsgTarget {
            label: "management".to_string(),
            nsg_id: require("MGMT_NSG_ID")?,
            rule_id: require("MGMT_NSG_RULE_ID")?,
            oci_config: PathBuf::from(require("MGMT_OCI_CONFIG")?),
            profile: DEFAULT_PROFILE.to_string(),
        };

        Ok(Self {
            github,
            primary,
            management,
        })
    }

    /// Both security rule targets, in update order
    pub fn nsg_targets(&self) -> [&NsgTarget; 2] {
        [&self.primary, &self.management]
    }
}
