//! CLI definitions for firewall-sync
//!
//! Required settings come from the environment (see `config`); the flags here
//! only change how a run behaves or where it sends requests.

use clap::Parser;

use crate::infrastructure::github::GITHUB_API_URL;
use crate::infrastructure::public_ip::PUBLIC_IP_URL;
use crate::services::{SyncEndpoints, SyncOptions};

#[derive(Parser, Debug)]
#[command(
    name = "firewall-sync",
    version,
    about = "Point the gateway network policy and OCI security rules at the current public IP",
    long_about = "Resolves the current public IPv4 address, rewrites the first CIDR of the \
    gateway network policy stored in GitHub, then replaces the primary and management \
    OCI network security group rules with a /32 ingress rule from that address."
)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Resolve the address and render the policy without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// GitHub API root
    #[arg(long, env = "GITHUB_API_URL", default_value = GITHUB_API_URL)]
    pub github_api_url: String,

    /// Public IP echo service
    #[arg(long, env = "PUBLIC_IP_URL", default_value = PUBLIC_IP_URL)]
    pub public_ip_url: String,

    /// OCI Core Services endpoint (defaults to the profile region's endpoint)
    #[arg(long, env = "OCI_ENDPOINT")]
    pub oci_endpoint: Option<String>,
}

impl Cli {
    pub fn endpoints(&self) -> SyncEndpoints {
        SyncEndpoints {
            github_api: self.github_api_url.clone(),
            public_ip: self.public_ip_url.clone(),
            oci: self.oci_endpoint.clone(),
        }
    }

    pub fn options(&self) -> SyncOptions {
        SyncOptions {
            dry_run: self.dry_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_map_to_endpoints_and_options() {
        let cli = Cli::try_parse_from([
            "firewall-sync",
            "--dry-run",
            "--github-api-url",
            "http://localhost:9000",
            "--oci-endpoint",
            "http://localhost:9001",
        ])
        .unwrap();

        assert!(cli.options().dry_run);
        let endpoints = cli.endpoints();
        assert_eq!(endpoints.github_api, "http://localhost:9000");
        assert_eq!(endpoints.oci.as_deref(), Some("http://localhost:9001"));
    }
}
