//! Infrastructure layer - external I/O adapters
//!
//! This module contains all code that interacts with external systems:
//! - GitHub Contents API (policy document)
//! - Public IP echo service
//! - OCI Core Services (network security group rules)

pub mod github;
pub mod http;
pub mod oci;
pub mod public_ip;

// Re-export commonly used types
pub use github::{ContentsLocation, GitHubClient};
pub use oci::NsgClient;
pub use public_ip::PublicIpResolver;
