//! Domain layer - pure business logic
//!
//! This module contains business logic with no external I/O.
//! Types and functions here can be unit tested without mocking.

pub mod address;
pub mod policy;

// Re-export commonly used types
pub use address::PublicIp;
pub use policy::NetworkPolicy;
