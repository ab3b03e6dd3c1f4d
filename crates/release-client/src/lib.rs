//! `release-client`: async HTTP clients for the two systems shipgate drives.
//!
//! - [`ReleaseClient`] talks to the release-management API: project,
//!   environment and release lookups, deployment listing and creation.
//! - [`BuildClient`] queues parameterised builds.
//!
//! Both clients carry a request timeout set at construction. Non-success
//! responses surface as [`ClientError::Status`] with the response body.

pub mod builds;
pub mod error;
pub mod release;
pub mod types;


pub use builds::BuildClient;
pub use error::ClientError;
pub use release::ReleaseClient;
pub use types::{
    BuildParameters, CreateDeployment, CreatedDeployment, Deployment, Environment, Page, Project,
    QueuedBuild, Release,
};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, ClientError>;
