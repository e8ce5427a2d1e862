//! lmsprov Provider Bindings
//!
//! The provisioning API the reconciler talks to, and its implementations:
//! the gcloud CLI and a local state backend.

pub mod error;
pub mod gcloud;
pub mod local;
pub mod provisioner;
pub mod resources;
pub mod runner;

pub use error::{ProviderError, Result};
pub use gcloud::GcloudProvisioner;
pub use local::LocalProvisioner;
pub use provisioner::{matches_name, Provisioner, Scope};
pub use runner::{CommandOutput, CommandRunner, ProcessRunner};
