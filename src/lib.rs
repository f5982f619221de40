//! armscope - discover the management hierarchy of an Azure tenant
//!
//! `armscope` walks a tenant's resource tree (management groups,
//! subscriptions, resource groups, resources) over the ARM REST API and
//! materializes a consistent, navigable snapshot of state records along
//! with their access-control and policy associations. It is built for
//! operational tooling: drift detection, inventory, infrastructure-as-code
//! export.
//!
//! # Module Structure
//!
//! - [`azure`] - Authentication and the ARM transport
//! - [`discovery`] - The discovery and caching engine
//! - [`error`] - The crate's error type
//!
//! # Example
//!
//! ```ignore
//! use armscope::azure::{ArmClient, AzureCredentials};
//! use armscope::discovery::{DiscoveryEngine, WalkOptions};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> armscope::Result<()> {
//!     let credentials = AzureCredentials::from_env()?;
//!     let client = ArmClient::new(credentials, "00000000-0000-0000-0000-000000000001")?;
//!     let engine = DiscoveryEngine::new(Arc::new(client));
//!
//!     let walker = engine.walker(WalkOptions::default());
//!     let result = walker
//!         .walk("/providers/Microsoft.Management/managementGroups/root")
//!         .await?;
//!     for node in &result.nodes {
//!         println!("{} {}", node.resource_type, node.resource_path);
//!     }
//!     Ok(())
//! }
//! ```

pub mod azure;
pub mod discovery;
pub mod error;

pub use error::{DiscoveryError, Result};
