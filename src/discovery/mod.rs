//! Tenant discovery engine
//!
//! This module walks an Azure tenant's management hierarchy and assembles
//! a graph of immutable state records, deduplicating work through two
//! interlocking caches and a bounded worker pool.
//!
//! # Architecture
//!
//! - [`identifier`] - Identifier canonicalization and type derivation
//! - [`api_versions`] - Per-type API version resolution, bootstrapped once
//! - [`response_cache`] - URI → payload cache, closest to the network
//! - [`router`] - URI composition and transport dispatch
//! - [`node`] - The [`StateNode`] record and its aspects
//! - [`state_cache`] - id → node cache, closest to callers
//! - [`policy`] - Per-type discovery policy table
//! - [`parents`] - Parent resolution and the opportunistic hint map
//! - [`builder`] - Node construction and cache installation
//! - [`bulk`] - Bounded-fan-out batch building
//! - [`driver`] - Fixed-point recursion with inclusion filters
//! - [`engine`] - The handle wiring all of the above together
//!
//! # Example
//!
//! ```ignore
//! use armscope::discovery::{CacheMode, DiscoveryEngine, DiscoveryMode};
//! use std::sync::Arc;
//!
//! async fn snapshot(transport: Arc<dyn armscope::azure::Transport>) -> armscope::Result<()> {
//!     let engine = DiscoveryEngine::new(transport);
//!     let built = engine
//!         .build(
//!             "/providers/Microsoft.Management/managementGroups/root",
//!             CacheMode::UseCache,
//!             DiscoveryMode::IncludeBoth,
//!         )
//!         .await?;
//!     println!("{} children", built.node.children.len());
//!     Ok(())
//! }
//! ```

pub mod api_versions;
pub mod builder;
pub mod bulk;
pub mod driver;
pub mod engine;
pub mod identifier;
pub mod node;
pub mod options;
pub mod parents;
pub mod policy;
pub mod response_cache;
pub mod router;
pub mod state_cache;

pub use api_versions::ApiVersionRegistry;
pub use builder::{BuiltNode, Diagnostic, NodeBuilder};
pub use bulk::{BulkFetcher, BulkResult};
pub use driver::{TenantWalker, WalkResult};
pub use engine::DiscoveryEngine;
pub use identifier::ResourceType;
pub use node::{IamAspect, PolicyAspect, ResourceRef, StateNode};
pub use options::{CacheMode, DiscoveryMode, Release, WalkOptions, DEFAULT_THROTTLE_LIMIT};
pub use parents::{ListingHints, ParentResolver};
pub use response_cache::RawResponseCache;
pub use router::{Payload, RequestRouter};
pub use state_cache::StateCache;
