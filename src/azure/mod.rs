//! ARM API interaction module
//!
//! This module provides the plumbing for talking to the Azure Resource
//! Manager endpoint: authentication, the HTTP wrapper, and the client that
//! implements the [`Transport`] trait the discovery engine consumes.
//!
//! # Module Structure
//!
//! - [`auth`] - OAuth2 client-credentials authentication with token caching
//! - [`client`] - Main ARM client and the [`Transport`] trait
//! - [`http`] - HTTP utilities for REST API calls
//!
//! # Example
//!
//! ```ignore
//! use armscope::azure::{ArmClient, AzureCredentials};
//!
//! async fn example() -> armscope::Result<()> {
//!     let credentials = AzureCredentials::from_env()?;
//!     let client = ArmClient::new(credentials, "00000000-0000-0000-0000-000000000001")?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;

pub use auth::AzureCredentials;
pub use client::{ArmClient, Transport, DEFAULT_MANAGEMENT_BASE};
pub use http::RawResponse;
