//! Resource identifiers
//!
//! Parsing, canonicalization, and type derivation for ARM resource
//! identifiers. Identifiers are absolute, case-insensitive path strings of
//! the form `/collection/{id}[/collection/{id}]*[/providers/{ns}/{type}/{id}]*`.

use crate::error::{DiscoveryError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

pub const MANAGEMENT_GROUP_TYPE: &str = "Microsoft.Management/managementGroups";
pub const SUBSCRIPTION_TYPE: &str = "Microsoft.Resources/subscriptions";
pub const RESOURCE_GROUP_TYPE: &str = "Microsoft.Resources/resourceGroups";
pub const GENERIC_RESOURCES_TYPE: &str = "Microsoft.Resources/resources";

/// Scope anchoring the listing of every management group in the tenant
pub const MANAGEMENT_GROUP_SCOPE: &str = "/providers/Microsoft.Management/managementGroups";

fn subscription_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^/subscriptions/[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}",
        )
        .expect("subscription prefix pattern is valid")
    })
}

/// Resource type: a `{namespace}/{type}` pair.
///
/// Identifiers and types are case-insensitive in ARM, so equality and
/// hashing fold case while the original spelling is preserved for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceType(String);

impl ResourceType {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Namespace portion, i.e. everything before the first `/`
    pub fn namespace(&self) -> &str {
        self.0.split('/').next().unwrap_or(&self.0)
    }
}

impl PartialEq for ResourceType {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for ResourceType {}

impl PartialEq<&str> for ResourceType {
    fn eq(&self, other: &&str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl Hash for ResourceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.0.as_bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceType {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Canonical cache key for an identifier
pub fn cache_key(id: &str) -> String {
    id.trim_end_matches('/').to_lowercase()
}

/// Final non-empty path segment of an identifier
pub fn short_name(id: &str) -> &str {
    id.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(id)
}

/// Derive the resource type of an identifier.
///
/// First match wins:
/// 1. ids containing `/providers/` take the innermost `{namespace}/{type}`
///    chain after the last `/providers/` (nested types alternate
///    type/name segments);
/// 2. ids ending in `/resources` are the synthetic
///    `Microsoft.Resources/resources`;
/// 3. ids ending in `/resourceGroups` or `/resourceGroups/{name}` are
///    `Microsoft.Resources/resourceGroups`;
/// 4. ids ending in `/subscriptions` or `/subscriptions/{id}` are
///    `Microsoft.Resources/subscriptions`.
pub fn derive_type(id: &str) -> Result<ResourceType> {
    let trimmed = strip_query(id).trim_end_matches('/');
    let lower = trimmed.to_lowercase();
    // ASCII lowercasing preserves byte offsets; anything else is matched
    // on the folded copy throughout
    let sliced: &str = if trimmed.is_ascii() { trimmed } else { &lower };

    if let Some(pos) = lower.rfind("/providers/") {
        let tail = &sliced[pos + "/providers/".len()..];
        let segments: Vec<&str> = tail.split('/').filter(|s| !s.is_empty()).collect();
        if segments.len() >= 2 {
            // namespace, then every other segment is a type level
            let mut parts = vec![segments[0]];
            let mut i = 1;
            while i < segments.len() {
                parts.push(segments[i]);
                i += 2;
            }
            return Ok(ResourceType::new(parts.join("/")));
        }
        return Err(DiscoveryError::UnknownResourceType(id.to_string()));
    }

    let segments: Vec<&str> = lower.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [.., "resources"] => Ok(ResourceType::new(GENERIC_RESOURCES_TYPE)),
        [.., "resourcegroups"] | [.., "resourcegroups", _] => {
            Ok(ResourceType::new(RESOURCE_GROUP_TYPE))
        }
        [.., "subscriptions"] | [.., "subscriptions", _] => {
            Ok(ResourceType::new(SUBSCRIPTION_TYPE))
        }
        _ => Err(DiscoveryError::UnknownResourceType(id.to_string())),
    }
}

/// Drop the query string, if any
pub fn strip_query(id: &str) -> &str {
    match id.find('?') {
        Some(pos) => &id[..pos],
        None => id,
    }
}

/// Governing scope of a provider-addressed resource: the identifier with
/// its trailing provider chain (or innermost type/name pair) removed.
/// Returns `None` when nothing remains.
pub fn parent_scope(id: &str) -> Option<String> {
    let trimmed = id.trim_end_matches('/');
    let lower = trimmed.to_lowercase();
    let sliced: &str = if trimmed.is_ascii() { trimmed } else { &lower };
    let pos = lower.rfind("/providers/")?;

    let tail = &sliced[pos + "/providers/".len()..];
    let segments: Vec<&str> = tail.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() > 3 {
        // nested resource: the parent is the enclosing resource, one
        // type/name pair up (one segment for a trailing collection)
        let keep = if segments.len() % 2 == 0 {
            segments.len() - 1
        } else {
            segments.len() - 2
        };
        let parent = format!(
            "{}/providers/{}",
            &sliced[..pos],
            segments[..keep].join("/")
        );
        return Some(parent);
    }

    let scope = &sliced[..pos];
    if scope.is_empty() {
        None
    } else {
        Some(scope.to_string())
    }
}

/// `/subscriptions/{guid}` prefix of an identifier, if present
pub fn subscription_scope(id: &str) -> Option<String> {
    subscription_prefix_re()
        .find(id)
        .map(|m| m.as_str().to_string())
}
