//! Property-based tests using proptest
//!
//! These tests verify identifier canonicalization, resource-type
//! derivation, and path composition over randomized inputs.

use armscope::discovery::identifier::{
    cache_key, derive_type, parent_scope, short_name, subscription_scope,
};
use proptest::prelude::*;

/// Generate an arbitrary GUID-shaped segment
fn arb_guid() -> impl Strategy<Value = String> {
    "[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}"
}

/// Generate an arbitrary path segment
fn arb_segment() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9-]{0,20}"
}

/// Generate an arbitrary provider namespace
fn arb_namespace() -> impl Strategy<Value = String> {
    ("[A-Z][a-zA-Z]{2,12}", "[A-Z][a-zA-Z]{2,12}")
        .prop_map(|(vendor, service)| format!("{vendor}.{service}"))
}

/// Generate well-formed identifiers of every class the derivation rules
/// cover: management groups, subscriptions, resource groups, resource
/// collections, and provider-addressed resources
fn arb_identifier() -> impl Strategy<Value = String> {
    prop_oneof![
        arb_segment()
            .prop_map(|name| format!("/providers/Microsoft.Management/managementGroups/{name}")),
        arb_guid().prop_map(|guid| format!("/subscriptions/{guid}")),
        (arb_guid(), arb_segment())
            .prop_map(|(guid, rg)| format!("/subscriptions/{guid}/resourceGroups/{rg}")),
        (arb_guid(), arb_segment())
            .prop_map(|(guid, rg)| format!("/subscriptions/{guid}/resourceGroups/{rg}/resources")),
        (arb_guid(), arb_segment(), arb_namespace(), arb_segment(), arb_segment()).prop_map(
            |(guid, rg, ns, rt, name)| format!(
                "/subscriptions/{guid}/resourceGroups/{rg}/providers/{ns}/{rt}/{name}"
            )
        ),
    ]
}

proptest! {
    /// Derivation totality: every well-formed identifier yields a
    /// non-empty type
    #[test]
    fn derivation_is_total_on_well_formed_ids(id in arb_identifier()) {
        let resource_type = derive_type(&id).expect("derivable");
        prop_assert!(!resource_type.as_str().is_empty());
        prop_assert!(resource_type.as_str().contains('/'));
    }

    /// Canonicalization idempotence: lowercasing the identifier never
    /// changes the derived type
    #[test]
    fn derivation_is_case_insensitive(id in arb_identifier()) {
        let original = derive_type(&id).expect("derivable");
        let folded = derive_type(&id.to_lowercase()).expect("derivable");
        prop_assert_eq!(original, folded);
    }

    /// Cache keys are idempotent under canonicalization
    #[test]
    fn cache_key_is_idempotent(id in arb_identifier()) {
        let once = cache_key(&id);
        prop_assert_eq!(cache_key(&once), once.clone());
        prop_assert_eq!(cache_key(&id.to_uppercase()), once);
    }

    /// A parent scope is always a proper prefix of the identifier
    #[test]
    fn parent_scope_is_a_proper_prefix(id in arb_identifier()) {
        if let Some(scope) = parent_scope(&id) {
            prop_assert!(id.starts_with(&scope));
            prop_assert!(scope.len() < id.len());
        }
    }

    /// The subscription scope, when present, pins the first two segments
    #[test]
    fn subscription_scope_matches_leading_guid(guid in arb_guid(), rest in arb_segment()) {
        let id = format!("/subscriptions/{guid}/resourceGroups/{rest}");
        let scope = subscription_scope(&id).expect("guid prefix");
        prop_assert_eq!(scope, format!("/subscriptions/{guid}"));
    }

    /// Path composition round-trip: appending a short name and removing
    /// the final segment restores the parent path
    #[test]
    fn path_composition_round_trips(
        parents in prop::collection::vec(arb_segment(), 0..6),
        id in arb_identifier()
    ) {
        let parent_path = if parents.is_empty() {
            String::new()
        } else {
            format!("/{}", parents.join("/"))
        };
        let resource_path = format!("{}/{}", parent_path, short_name(&id));

        let cut = resource_path.rfind('/').expect("composed path has a slash");
        prop_assert_eq!(&resource_path[..cut], parent_path.as_str());
        prop_assert_eq!(&resource_path[cut + 1..], short_name(&id));
    }

    /// Short names never contain a separator and are never empty
    #[test]
    fn short_name_is_a_single_segment(id in arb_identifier()) {
        let name = short_name(&id);
        prop_assert!(!name.is_empty());
        prop_assert!(!name.contains('/'));
    }
}
