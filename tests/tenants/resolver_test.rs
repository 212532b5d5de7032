//! Tenant resolution policy tests.

use std::sync::Arc;

use concierge::tenants::{ResolutionSource, ResolveError, TenantRegistry, TenantResolver};

use crate::common::{registry, DEFAULT_TENANT};

fn resolver() -> TenantResolver {
    TenantResolver::new(registry(), DEFAULT_TENANT).expect("default tenant should exist")
}

#[test]
fn absent_identifier_selects_default() {
    let resolver = resolver();
    for _ in 0..3 {
        let resolved = resolver.resolve(None).expect("default should resolve");
        assert_eq!(resolved.tenant.id, DEFAULT_TENANT);
        assert_eq!(resolved.source, ResolutionSource::Default);
    }
}

#[test]
fn blank_identifier_counts_as_absent() {
    let resolved = resolver().resolve(Some("   ")).expect("blank should default");
    assert_eq!(resolved.tenant.id, DEFAULT_TENANT);
    assert_eq!(resolved.source, ResolutionSource::Default);
}

#[test]
fn every_registered_identifier_resolves_to_its_record() {
    let resolver = resolver();
    let registry = registry();
    for id in registry.ids() {
        let resolved = resolver.resolve(Some(id)).expect("known id should resolve");
        assert_eq!(resolved.tenant.id, id);
        assert_eq!(resolved.source, ResolutionSource::Requested);
        assert_eq!(Some(&resolved.tenant), registry.get(id));
    }
}

#[test]
fn every_loadable_identifier_is_reachable() {
    let record = r#"{"name": "N", "city": "C", "whatsapp": "+1", "location": "l",
        "breakfast_info": "b", "wifi_info": "w", "tours_info": "t"}"#;
    let json = format!(r#"{{"dar fes": {record}, "d": {record}}}"#);
    let registry = Arc::new(TenantRegistry::from_json(&json).expect("registry should load"));
    let resolver = TenantResolver::new(Arc::clone(&registry), "d").expect("default exists");

    for id in registry.ids() {
        let resolved = resolver.resolve(Some(id)).expect("registered id should resolve");
        assert_eq!(resolved.tenant.id, id);
    }

    let padded = format!(r#"{{" a ": {record}, "d": {record}}}"#);
    assert!(TenantRegistry::from_json(&padded).is_err());
}

#[test]
fn unknown_identifier_is_rejected_not_defaulted() {
    let resolver = resolver();
    let before: Vec<String> = resolver.registry().ids().map(str::to_owned).collect();

    let result = resolver.resolve(Some("missing"));
    assert_eq!(
        result.map(|r| r.tenant.id.clone()),
        Err(ResolveError::UnknownTenant {
            id: "missing".to_owned()
        })
    );

    let after: Vec<String> = resolver.registry().ids().map(str::to_owned).collect();
    assert_eq!(before, after);
}

#[test]
fn lookup_is_case_sensitive() {
    let result = resolver().resolve(Some("RIAD_ZIZ"));
    assert!(matches!(result, Err(ResolveError::UnknownTenant { .. })));
}

#[test]
fn unknown_default_fails_construction() {
    let result = TenantResolver::new(registry(), "nowhere");
    assert!(matches!(
        result,
        Err(ResolveError::UnknownDefault { ref id }) if id == "nowhere"
    ));
}
