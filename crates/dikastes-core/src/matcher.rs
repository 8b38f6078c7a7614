//! Pure matching predicates (spec section 4.3). None of these perform I/O or
//! retain state across calls; the only "cache" involved is the compiled
//! selector cache owned by the `RequestCache` passed in.

use crate::error::MatchError;
use crate::model::{NamespaceMatch, Protocol, Rule, ServiceAccountMatch};
use crate::request_cache::RequestCache;

pub fn match_name(names: &[String], name: &str) -> bool {
    names.is_empty() || names.iter().any(|n| n == name)
}

/// Empty selector matches everything. A parse failure is logged at `warn`
/// and treated as "no match" — including when the selector is a
/// `NotSelector`, which can silently flip a negated rule to always-match.
/// Preserved intentionally; see the open question in DESIGN.md.
pub fn match_labels(
    selector_expr: &str,
    labels: &std::collections::HashMap<String, String>,
    cache: &RequestCache,
) -> bool {
    if selector_expr.is_empty() {
        return true;
    }
    match cache.compiled_selector(selector_expr) {
        Ok(selector) => selector.matches(labels),
        Err(source) => {
            let error = MatchError::SelectorParse {
                selector: selector_expr.to_string(),
                source,
            };
            tracing::warn!(%error, "failed to parse selector");
            false
        }
    }
}

pub fn match_http_methods(methods: &[String], method: &str) -> bool {
    methods.is_empty() || methods.iter().any(|m| m == "*" || m == method)
}

pub fn match_http(rule: &Rule, cache: &RequestCache) -> bool {
    match &rule.http_match {
        None => true,
        Some(http_match) => match_http_methods(&http_match.methods, cache.http_method().unwrap_or("")),
    }
}

pub fn match_service_accounts(
    sa_match: &ServiceAccountMatch,
    peer: &crate::model::Peer,
    cache: &RequestCache,
) -> bool {
    match_name(&sa_match.names, &peer.name) && match_labels(&sa_match.selector, &peer.labels, cache)
}

pub fn match_namespace(
    ns_match: &NamespaceMatch,
    namespace: &crate::model::Namespace,
    cache: &RequestCache,
) -> bool {
    match_name(&ns_match.names, &namespace.name)
        && match_labels(&ns_match.selector, &namespace.labels, cache)
}

/// A namespaced policy without any identity narrower still matches
/// cross-namespace traffic (a global profile rule shouldn't be silently
/// scoped); one that narrows by pod selector or service account is scoped to
/// its own namespace so it can't assert authority elsewhere.
pub fn compute_namespace_match(
    policy_namespace: &str,
    namespace_selector: &str,
    pod_selector: &str,
    not_pod_selector: &str,
    sa_match: &ServiceAccountMatch,
) -> NamespaceMatch {
    if !namespace_selector.is_empty() {
        return NamespaceMatch {
            names: Vec::new(),
            selector: namespace_selector.to_string(),
        };
    }

    let has_identity_narrower = !pod_selector.is_empty()
        || !not_pod_selector.is_empty()
        || !sa_match.names.is_empty()
        || !sa_match.selector.is_empty();

    if !policy_namespace.is_empty() && has_identity_narrower {
        return NamespaceMatch {
            names: vec![policy_namespace.to_string()],
            selector: String::new(),
        };
    }

    NamespaceMatch::default()
}

fn protocol_names(protocol: &Protocol, request_proto: &str) -> bool {
    protocol
        .canonical_name()
        .map(|name| name.eq_ignore_ascii_case(request_proto))
        .unwrap_or(false)
}

/// Per spec section 4.3: a request's destination is always present by the
/// time it reaches the matcher (`dikastes-protocol` rejects a `CheckRequest`
/// with no destination before it gets this far), so step 1 of the original
/// algorithm ("if dest is absent, return false") has no representable input
/// here.
pub fn match_l4_protocol(rule: &Rule, cache: &RequestCache) -> bool {
    let request_proto = cache.destination_protocol();

    if let Some(protocol) = &rule.protocol {
        return protocol_names(protocol, request_proto);
    }
    if let Some(not_protocol) = &rule.not_protocol {
        return !protocol_names(not_protocol, request_proto);
    }
    true
}

fn match_source(rule: &Rule, cache: &RequestCache, policy_namespace: &str) -> bool {
    let ns_match = compute_namespace_match(
        policy_namespace,
        &rule.src_namespace_selector,
        &rule.original_src_selector,
        &rule.not_original_src_selector,
        &rule.src_service_account,
    );
    match_service_accounts(&rule.src_service_account, cache.source_peer(), cache)
        && match_namespace(&ns_match, cache.source_namespace(), cache)
}

fn match_destination(rule: &Rule, cache: &RequestCache, policy_namespace: &str) -> bool {
    let ns_match = compute_namespace_match(
        policy_namespace,
        &rule.dst_namespace_selector,
        &rule.original_dst_selector,
        &rule.not_original_dst_selector,
        &rule.dst_service_account,
    );
    match_service_accounts(&rule.dst_service_account, cache.destination_peer(), cache)
        && match_namespace(&ns_match, cache.destination_namespace(), cache)
}

/// Top-level rule predicate: `matchSource && matchDestination && matchHTTP
/// && matchL4Protocol`, short-circuiting on the first `false`.
pub fn match_rule(rule: &Rule, cache: &RequestCache, policy_namespace: &str) -> bool {
    match_source(rule, cache, policy_namespace)
        && match_destination(rule, cache, policy_namespace)
        && match_http(rule, cache)
        && match_l4_protocol(rule, cache)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Action, HttpMatch, NamespaceId, ServiceAccountId};
    use crate::request::{CheckRequest, RawHttpRequest, RawPeer, RawSocketAddress};
    use crate::store::{NamespaceInfo, ServiceAccountInfo, StoreState};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn empty_rule() -> Rule {
        Rule {
            action: Action::Allow,
            src_service_account: ServiceAccountMatch::default(),
            dst_service_account: ServiceAccountMatch::default(),
            src_namespace_selector: String::new(),
            dst_namespace_selector: String::new(),
            original_src_selector: String::new(),
            original_dst_selector: String::new(),
            not_original_src_selector: String::new(),
            not_original_dst_selector: String::new(),
            http_match: None,
            protocol: None,
            not_protocol: None,
        }
    }

    fn labeled_store() -> Arc<StoreState> {
        let mut state = StoreState::default();
        state.service_account_by_id.insert(
            ServiceAccountId {
                namespace: "default".into(),
                name: "sam".into(),
            },
            ServiceAccountInfo {
                labels: HashMap::new(),
            },
        );
        state.service_account_by_id.insert(
            ServiceAccountId {
                namespace: "default".into(),
                name: "ian".into(),
            },
            ServiceAccountInfo {
                labels: HashMap::new(),
            },
        );
        Arc::new(state)
    }

    #[test]
    fn match_name_universal_properties() {
        assert!(match_name(&[], "anything"));
        assert!(match_name(&["a".to_string(), "b".to_string()], "a"));
        assert!(!match_name(&["a".to_string()], "b"));
    }

    #[test]
    fn match_http_methods_universal_properties() {
        assert!(match_http_methods(&[], "get"));
        assert!(match_http_methods(&["*".to_string()], "anything"));
        assert!(!match_http_methods(&["GET".to_string()], "get"));
        assert!(match_http_methods(&["GET".to_string()], "GET"));
    }

    #[test]
    fn compute_namespace_match_parity() {
        let sa = ServiceAccountMatch::default();
        let result = compute_namespace_match("", "", "", "", &sa);
        assert!(result.names.is_empty());
        assert!(result.selector.is_empty());
    }

    #[test]
    fn namespaced_policy_without_narrower_is_unrestricted() {
        let sa = ServiceAccountMatch::default();
        let result = compute_namespace_match("testns", "", "", "", &sa);
        assert!(result.names.is_empty());
    }

    #[test]
    fn namespaced_policy_with_narrower_is_scoped() {
        let sa = ServiceAccountMatch {
            names: vec!["sam".into()],
            selector: String::new(),
        };
        let result = compute_namespace_match("testns", "", "", "", &sa);
        assert_eq!(result.names, vec!["testns".to_string()]);
    }

    #[test]
    fn namespace_selector_always_wins_over_narrower() {
        let sa = ServiceAccountMatch {
            names: vec!["sam".into()],
            selector: String::new(),
        };
        let result = compute_namespace_match("testns", "place=='src'", "", "", &sa);
        assert_eq!(result.selector, "place=='src'");
        assert!(result.names.is_empty());
    }

    #[test]
    fn match_rule_with_sa_list_http_and_protocol() {
        let store = labeled_store();
        let request = CheckRequest {
            source: RawPeer {
                principal: "spiffe://cluster.local/ns/default/sa/sam".into(),
                ..Default::default()
            },
            destination: RawPeer {
                principal: "spiffe://cluster.local/ns/default/sa/ian".into(),
                address: Some(RawSocketAddress {
                    protocol: Some("TCP".into()),
                }),
                ..Default::default()
            },
            http: Some(RawHttpRequest {
                method: "GET".into(),
            }),
        };
        let cache = RequestCache::new(store, &request);

        let mut rule = empty_rule();
        rule.src_service_account.names = vec!["john".into(), "stevie".into(), "sam".into()];
        rule.dst_service_account.names = vec!["ian".into()];
        rule.http_match = Some(HttpMatch {
            methods: vec!["GET".into(), "POST".into()],
        });
        rule.protocol = Some(Protocol::Name("TCP".into()));

        assert!(match_rule(&rule, &cache, ""));
    }

    #[test]
    fn match_rule_with_namespace_selectors() {
        let mut state = StoreState::default();
        state.namespace_by_id.insert(
            NamespaceId { name: "src".into() },
            NamespaceInfo {
                labels: HashMap::from([("place".to_string(), "src".to_string())]),
            },
        );
        state.namespace_by_id.insert(
            NamespaceId { name: "dst".into() },
            NamespaceInfo {
                labels: HashMap::from([("place".to_string(), "dst".to_string())]),
            },
        );
        let store = Arc::new(state);

        let request = CheckRequest {
            source: RawPeer {
                principal: "spiffe://cluster.local/ns/src/sa/sam".into(),
                ..Default::default()
            },
            destination: RawPeer {
                principal: "spiffe://cluster.local/ns/dst/sa/ian".into(),
                ..Default::default()
            },
            http: None,
        };
        let cache = RequestCache::new(store, &request);

        let mut rule = empty_rule();
        rule.src_namespace_selector = "place=='src'".into();
        rule.dst_namespace_selector = "place=='dst'".into();

        assert!(match_rule(&rule, &cache, ""));
    }

    #[test]
    fn match_rule_policy_namespace_scoping() {
        let store = labeled_store();
        let request = CheckRequest {
            source: RawPeer {
                principal: "spiffe://cluster.local/ns/testns/sa/sam".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let cache = RequestCache::new(store, &request);

        let mut rule = empty_rule();
        rule.original_src_selector = "has(app)".into();

        assert!(!match_rule(&rule, &cache, "different"));
        assert!(!match_rule(&rule, &cache, "testns"));

        let mut sa_only_rule = empty_rule();
        sa_only_rule.src_service_account.names = vec!["sam".into()];
        assert!(!match_rule(&sa_only_rule, &cache, "different"));
        assert!(match_rule(&sa_only_rule, &cache, "testns"));
    }

    #[test]
    fn match_l4_protocol_default_cases() {
        let store = Arc::new(StoreState::default());

        let udp_request = CheckRequest {
            destination: RawPeer {
                address: Some(RawSocketAddress {
                    protocol: Some("UDP".into()),
                }),
                ..Default::default()
            },
            ..Default::default()
        };
        let cache = RequestCache::new(store.clone(), &udp_request);
        assert!(match_l4_protocol(&empty_rule(), &cache));

        let default_request = CheckRequest::default();
        let cache = RequestCache::new(store.clone(), &default_request);
        let mut rule = empty_rule();
        rule.protocol = Some(Protocol::Number(17));
        assert!(!match_l4_protocol(&rule, &cache));

        let mut rule = empty_rule();
        rule.not_protocol = Some(Protocol::Name("UDP".into()));
        assert!(match_l4_protocol(&rule, &cache));

        let tcp_request = CheckRequest {
            destination: RawPeer {
                address: Some(RawSocketAddress {
                    protocol: Some("TCP".into()),
                }),
                ..Default::default()
            },
            ..Default::default()
        };
        let cache = RequestCache::new(store, &tcp_request);
        let mut rule = empty_rule();
        rule.not_protocol = Some(Protocol::Number(6));
        assert!(!match_l4_protocol(&rule, &cache));
    }
}
