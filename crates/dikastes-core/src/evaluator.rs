//! `PolicyEvaluator`: walks the destination endpoint's tiered policy list,
//! then its profiles, per spec section 4.4. The sidecar only ever protects
//! inbound traffic to its own endpoint, so evaluation always consults
//! `inbound_rules` — there is no "am I the source or the destination" branch
//! to make here, unlike in `Matcher::match_rule`.

use crate::error::EvalError;
use crate::matcher;
use crate::model::{Action, PolicyId, ProfileId};
use crate::request::CheckRequest;
use crate::request_cache::RequestCache;
use crate::store::PolicyStore;

/// Identifies which policy or profile produced a decision, for logging and
/// for the caller to surface in response metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchedBy {
    Policy(PolicyId),
    Profile(ProfileId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The snapshot observed for this call was not yet in sync.
    NotReady,
    /// A rule (or a policy's own `default_action`) explicitly denied.
    Rule,
    /// Nothing matched in any tier or profile.
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(MatchedBy),
    Deny {
        matched: Option<MatchedBy>,
        reason: DenyReason,
    },
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }
}

pub struct PolicyEvaluator;

impl PolicyEvaluator {
    /// Produces a decision for one authorization call. Infallible by design
    /// (spec section 7): every error path this function can hit — missing
    /// endpoint, missing policy/profile reference, not-in-sync — resolves
    /// to a `Deny` rather than an `Err`.
    pub fn evaluate(store: &PolicyStore, request: &CheckRequest) -> Decision {
        let snapshot = store.snapshot();

        if !snapshot.in_sync {
            return Decision::Deny {
                matched: None,
                reason: DenyReason::NotReady,
            };
        }

        let cache = RequestCache::new(snapshot.clone(), request);

        let Some(endpoint) = snapshot.endpoint.as_ref() else {
            return Decision::Deny {
                matched: None,
                reason: DenyReason::Default,
            };
        };

        for tier in &endpoint.tiers {
            if let Some(decision) = Self::evaluate_tier(&snapshot, &cache, tier) {
                return decision;
            }
            // No policy in this tier reached a terminal action. The data
            // model carries no tier-level default action distinct from its
            // member policies', so there is no implicit drop to apply here
            // beyond what each policy already expressed — fall through to
            // the next tier.
        }

        // Profiles carry no namespace of their own (`model::Profile` has no
        // `namespace` field) — they are the global fallback, so `match_rule`
        // is called with an empty `policyNamespace`, same as an unnamespaced
        // policy would get.
        for profile_id in &endpoint.profile_ids {
            let profile_id = ProfileId(profile_id.clone());
            let Some(profile) = snapshot.profile_by_id.get(&profile_id) else {
                tracing::warn!(error = %EvalError::UnknownProfile(profile_id), "skipping profile");
                continue;
            };
            for rule in &profile.inbound_rules {
                if !matcher::match_rule(rule, &cache, "") {
                    continue;
                }
                match rule.action {
                    Action::Allow => return Decision::Allow(MatchedBy::Profile(profile_id)),
                    Action::Deny => {
                        return Decision::Deny {
                            matched: Some(MatchedBy::Profile(profile_id)),
                            reason: DenyReason::Rule,
                        }
                    }
                    Action::Log => {
                        tracing::info!(profile = ?profile_id, "rule matched with LOG action");
                    }
                    // A profile is the last thing evaluated; PASS has no
                    // further tier to hand off to, so it just stops this
                    // profile's rule list and moves to the next profile.
                    Action::Pass => break,
                }
            }
        }

        Decision::Deny {
            matched: None,
            reason: DenyReason::Default,
        }
    }

    fn evaluate_tier(
        snapshot: &crate::store::StoreState,
        cache: &RequestCache,
        tier: &crate::model::TierMembership,
    ) -> Option<Decision> {
        for policy_name in &tier.policy_names {
            let policy_id = PolicyId {
                tier: tier.tier.clone(),
                name: policy_name.clone(),
            };
            let Some(policy) = snapshot.policy_by_id.get(&policy_id) else {
                tracing::warn!(error = %EvalError::UnknownPolicy(policy_id), "skipping policy");
                continue;
            };

            let mut matched_action = None;
            for rule in &policy.inbound_rules {
                if !matcher::match_rule(rule, cache, &policy.namespace) {
                    continue;
                }
                match rule.action {
                    Action::Log => {
                        tracing::info!(policy = ?policy_id, "rule matched with LOG action");
                        continue;
                    }
                    action => {
                        matched_action = Some(action);
                        break;
                    }
                }
            }

            match matched_action.or(policy.default_action) {
                Some(Action::Allow) => return Some(Decision::Allow(MatchedBy::Policy(policy_id))),
                Some(Action::Deny) => {
                    return Some(Decision::Deny {
                        matched: Some(MatchedBy::Policy(policy_id)),
                        reason: DenyReason::Rule,
                    })
                }
                Some(Action::Pass) => return None,
                Some(Action::Log) | None => continue,
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Policy, Rule, ServiceAccountMatch, TierMembership, WorkloadEndpoint};
    use crate::store::Update;

    fn allow_all_rule() -> Rule {
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

    fn endpoint_with_tiers(tiers: Vec<TierMembership>) -> WorkloadEndpoint {
        WorkloadEndpoint {
            name: "ian".into(),
            namespace: "default".into(),
            service_account: "ian".into(),
            labels: Default::default(),
            tiers,
            profile_ids: vec![],
        }
    }

    #[test]
    fn not_in_sync_denies_regardless_of_contents() {
        let store = PolicyStore::new();
        let request = CheckRequest::default();
        let decision = PolicyEvaluator::evaluate(&store, &request);
        assert_eq!(
            decision,
            Decision::Deny {
                matched: None,
                reason: DenyReason::NotReady
            }
        );
    }

    #[test]
    fn no_endpoint_denies_by_default() {
        let store = PolicyStore::new();
        store.apply(Update::InSync);
        let decision = PolicyEvaluator::evaluate(&store, &CheckRequest::default());
        assert_eq!(
            decision,
            Decision::Deny {
                matched: None,
                reason: DenyReason::Default
            }
        );
    }

    #[test]
    fn first_tier_pass_falls_through_to_second_tier_match() {
        let store = PolicyStore::new();
        store.apply(Update::InSync);
        store.apply(Update::WorkloadEndpointUpdate(endpoint_with_tiers(vec![
            TierMembership {
                tier: "tier-1".into(),
                policy_names: vec!["pass-through".into()],
            },
            TierMembership {
                tier: "tier-2".into(),
                policy_names: vec!["allow-all".into()],
            },
        ])));
        store.apply(Update::ActivePolicyUpdate(
            PolicyId {
                tier: "tier-1".into(),
                name: "pass-through".into(),
            },
            Policy {
                namespace: "default".into(),
                inbound_rules: vec![Rule {
                    action: Action::Pass,
                    ..allow_all_rule()
                }],
                outbound_rules: vec![],
                default_action: None,
            },
        ));
        store.apply(Update::ActivePolicyUpdate(
            PolicyId {
                tier: "tier-2".into(),
                name: "allow-all".into(),
            },
            Policy {
                namespace: "default".into(),
                inbound_rules: vec![allow_all_rule()],
                outbound_rules: vec![],
                default_action: None,
            },
        ));

        let decision = PolicyEvaluator::evaluate(&store, &CheckRequest::default());
        assert_eq!(
            decision,
            Decision::Allow(MatchedBy::Policy(PolicyId {
                tier: "tier-2".into(),
                name: "allow-all".into(),
            }))
        );
    }

    #[test]
    fn deny_rule_short_circuits_remaining_tiers() {
        let store = PolicyStore::new();
        store.apply(Update::InSync);
        store.apply(Update::WorkloadEndpointUpdate(endpoint_with_tiers(vec![
            TierMembership {
                tier: "tier-1".into(),
                policy_names: vec!["deny-all".into()],
            },
        ])));
        store.apply(Update::ActivePolicyUpdate(
            PolicyId {
                tier: "tier-1".into(),
                name: "deny-all".into(),
            },
            Policy {
                namespace: "default".into(),
                inbound_rules: vec![Rule {
                    action: Action::Deny,
                    ..allow_all_rule()
                }],
                outbound_rules: vec![],
                default_action: None,
            },
        ));

        let decision = PolicyEvaluator::evaluate(&store, &CheckRequest::default());
        assert_eq!(
            decision,
            Decision::Deny {
                matched: Some(MatchedBy::Policy(PolicyId {
                    tier: "tier-1".into(),
                    name: "deny-all".into(),
                })),
                reason: DenyReason::Rule,
            }
        );
    }
}
