//! Protobuf <-> core type conversions. Every fallible path here is a
//! malformed or incomplete message from the proxy or controller, not a
//! programmer error, so these return `Result` rather than panicking.

use dikastes_core::model::{
    Action, HttpMatch, NamespaceId, Policy, PolicyId, Profile, ProfileId, Protocol, Rule,
    ServiceAccountId, ServiceAccountMatch, TierMembership, WorkloadEndpoint,
};
use dikastes_core::request::{CheckRequest, RawHttpRequest, RawPeer, RawSocketAddress};
use dikastes_core::store::{NamespaceInfo, ServiceAccountInfo, Update};

use crate::authz;
use crate::error::ConversionError;
use crate::sync;

pub fn check_request_from_wire(req: authz::CheckRequest) -> Result<CheckRequest, ConversionError> {
    let attributes = req
        .attributes
        .ok_or(ConversionError::MissingField("attributes"))?;
    let destination = attributes
        .destination
        .ok_or(ConversionError::MissingField("attributes.destination"))?;

    Ok(CheckRequest {
        source: convert_peer(attributes.source),
        destination: convert_peer(Some(destination)),
        http: attributes
            .http_request
            .map(|http| RawHttpRequest { method: http.method }),
    })
}

fn convert_peer(peer: Option<authz::Peer>) -> RawPeer {
    let Some(peer) = peer else {
        return RawPeer::default();
    };
    RawPeer {
        principal: peer.principal,
        address: peer.address.map(|addr| RawSocketAddress {
            protocol: (!addr.protocol.is_empty()).then_some(addr.protocol),
        }),
        labels: peer.labels,
    }
}

/// Translates one `ToDataplane` message into an `Update`. `Ok(None)` means
/// the message was recognised but intentionally dropped (`IpSetUpdate` is
/// opaque to this core).
pub fn update_from_wire(msg: sync::ToDataplane) -> Result<Option<Update>, ConversionError> {
    use sync::to_dataplane::Payload;

    let payload = msg.payload.ok_or(ConversionError::MissingField("payload"))?;

    let update = match payload {
        Payload::InSync(_) => Update::InSync,
        Payload::IpsetUpdate(_) => {
            tracing::trace!("ignoring ipset update");
            return Ok(None);
        }
        Payload::ActiveProfileUpdate(u) => {
            let id = u.id.ok_or(ConversionError::MissingField("id"))?;
            let profile = u.profile.ok_or(ConversionError::MissingField("profile"))?;
            Update::ActiveProfileUpdate(ProfileId(id.name), convert_profile(profile)?)
        }
        Payload::ActiveProfileRemove(u) => {
            let id = u.id.ok_or(ConversionError::MissingField("id"))?;
            Update::ActiveProfileRemove(ProfileId(id.name))
        }
        Payload::ActivePolicyUpdate(u) => {
            let id = u.id.ok_or(ConversionError::MissingField("id"))?;
            let policy = u.policy.ok_or(ConversionError::MissingField("policy"))?;
            Update::ActivePolicyUpdate(
                PolicyId {
                    tier: id.tier,
                    name: id.name,
                },
                convert_policy(policy)?,
            )
        }
        Payload::ActivePolicyRemove(u) => {
            let id = u.id.ok_or(ConversionError::MissingField("id"))?;
            Update::ActivePolicyRemove(PolicyId {
                tier: id.tier,
                name: id.name,
            })
        }
        Payload::WorkloadEndpointUpdate(u) => {
            let endpoint = u
                .endpoint
                .ok_or(ConversionError::MissingField("endpoint"))?;
            Update::WorkloadEndpointUpdate(convert_workload_endpoint(endpoint))
        }
        Payload::WorkloadEndpointRemove(_) => Update::WorkloadEndpointRemove,
        Payload::ServiceAccountUpdate(u) => {
            let id = u.id.ok_or(ConversionError::MissingField("id"))?;
            Update::ServiceAccountUpdate(
                ServiceAccountId {
                    namespace: id.namespace,
                    name: id.name,
                },
                ServiceAccountInfo { labels: u.labels },
            )
        }
        Payload::ServiceAccountRemove(u) => {
            let id = u.id.ok_or(ConversionError::MissingField("id"))?;
            Update::ServiceAccountRemove(ServiceAccountId {
                namespace: id.namespace,
                name: id.name,
            })
        }
        Payload::NamespaceUpdate(u) => {
            let id = u.id.ok_or(ConversionError::MissingField("id"))?;
            Update::NamespaceUpdate(NamespaceId { name: id.name }, NamespaceInfo { labels: u.labels })
        }
        Payload::NamespaceRemove(u) => {
            let id = u.id.ok_or(ConversionError::MissingField("id"))?;
            Update::NamespaceRemove(NamespaceId { name: id.name })
        }
    };

    Ok(Some(update))
}

fn convert_action(action: &str) -> Result<Action, ConversionError> {
    match action.to_ascii_uppercase().as_str() {
        "ALLOW" => Ok(Action::Allow),
        "DENY" => Ok(Action::Deny),
        "LOG" => Ok(Action::Log),
        "PASS" => Ok(Action::Pass),
        other => Err(ConversionError::InvalidAction(other.to_string())),
    }
}

fn convert_default_action(action: &str) -> Result<Option<Action>, ConversionError> {
    if action.is_empty() {
        Ok(None)
    } else {
        convert_action(action).map(Some)
    }
}

fn convert_protocol(protocol: Option<sync::Protocol>) -> Option<Protocol> {
    protocol.and_then(|p| match p.kind? {
        sync::protocol::Kind::Name(name) => Some(Protocol::Name(name)),
        sync::protocol::Kind::Number(number) => Some(Protocol::Number(number)),
    })
}

fn convert_service_account_match(m: Option<sync::ServiceAccountMatch>) -> ServiceAccountMatch {
    m.map(|m| ServiceAccountMatch {
        names: m.names,
        selector: m.selector,
    })
    .unwrap_or_default()
}

fn convert_http_match(m: Option<sync::HttpMatch>) -> Option<HttpMatch> {
    m.map(|m| HttpMatch { methods: m.methods })
}

fn convert_rule(rule: sync::Rule) -> Result<Rule, ConversionError> {
    Ok(Rule {
        action: convert_action(&rule.action)?,
        src_service_account: convert_service_account_match(rule.src_service_account),
        dst_service_account: convert_service_account_match(rule.dst_service_account),
        src_namespace_selector: rule.src_namespace_selector,
        dst_namespace_selector: rule.dst_namespace_selector,
        original_src_selector: rule.original_src_selector,
        original_dst_selector: rule.original_dst_selector,
        not_original_src_selector: rule.not_original_src_selector,
        not_original_dst_selector: rule.not_original_dst_selector,
        http_match: convert_http_match(rule.http_match),
        protocol: convert_protocol(rule.protocol),
        not_protocol: convert_protocol(rule.not_protocol),
    })
}

fn convert_rules(rules: Vec<sync::Rule>) -> Result<Vec<Rule>, ConversionError> {
    rules.into_iter().map(convert_rule).collect()
}

fn convert_policy(policy: sync::Policy) -> Result<Policy, ConversionError> {
    Ok(Policy {
        namespace: policy.namespace,
        inbound_rules: convert_rules(policy.inbound_rules)?,
        outbound_rules: convert_rules(policy.outbound_rules)?,
        default_action: convert_default_action(&policy.default_action)?,
    })
}

fn convert_profile(profile: sync::Profile) -> Result<Profile, ConversionError> {
    Ok(Profile {
        inbound_rules: convert_rules(profile.inbound_rules)?,
        outbound_rules: convert_rules(profile.outbound_rules)?,
    })
}

fn convert_tier_membership(tier: sync::TierMembership) -> TierMembership {
    TierMembership {
        tier: tier.tier,
        policy_names: tier.policy_names,
    }
}

fn convert_workload_endpoint(endpoint: sync::WorkloadEndpoint) -> WorkloadEndpoint {
    WorkloadEndpoint {
        name: endpoint.name,
        namespace: endpoint.namespace,
        service_account: endpoint.service_account,
        labels: endpoint.labels,
        tiers: endpoint
            .tiers
            .into_iter()
            .map(convert_tier_membership)
            .collect(),
        profile_ids: endpoint.profile_ids,
    }
}
