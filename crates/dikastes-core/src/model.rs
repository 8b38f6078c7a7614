//! Plain data types for the policy graph: the things `PolicyStore` holds and
//! the `Matcher` reads. None of this knows about the wire format that fills
//! it in — that conversion lives in `dikastes-protocol`.

use std::collections::HashMap;

pub type Labels = HashMap<String, String>;

/// Identifies a policy within its tier. Two policies in different tiers may
/// share a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PolicyId {
    pub tier: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ProfileId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ServiceAccountId {
    pub namespace: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct NamespaceId {
    pub name: String,
}

/// A source or destination identity, with its merged labels.
///
/// Per spec: labels are the merged labels of the workload endpoint plus its
/// service account, with endpoint labels taking precedence on collision.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Peer {
    pub name: String,
    pub namespace: String,
    pub labels: Labels,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Namespace {
    pub name: String,
    pub labels: Labels,
}

/// `names` empty matches any name; `selector` empty matches any labels. Both
/// subfields are conjunctive.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ServiceAccountMatch {
    pub names: Vec<String>,
    pub selector: String,
}

/// A namespace restriction computed by `compute_namespace_match`: either a
/// name list, a selector, or neither (unrestricted). The selector, when
/// present, always wins over `names` — the two are never both populated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceMatch {
    pub names: Vec<String>,
    pub selector: String,
}

/// L4 protocol, either named ("TCP"/"UDP", case-insensitive) or numeric
/// (IANA protocol number; only 6 and 17 are recognised).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Protocol {
    Name(String),
    Number(i32),
}

impl Protocol {
    /// Resolves to a canonical protocol name, or `None` for an unrecognised
    /// numeric code.
    pub fn canonical_name(&self) -> Option<String> {
        match self {
            Protocol::Name(name) => Some(name.to_ascii_uppercase()),
            Protocol::Number(6) => Some("TCP".to_string()),
            Protocol::Number(17) => Some("UDP".to_string()),
            Protocol::Number(_) => None,
        }
    }
}

/// Methods are ASCII case-sensitive; `"*"` or an empty list matches any
/// method. A rule with no `HttpMatch` at all matches any request (that case
/// is represented by `Option<HttpMatch>` on `Rule`, not by this type).
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HttpMatch {
    pub methods: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Action {
    Allow,
    Deny,
    Log,
    Pass,
}

/// The central entity: a single rule within a policy or profile's inbound or
/// outbound rule list.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Rule {
    pub action: Action,

    pub src_service_account: ServiceAccountMatch,
    pub dst_service_account: ServiceAccountMatch,

    pub src_namespace_selector: String,
    pub dst_namespace_selector: String,

    pub original_src_selector: String,
    pub original_dst_selector: String,
    pub not_original_src_selector: String,
    pub not_original_dst_selector: String,

    pub http_match: Option<HttpMatch>,

    /// Mutually exclusive with `not_protocol` at ingest; if both are
    /// somehow set, `protocol` takes precedence (see DESIGN.md open
    /// question).
    pub protocol: Option<Protocol>,
    pub not_protocol: Option<Protocol>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Policy {
    pub namespace: String,
    pub inbound_rules: Vec<Rule>,
    pub outbound_rules: Vec<Rule>,
    /// Action applied when no rule in this policy matches. `None` means
    /// "fall through" (no implicit drop for this policy).
    pub default_action: Option<Action>,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Profile {
    pub inbound_rules: Vec<Rule>,
    pub outbound_rules: Vec<Rule>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TierMembership {
    pub tier: String,
    pub policy_names: Vec<String>,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct WorkloadEndpoint {
    pub name: String,
    pub namespace: String,
    pub service_account: String,
    pub labels: Labels,
    /// Ordered list of tiers, each carrying the ordered policy names active
    /// for this endpoint within that tier.
    pub tiers: Vec<TierMembership>,
    pub profile_ids: Vec<String>,
}
