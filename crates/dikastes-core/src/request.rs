//! Decoded request shape handed to `RequestCache`. Deliberately independent
//! of the wire format: `dikastes-protocol` is responsible for turning a
//! `CheckRequest` protobuf message into one of these.

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct RawPeer {
    /// SPIFFE principal, e.g. `spiffe://cluster.local/ns/default/sa/sam`.
    /// Empty or malformed is legal input — it simply fails to parse later.
    pub principal: String,
    pub address: Option<RawSocketAddress>,
    /// Labels the proxy attached directly to the peer, if any. Carried for
    /// wire completeness; per spec section 4.2 `Peer` labels are derived
    /// from the policy store (service account + local endpoint), not from
    /// this field, so it is not consulted by `RequestCache`.
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct RawSocketAddress {
    /// Protocol name ("TCP", "UDP") or a numeric protocol string ("6",
    /// "17", ...), exactly as the proxy sent it.
    pub protocol: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RawHttpRequest {
    pub method: String,
}

#[derive(Debug, Clone, Default)]
pub struct CheckRequest {
    pub source: RawPeer,
    pub destination: RawPeer,
    pub http: Option<RawHttpRequest>,
}
