//! Parses SPIFFE principals of the form
//! `spiffe://<trust-domain>/ns/<namespace>/sa/<service-account>`.
//!
//! Kept total rather than exception-based (per the §9 DESIGN NOTES note):
//! malformed or non-SPIFFE input yields `None`, never an error.

/// Parses a SPIFFE URI into `(namespace, service_account)`. Returns `None`
/// for anything that doesn't match the expected shape — callers treat that
/// as an identity with empty name/namespace, never a hard failure.
pub fn parse(principal: &str) -> Option<(String, String)> {
    let rest = principal.strip_prefix("spiffe://")?;
    let (_trust_domain, path) = rest.split_once('/')?;

    let mut segments = path.split('/');
    if segments.next()? != "ns" {
        return None;
    }
    let namespace = segments.next()?;
    if namespace.is_empty() {
        return None;
    }
    if segments.next()? != "sa" {
        return None;
    }
    let service_account = segments.next()?;
    if service_account.is_empty() {
        return None;
    }
    if segments.next().is_some() {
        return None;
    }

    Some((namespace.to_string(), service_account.to_string()))
}
