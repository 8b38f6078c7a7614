//! Error taxonomy per spec.md section 7.
//!
//! Input-malformed and missing-dependency conditions are logged, not
//! propagated: the evaluator's public entry point is infallible. These
//! types exist so the places that *detect* those conditions have something
//! precise to log, not so callers have to unwrap a `Result`.

use thiserror::Error;

use crate::model::{PolicyId, ProfileId};

/// A clause-level failure while evaluating a single predicate. Every
/// variant here is swallowed (logged at `warn`, treated as "no match") by
/// the caller — see `matcher::match_labels`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatchError {
    #[error("failed to parse selector {selector:?}: {source}")]
    SelectorParse {
        selector: String,
        source: crate::selector::SelectorError,
    },
}

/// A missing-dependency condition hit while walking a `PolicyStore`
/// snapshot. Every variant here is swallowed (logged at `warn`, treated as
/// "this policy/profile contributes nothing") by `PolicyEvaluator::evaluate`
/// — a tier or profile list may reference an id whose update hasn't arrived
/// yet, or never will, and that's not fatal to the call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("tier references unknown policy {0:?}")]
    UnknownPolicy(PolicyId),
    #[error("endpoint references unknown profile {0:?}")]
    UnknownProfile(ProfileId),
}
