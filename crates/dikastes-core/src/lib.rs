//! Request evaluator for a Kubernetes-workload policy sidecar: the piece
//! that, given a decoded check request and a policy snapshot, answers
//! ALLOW or DENY. Everything in this crate is transport-agnostic; wiring it
//! to gRPC lives in `dikastes-protocol` and `dikastes-agent`.

pub mod dispatcher;
pub mod error;
pub mod evaluator;
pub mod matcher;
pub mod model;
pub mod request;
pub mod request_cache;
pub mod selector;
pub mod spiffe;
pub mod store;

pub use dispatcher::StoreDispatcher;
pub use evaluator::{Decision, DenyReason, MatchedBy, PolicyEvaluator};
pub use request::CheckRequest;
pub use request_cache::RequestCache;
pub use store::{PolicyStore, Update};
