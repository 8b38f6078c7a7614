use std::sync::Arc;
use std::time::Duration;

use dikastes_core::{Decision, PolicyEvaluator, PolicyStore};
use dikastes_protocol::authz;
use tonic::{Request, Response, Status};

/// Implements the external-authorization `Check` RPC. Translation from wire
/// types and the actual matching both happen synchronously; the only thing
/// this handler adds is the per-call deadline.
pub struct AuthzService {
    store: Arc<PolicyStore>,
    check_timeout: Duration,
}

impl AuthzService {
    pub fn new(store: Arc<PolicyStore>, check_timeout: Duration) -> Self {
        Self {
            store,
            check_timeout,
        }
    }
}

#[tonic::async_trait]
impl authz::authorization_server::Authorization for AuthzService {
    async fn check(
        &self,
        request: Request<authz::CheckRequest>,
    ) -> Result<Response<authz::CheckResponse>, Status> {
        let check_request = dikastes_protocol::check_request_from_wire(request.into_inner())
            .map_err(|err| Status::invalid_argument(err.to_string()))?;

        let store = self.store.clone();
        let decision = tokio::time::timeout(self.check_timeout, async move {
            PolicyEvaluator::evaluate(&store, &check_request)
        })
        .await
        .map_err(|_| Status::deadline_exceeded("authorization check exceeded its deadline"))?;

        tracing::debug!(allowed = decision.is_allow(), "evaluated authorization check");
        Ok(Response::new(decision_to_wire(decision)))
    }
}

fn decision_to_wire(decision: Decision) -> authz::CheckResponse {
    let status = match decision {
        Decision::Allow(_) => authz::check_response::Status::Ok(authz::OkStatus {}),
        Decision::Deny { reason, .. } => authz::check_response::Status::Denied(authz::DeniedStatus {
            http_status: 403,
            reason: format!("{reason:?}"),
        }),
    };
    authz::CheckResponse {
        status: Some(status),
    }
}
