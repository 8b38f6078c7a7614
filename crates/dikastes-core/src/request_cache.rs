//! `RequestCache`: per-call decoded view over a `CheckRequest`, memoizing
//! lookups against a `PolicyStore` snapshot for the duration of one
//! authorization call (I3: its selector cache never outlives the call).

use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use crate::model::{Namespace, NamespaceId, Peer, ServiceAccountId};
use crate::request::CheckRequest;
use crate::selector::{self, Selector, SelectorError};
use crate::store::StoreState;

pub struct RequestCache<'a> {
    snapshot: Arc<StoreState>,
    request: &'a CheckRequest,

    source_peer: OnceCell<Peer>,
    destination_peer: OnceCell<Peer>,
    source_namespace: OnceCell<Namespace>,
    destination_namespace: OnceCell<Namespace>,
    destination_protocol: OnceCell<String>,

    /// Compiled selectors keyed by their string form. Lives exactly as long
    /// as this cache (§9 DESIGN NOTES: never promoted to a global cache,
    /// since policies change and the strings involved are short).
    selector_cache: RefCell<HashMap<String, Rc<Selector>>>,
}

impl<'a> RequestCache<'a> {
    pub fn new(snapshot: Arc<StoreState>, request: &'a CheckRequest) -> Self {
        Self {
            snapshot,
            request,
            source_peer: OnceCell::new(),
            destination_peer: OnceCell::new(),
            source_namespace: OnceCell::new(),
            destination_namespace: OnceCell::new(),
            destination_protocol: OnceCell::new(),
            selector_cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn snapshot(&self) -> &StoreState {
        &self.snapshot
    }

    pub fn source_peer(&self) -> &Peer {
        self.source_peer
            .get_or_init(|| self.resolve_peer(&self.request.source.principal))
    }

    pub fn destination_peer(&self) -> &Peer {
        self.destination_peer
            .get_or_init(|| self.resolve_peer(&self.request.destination.principal))
    }

    pub fn source_namespace(&self) -> &Namespace {
        self.source_namespace
            .get_or_init(|| self.resolve_namespace(&self.request.source.principal))
    }

    pub fn destination_namespace(&self) -> &Namespace {
        self.destination_namespace
            .get_or_init(|| self.resolve_namespace(&self.request.destination.principal))
    }

    /// The L4 protocol of the destination socket address; defaults to
    /// `"TCP"` when the address or socket-address fields are absent.
    pub fn destination_protocol(&self) -> &str {
        self.destination_protocol.get_or_init(|| {
            self.request
                .destination
                .address
                .as_ref()
                .and_then(|addr| addr.protocol.clone())
                .unwrap_or_else(|| "TCP".to_string())
        })
    }

    pub fn http_method(&self) -> Option<&str> {
        self.request.http.as_ref().map(|h| h.method.as_str())
    }

    /// Compiles (or returns the cached compilation of) a selector
    /// expression. A parse failure is returned to the caller, which logs it
    /// at `warn` and treats the predicate as "no match" (spec.md section
    /// 7) — this function does not swallow the error itself, since some
    /// callers (tests) want to see it.
    pub fn compiled_selector(&self, expr: &str) -> Result<Rc<Selector>, SelectorError> {
        if let Some(cached) = self.selector_cache.borrow().get(expr) {
            return Ok(cached.clone());
        }
        let compiled = Rc::new(selector::parse(expr)?);
        self.selector_cache
            .borrow_mut()
            .insert(expr.to_string(), compiled.clone());
        Ok(compiled)
    }

    fn resolve_peer(&self, principal: &str) -> Peer {
        let Some((namespace, name)) = crate::spiffe::parse(principal) else {
            return Peer::default();
        };

        let sa_labels = self
            .snapshot
            .service_account_by_id
            .get(&ServiceAccountId {
                namespace: namespace.clone(),
                name: name.clone(),
            })
            .map(|info| info.labels.clone())
            .unwrap_or_default();

        let mut labels = sa_labels;
        if let Some(endpoint) = &self.snapshot.endpoint {
            if endpoint.namespace == namespace && endpoint.service_account == name {
                for (k, v) in &endpoint.labels {
                    labels.insert(k.clone(), v.clone());
                }
            }
        }

        Peer {
            name,
            namespace,
            labels,
        }
    }

    fn resolve_namespace(&self, principal: &str) -> Namespace {
        let Some((namespace, _name)) = crate::spiffe::parse(principal) else {
            return Namespace::default();
        };

        let labels = self
            .snapshot
            .namespace_by_id
            .get(&NamespaceId {
                name: namespace.clone(),
            })
            .map(|info| info.labels.clone())
            .unwrap_or_default();

        Namespace {
            name: namespace,
            labels,
        }
    }
}
