//! `PolicyStore`: the process-wide, concurrently-read, singly-written view
//! of everything the evaluator needs.
//!
//! Readers take an `Arc<StoreState>` snapshot with `PolicyStore::snapshot`
//! — a single atomic load, no lock held across the call (I1). The
//! `StoreDispatcher` is the only writer; it clones the parts of the state it
//! needs to change (I2: label maps are never mutated in place) and swaps in
//! a new `Arc<StoreState>` with `ArcSwap::store`.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::model::{
    NamespaceId, Policy, PolicyId, Profile, ProfileId, ServiceAccountId, WorkloadEndpoint,
};

/// Everything the evaluator reads for one authorization call, bundled so it
/// can be swapped in as a single atomic unit.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub endpoint: Option<WorkloadEndpoint>,
    pub policy_by_id: HashMap<PolicyId, Policy>,
    pub profile_by_id: HashMap<ProfileId, Profile>,
    pub service_account_by_id: HashMap<ServiceAccountId, ServiceAccountInfo>,
    pub namespace_by_id: HashMap<NamespaceId, NamespaceInfo>,
    pub in_sync: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceAccountInfo {
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceInfo {
    pub labels: HashMap<String, String>,
}

/// Mutations applied by the `StoreDispatcher`, one per control-plane
/// message kind (spec.md section 6.2). Modeled as a tagged variant so the
/// dispatcher can `match` instead of maintaining a per-type visitor.
#[derive(Debug, Clone)]
pub enum Update {
    InSync,
    WorkloadEndpointUpdate(WorkloadEndpoint),
    WorkloadEndpointRemove,
    ActivePolicyUpdate(PolicyId, Policy),
    ActivePolicyRemove(PolicyId),
    ActiveProfileUpdate(ProfileId, Profile),
    ActiveProfileRemove(ProfileId),
    ServiceAccountUpdate(ServiceAccountId, ServiceAccountInfo),
    ServiceAccountRemove(ServiceAccountId),
    NamespaceUpdate(NamespaceId, NamespaceInfo),
    NamespaceRemove(NamespaceId),
}

pub struct PolicyStore {
    state: ArcSwap<StoreState>,
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyStore {
    pub fn new() -> Self {
        Self {
            state: ArcSwap::from_pointee(StoreState::default()),
        }
    }

    /// Returns an immutable snapshot for one authorization call. O(1),
    /// lock-free; the returned `Arc` keeps the snapshot alive for as long
    /// as the caller holds it, independent of later writes.
    pub fn snapshot(&self) -> Arc<StoreState> {
        self.state.load_full()
    }

    pub fn is_in_sync(&self) -> bool {
        self.state.load().in_sync
    }

    /// Applies a single update. Single-writer; the dispatcher is expected
    /// to serialize calls (it consumes one ordered stream). A dependent
    /// object referenced by an update that hasn't arrived yet (or never
    /// will) is not an error — the update is stored as-is, and the matcher
    /// tolerates the resulting lookup miss by treating it as empty
    /// metadata.
    pub fn apply(&self, update: Update) {
        let current = self.state.load_full();
        let mut next = (*current).clone();

        match update {
            Update::InSync => next.in_sync = true,
            Update::WorkloadEndpointUpdate(endpoint) => next.endpoint = Some(endpoint),
            Update::WorkloadEndpointRemove => next.endpoint = None,
            Update::ActivePolicyUpdate(id, policy) => {
                next.policy_by_id.insert(id, policy);
            }
            Update::ActivePolicyRemove(id) => {
                next.policy_by_id.remove(&id);
            }
            Update::ActiveProfileUpdate(id, profile) => {
                next.profile_by_id.insert(id, profile);
            }
            Update::ActiveProfileRemove(id) => {
                next.profile_by_id.remove(&id);
            }
            Update::ServiceAccountUpdate(id, info) => {
                next.service_account_by_id.insert(id, info);
            }
            Update::ServiceAccountRemove(id) => {
                next.service_account_by_id.remove(&id);
            }
            Update::NamespaceUpdate(id, info) => {
                next.namespace_by_id.insert(id, info);
            }
            Update::NamespaceRemove(id) => {
                next.namespace_by_id.remove(&id);
            }
        }

        self.state.store(Arc::new(next));
    }

    /// Drops the current store wholesale and resets `in_sync` to false.
    /// Called by the dispatcher on stream disconnect (spec.md section 4.5).
    pub fn reset(&self) {
        self.state.store(Arc::new(StoreState::default()));
    }
}
