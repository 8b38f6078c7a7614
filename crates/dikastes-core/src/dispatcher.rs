//! `StoreDispatcher`: drives one attempt at consuming the control-plane
//! update stream into a `PolicyStore` (spec section 4.5). Transport-agnostic
//! by design — `dikastes-agent` is the one that knows how to dial the sync
//! RPC and turn `ToDataplane` protobuf messages into `Update` values; this
//! module only knows how to drain whatever stream it's handed in order and
//! reset the store when that stream ends.

use futures::{Stream, StreamExt};

use crate::store::{PolicyStore, Update};

pub struct StoreDispatcher;

impl StoreDispatcher {
    /// Applies every update from `updates` to `store`, in order. Returns
    /// when the stream ends, whether cleanly or with an error; either way
    /// the store is reset to empty/out-of-sync before returning, since the
    /// caller is expected to reconnect and rebuild from scratch (spec
    /// section 6: "persistence: none").
    pub async fn run<S, E>(store: &PolicyStore, updates: S)
    where
        S: Stream<Item = Result<Update, E>>,
        E: std::fmt::Display,
    {
        futures::pin_mut!(updates);
        while let Some(item) = updates.next().await {
            match item {
                Ok(update) => store.apply(update),
                Err(err) => {
                    tracing::warn!(error = %err, "policy sync stream error");
                    break;
                }
            }
        }
        tracing::info!("policy sync stream ended; resetting store");
        store.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn applies_updates_in_order_then_resets() {
        let store = PolicyStore::new();
        let updates: Vec<Result<Update, std::convert::Infallible>> =
            vec![Ok(Update::InSync)];

        StoreDispatcher::run(&store, stream::iter(updates)).await;

        // The stream ended (even though it delivered InSync first), so the
        // dispatcher resets the store per spec 4.5 — a real agent only sees
        // this path on disconnect, not on a healthy, still-open stream.
        assert!(!store.is_in_sync());
    }

    #[tokio::test]
    async fn stream_error_stops_consumption_and_resets() {
        let store = PolicyStore::new();
        let updates: Vec<Result<Update, &str>> =
            vec![Ok(Update::InSync), Err("disconnected")];

        StoreDispatcher::run(&store, stream::iter(updates)).await;

        assert!(!store.is_in_sync());
    }
}
