use std::sync::Arc;
use std::time::Duration;

use dikastes_core::{PolicyStore, StoreDispatcher};
use dikastes_protocol::sync;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Dials the controller's policy-sync endpoint and feeds updates into
/// `store` until `cancellation_token` fires. Reconnects with exponential
/// backoff on any failure, resetting the store (per spec section 4.5) on
/// every disconnect so the next connection rebuilds from scratch.
pub async fn run(
    store: Arc<PolicyStore>,
    sync_addr: String,
    node_name: String,
    cancellation_token: CancellationToken,
) {
    let mut backoff = INITIAL_BACKOFF;

    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                tracing::info!("sync client shutting down");
                return;
            }
            result = connect_and_run(&store, &sync_addr, &node_name) => {
                match result {
                    Ok(()) => {
                        tracing::info!("policy sync stream ended");
                        backoff = INITIAL_BACKOFF;
                    }
                    Err(error) => {
                        tracing::warn!(%error, "policy sync stream failed, reconnecting");
                    }
                }
            }
        }

        tokio::select! {
            _ = cancellation_token.cancelled() => return,
            _ = tokio::time::sleep(backoff) => {}
        }
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

async fn connect_and_run(
    store: &PolicyStore,
    sync_addr: &str,
    node_name: &str,
) -> anyhow::Result<()> {
    let mut client =
        sync::policy_sync_client::PolicySyncClient::connect(sync_addr.to_string()).await?;

    let response = client
        .sync(sync::SyncRequest {
            node_name: node_name.to_string(),
        })
        .await?;

    let updates = response.into_inner().filter_map(|item| async move {
        match item {
            Ok(msg) => match dikastes_protocol::update_from_wire(msg) {
                Ok(Some(update)) => Some(Ok(update)),
                Ok(None) => None,
                Err(err) => Some(Err(anyhow::anyhow!(err))),
            },
            Err(status) => Some(Err(anyhow::anyhow!(status))),
        }
    });

    StoreDispatcher::run(store, updates).await;
    Ok(())
}
