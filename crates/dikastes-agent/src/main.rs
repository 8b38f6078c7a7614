mod args;
mod grpc;
mod sync_client;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use dikastes_core::PolicyStore;
use dikastes_protocol::authz::authorization_server::AuthorizationServer;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;

use args::Args;
use grpc::AuthzService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    args.init_tracing();

    let store = Arc::new(PolicyStore::new());
    let cancellation_token = CancellationToken::new();

    let sync_task = tokio::spawn(sync_client::run(
        store.clone(),
        args.sync_addr.clone(),
        args.node_name.clone(),
        cancellation_token.clone(),
    ));

    let grpc_task = tokio::spawn(serve_grpc(
        store,
        args.grpc_addr,
        Duration::from_millis(args.check_timeout_ms),
        cancellation_token.clone(),
    ));

    wait_for_shutdown_signal().await;
    tracing::info!("shutdown signal received");
    cancellation_token.cancel();

    let _ = sync_task.await;
    grpc_task.await.context("authorization gRPC server task panicked")??;

    Ok(())
}

async fn serve_grpc(
    store: Arc<PolicyStore>,
    addr: std::net::SocketAddr,
    check_timeout: Duration,
    cancellation_token: CancellationToken,
) -> anyhow::Result<()> {
    let service = AuthzService::new(store, check_timeout);

    tracing::info!(%addr, "authorization gRPC server listening");
    Server::builder()
        .add_service(AuthorizationServer::new(service))
        .serve_with_shutdown(addr, cancellation_token.cancelled())
        .await
        .context("authorization gRPC server failed")?;

    Ok(())
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
