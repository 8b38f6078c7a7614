use std::net::SocketAddr;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[clap(name = "dikastes-agent", about = "Per-request authorization sidecar")]
pub struct Args {
    /// Address the external-authorization gRPC service binds to.
    #[clap(long, default_value = "127.0.0.1:9090", env = "DIKASTES_GRPC_ADDR")]
    pub grpc_addr: SocketAddr,

    /// Address of the controller's policy-sync endpoint to dial.
    #[clap(long, env = "DIKASTES_SYNC_ADDR")]
    pub sync_addr: String,

    /// Name this node identifies itself as in `SyncRequest`.
    #[clap(long, env = "DIKASTES_NODE_NAME")]
    pub node_name: String,

    #[clap(long, default_value = "info", env = "DIKASTES_LOG")]
    pub log_level: String,

    #[clap(long, default_value = "plain", env = "DIKASTES_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Deadline applied to every `Check` call before it is abandoned.
    #[clap(long, default_value = "1000", env = "DIKASTES_CHECK_TIMEOUT_MS")]
    pub check_timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Plain,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" => Ok(LogFormat::Plain),
            "json" => Ok(LogFormat::Json),
            other => Err(anyhow::anyhow!("invalid log format {other:?}, expected plain or json")),
        }
    }
}

impl Args {
    pub fn init_tracing(&self) {
        let filter = tracing_subscriber::EnvFilter::try_new(&self.log_level)
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

        let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
        match self.log_format {
            LogFormat::Plain => subscriber.init(),
            LogFormat::Json => subscriber.json().init(),
        }
    }
}
