//! metered gateway
//!
//! - Loads `metered.yaml` (or the path given as the first argument)
//! - Resolves access scopes once, fails the boot on bad config
//! - Gates every request through the decision service, `/healthz` and
//!   `/metrics` excepted

use std::net::SocketAddr;

use tracing_subscriber::{fmt, EnvFilter};

use metered_core::error::{MeterError, Result};
use metered_gateway::{app_state, config, router};

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg
        .gateway
        .listen
        .parse()
        .map_err(|e| MeterError::Config(format!("gateway.listen: {e}")))?;

    let state = app_state::AppState::new(cfg)?;
    let app = router::build_router(state);

    tracing::info!(%listen, config = %path, "metered-gateway starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| MeterError::Internal(format!("bind {listen} failed: {e}")))?;

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .map_err(|e| MeterError::Internal(format!("server failed: {e}")))
}
