use std::{net::SocketAddr, process::ExitCode, sync::Arc};

use linkcrm_api::{
    db::{self, SeaOrmConnections},
    framework::{AppError, AppState, Env},
    router::mk_router,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), AppError> {
    let env = Env::from_env()?;

    let db_client = db::connect(&env.db_url).await?;
    let shared_state = AppState::new(&env, Arc::new(SeaOrmConnections::new(db_client)))?;
    let router = mk_router(shared_state, env.request_timeout);

    let listener = tokio::net::TcpListener::bind(env.bind_addr).await?;
    tracing::info!(addr = %env.bind_addr, origins = ?env.allowed_origins, "listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
