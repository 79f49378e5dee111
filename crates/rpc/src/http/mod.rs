//! HTTP API

pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;

pub use error::ApiError;
pub use routes::create_router;

use std::sync::Arc;
use tracing::info;

use crate::context::AppContext;

/// Bind `address` and serve until the process is stopped
pub async fn serve(ctx: Arc<AppContext>, address: &str) -> anyhow::Result<()> {
    let app = create_router(ctx);

    let listener = tokio::net::TcpListener::bind(address).await?;
    info!("🚀 Server listening on http://{}", address);

    axum::serve(listener, app).await?;
    Ok(())
}
