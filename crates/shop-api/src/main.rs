//! # peptide-shop
//!
//! Storefront cart and pricing server.
//!
//! ## Usage
//!
//! ```bash
//! # Optional configuration
//! export CATALOG_PATH=config/products.toml
//! export DATA_DIR=/var/lib/peptide-shop
//! export MAX_SESSIONS=10000
//! export SESSION_IDLE_SECS=86400
//!
//! # Run the server
//! peptide-shop
//! ```

use shop_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Initialize application state
    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Products loaded: {}", state.catalog.products.len());
    info!("Categories: {:?}", state.catalog.categories());

    // Create router
    let app = routes::create_router(state);

    info!("peptide-shop starting on http://{}", addr);

    if !is_prod {
        info!("Catalog: GET http://{}/api/v1/products", addr);
        info!("Cart: POST http://{}/api/v1/sessions", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
