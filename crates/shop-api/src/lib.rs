//! # shop-api
//!
//! HTTP API layer for peptide-shop.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - REST endpoints for the catalog, pricing mode and cart
//! - Per-session storage (in memory, or on disk under `DATA_DIR`)
//! - A bounded session registry: sessions start only via `POST /api/v1/sessions`,
//!   and idle or least-recently-used ones are evicted
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/api/v1/products` | List products (`?category=`) |
//! | GET | `/api/v1/products/{id}` | Get product |
//! | POST | `/api/v1/sessions` | Start a session |
//! | GET/PUT | `/api/v1/sessions/{sid}/pricing-mode` | Read / toggle currency |
//! | GET/DELETE | `/api/v1/sessions/{sid}/cart` | Read / clear cart |
//! | POST | `/api/v1/sessions/{sid}/cart/items` | Add to cart |
//! | PATCH/DELETE | `/api/v1/sessions/{sid}/cart/items/{index}` | Update / remove line |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState, SessionRegistry};
