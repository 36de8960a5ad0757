//! # Routes
//!
//! Axum router configuration for the storefront API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Catalog:
///   - GET /api/v1/products?category= - List products
///   - GET /api/v1/products/{product_id} - Get product by ID
///
/// - Sessions:
///   - POST /api/v1/sessions - Start a session
///   - GET|PUT /api/v1/sessions/{session_id}/pricing-mode - Read / toggle currency
///   - GET|DELETE /api/v1/sessions/{session_id}/cart - Read / clear cart
///   - POST /api/v1/sessions/{session_id}/cart/items - Add to cart
///   - PATCH|DELETE /api/v1/sessions/{session_id}/cart/items/{index} - Update / remove line
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let catalog_routes = Router::new()
        .route("/products", get(handlers::list_products))
        .route("/products/{product_id}", get(handlers::get_product));

    let session_routes = Router::new()
        .route(
            "/{session_id}/pricing-mode",
            get(handlers::get_pricing_mode).put(handlers::set_pricing_mode),
        )
        .route(
            "/{session_id}/cart",
            get(handlers::get_cart).delete(handlers::clear_cart),
        )
        .route(
            "/{session_id}/cart/items",
            post(handlers::add_cart_item),
        )
        .route(
            "/{session_id}/cart/items/{index}",
            patch(handlers::update_cart_item).delete(handlers::remove_cart_item),
        );

    let api_routes = Router::new()
        .merge(catalog_routes)
        .route("/sessions", post(handlers::create_session))
        .nest("/sessions", session_routes);

    Router::new()
        // Health check at root
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        // API v1
        .nest("/api/v1", api_routes)
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppConfig;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use shop_core::{Product, ProductCatalog, Variation};

    fn catalog() -> ProductCatalog {
        let mut catalog = ProductCatalog::new();
        catalog.add(
            Product::new("p", "P", Decimal::from(100))
                .with_category("peptides")
                .with_national_price(Decimal::from(90))
                .with_international_price(Decimal::from(2))
                .with_discount(Decimal::from(80))
                .with_stock(3),
        );
        catalog.add(
            Product::new("q", "Q", Decimal::from(50))
                .with_category("supplies")
                .with_stock(2),
        );
        catalog.add(
            Product::new("v", "V", Decimal::from(500)).with_variation(
                Variation::new("10mg", "10mg", Decimal::from(700))
                    .with_international_price(Decimal::from(14))
                    .with_stock(1),
            ),
        );
        catalog
    }

    fn app() -> (TestServer, AppState) {
        let state = AppState::with_catalog(AppConfig::default(), catalog());
        let server = TestServer::new(create_router(state.clone())).unwrap();
        (server, state)
    }

    fn server() -> TestServer {
        app().0
    }

    async fn start_session(server: &TestServer) -> String {
        let body: Value = server.post("/api/v1/sessions").await.json();
        body["session_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let response = server().get("/health").await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_products_by_category() {
        let server = server();

        let all: Value = server.get("/api/v1/products").await.json();
        assert_eq!(all["count"], 3);

        let supplies: Value = server
            .get("/api/v1/products")
            .add_query_param("category", "supplies")
            .await
            .json();
        assert_eq!(supplies["count"], 1);
        assert_eq!(supplies["products"][0]["id"], "q");
    }

    #[tokio::test]
    async fn test_unknown_product_is_404() {
        let response = server().get("/api/v1/products/nope").await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_session_defaults_to_national() {
        let response = server().post("/api/v1/sessions").await;
        assert_eq!(response.status_code(), StatusCode::CREATED);

        let body: Value = response.json();
        assert!(body["session_id"].as_str().is_some());
        assert_eq!(body["pricing"]["pricing_mode"], "national");
        assert_eq!(body["pricing"]["currency"], "PHP");
    }

    #[tokio::test]
    async fn test_add_to_cart_clamps_and_rejects() {
        let server = server();
        let sid = start_session(&server).await;

        let first: Value = server
            .post(&format!("/api/v1/sessions/{sid}/cart/items"))
            .json(&json!({ "product_id": "q", "quantity": 5 }))
            .await
            .json();
        assert_eq!(first["outcome"]["status"], "partially_applied");
        assert_eq!(first["outcome"]["applied"], 2);
        assert_eq!(
            first["message"],
            "Only 2 item(s) available in stock. Added 2 to your cart."
        );
        assert_eq!(first["cart"]["total_items"], 2);

        let second: Value = server
            .post(&format!("/api/v1/sessions/{sid}/cart/items"))
            .json(&json!({ "product_id": "q" }))
            .await
            .json();
        assert_eq!(second["outcome"]["status"], "rejected");
        assert_eq!(second["cart"]["total_items"], 2);
    }

    #[tokio::test]
    async fn test_add_unknown_variation_is_404() {
        let server = server();
        let sid = start_session(&server).await;
        let response = server
            .post(&format!("/api/v1/sessions/{sid}/cart/items"))
            .json(&json!({ "product_id": "v", "variation_id": "99mg" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_session_is_404_and_not_created() {
        let (server, state) = app();

        let cart = server.get("/api/v1/sessions/never-created/cart").await;
        assert_eq!(cart.status_code(), StatusCode::NOT_FOUND);

        let add = server
            .post("/api/v1/sessions/never-created/cart/items")
            .json(&json!({ "product_id": "q" }))
            .await;
        assert_eq!(add.status_code(), StatusCode::NOT_FOUND);
        assert!(state.sessions.is_empty());

        start_session(&server).await;
        assert_eq!(state.sessions.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_session_id_is_400() {
        let response = server().get("/api/v1/sessions/bad.id/cart").await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_currency_switch_requires_confirmation() {
        let server = server();
        let sid = start_session(&server).await;
        server
            .post(&format!("/api/v1/sessions/{sid}/cart/items"))
            .json(&json!({ "product_id": "p" }))
            .await
            .assert_status_ok();

        let refused = server
            .put(&format!("/api/v1/sessions/{sid}/pricing-mode"))
            .json(&json!({ "pricing_mode": "international" }))
            .await;
        assert_eq!(refused.status_code(), StatusCode::CONFLICT);

        let cart: Value = server.get(&format!("/api/v1/sessions/{sid}/cart")).await.json();
        assert_eq!(cart["total_price"], 80.0);
        assert_eq!(cart["formatted_total"], "₱80");

        let switched: Value = server
            .put(&format!("/api/v1/sessions/{sid}/pricing-mode"))
            .json(&json!({ "pricing_mode": "international", "confirm": true }))
            .await
            .json();
        assert_eq!(switched["result"]["status"], "switched");
        assert_eq!(switched["result"]["repriced"], 1);
        assert_eq!(switched["currency"], "USD");
        assert_eq!(switched["cart"]["items"][0]["price"], 2.0);
        assert_eq!(switched["cart"]["formatted_total"], "$2");
    }

    #[tokio::test]
    async fn test_empty_cart_switch_needs_no_confirmation() {
        let server = server();
        let sid = start_session(&server).await;
        let response = server
            .put(&format!("/api/v1/sessions/{sid}/pricing-mode"))
            .json(&json!({ "pricing_mode": "international" }))
            .await;
        response.assert_status_ok();

        let mode: Value = server.get(&format!("/api/v1/sessions/{sid}/pricing-mode")).await.json();
        assert_eq!(mode["pricing_mode"], "international");
        assert_eq!(mode["currency_symbol"], "$");
    }

    #[tokio::test]
    async fn test_update_remove_and_clear() {
        let server = server();
        let sid = start_session(&server).await;
        for product_id in ["p", "q"] {
            server
                .post(&format!("/api/v1/sessions/{sid}/cart/items"))
                .json(&json!({ "product_id": product_id }))
                .await
                .assert_status_ok();
        }

        let capped: Value = server
            .patch(&format!("/api/v1/sessions/{sid}/cart/items/0"))
            .json(&json!({ "quantity": 9 }))
            .await
            .json();
        assert_eq!(capped["message"], "Only 3 item(s) available in stock.");
        assert_eq!(capped["cart"]["items"][0]["quantity"], 3);

        let removed: Value = server
            .patch(&format!("/api/v1/sessions/{sid}/cart/items/0"))
            .json(&json!({ "quantity": 0 }))
            .await
            .json();
        assert_eq!(removed["outcome"]["status"], "applied");
        assert_eq!(removed["cart"]["items"][0]["product"]["id"], "q");

        let ignored: Value = server
            .delete(&format!("/api/v1/sessions/{sid}/cart/items/7"))
            .await
            .json();
        assert_eq!(ignored["outcome"]["status"], "ignored");
        assert!(ignored.get("message").is_none());

        let cleared: Value = server.delete(&format!("/api/v1/sessions/{sid}/cart")).await.json();
        assert_eq!(cleared["total_items"], 0);
        assert_eq!(cleared["items"], json!([]));
    }
}
