//! # Request Handlers
//!
//! Axum request handlers for the storefront API.
//! Cart mutations always answer `200` with the advisory outcome in the body;
//! only lookups (including unknown sessions), malformed requests and
//! unconfirmed currency switches fail.

use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shop_core::{
    CartLedger, CartLineItem, CartOutcome, Currency, ModeSwitch, Preconfirmed, PricingMode,
    ShopError, ShopSession, ALL_CATEGORIES, SWITCH_CONFIRMATION,
};
use tracing::{info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Product listing filter
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    /// Category id; `all` or absent lists everything
    #[serde(default)]
    pub category: Option<String>,
}

/// Currency toggle request
#[derive(Debug, Deserialize)]
pub struct SetPricingModeRequest {
    pub pricing_mode: PricingMode,
    /// The customer already agreed to reprice a non-empty cart
    #[serde(default)]
    pub confirm: bool,
}

/// Add-to-cart request
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: String,
    #[serde(default)]
    pub variation_id: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// Quantity change request; zero or negative removes the line
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i64,
}

/// Active pricing mode
#[derive(Debug, Serialize)]
pub struct PricingModeResponse {
    pub pricing_mode: PricingMode,
    pub currency: Currency,
    pub currency_symbol: &'static str,
}

impl PricingModeResponse {
    fn from_mode(mode: PricingMode) -> Self {
        Self {
            pricing_mode: mode,
            currency: mode.currency(),
            currency_symbol: mode.symbol(),
        }
    }
}

/// Result of a currency toggle
#[derive(Debug, Serialize)]
pub struct SwitchResponse {
    pub result: ModeSwitch,
    #[serde(flatten)]
    pub mode: PricingModeResponse,
    pub cart: CartView,
}

/// Cart contents and totals
#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartLineItem>,
    pub total_items: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    pub formatted_total: String,
    pub pricing_mode: PricingMode,
    pub currency: Currency,
}

impl CartView {
    pub fn of(cart: &CartLedger) -> Self {
        let mode = cart.current_cart_mode();
        let total_price = cart.total_price();
        Self {
            items: cart.items().to_vec(),
            total_items: cart.total_item_count(),
            total_price,
            formatted_total: cart.format(total_price),
            pricing_mode: mode,
            currency: mode.currency(),
        }
    }
}

/// Outcome of a cart mutation plus the resulting cart
#[derive(Debug, Serialize)]
pub struct CartMutationResponse {
    pub outcome: CartOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub cart: CartView,
}

impl CartMutationResponse {
    fn new(outcome: CartOutcome, session: &ShopSession) -> Self {
        Self {
            message: outcome.message(),
            outcome,
            cart: CartView::of(session.cart()),
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn shop_error_to_response(err: ShopError) -> ApiError {
    let code = err.status_code();
    let mut response = ErrorResponse::new(err.to_string(), code);
    if let ShopError::ConfirmationRequired { message } = &err {
        response = response.with_details(message.clone());
    }
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "peptide-shop",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// List listed products, optionally by category
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> impl IntoResponse {
    let category = query.category.as_deref().unwrap_or(ALL_CATEGORIES);
    let products: Vec<_> = state.catalog.in_category(category).collect();
    Json(serde_json::json!({
        "category": category,
        "categories": state.catalog.categories(),
        "products": products,
        "count": products.len()
    }))
}

/// Get single product
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .catalog
        .get(&product_id)
        .ok_or_else(|| shop_error_to_response(ShopError::ProductNotFound { product_id }))?;

    Ok(Json(product.clone()))
}

/// Start a new session
pub async fn create_session(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let session_id = uuid::Uuid::new_v4().to_string();
    state
        .sessions
        .create(&session_id)
        .map_err(shop_error_to_response)?;
    let mode = state
        .sessions
        .with_session(&session_id, |s| s.pricing().current_mode())
        .map_err(shop_error_to_response)?;

    info!("Created session {}", session_id);
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "session_id": session_id,
            "pricing": PricingModeResponse::from_mode(mode),
        })),
    ))
}

/// Current pricing mode for a session
pub async fn get_pricing_mode(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<PricingModeResponse>, ApiError> {
    state
        .sessions
        .with_session(&session_id, |s| {
            PricingModeResponse::from_mode(s.pricing().current_mode())
        })
        .map(Json)
        .map_err(shop_error_to_response)
}

/// Toggle currency; a non-empty cart needs `confirm: true`
#[instrument(skip_all, fields(session_id = %session_id, to = %request.pricing_mode))]
pub async fn set_pricing_mode(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<SetPricingModeRequest>,
) -> Result<Json<SwitchResponse>, ApiError> {
    let response = state
        .sessions
        .with_session(&session_id, |s| {
            let result = s.switch_pricing_mode(request.pricing_mode, &Preconfirmed(request.confirm));
            SwitchResponse {
                result,
                mode: PricingModeResponse::from_mode(s.pricing().current_mode()),
                cart: CartView::of(s.cart()),
            }
        })
        .map_err(shop_error_to_response)?;

    if response.result == ModeSwitch::Declined {
        return Err(shop_error_to_response(ShopError::ConfirmationRequired {
            message: SWITCH_CONFIRMATION.to_string(),
        }));
    }

    Ok(Json(response))
}

/// Cart contents
pub async fn get_cart(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<CartView>, ApiError> {
    state
        .sessions
        .with_session(&session_id, |s| CartView::of(s.cart()))
        .map(Json)
        .map_err(shop_error_to_response)
}

/// Add a product or variation to the cart
#[instrument(skip_all, fields(session_id = %session_id, product_id = %request.product_id))]
pub async fn add_cart_item(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<CartMutationResponse>, ApiError> {
    let product = state.catalog.get(&request.product_id).ok_or_else(|| {
        shop_error_to_response(ShopError::ProductNotFound {
            product_id: request.product_id.clone(),
        })
    })?;

    let variation = match &request.variation_id {
        Some(variation_id) => Some(product.variation(variation_id).ok_or_else(|| {
            shop_error_to_response(ShopError::VariationNotFound {
                product_id: product.id.clone(),
                variation_id: variation_id.clone(),
            })
        })?),
        None => None,
    };

    let response = state
        .sessions
        .with_session(&session_id, |s| {
            let outcome = s.cart_mut().add(product, variation, request.quantity);
            CartMutationResponse::new(outcome, s)
        })
        .map_err(shop_error_to_response)?;

    if let Some(message) = &response.message {
        warn!("Add to cart advisory: {}", message);
    }
    Ok(Json(response))
}

/// Change a line's quantity
pub async fn update_cart_item(
    State(state): State<AppState>,
    Path((session_id, index)): Path<(String, usize)>,
    Json(request): Json<UpdateItemRequest>,
) -> Result<Json<CartMutationResponse>, ApiError> {
    state
        .sessions
        .with_session(&session_id, |s| {
            let outcome = s.cart_mut().update_quantity(index, request.quantity);
            CartMutationResponse::new(outcome, s)
        })
        .map(Json)
        .map_err(shop_error_to_response)
}

/// Remove a line
pub async fn remove_cart_item(
    State(state): State<AppState>,
    Path((session_id, index)): Path<(String, usize)>,
) -> Result<Json<CartMutationResponse>, ApiError> {
    state
        .sessions
        .with_session(&session_id, |s| {
            let outcome = s.cart_mut().remove(index);
            CartMutationResponse::new(outcome, s)
        })
        .map(Json)
        .map_err(shop_error_to_response)
}

/// Empty the cart
pub async fn clear_cart(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<CartView>, ApiError> {
    state
        .sessions
        .with_session(&session_id, |s| {
            s.cart_mut().clear();
            CartView::of(s.cart())
        })
        .map(Json)
        .map_err(shop_error_to_response)
}
