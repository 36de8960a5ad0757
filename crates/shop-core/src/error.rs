//! # Shop Error Types
//!
//! Typed error handling for the peptide-shop core.
//!
//! Stock limits and bad cart indices are *not* errors: the ledger reports
//! them as [`CartOutcome`](crate::cart::CartOutcome) values. `ShopError`
//! covers the things that genuinely fail: lookups, storage and I/O.

use thiserror::Error;

/// Core error type for catalog, storage and session operations
#[derive(Debug, Error)]
pub enum ShopError {
    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Product not found in catalog
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: String },

    /// Variation not found on a product
    #[error("Variation {variation_id} not found on product {product_id}")]
    VariationNotFound {
        product_id: String,
        variation_id: String,
    },

    /// Session id is malformed
    #[error("Invalid session id: {session_id}")]
    InvalidSession { session_id: String },

    /// No live or stored session under this id
    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: String },

    /// Switching currency with a non-empty cart needs the customer's consent
    #[error("Confirmation required: {message}")]
    ConfirmationRequired { message: String },

    /// Key-value store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ShopError {
    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ShopError::InvalidRequest(_) => 400,
            ShopError::ProductNotFound { .. } => 404,
            ShopError::VariationNotFound { .. } => 404,
            ShopError::InvalidSession { .. } => 400,
            ShopError::SessionNotFound { .. } => 404,
            ShopError::ConfirmationRequired { .. } => 409,
            ShopError::Storage(_) => 500,
            ShopError::Serialization(_) => 500,
        }
    }
}

impl From<std::io::Error> for ShopError {
    fn from(err: std::io::Error) -> Self {
        ShopError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for ShopError {
    fn from(err: serde_json::Error) -> Self {
        ShopError::Serialization(err.to_string())
    }
}

/// Result type alias for shop operations
pub type ShopResult<T> = Result<T, ShopError>;
