//! HTTP surface over the style and cart aggregates.

pub mod cart;
pub mod styles;

use std::sync::Arc;

use axum::{http::StatusCode, routing::{get, post, put}, Json, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::domain::aggregates::{ExpansionLimits, FeeSchedule};
use crate::publisher::EventPublisher;
use crate::store::{CartRepository, InMemoryStore, StyleRepository};
use crate::StorefrontError;

#[derive(Clone)]
pub struct AppState {
    pub styles: Arc<dyn StyleRepository>,
    pub carts: Arc<dyn CartRepository>,
    pub fees: Arc<dyn FeeSchedule>,
    pub limits: ExpansionLimits,
    pub events: EventPublisher,
}

impl AppState {
    pub fn in_memory(limits: ExpansionLimits, fees: Arc<dyn FeeSchedule>) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self { styles: store.clone(), carts: store, fees, limits, events: EventPublisher::default() }
    }

    pub fn with_events(mut self, events: EventPublisher) -> Self {
        self.events = events;
        self
    }
}

pub type ApiError = (StatusCode, String);

impl From<StorefrontError> for (StatusCode, String) {
    fn from(e: StorefrontError) -> Self {
        let status = match &e {
            StorefrontError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            StorefrontError::CapacityExceeded { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            StorefrontError::StyleNotFound | StorefrontError::CartNotFound | StorefrontError::ItemNotFound => StatusCode::NOT_FOUND,
            StorefrontError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() { tracing::error!(error = %e, "request failed"); }
        (status, e.to_string())
    }
}

pub(crate) fn invalid(e: validator::ValidationErrors) -> ApiError {
    (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront-core"})) }))
        .route("/api/v1/styles/expand", post(styles::expand_attributes))
        .route("/api/v1/styles", post(styles::create_style))
        .route("/api/v1/styles/:id", get(styles::get_style).put(styles::update_style))
        .route("/api/v1/styles/:id/inventory", get(styles::get_inventory).put(styles::save_inventory))
        .route("/api/v1/styles/:id/inventory/images", put(styles::attach_images))
        .route("/api/v1/products/:id/styles", get(styles::list_product_styles))
        .route("/api/v1/cart/summary", post(cart::summarize))
        .route("/api/v1/cart/:session", get(cart::get_cart).post(cart::add_to_cart).delete(cart::clear_cart))
        .route("/api/v1/cart/:session/items/:item", put(cart::update_item).delete(cart::remove_item))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
