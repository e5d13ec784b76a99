pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod secrets;
pub mod services;
pub mod utils;
pub mod validation;
pub mod vinti4;

use axum::{middleware as axum_middleware, routing::{get, post}, Router};
use std::sync::Arc;

use crate::services::OutcomeRecorder;
use crate::vinti4::Vinti4Gateway;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Vinti4Gateway,
    pub recorder: Arc<dyn OutcomeRecorder>,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/payments/checkout", post(handlers::payments::checkout))
        .route("/payments/callback", post(handlers::payments::callback))
        .route("/payments/status", post(handlers::payments::status))
        .layer(axum_middleware::from_fn(
            middleware::request_logger::request_logger_middleware,
        ))
        .with_state(state)
}
