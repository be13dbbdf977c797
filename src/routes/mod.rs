mod health;
mod metrics;
mod predict;

use crate::{model_service::ModelService, server::SharedState, state::State};
use axum::{
    routing::{get, post},
    Router,
};

pub fn api_routes<M: ModelService, S: State>() -> Router<SharedState<M, S>> {
    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::healthcheck))
        .route("/predict", post(predict::predict::<M, S>))
        .route("/metrics", get(metrics::metrics_handler::<M, S>))
}
