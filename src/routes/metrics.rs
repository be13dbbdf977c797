use crate::{model_service::ModelService, server::SharedState, state::State};
use axum::{extract::State as AxumState, response::IntoResponse};
use prometheus::{Encoder, TextEncoder};

pub async fn metrics_handler<M: ModelService, S: State>(
    AxumState(state): AxumState<SharedState<M, S>>,
) -> impl IntoResponse {
    let metric_families = state.metrics.registry.gather();

    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();

    String::from_utf8(buffer).unwrap().into_response()
}
