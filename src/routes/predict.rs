use crate::{
    model_service::{ModelService, PredictError},
    server::SharedState,
    state::State,
};
use axum::{
    extract::{Multipart, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::time::Instant;
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum PredictRequestError {
    #[error("invalid multipart body: {0}")]
    InvalidBody(String),
    #[error("no image file found in request")]
    MissingFile,
    #[error(transparent)]
    Predict(#[from] PredictError),
}

impl IntoResponse for PredictRequestError {
    fn into_response(self) -> Response {
        let status = match &self {
            PredictRequestError::InvalidBody(_) | PredictRequestError::MissingFile => {
                StatusCode::BAD_REQUEST
            }
            PredictRequestError::Predict(PredictError::Decode(_)) => StatusCode::BAD_REQUEST,
            PredictRequestError::Predict(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(ErrorResponse {
            error: self.to_string(),
        }))
            .into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct LabeledPrediction {
    prediction: String,
    confidence: String,
}

#[derive(Serialize)]
struct IndexPrediction {
    prediction: usize,
}

#[instrument(skip(state, multipart))]
pub async fn predict<M: ModelService, S: State>(
    AxumState(state): AxumState<SharedState<M, S>>,
    mut multipart: Multipart,
) -> Result<Response, PredictRequestError> {
    state.metrics.record_request("/predict");
    let started = Instant::now();

    let mut image_data = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PredictRequestError::InvalidBody(e.to_string()))?
    {
        let is_file = field.name() == Some("file") || field.file_name().is_some();
        if is_file && image_data.is_none() {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| PredictRequestError::InvalidBody(e.to_string()))?;
            image_data = Some(bytes);
        }
    }
    let image_data = image_data.ok_or(PredictRequestError::MissingFile)?;

    let model = state.model.as_ref().ok_or(PredictError::Unavailable)?;
    let prediction = model.predict(&image_data)?;

    state
        .metrics
        .record_prediction_duration(started.elapsed().as_millis() as u64, "/predict");
    tracing::debug!(
        "Predicted class {} with confidence {:.3}",
        prediction.index,
        prediction.confidence
    );

    let confidence = format!("{:.2}%", prediction.confidence * 100.0);
    let response = match state.service_state.label_for(prediction.index) {
        Some(label) => Json(LabeledPrediction {
            prediction: label.to_string(),
            confidence,
        })
        .into_response(),
        None if state.service_state.has_labels() => Json(LabeledPrediction {
            prediction: format!("Unknown class {}", prediction.index),
            confidence,
        })
        .into_response(),
        None => Json(IndexPrediction {
            prediction: prediction.index,
        })
        .into_response(),
    };

    Ok(response)
}
