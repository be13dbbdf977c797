use axum::{response::IntoResponse, response::Json};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct Status {
    status: String,
}

#[derive(Serialize, Deserialize)]
pub struct Message {
    message: String,
}

pub async fn root() -> impl IntoResponse {
    Json(Message {
        message: "MRI classification service is running".into(),
    })
}

pub async fn healthcheck() -> impl IntoResponse {
    Json(Status {
        status: "Available".into(),
    })
}
