use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct ClassPrediction {
    pub index: usize,
    pub confidence: f32,
}

#[derive(Error, Debug)]
pub enum PredictError {
    #[error("failed to decode image: {0}")]
    Decode(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("model is not available")]
    Unavailable,
}

pub trait ModelService: Send + Sync + Clone + 'static {
    fn predict(&self, image_data: &[u8]) -> Result<ClassPrediction, PredictError>;
}
