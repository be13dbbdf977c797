use crate::{
    config::ModelConfig,
    model_service::{ClassPrediction, ModelService, PredictError},
};
use image::{imageops::FilterType, GenericImageView};
use ndarray::{Array, Axis, Ix4};
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("failed to initialize onnx runtime: {0}")]
    Runtime(#[source] ort::Error),
    #[error("failed to load model from {path}: {source}")]
    Session {
        path: String,
        #[source]
        source: ort::Error,
    },
    #[error("model {path} declares no outputs")]
    NoOutputs { path: String },
}

/// Decodes an uploaded image and shapes it into the tensor the classifier
/// expects: NHWC `[1, size, size, 3]`, intensities scaled to `[0, 1]`.
///
/// Grayscale inputs are replicated across the three channels and any alpha
/// channel is dropped; `pixels()` hands back RGBA for every source format.
fn transform_image_bytes(image_data: &[u8], input_size: u32) -> Result<Array<f32, Ix4>, String> {
    let image_reader = image::ImageReader::new(std::io::Cursor::new(image_data))
        .with_guessed_format()
        .map_err(|e| format!("Error decoding image: {}", e))?;

    let original_img = image_reader
        .decode()
        .map_err(|e| format!("Error decoding image: {}", e))?;

    let img = original_img.resize_exact(input_size, input_size, FilterType::CatmullRom);

    let size = input_size as usize;
    let mut input = Array::zeros((1, size, size, 3));
    for pixel in img.pixels() {
        let x = pixel.0 as usize;
        let y = pixel.1 as usize;
        let [r, g, b, _] = pixel.2 .0;
        input[[0, y, x, 0]] = (r as f32) / 255.;
        input[[0, y, x, 1]] = (g as f32) / 255.;
        input[[0, y, x, 2]] = (b as f32) / 255.;
    }

    Ok(input)
}

fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .reduce(|accum, item| if item.1 > accum.1 { item } else { accum })
}

#[derive(Clone)]
pub struct OrtModelService {
    sessions: Arc<Vec<Arc<Mutex<Session>>>>,
    counter: Arc<AtomicUsize>,
    output_name: String,
    input_size: u32,
}

impl OrtModelService {
    pub fn new(model_config: &ModelConfig) -> Result<Self, ModelLoadError> {
        ort::init().commit().map_err(ModelLoadError::Runtime)?;

        let path = model_config.get_path();
        let num_instances = model_config.num_instances;
        let sessions = (0..num_instances)
            .map(|_| {
                let session = Session::builder()?
                    .with_optimization_level(GraphOptimizationLevel::Level3)?
                    .commit_from_file(&path)?;
                Ok(Arc::new(Mutex::new(session)))
            })
            .collect::<Result<Vec<_>, ort::Error>>()
            .map_err(|e| ModelLoadError::Session {
                path: path.display().to_string(),
                source: e,
            })?;

        let output_name = sessions
            .first()
            .and_then(|s| {
                let session = s.lock().expect("fresh session mutex");
                session.outputs.first().map(|o| o.name.clone())
            })
            .ok_or_else(|| ModelLoadError::NoOutputs {
                path: path.display().to_string(),
            })?;

        tracing::info!(
            "Created {} ONNX sessions for {:?}, output {:?}",
            num_instances,
            path,
            output_name
        );

        Ok(Self {
            counter: Arc::new(AtomicUsize::new(0)),
            sessions: Arc::new(sessions),
            output_name,
            input_size: model_config.input_size,
        })
    }

    fn run_inference(&self, input: &Array<f32, Ix4>) -> Result<ndarray::ArrayD<f32>, PredictError> {
        let index = self.counter.fetch_add(1, Ordering::SeqCst) % self.sessions.len();
        let session_arc = &self.sessions[index];
        let mut session = session_arc
            .lock()
            .map_err(|e| PredictError::Inference(format!("session mutex poisoned: {}", e)))?;

        tracing::debug!("Handling request with session {}", index);
        let tensor_ref = TensorRef::from_array_view(input.view())
            .map_err(|e| PredictError::Inference(format!("failed to build tensor: {}", e)))?;

        let input_tensor = ort::inputs![tensor_ref];

        let outputs = session
            .run(input_tensor)
            .map_err(|e| PredictError::Inference(format!("inference failed: {}", e)))?;

        let (shape, data) = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| PredictError::Inference(format!("failed to extract tensor: {}", e)))?;

        let ix = shape.to_ixdyn();
        let array = ndarray::ArrayD::from_shape_vec(ix, data.to_vec())
            .map_err(|e| PredictError::Inference(format!("invalid tensor shape: {}", e)))?;

        Ok(array)
    }
}

impl ModelService for OrtModelService {
    fn predict(&self, image_data: &[u8]) -> Result<ClassPrediction, PredictError> {
        let input = transform_image_bytes(image_data, self.input_size).map_err(PredictError::Decode)?;

        let outputs = self.run_inference(&input)?;

        // One batch element per request; strip the batch axis before scoring.
        let scores: Vec<f32> = if outputs.ndim() > 1 {
            outputs.index_axis(Axis(0), 0).iter().copied().collect()
        } else {
            outputs.iter().copied().collect()
        };

        // Raw scores are not guaranteed to be normalized; confidence comes
        // from an explicit softmax.
        let probabilities = softmax(&scores);
        let (index, confidence) = argmax(&probabilities)
            .ok_or_else(|| PredictError::Inference("empty score vector".to_string()))?;

        Ok(ClassPrediction { index, confidence })
    }
}
