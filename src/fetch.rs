use crate::config::ModelConfig;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelFetchError {
    #[error("no model source available: {path} does not exist and no source_url is configured")]
    NoSource { path: String },
    #[error("failed to download model from {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ModelFetchError {
    /// A missing source is a configuration fault and must refuse startup;
    /// everything else degrades into the unavailable-model state.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ModelFetchError::NoSource { .. })
    }
}

/// Makes sure the model artifact exists locally, downloading it from the
/// configured source when absent. Returns the path the artifact lives at.
pub async fn ensure_model_file(model_config: &ModelConfig) -> Result<PathBuf, ModelFetchError> {
    let path = model_config.get_path();
    if path.exists() {
        tracing::info!("Using local model artifact {:?}", path);
        return Ok(path);
    }

    let Some(url) = &model_config.source_url else {
        return Err(ModelFetchError::NoSource {
            path: path.display().to_string(),
        });
    };

    tracing::info!("Model artifact missing, downloading from {}", url);

    let response = reqwest::get(url)
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelFetchError::Download {
            url: url.clone(),
            source: e,
        })?;

    let body = response.bytes().await.map_err(|e| ModelFetchError::Download {
        url: url.clone(),
        source: e,
    })?;

    tokio::fs::create_dir_all(&model_config.model_dir)
        .await
        .map_err(|e| ModelFetchError::Io {
            path: model_config.model_dir.display().to_string(),
            source: e,
        })?;

    tokio::fs::write(&path, &body)
        .await
        .map_err(|e| ModelFetchError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

    tracing::info!("Downloaded model artifact to {:?} ({} bytes)", path, body.len());

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use std::io::Write;

    fn model_config(dir: PathBuf, file: &str, source_url: Option<String>) -> ModelConfig {
        ModelConfig {
            onnx_file: file.to_string(),
            model_dir: dir,
            source_url,
            input_size: 224,
            num_instances: 1,
        }
    }

    #[tokio::test]
    async fn test_existing_file_short_circuits() {
        let dir = std::env::temp_dir().join(format!("model_fetch_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file_path = dir.join("present.onnx");
        let mut file = std::fs::File::create(&file_path).unwrap();
        file.write_all(b"not a real model").unwrap();

        let config = model_config(dir.clone(), "present.onnx", None);
        let resolved = ensure_model_file(&config).await.unwrap();

        assert_eq!(resolved, file_path);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_without_source_is_fatal() {
        let config = model_config(PathBuf::from("./nonexistent_dir"), "missing.onnx", None);

        let err = ensure_model_file(&config).await.unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("no model source available"));
    }
}
