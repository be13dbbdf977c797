use crate::{
    config::Config,
    fetch::ensure_model_file,
    ort_service::OrtModelService,
    server::HttpServer,
    state::{ServiceState, State},
};
use std::{error::Error, sync::Arc};
use tokio::{signal, sync::broadcast};

pub async fn start_app(config: Config) -> Result<(), Box<dyn Error>> {
    let service_state = match ServiceState::new(config.labels.as_ref()) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!("Failed to initialize service state: {}", e);
            return Err(e.into());
        }
    };

    let model_service = match ensure_model_file(&config.model).await {
        Ok(_) => match OrtModelService::new(&config.model) {
            Ok(service) => Some(Arc::new(service)),
            Err(e) => {
                tracing::error!("Failed to load model, serving without it: {}", e);
                None
            }
        },
        Err(e) if e.is_fatal() => {
            tracing::error!("Failed to resolve a model source: {}", e);
            return Err(Box::new(e));
        }
        Err(e) => {
            tracing::error!("Failed to fetch model, serving without it: {}", e);
            None
        }
    };

    let server = HttpServer::new(model_service, service_state, &config).await?;

    let (shutdown_tx, _) = broadcast::channel(1);
    let server_shutdown_rx = shutdown_tx.subscribe();

    let server_handle = server.run(server_shutdown_rx).await?;

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown.");

    let _ = shutdown_tx.send(());
    let _ = server_handle.await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
