use crate::{
    config::Config, model_service::ModelService, routes::api_routes, state::State,
    telemetry::Metrics,
};
use axum::{extract::DefaultBodyLimit, Router};
use axum_otel_metrics::HttpMetricsLayerBuilder;
use std::sync::Arc;
use tokio::{net::TcpListener, sync::broadcast::Receiver, task::JoinHandle};

pub struct SharedState<M: ModelService, S: State> {
    /// `None` means the model could not be fetched or loaded; requests are
    /// answered with an unavailable error until the service is restarted.
    pub model: Option<Arc<M>>,
    pub service_state: Arc<S>,
    pub metrics: Arc<Metrics>,
}

impl<M: ModelService, S: State> Clone for SharedState<M, S> {
    fn clone(&self) -> Self {
        Self {
            model: self.model.clone(),
            service_state: self.service_state.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new<M: ModelService, S: State>(
        model: Option<Arc<M>>,
        service_state: Arc<S>,
        config: &Config,
    ) -> anyhow::Result<Self> {
        let addr = config.server.get_address();

        let metrics = Arc::new(Metrics::new());
        let metrics_layer = HttpMetricsLayerBuilder::new().build();

        let app_state = SharedState {
            model,
            service_state,
            metrics,
        };

        let router = Router::new()
            .merge(api_routes::<M, S>())
            .with_state(app_state)
            .layer(DefaultBodyLimit::max(config.server.body_limit))
            .layer(metrics_layer);

        let listener = TcpListener::bind(addr).await?;

        Ok(Self { router, listener })
    }

    pub async fn run(
        self,
        shutdown_rx: Receiver<()>,
    ) -> anyhow::Result<JoinHandle<anyhow::Result<()>>> {
        tracing::info!("Starting app on {}", &self.listener.local_addr()?);

        let listener = self.listener;
        let router = self.router;
        let server_handle = tokio::spawn({
            let mut shutdown_rx = shutdown_rx.resubscribe();
            async move {
                let server = axum::serve(listener, router);
                server
                    .with_graceful_shutdown(async move {
                        shutdown_rx.recv().await.ok();
                    })
                    .await?;
                Ok(())
            }
        });

        Ok(server_handle)
    }
}
