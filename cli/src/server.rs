#[cfg(feature = "server")]
pub mod http {
    use axum::{
        extract::State,
        http::StatusCode,
        response::{IntoResponse, Json},
        routing::{get, post},
        Router,
    };
    use rulemorph::{Diagnostic, Engine, MemoryReporter};
    use serde::Serialize;
    use serde_json::Value;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use tower_http::cors::CorsLayer;
    use tracing::{error, info};

    #[derive(Debug, Serialize)]
    struct TransformResponse {
        document: Value,
        diagnostics: Vec<DiagnosticJson>,
    }

    #[derive(Debug, Serialize)]
    struct DiagnosticJson {
        record: usize,
        rule: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        action: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        element: Option<usize>,
        error: String,
    }

    impl From<Diagnostic> for DiagnosticJson {
        fn from(diagnostic: Diagnostic) -> Self {
            Self {
                record: diagnostic.record,
                rule: diagnostic.rule,
                action: diagnostic.action,
                element: diagnostic.element,
                error: diagnostic.error.to_string(),
            }
        }
    }

    #[derive(Debug, Serialize)]
    struct ErrorResponse {
        error: String,
    }

    pub fn router(engine: Engine) -> Router {
        Router::new()
            .route("/health", get(health_check))
            .route("/transform", post(transform))
            .layer(CorsLayer::permissive())
            .with_state(Arc::new(engine))
    }

    pub async fn start_server(engine: Engine, host: &str, port: u16) -> anyhow::Result<()> {
        let app = router(engine);

        let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
        info!("Rulemorph server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    async fn health_check() -> impl IntoResponse {
        Json(serde_json::json!({
            "status": "ok",
            "service": "rulemorph",
            "version": env!("CARGO_PKG_VERSION")
        }))
    }

    async fn transform(
        State(engine): State<Arc<Engine>>,
        Json(mut document): Json<Value>,
    ) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
        let reporter = Arc::new(MemoryReporter::new());
        let engine = engine.as_ref().clone().with_reporter(reporter.clone());

        engine.transform(&mut document).map_err(|e| {
            error!("Transformation failed: {}", e);
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
        })?;

        let diagnostics: Vec<DiagnosticJson> =
            reporter.take().into_iter().map(DiagnosticJson::from).collect();
        info!(
            records = document.as_array().map_or(0, Vec::len),
            diagnostics = diagnostics.len(),
            "Transformed document"
        );

        Ok(Json(TransformResponse {
            document,
            diagnostics,
        }))
    }

}

#[cfg(not(feature = "server"))]
pub mod http {
    pub async fn start_server(
        _engine: rulemorph::Engine,
        _host: &str,
        _port: u16,
    ) -> anyhow::Result<()> {
        anyhow::bail!("Server feature not enabled. Recompile with --features server")
    }
}
