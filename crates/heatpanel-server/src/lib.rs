//! HTTP control API for the heat panel.
//!
//! Reads and replaces the live simulation parameters held by the
//! [`Coordinator`]. A rejected update never touches the shared state.

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::get,
};
use serde::Serialize;

use heatpanel_core::{
    Coordinator, FrameRenderer, NetworkStatus, ParameterUpdate, Shutdown, SimulationParameters,
    StatusCell,
};

/// Shared server state.
pub struct AppState {
    coordinator: Arc<Coordinator>,
    status: Arc<StatusCell>,
    renderer: FrameRenderer,
    grid_size: usize,
}

impl AppState {
    pub fn new(
        coordinator: Arc<Coordinator>,
        status: Arc<StatusCell>,
        width: usize,
        height: usize,
        grid_size: usize,
    ) -> Self {
        Self {
            coordinator,
            status,
            renderer: FrameRenderer::new(width, height),
            grid_size,
        }
    }
}

#[derive(Debug, Serialize)]
struct SetResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<SimulationParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl SetResponse {
    fn ok(params: SimulationParameters) -> (StatusCode, Json<Self>) {
        (
            StatusCode::OK,
            Json(Self {
                status: "ok",
                params: Some(params),
                error: None,
            }),
        )
    }

    fn error(msg: String) -> (StatusCode, Json<Self>) {
        (
            StatusCode::BAD_REQUEST,
            Json(Self {
                status: "error",
                params: None,
                error: Some(msg),
            }),
        )
    }
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    network: NetworkStatus,
    params: SimulationParameters,
    generation: u64,
}

async fn handle_get_params(State(state): State<Arc<AppState>>) -> Json<SimulationParameters> {
    Json(state.coordinator.snapshot())
}

/// Merge a partial update into the current parameters.
///
/// The body is parsed here rather than through the `Json` extractor so that
/// malformed input gets the same `{"status":"error"}` shape as invalid values.
async fn handle_set_params(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> (StatusCode, Json<SetResponse>) {
    let update: ParameterUpdate = match serde_json::from_slice(&body) {
        Ok(u) => u,
        Err(e) => {
            log::warn!("rejected parameter update: invalid JSON: {e}");
            return SetResponse::error(format!("invalid JSON body: {e}"));
        }
    };

    match state.coordinator.try_update(|current| update.apply(current)) {
        Ok(params) => {
            log::info!(
                "parameters set: mode={} L={} M={} D={}",
                params.mode,
                params.length,
                params.amplitude,
                params.diffusivity
            );
            SetResponse::ok(params)
        }
        Err(e) => {
            log::warn!("rejected parameter update: {e}");
            SetResponse::error(e.to_string())
        }
    }
}

async fn handle_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let (generation, params) = state.coordinator.versioned();
    Json(StatusResponse {
        network: state.status.get(),
        params,
        generation,
    })
}

/// Still frame of the current parameters at t = 0, as binary PPM.
///
/// Rendering runs on the blocking pool so a large display does not hold up
/// the runtime's workers.
async fn handle_frame(State(state): State<Arc<AppState>>) -> Response {
    let params = state.coordinator.snapshot();
    let rendered = tokio::task::spawn_blocking(move || {
        state
            .renderer
            .render_at(&params, state.grid_size, 0.0, state.status.get())
            .to_ppm()
    })
    .await;
    match rendered {
        Ok(ppm) => ([(header::CONTENT_TYPE, "image/x-portable-pixmap")], ppm).into_response(),
        Err(e) => {
            log::error!("frame render failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let network = state.status.get();
    Json(serde_json::json!({
        "status": if network.is_connected() { "healthy" } else { "degraded" },
        "network": network,
    }))
}

async fn handle_index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "Heat Panel Control API",
        "version": heatpanel_core::VERSION,
        "endpoints": {
            "/": "This API index",
            "/api/params": {
                "GET": "Current parameters {mode, L, M, D}",
                "POST": "Partial update {mode?, L?, M?, D?}; L > 0, D > 0, mode 1D or 2D",
            },
            "/api/status": "Network status, parameters and generation",
            "/api/frame.ppm": "Still frame of the current parameters at t = 0",
            "/health": "Health check",
        },
        "examples": {
            "set_2d": "curl -X POST -d '{\"mode\":\"2D\",\"L\":1.0}' /api/params",
        }
    }))
}

/// Build the axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handle_index))
        .route("/api/params", get(handle_get_params).post(handle_set_params))
        .route("/api/status", get(handle_status))
        .route("/api/frame.ppm", get(handle_frame))
        .route("/health", get(handle_health))
        .with_state(state)
}

/// Serve the Control API until `shutdown` is triggered.
pub async fn run_server(
    state: Arc<AppState>,
    host: &str,
    port: u16,
    shutdown: Arc<Shutdown>,
) -> std::io::Result<()> {
    let app = build_router(state);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("control API listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::task::spawn_blocking(move || shutdown.wait()).await;
        })
        .await?;
    log::info!("control API stopped");
    Ok(())
}
