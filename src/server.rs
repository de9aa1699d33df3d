use crate::config::AppConfig;
use crate::layer::{LayerView, LegendEntry, MarkerDetail, ToggleSummary};
use crate::types::MarkerId;
use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

pub struct AppState {
    layers: Mutex<BTreeMap<&'static str, Box<dyn LayerView>>>,
    overlay: FeatureCollection,
}

impl AppState {
    pub fn new(layers: Vec<Box<dyn LayerView>>, overlay: FeatureCollection) -> Self {
        let layers = layers.into_iter().map(|l| (l.scheme(), l)).collect();
        Self {
            layers: Mutex::new(layers),
            overlay,
        }
    }

    fn layers(&self) -> MutexGuard<'_, BTreeMap<&'static str, Box<dyn LayerView>>> {
        // A toggle either completes or never starts; poisoned state is whole.
        self.layers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

type ApiError = (StatusCode, String);

#[derive(Deserialize)]
pub struct QueryParams {
    lat: f64,
    lon: f64,
}

#[derive(Deserialize)]
pub struct ToggleRequest {
    category: String,
    checked: bool,
}

#[derive(Serialize)]
pub struct ToggleResponse {
    visible_count: usize,
    readout: Option<String>,
}

#[derive(Serialize)]
pub struct LayerResponse {
    scheme: &'static str,
    visible_count: usize,
    readout: Option<String>,
    toggles: Vec<ToggleSummary>,
    legend: Vec<LegendEntry>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/layers/:scheme", get(layer_handler))
        .route("/api/layers/:scheme/markers", get(markers_handler))
        .route("/api/layers/:scheme/markers/:id", get(marker_handler))
        .route("/api/layers/:scheme/toggle", post(toggle_handler))
        .route("/api/layers/:scheme/query", get(query_handler))
        .route("/api/overlay", get(overlay_handler))
        .with_state(state)
}

pub async fn start_server(config: AppConfig, state: AppState) -> Result<()> {
    let port = config.server.port;
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    println!("Starting server on http://{}", addr);
    info!("Serving static files from {:?}", config.server.static_dir);

    let app = router(Arc::new(state))
        .fallback_service(ServeDir::new(&config.server.static_dir))
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn unknown_scheme(scheme: &str) -> ApiError {
    (StatusCode::NOT_FOUND, format!("No layer named '{}'", scheme))
}

async fn layer_handler(
    State(state): State<Arc<AppState>>,
    Path(scheme): Path<String>,
) -> Result<Json<LayerResponse>, ApiError> {
    let layers = state.layers();
    let layer = layers.get(scheme.as_str()).ok_or_else(|| unknown_scheme(&scheme))?;
    Ok(Json(LayerResponse {
        scheme: layer.scheme(),
        visible_count: layer.visible_count(),
        readout: layer.readout(),
        toggles: layer.toggle_states(),
        legend: layer.legend(),
    }))
}

async fn markers_handler(
    State(state): State<Arc<AppState>>,
    Path(scheme): Path<String>,
) -> Result<Json<FeatureCollection>, ApiError> {
    let layers = state.layers();
    let layer = layers.get(scheme.as_str()).ok_or_else(|| unknown_scheme(&scheme))?;
    Ok(Json(layer.markers_geojson()))
}

async fn marker_handler(
    State(state): State<Arc<AppState>>,
    Path((scheme, id)): Path<(String, usize)>,
) -> Result<Json<MarkerDetail>, ApiError> {
    let layers = state.layers();
    let layer = layers.get(scheme.as_str()).ok_or_else(|| unknown_scheme(&scheme))?;
    layer
        .marker_detail(MarkerId(id))
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("No marker {} in {}", id, scheme)))
}

async fn toggle_handler(
    State(state): State<Arc<AppState>>,
    Path(scheme): Path<String>,
    Json(request): Json<ToggleRequest>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let mut layers = state.layers();
    let layer = layers
        .get_mut(scheme.as_str())
        .ok_or_else(|| unknown_scheme(&scheme))?;
    let visible_count = layer
        .toggle_label(&request.category, request.checked)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    Ok(Json(ToggleResponse {
        visible_count,
        readout: layer.readout(),
    }))
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Path(scheme): Path<String>,
    Query(params): Query<QueryParams>,
) -> Result<Json<Option<MarkerDetail>>, ApiError> {
    let layers = state.layers();
    let layer = layers.get(scheme.as_str()).ok_or_else(|| unknown_scheme(&scheme))?;
    Ok(Json(layer.nearest(params.lat, params.lon)))
}

async fn overlay_handler(State(state): State<Arc<AppState>>) -> Json<FeatureCollection> {
    Json(state.overlay.clone())
}
