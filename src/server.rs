//! Web server for the quakemap UI.
//!
//! Provides an interactive earthquake map using:
//! - Axum for HTTP server
//! - SSE (Server-Sent Events) to tell the page when the store changed
//! - HTMX for the header, sidebar and banners
//! - Leaflet + markercluster for the map surface

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::State,
    http::StatusCode,
    response::{
        Html, IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use chrono::Local;
use serde::Deserialize;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use crate::client::{FeedSource, TimeRange};
use crate::errors::ControlError;
use crate::store::{Controller, StoreChange, StoreSnapshot, ViewState};
use crate::view::{self, Marker};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Time range and threshold the view starts with
    pub initial_view: ViewState,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            initial_view: ViewState::default(),
        }
    }
}

/// Shared application state.
pub struct AppState<S> {
    controller: Arc<Controller<S>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            controller: Arc::clone(&self.controller),
        }
    }
}

impl<S: FeedSource> AppState<S> {
    #[must_use]
    pub fn new(controller: Arc<Controller<S>>) -> Self {
        Self { controller }
    }
}

/// Create the Axum router with all routes.
pub fn create_router<S: FeedSource>(state: AppState<S>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/stream", get(sse_handler::<S>))
        .route("/partials/header", get(header_partial::<S>))
        .route("/partials/controls", get(controls_partial::<S>))
        .route("/partials/status", get(status_partial::<S>))
        .route("/partials/legend", get(legend_partial))
        .route("/api/markers", get(markers_handler::<S>))
        .route("/api/state", get(state_handler::<S>))
        .route("/controls/range", post(range_handler::<S>))
        .route("/controls/min-magnitude", post(min_magnitude_handler::<S>))
        .route("/controls/reset", post(reset_handler::<S>))
        .route("/controls/refresh", post(refresh_handler::<S>))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Start the web server and the first load.
pub async fn run_server<S: FeedSource>(config: ServerConfig, source: S) -> anyhow::Result<()> {
    let controller = Arc::new(Controller::new(source, config.initial_view));
    controller
        .set_min_magnitude(config.initial_view.min_magnitude)
        .await?;
    controller
        .select_time_range(config.initial_view.time_range)
        .await;

    let app = create_router(AppState::new(Arc::clone(&controller)));

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("🌍 quakemap UI starting at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Main page handler - serves the HTML shell.
async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// SSE stream telling the page to re-render after every store change.
async fn sse_handler<S: FeedSource>(
    State(state): State<AppState<S>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.controller.subscribe();
    let stream = BroadcastStream::new(rx)
        .map(|result| Ok(Event::default().event("refresh").data(change_kind(&result))));

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Data payload of a `refresh` event.
fn change_kind(result: &Result<StoreChange, BroadcastStreamRecvError>) -> &'static str {
    match result {
        Ok(StoreChange::Loading) => "loading",
        Ok(StoreChange::Committed) => "committed",
        Ok(StoreChange::ViewChanged) => "view",
        // A lagged receiver still needs one refresh to catch up.
        Err(_) => "lagged",
    }
}

async fn header_partial<S: FeedSource>(State(state): State<AppState<S>>) -> Html<String> {
    let store = state.controller.read().await;
    Html(view::render_header(&store))
}

async fn controls_partial<S: FeedSource>(State(state): State<AppState<S>>) -> Html<String> {
    let store = state.controller.read().await;
    Html(view::render_controls(&store))
}

async fn status_partial<S: FeedSource>(State(state): State<AppState<S>>) -> Html<String> {
    let store = state.controller.read().await;
    Html(view::render_status(&store))
}

async fn legend_partial() -> Html<String> {
    Html(view::render_legend())
}

/// Marker data for the visible events, popups in server-local time.
async fn markers_handler<S: FeedSource>(State(state): State<AppState<S>>) -> Json<Vec<Marker>> {
    let store = state.controller.read().await;
    Json(view::markers(&store, &Local))
}

async fn state_handler<S: FeedSource>(State(state): State<AppState<S>>) -> Json<StoreSnapshot> {
    Json(state.controller.snapshot().await)
}

#[derive(Debug, Deserialize)]
struct RangeForm {
    range: String,
}

/// Switch time range and start a new load.
async fn range_handler<S: FeedSource>(
    State(state): State<AppState<S>>,
    Form(form): Form<RangeForm>,
) -> Result<StatusCode, ControlError> {
    let range: TimeRange = form
        .range
        .parse()
        .map_err(|_| ControlError::UnknownRange(form.range.clone()))?;

    tracing::info!("time range set to {} via UI", range.as_str());
    state.controller.select_time_range(range).await;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct MinMagnitudeForm {
    min_magnitude: String,
}

/// Move the magnitude threshold. Never fetches.
async fn min_magnitude_handler<S: FeedSource>(
    State(state): State<AppState<S>>,
    Form(form): Form<MinMagnitudeForm>,
) -> Result<StatusCode, ControlError> {
    let value: f64 = form
        .min_magnitude
        .trim()
        .parse()
        .map_err(|_| ControlError::InvalidMagnitude(form.min_magnitude.clone()))?;

    state.controller.set_min_magnitude(value).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reset the threshold and hand back fresh controls.
async fn reset_handler<S: FeedSource>(State(state): State<AppState<S>>) -> impl IntoResponse {
    state.controller.reset_min_magnitude().await;
    tracing::info!("filter reset via UI");
    let store = state.controller.read().await;
    Html(view::render_controls(&store))
}

async fn refresh_handler<S: FeedSource>(State(state): State<AppState<S>>) -> StatusCode {
    state.controller.refresh().await;
    StatusCode::NO_CONTENT
}

/// Health check endpoint.
async fn health_handler() -> &'static str {
    "OK"
}

// ============================================================================
// HTML Template (embedded for single-binary deployment)
// ============================================================================

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en" data-theme="dark">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>quakemap - Recent Earthquakes</title>

    <link rel="preconnect" href="https://fonts.googleapis.com">
    <link rel="preconnect" href="https://fonts.gstatic.com" crossorigin>
    <link href="https://fonts.googleapis.com/css2?family=Inter:wght@400;500;600;700&display=swap" rel="stylesheet">

    <!-- HTMX -->
    <script src="https://unpkg.com/htmx.org@1.9.10"></script>

    <!-- Leaflet + clustering -->
    <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
    <link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@1.5.3/dist/MarkerCluster.css" />
    <link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@1.5.3/dist/MarkerCluster.Default.css" />
    <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
    <script src="https://unpkg.com/leaflet.markercluster@1.5.3/dist/leaflet.markercluster.js"></script>

    <style>
        :root {
            --font: 'Inter', -apple-system, BlinkMacSystemFont, sans-serif;

            --bg-primary: #09090b;
            --bg-secondary: #0f0f12;
            --bg-tertiary: #18181b;
            --bg-elevated: #1c1c1f;
            --bg-hover: #27272a;

            --text-primary: #fafafa;
            --text-secondary: #a1a1aa;
            --text-tertiary: #52525b;

            --border: #27272a;
            --border-hover: #3f3f46;

            --accent: #818cf8;
            --accent-hover: #6366f1;

            --success: #10b981;
            --warning: #f59e0b;
            --danger: #ef4444;

            --radius-sm: 6px;
            --radius-md: 10px;
            --radius-full: 9999px;

            --sidebar-width: 300px;
            --header-height: 72px;
        }

        * { margin: 0; padding: 0; box-sizing: border-box; }

        body {
            font-family: var(--font);
            background: var(--bg-primary);
            color: var(--text-primary);
            line-height: 1.5;
            height: 100vh;
            display: grid;
            grid-template-rows: var(--header-height) 1fr;
            grid-template-columns: var(--sidebar-width) 1fr;
            grid-template-areas: "header header" "sidebar map";
            -webkit-font-smoothing: antialiased;
        }

        /* ===== HEADER ===== */
        .header {
            grid-area: header;
            display: flex;
            align-items: center;
            justify-content: space-between;
            padding: 0 1.5rem;
            border-bottom: 1px solid var(--border);
            background: var(--bg-secondary);
        }

        .logo {
            font-weight: 600;
            font-size: 1.125rem;
            letter-spacing: -0.02em;
        }

        .stats {
            display: flex;
            gap: 2rem;
        }

        .stat {
            display: flex;
            flex-direction: column;
            align-items: flex-end;
        }

        .stat-value {
            font-size: 1.25rem;
            font-weight: 700;
            line-height: 1.1;
        }

        .stat-label {
            font-size: 0.6875rem;
            color: var(--text-tertiary);
            text-transform: uppercase;
            letter-spacing: 0.04em;
        }

        /* ===== SIDEBAR ===== */
        .sidebar {
            grid-area: sidebar;
            padding: 1.25rem;
            border-right: 1px solid var(--border);
            background: var(--bg-secondary);
            overflow-y: auto;
            display: flex;
            flex-direction: column;
            gap: 1.25rem;
        }

        .controls {
            display: flex;
            flex-direction: column;
            gap: 0.5rem;
        }

        .control-label {
            font-size: 0.8125rem;
            color: var(--text-secondary);
            display: flex;
            justify-content: space-between;
            margin-top: 0.5rem;
        }

        .control-select {
            padding: 0.5rem;
            border-radius: var(--radius-md);
            border: 1px solid var(--border);
            background: var(--bg-tertiary);
            color: var(--text-primary);
            font-family: var(--font);
        }

        input[type="range"] { width: 100%; accent-color: var(--accent); }

        .control-actions {
            display: flex;
            gap: 0.5rem;
            margin-top: 0.75rem;
        }

        .btn {
            flex: 1;
            padding: 0.5rem 1rem;
            border-radius: var(--radius-md);
            font-size: 0.8125rem;
            font-weight: 500;
            border: none;
            cursor: pointer;
            font-family: var(--font);
        }

        .btn-ghost {
            background: transparent;
            color: var(--text-secondary);
            border: 1px solid var(--border);
        }

        .btn-ghost:hover { background: var(--bg-hover); color: var(--text-primary); }

        .btn-primary { background: var(--accent); color: white; }

        .btn-primary:hover { background: var(--accent-hover); }

        .banner {
            padding: 0.625rem 0.875rem;
            border-radius: var(--radius-md);
            font-size: 0.8125rem;
            display: flex;
            align-items: center;
            gap: 0.5rem;
            margin-bottom: 0.5rem;
        }

        .banner-loading { background: var(--bg-tertiary); color: var(--text-secondary); }

        .banner-error {
            background: rgba(239, 68, 68, 0.12);
            color: var(--danger);
            border: 1px solid rgba(239, 68, 68, 0.4);
        }

        .status-dot {
            width: 8px;
            height: 8px;
            border-radius: 50%;
            background: var(--warning);
            animation: pulse 1.2s infinite;
        }

        @keyframes pulse {
            0%, 100% { opacity: 1; }
            50% { opacity: 0.3; }
        }

        .section-title {
            font-size: 0.75rem;
            font-weight: 600;
            color: var(--text-tertiary);
            text-transform: uppercase;
            letter-spacing: 0.05em;
            margin-bottom: 0.5rem;
        }

        .legend { list-style: none; font-size: 0.8125rem; }

        .legend-row {
            display: flex;
            align-items: center;
            gap: 0.5rem;
            padding: 0.125rem 0;
        }

        .legend-swatch {
            width: 12px;
            height: 12px;
            border-radius: 50%;
            border: 1px solid rgba(255,255,255,0.6);
        }

        .footer {
            margin-top: auto;
            font-size: 0.75rem;
            color: var(--text-tertiary);
        }

        .footer a { color: var(--text-secondary); }

        /* ===== MAP ===== */
        #map { grid-area: map; }

        .popup { font-family: var(--font); min-width: 180px; }
        .popup-mag { font-size: 1.125rem; font-weight: 700; }
        .popup-place { font-weight: 500; margin-bottom: 0.25rem; }
        .popup-row { color: #52525b; font-size: 0.8125rem; }
        .popup-link { display: inline-block; margin-top: 0.375rem; }

        @media (max-width: 768px) {
            body {
                grid-template-rows: auto auto 60vh;
                grid-template-columns: 1fr;
                grid-template-areas: "header" "sidebar" "map";
                height: auto;
            }
            .stats { gap: 1rem; }
        }
    </style>
</head>
<body>
    <header class="header">
        <div class="logo">🌍 quakemap</div>
        <div id="stats" class="stats"
             hx-get="/partials/header" hx-trigger="load, quakemap:refresh from:body">
        </div>
    </header>

    <aside class="sidebar">
        <div id="status" hx-get="/partials/status" hx-trigger="load, quakemap:refresh from:body"></div>

        <div hx-get="/partials/controls" hx-trigger="load" hx-swap="outerHTML"></div>

        <section>
            <h2 class="section-title">Magnitude</h2>
            <div hx-get="/partials/legend" hx-trigger="load" hx-swap="outerHTML"></div>
        </section>

        <footer class="footer">
            Data from <a href="https://earthquake.usgs.gov/" target="_blank">USGS Earthquake Hazards Program</a>
        </footer>
    </aside>

    <div id="map"></div>

    <script>
        const map = L.map('map', { minZoom: 2, worldCopyJump: true }).setView([20, 0], 2);

        const dark = L.tileLayer('https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}{r}.png', {
            attribution: '&copy; <a href="https://www.openstreetmap.org/copyright">OpenStreetMap</a> contributors &copy; <a href="https://carto.com/attributions">CARTO</a>',
            maxZoom: 19
        });
        const streets = L.tileLayer('https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png', {
            attribution: '&copy; <a href="https://www.openstreetmap.org/copyright">OpenStreetMap</a> contributors',
            maxZoom: 19
        });
        dark.addTo(map);
        L.control.layers({ 'Dark': dark, 'Streets': streets }).addTo(map);

        const clusters = L.markerClusterGroup({ chunkedLoading: true });
        map.addLayer(clusters);

        async function loadMarkers() {
            const resp = await fetch('/api/markers');
            if (!resp.ok) return;
            const markers = await resp.json();
            clusters.clearLayers();
            clusters.addLayers(markers.map(m =>
                L.circleMarker([m.latitude, m.longitude], {
                    radius: m.radius,
                    fillColor: m.color,
                    color: 'rgba(255,255,255,0.8)',
                    weight: 1,
                    opacity: 1,
                    fillOpacity: 0.85
                }).bindPopup(m.popup)
            ));
        }

        // Every store change re-renders the partials and the markers
        const stream = new EventSource('/stream');
        stream.addEventListener('refresh', () => {
            htmx.trigger(document.body, 'quakemap:refresh');
            loadMarkers();
        });

        loadMarkers();
    </script>
</body>
</html>
"##;
