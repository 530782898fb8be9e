use crate::config::AppConfig;
use crate::data::{CsvFile, DataSource};
use crate::error::ChartError;
use crate::render::render_chart;
use crate::types::Viewport;
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{info, warn};

pub struct AppState<S> {
    pub config: AppConfig,
    pub source: S,
}

/// Chart failure mapped onto an HTTP status the page can react to.
pub struct ApiError(ChartError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_data_unavailable() {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::BAD_REQUEST
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub async fn start_server(config: AppConfig) -> Result<()> {
    let port = config.server.port;
    let source = CsvFile::new(&config.input.data_csv);
    let app = build_router(Arc::new(AppState { config, source }));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router<S: DataSource>(state: Arc<AppState<S>>) -> Router {
    let data_dir = state
        .config
        .input
        .data_csv
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();

    Router::new()
        .route("/", get(page_handler))
        .route("/api/chart", get(chart_handler::<S>))
        .nest_service("/assets/data", ServeDir::new(data_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn page_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Loads the data afresh and renders one chart for the requested viewport.
async fn chart_handler<S: DataSource>(
    State(state): State<Arc<AppState<S>>>,
    Query(viewport): Query<Viewport>,
) -> Result<Response, ApiError> {
    let rows = state.source.load().await.map_err(|e| {
        warn!("Data unavailable: {}", e);
        ApiError(e)
    })?;
    let surface = render_chart(viewport, &rows, &state.config.chart).map_err(|e| {
        warn!("Cannot render {}: {}", viewport, e);
        ApiError(e)
    })?;

    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], surface.to_svg()).into_response())
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Census Scatter</title>
<style>
  body { margin: 0; font-family: sans-serif; overflow: hidden; }
  .stateText { font-size: 12px; font-weight: bold; fill: #222; cursor: pointer; }
  .axisText { font-size: 14px; }
  .chart-message { padding: 2em; color: #a00; }
  .d3-tip {
    position: absolute; display: none; pointer-events: none;
    padding: 8px 12px; background: rgba(0, 0, 0, 0.8); color: #fff;
    border-radius: 4px; font-size: 12px; line-height: 1.3;
  }
  .d3-tip hr { margin: 4px 0; border-color: #666; }
</style>
</head>
<body>
<div id="scatter"></div>
<div class="d3-tip" id="tooltip"></div>
<script>
let generation = 0;

function showMessage(container, text) {
  container.innerHTML = "";
  const p = document.createElement("p");
  p.className = "chart-message";
  p.textContent = text;
  container.appendChild(p);
}

function bindTooltips(container) {
  const svg = container.querySelector("svg");
  const tip = document.getElementById("tooltip");
  const [offTop, offLeft] = (svg.dataset.tooltipOffset || "0,0").split(",").map(Number);
  svg.querySelectorAll("text.stateText").forEach(label => {
    label.addEventListener("click", () => {
      tip.innerHTML = label.dataset.tooltip;
      tip.style.display = "block";
      const box = label.getBoundingClientRect();
      tip.style.top = (box.top + window.scrollY - tip.offsetHeight + offTop) + "px";
      tip.style.left = (box.left + box.width / 2 - tip.offsetWidth / 2 + window.scrollX + offLeft) + "px";
    });
    label.addEventListener("mouseout", () => { tip.style.display = "none"; });
  });
}

async function responsiveChart() {
  const mine = ++generation;
  const container = document.getElementById("scatter");
  const url = `/api/chart?width=${window.innerWidth}&height=${window.innerHeight}`;
  try {
    const resp = await fetch(url);
    if (mine !== generation) return;
    if (!resp.ok) {
      const body = await resp.json().catch(() => ({ error: resp.statusText }));
      if (mine !== generation) return;
      const prefix = resp.status === 400 ? "Window too small: " : "Data unavailable: ";
      showMessage(container, prefix + body.error);
      return;
    }
    const svg = await resp.text();
    if (mine !== generation) return;
    container.innerHTML = svg;
    bindTooltips(container);
  } catch (err) {
    if (mine === generation) showMessage(container, "Data unavailable: " + err.message);
  }
}

responsiveChart();
window.addEventListener("resize", responsiveChart);
</script>
</body>
</html>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChartConfig, InputConfig, OutputConfig, ServerConfig};
    use axum::body::Body;
    use axum::http::Request;
    use std::path::PathBuf;
    use tower::ServiceExt;

    const CSV: &str = "state,abbr,poverty,povertyMoe,age,ageMoe,income,incomeMoe,healthcare,healthcareLow,healthcareHigh,obesity,obesityLow,obesityHigh,smokes,smokesLow,smokesHigh
A,AA,10,0.5,38,0.2,40000,598,50,12.7,15.1,20,32.1,35,21.1,19.4,22.8
B,BB,20,0.9,33,0.3,60000,1784,60,13.3,16.7,30,27.8,31.6,19.9,18.2,21.6
";

    fn config_for(data_csv: PathBuf) -> AppConfig {
        AppConfig {
            input: InputConfig { data_csv },
            chart: ChartConfig::default(),
            output: OutputConfig::default(),
            server: ServerConfig::default(),
        }
    }

    fn app_with_data(dir: &tempfile::TempDir) -> Router {
        let path = dir.path().join("data.csv");
        std::fs::write(&path, CSV).unwrap();
        let config = config_for(path.clone());
        build_router(Arc::new(AppState {
            config,
            source: CsvFile::new(path),
        }))
    }

    async fn body_text(response: Response) -> String {
        let body = axum::body::to_bytes(response.into_body(), 1_000_000)
            .await
            .unwrap();
        String::from_utf8_lossy(&body).into_owned()
    }

    fn request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn page_has_chart_container() {
        let dir = tempfile::tempdir().unwrap();
        let response = app_with_data(&dir).oneshot(request("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response).await;
        assert!(text.contains("id=\"scatter\""));
        assert!(text.contains("addEventListener(\"resize\""));
    }

    #[tokio::test]
    async fn chart_endpoint_returns_svg_for_viewport() {
        let dir = tempfile::tempdir().unwrap();
        let response = app_with_data(&dir)
            .oneshot(request("/api/chart?width=1000&height=700"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/svg+xml"
        );
        let svg = body_text(response).await;
        assert!(svg.contains("width=\"1000\""));
        assert_eq!(svg.matches("<circle").count(), 2);
        assert_eq!(svg.matches("class=\"stateText\"").count(), 2);
    }

    #[tokio::test]
    async fn missing_data_is_service_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.csv");
        let app = build_router(Arc::new(AppState {
            config: config_for(path.clone()),
            source: CsvFile::new(path),
        }));
        let response = app
            .oneshot(request("/api/chart?width=1000&height=700"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert!(body["error"].as_str().unwrap().contains("failed to read data file"));
    }

    #[tokio::test]
    async fn tiny_viewport_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let response = app_with_data(&dir)
            .oneshot(request("/api/chart?width=100&height=100"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert!(body["error"].as_str().unwrap().contains("smaller than the chart margins"));
    }

    #[tokio::test]
    async fn page_tells_small_window_apart_from_missing_data() {
        let dir = tempfile::tempdir().unwrap();
        let text = body_text(app_with_data(&dir).oneshot(request("/")).await.unwrap()).await;
        assert!(text.contains("resp.status === 400 ? \"Window too small: \""));
        assert!(text.contains("- tip.offsetWidth / 2"));
    }

    #[tokio::test]
    async fn data_file_is_served() {
        let dir = tempfile::tempdir().unwrap();
        let response = app_with_data(&dir)
            .oneshot(request("/assets/data/data.csv"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.starts_with("state,abbr"));
    }
}
