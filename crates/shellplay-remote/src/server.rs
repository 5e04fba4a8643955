//! HTTP transport for the control service

use crate::service::{AckResponse, ControlService, Navigation, PlaybackCommand};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use shellplay_core::surface::WindowBounds;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Geometry of the render window reported by `/status`
    pub window: WindowBounds,
    pub highlight_duration: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 9876,
            window: WindowBounds::default(),
            highlight_duration: Duration::from_millis(500),
        }
    }
}

impl RemoteConfig {
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

pub fn router(service: Arc<ControlService>) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/elements", get(elements))
        .route("/element/{id}", get(element))
        .route("/focused-element", get(focused_element))
        .route("/navigate/{screen_id}", post(navigate))
        .route("/reset", post(reset))
        .route("/highlight/{id}", post(highlight))
        .route("/focus/{id}", post(focus))
        .route("/focus-window", post(focus_window))
        .route("/playback", get(playback))
        .route("/playback/{command}", post(playback_command))
        .fallback(not_found)
        .with_state(service)
}

/// Serve on an already bound listener until the future is dropped
pub async fn serve(listener: TcpListener, service: Arc<ControlService>) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "remote control listening");
    }
    axum::serve(listener, router(service)).await
}

pub async fn bind(config: &RemoteConfig) -> std::io::Result<TcpListener> {
    TcpListener::bind(config.addr()).await
}

type Service = State<Arc<ControlService>>;

async fn status(State(service): Service) -> impl IntoResponse {
    Json(service.status().await)
}

async fn elements(State(service): Service) -> impl IntoResponse {
    Json(service.elements().await)
}

async fn element(State(service): Service, Path(id): Path<String>) -> Response {
    match service.element(&id).await {
        Some(geometry) => Json(geometry).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("element not found: {}", id) })),
        )
            .into_response(),
    }
}

async fn focused_element(State(service): Service) -> impl IntoResponse {
    Json(service.focused().await)
}

async fn navigate(State(service): Service, Path(screen_id): Path<String>) -> Response {
    match service.navigate(&screen_id).await {
        Navigation::Done(body) => Json(body).into_response(),
        Navigation::UnknownScreen(body) => (StatusCode::NOT_FOUND, Json(body)).into_response(),
    }
}

async fn reset(State(service): Service) -> impl IntoResponse {
    Json(service.reset().await)
}

async fn highlight(State(service): Service, Path(id): Path<String>) -> impl IntoResponse {
    Json(service.highlight(&id).await)
}

async fn focus(State(service): Service, Path(id): Path<String>) -> impl IntoResponse {
    Json(service.focus(&id).await)
}

async fn focus_window(State(service): Service) -> impl IntoResponse {
    Json(service.focus_window().await)
}

async fn playback(State(service): Service) -> impl IntoResponse {
    Json(service.playback())
}

async fn playback_command(State(service): Service, Path(command): Path<String>) -> Response {
    match command.parse::<PlaybackCommand>() {
        Ok(command) => Json(service.playback_command(command)).into_response(),
        Err(e) => (StatusCode::NOT_FOUND, Json(AckResponse::failed(e))).into_response(),
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" })))
}
