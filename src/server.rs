use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::query::{Dashboard, QueryParams};

#[derive(Clone)]
pub struct AppState {
    dashboard: Arc<Dashboard>,
}

pub fn build_router(dashboard: Arc<Dashboard>) -> Router {
    let mut router: Router<AppState> = Router::new().route("/healthz", get(healthz_handler));
    for view in dashboard.views() {
        let name = view.config.name.clone();
        router = router.route(
            &view.config.route,
            get(
                move |State(state): State<AppState>,
                      params: Option<Query<HashMap<String, String>>>| {
                    let name = name.clone();
                    async move {
                        let params = params.map(|Query(p)| p).unwrap_or_default();
                        view_handler(&state, &name, &params)
                    }
                },
            ),
        );
    }
    router
        .fallback(not_found_handler)
        .with_state(AppState { dashboard })
}

async fn healthz_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "registros": state.dashboard.store().len(),
    }))
}

async fn not_found_handler() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))).into_response()
}

/// Malformed parameters degrade to defaults, so this never answers 4xx.
fn view_handler(state: &AppState, name: &str, params: &HashMap<String, String>) -> Response {
    let Some(view) = state.dashboard.view(name) else {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))).into_response();
    };
    let started = Instant::now();
    let query = QueryParams::from_query(params);
    let response = state.dashboard.respond(view, &query);
    info!(
        view = name,
        page = query.page,
        matched = response.kpis.total_oportunidades,
        elapsed_us = started.elapsed().as_micros() as u64,
        "dashboard query served"
    );
    Json(response).into_response()
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

pub async fn serve(dashboard: Arc<Dashboard>, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    if dashboard.store().is_empty() {
        warn!("dataset is empty; every view will report zero counts");
    }
    for view in dashboard.views() {
        info!(view = %view.config.name, route = %view.config.route, "view mounted");
    }
    info!("enrollment-dashboard listening on {addr}");
    axum::serve(listener, build_router(dashboard))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")
}
