//! 健康检查与刷新触发 API
//!
//! 包含 /health, /api/refresh 端点

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::config::env::constants::VERSION;
use crate::error::ApiResult;
use crate::middleware::RequireApiKey;
use crate::state::coordinator::{CoordinatorCell, CoordinatorStatus};
use crate::state::AppState;

/// 单个协调器的状态摘要
///
/// status 三态区分："还没有数据" / "数据过期" / "需要重新认证"
#[derive(Debug, Serialize)]
struct CoordinatorSummary {
    status: CoordinatorStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_updated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_error: Option<String>,
}

impl CoordinatorSummary {
    async fn from_cell<T>(cell: &CoordinatorCell<T>) -> Self {
        Self {
            status: cell.status().await,
            last_updated: cell.last_updated().await.map(|t| t.to_rfc3339()),
            last_error: cell.last_error().await.map(|e| e.to_string()),
        }
    }
}

/// 健康检查响应
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp: String,
    uptime_secs: i64,
    needs_reauth: bool,
    resources: CoordinatorSummary,
    deployments: CoordinatorSummary,
}

/// 刷新响应
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub projects: usize,
    pub domains: usize,
    pub deployment_windows: usize,
}

/// 创建健康检查路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(health_check))
        .route("/api/refresh", post(force_refresh))
}

/// 健康检查 - 返回状态、版本、两个协调器的状态摘要
///
/// GET /health, GET /status
/// 无需认证
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resources = CoordinatorSummary::from_cell(&state.resources.cell()).await;
    let deployments = CoordinatorSummary::from_cell(&state.deployments.cell()).await;

    let service_status = if state.needs_reauth().await {
        "needs_reauth"
    } else {
        "ok"
    };

    Json(HealthResponse {
        status: service_status,
        service: "xjp-vercel-monitor",
        version: VERSION,
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime_secs: (chrono::Utc::now() - state.started_at).num_seconds(),
        needs_reauth: state.needs_reauth().await,
        resources,
        deployments,
    })
}

/// 显式触发一轮完整刷新（阻塞到两轮都结束）
///
/// POST /api/refresh
/// 需要 API Key 认证
async fn force_refresh(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<RefreshResponse>> {
    let resources = state.resources.refresh().await?;
    let deployments = state.deployments.refresh().await?;

    Ok(Json(RefreshResponse {
        projects: resources.projects.len(),
        domains: resources.domains.len(),
        deployment_windows: deployments.deployments.len(),
    }))
}
