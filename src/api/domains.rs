//! 域名与账号概览 API

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::domain::Domain;
use crate::error::{ApiError, ApiResult};
use crate::middleware::RequireApiKey;
use crate::state::AppState;

/// 域名条目（含派生的健康标记）
#[derive(Debug, Serialize)]
struct DomainEntry {
    #[serde(flatten)]
    domain: Domain,
    /// 已验证且有生效 DNS 配置
    healthy: bool,
}

/// 账号概览
#[derive(Debug, Serialize)]
struct AccountOverview {
    #[serde(skip_serializing_if = "Option::is_none")]
    team_id: Option<String>,
    total_projects: usize,
    total_domains: usize,
    snapshot_fetched_at: String,
}

/// 创建域名路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/domains", get(list_domains))
        .route("/api/account", get(account_overview))
}

/// 列出全部域名及健康状态
///
/// GET /api/domains
/// 需要 API Key 认证
async fn list_domains(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<DomainEntry>>> {
    let snapshot = state
        .resources
        .cell()
        .current()
        .await
        .ok_or_else(|| ApiError::service_unavailable("No data yet: first refresh has not completed"))?;

    let mut entries: Vec<DomainEntry> = snapshot
        .domains
        .values()
        .map(|domain| DomainEntry {
            healthy: domain.is_healthy(),
            domain: domain.clone(),
        })
        .collect();
    entries.sort_by(|a, b| a.domain.name.cmp(&b.domain.name));

    Ok(Json(entries))
}

/// 账号级概览（项目/域名总数）
///
/// GET /api/account
async fn account_overview(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<AccountOverview>> {
    let snapshot = state
        .resources
        .cell()
        .current()
        .await
        .ok_or_else(|| ApiError::service_unavailable("No data yet: first refresh has not completed"))?;

    Ok(Json(AccountOverview {
        team_id: state.config.team_id.clone(),
        total_projects: snapshot.projects.len(),
        total_domains: snapshot.domains.len(),
        snapshot_fetched_at: snapshot.fetched_at.to_rfc3339(),
    }))
}
