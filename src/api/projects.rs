//! 项目相关 API
//!
//! 只读消费协调器快照；两份快照可能来自不同轮次，这是文档化的陈旧偏差

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::domain::{
    DeploySource, DeployState, Deployment, DeploymentSnapshot, EnvVarSummary, Project,
    ResourceSnapshot,
};
use crate::error::{ApiError, ApiResult};
use crate::middleware::RequireApiKey;
use crate::services::best_practices::AuditResult;
use crate::state::AppState;

/// 最新一次部署的摘要
#[derive(Debug, Serialize)]
struct DeploymentDigest {
    uid: String,
    state: DeployState,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<DeploySource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    build_duration_secs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    commit_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inspector_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

impl DeploymentDigest {
    fn from_latest(window: &[Deployment]) -> Option<Self> {
        let latest = window.first()?;
        Some(Self {
            uid: latest.uid.clone(),
            state: latest.state,
            source: latest.source,
            build_duration_secs: latest.build_duration_secs(),
            commit_message: latest.commit_message.clone(),
            inspector_url: latest.inspector_url.clone(),
            url: latest.url.clone(),
        })
    }
}

/// 项目列表条目
#[derive(Debug, Serialize)]
struct ProjectSummary {
    id: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    framework: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    node_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
    /// 窗口内的部署条数
    deployment_count: usize,
    /// 窗口内的失败条数
    failed_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    latest_deployment: Option<DeploymentDigest>,
    best_practices_score: u8,
}

/// 项目详情
#[derive(Debug, Serialize)]
struct ProjectDetail {
    #[serde(flatten)]
    project: Project,
    env_vars: Vec<EnvVarSummary>,
    deployments: Vec<Deployment>,
    audit: AuditResult,
}

/// 某项目的部署窗口
#[derive(Debug, Serialize)]
struct ProjectDeployments {
    project_id: String,
    deployments: Vec<Deployment>,
    fetched_at: DateTime<Utc>,
}

/// 创建项目路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/projects", get(list_projects))
        .route("/api/projects/:id", get(project_detail))
        .route("/api/projects/:id/deployments", get(project_deployments))
        .route("/api/projects/:id/audit", get(project_audit))
}

/// 取资源快照；没有数据时按三态给出可区分的 503
async fn require_resources(state: &AppState) -> ApiResult<Arc<ResourceSnapshot>> {
    if let Some(snapshot) = state.resources.cell().current().await {
        return Ok(snapshot);
    }
    if state.needs_reauth().await {
        Err(ApiError::service_unavailable(
            "Vercel credential rejected, re-authentication required",
        ))
    } else {
        Err(ApiError::service_unavailable(
            "No data yet: first refresh has not completed",
        ))
    }
}

/// 部署快照可以为空（部署协调器可能还没跑过第一轮）
async fn deployment_snapshot(state: &AppState) -> Arc<DeploymentSnapshot> {
    state
        .deployments
        .cell()
        .current()
        .await
        .unwrap_or_else(|| Arc::new(DeploymentSnapshot::default()))
}

/// 列出全部项目及其最新部署摘要
///
/// GET /api/projects
/// 需要 API Key 认证
async fn list_projects(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<ProjectSummary>>> {
    let resources = require_resources(&state).await?;
    let deployments = deployment_snapshot(&state).await;

    let mut summaries: Vec<ProjectSummary> = Vec::with_capacity(resources.projects.len());
    for project in resources.projects.values() {
        let window = deployments.for_project(&project.id);
        let env_vars = resources
            .env_vars
            .get(&project.id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let audit = crate::services::audit_project(project, window, env_vars);

        summaries.push(ProjectSummary {
            id: project.id.clone(),
            name: project.name.clone(),
            framework: project.framework.clone(),
            node_version: project.node_version.clone(),
            updated_at: project.updated_at,
            deployment_count: window.len(),
            failed_count: window
                .iter()
                .filter(|d| d.state == DeployState::Error)
                .count(),
            latest_deployment: DeploymentDigest::from_latest(window),
            best_practices_score: audit.score,
        });
    }

    // 稳定输出顺序，便于消费端展示
    summaries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Json(summaries))
}

/// 项目详情（含环境变量摘要、部署窗口与审计结果）
///
/// GET /api/projects/:id
async fn project_detail(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<ProjectDetail>> {
    let resources = require_resources(&state).await?;
    let project = resources
        .projects
        .get(&project_id)
        .ok_or_else(|| ApiError::not_found(format!("Project {}", project_id)))?;

    let deployments = deployment_snapshot(&state).await;
    let window = deployments.for_project(&project_id);
    let env_vars = resources.env_vars.get(&project_id).cloned().unwrap_or_default();
    let audit = crate::services::audit_project(project, window, &env_vars);

    Ok(Json(ProjectDetail {
        project: project.clone(),
        env_vars,
        deployments: window.to_vec(),
        audit,
    }))
}

/// 某项目缓存的部署窗口
///
/// GET /api/projects/:id/deployments
async fn project_deployments(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<ProjectDeployments>> {
    let resources = require_resources(&state).await?;
    if !resources.projects.contains_key(&project_id) {
        return Err(ApiError::not_found(format!("Project {}", project_id)));
    }

    let deployments = deployment_snapshot(&state).await;
    Ok(Json(ProjectDeployments {
        deployments: deployments.for_project(&project_id).to_vec(),
        fetched_at: deployments.fetched_at,
        project_id,
    }))
}

/// 按需审计一个项目
///
/// GET /api/projects/:id/audit
async fn project_audit(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<AuditResult>> {
    // 先确认有数据可查，给出可区分的 503/404
    require_resources(&state).await?;
    match state.audit(&project_id).await {
        Some(result) => Ok(Json(result)),
        None => Err(ApiError::not_found(format!("Project {}", project_id))),
    }
}
