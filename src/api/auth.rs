//! 凭证管理 API
//!
//! 凭证失效后协调器停摆，由消费层通过这里补供新 Token；
//! 校验通过即恢复正常调度，无需重启进程

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::env::constants::VERCEL_API_BASE;
use crate::error::{ApiError, ApiResult};
use crate::infra::{GatewayError, HttpTransport, TokenStore, VercelClient};
use crate::middleware::RequireApiKey;
use crate::state::AppState;

/// 换 Token 请求
#[derive(Debug, Deserialize)]
pub struct InstallTokenRequest {
    pub token: String,
}

/// 换 Token 响应
#[derive(Debug, Serialize)]
pub struct InstallTokenResponse {
    /// 新凭证对应的用户名（校验时顺带返回）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// 该凭证可访问的团队（便于消费端重新配置 team_id）
    pub teams: Vec<TeamEntry>,
}

#[derive(Debug, Serialize)]
pub struct TeamEntry {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

/// 认证状态响应
#[derive(Debug, Serialize)]
struct AuthStatusResponse {
    needs_reauth: bool,
}

/// 创建凭证管理路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/token", post(install_token))
        .route("/api/auth/status", get(auth_status))
}

/// 校验并安装新的 Vercel Token
///
/// POST /api/auth/token
/// 需要 API Key 认证
///
/// 先用独立客户端探测新凭证，确认有效后才替换——
/// 无效的候选凭证不会破坏当前配置
async fn install_token(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Json(request): Json<InstallTokenRequest>,
) -> ApiResult<Json<InstallTokenResponse>> {
    let token = request.token.trim().to_string();
    if token.is_empty() {
        return Err(ApiError::bad_request("Token must not be empty"));
    }

    let probe = VercelClient::new(HttpTransport::new(
        VERCEL_API_BASE.to_string(),
        TokenStore::new(token.clone()),
        state.config.team_id.clone(),
    ));

    let user = match probe.get_user().await {
        Ok(user) => user,
        Err(GatewayError::Auth) => {
            return Err(ApiError::bad_request("Vercel rejected the credential"));
        }
        Err(error) => return Err(error.into()),
    };

    // 团队列表拿不到也不影响换凭证
    let teams = probe.get_teams().await.unwrap_or_default();

    state.install_token(token).await;

    // 换完凭证立刻补一轮刷新，消费端不用等下一个 tick
    let resources = state.resources.clone();
    let deployments = state.deployments.clone();
    tokio::spawn(async move {
        if resources.refresh().await.is_ok() {
            let _ = deployments.refresh().await;
        }
    });

    Ok(Json(InstallTokenResponse {
        username: user.username,
        teams: teams
            .into_iter()
            .map(|t| TeamEntry {
                id: t.id,
                name: t.name,
                slug: t.slug,
            })
            .collect(),
    }))
}

/// 是否需要重新认证
///
/// GET /api/auth/status
async fn auth_status(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<AuthStatusResponse>> {
    Ok(Json(AuthStatusResponse {
        needs_reauth: state.needs_reauth().await,
    }))
}
