//! 应用状态

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::env::constants::VERCEL_API_BASE;
use crate::config::EnvConfig;
use crate::infra::{HttpTransport, TokenStore, VercelClient};
use crate::services::best_practices::{audit_project, AuditResult};
use crate::services::{DeploymentCoordinator, ResourceCoordinator};

/// 应用状态
///
/// 协调器的调度状态（单飞门、最后快照、最后错误）都挂在实例上，
/// 没有模块级全局——同一进程监控多个账号时各自独立
pub struct AppState {
    /// 本服务的 API 密钥（用于验证请求）
    pub api_key: String,
    /// 环境配置
    pub config: EnvConfig,
    /// 服务启动时间
    pub started_at: DateTime<Utc>,
    /// Vercel 凭证（运行时可换新）
    pub token: TokenStore,
    /// Vercel API 客户端
    pub client: Arc<VercelClient<HttpTransport>>,
    /// 资源协调器（项目/域名/环境变量）
    pub resources: Arc<ResourceCoordinator<HttpTransport>>,
    /// 部署协调器
    pub deployments: Arc<DeploymentCoordinator<HttpTransport>>,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(config: EnvConfig) -> Self {
        tracing::info!(
            api_key_len = config.api_key.len(),
            team_id = ?config.team_id,
            port = config.port,
            project_scan_secs = config.project_scan_interval.as_secs(),
            deployment_scan_secs = config.deployment_scan_interval.as_secs(),
            deployment_window = config.deployment_window,
            "Loaded configuration"
        );

        let token = TokenStore::new(config.vercel_token.clone());
        let transport = HttpTransport::new(
            VERCEL_API_BASE.to_string(),
            token.clone(),
            config.team_id.clone(),
        );
        let client = Arc::new(VercelClient::new(transport));

        let resources = Arc::new(ResourceCoordinator::new(
            client.clone(),
            config.project_scan_interval,
        ));
        let deployments = Arc::new(DeploymentCoordinator::new(
            client.clone(),
            resources.cell(),
            config.deployment_scan_interval,
            config.deployment_window,
        ));

        Self {
            api_key: config.api_key.clone(),
            started_at: Utc::now(),
            token,
            client,
            resources,
            deployments,
            config,
        }
    }

    /// 按需审计一个项目
    ///
    /// 基于两个协调器当前持有的快照计算；两份快照可能来自
    /// 不同轮次（可接受的陈旧偏差）。项目未知时返回 None
    pub async fn audit(&self, project_id: &str) -> Option<AuditResult> {
        let resources = self.resources.cell().current().await?;
        let project = resources.projects.get(project_id)?;

        let deployment_snapshot = self.deployments.cell().current().await;
        let deployments = deployment_snapshot
            .as_deref()
            .map(|s| s.for_project(project_id))
            .unwrap_or(&[]);

        let env_vars = resources
            .env_vars
            .get(project_id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        Some(audit_project(project, deployments, env_vars))
    }

    /// 是否有协调器处于认证停摆
    pub async fn needs_reauth(&self) -> bool {
        self.resources.cell().needs_reauth().await || self.deployments.cell().needs_reauth().await
    }

    /// 安装新凭证并解除两个协调器的认证停摆
    pub async fn install_token(&self, token: String) {
        self.token.set(token).await;
        self.resources.cell().clear_auth_halt().await;
        self.deployments.cell().clear_auth_halt().await;
        tracing::info!("New credential installed, coordinators resumed");
    }
}
