//! 资源协调器
//!
//! 维护项目/域名/环境变量的资源快照：
//! - 默认每 900 秒刷新一次，也可显式触发（启动、换凭证后）
//! - 项目列表和域名列表是主请求，失败则整轮中止、保留旧快照
//! - 每个域名的 config、每个项目的 env 是尽力而为的子请求，
//!   瞬态失败只降级对应条目，不让一个抖动的子资源拖垮整个快照

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::env::constants::REFRESH_DEADLINE_SECS;
use crate::domain::ResourceSnapshot;
use crate::infra::{ApiTransport, GatewayError, VercelClient};
use crate::state::coordinator::CoordinatorCell;

/// 资源协调器
pub struct ResourceCoordinator<T: ApiTransport> {
    client: Arc<VercelClient<T>>,
    cell: Arc<CoordinatorCell<ResourceSnapshot>>,
    interval: Duration,
}

impl<T: ApiTransport> ResourceCoordinator<T> {
    pub fn new(client: Arc<VercelClient<T>>, interval: Duration) -> Self {
        Self {
            client,
            cell: Arc::new(CoordinatorCell::new()),
            interval,
        }
    }

    /// 状态单元（部署协调器和 API 层以只读方式共享）
    pub fn cell(&self) -> Arc<CoordinatorCell<ResourceSnapshot>> {
        self.cell.clone()
    }

    /// 显式触发一轮刷新，排队等待正在进行的刷新结束
    pub async fn refresh(&self) -> Result<Arc<ResourceSnapshot>, GatewayError> {
        let _guard = self.cell.acquire_refresh().await;
        self.refresh_locked().await
    }

    /// 定时刷新循环
    ///
    /// tick 撞上仍在进行的上一轮时合并为 no-op；
    /// 认证失效期间跳过所有 tick，等换新凭证后恢复
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Starting resource coordinator"
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // 第一个 tick 立即完成；启动流程已经做过一次阻塞刷新
        interval.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Resource coordinator stopped");
                    return;
                }
                _ = interval.tick() => {}
            }

            if self.cell.needs_reauth().await {
                debug!("Skipping resource refresh: waiting for re-authentication");
                continue;
            }

            match self.cell.try_acquire_refresh() {
                Some(_guard) => {
                    let _ = self.refresh_locked().await;
                }
                None => {
                    debug!("Previous resource refresh still running, coalescing tick");
                }
            }
        }
    }

    /// 执行一轮刷新（调用方必须已持有刷新门）
    async fn refresh_locked(&self) -> Result<Arc<ResourceSnapshot>, GatewayError> {
        let deadline = Duration::from_secs(REFRESH_DEADLINE_SECS);
        let result = tokio::time::timeout(deadline, self.fetch_snapshot()).await;

        match result {
            Ok(Ok(snapshot)) => {
                info!(
                    projects = snapshot.projects.len(),
                    domains = snapshot.domains.len(),
                    "Resource snapshot refreshed"
                );
                Ok(self.cell.publish(snapshot).await)
            }
            Ok(Err(error)) => {
                warn!(error = %error, "Resource refresh failed, keeping previous snapshot");
                self.cell.record_error(error.clone()).await;
                Err(error)
            }
            Err(_) => {
                let error = GatewayError::Transient(format!(
                    "Refresh exceeded {}s deadline",
                    REFRESH_DEADLINE_SECS
                ));
                warn!(error = %error, "Resource refresh timed out");
                self.cell.record_error(error.clone()).await;
                Err(error)
            }
        }
    }

    /// 抓取一轮完整快照
    ///
    /// 主请求在前、依赖它们的子请求在后（严格数据依赖）
    async fn fetch_snapshot(&self) -> Result<ResourceSnapshot, GatewayError> {
        let raw_projects = self.client.get_projects().await?;
        let raw_domains = self.client.get_domains().await?;

        let mut projects = HashMap::with_capacity(raw_projects.len());
        for project in raw_projects {
            projects.insert(project.id.clone(), project);
        }

        let mut domains = HashMap::with_capacity(raw_domains.len());
        for raw in raw_domains {
            let config = match self.client.get_domain_config(&raw.name).await {
                Ok(config) => Some(config),
                // 认证失败不降级：整轮中止并停摆
                Err(GatewayError::Auth) => return Err(GatewayError::Auth),
                Err(error) => {
                    warn!(
                        domain = %raw.name,
                        error = %error,
                        "Domain config fetch failed, recording as unknown"
                    );
                    None
                }
            };
            domains.insert(raw.name.clone(), raw.with_config(config));
        }

        let mut env_vars = HashMap::with_capacity(projects.len());
        for project_id in projects.keys() {
            let envs = match self.client.get_project_env_vars(project_id).await {
                Ok(envs) => envs,
                Err(GatewayError::Auth) => return Err(GatewayError::Auth),
                Err(error) => {
                    warn!(
                        project_id = %project_id,
                        error = %error,
                        "Env var fetch failed, recording empty list"
                    );
                    Vec::new()
                }
            };
            env_vars.insert(project_id.clone(), envs);
        }

        Ok(ResourceSnapshot {
            projects,
            domains,
            env_vars,
            fetched_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::transport::testing::ScriptedTransport;
    use crate::state::coordinator::CoordinatorStatus;
    use serde_json::{json, Value};

    fn coordinator(transport: ScriptedTransport) -> ResourceCoordinator<ScriptedTransport> {
        ResourceCoordinator::new(
            Arc::new(VercelClient::new(transport)),
            Duration::from_secs(900),
        )
    }

    fn one_project_page() -> Value {
        json!({"projects": [{"id": "prj_1", "name": "site", "framework": "nextjs", "nodeVersion": "20.x"}]})
    }

    fn domains_page(names: &[&str]) -> Value {
        let domains: Vec<Value> = names
            .iter()
            .map(|n| json!({"name": n, "verified": true}))
            .collect();
        json!({"domains": domains})
    }

    #[tokio::test]
    async fn test_successful_refresh_publishes_full_snapshot() {
        let transport = ScriptedTransport::new();
        transport.push("/v10/projects?limit=100", Ok(one_project_page()));
        transport.push("/v5/domains?limit=100", Ok(domains_page(&["a.com"])));
        transport.push(
            "/v6/domains/a.com/config",
            Ok(json!({"misconfigured": false, "configuredBy": "CNAME"})),
        );
        transport.push(
            "/v9/projects/prj_1/env",
            Ok(json!({"envs": [{"key": "K", "type": "encrypted", "target": ["production"]}]})),
        );

        let coordinator = coordinator(transport);
        let snapshot = coordinator.refresh().await.unwrap();

        assert_eq!(snapshot.projects.len(), 1);
        assert_eq!(snapshot.domains.len(), 1);
        assert_eq!(snapshot.env_vars["prj_1"].len(), 1);
        assert_eq!(snapshot.domains["a.com"].misconfigured, Some(false));
        assert_eq!(coordinator.cell().status().await, CoordinatorStatus::Ok);
    }

    #[tokio::test]
    async fn test_domain_config_failure_degrades_single_entry() {
        let transport = ScriptedTransport::new();
        transport.push("/v10/projects?limit=100", Ok(json!({"projects": []})));
        transport.push(
            "/v5/domains?limit=100",
            Ok(domains_page(&["a.com", "b.com", "c.com"])),
        );
        transport.push(
            "/v6/domains/a.com/config",
            Ok(json!({"misconfigured": false, "configuredBy": "CNAME"})),
        );
        transport.push(
            "/v6/domains/b.com/config",
            Err(GatewayError::Transient("flaky".to_string())),
        );
        transport.push(
            "/v6/domains/c.com/config",
            Ok(json!({"misconfigured": true, "configuredBy": "A"})),
        );

        let coordinator = coordinator(transport);
        let snapshot = coordinator.refresh().await.unwrap();

        // 三个域名全部入快照，失败的那个健康状态未知
        assert_eq!(snapshot.domains.len(), 3);
        assert_eq!(snapshot.domains["a.com"].misconfigured, Some(false));
        assert_eq!(snapshot.domains["b.com"].misconfigured, None);
        assert_eq!(snapshot.domains["b.com"].configured_by, None);
        assert_eq!(snapshot.domains["c.com"].misconfigured, Some(true));
        // 整轮仍按成功上报
        assert_eq!(coordinator.cell().status().await, CoordinatorStatus::Ok);
    }

    #[tokio::test]
    async fn test_env_fetch_failure_degrades_to_empty_list() {
        let transport = ScriptedTransport::new();
        transport.push("/v10/projects?limit=100", Ok(one_project_page()));
        transport.push("/v5/domains?limit=100", Ok(json!({"domains": []})));
        transport.push(
            "/v9/projects/prj_1/env",
            Err(GatewayError::Transient("timeout".to_string())),
        );

        let coordinator = coordinator(transport);
        let snapshot = coordinator.refresh().await.unwrap();

        assert!(snapshot.env_vars["prj_1"].is_empty());
        assert_eq!(coordinator.cell().status().await, CoordinatorStatus::Ok);
    }

    #[tokio::test]
    async fn test_primary_fetch_failure_keeps_previous_snapshot() {
        let transport = ScriptedTransport::new();
        // 第一轮成功
        transport.push("/v10/projects?limit=100", Ok(one_project_page()));
        transport.push("/v5/domains?limit=100", Ok(json!({"domains": []})));
        transport.push("/v9/projects/prj_1/env", Ok(json!({"envs": []})));
        // 第二轮项目列表直接失败
        transport.push(
            "/v10/projects?limit=100",
            Err(GatewayError::Transient("connection reset".to_string())),
        );

        let coordinator = coordinator(transport);
        let first = coordinator.refresh().await.unwrap();

        let err = coordinator.refresh().await.unwrap_err();
        assert!(matches!(err, GatewayError::Transient(_)));

        // 旧快照原样保留，状态转 Stale
        let current = coordinator.cell().current().await.unwrap();
        assert_eq!(current.fetched_at, first.fetched_at);
        assert_eq!(current.projects.len(), 1);
        assert_eq!(coordinator.cell().status().await, CoordinatorStatus::Stale);
    }

    #[tokio::test]
    async fn test_auth_failure_in_subfetch_aborts_pass() {
        let transport = ScriptedTransport::new();
        transport.push("/v10/projects?limit=100", Ok(one_project_page()));
        transport.push("/v5/domains?limit=100", Ok(json!({"domains": []})));
        transport.push("/v9/projects/prj_1/env", Err(GatewayError::Auth));

        let coordinator = coordinator(transport);
        let err = coordinator.refresh().await.unwrap_err();

        assert_eq!(err, GatewayError::Auth);
        assert!(coordinator.cell().needs_reauth().await);
        assert_eq!(
            coordinator.cell().status().await,
            CoordinatorStatus::NeedsReauth
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_deadline_aborts_and_keeps_previous_snapshot() {
        use crate::infra::transport::testing::StalledTransport;

        let coordinator = ResourceCoordinator::new(
            Arc::new(VercelClient::new(StalledTransport)),
            Duration::from_secs(900),
        );
        // 先手工放入一份旧快照
        let seeded = coordinator
            .cell()
            .publish(ResourceSnapshot {
                fetched_at: Utc::now(),
                ..Default::default()
            })
            .await;

        // 上游挂死，整轮在总时限处中止
        let err = coordinator.refresh().await.unwrap_err();
        assert!(matches!(err, GatewayError::Transient(_)));

        // 旧快照原样保留，状态转 Stale
        let current = coordinator.cell().current().await.unwrap();
        assert_eq!(current.fetched_at, seeded.fetched_at);
        assert_eq!(coordinator.cell().status().await, CoordinatorStatus::Stale);
    }

    #[tokio::test]
    async fn test_reauth_then_refresh_resumes() {
        let transport = ScriptedTransport::new();
        transport.push("/v10/projects?limit=100", Err(GatewayError::Auth));
        // 换凭证后的第二轮
        transport.push("/v10/projects?limit=100", Ok(json!({"projects": []})));
        transport.push("/v5/domains?limit=100", Ok(json!({"domains": []})));

        let coordinator = coordinator(transport);
        coordinator.refresh().await.unwrap_err();
        assert!(coordinator.cell().needs_reauth().await);

        // 模拟消费层补供新凭证
        coordinator.cell().clear_auth_halt().await;
        coordinator.refresh().await.unwrap();
        assert_eq!(coordinator.cell().status().await, CoordinatorStatus::Ok);
    }
}
