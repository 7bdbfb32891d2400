//! 部署协调器
//!
//! 维护每项目最近 N 条部署的快照，默认每 60 秒刷新，
//! 频率远高于资源协调器。
//!
//! 只读依赖资源协调器的状态单元（构造时传入引用）：
//! 读它的最新项目 ID 集合，从不触发它刷新。两者在时间上解耦——
//! 短暂枚举到已删除的项目、或晚一拍才看到新项目，是可接受的陈旧窗口。

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::env::constants::REFRESH_DEADLINE_SECS;
use crate::domain::{DeploymentSnapshot, ResourceSnapshot};
use crate::infra::{ApiTransport, GatewayError, VercelClient};
use crate::state::coordinator::CoordinatorCell;

/// 部署协调器
pub struct DeploymentCoordinator<T: ApiTransport> {
    client: Arc<VercelClient<T>>,
    cell: Arc<CoordinatorCell<DeploymentSnapshot>>,
    /// 资源协调器状态单元的只读引用
    resources: Arc<CoordinatorCell<ResourceSnapshot>>,
    interval: Duration,
    /// 每个项目缓存的部署条数
    window: usize,
}

impl<T: ApiTransport> DeploymentCoordinator<T> {
    pub fn new(
        client: Arc<VercelClient<T>>,
        resources: Arc<CoordinatorCell<ResourceSnapshot>>,
        interval: Duration,
        window: usize,
    ) -> Self {
        Self {
            client,
            cell: Arc::new(CoordinatorCell::new()),
            resources,
            interval,
            window,
        }
    }

    pub fn cell(&self) -> Arc<CoordinatorCell<DeploymentSnapshot>> {
        self.cell.clone()
    }

    /// 显式触发一轮刷新
    pub async fn refresh(&self) -> Result<Arc<DeploymentSnapshot>, GatewayError> {
        let _guard = self.cell.acquire_refresh().await;
        self.refresh_locked().await
    }

    /// 定时刷新循环（语义同资源协调器：tick 合并、认证停摆）
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            window = self.window,
            "Starting deployment coordinator"
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Deployment coordinator stopped");
                    return;
                }
                _ = interval.tick() => {}
            }

            if self.cell.needs_reauth().await {
                debug!("Skipping deployment refresh: waiting for re-authentication");
                continue;
            }

            match self.cell.try_acquire_refresh() {
                Some(_guard) => {
                    let _ = self.refresh_locked().await;
                }
                None => {
                    debug!("Previous deployment refresh still running, coalescing tick");
                }
            }
        }
    }

    async fn refresh_locked(&self) -> Result<Arc<DeploymentSnapshot>, GatewayError> {
        let deadline = Duration::from_secs(REFRESH_DEADLINE_SECS);
        let result = tokio::time::timeout(deadline, self.fetch_snapshot()).await;

        match result {
            Ok(Ok(snapshot)) => {
                info!(
                    projects = snapshot.deployments.len(),
                    "Deployment snapshot refreshed"
                );
                Ok(self.cell.publish(snapshot).await)
            }
            Ok(Err(error)) => {
                warn!(error = %error, "Deployment refresh failed, keeping previous snapshot");
                self.cell.record_error(error.clone()).await;
                Err(error)
            }
            Err(_) => {
                let error = GatewayError::Transient(format!(
                    "Refresh exceeded {}s deadline",
                    REFRESH_DEADLINE_SECS
                ));
                warn!(error = %error, "Deployment refresh timed out");
                self.cell.record_error(error.clone()).await;
                Err(error)
            }
        }
    }

    /// 抓取一轮部署快照
    ///
    /// 资源协调器还没成功过时没有可枚举的项目：发布空快照，不算失败
    async fn fetch_snapshot(&self) -> Result<DeploymentSnapshot, GatewayError> {
        let Some(resources) = self.resources.current().await else {
            debug!("No resource snapshot yet, publishing empty deployment snapshot");
            return Ok(DeploymentSnapshot {
                deployments: HashMap::new(),
                fetched_at: Utc::now(),
            });
        };

        let mut deployments = HashMap::with_capacity(resources.projects.len());
        for project_id in resources.projects.keys() {
            let window = match self.client.get_deployments(project_id, self.window).await {
                Ok(window) => window,
                Err(GatewayError::Auth) => return Err(GatewayError::Auth),
                // 单项目失败只清空它自己的窗口，不中止整轮
                Err(error) => {
                    warn!(
                        project_id = %project_id,
                        error = %error,
                        "Deployment fetch failed, recording empty window"
                    );
                    Vec::new()
                }
            };
            deployments.insert(project_id.clone(), window);
        }

        Ok(DeploymentSnapshot {
            deployments,
            fetched_at: Utc::now(),
        })
    }
}
