//! 协调器状态单元
//!
//! 两个协调器（资源/部署）共用的发布与故障记录逻辑：
//! 最近一次成功的快照、最后更新时间、最后错误、单飞刷新门。
//! 状态是每实例的，不是全局的——多账号监控互不干扰。

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, RwLock};

use crate::infra::GatewayError;

/// 协调器对消费者可见的状态
///
/// "还没有数据"、"数据过期"、"需要重新认证"是三种不同状态，
/// 消费者据此决定提示方式，不折叠为统一的"不可用"
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorStatus {
    /// 从未成功过，暂无快照
    NoData,
    /// 最近一轮刷新成功
    Ok,
    /// 曾经成功，但最近一轮失败——快照仍可读，只是旧了
    Stale,
    /// 凭证失效，自动刷新已停，等待换新 Token
    NeedsReauth,
}

/// 单个协调器的状态单元
///
/// 快照发布即整体替换引用，读者要么看到旧的完整快照、
/// 要么看到新的完整快照，永远不会看到写了一半的
pub struct CoordinatorCell<T> {
    snapshot: RwLock<Option<Arc<T>>>,
    last_updated: RwLock<Option<DateTime<Utc>>>,
    last_error: RwLock<Option<GatewayError>>,
    /// 单飞门：同一协调器同时只允许一轮刷新
    refresh_gate: Mutex<()>,
}

impl<T> CoordinatorCell<T> {
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(None),
            last_updated: RwLock::new(None),
            last_error: RwLock::new(None),
            refresh_gate: Mutex::new(()),
        }
    }

    /// 发布新快照，清掉上一轮的错误
    pub async fn publish(&self, snapshot: T) -> Arc<T> {
        let snapshot = Arc::new(snapshot);
        *self.snapshot.write().await = Some(snapshot.clone());
        *self.last_updated.write().await = Some(Utc::now());
        *self.last_error.write().await = None;
        snapshot
    }

    /// 记录一轮失败；旧快照保持原样
    pub async fn record_error(&self, error: GatewayError) {
        *self.last_error.write().await = Some(error);
    }

    /// 最近一次成功的快照（永不阻塞刷新；没有数据时为 None）
    pub async fn current(&self) -> Option<Arc<T>> {
        self.snapshot.read().await.clone()
    }

    pub async fn last_updated(&self) -> Option<DateTime<Utc>> {
        *self.last_updated.read().await
    }

    pub async fn last_error(&self) -> Option<GatewayError> {
        self.last_error.read().await.clone()
    }

    /// 是否因认证失败停摆
    pub async fn needs_reauth(&self) -> bool {
        matches!(&*self.last_error.read().await, Some(GatewayError::Auth))
    }

    /// 换新凭证后解除认证停摆，恢复正常调度
    pub async fn clear_auth_halt(&self) {
        let mut last_error = self.last_error.write().await;
        if matches!(&*last_error, Some(GatewayError::Auth)) {
            *last_error = None;
        }
    }

    /// 对消费者可见的状态
    pub async fn status(&self) -> CoordinatorStatus {
        if self.needs_reauth().await {
            return CoordinatorStatus::NeedsReauth;
        }
        let has_snapshot = self.snapshot.read().await.is_some();
        let has_error = self.last_error.read().await.is_some();
        match (has_snapshot, has_error) {
            (false, _) => CoordinatorStatus::NoData,
            (true, true) => CoordinatorStatus::Stale,
            (true, false) => CoordinatorStatus::Ok,
        }
    }

    /// 阻塞式获取刷新门（显式触发的刷新排队等待）
    pub async fn acquire_refresh(&self) -> MutexGuard<'_, ()> {
        self.refresh_gate.lock().await
    }

    /// 非阻塞获取刷新门；定时 tick 撞上超时的上一轮时合并为 no-op
    pub fn try_acquire_refresh(&self) -> Option<MutexGuard<'_, ()>> {
        self.refresh_gate.try_lock().ok()
    }
}

impl<T> Default for CoordinatorCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_status_transitions() {
        let cell: CoordinatorCell<u32> = CoordinatorCell::new();
        assert_eq!(cell.status().await, CoordinatorStatus::NoData);

        // 失败但从未成功过：仍是 NoData
        cell.record_error(GatewayError::Transient("boom".to_string()))
            .await;
        assert_eq!(cell.status().await, CoordinatorStatus::NoData);

        cell.publish(42).await;
        assert_eq!(cell.status().await, CoordinatorStatus::Ok);
        assert_eq!(cell.current().await.as_deref(), Some(&42));

        // 成功后又失败：快照保留，状态转 Stale
        cell.record_error(GatewayError::RateLimited).await;
        assert_eq!(cell.status().await, CoordinatorStatus::Stale);
        assert_eq!(cell.current().await.as_deref(), Some(&42));
    }

    #[tokio::test]
    async fn test_reauth_halt_and_resume() {
        let cell: CoordinatorCell<u32> = CoordinatorCell::new();
        cell.publish(1).await;

        cell.record_error(GatewayError::Auth).await;
        assert!(cell.needs_reauth().await);
        assert_eq!(cell.status().await, CoordinatorStatus::NeedsReauth);

        cell.clear_auth_halt().await;
        assert!(!cell.needs_reauth().await);
        assert_eq!(cell.status().await, CoordinatorStatus::Ok);
    }

    #[tokio::test]
    async fn test_clear_auth_halt_keeps_other_errors() {
        let cell: CoordinatorCell<u32> = CoordinatorCell::new();
        cell.publish(1).await;
        cell.record_error(GatewayError::RateLimited).await;

        cell.clear_auth_halt().await;
        assert_eq!(cell.last_error().await, Some(GatewayError::RateLimited));
    }

    #[tokio::test]
    async fn test_refresh_gate_single_flight() {
        let cell: CoordinatorCell<u32> = CoordinatorCell::new();
        let guard = cell.try_acquire_refresh();
        assert!(guard.is_some());
        // 门被占用时 tick 合并为 no-op
        assert!(cell.try_acquire_refresh().is_none());
        drop(guard);
        assert!(cell.try_acquire_refresh().is_some());
    }

    #[tokio::test]
    async fn test_publish_clears_error() {
        let cell: CoordinatorCell<u32> = CoordinatorCell::new();
        cell.record_error(GatewayError::Transient("x".to_string()))
            .await;
        cell.publish(7).await;
        assert_eq!(cell.last_error().await, None);
        assert!(cell.last_updated().await.is_some());
    }
}
