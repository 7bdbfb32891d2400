//! 部署领域模型
//!
//! 线上状态字段大小写不固定，入库时统一归一化

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 部署生命周期状态
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeployState {
    Ready,
    Building,
    Error,
    Queued,
    Canceled,
    Initializing,
    /// API 返回了未知状态字符串
    Unknown,
}

impl DeployState {
    /// 从 API 返回的 state 字段归一化（大小写不敏感）
    pub fn from_wire(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "READY" => DeployState::Ready,
            "BUILDING" => DeployState::Building,
            "ERROR" => DeployState::Error,
            "QUEUED" => DeployState::Queued,
            "CANCELED" => DeployState::Canceled,
            "INITIALIZING" => DeployState::Initializing,
            _ => DeployState::Unknown,
        }
    }
}

/// 部署触发来源
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeploySource {
    Git,
    Cli,
    Redeploy,
    Import,
}

impl DeploySource {
    /// 从 API 返回的 source 字段归一化，无法识别的值折叠为 None
    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "git" => Some(DeploySource::Git),
            "cli" => Some(DeploySource::Cli),
            "redeploy" => Some(DeploySource::Redeploy),
            "import" => Some(DeploySource::Import),
            _ => None,
        }
    }
}

/// 单次部署
///
/// 每个项目只缓存最近 N 条，按服务端返回顺序（最新在前）
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Deployment {
    /// 部署 ID
    pub uid: String,
    /// 生命周期状态
    pub state: DeployState,
    /// 创建时间
    pub created_at: Option<DateTime<Utc>>,
    /// 构建完成时间（未完成时为 None）
    pub ready_at: Option<DateTime<Utc>>,
    /// 触发来源
    pub source: Option<DeploySource>,
    /// 是否可作为回滚目标
    pub is_rollback_candidate: bool,
    /// 提交信息（仅展示用）
    pub commit_message: Option<String>,
    /// Inspector 链接（仅展示用）
    pub inspector_url: Option<String>,
    /// 部署 URL（仅展示用）
    pub url: Option<String>,
}

impl Deployment {
    /// 构建耗时（秒），created/ready 任一缺失时为 None
    pub fn build_duration_secs(&self) -> Option<i64> {
        match (self.created_at, self.ready_at) {
            (Some(created), Some(ready)) => Some((ready - created).num_seconds()),
            _ => None,
        }
    }
}
