//! 快照类型
//!
//! 每轮刷新产出一个完整快照，发布后不可变；下一轮成功后整体替换。
//! 读者通过 `Arc` 共享，永远不会看到写了一半的快照。

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use super::deployment::Deployment;
use super::domains::Domain;
use super::project::{EnvVarSummary, Project};

/// 资源快照：项目、域名、环境变量摘要
///
/// 三个映射来自同一轮刷新——要么全部填充，要么整轮失败不发布。
/// 单个域名 config / 单个项目 env 子请求失败只降级对应条目。
#[derive(Clone, Debug, Serialize, Default)]
pub struct ResourceSnapshot {
    /// 项目 ID -> 项目
    pub projects: HashMap<String, Project>,
    /// 域名 -> 域名信息（含 config 查询结果）
    pub domains: HashMap<String, Domain>,
    /// 项目 ID -> 环境变量摘要
    pub env_vars: HashMap<String, Vec<EnvVarSummary>>,
    /// 本轮抓取完成时间
    pub fetched_at: DateTime<Utc>,
}

/// 部署快照：项目 ID -> 最近 N 条部署（最新在前）
///
/// 与资源快照独立刷新、独立版本化
#[derive(Clone, Debug, Serialize, Default)]
pub struct DeploymentSnapshot {
    pub deployments: HashMap<String, Vec<Deployment>>,
    pub fetched_at: DateTime<Utc>,
}

impl DeploymentSnapshot {
    /// 某项目的部署窗口，未知项目返回空切片
    pub fn for_project(&self, project_id: &str) -> &[Deployment] {
        self.deployments
            .get(project_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
