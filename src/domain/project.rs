//! 项目与环境变量领域模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Vercel 项目
///
/// 每轮资源刷新整体替换，不做字段级增量更新
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Project {
    /// 项目 ID（Vercel 分配，稳定且唯一）
    pub id: String,
    /// 显示名称
    pub name: String,
    /// 框架标识（Vercel 未识别时为 None）
    pub framework: Option<String>,
    /// Node 运行时版本字符串（如 "20.x"）
    pub node_version: Option<String>,
    /// 最后更新时间
    pub updated_at: Option<DateTime<Utc>>,
}

impl Project {
    /// 有效的框架标识
    ///
    /// Vercel 用字面量 "other" 表示未能识别框架，等同于未设置
    pub fn effective_framework(&self) -> Option<&str> {
        match self.framework.as_deref() {
            None | Some("other") => None,
            Some(fw) => Some(fw),
        }
    }
}

/// 环境变量存储类型
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnvVarKind {
    /// 明文存储（审计检查项会标记）
    Plain,
    Encrypted,
    Secret,
    /// 其他类型（如 sensitive/system），审计不关心
    Other,
}

impl EnvVarKind {
    /// 从 API 返回的 type 字段归一化
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "plain" => EnvVarKind::Plain,
            "encrypted" => EnvVarKind::Encrypted,
            "secret" => EnvVarKind::Secret,
            _ => EnvVarKind::Other,
        }
    }
}

/// 环境变量摘要
///
/// 只缓存 key 与元数据，值永远不拉取
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EnvVarSummary {
    /// 变量名
    pub key: String,
    /// 存储类型
    pub kind: EnvVarKind,
    /// 生效环境（production/preview/development）
    pub targets: Vec<String>,
}
