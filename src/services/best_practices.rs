//! 最佳实践审计
//!
//! 对快照子集（一个项目 + 它的部署窗口 + 环境变量摘要）做纯函数评分。
//! 无状态、无 I/O，每次读取时重新计算。
//!
//! 六个等权检查项按固定顺序求值；新增检查只需往 `CHECKS` 追加条目，
//! 评分算法不变。失败项的提示语固定，顺序即检查项顺序。

use serde::Serialize;

use crate::domain::{DeployState, Deployment, EnvVarKind, EnvVarSummary, Project};

/// 当前视为"现代"的 Node 运行时版本（精确字符串匹配的准入集合）
pub const CURRENT_NODE_VERSIONS: &[&str] = &["20.x", "22.x", "24.x"];

/// 部署窗口内可接受的最大失败占比
pub const MAX_ERROR_RATE: f64 = 0.3;

/// 审计结果：0-100 分（100/6 的倍数，银行家舍入）+ 失败项提示
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct AuditResult {
    pub score: u8,
    pub issues: Vec<String>,
}

/// 单次审计的输入视图
pub struct AuditInput<'a> {
    pub project: &'a Project,
    pub deployments: &'a [Deployment],
    pub env_vars: &'a [EnvVarSummary],
}

/// 一个检查项：谓词 + 固定提示语
struct Check {
    key: &'static str,
    message: &'static str,
    passes: fn(&AuditInput<'_>) -> bool,
}

/// 检查项清单，顺序即输出顺序
const CHECKS: &[Check] = &[
    Check {
        key: "framework",
        message: "No framework detected. Configure a framework for optimized builds.",
        passes: check_framework,
    },
    Check {
        key: "node_version",
        message: "Node version is outdated. Upgrade to Node 20+ for LTS support.",
        passes: check_node_version,
    },
    Check {
        key: "env_hygiene",
        message: "Environment variables are stored as plaintext. Use encrypted or secret type.",
        passes: check_env_hygiene,
    },
    Check {
        key: "error_rate",
        message: "High deployment failure rate in the recent window.",
        passes: check_error_rate,
    },
    Check {
        key: "rollback",
        message: "No rollback candidate available. Ensure successful production deployments exist.",
        passes: check_rollback,
    },
    Check {
        key: "staleness",
        message: "No deployments found. Deploy your project to get started.",
        passes: check_staleness,
    },
];

/// 框架已识别（"other" 等同于未识别）
fn check_framework(input: &AuditInput<'_>) -> bool {
    input.project.effective_framework().is_some()
}

/// 运行时版本在准入集合内（精确匹配，不做语义化版本比较）
fn check_node_version(input: &AuditInput<'_>) -> bool {
    input
        .project
        .node_version
        .as_deref()
        .map(|v| CURRENT_NODE_VERSIONS.contains(&v))
        .unwrap_or(false)
}

/// 没有明文存储的环境变量（只看有无，不看数量）
fn check_env_hygiene(input: &AuditInput<'_>) -> bool {
    !input.env_vars.iter().any(|e| e.kind == EnvVarKind::Plain)
}

/// 部署窗口非空且失败占比不超过阈值
///
/// 只统计缓存窗口，不是全历史
fn check_error_rate(input: &AuditInput<'_>) -> bool {
    if input.deployments.is_empty() {
        return false;
    }
    let errors = input
        .deployments
        .iter()
        .filter(|d| d.state == DeployState::Error)
        .count();
    let rate = errors as f64 / input.deployments.len() as f64;
    rate <= MAX_ERROR_RATE
}

/// 窗口内存在可回滚的部署
///
/// 空窗口判定为失败：没有部署自然没有可回滚目标。
/// 这比第 4/6 项的措辞更严格，是有意为之——空窗口会同时挂掉 4、5、6 三项。
fn check_rollback(input: &AuditInput<'_>) -> bool {
    input.deployments.iter().any(|d| d.is_rollback_candidate)
}

/// 窗口非空（项目没有荒废）
fn check_staleness(input: &AuditInput<'_>) -> bool {
    !input.deployments.is_empty()
}

/// 审计一个项目
///
/// 分数 = round(通过数 / 6 × 100)，采用 round-half-to-even；
/// 六分之几的取值实际不会出现 .5 平局，但舍入模式固定下来便于测试位精确
pub fn audit_project(
    project: &Project,
    deployments: &[Deployment],
    env_vars: &[EnvVarSummary],
) -> AuditResult {
    let input = AuditInput {
        project,
        deployments,
        env_vars,
    };

    let mut passed = 0usize;
    let mut issues = Vec::new();
    for check in CHECKS {
        if (check.passes)(&input) {
            passed += 1;
        } else {
            tracing::debug!(project_id = %project.id, check = check.key, "Audit check failed");
            issues.push(check.message.to_string());
        }
    }

    let score = ((passed as f64 / CHECKS.len() as f64) * 100.0).round_ties_even() as u8;

    AuditResult { score, issues }
}
