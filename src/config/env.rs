//! 环境变量配置加载

use std::env;
use std::time::Duration;

/// 环境配置
#[derive(Clone, Debug)]
pub struct EnvConfig {
    /// Vercel API Token（bearer 凭证，可在运行时通过 API 更换）
    pub vercel_token: String,
    /// 团队 ID（个人账号不设置）
    pub team_id: Option<String>,
    /// 本服务的 API 密钥（保护读接口）
    pub api_key: String,
    /// 服务监听端口
    pub port: u16,
    /// 资源刷新间隔（项目/域名/环境变量）
    pub project_scan_interval: Duration,
    /// 部署刷新间隔
    pub deployment_scan_interval: Duration,
    /// 每个项目缓存的部署条数
    pub deployment_window: usize,
}

impl EnvConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Self {
        let vercel_token = env::var("VERCEL_TOKEN").unwrap_or_default();
        let team_id = env::var("VERCEL_TEAM_ID").ok().filter(|s| !s.is_empty());

        // API Key - 支持旧名称兼容
        let api_key = load_with_fallback("VERCEL_MONITOR_API_KEY", "API_KEY")
            .unwrap_or_else(|| "change-me-in-production".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(9880);

        let project_scan_interval = env::var("PROJECT_SCAN_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(
                constants::DEFAULT_PROJECT_SCAN_INTERVAL_SECS,
            ));

        let deployment_scan_interval = env::var("DEPLOYMENT_SCAN_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(
                constants::DEFAULT_DEPLOYMENT_SCAN_INTERVAL_SECS,
            ));

        let deployment_window = env::var("DEPLOYMENT_WINDOW")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&n| n > 0)
            .unwrap_or(constants::DEFAULT_DEPLOYMENT_WINDOW);

        Self {
            vercel_token,
            team_id,
            api_key,
            port,
            project_scan_interval,
            deployment_scan_interval,
            deployment_window,
        }
    }
}

/// 加载环境变量，支持 fallback
fn load_with_fallback(primary: &str, fallback: &str) -> Option<String> {
    env::var(primary).ok().or_else(|| env::var(fallback).ok())
}

/// 常量
pub mod constants {
    /// Vercel API 基地址
    pub const VERCEL_API_BASE: &str = "https://api.vercel.com";

    /// 资源刷新间隔（秒）- 15 分钟
    pub const DEFAULT_PROJECT_SCAN_INTERVAL_SECS: u64 = 900;

    /// 部署刷新间隔（秒）
    pub const DEFAULT_DEPLOYMENT_SCAN_INTERVAL_SECS: u64 = 60;

    /// 每个项目缓存的部署条数
    pub const DEFAULT_DEPLOYMENT_WINDOW: usize = 5;

    /// 分页大小
    pub const PAGE_SIZE: usize = 100;

    /// 单个请求超时（秒）
    pub const REQUEST_TIMEOUT_SECS: u64 = 10;

    /// 整轮刷新的总时限（秒）- 超时视为瞬态失败，保留旧快照
    pub const REFRESH_DEADLINE_SECS: u64 = 120;

    /// 版本号
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_with_fallback() {
        // 设置测试环境变量
        env::set_var("TEST_PRIMARY", "primary_value");
        env::set_var("TEST_FALLBACK", "fallback_value");

        assert_eq!(
            load_with_fallback("TEST_PRIMARY", "TEST_FALLBACK"),
            Some("primary_value".to_string())
        );

        env::remove_var("TEST_PRIMARY");
        assert_eq!(
            load_with_fallback("TEST_PRIMARY", "TEST_FALLBACK"),
            Some("fallback_value".to_string())
        );

        env::remove_var("TEST_FALLBACK");
        assert_eq!(load_with_fallback("TEST_PRIMARY", "TEST_FALLBACK"), None);
    }

    #[test]
    fn test_deployment_window_rejects_zero() {
        env::set_var("DEPLOYMENT_WINDOW", "0");
        let config = EnvConfig::from_env();
        assert_eq!(config.deployment_window, constants::DEFAULT_DEPLOYMENT_WINDOW);
        env::remove_var("DEPLOYMENT_WINDOW");
    }
}
