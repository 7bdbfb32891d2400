//! XJP Vercel Monitor - Vercel 项目监控代理
//!
//! 轮询 Vercel REST API，维护项目/域名/环境变量与部署的本地缓存快照，
//! 并基于快照提供最佳实践评分。消费端通过只读 HTTP API 访问。

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod middleware;
pub mod services;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::EnvConfig;
use crate::state::AppState;

/// 命令行运行时配置
#[derive(Clone, Debug, Default)]
pub struct RuntimeConfig {
    /// 覆盖监听端口
    pub port_override: Option<u16>,
}

/// 初始化并运行监控代理
pub async fn init_and_run(runtime: RuntimeConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = EnvConfig::from_env();
    if let Some(port) = runtime.port_override {
        config.port = port;
    }

    if config.vercel_token.is_empty() {
        warn!("VERCEL_TOKEN is not set; supply a credential via POST /api/auth/token");
    }

    let state = Arc::new(AppState::new(config));

    // 启动时阻塞刷新一轮，让消费端一上来就有数据；
    // 失败不退出，/health 会如实上报 no_data 或 needs_reauth
    match state.resources.refresh().await {
        Ok(_) => {
            if let Err(e) = state.deployments.refresh().await {
                warn!(error = %e, "Initial deployment refresh failed");
            }
        }
        Err(e) => warn!(error = %e, "Initial resource refresh failed, starting without data"),
    }

    // 两个协调器独立调度，互不等待
    let shutdown = CancellationToken::new();
    tokio::spawn(state.resources.clone().run(shutdown.clone()));
    tokio::spawn(state.deployments.clone().run(shutdown.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let app = api::router(state);

    info!(addr = %addr, "Listening");
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, addr = %addr, "Failed to bind listener");
            return;
        }
    };

    let serve_shutdown = shutdown.clone();
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
            serve_shutdown.cancel();
        })
        .await;

    if let Err(e) = result {
        error!(error = %e, "Server exited with error");
    }
    shutdown.cancel();
}
