//! Vercel API 传输层
//!
//! 协调器只依赖 `ApiTransport` 这一抽象请求契约，
//! HTTP 细节（连接池、超时、状态码分类）都封装在 `HttpTransport`。

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::config::env::constants::REQUEST_TIMEOUT_SECS;

/// 网关错误分类
///
/// 三档严重程度：认证失败需要用户换 Token，其余两种等下一轮刷新自愈
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// 凭证过期或被吊销（401/403），协调器停止自动刷新直到换新凭证
    #[error("Authentication failed: credential rejected")]
    Auth,
    /// 触发限流（429），保留旧快照等下一轮——刷新间隔本身就是节流
    #[error("Rate limited by Vercel API")]
    RateLimited,
    /// 网络错误、意外状态码、响应解析失败等瞬态问题
    #[error("Transient gateway failure: {0}")]
    Transient(String),
}

/// 抽象请求契约
///
/// 每个请求自带超时；实现负责把响应状态映射到 `GatewayError` 三类
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// 对资源路径发起 GET，返回解析后的 JSON
    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<Value, GatewayError>;
}

/// 运行时可替换的 bearer 凭证
///
/// 换新 Token 不需要重启进程，下一个请求即生效
#[derive(Clone)]
pub struct TokenStore {
    token: Arc<RwLock<String>>,
}

impl TokenStore {
    pub fn new(token: String) -> Self {
        Self {
            token: Arc::new(RwLock::new(token)),
        }
    }

    pub async fn get(&self) -> String {
        self.token.read().await.clone()
    }

    pub async fn set(&self, token: String) {
        *self.token.write().await = token;
    }
}

/// reqwest 实现：复用连接池，每个请求独立超时
pub struct HttpTransport {
    client: Client,
    base_url: String,
    token: TokenStore,
    team_id: Option<String>,
}

impl HttpTransport {
    /// 创建新的传输层
    pub fn new(base_url: String, token: TokenStore, team_id: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .pool_max_idle_per_host(5)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url,
            token,
            team_id,
        }
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<Value, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        let token = self.token.get().await;

        // teamId 挂在每个请求上
        let mut query: Vec<(&str, &str)> = Vec::with_capacity(params.len() + 1);
        if let Some(ref team_id) = self.team_id {
            query.push(("teamId", team_id.as_str()));
        }
        for (k, v) in params {
            query.push((*k, v.as_str()));
        }

        let response = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .query(&query)
            .send()
            .await
            .map_err(|e| GatewayError::Transient(format!("Request failed: {}", e)))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(GatewayError::Auth),
            StatusCode::TOO_MANY_REQUESTS => Err(GatewayError::RateLimited),
            status if !status.is_success() => Err(GatewayError::Transient(format!(
                "Unexpected status {} for {}",
                status, path
            ))),
            _ => response
                .json::<Value>()
                .await
                .map_err(|e| GatewayError::Transient(format!("Malformed response body: {}", e))),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_token_store_swap() {
        let store = TokenStore::new("old-token".to_string());
        assert_eq!(store.get().await, "old-token");

        store.set("new-token".to_string()).await;
        assert_eq!(store.get().await, "new-token");
    }
}
