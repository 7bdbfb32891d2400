//! API 模块
//!
//! HTTP handlers 和路由组装

pub mod auth;
pub mod domains;
pub mod health;
pub mod projects;

use axum::Router;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// 构建完整的 API 路由
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health & Refresh
        .merge(health::router())
        // Projects
        .merge(projects::router())
        // Domains & Account
        .merge(domains::router())
        // Credential management
        .merge(auth::router())
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
