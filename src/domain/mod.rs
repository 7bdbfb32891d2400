//! 领域模型模块
//!
//! 纯数据结构，不依赖 axum/tokio

pub mod deployment;
pub mod domains;
pub mod project;
pub mod snapshot;

// Re-exports for convenience
pub use deployment::{DeploySource, DeployState, Deployment};
pub use domains::Domain;
pub use project::{EnvVarKind, EnvVarSummary, Project};
pub use snapshot::{DeploymentSnapshot, ResourceSnapshot};
