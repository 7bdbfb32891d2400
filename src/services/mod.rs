//! 服务层模块
//!
//! 包含核心业务逻辑：两个协调器与最佳实践审计

pub mod best_practices;
pub mod deployment_coordinator;
pub mod resource_coordinator;

pub use best_practices::{audit_project, AuditResult};
pub use deployment_coordinator::DeploymentCoordinator;
pub use resource_coordinator::ResourceCoordinator;
