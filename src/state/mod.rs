//! 运行时状态模块
//!
//! 管理应用状态与协调器状态单元

pub mod app_state;
pub mod coordinator;

pub use app_state::AppState;
pub use coordinator::{CoordinatorCell, CoordinatorStatus};
