//! 基础设施模块
//!
//! 封装外部依赖（Vercel HTTP 传输与类型化客户端）

pub mod transport;
pub mod vercel;

pub use transport::{ApiTransport, GatewayError, HttpTransport, TokenStore};
pub use vercel::VercelClient;
