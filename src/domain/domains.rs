//! 域名领域模型

use serde::{Deserialize, Serialize};

/// 账号下的域名及其配置健康状态
///
/// misconfigured/configured_by 来自独立的 config 子请求，
/// 该请求失败时保持 None（未知），不影响域名本身入快照
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Domain {
    /// 域名（唯一键）
    pub name: String,
    /// 是否已验证所有权
    pub verified: bool,
    /// 是否配置错误（config 子请求失败时为 None）
    pub misconfigured: Option<bool>,
    /// DNS 配置方（如 "CNAME"/"A"，未配置或未知时为 None）
    pub configured_by: Option<String>,
}

impl Domain {
    /// 域名是否健康：已验证且有生效的 DNS 配置
    pub fn is_healthy(&self) -> bool {
        self.verified && self.configured_by.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_healthy() {
        let mut domain = Domain {
            name: "example.com".to_string(),
            verified: true,
            misconfigured: Some(false),
            configured_by: Some("CNAME".to_string()),
        };
        assert!(domain.is_healthy());

        domain.configured_by = None;
        assert!(!domain.is_healthy());

        domain.configured_by = Some("A".to_string());
        domain.verified = false;
        assert!(!domain.is_healthy());
    }
}
