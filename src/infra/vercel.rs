//! Vercel API Client
//!
//! 封装所有 Vercel REST 端点的类型化访问，包括：
//! - 用户/团队查询（用于凭证校验）
//! - 项目列表（自动翻页）
//! - 部署列表（按项目，限制条数）
//! - 域名列表与域名配置
//! - 项目环境变量（只取 key 与元数据，不取值）

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::config::env::constants::PAGE_SIZE;
use crate::domain::{
    DeploySource, DeployState, Deployment, Domain, EnvVarKind, EnvVarSummary, Project,
};

use super::transport::{ApiTransport, GatewayError};

/// 认证用户信息
#[derive(Clone, Debug, Deserialize)]
pub struct AccountUser {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// 团队信息
#[derive(Clone, Debug, Deserialize)]
pub struct Team {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

/// Vercel API 客户端
///
/// 泛型于传输层，协调器测试可以注入脚本化传输
pub struct VercelClient<T: ApiTransport> {
    transport: T,
}

impl<T: ApiTransport> VercelClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// 获取认证用户（用于校验 Token 是否有效）
    pub async fn get_user(&self) -> Result<AccountUser, GatewayError> {
        let data = self.transport.get("/v2/user", &[]).await?;
        parse_field::<AccountUser>(&data, "user")
    }

    /// 获取用户所属的团队列表
    pub async fn get_teams(&self) -> Result<Vec<Team>, GatewayError> {
        let data = self.transport.get("/v2/teams", &[]).await?;
        parse_field::<Vec<Team>>(&data, "teams")
    }

    /// 获取全部项目，沿 pagination.next 游标翻页直到取尽
    ///
    /// 各页按服务端返回顺序拼接；ID 唯一，无需去重排序
    pub async fn get_projects(&self) -> Result<Vec<Project>, GatewayError> {
        let mut all = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut params = vec![("limit", PAGE_SIZE.to_string())];
            if let Some(ref from) = cursor {
                params.push(("from", from.clone()));
            }

            let data = self.transport.get("/v10/projects", &params).await?;
            let page: ProjectsPage = parse_payload(data)?;
            all.extend(page.projects.into_iter().map(Project::from));

            cursor = page.pagination.next_cursor();
            if cursor.is_none() {
                break;
            }
        }

        Ok(all)
    }

    /// 获取某项目最近的部署，最新在前（服务端顺序，不在客户端重排）
    pub async fn get_deployments(
        &self,
        project_id: &str,
        limit: usize,
    ) -> Result<Vec<Deployment>, GatewayError> {
        let params = [
            ("projectId", project_id.to_string()),
            ("limit", limit.to_string()),
        ];
        let data = self.transport.get("/v6/deployments", &params).await?;
        let page: DeploymentsPage = parse_payload(data)?;
        Ok(page.deployments.into_iter().map(Deployment::from).collect())
    }

    /// 获取全部域名，翻页方式同项目列表（游标参数名为 until）
    pub async fn get_domains(&self) -> Result<Vec<WireDomain>, GatewayError> {
        let mut all = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut params = vec![("limit", PAGE_SIZE.to_string())];
            if let Some(ref until) = cursor {
                params.push(("until", until.clone()));
            }

            let data = self.transport.get("/v5/domains", &params).await?;
            let page: DomainsPage = parse_payload(data)?;
            all.extend(page.domains);

            cursor = page.pagination.next_cursor();
            if cursor.is_none() {
                break;
            }
        }

        Ok(all)
    }

    /// 获取单个域名的配置健康信息
    pub async fn get_domain_config(&self, domain: &str) -> Result<DomainConfig, GatewayError> {
        let path = format!("/v6/domains/{}/config", domain);
        let data = self.transport.get(&path, &[]).await?;
        parse_payload(data)
    }

    /// 获取项目环境变量摘要（只含 key 与元数据，永远不取值）
    pub async fn get_project_env_vars(
        &self,
        project_id: &str,
    ) -> Result<Vec<EnvVarSummary>, GatewayError> {
        let path = format!("/v9/projects/{}/env", project_id);
        let data = self.transport.get(&path, &[]).await?;
        let page: EnvsPage = parse_payload(data)?;
        Ok(page.envs.into_iter().map(EnvVarSummary::from).collect())
    }
}

/// 解析整个响应体
fn parse_payload<D: serde::de::DeserializeOwned>(data: Value) -> Result<D, GatewayError> {
    serde_json::from_value(data)
        .map_err(|e| GatewayError::Transient(format!("Unexpected payload shape: {}", e)))
}

/// 解析响应体中的单个字段
fn parse_field<D: serde::de::DeserializeOwned>(data: &Value, field: &str) -> Result<D, GatewayError> {
    let value = data
        .get(field)
        .cloned()
        .ok_or_else(|| GatewayError::Transient(format!("Missing `{}` in response", field)))?;
    parse_payload(value)
}

/// 翻页游标，取尽时 next 为 null/缺失
#[derive(Debug, Default, Deserialize)]
struct Pagination {
    #[serde(default)]
    next: Option<Value>,
}

impl Pagination {
    /// 游标可能是数字（时间戳）或字符串，统一转成查询参数
    fn next_cursor(&self) -> Option<String> {
        match self.next.as_ref() {
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProjectsPage {
    projects: Vec<WireProject>,
    #[serde(default)]
    pagination: Pagination,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireProject {
    id: String,
    name: String,
    #[serde(default)]
    framework: Option<String>,
    #[serde(default)]
    node_version: Option<String>,
    #[serde(default)]
    updated_at: Option<i64>,
}

impl From<WireProject> for Project {
    fn from(wire: WireProject) -> Self {
        Project {
            id: wire.id,
            name: wire.name,
            framework: wire.framework,
            node_version: wire.node_version,
            updated_at: wire.updated_at.and_then(ms_to_datetime),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DeploymentsPage {
    deployments: Vec<WireDeployment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDeployment {
    uid: String,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    created: Option<i64>,
    #[serde(default)]
    ready: Option<i64>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    is_rollback_candidate: Option<bool>,
    #[serde(default)]
    inspector_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    meta: serde_json::Map<String, Value>,
}

impl From<WireDeployment> for Deployment {
    fn from(wire: WireDeployment) -> Self {
        let commit_message = wire
            .meta
            .get("githubCommitMessage")
            .and_then(Value::as_str)
            .map(str::to_string);

        Deployment {
            uid: wire.uid,
            state: wire
                .state
                .as_deref()
                .map(DeployState::from_wire)
                .unwrap_or(DeployState::Unknown),
            created_at: wire.created.and_then(ms_to_datetime),
            ready_at: wire.ready.and_then(ms_to_datetime),
            source: wire.source.as_deref().and_then(DeploySource::from_wire),
            is_rollback_candidate: wire.is_rollback_candidate.unwrap_or(false),
            commit_message,
            inspector_url: wire.inspector_url,
            url: wire.url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DomainsPage {
    domains: Vec<WireDomain>,
    #[serde(default)]
    pagination: Pagination,
}

/// 域名列表条目（config 子请求的结果之后补入）
#[derive(Clone, Debug, Deserialize)]
pub struct WireDomain {
    pub name: String,
    #[serde(default)]
    pub verified: bool,
}

impl WireDomain {
    /// 与 config 子请求结果合并为完整的域名条目
    pub fn with_config(self, config: Option<DomainConfig>) -> Domain {
        match config {
            Some(config) => Domain {
                name: self.name,
                verified: self.verified,
                misconfigured: config.misconfigured,
                configured_by: config.configured_by,
            },
            // config 请求失败：健康状态未知而不是报错
            None => Domain {
                name: self.name,
                verified: self.verified,
                misconfigured: None,
                configured_by: None,
            },
        }
    }
}

/// 域名配置健康信息
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainConfig {
    #[serde(default)]
    pub misconfigured: Option<bool>,
    #[serde(default)]
    pub configured_by: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EnvsPage {
    envs: Vec<WireEnvVar>,
}

#[derive(Debug, Deserialize)]
struct WireEnvVar {
    key: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    target: Value,
}

impl From<WireEnvVar> for EnvVarSummary {
    fn from(wire: WireEnvVar) -> Self {
        // target 可能是字符串或字符串数组
        let targets = match wire.target {
            Value::String(s) => vec![s],
            Value::Array(items) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };

        EnvVarSummary {
            key: wire.key,
            kind: EnvVarKind::from_wire(wire.kind.as_deref().unwrap_or("")),
            targets,
        }
    }
}

/// 毫秒时间戳转 DateTime
fn ms_to_datetime(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::transport::testing::ScriptedTransport;
    use serde_json::json;

    fn project_page(ids: std::ops::Range<usize>, next: Value) -> Value {
        let projects: Vec<Value> = ids
            .map(|i| json!({"id": format!("prj_{}", i), "name": format!("site-{}", i)}))
            .collect();
        json!({"projects": projects, "pagination": {"next": next}})
    }

    #[tokio::test]
    async fn test_projects_pagination_concatenates_all_pages() {
        let transport = ScriptedTransport::new();
        // 三页：100 + 100 + 1，游标沿 from 参数传递，最后一页 next 为 null
        transport.push(
            "/v10/projects?limit=100",
            Ok(project_page(0..100, json!(1111))),
        );
        transport.push(
            "/v10/projects?limit=100&from=1111",
            Ok(project_page(100..200, json!(2222))),
        );
        transport.push(
            "/v10/projects?limit=100&from=2222",
            Ok(project_page(200..201, Value::Null)),
        );

        let client = VercelClient::new(transport);
        let projects = client.get_projects().await.unwrap();

        assert_eq!(projects.len(), 201);
        // 无重复无丢失，保持服务端顺序
        assert_eq!(projects[0].id, "prj_0");
        assert_eq!(projects[100].id, "prj_100");
        assert_eq!(projects[200].id, "prj_200");
        let unique: std::collections::HashSet<&str> =
            projects.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(unique.len(), 201);
        assert_eq!(client.transport().calls().len(), 3);
    }

    #[tokio::test]
    async fn test_projects_pagination_stops_on_missing_next() {
        let transport = ScriptedTransport::new();
        transport.push(
            "/v10/projects?limit=100",
            Ok(json!({"projects": [{"id": "prj_a", "name": "a"}]})),
        );

        let client = VercelClient::new(transport);
        let projects = client.get_projects().await.unwrap();

        assert_eq!(projects.len(), 1);
        assert_eq!(client.transport().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_deployment_normalization() {
        let transport = ScriptedTransport::new();
        transport.push(
            "/v6/deployments?projectId=prj_1&limit=5",
            Ok(json!({"deployments": [{
                "uid": "dpl_1",
                "state": "ready",
                "created": 1_700_000_000_000_i64,
                "ready": 1_700_000_030_000_i64,
                "source": "GIT",
                "isRollbackCandidate": true,
                "inspectorUrl": "https://vercel.com/inspect/dpl_1",
                "url": "site.vercel.app",
                "meta": {"githubCommitMessage": "fix: typo"}
            }, {
                "uid": "dpl_2",
                "state": "SOMETHING_NEW",
                "source": "webhook"
            }]})),
        );

        let client = VercelClient::new(transport);
        let deployments = client.get_deployments("prj_1", 5).await.unwrap();

        assert_eq!(deployments.len(), 2);
        assert_eq!(deployments[0].state, DeployState::Ready);
        assert_eq!(deployments[0].source, Some(DeploySource::Git));
        assert!(deployments[0].is_rollback_candidate);
        assert_eq!(deployments[0].commit_message.as_deref(), Some("fix: typo"));
        assert_eq!(deployments[0].build_duration_secs(), Some(30));

        assert_eq!(deployments[1].state, DeployState::Unknown);
        assert_eq!(deployments[1].source, None);
        assert!(!deployments[1].is_rollback_candidate);
    }

    #[tokio::test]
    async fn test_env_var_target_shapes() {
        let transport = ScriptedTransport::new();
        transport.push(
            "/v9/projects/prj_1/env",
            Ok(json!({"envs": [
                {"key": "DATABASE_URL", "type": "encrypted", "target": ["production", "preview"]},
                {"key": "DEBUG", "type": "plain", "target": "development"}
            ]})),
        );

        let client = VercelClient::new(transport);
        let envs = client.get_project_env_vars("prj_1").await.unwrap();

        assert_eq!(envs[0].kind, EnvVarKind::Encrypted);
        assert_eq!(envs[0].targets, vec!["production", "preview"]);
        assert_eq!(envs[1].kind, EnvVarKind::Plain);
        assert_eq!(envs[1].targets, vec!["development"]);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_transient() {
        let transport = ScriptedTransport::new();
        transport.push("/v10/projects?limit=100", Ok(json!({"unexpected": true})));

        let client = VercelClient::new(transport);
        let err = client.get_projects().await.unwrap_err();
        assert!(matches!(err, GatewayError::Transient(_)));
    }

    #[tokio::test]
    async fn test_auth_error_passes_through() {
        let transport = ScriptedTransport::new();
        transport.push("/v2/user", Err(GatewayError::Auth));

        let client = VercelClient::new(transport);
        assert_eq!(client.get_user().await.unwrap_err(), GatewayError::Auth);
    }
}
