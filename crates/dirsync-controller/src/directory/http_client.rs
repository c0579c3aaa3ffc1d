//! HTTP 目录客户端
//!
//! 通过身份提供方的管理 API 分页列出用户：`GET {base_url}/users?page=N&per_page=M`，
//! 使用 Bearer 令牌认证。用户角色取自 `app_metadata.roles`。

use async_trait::async_trait;
use dirsync_common::{DirectoryUser, Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::DirectoryClient;

/// HTTP 目录客户端配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpDirectoryConfig {
    /// 管理 API 根地址
    pub base_url: String,
    /// 访问令牌
    pub token: String,
    /// 请求超时（秒）
    pub timeout_secs: u64,
}

impl Default for HttpDirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: "https://example.auth0.com/api/v2".to_string(),
            token: String::new(),
            timeout_secs: 30,
        }
    }
}

/// 管理 API 返回的用户原始结构
#[derive(Debug, Deserialize)]
struct RawUser {
    user_id: String,
    #[serde(default)]
    nickname: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    app_metadata: Option<AppMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct AppMetadata {
    #[serde(default)]
    roles: Vec<String>,
}

impl From<RawUser> for DirectoryUser {
    fn from(raw: RawUser) -> Self {
        DirectoryUser {
            user_id: raw.user_id,
            nickname: raw.nickname,
            email: raw.email,
            roles: raw
                .app_metadata
                .map(|m| m.roles.into_iter().collect())
                .unwrap_or_default(),
        }
    }
}

/// 把响应体解析为一页用户，`null` 视为空页
fn parse_page(body: &str) -> Result<Vec<DirectoryUser>> {
    let raw: Option<Vec<RawUser>> = serde_json::from_str(body)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(DirectoryUser::from)
        .collect())
}

/// 基于 reqwest 的目录客户端
pub struct HttpDirectoryClient {
    config: HttpDirectoryConfig,
    http: reqwest::Client,
}

impl HttpDirectoryClient {
    /// 创建新的 HTTP 目录客户端
    pub fn new(config: HttpDirectoryConfig) -> Result<Self> {
        if config.token.trim().is_empty() {
            return Err(Error::Config("目录访问令牌不能为空".to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Directory(format!("无法创建 HTTP 客户端: {}", e)))?;
        Ok(Self { config, http })
    }

    fn users_url(&self) -> String {
        format!("{}/users", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl DirectoryClient for HttpDirectoryClient {
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Vec<DirectoryUser>> {
        debug!("请求目录用户第 {} 页，每页 {} 条", page, page_size);

        let response = self
            .http
            .get(self.users_url())
            .bearer_auth(&self.config.token)
            .query(&[("page", page), ("per_page", page_size)])
            .send()
            .await
            .map_err(|e| Error::Directory(format!("请求第 {} 页失败: {}", page, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Directory(format!(
                "拉取第 {} 页返回状态码 {}",
                page, status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Directory(format!("读取第 {} 页响应失败: {}", page, e)))?;
        parse_page(&body)
    }
}
