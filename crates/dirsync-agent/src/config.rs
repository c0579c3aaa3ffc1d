//! 配置管理模块
//!
//! 该模块负责加载和管理 Agent 的配置文件，支持 YAML/JSON 格式，
//! 并允许通过 `DIRSYNC__` 前缀的环境变量覆盖配置项。

use anyhow::{anyhow, Context, Result};
use config::{Config, Environment, File, FileFormat};
use dirsync_controller::{HttpDirectoryConfig, RefreshConfig, RolesConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Agent 配置结构
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// 日志级别
    pub log_level: String,
    /// 集群成员标识，未配置时启动时随机生成
    pub member_id: Option<String>,
    /// 刷新配置
    pub refresh: RefreshConfig,
    /// 固定角色映射
    pub roles: RolesConfig,
    /// 外部目录配置
    pub directory: HttpDirectoryConfig,
    /// 缓存清理间隔（秒）
    pub cache_cleanup_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            member_id: None,
            refresh: RefreshConfig::default(),
            roles: RolesConfig::default(),
            directory: HttpDirectoryConfig::default(),
            cache_cleanup_secs: 60,
        }
    }
}

/// 配置管理器
pub struct ConfigManager {
    /// 配置文件路径
    config_path: PathBuf,
    /// 当前配置
    config: AgentConfig,
}

impl ConfigManager {
    /// 创建新的配置管理器
    pub fn new(config_path: &str) -> Result<Self> {
        let config_path = PathBuf::from(config_path);

        // 加载配置文件
        let config = Self::load_config(&config_path)
            .context(format!("无法加载配置文件: {:?}", config_path))?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// 加载配置文件
    fn load_config(config_path: &Path) -> Result<AgentConfig> {
        let config_file = config_path.to_str().ok_or_else(|| anyhow!("配置路径无效"))?;

        // 确定配置文件格式
        let format = match config_path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => FileFormat::Yaml,
            Some("json") => FileFormat::Json,
            _ => return Err(anyhow!("不支持的配置文件格式，仅支持 YAML 或 JSON")),
        };

        // 构建配置
        let config = Config::builder()
            .add_source(File::with_name(config_file).format(format))
            .add_source(
                Environment::with_prefix("DIRSYNC")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("构建配置失败")?;

        // 反序列化为 AgentConfig
        let agent_config = config
            .try_deserialize::<AgentConfig>()
            .context("配置格式错误")?;

        agent_config.refresh.validate().context("刷新配置无效")?;
        debug!("从 {:?} 加载配置成功", config_path);

        Ok(agent_config)
    }

    /// 配置文件路径
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// 获取完整配置
    pub fn get_config(&self) -> &AgentConfig {
        &self.config
    }

    /// 取出配置
    pub fn into_config(self) -> AgentConfig {
        self.config
    }
}

/// 默认配置的 YAML 形式
pub fn default_config_yaml() -> Result<String> {
    serde_yaml::to_string(&AgentConfig::default()).context("序列化默认配置失败")
}
