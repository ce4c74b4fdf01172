//! 配置管理模块
//! 启动时从环境变量（以及可选的 TOML 文件）构建一次，之后以参数形式传递

use std::{path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::polling::PollPolicy;

pub const SANDBOX_BASE_URL: &str = "https://api-sandbox.circle.com";
pub const PRODUCTION_BASE_URL: &str = "https://api.circle.com";

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub mint: MintConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub flow: FlowConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MintEnvironment {
    Sandbox,
    Production,
}

impl MintEnvironment {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sandbox" | "" => Some(MintEnvironment::Sandbox),
            "production" | "prod" => Some(MintEnvironment::Production),
            _ => None,
        }
    }
}

/// Mint API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintConfig {
    #[serde(default)]
    pub api_key: String,
    pub environment: MintEnvironment,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl MintConfig {
    /// 自定义地址优先，否则按环境选择
    pub fn resolved_base_url(&self) -> String {
        match &self.base_url {
            Some(url) if !url.trim().is_empty() => url.trim().trim_end_matches('/').to_string(),
            _ => match self.environment {
                MintEnvironment::Sandbox => SANDBOX_BASE_URL.to_string(),
                MintEnvironment::Production => PRODUCTION_BASE_URL.to_string(),
            },
        }
    }

    pub fn has_credential(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// 仪表盘服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            static_dir: "public".into(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// 多步流程中的轮询参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        let policy = PollPolicy::default();
        Self {
            initial_delay_ms: policy.initial_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
            timeout_secs: policy.timeout.as_secs(),
        }
    }
}

impl PollingConfig {
    pub fn policy(&self) -> PollPolicy {
        PollPolicy {
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms.max(self.initial_delay_ms)),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// 测试流程默认参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    pub chain: String,
    pub currency: String,
    pub amount: String,
    pub destination_type: String,
    /// 链上转账步骤的目标地址（沙箱测试地址）
    pub recipient_address: String,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            chain: "ETH".into(),
            currency: "USD".into(),
            amount: "10.00".into(),
            destination_type: "wire".into(),
            recipient_address: "0x8381470ED67C3802402dbbFa0058E8871F017A6F".into(),
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源加载（便于测试时不触碰进程环境）
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        let parse_num = |key: &str, default: u64| -> Result<u64> {
            match get(key) {
                Some(v) => v
                    .trim()
                    .parse()
                    .with_context(|| format!("{} must be a number, got {:?}", key, v)),
                None => Ok(default),
            }
        };

        let environment = match get("MINT_ENVIRONMENT") {
            Some(raw) => MintEnvironment::parse(&raw)
                .with_context(|| format!("MINT_ENVIRONMENT must be sandbox or production, got {:?}", raw))?,
            None => MintEnvironment::Sandbox,
        };

        let server_defaults = ServerConfig::default();
        let port = match get("PORT") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a port number, got {:?}", v))?,
            None => server_defaults.port,
        };

        let polling_defaults = PollingConfig::default();
        let flow_defaults = FlowConfig::default();
        let logging_defaults = LoggingConfig::default();

        Ok(Self {
            mint: MintConfig {
                api_key: get("MINT_API_KEY").unwrap_or_default(),
                environment,
                base_url: get("MINT_BASE_URL"),
                timeout_secs: parse_num("MINT_HTTP_TIMEOUT_SECS", default_timeout_secs())?,
            },
            server: ServerConfig {
                host: get("BIND_HOST").unwrap_or(server_defaults.host),
                port,
                static_dir: get("DASHBOARD_STATIC_DIR").unwrap_or(server_defaults.static_dir),
            },
            logging: LoggingConfig {
                level: get("LOG_LEVEL").unwrap_or(logging_defaults.level),
                format: get("LOG_FORMAT").unwrap_or(logging_defaults.format),
            },
            polling: PollingConfig {
                initial_delay_ms: parse_num("POLL_INITIAL_DELAY_MS", polling_defaults.initial_delay_ms)?,
                max_delay_ms: parse_num("POLL_MAX_DELAY_MS", polling_defaults.max_delay_ms)?,
                timeout_secs: parse_num("POLL_TIMEOUT_SECS", polling_defaults.timeout_secs)?,
            },
            flow: FlowConfig {
                recipient_address: get("MINT_TEST_RECIPIENT_ADDRESS")
                    .unwrap_or(flow_defaults.recipient_address),
                ..flow_defaults
            },
        })
    }

    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（配置文件优先级更高）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let config = Self::from_env()?;
        match path {
            Some(path) if path.as_ref().exists() => config.overlay_file(path),
            _ => Ok(config),
        }
    }

    /// 用配置文件中出现的键覆盖当前配置，文件未写的键保持原值
    ///
    /// 文件里 `api_key` 为空时沿用原有密钥，避免把密钥落盘。
    pub fn overlay_file<P: AsRef<Path>>(self, path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let overlay: toml::Value =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        let env_key = self.mint.api_key.clone();
        let mut merged =
            toml::Value::try_from(&self).with_context(|| "Failed to serialize base config")?;
        merge_toml(&mut merged, overlay);

        let mut config: Config = merged
            .try_into()
            .with_context(|| "Config file values have the wrong shape")?;
        if !config.mint.has_credential() {
            config.mint.api_key = env_key;
        }
        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        let base_url = self.mint.resolved_base_url();
        if !base_url.starts_with("https://") {
            anyhow::bail!("Mint base URL must be HTTPS (https://), got {}", base_url);
        }

        if self.mint.timeout_secs == 0 {
            anyhow::bail!("MINT_HTTP_TIMEOUT_SECS must be greater than zero");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }

        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        if self.polling.timeout_secs == 0 {
            anyhow::bail!("POLL_TIMEOUT_SECS must be greater than zero");
        }

        Ok(())
    }

    /// 脱敏后的配置，供 `/api/config` 与 `config-check` 展示
    pub fn redacted(&self) -> serde_json::Value {
        let mut copy = self.clone();
        copy.mint.api_key = mask_secret(&copy.mint.api_key);
        let mut value = serde_json::to_value(&copy).unwrap_or(serde_json::Value::Null);
        if let Some(mint) = value.get_mut("mint").and_then(|m| m.as_object_mut()) {
            mint.insert(
                "resolved_base_url".into(),
                serde_json::Value::String(self.mint.resolved_base_url()),
            );
        }
        value
    }
}

fn mask_secret(secret: &str) -> String {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let tail: String = trimmed
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("****{}", tail)
}

/// 递归合并：表按键合并，其余值整体替换
fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
