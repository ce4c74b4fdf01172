//! 日志系统配置模块
//! 结构化日志输出到 stderr，stdout 留给命令行的 JSON 结果

use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

use crate::config::LoggingConfig;

/// 默认过滤器：本 crate 用配置级别，HTTP 栈降噪
fn default_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "mint_harness={level},tower_http={level},hyper=warn,reqwest=warn",
            level = config.level.to_lowercase()
        ))
    })
}

/// 初始化日志系统（重复调用时忽略）
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = default_filter(config);

    let result = if config.format == "json" {
        Registry::default()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_timer(ChronoUtc::rfc_3339()),
            )
            .try_init()
    } else {
        Registry::default()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_target(false),
            )
            .try_init()
    };

    result.map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))
}
