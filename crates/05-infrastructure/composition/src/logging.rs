//! 日志初始化

use infrastructure_common::{ConfigError, ConfigResult, InfrastructureError, InfrastructureResult};
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别（trace / debug / info / warn / error）
    pub level: String,
    /// 额外的过滤指令，语法同 `RUST_LOG`，例如 `di_impl=trace`
    pub filter: Option<String>,
    /// 是否显示目标
    pub show_target: bool,
    /// 是否显示线程ID
    pub show_thread_ids: bool,
    /// 是否显示文件名
    pub show_file: bool,
    /// 是否显示行号
    pub show_line_number: bool,
    /// 是否使用 JSON 格式
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            filter: None,
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// 创建开发环境日志配置
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            filter: None,
            show_target: true,
            show_thread_ids: true,
            show_file: true,
            show_line_number: true,
            json_format: false,
        }
    }

    /// 创建生产环境日志配置
    pub fn production() -> Self {
        Self {
            level: "info".to_string(),
            filter: None,
            show_target: false,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: true,
        }
    }

    /// 验证日志级别
    pub fn validate(&self) -> ConfigResult<()> {
        match self.level.to_ascii_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => Err(ConfigError::ValidationError {
                message: format!("无效的日志级别: {}", other),
            }),
        }
    }

    /// 组合日志级别和过滤指令
    pub fn env_filter(&self) -> InfrastructureResult<EnvFilter> {
        let directives = match &self.filter {
            Some(filter) if !filter.trim().is_empty() => format!("{},{}", self.level, filter),
            _ => self.level.clone(),
        };
        EnvFilter::try_new(&directives).map_err(|e| InfrastructureError::BootstrapFailed {
            message: format!("日志过滤指令无效 {}: {}", directives, e),
        })
    }
}

/// 初始化全局日志订阅者
///
/// 全局订阅者只能设置一次，重复调用返回 `BootstrapFailed`。
pub fn init_logging(config: &LoggingConfig) -> InfrastructureResult<()> {
    config.validate()?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(config.env_filter()?)
        .with_target(config.show_target)
        .with_thread_ids(config.show_thread_ids)
        .with_file(config.show_file)
        .with_line_number(config.show_line_number);

    if config.json_format {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    }
    .map_err(|e| InfrastructureError::BootstrapFailed {
        message: format!("日志初始化失败: {}", e),
    })?;

    info!("日志系统初始化完成");
    Ok(())
}
