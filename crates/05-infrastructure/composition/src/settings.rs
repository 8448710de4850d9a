//! 组合层配置
//!
//! 配置文件支持 TOML / JSON / YAML，环境变量可以覆盖文件中的值，
//! 例如 `LORN_DI__CONTAINER__MAX_RESOLUTION_DEPTH=32`。

use crate::logging::LoggingConfig;
use di_abstractions::ContainerConfig;
use infrastructure_common::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// 环境变量前缀
pub const ENV_PREFIX: &str = "LORN_DI";
/// 环境变量中的层级分隔符
pub const ENV_SEPARATOR: &str = "__";

/// 组合层配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionSettings {
    /// 容器配置
    pub container: ContainerConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

impl CompositionSettings {
    /// 从配置文件和环境变量加载
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        debug!("加载组合层配置: {}", path.display());

        let builder = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(Self::environment());
        Self::finish(builder)
    }

    /// 只从环境变量加载，未设置的项使用默认值
    pub fn from_env() -> ConfigResult<Self> {
        Self::finish(config::Config::builder().add_source(Self::environment()))
    }

    /// 从 TOML 文本加载（不读取环境变量）
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Toml));
        Self::finish(builder)
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.container.max_resolution_depth == 0 {
            return Err(ConfigError::ValidationError {
                message: "container.max_resolution_depth 必须大于 0".to_string(),
            });
        }
        self.logging.validate()
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> ConfigResult<Self> {
        let settings: Self = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }
}
