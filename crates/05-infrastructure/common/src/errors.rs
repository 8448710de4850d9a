//! 错误类型定义

use thiserror::Error;

/// 类型擦除的错误，用于承载外部回调抛出的任意错误
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置加载失败: {source}")]
    LoadError {
        #[from]
        source: config::ConfigError,
    },

    #[error("配置验证失败: {message}")]
    ValidationError { message: String },
}

/// 依赖注入错误类型
#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("组件未注册: {type_name}")]
    ComponentNotRegistered { type_name: String },

    #[error("组件创建失败: {type_name}, 原因: {source}")]
    ComponentCreationFailed {
        type_name: String,
        source: BoxError,
    },

    #[error("循环依赖检测到: {dependency_chain}")]
    CircularDependency { dependency_chain: String },

    #[error("依赖解析深度超过限制: {type_name}, 最大深度: {max_depth}")]
    ResolutionDepthExceeded { type_name: String, max_depth: usize },

    #[error("组件注册失败: {type_name}, 原因: {message}")]
    RegistrationError { type_name: String, message: String },

    #[error("作用域已释放: {scope}")]
    ScopeDisposed { scope: String },

    #[error("无效的注册配置: {message}")]
    InvalidConfiguration { message: String },
}

impl DependencyError {
    /// 创建组件创建失败错误
    pub fn creation_failed(
        type_name: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::ComponentCreationFailed {
            type_name: type_name.into(),
            source: source.into(),
        }
    }

    /// 创建注册失败错误
    pub fn registration_error(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RegistrationError {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// 创建无效配置错误
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }
}

/// 嵌套作用域组合错误类型
#[derive(Error, Debug)]
pub enum CompositionError {
    #[error("操作已取消")]
    Canceled,

    #[error(transparent)]
    Dependency(#[from] DependencyError),
}

impl CompositionError {
    /// 是否由取消请求导致
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}

/// 作用域校验错误类型
///
/// 校验方法可以直接返回 [`VerificationError::Failed`]，其余任何错误都会被校验管道
/// 包装为 `Failed` 并保留原始错误作为 `source`。`Canceled` 表示调用方主动取消，
/// 永远不会被包装。
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("{message}")]
    Failed {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("校验操作已取消")]
    Canceled,
}

impl VerificationError {
    /// 创建不带内部错误的校验失败
    pub fn new(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带内部错误的校验失败
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Failed {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 将校验方法 `routine` 抛出的任意错误归一化为校验错误
    ///
    /// 已经是 `VerificationError` 的错误原样返回，不会重复包装。
    pub fn wrap(routine: &str, error: BoxError) -> Self {
        match error.downcast::<VerificationError>() {
            Ok(verification_error) => *verification_error,
            Err(other) => Self::Failed {
                message: format!("执行校验方法 {} 时发生异常，详情请查看内部错误", routine),
                source: Some(other),
            },
        }
    }

    /// 是否由取消请求导致
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// 获取内部错误
    pub fn inner(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Failed { source, .. } => source.as_deref(),
            Self::Canceled => None,
        }
    }
}

/// 基础设施错误类型
#[derive(Error, Debug)]
pub enum InfrastructureError {
    #[error("配置错误: {source}")]
    ConfigError {
        #[from]
        source: ConfigError,
    },

    #[error("依赖注入错误: {source}")]
    DependencyError {
        #[from]
        source: DependencyError,
    },

    #[error("作用域组合错误: {source}")]
    CompositionError {
        #[from]
        source: CompositionError,
    },

    #[error("作用域校验错误: {source}")]
    VerificationError {
        #[from]
        source: VerificationError,
    },

    #[error("基础设施启动失败: {message}")]
    BootstrapFailed { message: String },
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type DependencyResult<T> = Result<T, DependencyError>;
pub type CompositionResult<T> = Result<T, CompositionError>;
pub type VerificationOutcome<T> = Result<T, VerificationError>;
pub type InfrastructureResult<T> = Result<T, InfrastructureError>;
