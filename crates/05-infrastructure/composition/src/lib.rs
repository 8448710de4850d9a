//! # 作用域组合层
//!
//! 在依赖注入容器之上提供两项能力：
//!
//! - **嵌套作用域构建器**: 把模块放入具名、有序的分组，构建时每个分组成为一层子作用域
//! - **作用域校验**: 依次执行注册在作用域中的校验方法，把结果串联为一个异步流
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use di_composition::{NestedScopeBuilder, VerificationScopeExt};
//! use futures::StreamExt;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let token = CancellationToken::new();
//!     let builder = NestedScopeBuilder::default();
//!
//!     // 构建嵌套作用域
//!     let scope = builder.build(&token).await?;
//!
//!     // 执行校验
//!     let mut results = scope.execute_verification_methods(token.clone())?;
//!     while let Some(result) = results.next().await {
//!         println!("{}", result?);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod logging;
pub mod module_group;
pub mod nested_scope_builder;
pub mod settings;
pub mod verification;
pub mod verifier;

#[cfg(test)]
mod tests;

// 重新导出主要类型
pub use logging::{init_logging, LoggingConfig};
pub use module_group::{ModuleGroup, ModuleGroups, Placement, AFTER_PREFIX, BEFORE_PREFIX};
pub use nested_scope_builder::{GroupSpecifier, NestedScopeBuilder};
pub use settings::{CompositionSettings, ENV_PREFIX, ENV_SEPARATOR};
pub use verification::{
    ensure_not_canceled, run_verifications, RoutinePanicked, VerificationDelegate,
    VerificationRegistryExt, VerificationResult, VerificationScopeExt, VerificationStream,
};
pub use verifier::{ScopeVerifier, VerifierRegistryExt};
