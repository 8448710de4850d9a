//! # 依赖注入具体实现
//!
//! 提供容器构建器和生命周期作用域的具体实现。
//!
//! ```rust,ignore
//! use di_abstractions::{ComponentRegistryExt, ResolverExt};
//! use infrastructure_common::Lifetime;
//! use di_impl::ContainerBuilder;
//!
//! let mut builder = ContainerBuilder::new();
//! builder.register_instance(Arc::new(Settings::default()));
//! let root = builder.build();
//! let child = root.begin_lifetime_scope("request", |builder| {
//!     builder.register_self::<RequestContext>(Lifetime::Scoped);
//!     Ok(())
//! })?;
//! let settings = child.resolve::<Settings>()?;
//! ```

pub mod builder;
mod resolver;
pub mod scope;

pub use builder::ContainerBuilder;
pub use scope::{LifetimeScopeImpl, ROOT_TAG};
