//! # Dependency Injection Abstractions
//!
//! 依赖注入抽象层，定义模块注册、组件解析和生命周期作用域的核心接口。
//!
//! ## 核心接口
//!
//! - [`Module`] - 一组相关注册的打包单元
//! - [`ComponentRegistry`] - 组件注册表接口（模块在其上注册服务）
//! - [`ComponentResolver`] - 组件解析器接口
//! - [`LifetimeScope`] - 可以创建子作用域的生命周期作用域
//! - [`TypeList`] / [`TypeAndFactoryList`] - 不实例化即可枚举某服务的全部实现

pub mod container;
pub mod factory;
pub mod lists;
pub mod module;
pub mod registry;
pub mod resolver;

pub use container::*;
pub use factory::*;
pub use lists::*;
pub use module::*;
pub use registry::*;
pub use resolver::*;
