//! # Infrastructure Common
//!
//! 依赖注入扩展的公共基础类型。
//!
//! ## 核心内容
//!
//! - [`errors`] - 统一的错误分类（依赖注入、作用域组合、作用域校验、配置）
//! - [`TypeInfo`] - 类型元数据
//! - [`Lifetime`] - 组件生命周期

pub mod errors;
pub mod lifecycle;
pub mod metadata;

pub use errors::*;
pub use lifecycle::*;
pub use metadata::*;
