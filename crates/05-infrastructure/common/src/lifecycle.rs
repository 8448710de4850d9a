//! 组件生命周期定义

use serde::{Deserialize, Serialize};

/// 组件生命周期类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Lifetime {
    /// 单例模式 - 在注册所在的作用域内只创建一个实例
    Singleton,
    /// 作用域模式 - 在同一解析作用域内共享实例
    Scoped,
    /// 瞬时模式 - 每次请求都创建新实例
    #[default]
    Transient,
}

impl Lifetime {
    /// 是否需要缓存实例
    pub fn is_shared(&self) -> bool {
        !matches!(self, Self::Transient)
    }
}
