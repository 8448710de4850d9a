//! 元数据定义
//!
//! 提供类型的元数据信息

use std::any::TypeId;
use std::fmt;

/// 类型信息
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    /// 类型名称
    pub name: String,
    /// 类型ID
    pub id: TypeId,
    /// 完整类型路径
    pub module_path: String,
}

impl TypeInfo {
    /// 从类型获取类型信息
    ///
    /// 支持 `dyn Trait` 等非固定大小类型，便于以 trait 作为服务键。
    pub fn of<T: ?Sized + 'static>() -> Self {
        let full_name = std::any::type_name::<T>();
        Self {
            name: Self::shorten(full_name),
            id: TypeId::of::<T>(),
            module_path: full_name.to_string(),
        }
    }

    /// 获取简短的类型名称（不包含模块路径）
    pub fn short_name(&self) -> &str {
        &self.name
    }

    /// 判断是否为指定类型
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    fn shorten(full_name: &str) -> String {
        // 泛型参数中也可能包含路径，只截取最外层
        let outer = full_name.split('<').next().unwrap_or(full_name);
        let short = outer.rsplit("::").next().unwrap_or(outer);
        let prefix = if full_name.starts_with("dyn ") && !short.starts_with("dyn ") {
            "dyn "
        } else {
            ""
        };
        format!("{}{}{}", prefix, short, &full_name[outer.len()..])
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.module_path)
    }
}
