//! 模块分组
//!
//! 每个分组在构建时对应一层子作用域，分组顺序即作用域的嵌套顺序。

use di_abstractions::{same_module, ModuleHandle};
use std::fmt;
use std::hash::{Hash, Hasher};

/// 前置锚点分组的名称前缀
pub const BEFORE_PREFIX: &str = "Before";
/// 后置锚点分组的名称前缀
pub const AFTER_PREFIX: &str = "After";

/// 具名的模块分组
///
/// 分组的相等性只由名称决定。
#[derive(Clone)]
pub struct ModuleGroup {
    name: String,
    modules: Vec<ModuleHandle>,
}

impl ModuleGroup {
    /// 创建空分组
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modules: Vec::new(),
        }
    }

    /// 分组名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 分组中的模块，按加入顺序排列
    pub fn modules(&self) -> &[ModuleHandle] {
        &self.modules
    }

    /// 是否包含指定模块
    pub fn contains(&self, module: &ModuleHandle) -> bool {
        self.modules.iter().any(|m| same_module(m, module))
    }

    fn remove(&mut self, module: &ModuleHandle) {
        self.modules.retain(|m| !same_module(m, module));
    }
}

impl PartialEq for ModuleGroup {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ModuleGroup {}

impl Hash for ModuleGroup {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Debug for ModuleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleGroup")
            .field("name", &self.name)
            .field(
                "modules",
                &self.modules.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// 模块放入分组的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// 首次加入分组
    Added,
    /// 从较后的分组移动到目标分组
    Moved {
        /// 原分组名称
        from: String,
    },
    /// 模块已在相同或更靠前的分组中，或者目标分组尚不存在
    Unchanged,
}

/// 有序的模块分组集合
///
/// 名称在集合内唯一，同一个模块句柄最多出现在一个分组中。
#[derive(Debug, Clone, Default)]
pub struct ModuleGroups {
    groups: Vec<ModuleGroup>,
}

impl ModuleGroups {
    /// 创建空集合
    pub fn new() -> Self {
        Self::default()
    }

    /// 按名称查找分组位置
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.groups.iter().position(|group| group.name == name)
    }

    /// 按名称获取分组
    pub fn get(&self, name: &str) -> Option<&ModuleGroup> {
        self.groups.iter().find(|group| group.name == name)
    }

    /// 查找包含指定模块的分组位置
    pub fn position_of_module(&self, module: &ModuleHandle) -> Option<usize> {
        self.groups.iter().position(|group| group.contains(module))
    }

    /// 把模块放入目标分组
    ///
    /// - 模块不在任何分组中：追加到目标分组，目标分组不存在时在末尾创建
    /// - 模块位于目标分组之后：从原分组移除（原分组变空时删除），追加到目标分组
    /// - 其余情况不做任何修改
    pub fn place(&mut self, module: &ModuleHandle, target: &str) -> Placement {
        let Some(current) = self.position_of_module(module) else {
            let index = self.ensure(target);
            self.groups[index].modules.push(module.clone());
            return Placement::Added;
        };

        let Some(target_index) = self.index_of(target) else {
            return Placement::Unchanged;
        };
        if current <= target_index {
            return Placement::Unchanged;
        }

        let source = &mut self.groups[current];
        source.remove(module);
        let from = source.name.clone();
        if source.modules.is_empty() {
            self.groups.remove(current);
        }
        // current > target_index，删除原分组不影响目标位置
        self.groups[target_index].modules.push(module.clone());
        Placement::Moved { from }
    }

    /// 确保 `name` 之前存在前置锚点分组，返回锚点分组名称
    pub fn anchor_before(&mut self, name: &str) -> String {
        let before = format!("{BEFORE_PREFIX}{name}");
        match self.index_of(name) {
            None => {
                self.ensure(&before);
                self.ensure(name);
            }
            Some(index) => {
                if self.index_of(&before).is_none() {
                    self.groups.insert(index, ModuleGroup::new(before.clone()));
                }
            }
        }
        before
    }

    /// 确保 `name` 之后存在后置锚点分组，返回锚点分组名称
    ///
    /// 注意：`name` 位于第一个位置时不会插入锚点分组，
    /// 锚点分组随后由 [`place`](Self::place) 在末尾创建。
    pub fn anchor_after(&mut self, name: &str) -> String {
        let after = format!("{AFTER_PREFIX}{name}");
        match self.index_of(name) {
            None => {
                self.ensure(name);
                self.ensure(&after);
            }
            Some(index) => {
                if index > 0 && self.index_of(&after).is_none() {
                    self.groups.insert(index + 1, ModuleGroup::new(after.clone()));
                }
            }
        }
        after
    }

    /// 清空全部分组
    pub fn clear(&mut self) {
        self.groups.clear();
    }

    /// 按顺序遍历分组
    pub fn iter(&self) -> std::slice::Iter<'_, ModuleGroup> {
        self.groups.iter()
    }

    /// 分组名称列表
    pub fn names(&self) -> Vec<&str> {
        self.groups.iter().map(|group| group.name.as_str()).collect()
    }

    /// 分组数量
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// 是否没有分组
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// 确保分组存在，返回其位置
    fn ensure(&mut self, name: &str) -> usize {
        match self.index_of(name) {
            Some(index) => index,
            None => {
                self.groups.push(ModuleGroup::new(name));
                self.groups.len() - 1
            }
        }
    }
}

impl<'a> IntoIterator for &'a ModuleGroups {
    type Item = &'a ModuleGroup;
    type IntoIter = std::slice::Iter<'a, ModuleGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
