//! 键控列表：保序序列 + 惰性派生的键索引。
//!
//! # 设计意图（Why）
//! - 生成代码经常需要“按声明顺序遍历、按键查找”两种访问方式并存；
//! - 索引是纯缓存：从序列随时可重建，绝不是事实来源；惰性构建保证只付
//!   一次代价且仅在首次按键访问时支付；
//! - 身份共享纪律：用相同键路径从一个既有键控列表重建时，直接共享底层
//!   序列（`Arc`），既不复制也不重建索引；键路径不同才做防御性拷贝。
//!
//! # 并发契约（What）
//! - 索引通过 [`spin::Once`] 原子发布：并发触发的冗余计算结果一致，发布后
//!   所有读者观察到同一份索引；
//! - 列表一经构造即不可变。

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;

use spin::Once;

/// 键控列表：不可变的保序序列，附带按键查找的惰性索引。
///
/// 键由声明的键路径（`key_spec` 字符串 + 提取函数）从元素派生；重复键时
/// 位置靠后的元素胜出。
pub struct KeyedList<E, K: Ord> {
    inner: Arc<KeyedInner<E, K>>,
}

struct KeyedInner<E, K: Ord> {
    items: Vec<E>,
    key_spec: &'static str,
    get_key: fn(&E) -> K,
    index: Once<BTreeMap<K, usize>>,
}

impl<E, K: Ord> KeyedList<E, K> {
    /// 从元素序列构造键控列表。
    pub fn new(items: Vec<E>, key_spec: &'static str, get_key: fn(&E) -> K) -> Self {
        Self {
            inner: Arc::new(KeyedInner {
                items,
                key_spec,
                get_key,
                index: Once::new(),
            }),
        }
    }

    /// 按声明顺序访问元素。
    pub fn items(&self) -> &[E] {
        &self.inner.items
    }

    /// 元素数量。
    pub fn len(&self) -> usize {
        self.inner.items.len()
    }

    /// 是否为空。
    pub fn is_empty(&self) -> bool {
        self.inner.items.is_empty()
    }

    /// 声明的键路径。
    pub fn key_spec(&self) -> &'static str {
        self.inner.key_spec
    }

    /// 按声明顺序迭代。
    pub fn iter(&self) -> core::slice::Iter<'_, E> {
        self.inner.items.iter()
    }

    /// 按键查找元素；重复键时返回位置最靠后的元素。
    pub fn get(&self, key: &K) -> Option<&E> {
        let index = self.inner.index.call_once(|| {
            let mut map = BTreeMap::new();
            for (position, item) in self.inner.items.iter().enumerate() {
                map.insert((self.inner.get_key)(item), position);
            }
            map
        });
        index.get(key).map(|position| &self.inner.items[*position])
    }

    /// 两个列表是否共享同一份底层序列。
    pub fn shares_backing_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<E: Clone, K: Ord> KeyedList<E, K> {
    /// 用给定键路径从既有键控列表重建。
    ///
    /// # 契约说明（What）
    /// - 源列表已按**相同**的非空键路径构建时，直接共享底层序列并跳过索引
    ///   重建（零拷贝）；
    /// - 键路径不同（或为空）时，拷贝一份序列并重新构造。
    pub fn rekey(source: &Self, key_spec: &'static str, get_key: fn(&E) -> K) -> Self {
        if !key_spec.is_empty()
            && source.inner.key_spec == key_spec
            && core::ptr::fn_addr_eq(source.inner.get_key, get_key)
        {
            Self {
                inner: Arc::clone(&source.inner),
            }
        } else {
            Self::new(source.inner.items.to_vec(), key_spec, get_key)
        }
    }
}

impl<E, K: Ord> Clone for KeyedList<E, K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: PartialEq, K: Ord> PartialEq for KeyedList<E, K> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.items == other.inner.items
    }
}

impl<E: Eq, K: Ord> Eq for KeyedList<E, K> {}

impl<E: core::fmt::Debug, K: Ord> core::fmt::Debug for KeyedList<E, K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.inner.items.iter()).finish()
    }
}

impl<'a, E, K: Ord> IntoIterator for &'a KeyedList<E, K> {
    type Item = &'a E;
    type IntoIter = core::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::{String, ToString};
    use alloc::vec;

    fn first_char(item: &String) -> String {
        item.chars().next().map(|c| c.to_string()).unwrap_or_default()
    }

    fn full(item: &String) -> String {
        item.clone()
    }

    #[test]
    fn lookup_returns_last_occurrence_on_duplicate_keys() {
        let list = KeyedList::new(
            vec!["apple".to_string(), "avocado".to_string()],
            "first",
            first_char,
        );
        // Why: 重复键的胜出规则必须是“靠后者胜”，与派生索引的覆盖写一致。
        assert_eq!(list.get(&"a".to_string()), Some(&"avocado".to_string()));
        assert_eq!(list.get(&"z".to_string()), None);
        assert_eq!(list.items().len(), 2);
    }

    #[test]
    fn rekey_with_same_path_shares_the_backing() {
        let source = KeyedList::new(vec!["apple".to_string()], "first", first_char);
        let same = KeyedList::rekey(&source, "first", first_char);
        assert!(same.shares_backing_with(&source));

        let different = KeyedList::rekey(&source, "full", full);
        assert!(!different.shares_backing_with(&source));
        assert_eq!(different.items(), source.items());
    }

    #[test]
    fn empty_key_spec_never_shares() {
        let source = KeyedList::new(vec!["apple".to_string()], "", first_char);
        let copy = KeyedList::rekey(&source, "", first_char);
        assert!(!copy.shares_backing_with(&source));
    }
}
