//! `full_name.soia` 的生成风格绑定：带已移除编号与编号空洞的结构体。

use std::sync::LazyLock;

use soia_core::unrecognized::UnrecognizedFields;
use soia_core::{Serializer, StructBuilder, serializers};

/// 冻结的 `FullName`：字段编号 0 与 3，编号 1、2 已移除。
///
/// 相等性与哈希只比较已识别字段；未识别尾部不参与。
#[derive(Debug, Clone, Default)]
pub struct FullName {
    /// 名（编号 0）。
    pub first_name: String,
    /// 姓（编号 3）。
    pub last_name: String,
    unrecognized: Option<UnrecognizedFields>,
}

/// `FullName` 的可变伴生。
#[derive(Debug, Default)]
pub struct MutableFullName {
    /// 名。
    pub first_name: String,
    /// 姓。
    pub last_name: String,
    unrecognized: Option<UnrecognizedFields>,
}

impl FullName {
    /// 全字段构造。
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            unrecognized: None,
        }
    }

    /// 转出可变伴生。
    pub fn to_mutable(&self) -> MutableFullName {
        MutableFullName {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            unrecognized: self.unrecognized.clone(),
        }
    }

    /// 进程级注册好的序列化器句柄。
    pub fn serializer() -> Serializer<FullName> {
        SERIALIZER.clone()
    }
}

impl MutableFullName {
    /// 冻结为不可变形态。
    pub fn to_frozen(self) -> FullName {
        FullName {
            first_name: self.first_name,
            last_name: self.last_name,
            unrecognized: self.unrecognized,
        }
    }
}

impl PartialEq for FullName {
    fn eq(&self, other: &Self) -> bool {
        self.first_name == other.first_name && self.last_name == other.last_name
    }
}

impl Eq for FullName {}

impl std::hash::Hash for FullName {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.first_name.hash(state);
        self.last_name.hash(state);
    }
}

static SERIALIZER: LazyLock<Serializer<FullName>> = LazyLock::new(|| {
    let mut builder = StructBuilder::<FullName, MutableFullName>::new(
        "full_name.soia:FullName",
        FullName::default,
        MutableFullName::default,
        MutableFullName::to_frozen,
        |frozen| frozen.unrecognized.as_ref(),
        |mutable, unrecognized| mutable.unrecognized = Some(unrecognized),
    );
    builder
        .add_field(
            "first_name",
            0,
            serializers::string(),
            |frozen: &FullName| &frozen.first_name,
            |mutable: &mut MutableFullName, value| mutable.first_name = value,
        )
        .expect("register FullName.first_name");
    builder
        .add_removed_number(1)
        .expect("remove FullName number 1");
    builder
        .add_removed_number(2)
        .expect("remove FullName number 2");
    builder
        .add_field(
            "last_name",
            3,
            serializers::string(),
            |frozen: &FullName| &frozen.last_name,
            |mutable: &mut MutableFullName, value| mutable.last_name = value,
        )
        .expect("register FullName.last_name");
    builder.finalize().expect("finalize FullName")
});
