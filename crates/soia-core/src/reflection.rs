//! 反射面：由注册表派生的类型描述文档。
//!
//! # 设计意图（Why）
//! - 通用工具（调试器、网关、模式巡检）需要在不链接生成代码的情况下了解
//!   记录类型的结构：种类（struct/enum）、限定 id、字段/变体编号与嵌套引用、
//!   已移除编号；
//! - 文档由编解码注册表走查产出，与编码路径共享同一份事实来源；编解码器
//!   自身从不消费该文档。
//!
//! # 契约说明（What）
//! - JSON 形态为 `{"type": <签名>, "records": [<记录>...]}`；签名节点统一为
//!   `{"kind": ..., "value": ...}` 包络；记录按“根记录优先、依赖深度优先”的
//!   走查顺序排列；
//! - [`TypeDescriptor::from_json`] 将文档解析回结构化模型，打印-解析-打印为
//!   恒等变换。

use alloc::borrow::ToOwned;
use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use serde_json::{Map, Value, json};

use crate::error::{Result, SoiaError, codes};

/// 类型签名：描述一个字段/负载位置上的类型引用。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSignature {
    /// 原语类型，值为稳定名（`"bool"`、`"int32"`、`"timestamp"` 等）。
    Primitive(String),
    /// 可选包装。
    Optional(Box<TypeSignature>),
    /// 有序序列（含键控列表）。
    Array(Box<TypeSignature>),
    /// 对记录类型的引用，值为 `modulePath:QualifiedName` 形式的 id。
    Record(String),
}

impl TypeSignature {
    fn to_json(&self) -> Value {
        match self {
            TypeSignature::Primitive(name) => json!({ "kind": "primitive", "value": name }),
            TypeSignature::Optional(inner) => json!({ "kind": "optional", "value": inner.to_json() }),
            TypeSignature::Array(item) => json!({ "kind": "array", "value": item.to_json() }),
            TypeSignature::Record(id) => json!({ "kind": "record", "value": id }),
        }
    }

    fn from_json(json: &Value) -> Result<Self> {
        let object = json.as_object().ok_or_else(|| invalid("type signature must be an object"))?;
        let kind = object
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("type signature is missing a string `kind`"))?;
        let value = object
            .get("value")
            .ok_or_else(|| invalid("type signature is missing `value`"))?;
        match kind {
            "primitive" => Ok(TypeSignature::Primitive(
                value
                    .as_str()
                    .ok_or_else(|| invalid("primitive signature value must be a string"))?
                    .to_owned(),
            )),
            "optional" => Ok(TypeSignature::Optional(Box::new(Self::from_json(value)?))),
            "array" => Ok(TypeSignature::Array(Box::new(Self::from_json(value)?))),
            "record" => Ok(TypeSignature::Record(
                value
                    .as_str()
                    .ok_or_else(|| invalid("record signature value must be a string"))?
                    .to_owned(),
            )),
            other => Err(invalid_owned(alloc::format!(
                "unknown type signature kind: {other}"
            ))),
        }
    }
}

/// 记录种类。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// 定长字段序列的结构体。
    Struct,
    /// 带保留未知变体的标签联合。
    Enum,
}

/// 一个字段或变体的描述。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// 字段 / 变体名。
    pub name: String,
    /// 永久编号。
    pub number: u32,
    /// 值类型签名；枚举常量变体没有负载，为 `None`。
    pub signature: Option<TypeSignature>,
}

/// 一个记录类型的描述。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDescriptor {
    /// 记录种类。
    pub kind: RecordKind,
    /// `modulePath:QualifiedName` 形式的限定 id。
    pub id: String,
    /// 按编号升序排列的字段 / 变体。
    pub fields: Vec<FieldDescriptor>,
    /// 已移除、永不复用的编号。
    pub removed_numbers: Vec<u32>,
}

impl RecordDescriptor {
    /// 记录的非限定名（id 冒号后最后一个 `.` 段）。
    pub fn name(&self) -> &str {
        let qualified = self.qualified_name();
        qualified.rsplit('.').next().unwrap_or(qualified)
    }

    /// 记录的限定名（id 冒号之后的部分）。
    pub fn qualified_name(&self) -> &str {
        self.id.split_once(':').map_or(self.id.as_str(), |(_, name)| name)
    }

    /// 记录所在的模块路径（id 冒号之前的部分）。
    pub fn module_path(&self) -> &str {
        self.id.split_once(':').map_or("", |(path, _)| path)
    }

    fn to_json(&self) -> Value {
        let mut object = Map::new();
        object.insert(
            "kind".to_string(),
            Value::from(match self.kind {
                RecordKind::Struct => "struct",
                RecordKind::Enum => "enum",
            }),
        );
        object.insert("id".to_string(), Value::from(self.id.as_str()));
        let fields: Vec<Value> = self
            .fields
            .iter()
            .map(|field| {
                let mut node = Map::new();
                node.insert("name".to_string(), Value::from(field.name.as_str()));
                node.insert("number".to_string(), Value::from(field.number));
                if let Some(signature) = &field.signature {
                    node.insert("type".to_string(), signature.to_json());
                }
                Value::Object(node)
            })
            .collect();
        object.insert("fields".to_string(), Value::Array(fields));
        if !self.removed_numbers.is_empty() {
            object.insert(
                "removed_fields".to_string(),
                Value::Array(self.removed_numbers.iter().map(|n| Value::from(*n)).collect()),
            );
        }
        Value::Object(object)
    }

    fn from_json(json: &Value) -> Result<Self> {
        let object = json.as_object().ok_or_else(|| invalid("record must be an object"))?;
        let kind = match object.get("kind").and_then(Value::as_str) {
            Some("struct") => RecordKind::Struct,
            Some("enum") => RecordKind::Enum,
            _ => return Err(invalid("record kind must be \"struct\" or \"enum\"")),
        };
        let id = object
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("record is missing a string `id`"))?
            .to_owned();
        let mut fields = Vec::new();
        for node in object
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| invalid("record is missing a `fields` array"))?
        {
            let field = node.as_object().ok_or_else(|| invalid("field must be an object"))?;
            let name = field
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| invalid("field is missing a string `name`"))?
                .to_owned();
            let number = field
                .get("number")
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| invalid("field is missing a numeric `number`"))?;
            let signature = match field.get("type") {
                Some(node) => Some(TypeSignature::from_json(node)?),
                None => None,
            };
            fields.push(FieldDescriptor {
                name,
                number,
                signature,
            });
        }
        let mut removed_numbers = Vec::new();
        if let Some(removed) = object.get("removed_fields") {
            for node in removed
                .as_array()
                .ok_or_else(|| invalid("`removed_fields` must be an array"))?
            {
                removed_numbers.push(
                    node.as_u64()
                        .and_then(|n| u32::try_from(n).ok())
                        .ok_or_else(|| invalid("removed field numbers must be numeric"))?,
                );
            }
        }
        Ok(RecordDescriptor {
            kind,
            id,
            fields,
            removed_numbers,
        })
    }
}

/// 一个序列化器的完整类型描述文档。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// 根类型签名。
    pub root: TypeSignature,
    /// 走查顺序排列的所有可达记录。
    pub records: Vec<RecordDescriptor>,
}

impl TypeDescriptor {
    /// 投影为 JSON 文档。
    pub fn to_json(&self) -> Value {
        json!({
            "type": self.root.to_json(),
            "records": self.records.iter().map(RecordDescriptor::to_json).collect::<Vec<_>>(),
        })
    }

    /// 投影为带两空格缩进的 JSON 文本。
    pub fn to_json_code(&self) -> String {
        serde_json::to_string_pretty(&self.to_json()).unwrap_or_default()
    }

    /// 从 JSON 文档解析回结构化描述。
    pub fn from_json(json: &Value) -> Result<Self> {
        let object = json
            .as_object()
            .ok_or_else(|| invalid("descriptor must be an object"))?;
        let root = TypeSignature::from_json(
            object
                .get("type")
                .ok_or_else(|| invalid("descriptor is missing `type`"))?,
        )?;
        let mut records = Vec::new();
        for node in object
            .get("records")
            .and_then(Value::as_array)
            .ok_or_else(|| invalid("descriptor is missing a `records` array"))?
        {
            records.push(RecordDescriptor::from_json(node)?);
        }
        Ok(TypeDescriptor { root, records })
    }

    /// 从 JSON 文本解析回结构化描述。
    pub fn from_json_code(code: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(code)
            .map_err(|err| SoiaError::new(codes::JSON_PARSE, "descriptor text is not valid JSON").with_cause(err))?;
        Self::from_json(&value)
    }

    /// 按 id 查找记录。
    pub fn record(&self, id: &str) -> Option<&RecordDescriptor> {
        self.records.iter().find(|record| record.id == id)
    }
}

/// 记录收集器：保持“根优先、依赖深度优先”的走查顺序，并以 id 去重阻断环。
#[derive(Debug, Default)]
pub(crate) struct RecordSet {
    records: Vec<RecordDescriptor>,
}

impl RecordSet {
    pub(crate) fn contains(&self, id: &str) -> bool {
        self.records.iter().any(|record| record.id == id)
    }

    pub(crate) fn push(&mut self, record: RecordDescriptor) {
        if !self.contains(&record.id) {
            self.records.push(record);
        }
    }

    pub(crate) fn into_records(self) -> Vec<RecordDescriptor> {
        self.records
    }
}

fn invalid(message: &'static str) -> SoiaError {
    SoiaError::new(codes::REFLECTION_INVALID_DESCRIPTOR, message)
}

fn invalid_owned(message: String) -> SoiaError {
    SoiaError::new(codes::REFLECTION_INVALID_DESCRIPTOR, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print_parse_print_is_identity() {
        let descriptor = TypeDescriptor {
            root: TypeSignature::Record("user.soia:User".to_string()),
            records: alloc::vec![RecordDescriptor {
                kind: RecordKind::Struct,
                id: "user.soia:User".to_string(),
                fields: alloc::vec![FieldDescriptor {
                    name: "user_id".to_string(),
                    number: 0,
                    signature: Some(TypeSignature::Primitive("int64".to_string())),
                }],
                removed_numbers: alloc::vec![2, 3],
            }],
        };
        let code = descriptor.to_json_code();
        let reparsed = TypeDescriptor::from_json_code(&code).expect("parse");
        assert_eq!(reparsed, descriptor);
        assert_eq!(reparsed.to_json_code(), code);
    }

    #[test]
    fn record_name_accessors_split_the_id() {
        let record = RecordDescriptor {
            kind: RecordKind::Struct,
            id: "structs.soia:Item.User".to_string(),
            fields: Vec::new(),
            removed_numbers: Vec::new(),
        };
        assert_eq!(record.module_path(), "structs.soia");
        assert_eq!(record.qualified_name(), "Item.User");
        assert_eq!(record.name(), "User");
    }
}
