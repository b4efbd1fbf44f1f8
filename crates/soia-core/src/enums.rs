//! 枚举（标签联合）编解码：常量变体、带负载变体与保留的未知兜底。
//!
//! # 设计背景（Why）
//! - 每个枚举类型恒有编号 0 的“未知”兜底变体，即使模式作者从不使用：
//!   这是跨版本解码永不失败的前提 —— 未来新增的变体在旧模式下落入未知，
//!   并可按需携带原始字节以便无损回放；
//! - 变体分发采用显式判别钩子（`number_of`）驱动的标签和类型，编解码对
//!   变体集合保持穷尽、编译期可检查，不做运行时类型探测。
//!
//! # 线格式（What）
//! - 常量变体（含无负载的未知）直接以数字标签方案写出编号；
//! - 带负载变体：编号 1..=4 写单字节 `250 + 编号`，更大编号写 `248` +
//!   编号，随后是负载自身的编码；
//! - 解码时，数字域标签命中带负载变体、或负载域标签命中常量变体，都是
//!   硬错误；未知编号消费完整区间（标签、编号与负载）后落入未知变体。

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::ToString;
use alloc::sync::Arc;
use alloc::vec::Vec;

use bytes::Bytes;
use serde_json::Value;
use spin::{Mutex, Once};

use crate::error::{Result, SoiaError, codes};
use crate::reflection::{FieldDescriptor, RecordDescriptor, RecordKind, RecordSet, TypeSignature};
use crate::serializer::{Serializer, SerializerImpl};
use crate::unrecognized::{UnrecognizedEnum, UnrecognizedEnumPayload};
use crate::wire::{Reader, Writer, decode_number, skip_value};

/// 未知兜底变体在可读 JSON 中的名字。
const UNKNOWN_NAME: &str = "?";

/// 枚举序列化器的注册构建器。
///
/// # 使用方式（How）
/// 1. 以记录 id、未知变体钩子与判别钩子创建构建器；
/// 2. 按需调用 [`add_constant`](Self::add_constant) /
///    [`add_value_variant`](Self::add_value_variant) /
///    [`add_removed_number`](Self::add_removed_number)，注册顺序无须与编号
///    一致，但编号必须唯一且不得为保留的 0；
/// 3. [`finalize`](Self::finalize) 原子发布编号表与名字表。
pub struct EnumBuilder<E: Clone> {
    target: Arc<EnumSerializer<E>>,
}

impl<E> EnumBuilder<E>
where
    E: Clone + Send + Sync + 'static,
{
    /// 创建构建器。
    ///
    /// # 契约说明（What）
    /// - `unknown_instance` 是无负载的未知变体实例；
    /// - `wrap_unrecognized` 把捕获的原始内容包装为未知变体实例；
    /// - `get_unrecognized` 从未知变体实例中取回捕获内容（其余变体返回 `None`）；
    /// - `number_of` 返回实例所属变体的编号，未知恒为 0。
    pub fn new(
        record_id: &'static str,
        unknown_instance: E,
        wrap_unrecognized: fn(UnrecognizedEnum) -> E,
        get_unrecognized: fn(&E) -> Option<&UnrecognizedEnum>,
        number_of: fn(&E) -> u32,
    ) -> Self {
        Self {
            target: Arc::new(EnumSerializer {
                record_id,
                unknown_instance,
                wrap_unrecognized,
                get_unrecognized,
                number_of,
                staging: Mutex::new(Some(EnumStaging::default())),
                table: Once::new(),
            }),
        }
    }

    /// 取得（可能尚未发布的）序列化器句柄，供互相递归的类型在注册期引用。
    pub fn serializer(&self) -> Serializer<E> {
        Serializer::from_impl(self.target.clone() as Arc<dyn SerializerImpl<E>>)
    }

    /// 注册一个常量变体。
    pub fn add_constant(&mut self, number: u32, name: &'static str, instance: E) -> Result<()> {
        self.add_variant(number, name, VariantKind::Constant(instance))
    }

    /// 注册一个带负载变体。
    pub fn add_value_variant<T: Send + Sync + 'static>(
        &mut self,
        number: u32,
        name: &'static str,
        serializer: Serializer<T>,
        wrap: fn(T) -> E,
        extract: fn(&E) -> Option<&T>,
    ) -> Result<()> {
        self.add_variant(
            number,
            name,
            VariantKind::Value(Box::new(ValueBinding {
                serializer,
                wrap,
                extract,
            })),
        )
    }

    /// 将一个编号标记为已移除：解码到该编号时落入未知变体，编号永不复用。
    pub fn add_removed_number(&mut self, number: u32) -> Result<()> {
        self.add_variant(number, "", VariantKind::Removed)
    }

    fn add_variant(&mut self, number: u32, name: &'static str, kind: VariantKind<E>) -> Result<()> {
        let mut staging = self.target.staging.lock();
        let staging = staging
            .as_mut()
            .ok_or_else(|| already_finalized(self.target.record_id))?;
        if number == 0 {
            return Err(SoiaError::new(
                codes::SCHEMA_DUPLICATE_NUMBER,
                alloc::format!(
                    "{}: number 0 is reserved for the unknown variant",
                    self.target.record_id
                ),
            ));
        }
        if staging.variants.iter().any(|variant| variant.number == number) {
            return Err(SoiaError::new(
                codes::SCHEMA_DUPLICATE_NUMBER,
                alloc::format!(
                    "{}: number {number} is already registered or removed",
                    self.target.record_id
                ),
            ));
        }
        if !name.is_empty()
            && staging
                .variants
                .iter()
                .any(|variant| variant.name == name)
        {
            return Err(SoiaError::new(
                codes::SCHEMA_DUPLICATE_NUMBER,
                alloc::format!(
                    "{}: variant name {name:?} is already registered",
                    self.target.record_id
                ),
            ));
        }
        staging.variants.push(Variant { number, name, kind });
        Ok(())
    }

    /// 原子发布编号表与名字表；返回可用的序列化器。
    pub fn finalize(self) -> Result<Serializer<E>> {
        let staging = self
            .target
            .staging
            .lock()
            .take()
            .ok_or_else(|| already_finalized(self.target.record_id))?;
        let mut variants = staging.variants;
        variants.sort_by_key(|variant| variant.number);
        let mut number_to_index = BTreeMap::new();
        let mut name_to_index = BTreeMap::new();
        for (index, variant) in variants.iter().enumerate() {
            number_to_index.insert(variant.number, index);
            if !variant.name.is_empty() {
                name_to_index.insert(variant.name, index);
            }
        }
        self.target.table.call_once(|| EnumTable {
            variants,
            number_to_index,
            name_to_index,
        });
        Ok(self.serializer())
    }
}

fn already_finalized(record_id: &str) -> SoiaError {
    SoiaError::new(
        codes::SCHEMA_ALREADY_FINALIZED,
        alloc::format!("{record_id} is already finalized"),
    )
}

/// 带负载变体的类型擦除编解码入口。
trait VariantCodec<E>: Send + Sync {
    fn encode_payload(&self, instance: &E, out: &mut Writer) -> Result<()>;
    fn decode_wrapped(&self, reader: &mut Reader<'_>, keep: bool) -> Result<E>;
    fn payload_to_json(&self, instance: &E, readable_flavor: bool) -> Result<Value>;
    fn wrap_from_json(&self, json: &Value, keep: bool) -> Result<E>;
    fn type_signature(&self) -> TypeSignature;
    fn collect_records(&self, records: &mut RecordSet) -> Result<()>;
}

struct ValueBinding<E, T> {
    serializer: Serializer<T>,
    wrap: fn(T) -> E,
    extract: fn(&E) -> Option<&T>,
}

impl<E, T: Send + Sync + 'static> VariantCodec<E> for ValueBinding<E, T> {
    fn encode_payload(&self, instance: &E, out: &mut Writer) -> Result<()> {
        let payload = (self.extract)(instance).ok_or_else(|| {
            SoiaError::new(
                codes::SCHEMA_VARIANT_MISMATCH,
                "instance does not carry the payload its number points at",
            )
        })?;
        self.serializer.implementation().encode(payload, out)
    }

    fn decode_wrapped(&self, reader: &mut Reader<'_>, keep: bool) -> Result<E> {
        let payload = self.serializer.implementation().decode(reader, keep)?;
        Ok((self.wrap)(payload))
    }

    fn payload_to_json(&self, instance: &E, readable_flavor: bool) -> Result<Value> {
        let payload = (self.extract)(instance).ok_or_else(|| {
            SoiaError::new(
                codes::SCHEMA_VARIANT_MISMATCH,
                "instance does not carry the payload its number points at",
            )
        })?;
        self.serializer
            .implementation()
            .to_json(payload, readable_flavor)
    }

    fn wrap_from_json(&self, json: &Value, keep: bool) -> Result<E> {
        let payload = self.serializer.implementation().from_json(json, keep)?;
        Ok((self.wrap)(payload))
    }

    fn type_signature(&self) -> TypeSignature {
        self.serializer.implementation().type_signature()
    }

    fn collect_records(&self, records: &mut RecordSet) -> Result<()> {
        self.serializer.implementation().collect_records(records)
    }
}

enum VariantKind<E> {
    Constant(E),
    Value(Box<dyn VariantCodec<E>>),
    Removed,
}

struct Variant<E> {
    number: u32,
    name: &'static str,
    kind: VariantKind<E>,
}

struct EnumStaging<E> {
    variants: Vec<Variant<E>>,
}

impl<E> Default for EnumStaging<E> {
    fn default() -> Self {
        Self {
            variants: Vec::new(),
        }
    }
}

struct EnumTable<E> {
    variants: Vec<Variant<E>>,
    number_to_index: BTreeMap<u32, usize>,
    name_to_index: BTreeMap<&'static str, usize>,
}

impl<E> EnumTable<E> {
    fn by_number(&self, number: u32) -> Option<&Variant<E>> {
        self.number_to_index
            .get(&number)
            .map(|index| &self.variants[*index])
    }

    fn by_name(&self, name: &str) -> Option<&Variant<E>> {
        self.name_to_index
            .get(name)
            .map(|index| &self.variants[*index])
    }
}

struct EnumSerializer<E: Clone> {
    record_id: &'static str,
    unknown_instance: E,
    wrap_unrecognized: fn(UnrecognizedEnum) -> E,
    get_unrecognized: fn(&E) -> Option<&UnrecognizedEnum>,
    number_of: fn(&E) -> u32,
    staging: Mutex<Option<EnumStaging<E>>>,
    table: Once<EnumTable<E>>,
}

impl<E: Clone> EnumSerializer<E> {
    fn table(&self) -> Result<&EnumTable<E>> {
        self.table.get().ok_or_else(|| {
            SoiaError::new(
                codes::SCHEMA_NOT_FINALIZED,
                alloc::format!("{} is not finalized yet", self.record_id),
            )
        })
    }

    fn variant_mismatch(&self, number: i64, expected: &'static str) -> SoiaError {
        SoiaError::new(
            codes::DECODE_UNEXPECTED_WIRE,
            alloc::format!("{}: {number} refers to {expected}", self.record_id),
        )
    }
}

impl<E> SerializerImpl<E> for EnumSerializer<E>
where
    E: Clone + Send + Sync + 'static,
{
    fn is_default(&self, value: &E) -> Result<bool> {
        Ok((self.number_of)(value) == 0 && (self.get_unrecognized)(value).is_none())
    }

    fn default_value(&self) -> Result<E> {
        Ok(self.unknown_instance.clone())
    }

    fn encode(&self, input: &E, out: &mut Writer) -> Result<()> {
        let table = self.table()?;
        let number = (self.number_of)(input);
        if number == 0 {
            match (self.get_unrecognized)(input).map(|u| &u.payload) {
                Some(UnrecognizedEnumPayload::Bytes(bytes)) => out.write_slice(bytes),
                // JSON 形态的捕获对二进制不可回放（格式粘性），写无负载未知。
                _ => out.write_u8(0),
            }
            return Ok(());
        }
        let variant = table.by_number(number).ok_or_else(|| {
            SoiaError::new(
                codes::SCHEMA_VARIANT_MISMATCH,
                alloc::format!(
                    "{}: instance reports unregistered variant number {number}",
                    self.record_id
                ),
            )
        })?;
        match &variant.kind {
            VariantKind::Constant(_) | VariantKind::Removed => {
                out.encode_int32(number as i32);
                Ok(())
            }
            VariantKind::Value(codec) => {
                if number < 5 {
                    out.write_u8(250 + number as u8);
                } else {
                    out.write_u8(248);
                    out.encode_int32(number as i32);
                }
                codec.encode_payload(input, out)
            }
        }
    }

    fn decode(&self, reader: &mut Reader<'_>, keep: bool) -> Result<E> {
        let table = self.table()?;
        let start = reader.position();
        let lead = reader.peek_u8()?;
        if lead < 242 {
            // 数字域：常量变体、已移除编号或未知编号。
            let number = decode_number(reader)?.as_i64();
            let variant = u32::try_from(number).ok().and_then(|n| table.by_number(n));
            match variant {
                Some(Variant {
                    kind: VariantKind::Constant(instance),
                    ..
                }) => Ok(instance.clone()),
                Some(Variant {
                    kind: VariantKind::Removed,
                    ..
                }) => Ok(self.unknown_instance.clone()),
                Some(Variant {
                    kind: VariantKind::Value(_),
                    ..
                }) => Err(self.variant_mismatch(number, "a value variant")),
                None if number == 0 => Ok(self.unknown_instance.clone()),
                None => {
                    if keep {
                        let bytes =
                            Bytes::copy_from_slice(reader.slice_between(start, reader.position()));
                        Ok((self.wrap_unrecognized)(UnrecognizedEnum::from_bytes(bytes)))
                    } else {
                        Ok(self.unknown_instance.clone())
                    }
                }
            }
        } else {
            // 负载域：248 + 显式编号，或 251..=254 的紧凑编号。
            let number = match lead {
                248 => {
                    reader.read_u8()?;
                    decode_number(reader)?.as_i64()
                }
                251..=254 => {
                    reader.read_u8()?;
                    i64::from(lead) - 250
                }
                wire => {
                    return Err(SoiaError::new(
                        codes::DECODE_UNEXPECTED_WIRE,
                        alloc::format!(
                            "{}: expected an enum, wire byte: {wire}",
                            self.record_id
                        ),
                    ));
                }
            };
            let variant = u32::try_from(number).ok().and_then(|n| table.by_number(n));
            match variant {
                Some(Variant {
                    kind: VariantKind::Value(codec),
                    ..
                }) => codec.decode_wrapped(reader, keep),
                Some(Variant {
                    kind: VariantKind::Removed,
                    ..
                }) => {
                    // 墓碑编号：负载必须被消费，否则后续槽位会错位。
                    skip_value(reader)?;
                    Ok(self.unknown_instance.clone())
                }
                Some(Variant {
                    kind: VariantKind::Constant(_),
                    ..
                }) => Err(self.variant_mismatch(number, "a constant variant")),
                None => {
                    skip_value(reader)?;
                    if keep {
                        let bytes =
                            Bytes::copy_from_slice(reader.slice_between(start, reader.position()));
                        Ok((self.wrap_unrecognized)(UnrecognizedEnum::from_bytes(bytes)))
                    } else {
                        Ok(self.unknown_instance.clone())
                    }
                }
            }
        }
    }

    fn to_json(&self, input: &E, readable_flavor: bool) -> Result<Value> {
        let table = self.table()?;
        let number = (self.number_of)(input);
        if number == 0 {
            return Ok(if readable_flavor {
                Value::from(UNKNOWN_NAME)
            } else {
                match (self.get_unrecognized)(input).map(|u| &u.payload) {
                    Some(UnrecognizedEnumPayload::Json(json)) => json.clone(),
                    _ => Value::from(0),
                }
            });
        }
        let variant = table.by_number(number).ok_or_else(|| {
            SoiaError::new(
                codes::SCHEMA_VARIANT_MISMATCH,
                alloc::format!(
                    "{}: instance reports unregistered variant number {number}",
                    self.record_id
                ),
            )
        })?;
        match &variant.kind {
            VariantKind::Constant(_) | VariantKind::Removed => Ok(if readable_flavor {
                Value::from(variant.name)
            } else {
                Value::from(variant.number)
            }),
            VariantKind::Value(codec) => {
                let payload = codec.payload_to_json(input, readable_flavor)?;
                Ok(if readable_flavor {
                    serde_json::json!({ "kind": variant.name, "value": payload })
                } else {
                    Value::Array(alloc::vec![Value::from(variant.number), payload])
                })
            }
        }
    }

    fn from_json(&self, json: &Value, keep: bool) -> Result<E> {
        let table = self.table()?;
        match json {
            Value::Number(number) => {
                let wide = number.as_i64().unwrap_or(-1);
                if wide == 0 {
                    return Ok(self.unknown_instance.clone());
                }
                match u32::try_from(wide).ok().and_then(|n| table.by_number(n)) {
                    Some(Variant {
                        kind: VariantKind::Constant(instance),
                        ..
                    }) => Ok(instance.clone()),
                    Some(Variant {
                        kind: VariantKind::Removed,
                        ..
                    }) => Ok(self.unknown_instance.clone()),
                    Some(Variant {
                        kind: VariantKind::Value(_),
                        ..
                    }) => Err(self.variant_mismatch(wide, "a value variant")),
                    None => Ok(if keep {
                        (self.wrap_unrecognized)(UnrecognizedEnum::from_json(json.clone()))
                    } else {
                        self.unknown_instance.clone()
                    }),
                }
            }
            Value::String(name) => {
                if name == UNKNOWN_NAME {
                    return Ok(self.unknown_instance.clone());
                }
                match table.by_name(name) {
                    Some(Variant {
                        kind: VariantKind::Constant(instance),
                        ..
                    }) => Ok(instance.clone()),
                    Some(Variant {
                        kind: VariantKind::Value(_),
                        number,
                        ..
                    }) => Err(self.variant_mismatch(i64::from(*number), "a value variant")),
                    _ => Ok(self.unknown_instance.clone()),
                }
            }
            Value::Array(elements) => {
                let (first, second) = match elements.as_slice() {
                    [first, second] => (first, second),
                    _ => {
                        return Err(SoiaError::new(
                            codes::JSON_SHAPE_MISMATCH,
                            alloc::format!(
                                "{}: a value variant is a [number, payload] pair",
                                self.record_id
                            ),
                        ));
                    }
                };
                let variant = match first {
                    Value::Number(number) => {
                        let wide = number.as_i64().unwrap_or(-1);
                        match u32::try_from(wide).ok().and_then(|n| table.by_number(n)) {
                            Some(variant) => Some(variant),
                            None => {
                                return Ok(if keep {
                                    (self.wrap_unrecognized)(UnrecognizedEnum::from_json(
                                        json.clone(),
                                    ))
                                } else {
                                    self.unknown_instance.clone()
                                });
                            }
                        }
                    }
                    Value::String(name) => table.by_name(name),
                    other => {
                        return Err(SoiaError::new(
                            codes::JSON_SHAPE_MISMATCH,
                            alloc::format!(
                                "{}: variant address must be a number or name, got: {other}",
                                self.record_id
                            ),
                        ));
                    }
                };
                match variant {
                    Some(Variant {
                        kind: VariantKind::Value(codec),
                        ..
                    }) => codec.wrap_from_json(second, keep),
                    Some(Variant {
                        kind: VariantKind::Removed,
                        ..
                    })
                    | None => Ok(self.unknown_instance.clone()),
                    Some(Variant {
                        kind: VariantKind::Constant(_),
                        number,
                        ..
                    }) => Err(self.variant_mismatch(i64::from(*number), "a constant variant")),
                }
            }
            Value::Object(object) => {
                let kind = object
                    .get("kind")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        SoiaError::new(
                            codes::JSON_SHAPE_MISMATCH,
                            alloc::format!("{}: object form needs a `kind` name", self.record_id),
                        )
                    })?;
                let value = object.get("value").ok_or_else(|| {
                    SoiaError::new(
                        codes::JSON_SHAPE_MISMATCH,
                        alloc::format!("{}: object form needs a `value`", self.record_id),
                    )
                })?;
                match table.by_name(kind) {
                    Some(Variant {
                        kind: VariantKind::Value(codec),
                        ..
                    }) => codec.wrap_from_json(value, keep),
                    Some(Variant {
                        kind: VariantKind::Constant(_),
                        number,
                        ..
                    }) => Err(self.variant_mismatch(i64::from(*number), "a constant variant")),
                    _ => Ok(self.unknown_instance.clone()),
                }
            }
            other => Err(SoiaError::new(
                codes::JSON_SHAPE_MISMATCH,
                alloc::format!(
                    "{}: expected a number, name, pair or object, got: {other}",
                    self.record_id
                ),
            )),
        }
    }

    fn type_signature(&self) -> TypeSignature {
        TypeSignature::Record(self.record_id.to_string())
    }

    fn collect_records(&self, records: &mut RecordSet) -> Result<()> {
        if records.contains(self.record_id) {
            return Ok(());
        }
        let table = self.table()?;
        let mut fields = Vec::new();
        for variant in &table.variants {
            match &variant.kind {
                VariantKind::Constant(_) => fields.push(FieldDescriptor {
                    name: variant.name.to_string(),
                    number: variant.number,
                    signature: None,
                }),
                VariantKind::Value(codec) => fields.push(FieldDescriptor {
                    name: variant.name.to_string(),
                    number: variant.number,
                    signature: Some(codec.type_signature()),
                }),
                VariantKind::Removed => {}
            }
        }
        records.push(RecordDescriptor {
            kind: RecordKind::Enum,
            id: self.record_id.to_string(),
            fields,
            removed_numbers: table
                .variants
                .iter()
                .filter(|variant| matches!(variant.kind, VariantKind::Removed))
                .map(|variant| variant.number)
                .collect(),
        });
        for variant in &table.variants {
            if let VariantKind::Value(codec) = &variant.kind {
                codec.collect_records(records)?;
            }
        }
        Ok(())
    }
}
