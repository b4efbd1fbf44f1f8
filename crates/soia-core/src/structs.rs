//! 结构体编解码：位置槽位布局、尾部默认值压缩与未识别尾部保真。
//!
//! # 设计背景（Why）
//! - 结构体的线格式是“按字段编号定位的槽位序列”：槽位索引即字段编号，
//!   已移除编号的槽位永久占位，保证不同模式版本对同一字节流的槽位解释一致；
//! - 尾部处于默认值的字段不上线（trailing-default compaction），夹在中间的
//!   默认值仍以单个 `0` 字节占位；
//! - 解码遇到超出本模式认知的槽位时，按调用方的选择丢弃或原样捕获，
//!   捕获的尾部在重新编码时逐字节回放。
//!
//! # 注册协议（What）
//! - 每个结构体类型在进程初始化阶段注册一次：[`StructBuilder`] 按编号累积
//!   字段与已移除编号，`finalize` 计算槽位表并**原子发布**；
//! - 发布前句柄即可取得（[`StructBuilder::serializer`]），互相递归的类型
//!   因此可以在注册期互相引用而不会观察到半成品表；
//! - `finalize` 之后的注册调用与 `finalize` 之前的编解码调用都是错误。
//!
//! # 递归类型（Trade-offs）
//! - 直接递归的字段若急切构造默认实例会无限递归。约定：生成代码以显式的
//!   “缺席标记”（`Option<Box<T>>`）存储这类字段，并通过
//!   [`StructBuilder::add_recursive_field`] 提供缺席感知的访问器；缺席字段
//!   的可见默认值即其类型自身的默认实例，按需惰性物化。

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::ToString;
use alloc::sync::Arc;
use alloc::vec::Vec;

use bytes::Bytes;
use serde_json::Value;
use spin::{Mutex, Once};

use crate::error::{Result, SoiaError, codes};
use crate::lists::{decode_count, encode_count};
use crate::reflection::{FieldDescriptor, RecordDescriptor, RecordKind, RecordSet, TypeSignature};
use crate::serializer::{Serializer, SerializerImpl};
use crate::unrecognized::{UnrecognizedFields, UnrecognizedPayload};
use crate::wire::{Reader, Writer, skip_value};

/// 结构体序列化器的注册构建器。
///
/// # 使用方式（How）
/// 1. 以记录 id 与冻结 / 可变侧钩子创建构建器；
/// 2. 按需调用 [`add_field`](Self::add_field) /
///    [`add_recursive_field`](Self::add_recursive_field) /
///    [`add_removed_number`](Self::add_removed_number)；
/// 3. [`finalize`](Self::finalize) 发布槽位表并返回可用的 [`Serializer`]；
///    此前克隆自 [`serializer`](Self::serializer) 的句柄自动生效。
pub struct StructBuilder<F, M> {
    target: Arc<StructSerializer<F, M>>,
}

impl<F, M> StructBuilder<F, M>
where
    F: Send + Sync + 'static,
    M: Send + Sync + 'static,
{
    /// 创建构建器。
    ///
    /// # 契约说明（What）
    /// - `record_id` 形如 `modulePath:QualifiedName`，进入反射文档；
    /// - `default_fn` 构造冻结默认实例；`new_mutable` / `to_frozen` 构成
    ///   可变侧往返；`get_unrecognized` / `set_unrecognized` 让未识别尾部
    ///   跟随实例流转。
    pub fn new(
        record_id: &'static str,
        default_fn: fn() -> F,
        new_mutable: fn() -> M,
        to_frozen: fn(M) -> F,
        get_unrecognized: fn(&F) -> Option<&UnrecognizedFields>,
        set_unrecognized: fn(&mut M, UnrecognizedFields),
    ) -> Self {
        Self {
            target: Arc::new(StructSerializer {
                record_id,
                default_fn,
                new_mutable,
                to_frozen,
                get_unrecognized,
                set_unrecognized,
                staging: Mutex::new(Some(Staging::default())),
                table: Once::new(),
            }),
        }
    }

    /// 取得（可能尚未发布的）序列化器句柄，供互相递归的类型在注册期引用。
    pub fn serializer(&self) -> Serializer<F> {
        Serializer::from_impl(self.target.clone() as Arc<dyn SerializerImpl<F>>)
    }

    /// 注册一个普通字段。
    pub fn add_field<T: Send + Sync + 'static>(
        &mut self,
        name: &'static str,
        number: u32,
        serializer: Serializer<T>,
        get: fn(&F) -> &T,
        set: fn(&mut M, T),
    ) -> Result<()> {
        self.add_field_impl(
            name,
            number,
            Box::new(FieldBinding {
                serializer,
                get: Box::new(move |frozen: &F| Some(get(frozen))),
                set: Box::new(set),
            }),
        )
    }

    /// 注册一个递归字段：冻结侧存储可缺席，缺席即处于默认值。
    pub fn add_recursive_field<T: Send + Sync + 'static>(
        &mut self,
        name: &'static str,
        number: u32,
        serializer: Serializer<T>,
        get: fn(&F) -> Option<&T>,
        set: fn(&mut M, T),
    ) -> Result<()> {
        self.add_field_impl(
            name,
            number,
            Box::new(FieldBinding {
                serializer,
                get: Box::new(get),
                set: Box::new(set),
            }),
        )
    }

    fn add_field_impl(
        &mut self,
        name: &'static str,
        number: u32,
        codec: Box<dyn FieldCodec<F, M>>,
    ) -> Result<()> {
        let mut staging = self.target.staging.lock();
        let staging = staging.as_mut().ok_or_else(|| already_finalized(self.target.record_id))?;
        if staging.fields.iter().any(|field| field.number == number)
            || staging.removed_numbers.contains(&number)
        {
            return Err(duplicate_number(self.target.record_id, number));
        }
        if staging.fields.iter().any(|field| field.name == name) {
            return Err(SoiaError::new(
                codes::SCHEMA_DUPLICATE_NUMBER,
                alloc::format!(
                    "{}: field name {name:?} is already registered",
                    self.target.record_id
                ),
            ));
        }
        staging.fields.push(StructField {
            name,
            number,
            codec,
        });
        Ok(())
    }

    /// 将一个编号标记为已移除：槽位永久占位，编号永不复用。
    pub fn add_removed_number(&mut self, number: u32) -> Result<()> {
        let mut staging = self.target.staging.lock();
        let staging = staging.as_mut().ok_or_else(|| already_finalized(self.target.record_id))?;
        if staging.fields.iter().any(|field| field.number == number)
            || staging.removed_numbers.contains(&number)
        {
            return Err(duplicate_number(self.target.record_id, number));
        }
        staging.removed_numbers.push(number);
        Ok(())
    }

    /// 计算槽位表并原子发布；返回可用的序列化器。
    pub fn finalize(self) -> Result<Serializer<F>> {
        let staging = self
            .target
            .staging
            .lock()
            .take()
            .ok_or_else(|| already_finalized(self.target.record_id))?;
        let Staging {
            mut fields,
            mut removed_numbers,
        } = staging;
        fields.sort_by_key(|field| field.number);
        removed_numbers.sort_unstable();

        let highest_field = fields.last().map(|field| field.number as usize + 1);
        let highest_removed = removed_numbers.last().map(|number| *number as usize + 1);
        let recognized_slot_count = highest_field.unwrap_or(0).max(highest_removed.unwrap_or(0));

        let mut slots = Vec::new();
        slots.resize_with(recognized_slot_count, || None);
        let mut name_to_index = BTreeMap::new();
        for (index, field) in fields.iter().enumerate() {
            slots[field.number as usize] = Some(index);
            name_to_index.insert(field.name, index);
        }
        self.target.table.call_once(|| StructTable {
            fields,
            slots,
            name_to_index,
            removed_numbers,
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

fn duplicate_number(record_id: &str, number: u32) -> SoiaError {
    SoiaError::new(
        codes::SCHEMA_DUPLICATE_NUMBER,
        alloc::format!("{record_id}: number {number} is already registered or removed"),
    )
}

/// 字段的类型擦除编解码入口：对冻结侧取值、向可变侧写值。
trait FieldCodec<F, M>: Send + Sync {
    fn is_default(&self, frozen: &F) -> Result<bool>;
    fn encode(&self, frozen: &F, out: &mut Writer) -> Result<()>;
    fn decode_into(&self, mutable: &mut M, reader: &mut Reader<'_>, keep: bool) -> Result<()>;
    fn to_json(&self, frozen: &F, readable_flavor: bool) -> Result<Value>;
    fn from_json_into(&self, mutable: &mut M, json: &Value, keep: bool) -> Result<()>;
    fn type_signature(&self) -> TypeSignature;
    fn collect_records(&self, records: &mut RecordSet) -> Result<()>;
}

struct FieldBinding<F, M, T> {
    serializer: Serializer<T>,
    /// 缺席感知的访问器：`None` 表示字段处于默认值（递归字段的惰性默认）。
    get: Box<dyn for<'a> Fn(&'a F) -> Option<&'a T> + Send + Sync>,
    set: Box<dyn Fn(&mut M, T) + Send + Sync>,
}

impl<F, M, T: Send + Sync + 'static> FieldCodec<F, M> for FieldBinding<F, M, T> {
    fn is_default(&self, frozen: &F) -> Result<bool> {
        match (self.get)(frozen) {
            None => Ok(true),
            Some(value) => self.serializer.implementation().is_default(value),
        }
    }

    fn encode(&self, frozen: &F, out: &mut Writer) -> Result<()> {
        let implementation = self.serializer.implementation();
        match (self.get)(frozen) {
            Some(value) => implementation.encode(value, out),
            None => implementation.encode(&implementation.default_value()?, out),
        }
    }

    fn decode_into(&self, mutable: &mut M, reader: &mut Reader<'_>, keep: bool) -> Result<()> {
        let value = self.serializer.implementation().decode(reader, keep)?;
        (self.set)(mutable, value);
        Ok(())
    }

    fn to_json(&self, frozen: &F, readable_flavor: bool) -> Result<Value> {
        let implementation = self.serializer.implementation();
        match (self.get)(frozen) {
            Some(value) => implementation.to_json(value, readable_flavor),
            None => implementation.to_json(&implementation.default_value()?, readable_flavor),
        }
    }

    fn from_json_into(&self, mutable: &mut M, json: &Value, keep: bool) -> Result<()> {
        let value = self.serializer.implementation().from_json(json, keep)?;
        (self.set)(mutable, value);
        Ok(())
    }

    fn type_signature(&self) -> TypeSignature {
        self.serializer.implementation().type_signature()
    }

    fn collect_records(&self, records: &mut RecordSet) -> Result<()> {
        self.serializer.implementation().collect_records(records)
    }
}

struct StructField<F, M> {
    name: &'static str,
    number: u32,
    codec: Box<dyn FieldCodec<F, M>>,
}

struct Staging<F, M> {
    fields: Vec<StructField<F, M>>,
    removed_numbers: Vec<u32>,
}

impl<F, M> Default for Staging<F, M> {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            removed_numbers: Vec::new(),
        }
    }
}

struct StructTable<F, M> {
    /// 按编号升序。
    fields: Vec<StructField<F, M>>,
    /// 槽位索引 → `fields` 下标；`None` 为已移除或空缺编号。长度即已识别槽位数。
    slots: Vec<Option<usize>>,
    name_to_index: BTreeMap<&'static str, usize>,
    removed_numbers: Vec<u32>,
}

struct StructSerializer<F, M> {
    record_id: &'static str,
    default_fn: fn() -> F,
    new_mutable: fn() -> M,
    to_frozen: fn(M) -> F,
    get_unrecognized: fn(&F) -> Option<&UnrecognizedFields>,
    set_unrecognized: fn(&mut M, UnrecognizedFields),
    staging: Mutex<Option<Staging<F, M>>>,
    table: Once<StructTable<F, M>>,
}

impl<F, M> StructSerializer<F, M> {
    fn table(&self) -> Result<&StructTable<F, M>> {
        self.table.get().ok_or_else(|| {
            SoiaError::new(
                codes::SCHEMA_NOT_FINALIZED,
                alloc::format!("{} is not finalized yet", self.record_id),
            )
        })
    }

    /// 尾部默认值压缩后的槽位数：最高非默认字段编号 + 1。
    fn slot_count(&self, table: &StructTable<F, M>, input: &F) -> Result<usize> {
        for field in table.fields.iter().rev() {
            if !field.codec.is_default(input)? {
                return Ok(field.number as usize + 1);
            }
        }
        Ok(0)
    }
}

impl<F, M> SerializerImpl<F> for StructSerializer<F, M>
where
    F: Send + Sync + 'static,
    M: Send + Sync + 'static,
{
    fn is_default(&self, value: &F) -> Result<bool> {
        if (self.get_unrecognized)(value).is_some() {
            return Ok(false);
        }
        let table = self.table()?;
        for field in &table.fields {
            if !field.codec.is_default(value)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn default_value(&self) -> Result<F> {
        Ok((self.default_fn)())
    }

    fn encode(&self, input: &F, out: &mut Writer) -> Result<()> {
        let table = self.table()?;
        let unrecognized_bytes = match (self.get_unrecognized)(input) {
            Some(UnrecognizedFields {
                total_slot_count,
                payload: UnrecognizedPayload::Bytes(bytes),
            }) => Some((*total_slot_count, bytes)),
            // JSON 形态的捕获对二进制不可回放（格式粘性），按无尾部处理。
            _ => None,
        };
        match unrecognized_bytes {
            Some((total_slot_count, bytes)) => {
                encode_count(total_slot_count, out)?;
                for slot in &table.slots {
                    match slot {
                        Some(index) => table.fields[*index].codec.encode(input, out)?,
                        None => out.write_u8(0),
                    }
                }
                out.write_slice(bytes);
            }
            None => {
                let total_slot_count = self.slot_count(table, input)?;
                encode_count(total_slot_count, out)?;
                for slot in &table.slots[..total_slot_count] {
                    match slot {
                        Some(index) => table.fields[*index].codec.encode(input, out)?,
                        None => out.write_u8(0),
                    }
                }
            }
        }
        Ok(())
    }

    fn decode(&self, reader: &mut Reader<'_>, keep: bool) -> Result<F> {
        let table = self.table()?;
        let Some(encoded_slot_count) = decode_count(reader, "a struct")? else {
            return Ok((self.default_fn)());
        };
        let mut mutable = (self.new_mutable)();
        let recognized = table.slots.len();
        for slot in &table.slots[..encoded_slot_count.min(recognized)] {
            match slot {
                Some(index) => table.fields[*index]
                    .codec
                    .decode_into(&mut mutable, reader, keep)?,
                None => skip_value(reader)?,
            }
        }
        if encoded_slot_count > recognized {
            let start = reader.position();
            for _ in recognized..encoded_slot_count {
                skip_value(reader)?;
            }
            if keep {
                let bytes = Bytes::copy_from_slice(reader.slice_between(start, reader.position()));
                (self.set_unrecognized)(
                    &mut mutable,
                    UnrecognizedFields::from_bytes(encoded_slot_count, bytes),
                );
            }
        }
        Ok((self.to_frozen)(mutable))
    }

    fn to_json(&self, input: &F, readable_flavor: bool) -> Result<Value> {
        let table = self.table()?;
        if readable_flavor {
            let mut object = serde_json::Map::new();
            for field in &table.fields {
                if field.codec.is_default(input)? {
                    continue;
                }
                object.insert(field.name.to_string(), field.codec.to_json(input, true)?);
            }
            return Ok(Value::Object(object));
        }
        let unrecognized_elements = match (self.get_unrecognized)(input) {
            Some(UnrecognizedFields {
                payload: UnrecognizedPayload::Json(elements),
                ..
            }) => Some(elements),
            _ => None,
        };
        let mut slots: Vec<Value> = Vec::new();
        match unrecognized_elements {
            Some(elements) => {
                for slot in &table.slots {
                    slots.push(match slot {
                        Some(index) => table.fields[*index].codec.to_json(input, false)?,
                        None => Value::from(0),
                    });
                }
                slots.extend(elements.iter().cloned());
            }
            None => {
                let total_slot_count = self.slot_count(table, input)?;
                for slot in &table.slots[..total_slot_count] {
                    slots.push(match slot {
                        Some(index) => table.fields[*index].codec.to_json(input, false)?,
                        None => Value::from(0),
                    });
                }
            }
        }
        Ok(Value::Array(slots))
    }

    fn from_json(&self, json: &Value, keep: bool) -> Result<F> {
        let table = self.table()?;
        match json {
            Value::Number(number) if number.as_i64() == Some(0) => Ok((self.default_fn)()),
            Value::Array(elements) => {
                let mut mutable = (self.new_mutable)();
                let recognized = table.slots.len();
                let fill = elements.len().min(recognized);
                for field in &table.fields {
                    if field.number as usize >= fill {
                        break;
                    }
                    field.codec.from_json_into(
                        &mut mutable,
                        &elements[field.number as usize],
                        keep,
                    )?;
                }
                if keep && elements.len() > recognized {
                    (self.set_unrecognized)(
                        &mut mutable,
                        UnrecognizedFields::from_json(
                            elements.len(),
                            elements[recognized..].to_vec(),
                        ),
                    );
                }
                Ok((self.to_frozen)(mutable))
            }
            Value::Object(object) => {
                // 可读形态：未知名字直接忽略，且从不保留未识别数据。
                let mut mutable = (self.new_mutable)();
                for (name, element) in object {
                    if let Some(index) = table.name_to_index.get(name.as_str()) {
                        table.fields[*index].codec.from_json_into(&mut mutable, element, false)?;
                    }
                }
                Ok((self.to_frozen)(mutable))
            }
            other => Err(SoiaError::new(
                codes::JSON_SHAPE_MISMATCH,
                alloc::format!(
                    "{}: expected an array or object, got: {other}",
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
        records.push(RecordDescriptor {
            kind: RecordKind::Struct,
            id: self.record_id.to_string(),
            fields: table
                .fields
                .iter()
                .map(|field| FieldDescriptor {
                    name: field.name.to_string(),
                    number: field.number,
                    signature: Some(field.codec.type_signature()),
                })
                .collect(),
            removed_numbers: table.removed_numbers.clone(),
        });
        for field in &table.fields {
            field.codec.collect_records(records)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives;
    use alloc::string::String;
    use alloc::vec;

    #[derive(Debug, Clone, Default)]
    struct Pair {
        left: i32,
        right: String,
        unrecognized: Option<UnrecognizedFields>,
    }

    #[derive(Default)]
    struct PairMut {
        left: i32,
        right: String,
        unrecognized: Option<UnrecognizedFields>,
    }

    fn pair_serializer() -> Serializer<Pair> {
        let mut builder = StructBuilder::<Pair, PairMut>::new(
            "tests.soia:Pair",
            Pair::default,
            PairMut::default,
            |mutable| Pair {
                left: mutable.left,
                right: mutable.right,
                unrecognized: mutable.unrecognized,
            },
            |frozen| frozen.unrecognized.as_ref(),
            |mutable, unrecognized| mutable.unrecognized = Some(unrecognized),
        );
        builder
            .add_field("left", 0, primitives::int32(), |f: &Pair| &f.left, |m: &mut PairMut, v| {
                m.left = v
            })
            .unwrap();
        builder
            .add_removed_number(1)
            .unwrap();
        builder
            .add_field(
                "right",
                2,
                primitives::string(),
                |f: &Pair| &f.right,
                |m: &mut PairMut, v| m.right = v,
            )
            .unwrap();
        builder.finalize().unwrap()
    }

    fn encode(serializer: &Serializer<Pair>, value: &Pair) -> vec::Vec<u8> {
        let mut writer = Writer::new();
        serializer.implementation().encode(value, &mut writer).unwrap();
        writer.into_vec()
    }

    #[test]
    fn trailing_defaults_are_dropped() {
        let serializer = pair_serializer();
        // Why: 只有首字段非默认时，总槽位数必须收缩为 1。
        let value = Pair {
            left: 42,
            ..Pair::default()
        };
        assert_eq!(encode(&serializer, &value), vec![247, 42]);
        // 默认实例收缩为零槽位。
        assert_eq!(encode(&serializer, &Pair::default()), vec![246]);
    }

    #[test]
    fn middle_defaults_are_zero_placeholders() {
        let serializer = pair_serializer();
        // 只有最后一个字段非默认：中间的已移除槽位写 0，首字段写默认编码。
        let value = Pair {
            right: "x".into(),
            ..Pair::default()
        };
        assert_eq!(encode(&serializer, &value), vec![249, 0, 0, 243, 1, b'x']);
    }

    #[test]
    fn removed_slot_is_skip_decoded() {
        let serializer = pair_serializer();
        // 槽位 1 曾是一个字符串字段；解码时按形态跳过，不影响其余槽位。
        let bytes = [249u8, 7, 243, 2, b'h', b'i', 243, 1, b'y'];
        let mut reader = Reader::new(&bytes);
        let value = serializer.implementation().decode(&mut reader, false).unwrap();
        assert!(reader.is_empty());
        assert_eq!(value.left, 7);
        assert_eq!(value.right, "y");
    }

    #[test]
    fn registration_after_finalize_is_rejected() {
        let mut builder = StructBuilder::<Pair, PairMut>::new(
            "tests.soia:Pair2",
            Pair::default,
            PairMut::default,
            |mutable| Pair {
                left: mutable.left,
                right: mutable.right,
                unrecognized: mutable.unrecognized,
            },
            |frozen| frozen.unrecognized.as_ref(),
            |mutable, unrecognized| mutable.unrecognized = Some(unrecognized),
        );
        let pending = builder.serializer();
        // 发布前解码应失败。
        let err = pending.from_bytes(b"soia\xf6", false).unwrap_err();
        assert_eq!(err.code(), codes::SCHEMA_NOT_FINALIZED);

        builder
            .add_field("left", 0, primitives::int32(), |f: &Pair| &f.left, |m: &mut PairMut, v| {
                m.left = v
            })
            .unwrap();
        let duplicate = builder.add_removed_number(0).unwrap_err();
        assert_eq!(duplicate.code(), codes::SCHEMA_DUPLICATE_NUMBER);
        builder.finalize().unwrap();
        assert!(pending.from_bytes(b"soia\xf6", false).is_ok());
    }
}
