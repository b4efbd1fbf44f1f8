//! 列表与键控列表的序列化器。
//!
//! 计数标签与结构体槽位计数共享同一约定：0/1/2/3 项分别是单字节
//! 246/247/248/249，更多项写 250 + 显式长度前缀，随后按声明顺序逐项编码。
//! JSON 两种形态都是普通数组 —— “可读”只改变元素自身的渲染方式，不改变
//! 列表容器。

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;

use serde_json::Value;

use crate::error::{Result, SoiaError, codes};
use crate::keyed::KeyedList;
use crate::reflection::{RecordSet, TypeSignature};
use crate::serializer::{Serializer, SerializerImpl};
use crate::wire::{Reader, Writer, decode_number};

/// 元素序列的序列化器。
pub fn list<E: Send + Sync + 'static>(item: Serializer<E>) -> Serializer<Vec<E>> {
    Serializer::from_impl(Arc::new(ListSerializer { item }))
}

/// 键控列表的序列化器；`key_spec` 与 `get_key` 共同声明键路径。
pub fn keyed_list<E, K>(
    item: Serializer<E>,
    key_spec: &'static str,
    get_key: fn(&E) -> K,
) -> Serializer<KeyedList<E, K>>
where
    E: Send + Sync + 'static,
    K: Ord + Send + Sync + 'static,
{
    Serializer::from_impl(Arc::new(KeyedListSerializer {
        item,
        key_spec,
        get_key,
    }))
}

pub(crate) fn encode_count(count: usize, out: &mut Writer) -> Result<()> {
    if count <= 3 {
        out.write_u8(246 + count as u8);
    } else {
        out.write_u8(250);
        out.encode_length_prefix(count)?;
    }
    Ok(())
}

/// 读取列表 / 结构体计数标签；`None` 表示空（字面量 `0` 或 246）。
pub(crate) fn decode_count(
    reader: &mut Reader<'_>,
    expected: &'static str,
) -> Result<Option<usize>> {
    match reader.read_u8()? {
        0 | 246 => Ok(None),
        wire @ 247..=249 => Ok(Some(usize::from(wire - 246))),
        250 => Ok(Some(decode_number(reader)?.as_length()?)),
        wire => Err(SoiaError::new(
            codes::DECODE_UNEXPECTED_WIRE,
            alloc::format!("expected {expected}, wire byte: {wire}"),
        )),
    }
}

fn items_to_json<E: 'static>(
    item: &Serializer<E>,
    items: &[E],
    readable_flavor: bool,
) -> Result<Value> {
    let mut elements = Vec::with_capacity(items.len());
    for value in items {
        elements.push(item.implementation().to_json(value, readable_flavor)?);
    }
    Ok(Value::Array(elements))
}

fn items_from_json<E: 'static>(
    item: &Serializer<E>,
    json: &Value,
    keep_unrecognized_fields: bool,
) -> Result<Option<Vec<E>>> {
    match json {
        Value::Number(number) if number.as_i64() == Some(0) => Ok(None),
        Value::Array(elements) => {
            let mut items = Vec::with_capacity(elements.len());
            for element in elements {
                items.push(
                    item.implementation()
                        .from_json(element, keep_unrecognized_fields)?,
                );
            }
            Ok(Some(items))
        }
        other => Err(SoiaError::new(
            codes::JSON_SHAPE_MISMATCH,
            alloc::format!("expected an array, got: {other}"),
        )),
    }
}

fn decode_items<E: 'static>(
    item: &Serializer<E>,
    reader: &mut Reader<'_>,
    keep_unrecognized_fields: bool,
) -> Result<Vec<E>> {
    match decode_count(reader, "a list")? {
        None => Ok(Vec::new()),
        Some(count) => {
            let mut items = Vec::new();
            for _ in 0..count {
                items.push(
                    item.implementation()
                        .decode(reader, keep_unrecognized_fields)?,
                );
            }
            Ok(items)
        }
    }
}

struct ListSerializer<E> {
    item: Serializer<E>,
}

impl<E: Send + Sync + 'static> SerializerImpl<Vec<E>> for ListSerializer<E> {
    fn is_default(&self, value: &Vec<E>) -> Result<bool> {
        Ok(value.is_empty())
    }

    fn default_value(&self) -> Result<Vec<E>> {
        Ok(Vec::new())
    }

    fn encode(&self, input: &Vec<E>, out: &mut Writer) -> Result<()> {
        encode_count(input.len(), out)?;
        for value in input {
            self.item.implementation().encode(value, out)?;
        }
        Ok(())
    }

    fn decode(&self, reader: &mut Reader<'_>, keep: bool) -> Result<Vec<E>> {
        decode_items(&self.item, reader, keep)
    }

    fn to_json(&self, input: &Vec<E>, readable_flavor: bool) -> Result<Value> {
        items_to_json(&self.item, input, readable_flavor)
    }

    fn from_json(&self, json: &Value, keep: bool) -> Result<Vec<E>> {
        Ok(items_from_json(&self.item, json, keep)?.unwrap_or_default())
    }

    fn type_signature(&self) -> TypeSignature {
        TypeSignature::Array(Box::new(self.item.implementation().type_signature()))
    }

    fn collect_records(&self, records: &mut RecordSet) -> Result<()> {
        self.item.implementation().collect_records(records)
    }
}

struct KeyedListSerializer<E, K: Ord> {
    item: Serializer<E>,
    key_spec: &'static str,
    get_key: fn(&E) -> K,
}

impl<E, K> SerializerImpl<KeyedList<E, K>> for KeyedListSerializer<E, K>
where
    E: Send + Sync + 'static,
    K: Ord + Send + Sync + 'static,
{
    fn is_default(&self, value: &KeyedList<E, K>) -> Result<bool> {
        Ok(value.is_empty())
    }

    fn default_value(&self) -> Result<KeyedList<E, K>> {
        Ok(KeyedList::new(Vec::new(), self.key_spec, self.get_key))
    }

    fn encode(&self, input: &KeyedList<E, K>, out: &mut Writer) -> Result<()> {
        encode_count(input.len(), out)?;
        for value in input.items() {
            self.item.implementation().encode(value, out)?;
        }
        Ok(())
    }

    fn decode(&self, reader: &mut Reader<'_>, keep: bool) -> Result<KeyedList<E, K>> {
        let items = decode_items(&self.item, reader, keep)?;
        Ok(KeyedList::new(items, self.key_spec, self.get_key))
    }

    fn to_json(&self, input: &KeyedList<E, K>, readable_flavor: bool) -> Result<Value> {
        items_to_json(&self.item, input.items(), readable_flavor)
    }

    fn from_json(&self, json: &Value, keep: bool) -> Result<KeyedList<E, K>> {
        let items = items_from_json(&self.item, json, keep)?.unwrap_or_default();
        Ok(KeyedList::new(items, self.key_spec, self.get_key))
    }

    fn type_signature(&self) -> TypeSignature {
        TypeSignature::Array(Box::new(self.item.implementation().type_signature()))
    }

    fn collect_records(&self, records: &mut RecordSet) -> Result<()> {
        self.item.implementation().collect_records(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives;
    use alloc::vec;

    #[test]
    fn small_lists_use_compact_count_tags() {
        let serializer = list(primitives::int32());
        let mut writer = Writer::new();
        serializer
            .implementation()
            .encode(&vec![1, 2, 3], &mut writer)
            .unwrap();
        assert_eq!(writer.as_slice(), &[249, 1, 2, 3]);

        let mut writer = Writer::new();
        serializer
            .implementation()
            .encode(&Vec::new(), &mut writer)
            .unwrap();
        assert_eq!(writer.as_slice(), &[246]);
    }

    #[test]
    fn long_lists_use_explicit_length_prefix() {
        let serializer = list(primitives::int32());
        let items: Vec<i32> = (0..5).collect();
        let mut writer = Writer::new();
        serializer.implementation().encode(&items, &mut writer).unwrap();
        assert_eq!(&writer.as_slice()[..2], &[250, 5]);
        let mut reader = Reader::new(writer.as_slice());
        let decoded = serializer.implementation().decode(&mut reader, false).unwrap();
        assert_eq!(decoded, items);
        assert!(reader.is_empty());
    }

    #[test]
    fn zero_literal_decodes_as_empty_list() {
        let serializer = list(primitives::int32());
        let mut reader = Reader::new(&[0]);
        assert!(serializer
            .implementation()
            .decode(&mut reader, false)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn malformed_count_tag_is_an_error() {
        let serializer = list(primitives::int32());
        let mut reader = Reader::new(&[243]);
        let err = serializer
            .implementation()
            .decode(&mut reader, false)
            .unwrap_err();
        assert_eq!(err.code(), codes::DECODE_UNEXPECTED_WIRE);
    }
}
