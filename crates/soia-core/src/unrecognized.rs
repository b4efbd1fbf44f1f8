//! 未识别数据的不透明承载：前向兼容契约的核心载体。
//!
//! # 设计意图（Why）
//! - 新版本模式写出的数据超出旧版本模式的认知范围时，旧版本在
//!   `keep_unrecognized_fields = true` 下必须原样保存这段数据，并在重新编码时
//!   逐字节（二进制）或值等价（JSON）地回放；
//! - 捕获对格式“粘性”：二进制捕获只回放到二进制，JSON 捕获只回放到稠密 JSON。
//!   两种形态互不转换，跨格式转换时仅丢弃异格式的未识别残余，已识别字段无损。

use alloc::vec::Vec;

use bytes::Bytes;
use serde_json::Value;

/// 结构体尾部的未识别槽位捕获。
///
/// # 契约说明（What）
/// - `total_slot_count` 记录原始线格式的总槽位数（含已识别前缀与未识别尾部），
///   重新编码时以它作为计数写出；
/// - 字节形态保存被跳过解码的原始区间；JSON 形态保存稠密数组的尾部元素副本；
/// - 实例相等性比较不包含本类型：携带不同未识别尾部的两个结构体仍按已识别
///   字段判等。
#[derive(Debug, Clone)]
pub struct UnrecognizedFields {
    pub(crate) total_slot_count: usize,
    pub(crate) payload: UnrecognizedPayload,
}

#[derive(Debug, Clone)]
pub(crate) enum UnrecognizedPayload {
    Bytes(Bytes),
    Json(Vec<Value>),
}

impl UnrecognizedFields {
    pub(crate) fn from_bytes(total_slot_count: usize, bytes: Bytes) -> Self {
        Self {
            total_slot_count,
            payload: UnrecognizedPayload::Bytes(bytes),
        }
    }

    pub(crate) fn from_json(total_slot_count: usize, elements: Vec<Value>) -> Self {
        Self {
            total_slot_count,
            payload: UnrecognizedPayload::Json(elements),
        }
    }
}

/// 枚举解码到未知编号时捕获的原始内容。
///
/// 字节形态涵盖变体标签、编号与负载的完整消费区间；JSON 形态保存原始片段副本。
#[derive(Debug, Clone)]
pub struct UnrecognizedEnum {
    pub(crate) payload: UnrecognizedEnumPayload,
}

#[derive(Debug, Clone)]
pub(crate) enum UnrecognizedEnumPayload {
    Bytes(Bytes),
    Json(Value),
}

impl UnrecognizedEnum {
    pub(crate) fn from_bytes(bytes: Bytes) -> Self {
        Self {
            payload: UnrecognizedEnumPayload::Bytes(bytes),
        }
    }

    pub(crate) fn from_json(json: Value) -> Self {
        Self {
            payload: UnrecognizedEnumPayload::Json(json),
        }
    }
}
