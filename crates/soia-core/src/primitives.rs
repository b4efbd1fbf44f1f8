//! 原语序列化器：布尔、整数、浮点、时间戳、字符串、字节串与可选包装。
//!
//! # 形态要点（What）
//! - 零值浮点与纪元时间戳统一压缩为单个 `0` 字节，这是“默认值压缩”全局规则
//!   在显式宽度标签上的应用；
//! - int64 / uint64 在 JSON 中超出 53 位安全整数范围时编码为十进制字符串，
//!   解码双向均接受数字或字符串形态；
//! - 非有限浮点（NaN / ±Infinity）的 JSON 形态是其字面打印的字符串，而非数字；
//! - uint64 使用独立的阈值阶梯（在 2^32 处直达 8 字节形态），与 int64 的
//!   238 路径互不统一 —— 统一会改变既有线上数据的字节形态。

use alloc::borrow::ToOwned;
use alloc::string::{String, ToString};
use alloc::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use bytes::Bytes;
use serde_json::Value;

use crate::error::{Result, SoiaError, codes};
use crate::reflection::{RecordSet, TypeSignature};
use crate::serializer::{Serializer, SerializerImpl};
use crate::timestamp::Timestamp;
use crate::wire::{Reader, Writer, decode_number};

/// `bool` 的序列化器。
pub fn bool() -> Serializer<bool> {
    Serializer::from_impl(Arc::new(BoolSerializer))
}

/// 32 位有符号整数的序列化器。
pub fn int32() -> Serializer<i32> {
    Serializer::from_impl(Arc::new(Int32Serializer))
}

/// 64 位有符号整数的序列化器。
pub fn int64() -> Serializer<i64> {
    Serializer::from_impl(Arc::new(Int64Serializer))
}

/// 64 位无符号整数的序列化器。
pub fn uint64() -> Serializer<u64> {
    Serializer::from_impl(Arc::new(Uint64Serializer))
}

/// 32 位浮点数的序列化器。
pub fn float32() -> Serializer<f32> {
    Serializer::from_impl(Arc::new(Float32Serializer))
}

/// 64 位浮点数的序列化器。
pub fn float64() -> Serializer<f64> {
    Serializer::from_impl(Arc::new(Float64Serializer))
}

/// UTF-8 字符串的序列化器。
pub fn string() -> Serializer<String> {
    Serializer::from_impl(Arc::new(StringSerializer))
}

/// 字节串的序列化器。
pub fn bytes() -> Serializer<Bytes> {
    Serializer::from_impl(Arc::new(BytesSerializer))
}

/// 时间戳的序列化器。
pub fn timestamp() -> Serializer<Timestamp> {
    Serializer::from_impl(Arc::new(TimestampSerializer))
}

/// 可选包装：`None` 在线格式上是单字节 255，在 JSON 上是 `null`。
pub fn optional<T: Send + Sync + 'static>(inner: Serializer<T>) -> Serializer<Option<T>> {
    Serializer::from_impl(Arc::new(OptionalSerializer { inner }))
}

fn shape_mismatch(expected: &'static str, json: &Value) -> SoiaError {
    SoiaError::new(
        codes::JSON_SHAPE_MISMATCH,
        alloc::format!("expected {expected}, got: {json}"),
    )
}

fn unexpected_wire(expected: &'static str, wire: u8) -> SoiaError {
    SoiaError::new(
        codes::DECODE_UNEXPECTED_WIRE,
        alloc::format!("expected {expected}, wire byte: {wire}"),
    )
}

struct BoolSerializer;

impl SerializerImpl<bool> for BoolSerializer {
    fn is_default(&self, value: &bool) -> Result<bool> {
        Ok(!*value)
    }

    fn default_value(&self) -> Result<bool> {
        Ok(false)
    }

    fn encode(&self, input: &bool, out: &mut Writer) -> Result<()> {
        out.write_u8(u8::from(*input));
        Ok(())
    }

    fn decode(&self, reader: &mut Reader<'_>, _keep: bool) -> Result<bool> {
        // 任何非零数字都解码为 true。
        Ok(!decode_number(reader)?.is_zero())
    }

    fn to_json(&self, input: &bool, readable_flavor: bool) -> Result<Value> {
        Ok(if readable_flavor {
            Value::Bool(*input)
        } else {
            Value::from(u8::from(*input))
        })
    }

    fn from_json(&self, json: &Value, _keep: bool) -> Result<bool> {
        match json {
            Value::Bool(value) => Ok(*value),
            Value::Number(number) => Ok(number.as_f64() != Some(0.0)),
            Value::String(text) => Ok(!(text == "0" || text == "false")),
            other => Err(shape_mismatch("a boolean", other)),
        }
    }

    fn type_signature(&self) -> TypeSignature {
        TypeSignature::Primitive("bool".to_string())
    }

    fn collect_records(&self, _records: &mut RecordSet) -> Result<()> {
        Ok(())
    }
}

struct Int32Serializer;

impl SerializerImpl<i32> for Int32Serializer {
    fn is_default(&self, value: &i32) -> Result<bool> {
        Ok(*value == 0)
    }

    fn default_value(&self) -> Result<i32> {
        Ok(0)
    }

    fn encode(&self, input: &i32, out: &mut Writer) -> Result<()> {
        out.encode_int32(*input);
        Ok(())
    }

    fn decode(&self, reader: &mut Reader<'_>, _keep: bool) -> Result<i32> {
        Ok(decode_number(reader)?.as_i32())
    }

    fn to_json(&self, input: &i32, _readable: bool) -> Result<Value> {
        Ok(Value::from(*input))
    }

    fn from_json(&self, json: &Value, _keep: bool) -> Result<i32> {
        match json {
            Value::Number(number) => {
                let wide = number.as_i64().ok_or_else(|| {
                    SoiaError::new(codes::JSON_NUMBER_RANGE, "expected an integral number")
                })?;
                i32::try_from(wide).map_err(|_| {
                    SoiaError::new(
                        codes::JSON_NUMBER_RANGE,
                        alloc::format!("{wide} is outside the int32 range"),
                    )
                })
            }
            Value::String(text) => text.parse::<i32>().map_err(|err| {
                SoiaError::new(codes::JSON_NUMBER_RANGE, "text is not a valid int32")
                    .with_cause(err)
            }),
            other => Err(shape_mismatch("an int32", other)),
        }
    }

    fn type_signature(&self) -> TypeSignature {
        TypeSignature::Primitive("int32".to_string())
    }

    fn collect_records(&self, _records: &mut RecordSet) -> Result<()> {
        Ok(())
    }
}

/// JavaScript 双精度可精确表示的整数边界（±2^53）。
const MAX_SAFE_JS_INT: i64 = 9_007_199_254_740_992;
const MIN_SAFE_JS_INT: i64 = -9_007_199_254_740_992;

struct Int64Serializer;

impl SerializerImpl<i64> for Int64Serializer {
    fn is_default(&self, value: &i64) -> Result<bool> {
        Ok(*value == 0)
    }

    fn default_value(&self) -> Result<i64> {
        Ok(0)
    }

    fn encode(&self, input: &i64, out: &mut Writer) -> Result<()> {
        out.encode_int64(*input);
        Ok(())
    }

    fn decode(&self, reader: &mut Reader<'_>, _keep: bool) -> Result<i64> {
        Ok(decode_number(reader)?.as_i64())
    }

    fn to_json(&self, input: &i64, _readable: bool) -> Result<Value> {
        Ok(if (MIN_SAFE_JS_INT..=MAX_SAFE_JS_INT).contains(input) {
            Value::from(*input)
        } else {
            Value::from(input.to_string())
        })
    }

    fn from_json(&self, json: &Value, _keep: bool) -> Result<i64> {
        match json {
            Value::Number(number) => number.as_i64().ok_or_else(|| {
                SoiaError::new(codes::JSON_NUMBER_RANGE, "number is outside the int64 range")
            }),
            Value::String(text) => text.parse::<i64>().map_err(|err| {
                SoiaError::new(codes::JSON_NUMBER_RANGE, "text is not a valid int64")
                    .with_cause(err)
            }),
            other => Err(shape_mismatch("an int64", other)),
        }
    }

    fn type_signature(&self) -> TypeSignature {
        TypeSignature::Primitive("int64".to_string())
    }

    fn collect_records(&self, _records: &mut RecordSet) -> Result<()> {
        Ok(())
    }
}

struct Uint64Serializer;

impl SerializerImpl<u64> for Uint64Serializer {
    fn is_default(&self, value: &u64) -> Result<bool> {
        Ok(*value == 0)
    }

    fn default_value(&self) -> Result<u64> {
        Ok(0)
    }

    fn encode(&self, input: &u64, out: &mut Writer) -> Result<()> {
        out.encode_uint64(*input);
        Ok(())
    }

    fn decode(&self, reader: &mut Reader<'_>, _keep: bool) -> Result<u64> {
        Ok(decode_number(reader)?.as_u64())
    }

    fn to_json(&self, input: &u64, _readable: bool) -> Result<Value> {
        Ok(if *input <= MAX_SAFE_JS_INT as u64 {
            Value::from(*input)
        } else {
            Value::from(input.to_string())
        })
    }

    fn from_json(&self, json: &Value, _keep: bool) -> Result<u64> {
        match json {
            Value::Number(number) => number.as_u64().ok_or_else(|| {
                SoiaError::new(codes::JSON_NUMBER_RANGE, "number is outside the uint64 range")
            }),
            Value::String(text) => text.parse::<u64>().map_err(|err| {
                SoiaError::new(codes::JSON_NUMBER_RANGE, "text is not a valid uint64")
                    .with_cause(err)
            }),
            other => Err(shape_mismatch("a uint64", other)),
        }
    }

    fn type_signature(&self) -> TypeSignature {
        TypeSignature::Primitive("uint64".to_string())
    }

    fn collect_records(&self, _records: &mut RecordSet) -> Result<()> {
        Ok(())
    }
}

fn non_finite_to_str(value: f64) -> &'static str {
    if value.is_nan() {
        "NaN"
    } else if value > 0.0 {
        "Infinity"
    } else {
        "-Infinity"
    }
}

fn parse_float_text(text: &str) -> Result<f64> {
    match text {
        "NaN" => Ok(f64::NAN),
        "Infinity" | "+Infinity" => Ok(f64::INFINITY),
        "-Infinity" => Ok(f64::NEG_INFINITY),
        other => other.parse::<f64>().map_err(|err| {
            SoiaError::new(codes::JSON_NUMBER_RANGE, "text is not a valid float")
                .with_cause(err)
        }),
    }
}

struct Float32Serializer;

impl SerializerImpl<f32> for Float32Serializer {
    fn is_default(&self, value: &f32) -> Result<bool> {
        Ok(*value == 0.0)
    }

    fn default_value(&self) -> Result<f32> {
        Ok(0.0)
    }

    fn encode(&self, input: &f32, out: &mut Writer) -> Result<()> {
        if *input == 0.0 {
            out.write_u8(0);
        } else {
            out.write_u8(240);
            out.write_u32_le(input.to_bits());
        }
        Ok(())
    }

    fn decode(&self, reader: &mut Reader<'_>, _keep: bool) -> Result<f32> {
        Ok(decode_number(reader)?.as_f64() as f32)
    }

    fn to_json(&self, input: &f32, _readable: bool) -> Result<Value> {
        Ok(if input.is_finite() {
            Value::from(*input)
        } else {
            Value::from(non_finite_to_str(f64::from(*input)))
        })
    }

    fn from_json(&self, json: &Value, _keep: bool) -> Result<f32> {
        match json {
            Value::Number(number) => Ok(number.as_f64().unwrap_or(0.0) as f32),
            Value::String(text) => Ok(parse_float_text(text)? as f32),
            other => Err(shape_mismatch("a float32", other)),
        }
    }

    fn type_signature(&self) -> TypeSignature {
        TypeSignature::Primitive("float32".to_string())
    }

    fn collect_records(&self, _records: &mut RecordSet) -> Result<()> {
        Ok(())
    }
}

struct Float64Serializer;

impl SerializerImpl<f64> for Float64Serializer {
    fn is_default(&self, value: &f64) -> Result<bool> {
        Ok(*value == 0.0)
    }

    fn default_value(&self) -> Result<f64> {
        Ok(0.0)
    }

    fn encode(&self, input: &f64, out: &mut Writer) -> Result<()> {
        if *input == 0.0 {
            out.write_u8(0);
        } else {
            out.write_u8(241);
            out.write_u64_le(input.to_bits());
        }
        Ok(())
    }

    fn decode(&self, reader: &mut Reader<'_>, _keep: bool) -> Result<f64> {
        Ok(decode_number(reader)?.as_f64())
    }

    fn to_json(&self, input: &f64, _readable: bool) -> Result<Value> {
        Ok(if input.is_finite() {
            Value::from(*input)
        } else {
            Value::from(non_finite_to_str(*input))
        })
    }

    fn from_json(&self, json: &Value, _keep: bool) -> Result<f64> {
        match json {
            Value::Number(number) => Ok(number.as_f64().unwrap_or(0.0)),
            Value::String(text) => parse_float_text(text),
            other => Err(shape_mismatch("a float64", other)),
        }
    }

    fn type_signature(&self) -> TypeSignature {
        TypeSignature::Primitive("float64".to_string())
    }

    fn collect_records(&self, _records: &mut RecordSet) -> Result<()> {
        Ok(())
    }
}

struct StringSerializer;

impl SerializerImpl<String> for StringSerializer {
    fn is_default(&self, value: &String) -> Result<bool> {
        Ok(value.is_empty())
    }

    fn default_value(&self) -> Result<String> {
        Ok(String::new())
    }

    fn encode(&self, input: &String, out: &mut Writer) -> Result<()> {
        if input.is_empty() {
            out.write_u8(242);
        } else {
            out.write_u8(243);
            out.encode_length_prefix(input.len())?;
            out.write_slice(input.as_bytes());
        }
        Ok(())
    }

    fn decode(&self, reader: &mut Reader<'_>, _keep: bool) -> Result<String> {
        match reader.read_u8()? {
            0 | 242 => Ok(String::new()),
            243 => {
                let length = decode_number(reader)?.as_length()?;
                let raw = reader.read_exact(length)?;
                core::str::from_utf8(raw)
                    .map(ToOwned::to_owned)
                    .map_err(|err| {
                        SoiaError::new(
                            codes::DECODE_INVALID_UTF8,
                            "string payload is not valid UTF-8",
                        )
                        .with_cause(err)
                    })
            }
            wire => Err(unexpected_wire("a string", wire)),
        }
    }

    fn to_json(&self, input: &String, _readable: bool) -> Result<Value> {
        Ok(Value::from(input.as_str()))
    }

    fn from_json(&self, json: &Value, _keep: bool) -> Result<String> {
        match json {
            Value::String(text) => Ok(text.clone()),
            Value::Number(number) if number.as_i64() == Some(0) => Ok(String::new()),
            other => Err(shape_mismatch("a string", other)),
        }
    }

    fn type_signature(&self) -> TypeSignature {
        TypeSignature::Primitive("string".to_string())
    }

    fn collect_records(&self, _records: &mut RecordSet) -> Result<()> {
        Ok(())
    }
}

struct BytesSerializer;

impl SerializerImpl<Bytes> for BytesSerializer {
    fn is_default(&self, value: &Bytes) -> Result<bool> {
        Ok(value.is_empty())
    }

    fn default_value(&self) -> Result<Bytes> {
        Ok(Bytes::new())
    }

    fn encode(&self, input: &Bytes, out: &mut Writer) -> Result<()> {
        if input.is_empty() {
            out.write_u8(244);
        } else {
            out.write_u8(245);
            out.encode_length_prefix(input.len())?;
            out.write_slice(input);
        }
        Ok(())
    }

    fn decode(&self, reader: &mut Reader<'_>, _keep: bool) -> Result<Bytes> {
        match reader.read_u8()? {
            0 | 244 => Ok(Bytes::new()),
            245 => {
                let length = decode_number(reader)?.as_length()?;
                Ok(Bytes::copy_from_slice(reader.read_exact(length)?))
            }
            wire => Err(unexpected_wire("a byte string", wire)),
        }
    }

    fn to_json(&self, input: &Bytes, _readable: bool) -> Result<Value> {
        Ok(Value::from(BASE64_STANDARD.encode(input)))
    }

    fn from_json(&self, json: &Value, _keep: bool) -> Result<Bytes> {
        match json {
            Value::String(text) => BASE64_STANDARD
                .decode(text)
                .map(Bytes::from)
                .map_err(|err| {
                    SoiaError::new(codes::JSON_SHAPE_MISMATCH, "text is not valid base64")
                        .with_cause(err)
                }),
            Value::Number(number) if number.as_i64() == Some(0) => Ok(Bytes::new()),
            other => Err(shape_mismatch("a base64 string", other)),
        }
    }

    fn type_signature(&self) -> TypeSignature {
        TypeSignature::Primitive("bytes".to_string())
    }

    fn collect_records(&self, _records: &mut RecordSet) -> Result<()> {
        Ok(())
    }
}

struct TimestampSerializer;

impl SerializerImpl<Timestamp> for TimestampSerializer {
    fn is_default(&self, value: &Timestamp) -> Result<bool> {
        Ok(*value == Timestamp::EPOCH)
    }

    fn default_value(&self) -> Result<Timestamp> {
        Ok(Timestamp::EPOCH)
    }

    fn encode(&self, input: &Timestamp, out: &mut Writer) -> Result<()> {
        let unix_millis = input.unix_millis();
        if unix_millis == 0 {
            out.write_u8(0);
        } else {
            out.write_u8(239);
            out.write_i64_le(unix_millis);
        }
        Ok(())
    }

    fn decode(&self, reader: &mut Reader<'_>, _keep: bool) -> Result<Timestamp> {
        Ok(Timestamp::from_unix_millis(decode_number(reader)?.as_i64()))
    }

    fn to_json(&self, input: &Timestamp, readable_flavor: bool) -> Result<Value> {
        // 钳制范围保证毫秒数始终落在 53 位安全整数内，数字形态永不降级为字符串。
        Ok(if readable_flavor {
            serde_json::json!({
                "unix_millis": input.unix_millis(),
                "formatted": input.to_iso8601(),
            })
        } else {
            Value::from(input.unix_millis())
        })
    }

    fn from_json(&self, json: &Value, _keep: bool) -> Result<Timestamp> {
        let millis_node = match json {
            Value::Object(object) => object.get("unix_millis").ok_or_else(|| {
                SoiaError::new(
                    codes::JSON_SHAPE_MISMATCH,
                    "timestamp object is missing `unix_millis`",
                )
            })?,
            other => other,
        };
        let unix_millis = match millis_node {
            Value::Number(number) => number.as_i64().ok_or_else(|| {
                SoiaError::new(codes::JSON_NUMBER_RANGE, "unix_millis is not an integer")
            })?,
            Value::String(text) => text.parse::<i64>().map_err(|err| {
                SoiaError::new(codes::JSON_NUMBER_RANGE, "unix_millis text is not an integer")
                    .with_cause(err)
            })?,
            other => return Err(shape_mismatch("a timestamp", other)),
        };
        Ok(Timestamp::from_unix_millis(unix_millis))
    }

    fn type_signature(&self) -> TypeSignature {
        TypeSignature::Primitive("timestamp".to_string())
    }

    fn collect_records(&self, _records: &mut RecordSet) -> Result<()> {
        Ok(())
    }
}

struct OptionalSerializer<T> {
    inner: Serializer<T>,
}

impl<T: Send + Sync + 'static> SerializerImpl<Option<T>> for OptionalSerializer<T> {
    fn is_default(&self, value: &Option<T>) -> Result<bool> {
        Ok(value.is_none())
    }

    fn default_value(&self) -> Result<Option<T>> {
        Ok(None)
    }

    fn encode(&self, input: &Option<T>, out: &mut Writer) -> Result<()> {
        match input {
            None => {
                out.write_u8(255);
                Ok(())
            }
            Some(value) => self.inner.implementation().encode(value, out),
        }
    }

    fn decode(&self, reader: &mut Reader<'_>, keep: bool) -> Result<Option<T>> {
        if reader.peek_u8()? == 255 {
            reader.read_u8()?;
            Ok(None)
        } else {
            Ok(Some(self.inner.implementation().decode(reader, keep)?))
        }
    }

    fn to_json(&self, input: &Option<T>, readable_flavor: bool) -> Result<Value> {
        match input {
            None => Ok(Value::Null),
            Some(value) => self.inner.implementation().to_json(value, readable_flavor),
        }
    }

    fn from_json(&self, json: &Value, keep: bool) -> Result<Option<T>> {
        match json {
            Value::Null => Ok(None),
            other => Ok(Some(self.inner.implementation().from_json(other, keep)?)),
        }
    }

    fn type_signature(&self) -> TypeSignature {
        TypeSignature::Optional(alloc::boxed::Box::new(
            self.inner.implementation().type_signature(),
        ))
    }

    fn collect_records(&self, records: &mut RecordSet) -> Result<()> {
        self.inner.implementation().collect_records(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    fn raw_encode<T: 'static>(serializer: &Serializer<T>, value: &T) -> Vec<u8> {
        let mut writer = Writer::new();
        serializer
            .implementation()
            .encode(value, &mut writer)
            .expect("encode");
        writer.into_vec()
    }

    fn raw_decode<T: 'static>(serializer: &Serializer<T>, bytes: &[u8]) -> T {
        let mut reader = Reader::new(bytes);
        let value = serializer
            .implementation()
            .decode(&mut reader, false)
            .expect("decode");
        assert!(reader.is_empty());
        value
    }

    #[test]
    fn zero_floats_and_epoch_compact_to_one_byte() {
        // Why: “默认值压缩为单个零字节”的规则必须覆盖所有显式宽度标签。
        assert_eq!(raw_encode(&float32(), &0.0), vec![0]);
        assert_eq!(raw_encode(&float64(), &0.0), vec![0]);
        assert_eq!(raw_encode(&timestamp(), &Timestamp::EPOCH), vec![0]);
        assert_eq!(raw_encode(&float64(), &1.5)[0], 241);
    }

    #[test]
    fn string_round_trip_and_tags() {
        assert_eq!(raw_encode(&string(), &String::new()), vec![242]);
        let encoded = raw_encode(&string(), &"hi".to_string());
        assert_eq!(encoded, vec![243, 2, b'h', b'i']);
        assert_eq!(raw_decode(&string(), &encoded), "hi");
    }

    #[test]
    fn bytes_round_trip_and_base64_json() {
        let value = Bytes::from_static(&[1, 2, 254]);
        let encoded = raw_encode(&bytes(), &value);
        assert_eq!(encoded[0], 245);
        assert_eq!(raw_decode(&bytes(), &encoded), value);
        let json = bytes().to_json(&value, false).unwrap();
        assert_eq!(bytes().from_json(&json, false).unwrap(), value);
    }

    #[test]
    fn large_int64_uses_string_json() {
        let value = MAX_SAFE_JS_INT + 1;
        let json = int64().to_json(&value, false).unwrap();
        assert!(json.is_string());
        assert_eq!(int64().from_json(&json, false).unwrap(), value);
        // 数字形态同样被接受。
        let small = int64().to_json(&12i64, false).unwrap();
        assert!(small.is_number());
    }

    #[test]
    fn non_finite_floats_render_as_strings() {
        let json = float64().to_json(&f64::INFINITY, false).unwrap();
        assert_eq!(json, Value::from("Infinity"));
        assert_eq!(
            float64().from_json(&Value::from("-Infinity"), false).unwrap(),
            f64::NEG_INFINITY
        );
        assert!(float64()
            .from_json(&Value::from("NaN"), false)
            .unwrap()
            .is_nan());
    }

    #[test]
    fn optional_round_trips_null_marker() {
        let serializer = optional(int32());
        assert_eq!(raw_encode(&serializer, &None), vec![255]);
        assert_eq!(raw_decode(&serializer, &[255]), None);
        assert_eq!(raw_decode(&serializer, &raw_encode(&serializer, &Some(7))), Some(7));
        assert_eq!(serializer.to_json(&None, false).unwrap(), Value::Null);
    }

    #[test]
    fn bool_accepts_any_nonzero_wire_number() {
        assert!(raw_decode(&bool(), &[5]));
        assert!(!raw_decode(&bool(), &[0]));
    }

    #[test]
    fn malformed_string_tag_is_an_error() {
        let mut reader = Reader::new(&[250]);
        let err = string()
            .implementation()
            .decode(&mut reader, false)
            .unwrap_err();
        assert_eq!(err.code(), codes::DECODE_UNEXPECTED_WIRE);
    }
}
