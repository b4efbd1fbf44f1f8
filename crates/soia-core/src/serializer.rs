//! 序列化器门面：统一的编解码入口与内部实现契约。

use alloc::string::String;
use alloc::sync::Arc;

use bytes::Bytes;
use serde_json::Value;

use crate::error::{Result, SoiaError, codes};
use crate::observability::{self, CodecPhase};
use crate::reflection::{RecordSet, TypeDescriptor, TypeSignature};
use crate::wire::{Reader, Writer};

/// 顶层二进制负载的 4 字节魔数前缀，用于与 UTF-8 JSON 文本共享同一传输通道。
pub const BINARY_MAGIC: &[u8; 4] = b"soia";

/// 内部实现契约：每种可序列化类型背后的编解码逻辑。
///
/// # 设计初衷（Why）
/// - 以单一 trait 同时表达二进制与双形态 JSON 的双向能力，[`Serializer`]
///   对象层仅做类型擦除与入口编排；
/// - `is_default` / `default_value` 是槽位压缩与递归类型惰性默认值的共同基础。
///
/// # 契约说明（What）
/// - 所有方法同步执行、无暂停点，只触碰输入与输出；
/// - `decode` / `from_json` 的 `keep_unrecognized_fields` 控制超出模式认知的
///   数据是被原样捕获还是解析后丢弃；
/// - 失败以 [`SoiaError`] 返回，绝不以默认值吞掉畸形输入。
pub(crate) trait SerializerImpl<T>: Send + Sync + 'static {
    fn is_default(&self, value: &T) -> Result<bool>;

    fn default_value(&self) -> Result<T>;

    fn encode(&self, input: &T, out: &mut Writer) -> Result<()>;

    fn decode(&self, reader: &mut Reader<'_>, keep_unrecognized_fields: bool) -> Result<T>;

    fn to_json(&self, input: &T, readable_flavor: bool) -> Result<Value>;

    fn from_json(&self, json: &Value, keep_unrecognized_fields: bool) -> Result<T>;

    fn type_signature(&self) -> TypeSignature;

    fn collect_records(&self, records: &mut RecordSet) -> Result<()>;
}

/// 某个类型 `T` 的序列化器句柄。
///
/// # 设计背景（Why）
/// - 生成代码对每个记录类型注册一次，之后通过本句柄完成全部编解码；
///   句柄可自由克隆与跨线程共享（内部为 `Arc`）；
/// - 顶层入口负责魔数前缀、输入耗尽断言与指标上报，格式细节全部下沉到
///   [`SerializerImpl`]。
///
/// # 契约说明（What）
/// - [`to_bytes`](Self::to_bytes) 产出 `"soia"` 魔数 + 二进制负载；
/// - [`from_bytes`](Self::from_bytes) 看到魔数按二进制解码并要求缓冲恰好耗尽，
///   否则将输入视为 UTF-8 JSON 文本回退解析；
/// - `readable_flavor` 切换稠密（位置数组）与可读（名字键控）两种 JSON 投影。
pub struct Serializer<T> {
    inner: Arc<dyn SerializerImpl<T>>,
}

impl<T> Clone for Serializer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> core::fmt::Debug for Serializer<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Serializer").finish_non_exhaustive()
    }
}

impl<T: 'static> Serializer<T> {
    pub(crate) fn from_impl(inner: Arc<dyn SerializerImpl<T>>) -> Self {
        Self { inner }
    }

    pub(crate) fn implementation(&self) -> &dyn SerializerImpl<T> {
        self.inner.as_ref()
    }

    /// 序列化为带魔数前缀的二进制负载。
    pub fn to_bytes(&self, input: &T) -> Result<Bytes> {
        let mut writer = Writer::new();
        writer.write_slice(BINARY_MAGIC);
        match self.inner.encode(input, &mut writer) {
            Ok(()) => {
                let bytes = Bytes::from(writer.into_vec());
                observability::record_frame(CodecPhase::Encode, bytes.len());
                Ok(bytes)
            }
            Err(err) => {
                observability::record_error(CodecPhase::Encode, err.code());
                Err(err)
            }
        }
    }

    /// 从字节反序列化：魔数前缀选择二进制路径，否则回退为 UTF-8 JSON 文本。
    pub fn from_bytes(&self, bytes: &[u8], keep_unrecognized_fields: bool) -> Result<T> {
        let result = self.from_bytes_impl(bytes, keep_unrecognized_fields);
        match &result {
            Ok(_) => observability::record_frame(CodecPhase::Decode, bytes.len()),
            Err(err) => observability::record_error(CodecPhase::Decode, err.code()),
        }
        result
    }

    fn from_bytes_impl(&self, bytes: &[u8], keep_unrecognized_fields: bool) -> Result<T> {
        if bytes.len() >= BINARY_MAGIC.len() && &bytes[..BINARY_MAGIC.len()] == BINARY_MAGIC {
            let mut reader = Reader::new(&bytes[BINARY_MAGIC.len()..]);
            let value = self.inner.decode(&mut reader, keep_unrecognized_fields)?;
            if !reader.is_empty() {
                return Err(SoiaError::new(
                    codes::DECODE_TRAILING_BYTES,
                    alloc::format!(
                        "{} extra byte(s) after a complete top-level value",
                        reader.remaining()
                    ),
                ));
            }
            Ok(value)
        } else {
            let text = core::str::from_utf8(bytes).map_err(|err| {
                SoiaError::new(
                    codes::DECODE_INVALID_UTF8,
                    "input is neither prefixed binary nor valid UTF-8 text",
                )
                .with_cause(err)
            })?;
            self.from_json_code(text, keep_unrecognized_fields)
        }
    }

    /// 投影为 JSON 节点。
    pub fn to_json(&self, input: &T, readable_flavor: bool) -> Result<Value> {
        self.inner.to_json(input, readable_flavor)
    }

    /// 投影为 JSON 文本；可读形态使用两空格缩进的多行排版。
    pub fn to_json_code(&self, input: &T, readable_flavor: bool) -> Result<String> {
        let json = self.inner.to_json(input, readable_flavor)?;
        let rendered = if readable_flavor {
            serde_json::to_string_pretty(&json)
        } else {
            serde_json::to_string(&json)
        };
        rendered.map_err(|err| {
            SoiaError::new(codes::JSON_PARSE, "failed to render the JSON node").with_cause(err)
        })
    }

    /// 从 JSON 节点反序列化。
    pub fn from_json(&self, json: &Value, keep_unrecognized_fields: bool) -> Result<T> {
        self.inner.from_json(json, keep_unrecognized_fields)
    }

    /// 从 JSON 文本反序列化。
    pub fn from_json_code(&self, code: &str, keep_unrecognized_fields: bool) -> Result<T> {
        let json: Value = serde_json::from_str(code).map_err(|err| {
            SoiaError::new(codes::JSON_PARSE, "input text is not valid JSON").with_cause(err)
        })?;
        self.inner.from_json(&json, keep_unrecognized_fields)
    }

    /// 判断一个值是否处于其类型的默认状态。
    pub fn is_default(&self, value: &T) -> Result<bool> {
        self.inner.is_default(value)
    }

    /// 构造该类型的默认实例。
    pub fn default_value(&self) -> Result<T> {
        self.inner.default_value()
    }

    /// 走查注册表，产出完整的类型描述文档。
    pub fn type_descriptor(&self) -> Result<TypeDescriptor> {
        let mut records = RecordSet::default();
        self.inner.collect_records(&mut records)?;
        Ok(TypeDescriptor {
            root: self.inner.type_signature(),
            records: records.into_records(),
        })
    }
}
