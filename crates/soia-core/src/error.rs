//! 错误域：编解码运行时的稳定错误码与根因链路。

use alloc::borrow::Cow;
use alloc::boxed::Box;
use core::fmt;

/// `SoiaError` 是编解码运行时跨模块共享的稳定错误域，是所有可观察失败的最终形态。
///
/// # 设计背景（Why）
/// - 线格式解码、JSON 投影与模式注册在不同层次产生的故障需要合流为统一的错误码，
///   以便调用方、日志与指标系统执行精确分类（畸形输入 / 模式误用 / 形态不匹配）。
/// - 运行时需兼容 `no_std + alloc` 场景，因此直接实现 [`core::error::Error`]，
///   不依赖任何第三方错误派生宏。
///
/// # 逻辑解析（How）
/// - 错误码 `code` 始终为 `'static` 字符串并遵循 `<域>.<语义>` 约定，承载稳定语义；
/// - `message` 面向排障人员，描述具体的偏移字节或 JSON 节点与期望形态；
/// - `cause` 可选携带底层原因（如 `serde_json` 的解析错误），通过 `source()` 暴露完整链路。
///
/// # 契约说明（What）
/// - **前置条件**：调用方必须使用 [`codes`] 模块的常量或遵循同一命名约定的自定义码值；
/// - **后置条件**：返回的错误拥有独立所有权，可安全跨线程移动（`Send + Sync + 'static`）；
/// - 解码失败即整体失败：不存在部分成功的返回形态，也不会悄悄回退为默认值。
///
/// # 设计取舍（Trade-offs）
/// - 采用 `Cow<'static, str>` 保存消息，静态文案零分配，动态文案才触发一次堆分配。
#[derive(Debug)]
pub struct SoiaError {
    code: &'static str,
    message: Cow<'static, str>,
    cause: Option<Box<dyn core::error::Error + Send + Sync>>,
}

impl SoiaError {
    /// 构造新的编解码错误。
    ///
    /// # 契约说明
    /// - **输入**：`code` 为 [`codes`] 中备案的稳定错误码；`message` 可为静态或堆分配文案；
    /// - **后置条件**：错误初始不含底层原因，可通过 [`with_cause`](Self::with_cause) 追加。
    pub fn new(code: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
        }
    }

    /// 附带底层原因并返回新的错误。
    pub fn with_cause(mut self, cause: impl core::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// 获取稳定错误码。
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// 获取面向排障人员的消息。
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for SoiaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl core::error::Error for SoiaError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn core::error::Error + 'static))
    }
}

/// 编解码运行时共享的 `Result` 别名。
pub type Result<T, E = SoiaError> = core::result::Result<T, E>;

/// 稳定错误码集合。
///
/// # 设计背景（Why）
/// - 错误分为三类共识形态：畸形输入（`decode.*` / `json.*`）、模式误用（`schema.*`）、
///   形态不匹配（`json.shape_mismatch`），错误码需让调用方不解析消息文本即可分流；
/// - 错误码遵循 `<域>.<语义>` 命名约定，方便跨组件日志检索与聚合。
///
/// # 契约说明（What）
/// - **使用前提**：错误码应由实现封装进 [`SoiaError`]，并携带具体的字节值或 JSON 节点上下文；
/// - **返回承诺**：调用方收到解码类错误后，应将输入整体视为对当前模式无效，不做自动修复。
pub mod codes {
    /// 线格式中出现了当前上下文不接受的标签字节。
    pub const DECODE_UNEXPECTED_WIRE: &str = "decode.unexpected_wire";
    /// 读取越过了输入缓冲的末尾。
    pub const DECODE_BUFFER_UNDERFLOW: &str = "decode.buffer_underflow";
    /// 顶层解码完成后输入缓冲仍有剩余字节。
    pub const DECODE_TRAILING_BYTES: &str = "decode.trailing_bytes";
    /// 字符串负载不是合法的 UTF-8。
    pub const DECODE_INVALID_UTF8: &str = "decode.invalid_utf8";
    /// 长度前缀为负数或超出可寻址范围。
    pub const DECODE_LENGTH_OVERFLOW: &str = "decode.length_overflow";
    /// 编码时长度超出长度前缀可表达的上限。
    pub const ENCODE_LENGTH_OVERFLOW: &str = "encode.length_overflow";
    /// JSON 文本解析失败。
    pub const JSON_PARSE: &str = "json.parse";
    /// JSON 节点形态与目标类型可接受的任何形态都不匹配。
    pub const JSON_SHAPE_MISMATCH: &str = "json.shape_mismatch";
    /// JSON 数值超出目标整数类型的表示范围。
    pub const JSON_NUMBER_RANGE: &str = "json.number_range";
    /// 在 `finalize` 之后继续注册字段或变体。
    pub const SCHEMA_ALREADY_FINALIZED: &str = "schema.already_finalized";
    /// 在 `finalize` 之前使用序列化器。
    pub const SCHEMA_NOT_FINALIZED: &str = "schema.not_finalized";
    /// 字段或变体编号重复，或复用了已移除 / 保留的编号。
    pub const SCHEMA_DUPLICATE_NUMBER: &str = "schema.duplicate_number";
    /// 枚举实例报告的变体编号与注册表不一致。
    pub const SCHEMA_VARIANT_MISMATCH: &str = "schema.variant_mismatch";
    /// 反射描述文档结构非法。
    pub const REFLECTION_INVALID_DESCRIPTOR: &str = "reflection.invalid_descriptor";
    /// 指标接收器已安装，拒绝二次安装。
    pub const OBSERVABILITY_ALREADY_INSTALLED: &str = "observability.already_installed";
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;
    use alloc::string::ToString;

    #[test]
    fn display_includes_code_and_message() {
        // Why: 排障人员依赖 `[code] message` 形态快速定位错误域。
        let err = SoiaError::new(codes::DECODE_UNEXPECTED_WIRE, "expected number, wire: 243");
        assert_eq!(
            err.to_string(),
            "[decode.unexpected_wire] expected number, wire: 243"
        );
    }

    #[test]
    fn cause_is_exposed_through_source() {
        // Why: JSON 解析失败需保留 serde_json 的底层错误供链路诊断。
        let inner = SoiaError::new(codes::JSON_PARSE, "inner");
        let outer = SoiaError::new(codes::JSON_SHAPE_MISMATCH, "outer").with_cause(inner);
        let source = core::error::Error::source(&outer).expect("cause present");
        assert!(format!("{source}").contains("inner"));
    }
}
