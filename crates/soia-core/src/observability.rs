//! 编解码观测挂钩：进程级一次性安装的指标接收器。
//!
//! # 设计意图（Why）
//! - 编解码器自身不做日志输出，观测统一通过指标缝隙暴露：调用方按需安装
//!   接收器，记录每个二进制帧的方向、字节量与错误码；
//! - 库内不绑定任何指标后端，接收器由宿主实现并桥接到其自有体系。
//!
//! # 契约说明（What）
//! - [`install_metrics_sink`] 为发布一次语义：首次安装成功，之后的安装返回
//!   `observability.already_installed`；
//! - 未安装接收器时记录为零开销的空操作；
//! - 接收器需自行保证线程安全（`Send + Sync`），回调在编解码调用线程上同步执行。

use spin::Once;

use crate::error::{Result, SoiaError, codes};

/// 编解码阶段，区分编码与解码方向。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodecPhase {
    /// 业务值序列化为字节。
    Encode,
    /// 字节反序列化为业务值。
    Decode,
}

impl CodecPhase {
    /// 返回稳定的阶段标签，供指标维度使用。
    pub fn label(self) -> &'static str {
        match self {
            CodecPhase::Encode => "encode",
            CodecPhase::Decode => "decode",
        }
    }
}

/// 指标接收器契约。
pub trait MetricsSink: Send + Sync {
    /// 记录一次成功的编解码帧及其字节量。
    fn record_frame(&self, phase: CodecPhase, byte_count: usize);

    /// 记录一次编解码失败及其稳定错误码。
    fn record_error(&self, phase: CodecPhase, code: &'static str);
}

static METRICS_SINK: Once<&'static dyn MetricsSink> = Once::new();

/// 安装进程级指标接收器（仅允许一次）。
pub fn install_metrics_sink(sink: &'static dyn MetricsSink) -> Result<()> {
    let mut installed = false;
    METRICS_SINK.call_once(|| {
        installed = true;
        sink
    });
    if installed {
        Ok(())
    } else {
        Err(SoiaError::new(
            codes::OBSERVABILITY_ALREADY_INSTALLED,
            "a metrics sink is already installed",
        ))
    }
}

pub(crate) fn record_frame(phase: CodecPhase, byte_count: usize) {
    if let Some(sink) = METRICS_SINK.get() {
        sink.record_frame(phase, byte_count);
    }
}

pub(crate) fn record_error(phase: CodecPhase, code: &'static str) {
    if let Some(sink) = METRICS_SINK.get() {
        sink.record_error(phase, code);
    }
}
