#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! # soia-core
//!
//! ## 教案意图（Why）
//! - **职责定位**：模式可演进的结构化数据编解码运行时。把类型化记录
//!   （结构体与标签联合，可嵌套、可递归）编为两种可互换的线表示 ——
//!   紧凑二进制与双形态 JSON（位置式稠密 / 名字键控可读）—— 并解码回来；
//! - **核心难题**：不是“序列化一个结构体”，而是让明年新增或删除的字段
//!   永远不会损坏由不知道这次变更的代码产生或消费的数据。位置槽位布局、
//!   已移除编号墓碑与未识别数据保真共同构成这份读写兼容契约；
//! - **架构角色**：模式编译器与各语言代码生成器是外部协作者，它们只需
//!   提供类型化的模式模型，并对每个生成类型调用一次注册 API。
//!
//! ## 使用方式（How）
//! - 原语与容器：[`serializers`] 模块提供 `bool`/`int32`/…/`list`/
//!   `keyed_list`/`optional` 的现成序列化器；
//! - 记录类型：生成代码通过 [`StructBuilder`] / [`EnumBuilder`] 在进程
//!   初始化阶段注册字段与变体，`finalize` 原子发布后经 [`Serializer`]
//!   编解码；
//! - 解码入口统一携带 `keep_unrecognized_fields` 开关：超出本模式认知的
//!   数据要么解析后丢弃，要么原样捕获并在重新编码时无损回放。
//!
//! ## 契约说明（What）
//! - 编解码全程同步、无暂停点，只触碰输入与输出缓冲；
//! - 顶层二进制负载以 `"soia"` 魔数开头；无魔数的输入按 UTF-8 JSON 文本
//!   回退解析；
//! - 所有失败以携带稳定错误码的 [`SoiaError`] 同步返回，解码从不修复
//!   畸形输入，也没有部分成功。
//!
//! ## 风险提示（Trade-offs）
//! - 递归深度随输入嵌套深度增长，调用方面对不可信输入时应自行限制
//!   嵌套规模；
//! - 注册必须在首次编解码前完成（两阶段发布），运行中途注册新类型不在
//!   支持范围内。

extern crate alloc;

pub mod error;
pub mod keyed;
pub mod method;
pub mod observability;
pub mod reflection;
pub mod timestamp;
pub mod unrecognized;

mod enums;
mod lists;
mod primitives;
mod serializer;
mod structs;
mod wire;

pub use enums::EnumBuilder;
pub use error::{Result, SoiaError};
pub use keyed::KeyedList;
pub use serializer::{BINARY_MAGIC, Serializer};
pub use structs::StructBuilder;
pub use timestamp::Timestamp;
pub use unrecognized::{UnrecognizedEnum, UnrecognizedFields};

/// 现成序列化器的构造入口：原语、列表、键控列表与可选包装。
pub mod serializers {
    pub use crate::lists::{keyed_list, list};
    pub use crate::primitives::{
        bool, bytes, float32, float64, int32, int64, optional, string, timestamp, uint64,
    };
}
