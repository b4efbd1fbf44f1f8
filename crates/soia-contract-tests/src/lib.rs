//! # soia-contract-tests
//!
//! ## 教案意图（Why）
//! - 以“生成代码会写出的样子”手写一组夹具绑定（冻结类型 + 可变伴生 +
//!   注册静态），作为模式编译器与代码生成器（两者不在本仓库范围内）的
//!   替身，供契约 / 黄金 / 性质测试穿透整个编解码运行时；
//! - 夹具覆盖运行时的全部注册面：普通字段、已移除编号、嵌套记录、列表、
//!   键控列表、可选包装、常量与带负载变体、互相递归的结构体。
//!
//! ## 契约说明（What）
//! - 冻结类型的相等性与哈希只比较已识别字段 —— 未识别尾部刻意排除在外；
//! - 每个类型经 `serializer()` 暴露其进程级注册好的序列化器句柄；
//! - 测试套件位于 `tests/`：黄金向量（JSON 向量文件驱动）、往返性质
//!   （proptest）、前后向兼容、键控列表身份共享、递归类型与反射文档。

pub mod enums;
pub mod full_name;
pub mod structs;
pub mod vehicles;
