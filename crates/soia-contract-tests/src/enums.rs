//! `enums.soia` 的生成风格绑定：常量变体、结构体负载变体与未知兜底。

use std::sync::LazyLock;

use soia_core::unrecognized::{UnrecognizedEnum, UnrecognizedFields};
use soia_core::{EnumBuilder, Serializer, StructBuilder, serializers};

/// `Status.error` 变体的负载。
#[derive(Debug, Clone, Default)]
pub struct StatusError {
    /// 错误码（编号 0）。
    pub code: i32,
    /// 人类可读消息（编号 1）。
    pub message: String,
    unrecognized: Option<UnrecognizedFields>,
}

/// `StatusError` 的可变伴生。
#[derive(Debug, Default)]
pub struct MutableStatusError {
    /// 错误码。
    pub code: i32,
    /// 人类可读消息。
    pub message: String,
    unrecognized: Option<UnrecognizedFields>,
}

impl StatusError {
    /// 全字段构造。
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            unrecognized: None,
        }
    }

    /// 进程级注册好的序列化器句柄。
    pub fn serializer() -> Serializer<StatusError> {
        STATUS_ERROR_SERIALIZER.clone()
    }
}

impl MutableStatusError {
    /// 冻结为不可变形态。
    pub fn to_frozen(self) -> StatusError {
        StatusError {
            code: self.code,
            message: self.message,
            unrecognized: self.unrecognized,
        }
    }
}

impl PartialEq for StatusError {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.message == other.message
    }
}

impl Eq for StatusError {}

static STATUS_ERROR_SERIALIZER: LazyLock<Serializer<StatusError>> = LazyLock::new(|| {
    let mut builder = StructBuilder::<StatusError, MutableStatusError>::new(
        "enums.soia:Status.Error",
        StatusError::default,
        MutableStatusError::default,
        MutableStatusError::to_frozen,
        |frozen| frozen.unrecognized.as_ref(),
        |mutable, unrecognized| mutable.unrecognized = Some(unrecognized),
    );
    builder
        .add_field(
            "code",
            0,
            serializers::int32(),
            |frozen: &StatusError| &frozen.code,
            |mutable: &mut MutableStatusError, value| mutable.code = value,
        )
        .expect("register Status.Error.code");
    builder
        .add_field(
            "message",
            1,
            serializers::string(),
            |frozen: &StatusError| &frozen.message,
            |mutable: &mut MutableStatusError, value| mutable.message = value,
        )
        .expect("register Status.Error.message");
    builder.finalize().expect("finalize Status.Error")
});

/// 请求处理状态：未知兜底（0）、`OK` 常量（1）与带负载的 `error`（4）。
#[derive(Debug, Clone)]
pub enum Status {
    /// 未知兜底变体，可携带解码期捕获的原始内容。
    Unknown(Option<UnrecognizedEnum>),
    /// 成功常量。
    Ok,
    /// 带负载的错误变体。
    Error(StatusError),
}

impl Status {
    /// 无负载的未知实例。
    pub fn unknown() -> Self {
        Status::Unknown(None)
    }

    /// 构造错误变体。
    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Status::Error(StatusError::new(code, message))
    }

    fn number(&self) -> u32 {
        match self {
            Status::Unknown(_) => 0,
            Status::Ok => 1,
            Status::Error(_) => 4,
        }
    }

    /// 进程级注册好的序列化器句柄。
    pub fn serializer() -> Serializer<Status> {
        STATUS_SERIALIZER.clone()
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::unknown()
    }
}

impl PartialEq for Status {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Status::Unknown(_), Status::Unknown(_)) => true,
            (Status::Ok, Status::Ok) => true,
            (Status::Error(left), Status::Error(right)) => left == right,
            _ => false,
        }
    }
}

impl Eq for Status {}

static STATUS_SERIALIZER: LazyLock<Serializer<Status>> = LazyLock::new(|| {
    let mut builder = EnumBuilder::new(
        "enums.soia:Status",
        Status::unknown(),
        |unrecognized| Status::Unknown(Some(unrecognized)),
        |instance| match instance {
            Status::Unknown(unrecognized) => unrecognized.as_ref(),
            _ => None,
        },
        Status::number,
    );
    builder
        .add_constant(1, "OK", Status::Ok)
        .expect("register Status.OK");
    builder
        .add_value_variant(
            4,
            "error",
            StatusError::serializer(),
            Status::Error,
            |instance| match instance {
                Status::Error(payload) => Some(payload),
                _ => None,
            },
        )
        .expect("register Status.error");
    builder.finalize().expect("finalize Status")
});

/// 覆盖注册面的枚举：常量、已移除编号与编号 ≥ 5 的带负载变体。
#[derive(Debug, Clone)]
pub enum MyEnum {
    /// 未知兜底变体。
    Unknown(Option<UnrecognizedEnum>),
    /// 常量 A（编号 1）。
    A,
    /// 常量 C（编号 2）。
    C,
    /// 带字符串负载的变体（编号 5，走显式编号形态）。
    B(String),
}

impl MyEnum {
    /// 无负载的未知实例。
    pub fn unknown() -> Self {
        MyEnum::Unknown(None)
    }

    fn number(&self) -> u32 {
        match self {
            MyEnum::Unknown(_) => 0,
            MyEnum::A => 1,
            MyEnum::C => 2,
            MyEnum::B(_) => 5,
        }
    }

    /// 进程级注册好的序列化器句柄。
    pub fn serializer() -> Serializer<MyEnum> {
        MY_ENUM_SERIALIZER.clone()
    }
}

impl Default for MyEnum {
    fn default() -> Self {
        MyEnum::unknown()
    }
}

impl PartialEq for MyEnum {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (MyEnum::Unknown(_), MyEnum::Unknown(_)) => true,
            (MyEnum::A, MyEnum::A) => true,
            (MyEnum::C, MyEnum::C) => true,
            (MyEnum::B(left), MyEnum::B(right)) => left == right,
            _ => false,
        }
    }
}

impl Eq for MyEnum {}

/// 列表、整数与枚举列表的组合：多字段尾部压缩场景的载体。
#[derive(Debug, Clone, Default)]
pub struct Bundle {
    /// 整数列表（编号 0）。
    pub ints: Vec<i32>,
    /// 标量（编号 1）。
    pub value: i32,
    /// 枚举列表（编号 2）。
    pub moods: Vec<MyEnum>,
    unrecognized: Option<UnrecognizedFields>,
}

/// `Bundle` 的可变伴生。
#[derive(Debug, Default)]
pub struct MutableBundle {
    /// 整数列表。
    pub ints: Vec<i32>,
    /// 标量。
    pub value: i32,
    /// 枚举列表。
    pub moods: Vec<MyEnum>,
    unrecognized: Option<UnrecognizedFields>,
}

impl Bundle {
    /// 进程级注册好的序列化器句柄。
    pub fn serializer() -> Serializer<Bundle> {
        BUNDLE_SERIALIZER.clone()
    }
}

impl MutableBundle {
    /// 冻结为不可变形态。
    pub fn to_frozen(self) -> Bundle {
        Bundle {
            ints: self.ints,
            value: self.value,
            moods: self.moods,
            unrecognized: self.unrecognized,
        }
    }
}

impl PartialEq for Bundle {
    fn eq(&self, other: &Self) -> bool {
        self.ints == other.ints && self.value == other.value && self.moods == other.moods
    }
}

impl Eq for Bundle {}

static BUNDLE_SERIALIZER: LazyLock<Serializer<Bundle>> = LazyLock::new(|| {
    let mut builder = StructBuilder::<Bundle, MutableBundle>::new(
        "enums.soia:Bundle",
        Bundle::default,
        MutableBundle::default,
        MutableBundle::to_frozen,
        |frozen| frozen.unrecognized.as_ref(),
        |mutable, unrecognized| mutable.unrecognized = Some(unrecognized),
    );
    builder
        .add_field(
            "ints",
            0,
            serializers::list(serializers::int32()),
            |frozen: &Bundle| &frozen.ints,
            |mutable: &mut MutableBundle, value| mutable.ints = value,
        )
        .expect("register Bundle.ints");
    builder
        .add_field(
            "value",
            1,
            serializers::int32(),
            |frozen: &Bundle| &frozen.value,
            |mutable: &mut MutableBundle, value| mutable.value = value,
        )
        .expect("register Bundle.value");
    builder
        .add_field(
            "moods",
            2,
            serializers::list(MyEnum::serializer()),
            |frozen: &Bundle| &frozen.moods,
            |mutable: &mut MutableBundle, value| mutable.moods = value,
        )
        .expect("register Bundle.moods");
    builder.finalize().expect("finalize Bundle")
});

static MY_ENUM_SERIALIZER: LazyLock<Serializer<MyEnum>> = LazyLock::new(|| {
    let mut builder = EnumBuilder::new(
        "enums.soia:MyEnum",
        MyEnum::unknown(),
        |unrecognized| MyEnum::Unknown(Some(unrecognized)),
        |instance| match instance {
            MyEnum::Unknown(unrecognized) => unrecognized.as_ref(),
            _ => None,
        },
        MyEnum::number,
    );
    builder.add_constant(1, "A", MyEnum::A).expect("register MyEnum.A");
    builder.add_constant(2, "C", MyEnum::C).expect("register MyEnum.C");
    builder.add_removed_number(3).expect("remove MyEnum number 3");
    builder
        .add_value_variant(
            5,
            "b",
            serializers::string(),
            MyEnum::B,
            |instance| match instance {
                MyEnum::B(text) => Some(text),
                _ => None,
            },
        )
        .expect("register MyEnum.b");
    builder.finalize().expect("finalize MyEnum")
});
