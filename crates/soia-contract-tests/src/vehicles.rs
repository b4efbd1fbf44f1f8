//! `vehicles/car.soia` 与 `user.soia` 的生成风格绑定：时间戳、嵌套记录与
//! 可选包装 —— 反射文档黄金用例的载体。

use std::sync::LazyLock;

use soia_core::timestamp::Timestamp;
use soia_core::unrecognized::UnrecognizedFields;
use soia_core::{Serializer, StructBuilder, serializers};

/// 用户记录。
#[derive(Debug, Clone, Default)]
pub struct User {
    /// 用户 id（编号 0）。
    pub user_id: i64,
    unrecognized: Option<UnrecognizedFields>,
}

/// `User` 的可变伴生。
#[derive(Debug, Default)]
pub struct MutableUser {
    /// 用户 id。
    pub user_id: i64,
    unrecognized: Option<UnrecognizedFields>,
}

impl User {
    /// 全字段构造。
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            unrecognized: None,
        }
    }

    /// 进程级注册好的序列化器句柄。
    pub fn serializer() -> Serializer<User> {
        USER_SERIALIZER.clone()
    }
}

impl MutableUser {
    /// 冻结为不可变形态。
    pub fn to_frozen(self) -> User {
        User {
            user_id: self.user_id,
            unrecognized: self.unrecognized,
        }
    }
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.user_id == other.user_id
    }
}

impl Eq for User {}

static USER_SERIALIZER: LazyLock<Serializer<User>> = LazyLock::new(|| {
    let mut builder = StructBuilder::<User, MutableUser>::new(
        "user.soia:User",
        User::default,
        MutableUser::default,
        MutableUser::to_frozen,
        |frozen| frozen.unrecognized.as_ref(),
        |mutable, unrecognized| mutable.unrecognized = Some(unrecognized),
    );
    builder
        .add_field(
            "user_id",
            0,
            serializers::int64(),
            |frozen: &User| &frozen.user_id,
            |mutable: &mut MutableUser, value| mutable.user_id = value,
        )
        .expect("register User.user_id");
    builder.finalize().expect("finalize User")
});

/// 车辆记录。
#[derive(Debug, Clone, Default)]
pub struct Car {
    /// 型号（编号 0）。
    pub model: String,
    /// 购买时间（编号 1）。
    pub purchase_time: Timestamp,
    /// 车主（编号 2）。
    pub owner: User,
    /// 第二车主（编号 3，可选）。
    pub second_owner: Option<User>,
    unrecognized: Option<UnrecognizedFields>,
}

/// `Car` 的可变伴生。
#[derive(Debug, Default)]
pub struct MutableCar {
    /// 型号。
    pub model: String,
    /// 购买时间。
    pub purchase_time: Timestamp,
    /// 车主。
    pub owner: User,
    /// 第二车主。
    pub second_owner: Option<User>,
    unrecognized: Option<UnrecognizedFields>,
}

impl Car {
    /// 进程级注册好的序列化器句柄。
    pub fn serializer() -> Serializer<Car> {
        CAR_SERIALIZER.clone()
    }
}

impl MutableCar {
    /// 冻结为不可变形态。
    pub fn to_frozen(self) -> Car {
        Car {
            model: self.model,
            purchase_time: self.purchase_time,
            owner: self.owner,
            second_owner: self.second_owner,
            unrecognized: self.unrecognized,
        }
    }
}

impl PartialEq for Car {
    fn eq(&self, other: &Self) -> bool {
        self.model == other.model
            && self.purchase_time == other.purchase_time
            && self.owner == other.owner
            && self.second_owner == other.second_owner
    }
}

impl Eq for Car {}

static CAR_SERIALIZER: LazyLock<Serializer<Car>> = LazyLock::new(|| {
    let mut builder = StructBuilder::<Car, MutableCar>::new(
        "vehicles/car.soia:Car",
        Car::default,
        MutableCar::default,
        MutableCar::to_frozen,
        |frozen| frozen.unrecognized.as_ref(),
        |mutable, unrecognized| mutable.unrecognized = Some(unrecognized),
    );
    builder
        .add_field(
            "model",
            0,
            serializers::string(),
            |frozen: &Car| &frozen.model,
            |mutable: &mut MutableCar, value| mutable.model = value,
        )
        .expect("register Car.model");
    builder
        .add_field(
            "purchase_time",
            1,
            serializers::timestamp(),
            |frozen: &Car| &frozen.purchase_time,
            |mutable: &mut MutableCar, value| mutable.purchase_time = value,
        )
        .expect("register Car.purchase_time");
    builder
        .add_field(
            "owner",
            2,
            User::serializer(),
            |frozen: &Car| &frozen.owner,
            |mutable: &mut MutableCar, value| mutable.owner = value,
        )
        .expect("register Car.owner");
    builder
        .add_field(
            "second_owner",
            3,
            serializers::optional(User::serializer()),
            |frozen: &Car| &frozen.second_owner,
            |mutable: &mut MutableCar, value| mutable.second_owner = value,
        )
        .expect("register Car.second_owner");
    builder.finalize().expect("finalize Car")
});
