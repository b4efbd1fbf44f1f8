//! `structs.soia` 的生成风格绑定：嵌套、列表、键控列表与互相递归的结构体。

use std::sync::LazyLock;

use soia_core::unrecognized::UnrecognizedFields;
use soia_core::{KeyedList, Serializer, StructBuilder, serializers};

/// 平面坐标点。
#[derive(Debug, Clone, Default)]
pub struct Point {
    /// 横坐标（编号 0）。
    pub x: i32,
    /// 纵坐标（编号 1）。
    pub y: i32,
    unrecognized: Option<UnrecognizedFields>,
}

/// `Point` 的可变伴生。
#[derive(Debug, Default)]
pub struct MutablePoint {
    /// 横坐标。
    pub x: i32,
    /// 纵坐标。
    pub y: i32,
    unrecognized: Option<UnrecognizedFields>,
}

impl Point {
    /// 全字段构造。
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            unrecognized: None,
        }
    }

    /// 进程级注册好的序列化器句柄。
    pub fn serializer() -> Serializer<Point> {
        POINT_SERIALIZER.clone()
    }
}

impl MutablePoint {
    /// 冻结为不可变形态。
    pub fn to_frozen(self) -> Point {
        Point {
            x: self.x,
            y: self.y,
            unrecognized: self.unrecognized,
        }
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl Eq for Point {}

static POINT_SERIALIZER: LazyLock<Serializer<Point>> = LazyLock::new(|| {
    let mut builder = StructBuilder::<Point, MutablePoint>::new(
        "structs.soia:Point",
        Point::default,
        MutablePoint::default,
        MutablePoint::to_frozen,
        |frozen| frozen.unrecognized.as_ref(),
        |mutable, unrecognized| mutable.unrecognized = Some(unrecognized),
    );
    builder
        .add_field(
            "x",
            0,
            serializers::int32(),
            |frozen: &Point| &frozen.x,
            |mutable: &mut MutablePoint, value| mutable.x = value,
        )
        .expect("register Point.x");
    builder
        .add_field(
            "y",
            1,
            serializers::int32(),
            |frozen: &Point| &frozen.y,
            |mutable: &mut MutablePoint, value| mutable.y = value,
        )
        .expect("register Point.y");
    builder.finalize().expect("finalize Point")
});

/// RGB 颜色。
#[derive(Debug, Clone, Default)]
pub struct Color {
    /// 红（编号 0）。
    pub r: i32,
    /// 绿（编号 1）。
    pub g: i32,
    /// 蓝（编号 2）。
    pub b: i32,
    unrecognized: Option<UnrecognizedFields>,
}

/// `Color` 的可变伴生。
#[derive(Debug, Default)]
pub struct MutableColor {
    /// 红。
    pub r: i32,
    /// 绿。
    pub g: i32,
    /// 蓝。
    pub b: i32,
    unrecognized: Option<UnrecognizedFields>,
}

impl Color {
    /// 全字段构造。
    pub fn new(r: i32, g: i32, b: i32) -> Self {
        Self {
            r,
            g,
            b,
            unrecognized: None,
        }
    }

    /// 进程级注册好的序列化器句柄。
    pub fn serializer() -> Serializer<Color> {
        COLOR_SERIALIZER.clone()
    }
}

impl MutableColor {
    /// 冻结为不可变形态。
    pub fn to_frozen(self) -> Color {
        Color {
            r: self.r,
            g: self.g,
            b: self.b,
            unrecognized: self.unrecognized,
        }
    }
}

impl PartialEq for Color {
    fn eq(&self, other: &Self) -> bool {
        self.r == other.r && self.g == other.g && self.b == other.b
    }
}

impl Eq for Color {}

static COLOR_SERIALIZER: LazyLock<Serializer<Color>> = LazyLock::new(|| {
    let mut builder = StructBuilder::<Color, MutableColor>::new(
        "structs.soia:Color",
        Color::default,
        MutableColor::default,
        MutableColor::to_frozen,
        |frozen| frozen.unrecognized.as_ref(),
        |mutable, unrecognized| mutable.unrecognized = Some(unrecognized),
    );
    builder
        .add_field(
            "r",
            0,
            serializers::int32(),
            |frozen: &Color| &frozen.r,
            |mutable: &mut MutableColor, value| mutable.r = value,
        )
        .expect("register Color.r");
    builder
        .add_field(
            "g",
            1,
            serializers::int32(),
            |frozen: &Color| &frozen.g,
            |mutable: &mut MutableColor, value| mutable.g = value,
        )
        .expect("register Color.g");
    builder
        .add_field(
            "b",
            2,
            serializers::int32(),
            |frozen: &Color| &frozen.b,
            |mutable: &mut MutableColor, value| mutable.b = value,
        )
        .expect("register Color.b");
    builder.finalize().expect("finalize Color")
});

/// 三角形：嵌套结构体 + 列表字段。
#[derive(Debug, Clone, Default)]
pub struct Triangle {
    /// 填充色（编号 0）。
    pub color: Color,
    /// 顶点序列（编号 1）。
    pub points: Vec<Point>,
    unrecognized: Option<UnrecognizedFields>,
}

/// `Triangle` 的可变伴生。
#[derive(Debug, Default)]
pub struct MutableTriangle {
    /// 填充色。
    pub color: Color,
    /// 顶点序列。
    pub points: Vec<Point>,
    unrecognized: Option<UnrecognizedFields>,
}

impl Triangle {
    /// 全字段构造。
    pub fn new(color: Color, points: Vec<Point>) -> Self {
        Self {
            color,
            points,
            unrecognized: None,
        }
    }

    /// 进程级注册好的序列化器句柄。
    pub fn serializer() -> Serializer<Triangle> {
        TRIANGLE_SERIALIZER.clone()
    }
}

impl MutableTriangle {
    /// 冻结为不可变形态。
    pub fn to_frozen(self) -> Triangle {
        Triangle {
            color: self.color,
            points: self.points,
            unrecognized: self.unrecognized,
        }
    }
}

impl PartialEq for Triangle {
    fn eq(&self, other: &Self) -> bool {
        self.color == other.color && self.points == other.points
    }
}

impl Eq for Triangle {}

static TRIANGLE_SERIALIZER: LazyLock<Serializer<Triangle>> = LazyLock::new(|| {
    let mut builder = StructBuilder::<Triangle, MutableTriangle>::new(
        "structs.soia:Triangle",
        Triangle::default,
        MutableTriangle::default,
        MutableTriangle::to_frozen,
        |frozen| frozen.unrecognized.as_ref(),
        |mutable, unrecognized| mutable.unrecognized = Some(unrecognized),
    );
    builder
        .add_field(
            "color",
            0,
            Color::serializer(),
            |frozen: &Triangle| &frozen.color,
            |mutable: &mut MutableTriangle, value| mutable.color = value,
        )
        .expect("register Triangle.color");
    builder
        .add_field(
            "points",
            1,
            serializers::list(Point::serializer()),
            |frozen: &Triangle| &frozen.points,
            |mutable: &mut MutableTriangle, value| mutable.points = value,
        )
        .expect("register Triangle.points");
    builder.finalize().expect("finalize Triangle")
});

/// 键控列表的元素类型。
#[derive(Debug, Clone, Default)]
pub struct Item {
    /// 整数键（编号 0）。
    pub int64: i64,
    /// 字符串键（编号 1）。
    pub string: String,
    /// 另一个字符串键（编号 2）。
    pub other_string: String,
    unrecognized: Option<UnrecognizedFields>,
}

/// `Item` 的可变伴生。
#[derive(Debug, Default)]
pub struct MutableItem {
    /// 整数键。
    pub int64: i64,
    /// 字符串键。
    pub string: String,
    /// 另一个字符串键。
    pub other_string: String,
    unrecognized: Option<UnrecognizedFields>,
}

impl Item {
    /// 全字段构造。
    pub fn new(int64: i64, string: impl Into<String>, other_string: impl Into<String>) -> Self {
        Self {
            int64,
            string: string.into(),
            other_string: other_string.into(),
            unrecognized: None,
        }
    }

    /// 进程级注册好的序列化器句柄。
    pub fn serializer() -> Serializer<Item> {
        ITEM_SERIALIZER.clone()
    }
}

impl MutableItem {
    /// 冻结为不可变形态。
    pub fn to_frozen(self) -> Item {
        Item {
            int64: self.int64,
            string: self.string,
            other_string: self.other_string,
            unrecognized: self.unrecognized,
        }
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.int64 == other.int64
            && self.string == other.string
            && self.other_string == other.other_string
    }
}

impl Eq for Item {}

static ITEM_SERIALIZER: LazyLock<Serializer<Item>> = LazyLock::new(|| {
    let mut builder = StructBuilder::<Item, MutableItem>::new(
        "structs.soia:Item",
        Item::default,
        MutableItem::default,
        MutableItem::to_frozen,
        |frozen| frozen.unrecognized.as_ref(),
        |mutable, unrecognized| mutable.unrecognized = Some(unrecognized),
    );
    builder
        .add_field(
            "int64",
            0,
            serializers::int64(),
            |frozen: &Item| &frozen.int64,
            |mutable: &mut MutableItem, value| mutable.int64 = value,
        )
        .expect("register Item.int64");
    builder
        .add_field(
            "string",
            1,
            serializers::string(),
            |frozen: &Item| &frozen.string,
            |mutable: &mut MutableItem, value| mutable.string = value,
        )
        .expect("register Item.string");
    builder
        .add_field(
            "other_string",
            2,
            serializers::string(),
            |frozen: &Item| &frozen.other_string,
            |mutable: &mut MutableItem, value| mutable.other_string = value,
        )
        .expect("register Item.other_string");
    builder.finalize().expect("finalize Item")
});

/// `Item.int64` 键路径的提取函数。
pub fn item_int64_key(item: &Item) -> i64 {
    item.int64
}

/// `Item.string` 键路径的提取函数。
pub fn item_string_key(item: &Item) -> String {
    item.string.clone()
}

/// `Item.other_string` 键路径的提取函数。
pub fn item_other_string_key(item: &Item) -> String {
    item.other_string.clone()
}

/// 以 `int64` 为键构建键控列表。
pub fn int64_keyed(items: Vec<Item>) -> KeyedList<Item, i64> {
    KeyedList::new(items, "int64", item_int64_key)
}

/// 以 `string` 为键构建键控列表。
pub fn string_keyed(items: Vec<Item>) -> KeyedList<Item, String> {
    KeyedList::new(items, "string", item_string_key)
}

/// 以 `other_string` 为键构建键控列表。
pub fn other_string_keyed(items: Vec<Item>) -> KeyedList<Item, String> {
    KeyedList::new(items, "other_string", item_other_string_key)
}

/// 聚合三个键控列表字段的结构体。
#[derive(Debug, Clone)]
pub struct Items {
    /// 以 `int64` 为键（编号 0）。
    pub array_with_int64_key: KeyedList<Item, i64>,
    /// 以 `string` 为键（编号 1）。
    pub array_with_string_key: KeyedList<Item, String>,
    /// 以 `other_string` 为键（编号 2）。
    pub array_with_other_string_key: KeyedList<Item, String>,
    unrecognized: Option<UnrecognizedFields>,
}

/// `Items` 的可变伴生。
#[derive(Debug)]
pub struct MutableItems {
    /// 以 `int64` 为键。
    pub array_with_int64_key: KeyedList<Item, i64>,
    /// 以 `string` 为键。
    pub array_with_string_key: KeyedList<Item, String>,
    /// 以 `other_string` 为键。
    pub array_with_other_string_key: KeyedList<Item, String>,
    unrecognized: Option<UnrecognizedFields>,
}

impl Default for Items {
    fn default() -> Self {
        Self {
            array_with_int64_key: int64_keyed(Vec::new()),
            array_with_string_key: string_keyed(Vec::new()),
            array_with_other_string_key: other_string_keyed(Vec::new()),
            unrecognized: None,
        }
    }
}

impl Default for MutableItems {
    fn default() -> Self {
        Self {
            array_with_int64_key: int64_keyed(Vec::new()),
            array_with_string_key: string_keyed(Vec::new()),
            array_with_other_string_key: other_string_keyed(Vec::new()),
            unrecognized: None,
        }
    }
}

impl Items {
    /// 进程级注册好的序列化器句柄。
    pub fn serializer() -> Serializer<Items> {
        ITEMS_SERIALIZER.clone()
    }
}

impl MutableItems {
    /// 冻结为不可变形态。
    pub fn to_frozen(self) -> Items {
        Items {
            array_with_int64_key: self.array_with_int64_key,
            array_with_string_key: self.array_with_string_key,
            array_with_other_string_key: self.array_with_other_string_key,
            unrecognized: self.unrecognized,
        }
    }
}

impl PartialEq for Items {
    fn eq(&self, other: &Self) -> bool {
        self.array_with_int64_key == other.array_with_int64_key
            && self.array_with_string_key == other.array_with_string_key
            && self.array_with_other_string_key == other.array_with_other_string_key
    }
}

impl Eq for Items {}

static ITEMS_SERIALIZER: LazyLock<Serializer<Items>> = LazyLock::new(|| {
    let mut builder = StructBuilder::<Items, MutableItems>::new(
        "structs.soia:Items",
        Items::default,
        MutableItems::default,
        MutableItems::to_frozen,
        |frozen| frozen.unrecognized.as_ref(),
        |mutable, unrecognized| mutable.unrecognized = Some(unrecognized),
    );
    builder
        .add_field(
            "array_with_int64_key",
            0,
            serializers::keyed_list(Item::serializer(), "int64", item_int64_key),
            |frozen: &Items| &frozen.array_with_int64_key,
            |mutable: &mut MutableItems, value| mutable.array_with_int64_key = value,
        )
        .expect("register Items.array_with_int64_key");
    builder
        .add_field(
            "array_with_string_key",
            1,
            serializers::keyed_list(Item::serializer(), "string", item_string_key),
            |frozen: &Items| &frozen.array_with_string_key,
            |mutable: &mut MutableItems, value| mutable.array_with_string_key = value,
        )
        .expect("register Items.array_with_string_key");
    builder
        .add_field(
            "array_with_other_string_key",
            2,
            serializers::keyed_list(Item::serializer(), "other_string", item_other_string_key),
            |frozen: &Items| &frozen.array_with_other_string_key,
            |mutable: &mut MutableItems, value| mutable.array_with_other_string_key = value,
        )
        .expect("register Items.array_with_other_string_key");
    builder.finalize().expect("finalize Items")
});

/// 与 [`RecB`] 互相递归的结构体。
///
/// 递归字段的冻结侧存储是显式的缺席标记（`Option<Box<_>>`）：缺席即默认，
/// 可见默认值按需物化为类型自身的默认实例。
#[derive(Debug, Clone, Default)]
pub struct RecA {
    /// 自引用（编号 0，类型 `RecA`）。
    pub a: Option<Box<RecA>>,
    /// 交叉引用（编号 1，类型 `RecB`）。
    pub b: Option<Box<RecB>>,
    unrecognized: Option<UnrecognizedFields>,
}

/// `RecA` 的可变伴生。
#[derive(Debug, Default)]
pub struct MutableRecA {
    /// 自引用。
    pub a: Option<Box<RecA>>,
    /// 交叉引用。
    pub b: Option<Box<RecB>>,
    unrecognized: Option<UnrecognizedFields>,
}

/// 与 [`RecA`] 互相递归的结构体，带一个标量字段作为非默认内容的锚点。
#[derive(Debug, Clone, Default)]
pub struct RecB {
    /// 交叉引用（编号 0，类型 `RecA`）。
    pub a: Option<Box<RecA>>,
    /// 标签（编号 1）。
    pub label: String,
    unrecognized: Option<UnrecognizedFields>,
}

/// `RecB` 的可变伴生。
#[derive(Debug, Default)]
pub struct MutableRecB {
    /// 交叉引用。
    pub a: Option<Box<RecA>>,
    /// 标签。
    pub label: String,
    unrecognized: Option<UnrecognizedFields>,
}

impl RecA {
    /// 进程级注册好的序列化器句柄。
    pub fn serializer() -> Serializer<RecA> {
        REC_SERIALIZERS.0.clone()
    }
}

impl MutableRecA {
    /// 冻结为不可变形态。
    pub fn to_frozen(self) -> RecA {
        RecA {
            a: self.a,
            b: self.b,
            unrecognized: self.unrecognized,
        }
    }
}

impl RecB {
    /// 进程级注册好的序列化器句柄。
    pub fn serializer() -> Serializer<RecB> {
        REC_SERIALIZERS.1.clone()
    }
}

impl MutableRecB {
    /// 冻结为不可变形态。
    pub fn to_frozen(self) -> RecB {
        RecB {
            a: self.a,
            label: self.label,
            unrecognized: self.unrecognized,
        }
    }
}

/// 递归字段的相等性：缺席与“值恰为默认实例”等价，避免编码路径上
/// “中间槽位写默认”与“尾部省略”产生两种不相等的表示。
fn rec_a_is_default(rec: &RecA) -> bool {
    rec.a.as_deref().is_none_or(rec_a_is_default)
        && rec.b.as_deref().is_none_or(rec_b_is_default)
}

fn rec_b_is_default(rec: &RecB) -> bool {
    rec.a.as_deref().is_none_or(rec_a_is_default) && rec.label.is_empty()
}

fn rec_a_field_eq(left: &Option<Box<RecA>>, right: &Option<Box<RecA>>) -> bool {
    match (left, right) {
        (None, None) => true,
        (Some(left), Some(right)) => left == right,
        (None, Some(present)) | (Some(present), None) => rec_a_is_default(present),
    }
}

fn rec_b_field_eq(left: &Option<Box<RecB>>, right: &Option<Box<RecB>>) -> bool {
    match (left, right) {
        (None, None) => true,
        (Some(left), Some(right)) => left == right,
        (None, Some(present)) | (Some(present), None) => rec_b_is_default(present),
    }
}

impl PartialEq for RecA {
    fn eq(&self, other: &Self) -> bool {
        rec_a_field_eq(&self.a, &other.a) && rec_b_field_eq(&self.b, &other.b)
    }
}

impl Eq for RecA {}

impl PartialEq for RecB {
    fn eq(&self, other: &Self) -> bool {
        rec_a_field_eq(&self.a, &other.a) && self.label == other.label
    }
}

impl Eq for RecB {}

/// 互相递归的类型必须在同一次注册期内互相引用：先各自取得句柄，再注册
/// 字段，最后分别 `finalize`（两阶段发布）。
static REC_SERIALIZERS: LazyLock<(Serializer<RecA>, Serializer<RecB>)> = LazyLock::new(|| {
    let mut a_builder = StructBuilder::<RecA, MutableRecA>::new(
        "structs.soia:RecA",
        RecA::default,
        MutableRecA::default,
        MutableRecA::to_frozen,
        |frozen| frozen.unrecognized.as_ref(),
        |mutable, unrecognized| mutable.unrecognized = Some(unrecognized),
    );
    let mut b_builder = StructBuilder::<RecB, MutableRecB>::new(
        "structs.soia:RecB",
        RecB::default,
        MutableRecB::default,
        MutableRecB::to_frozen,
        |frozen| frozen.unrecognized.as_ref(),
        |mutable, unrecognized| mutable.unrecognized = Some(unrecognized),
    );
    let a_handle = a_builder.serializer();
    let b_handle = b_builder.serializer();
    a_builder
        .add_recursive_field(
            "a",
            0,
            a_handle.clone(),
            |frozen: &RecA| frozen.a.as_deref(),
            |mutable: &mut MutableRecA, value| mutable.a = Some(Box::new(value)),
        )
        .expect("register RecA.a");
    a_builder
        .add_recursive_field(
            "b",
            1,
            b_handle.clone(),
            |frozen: &RecA| frozen.b.as_deref(),
            |mutable: &mut MutableRecA, value| mutable.b = Some(Box::new(value)),
        )
        .expect("register RecA.b");
    b_builder
        .add_recursive_field(
            "a",
            0,
            a_handle,
            |frozen: &RecB| frozen.a.as_deref(),
            |mutable: &mut MutableRecB, value| mutable.a = Some(Box::new(value)),
        )
        .expect("register RecB.a");
    b_builder
        .add_field(
            "label",
            1,
            serializers::string(),
            |frozen: &RecB| &frozen.label,
            |mutable: &mut MutableRecB, value| mutable.label = value,
        )
        .expect("register RecB.label");
    (
        a_builder.finalize().expect("finalize RecA"),
        b_builder.finalize().expect("finalize RecB"),
    )
});
