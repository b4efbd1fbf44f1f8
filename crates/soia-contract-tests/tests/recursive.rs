//! 互相递归的记录类型：两阶段注册、惰性默认与嵌套往返。

use serde_json::json;

use soia_contract_tests::structs::{MutableRecA, MutableRecB, RecA, RecB};

/// RecA { a: RecA { b: RecB { label: "x" } } } —— 叶子上的标签使整棵树非默认。
fn nested_rec_a() -> RecA {
    let mut leaf = MutableRecB::default();
    leaf.label = "x".to_string();
    let mut inner = MutableRecA::default();
    inner.b = Some(Box::new(leaf.to_frozen()));
    let mut outer = MutableRecA::default();
    outer.a = Some(Box::new(inner.to_frozen()));
    outer.to_frozen()
}

#[test]
fn default_instance_encodes_to_zero_slots() {
    let serializer = RecA::serializer();
    let bytes = serializer.to_bytes(&RecA::default()).expect("encode");
    assert_eq!(bytes.as_ref(), b"soia\xf6");
    assert!(serializer.is_default(&RecA::default()).expect("is_default"));
}

#[test]
fn absent_and_explicit_default_children_are_equal() {
    // 缺席的递归字段与“值恰为默认实例”的递归字段语义等价：缺席字段的
    // 可见默认值就是类型自身的默认实例，两种表示编码为相同字节。
    let mut explicit = MutableRecA::default();
    explicit.a = Some(Box::new(RecA::default()));
    let explicit = explicit.to_frozen();
    assert_eq!(explicit, RecA::default());

    let serializer = RecA::serializer();
    assert_eq!(
        serializer.to_bytes(&explicit).expect("encode").as_ref(),
        serializer.to_bytes(&RecA::default()).expect("encode").as_ref()
    );
}

#[test]
fn nested_values_round_trip_through_all_formats() {
    let serializer = RecA::serializer();
    let value = nested_rec_a();

    let bytes = serializer.to_bytes(&value).expect("encode");
    assert_eq!(serializer.from_bytes(&bytes, false).expect("decode"), value);

    let dense = serializer.to_json(&value, false).expect("dense");
    // 外层 1 槽位；内层 RecA 的 a 缺席（默认 → 占位 []），b 为带标签的 RecB。
    assert_eq!(dense, json!([[[], [[], "x"]]]));
    assert_eq!(serializer.from_json(&dense, false).expect("decode"), value);

    let readable = serializer.to_json_code(&value, true).expect("readable");
    assert_eq!(
        serializer.from_json_code(&readable, false).expect("decode"),
        value
    );
}

#[test]
fn cross_recursion_round_trips() {
    let serializer = RecB::serializer();
    let mut inner_b = MutableRecB::default();
    inner_b.label = "leaf".to_string();
    let mut rec_a = MutableRecA::default();
    rec_a.b = Some(Box::new(inner_b.to_frozen()));
    let mut rec_b = MutableRecB::default();
    rec_b.a = Some(Box::new(rec_a.to_frozen()));
    let value = rec_b.to_frozen();

    let bytes = serializer.to_bytes(&value).expect("encode");
    assert_eq!(serializer.from_bytes(&bytes, false).expect("decode"), value);
    let dense = serializer.to_json(&value, false).expect("dense");
    assert_eq!(serializer.from_json(&dense, false).expect("decode"), value);
}

#[test]
fn deep_nesting_round_trips() {
    let serializer = RecA::serializer();
    let mut leaf_b = MutableRecB::default();
    leaf_b.label = "bottom".to_string();
    let mut value = MutableRecA::default();
    value.b = Some(Box::new(leaf_b.to_frozen()));
    let mut value = value.to_frozen();
    for _ in 0..64 {
        let mut next = MutableRecA::default();
        next.a = Some(Box::new(value));
        value = next.to_frozen();
    }
    let bytes = serializer.to_bytes(&value).expect("encode");
    assert_eq!(serializer.from_bytes(&bytes, false).expect("decode"), value);
    assert_ne!(value, RecA::default());
}
