//! 失败路径契约：畸形输入、形态不匹配与模式误用都以稳定错误码浮出。

use serde_json::json;

use soia_contract_tests::enums::{MyEnum, Status};
use soia_contract_tests::structs::{Color, MutablePoint, Point};
use soia_core::error::codes;
use soia_core::{StructBuilder, serializers, unrecognized::UnrecognizedFields};

#[test]
fn trailing_bytes_after_a_complete_decode_are_rejected() {
    let serializer = Point::serializer();
    let mut buffer = serializer
        .to_bytes(&Point::new(1, 2))
        .expect("encode")
        .to_vec();
    buffer.push(0);
    let err = serializer.from_bytes(&buffer, false).unwrap_err();
    assert_eq!(err.code(), codes::DECODE_TRAILING_BYTES);
}

#[test]
fn truncated_input_is_a_buffer_underflow() {
    // 声称 3 槽位，只给 1 个。
    let err = Color::serializer()
        .from_bytes(b"soia\xf9\x01", false)
        .unwrap_err();
    assert_eq!(err.code(), codes::DECODE_BUFFER_UNDERFLOW);
}

#[test]
fn numeric_tag_for_a_value_variant_is_a_hard_error() {
    // Status 的编号 4 是带负载变体：数字域标签命中它必须报错。
    let err = Status::serializer().from_bytes(b"soia\x04", false).unwrap_err();
    assert_eq!(err.code(), codes::DECODE_UNEXPECTED_WIRE);
    let err = Status::serializer().from_json(&json!(4), false).unwrap_err();
    assert_eq!(err.code(), codes::DECODE_UNEXPECTED_WIRE);
}

#[test]
fn payload_tag_for_a_constant_variant_is_a_hard_error() {
    // 251 = 编号 1 的带负载形态，但 Status 的 1 是常量。
    let err = Status::serializer()
        .from_bytes(b"soia\xfb\x00", false)
        .unwrap_err();
    assert_eq!(err.code(), codes::DECODE_UNEXPECTED_WIRE);
    let err = Status::serializer()
        .from_json(&json!([1, 0]), false)
        .unwrap_err();
    assert_eq!(err.code(), codes::DECODE_UNEXPECTED_WIRE);
}

#[test]
fn impossible_enum_lead_bytes_are_malformed() {
    // 242（空字符串标签）永远不是合法的枚举首字节。
    let err = MyEnum::serializer().from_bytes(b"soia\xf2", false).unwrap_err();
    assert_eq!(err.code(), codes::DECODE_UNEXPECTED_WIRE);
}

#[test]
fn json_shape_mismatch_is_rejected_without_fallback() {
    let err = Point::serializer().from_json(&json!("oops"), false).unwrap_err();
    assert_eq!(err.code(), codes::JSON_SHAPE_MISMATCH);
    let err = serializers::string().from_json(&json!([1]), false).unwrap_err();
    assert_eq!(err.code(), codes::JSON_SHAPE_MISMATCH);
    let err = serializers::int32()
        .from_json(&json!(4294967296i64), false)
        .unwrap_err();
    assert_eq!(err.code(), codes::JSON_NUMBER_RANGE);
}

#[test]
fn invalid_json_text_reports_a_parse_error() {
    let err = Point::serializer().from_json_code("{not json", false).unwrap_err();
    assert_eq!(err.code(), codes::JSON_PARSE);
    // 无魔数前缀的字节按 JSON 文本回退，同样走解析错误。
    let err = Point::serializer().from_bytes(b"{not json", false).unwrap_err();
    assert_eq!(err.code(), codes::JSON_PARSE);
}

#[test]
fn invalid_utf8_string_payload_is_rejected() {
    // f3 02 加两个非法 UTF-8 字节。
    let err = serializers::string()
        .from_bytes(b"soia\xf3\x02\xff\xfe", false)
        .unwrap_err();
    assert_eq!(err.code(), codes::DECODE_INVALID_UTF8);
}

fn no_unrecognized(_frozen: &Point) -> Option<&UnrecognizedFields> {
    None
}

fn drop_unrecognized(_mutable: &mut MutablePoint, _unrecognized: UnrecognizedFields) {}

#[test]
fn schema_misuse_is_reported_with_stable_codes() {
    let mut builder = StructBuilder::<Point, MutablePoint>::new(
        "errors.soia:LatePoint",
        Point::default,
        MutablePoint::default,
        MutablePoint::to_frozen,
        no_unrecognized,
        drop_unrecognized,
    );
    builder
        .add_field(
            "x",
            0,
            serializers::int32(),
            |frozen: &Point| &frozen.x,
            |mutable: &mut MutablePoint, value| mutable.x = value,
        )
        .expect("first registration");
    // 编号冲突。
    let err = builder
        .add_field(
            "x2",
            0,
            serializers::int32(),
            |frozen: &Point| &frozen.x,
            |mutable: &mut MutablePoint, value| mutable.x = value,
        )
        .unwrap_err();
    assert_eq!(err.code(), codes::SCHEMA_DUPLICATE_NUMBER);

    let pending = builder.serializer();
    let err = pending.to_bytes(&Point::new(1, 2)).unwrap_err();
    assert_eq!(err.code(), codes::SCHEMA_NOT_FINALIZED);

    builder.finalize().expect("finalize");
    assert!(pending.to_bytes(&Point::new(1, 2)).is_ok());
}
