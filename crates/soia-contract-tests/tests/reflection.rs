//! 反射文档契约：注册表走查产出的描述文档及其解析往返。

use serde_json::json;

use soia_contract_tests::enums::Status;
use soia_contract_tests::full_name::FullName;
use soia_contract_tests::structs::RecA;
use soia_contract_tests::vehicles::Car;
use soia_core::method::Method;
use soia_core::reflection::{RecordKind, TypeDescriptor, TypeSignature};
use soia_core::serializers;

#[test]
fn car_descriptor_matches_the_golden_document() {
    let descriptor = Car::serializer().type_descriptor().expect("descriptor");
    let expected = json!({
        "type": { "kind": "record", "value": "vehicles/car.soia:Car" },
        "records": [
            {
                "kind": "struct",
                "id": "vehicles/car.soia:Car",
                "fields": [
                    { "name": "model", "number": 0,
                      "type": { "kind": "primitive", "value": "string" } },
                    { "name": "purchase_time", "number": 1,
                      "type": { "kind": "primitive", "value": "timestamp" } },
                    { "name": "owner", "number": 2,
                      "type": { "kind": "record", "value": "user.soia:User" } },
                    { "name": "second_owner", "number": 3,
                      "type": { "kind": "optional",
                                "value": { "kind": "record", "value": "user.soia:User" } } }
                ]
            },
            {
                "kind": "struct",
                "id": "user.soia:User",
                "fields": [
                    { "name": "user_id", "number": 0,
                      "type": { "kind": "primitive", "value": "int64" } }
                ]
            }
        ]
    });
    assert_eq!(descriptor.to_json(), expected);

    // 打印-解析-打印是恒等变换。
    let code = descriptor.to_json_code();
    let reparsed = TypeDescriptor::from_json_code(&code).expect("parse back");
    assert_eq!(reparsed, descriptor);
    assert_eq!(reparsed.to_json_code(), code);
}

#[test]
fn record_accessors_split_the_qualified_id() {
    let descriptor = Car::serializer().type_descriptor().expect("descriptor");
    let car = descriptor.record("vehicles/car.soia:Car").expect("car record");
    assert_eq!(car.name(), "Car");
    assert_eq!(car.qualified_name(), "Car");
    assert_eq!(car.module_path(), "vehicles/car.soia");
    assert_eq!(car.fields.len(), 4);
    assert_eq!(car.fields[1].name, "purchase_time");
}

#[test]
fn removed_numbers_appear_in_the_document() {
    let descriptor = FullName::serializer().type_descriptor().expect("descriptor");
    let record = descriptor.record("full_name.soia:FullName").expect("record");
    assert_eq!(record.removed_numbers, vec![1, 2]);
    // 经文本往返后墓碑编号仍在。
    let reparsed = TypeDescriptor::from_json_code(&descriptor.to_json_code()).expect("parse");
    assert_eq!(
        reparsed.record("full_name.soia:FullName").expect("record").removed_numbers,
        vec![1, 2]
    );
}

#[test]
fn enum_descriptor_separates_constants_and_value_variants() {
    let descriptor = Status::serializer().type_descriptor().expect("descriptor");
    let status = descriptor.record("enums.soia:Status").expect("status record");
    assert_eq!(status.kind, RecordKind::Enum);
    let ok = status.fields.iter().find(|f| f.name == "OK").expect("OK");
    assert!(ok.signature.is_none());
    let error = status.fields.iter().find(|f| f.name == "error").expect("error");
    assert_eq!(
        error.signature,
        Some(TypeSignature::Record("enums.soia:Status.Error".to_string()))
    );
    // 负载记录被递归收集。
    assert!(descriptor.record("enums.soia:Status.Error").is_some());
}

#[test]
fn method_descriptor_binds_request_and_response_serializers() {
    let method = Method::new("GetCar", 1234, serializers::string(), Car::serializer());
    assert_eq!(method.name(), "GetCar");
    assert_eq!(method.number(), 1234);
    let bytes = method
        .response_serializer()
        .to_bytes(&Car::default())
        .expect("encode");
    assert_eq!(
        method
            .response_serializer()
            .from_bytes(&bytes, false)
            .expect("decode"),
        Car::default()
    );
    assert_eq!(
        method
            .request_serializer()
            .to_json_code(&"q".to_string(), false)
            .expect("json"),
        "\"q\""
    );
}

#[test]
fn recursive_records_are_collected_once() {
    let descriptor = RecA::serializer().type_descriptor().expect("descriptor");
    assert_eq!(descriptor.records.len(), 2);
    assert!(descriptor.record("structs.soia:RecA").is_some());
    assert!(descriptor.record("structs.soia:RecB").is_some());
}
