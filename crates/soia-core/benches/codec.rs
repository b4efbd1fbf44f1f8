//! 编解码往返基准：一个小结构体在二进制与稠密 JSON 两条路径上的吞吐。
//!
//! # 设计目的（Why）
//! - 槽位压缩与标签分发都在热路径上，基准固化当前实现的量级，作为后续
//!   改动的回归参照；
//! - 结构体在基准内现场注册，避免基准 crate 依赖契约测试夹具。

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use soia_core::unrecognized::UnrecognizedFields;
use soia_core::{Serializer, StructBuilder, serializers};

#[derive(Debug, Clone, Default)]
struct Sample {
    id: i64,
    label: String,
    scores: Vec<i32>,
    unrecognized: Option<UnrecognizedFields>,
}

#[derive(Default)]
struct SampleMut {
    id: i64,
    label: String,
    scores: Vec<i32>,
    unrecognized: Option<UnrecognizedFields>,
}

fn sample_serializer() -> Serializer<Sample> {
    let mut builder = StructBuilder::<Sample, SampleMut>::new(
        "bench.soia:Sample",
        Sample::default,
        SampleMut::default,
        |mutable| Sample {
            id: mutable.id,
            label: mutable.label,
            scores: mutable.scores,
            unrecognized: mutable.unrecognized,
        },
        |frozen| frozen.unrecognized.as_ref(),
        |mutable, unrecognized| mutable.unrecognized = Some(unrecognized),
    );
    builder
        .add_field(
            "id",
            0,
            serializers::int64(),
            |frozen: &Sample| &frozen.id,
            |mutable: &mut SampleMut, value| mutable.id = value,
        )
        .expect("register id");
    builder
        .add_field(
            "label",
            1,
            serializers::string(),
            |frozen: &Sample| &frozen.label,
            |mutable: &mut SampleMut, value| mutable.label = value,
        )
        .expect("register label");
    builder
        .add_field(
            "scores",
            2,
            serializers::list(serializers::int32()),
            |frozen: &Sample| &frozen.scores,
            |mutable: &mut SampleMut, value| mutable.scores = value,
        )
        .expect("register scores");
    builder.finalize().expect("finalize Sample")
}

fn bench_binary_round_trip(c: &mut Criterion) {
    let serializer = sample_serializer();
    let value = Sample {
        id: 987_654_321,
        label: "sample label".to_string(),
        scores: (0..64).collect(),
        unrecognized: None,
    };
    let bytes = serializer.to_bytes(&value).expect("encode");

    c.bench_function("struct_to_bytes", |b| {
        b.iter(|| serializer.to_bytes(black_box(&value)).expect("encode"))
    });
    c.bench_function("struct_from_bytes", |b| {
        b.iter(|| {
            serializer
                .from_bytes(black_box(&bytes), false)
                .expect("decode")
        })
    });
}

fn bench_dense_json_round_trip(c: &mut Criterion) {
    let serializer = sample_serializer();
    let value = Sample {
        id: 987_654_321,
        label: "sample label".to_string(),
        scores: (0..64).collect(),
        unrecognized: None,
    };
    let code = serializer.to_json_code(&value, false).expect("to json");

    c.bench_function("struct_to_dense_json", |b| {
        b.iter(|| {
            serializer
                .to_json_code(black_box(&value), false)
                .expect("to json")
        })
    });
    c.bench_function("struct_from_dense_json", |b| {
        b.iter(|| {
            serializer
                .from_json_code(black_box(&code), false)
                .expect("from json")
        })
    });
}

criterion_group!(codec_benches, bench_binary_round_trip, bench_dense_json_round_trip);
criterion_main!(codec_benches);
