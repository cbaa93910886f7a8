use criterion::{black_box, criterion_group, criterion_main, Criterion};
use httpwork::http::builder::build_multipart;
use httpwork::http::params::{BytesAttachment, ListFormat, ListParams, Map};
use httpwork::http::serializer::{flatten, to_json, to_pairs};
use httpwork::params;

fn profile_update() -> Map {
    params! {
        "user" => params! {
            "name" => "alice",
            "age" => 32,
            "address" => params! {
                "city" => "Lisbon",
                "zip" => "1000-001",
                "lines" => vec!["Rua Augusta 10", "2 esq"],
            },
        },
        "tags" => vec!["admin", "beta", "ops", "eu"],
        "ids" => ListParams::new(ListFormat::Csv, (0..20).collect::<Vec<i32>>()),
        "matrix" => vec![vec![1, 2], vec![3, 4]],
        "note" => Option::<&str>::None,
        "active" => true,
        "score" => 0.75,
    }
}

fn benchmark_to_pairs(c: &mut Criterion) {
    let map = profile_update();

    let mut group = c.benchmark_group("to_pairs");
    for format in [ListFormat::Multi, ListFormat::MultiCompatible, ListFormat::Csv] {
        group.bench_function(format!("{format:?}"), |b| {
            b.iter(|| to_pairs(black_box(&map), format))
        });
    }
    group.finish();
}

fn benchmark_to_json(c: &mut Criterion) {
    let map = profile_update();
    c.bench_function("to_json_nested", |b| b.iter(|| to_json(black_box(&map))));
}

fn benchmark_multipart(c: &mut Criterion) {
    let mut map = profile_update();
    map.insert(
        "avatar".into(),
        BytesAttachment::new(vec![7u8; 64 * 1024], "image/png")
            .name("avatar.png")
            .into(),
    );

    c.bench_function("flatten_with_attachment", |b| {
        b.iter(|| flatten(black_box(&map), ListFormat::Multi, true))
    });

    let runtime = tokio::runtime::Runtime::new().unwrap();
    c.bench_function("multipart_encode", |b| {
        b.to_async(&runtime).iter(|| async {
            build_multipart(black_box(&map), ListFormat::Multi)
                .await
                .map(|form| form.into_body())
        })
    });
}

criterion_group!(
    benches,
    benchmark_to_pairs,
    benchmark_to_json,
    benchmark_multipart
);
criterion_main!(benches);
