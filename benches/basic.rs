use criterion::{criterion_group, criterion_main, Criterion};
use pdt_test::catalog::TestCatalog;
use pdt_test::protocol::{encode_command, parse_response};
use std::hint::black_box;
use std::time::Duration;

pub fn bench_parse_response(c: &mut Criterion) {
    let simple = r#"{"result":"ABC123"}"#;
    let nested = r#"{"result":{"pins":[0,1,2,3,4,5,6,7,8,9,10,11,12,13,14,15],"ok":true},"seq":17}"#;
    c.bench_function("parse_response_simple", |b| {
        b.iter(|| black_box(parse_response(black_box(simple))))
    });
    c.bench_function("parse_response_nested", |b| {
        b.iter(|| black_box(parse_response(black_box(nested))))
    });
    c.bench_function("parse_response_invalid", |b| {
        b.iter(|| black_box(parse_response(black_box("not-json"))))
    });
}

pub fn bench_encode_command(c: &mut Criterion) {
    let catalog = TestCatalog::production();
    let pin_mapping = catalog.get(6).map(|case| case.command.clone()).unwrap_or_default();
    c.bench_function("encode_pin_mapping", |b| {
        b.iter(|| black_box(encode_command(black_box(&pin_mapping))))
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .warm_up_time(Duration::from_millis(300))
        .measurement_time(Duration::from_secs(2));
    targets = bench_parse_response, bench_encode_command
}
criterion_main!(benches);
