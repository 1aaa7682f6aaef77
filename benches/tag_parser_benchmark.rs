use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use valtag::model::{FieldDescription, MockTypeProvider, TypeDescription};
use valtag::{Analyzer, parse_tag};

fn benchmark_parser(c: &mut Criterion) {
    let annotation = "required,len:8:256";

    c.bench_function("parse_tag", |b| {
        b.iter(|| black_box(parse_tag(black_box(annotation))))
    });
}

fn benchmark_annotation_shapes(c: &mut Criterion) {
    let annotations = [
        ("plain", "required,email"),
        ("options", "len:8:256,eq:a:b:c:d"),
        ("quoted", r#"re:"^[a-z]+\[[0-9]+\]$",contains:"a,b:c""#),
        ("nested", "required,[len:1:32]omitnil,[]required,[]email"),
        ("deep", "[[[[[required]]]]][][][][]email"),
    ];

    let mut group = c.benchmark_group("annotation_shapes");
    for (name, annotation) in annotations {
        group.throughput(Throughput::Bytes(annotation.len() as u64));
        group.bench_function(name, |b| {
            b.iter(|| black_box(parse_tag(black_box(annotation))))
        });
    }
    group.finish();
}

fn benchmark_analysis(c: &mut Criterion) {
    let provider = MockTypeProvider::new().with_type(
        "Signup",
        TypeDescription::record(
            "Signup",
            vec![
                FieldDescription::new("Email", "string").with_annotation("required,email"),
                FieldDescription::new("Password", "string").with_annotation("len:8:256"),
                FieldDescription::new("Confirm", "string").with_annotation("eq:&Password"),
                FieldDescription::new("Tags", "map[string][]string")
                    .with_annotation("[len:1:16][]lower"),
                FieldDescription::new("Age", "*uint8").with_annotation("omitnil,min:18"),
            ],
        ),
    );
    let analyzer = Analyzer::new(provider);

    c.bench_function("analyze_record", |b| {
        b.iter(|| black_box(analyzer.analyze(black_box("Signup"))))
    });
}

criterion_group!(
    benches,
    benchmark_parser,
    benchmark_annotation_shapes,
    benchmark_analysis
);
criterion_main!(benches);
