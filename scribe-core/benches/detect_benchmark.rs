use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;
use scribe_core::{
    AttributeSet, CharacterFlag, FontRole, Format, FormatDetector, FormatState,
    MutualExclusionResolver, RichTextDocument, Run,
};

/// A note of `paragraphs` lines alternating plain, bold and italic runs.
fn create_test_document(paragraphs: usize) -> RichTextDocument {
    let mut runs = Vec::with_capacity(paragraphs * 3);
    for i in 0..paragraphs {
        let role = if i % 10 == 0 { FontRole::Heading2 } else { FontRole::Body };
        runs.push(Run::new("The quick brown ", AttributeSet::default().with_font_role(role)));
        runs.push(Run::new("fox jumps ", AttributeSet::default().with_flag(CharacterFlag::Bold)));
        runs.push(Run::new("over the dog\n", AttributeSet::default().with_flag(CharacterFlag::Italic)));
    }
    RichTextDocument::from_runs(runs)
}

fn bench_detect_at(c: &mut Criterion) {
    let doc = create_test_document(200);
    let detector = FormatDetector::new();
    let middle = doc.len() / 2;

    c.bench_function("detect_at_middle_200_lines", |b| {
        b.iter(|| black_box(detector.detect_at(black_box(&doc), black_box(middle))))
    });
}

fn bench_detect_range(c: &mut Criterion) {
    let mut group = c.benchmark_group("Range Detection");
    let doc = create_test_document(200);
    let detector = FormatDetector::new();

    for len in [10usize, 1_000, doc.len()] {
        group.throughput(Throughput::Elements(len as u64));
        group.bench_function(format!("detect_range_{len}"), |b| {
            b.iter(|| black_box(detector.detect_range(black_box(&doc), 0..len)))
        });
    }
    group.finish();
}

fn bench_validate(c: &mut Criterion) {
    let resolver = MutualExclusionResolver::new();
    let raw = [
        Format::Bold,
        Format::Heading3,
        Format::Heading1,
        Format::AlignRight,
        Format::AlignCenter,
        Format::NumberedList,
        Format::Checkbox,
    ];

    c.bench_function("validate_conflicting_set", |b| {
        b.iter(|| black_box(resolver.validate(black_box(raw))))
    });

    c.bench_function("toggle_heading", |b| {
        b.iter(|| black_box(resolver.toggle(black_box(&FormatState::DEFAULT), Format::Heading1)))
    });
}

criterion_group!(benches, bench_detect_at, bench_detect_range, bench_validate);
criterion_main!(benches);
