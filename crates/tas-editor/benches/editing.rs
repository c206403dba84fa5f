//! Benchmarks for editing and reconciling scripts
//!
//! Covers the hot paths of an editor session:
//! - Typing bursts through the history, with and without coalescing
//! - Undo/redo of structural branch point edits
//! - Reconciling recordings against long scripts
//! - Markup export and import

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tas_editor::{
    Buttons, EditorConfig, HistoryConfig, InputLine, LineFormat, Position, Range,
    ScriptDocument,
};

/// Generate `lines` input lines alternating between running and jumping
fn generate_lines(lines: usize) -> Vec<InputLine> {
    (0..lines)
        .map(|i| {
            let buttons = if i % 2 == 0 {
                Buttons::RIGHT
            } else {
                Buttons::RIGHT | Buttons::JUMP
            };
            InputLine::new(5 + (i % 7) as u32, buttons)
        })
        .collect()
}

fn generate_script(lines: &[InputLine]) -> String {
    let format = LineFormat::default();
    lines
        .iter()
        .map(|line| line.format(&format))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Benchmark text edits going through the history
fn bench_typing(c: &mut Criterion) {
    let mut group = c.benchmark_group("typing");
    let script = generate_script(&generate_lines(200));

    for coalesce in [true, false] {
        group.bench_with_input(
            BenchmarkId::new("insert_100_chars", coalesce),
            &coalesce,
            |b, &coalesce| {
                b.iter_batched(
                    || {
                        let mut doc = ScriptDocument::from_text("downhill", script.clone());
                        doc.set_config(EditorConfig {
                            history: HistoryConfig {
                                coalesce_typing: coalesce,
                                ..HistoryConfig::default()
                            },
                            ..EditorConfig::default()
                        });
                        doc
                    },
                    |mut doc| {
                        let segment = doc.root().nodes()[0].handle();
                        for offset in 0..100 {
                            doc.insert(segment, Position::new(offset), "#").unwrap();
                        }
                        black_box(doc.history_stats())
                    },
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

/// Benchmark undo and redo of branch point creation
fn bench_branch_history(c: &mut Criterion) {
    let mut group = c.benchmark_group("branch_history");
    let script = generate_script(&generate_lines(500));

    group.bench_function("create_undo_redo", |b| {
        b.iter_batched(
            || ScriptDocument::from_text("downhill", script.clone()),
            |mut doc| {
                let segment = doc.root().nodes()[0].handle();
                doc.create_branch_point(segment, Range::caret(Position::new(700)))
                    .unwrap();
                doc.undo().unwrap();
                black_box(doc.redo().unwrap())
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

/// Benchmark reconciling takes of growing length
fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");

    for size in [100, 1_000, 5_000] {
        let lines = generate_lines(size);
        let script = generate_script(&lines);
        let mut diverging = lines.clone();
        if let Some(last) = diverging.last_mut() {
            last.buttons = Buttons::LEFT;
        }

        group.bench_with_input(BenchmarkId::new("merge", size), &lines, |b, take| {
            let mut doc = ScriptDocument::from_text("downhill", script.clone());
            b.iter(|| black_box(doc.reconcile("downhill", take, false).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("fork", size), &diverging, |b, take| {
            b.iter_batched(
                || ScriptDocument::from_text("downhill", script.clone()),
                |mut doc| black_box(doc.reconcile("downhill", take, false).unwrap()),
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Benchmark markup export and import
fn bench_markup(c: &mut Criterion) {
    let mut group = c.benchmark_group("markup");
    let mut doc = ScriptDocument::from_text("downhill", generate_script(&generate_lines(1_000)));
    let segment = doc.root().nodes()[0].handle();
    doc.create_branch_point(segment, Range::caret(Position::new(3_000)))
        .unwrap();
    let markup = doc.to_markup();

    group.bench_function("export", |b| b.iter(|| black_box(doc.to_markup())));
    group.bench_function("import", |b| {
        b.iter(|| black_box(ScriptDocument::from_content(&markup).unwrap()))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_typing,
    bench_branch_history,
    bench_reconcile,
    bench_markup
);
criterion_main!(benches);
