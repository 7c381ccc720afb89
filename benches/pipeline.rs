//! Benchmarks for the tailor pipeline.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tailor::candidate::{parse_candidate, ParseOptions};
use tailor::extract::{Extractor, LexOptions};
use tailor::{CompilationContext, ConfigFragment, RawContent};

const PAGE: &str = r#"
<main class="container mx-auto px-4 md:px-8">
  <h1 class="text-3xl font-bold text-gray-900 dark:text-white">Title</h1>
  <p class="mt-4 text-sm/6 text-gray-600 hover:text-gray-900">Body</p>
  <a class="inline-block rounded-lg bg-blue-500/75 px-3 py-2 focus:outline-none">Link</a>
  <div class="grid gap-4 sm:gap-6 lg:gap-8 w-[calc(100%-2rem)] [mask-type:alpha]"></div>
  <img class="h-8 w-8 -mt-2 z-10 group-hover:opacity-50" src="a.png">
</main>
"#;

/// A page of `copies` blocks, each using a few distinct spacing values.
fn large_page(copies: usize) -> String {
    (0..copies)
        .map(|i| format!("<div class=\"p-{} m-{} w-{} text-center\">{}</div>\n", i % 12, i % 8, i % 16, PAGE))
        .collect()
}

// -- Extraction benchmarks --

fn bench_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("extraction");
    let large = large_page(200);

    group.bench_function("extract_page_cold", |b| {
        b.iter(|| Extractor::new(LexOptions::default()).extract(black_box(PAGE), "html"))
    });

    group.bench_function("extract_large_warm", |b| {
        let mut extractor = Extractor::new(LexOptions::default());
        extractor.extract(&large, "html");
        b.iter(|| extractor.extract(black_box(&large), "html"))
    });

    group.finish();
}

// -- Candidate parsing benchmarks --

fn bench_candidates(c: &mut Criterion) {
    let mut group = c.benchmark_group("candidates");
    let options = ParseOptions::default();

    group.bench_function("parse_simple", |b| {
        b.iter(|| parse_candidate(black_box("hover:bg-red-500/50"), &options))
    });

    group.bench_function("parse_arbitrary", |b| {
        b.iter(|| parse_candidate(black_box("sm:w-[calc(100%-2rem)]/20"), &options))
    });

    group.finish();
}

// -- Full build benchmarks --

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    let content = [RawContent::new(large_page(50), "html")];
    let css = "@tailwind base;\n@tailwind components;\n@tailwind utilities;\n";

    group.bench_function("build_cold", |b| {
        b.iter(|| {
            let mut context = CompilationContext::new(&[ConfigFragment::new()]).unwrap();
            context.build(black_box(css), &content, &[]).unwrap()
        })
    });

    group.bench_function("build_incremental", |b| {
        let mut context = CompilationContext::new(&[ConfigFragment::new()]).unwrap();
        context.build(css, &content, &[]).unwrap();
        b.iter(|| context.build(black_box(css), &content, &[]).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_extraction, bench_candidates, bench_build);
criterion_main!(benches);
