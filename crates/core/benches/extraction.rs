use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use ezycopy_core::{
    ExtractOptions, LiveDocument, PreprocessConfig, ReconcileStrategy, extract_html, postprocess_markdown,
    preprocess_html,
};
use url::Url;

fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)).unwrap()
}

/// The article fixture repeated until it is roughly `copies` times larger.
fn padded_article(copies: usize) -> String {
    let article = fixture("article.html");
    let body_start = article.find("<article").unwrap();
    let body_end = article.find("</article>").unwrap() + "</article>".len();
    let repeated = article[body_start..body_end].repeat(copies);
    format!("{}{}{}", &article[..body_start], repeated, &article[body_end..])
}

fn bench_full_extraction(c: &mut Criterion) {
    let base = Url::parse("https://example.com/posts/starter").ok();
    let small = fixture("article.html");
    let large = padded_article(40);

    let mut group = c.benchmark_group("full_extraction");

    for strategy in [ReconcileStrategy::ImageLossRetry, ReconcileStrategy::CmsContainer] {
        let options = ExtractOptions::default().with_strategy(strategy);

        group.bench_with_input(BenchmarkId::new("small", strategy), &small, |b, html| {
            b.iter(|| extract_html(black_box(html), base.clone(), &options))
        });

        group.bench_with_input(BenchmarkId::new("large", strategy), &large, |b, html| {
            b.iter(|| extract_html(black_box(html), base.clone(), &options))
        });
    }

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let html = padded_article(40);

    c.bench_function("cleaned_snapshot", |b| {
        b.iter(|| LiveDocument::parse(black_box(&html), None).cleaned_snapshot())
    });
}

fn bench_preprocess(c: &mut Criterion) {
    let html = padded_article(40);
    let config = PreprocessConfig::default();

    c.bench_function("preprocess", |b| b.iter(|| preprocess_html(black_box(&html), &config)));
}

fn bench_postprocess(c: &mut Criterion) {
    let chunk = "Intro paragraph.\n\n\n\n[](https://x.co)\n[1 / 12\n\n---\n\nSee [the notes](#) for more.\n\n";
    let markdown = chunk.repeat(500);

    c.bench_function("postprocess_markdown", |b| b.iter(|| postprocess_markdown(black_box(&markdown))));
}

criterion_group!(benches, bench_full_extraction, bench_snapshot, bench_preprocess, bench_postprocess);
criterion_main!(benches);
