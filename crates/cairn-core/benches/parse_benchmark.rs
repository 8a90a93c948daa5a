//! Benchmarks comparing Cairn against pulldown-cmark on the same Markdown
//!
//! Run with: cargo bench -p cairn-core

use cairn_core::{to_markdown, Event, Parser, Profile};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pulldown_cmark::{Options, Parser as MdParser};

/// Representative document touching every block kind
const SAMPLE: &str = r#"# Introduction

This is a paragraph with *emphasis*, **strong text**, and `inline code`.
It demonstrates the basic capabilities of the format, with a [link][docs]
and a footnote[^perf].

## Lists

- First item with some content
- Second item with more content
  - Nested item
- Third item concluding the list

1. Step one of the process
2. Step two continues

   With a second paragraph.
3. Step three completes

- [x] Parse blocks
- [ ] Resolve inlines

## Code Example

```rust
fn fibonacci(n: u64) -> u64 {
    match n {
        0 => 0,
        1 => 1,
        _ => fibonacci(n - 1) + fibonacci(n - 2),
    }
}
```

## Table

| Name    | Speed   | Memory |
| :------ | ------: | :----: |
| Fast    | 100ms   | 10MB   |
| Medium  | 500ms   | 50MB   |
| Slow    | 1000ms  | 100MB  |

## Quote

> The best code is no code at all.
> Every line of code you write is a liability.
>
> -- Someone ~~wise~~ *anonymous*

---

End of document.

[docs]: https://example.com/docs "Documentation"
[^perf]: Measured on a quiet machine.
"#;

fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    // Set throughput for bytes/sec reporting
    group.throughput(Throughput::Bytes(SAMPLE.len() as u64));

    group.bench_function("cairn_tree", |b| {
        b.iter(|| {
            let doc = Parser::new(Profile::Gfm).parse(black_box(SAMPLE));
            black_box(doc.blocks.len())
        })
    });

    group.bench_function("cairn_events", |b| {
        b.iter(|| {
            let events: Vec<Event> = Parser::new(Profile::Gfm)
                .parse(black_box(SAMPLE))
                .into_events()
                .collect();
            black_box(events.len())
        })
    });

    group.bench_function("pulldown", |b| {
        b.iter(|| {
            let parser = MdParser::new_ext(black_box(SAMPLE), markdown_options());
            let events: Vec<_> = parser.collect();
            black_box(events.len())
        })
    });

    group.finish();
}

fn bench_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("scaling");

    for size in [1, 5, 10, 20].iter() {
        let content: String = SAMPLE.repeat(*size);

        group.throughput(Throughput::Bytes(content.len() as u64));

        group.bench_with_input(BenchmarkId::new("cairn", size), &content, |b, content| {
            b.iter(|| {
                let count = Parser::new(Profile::Gfm)
                    .parse(black_box(content))
                    .into_events()
                    .count();
                black_box(count)
            })
        });

        group.bench_with_input(BenchmarkId::new("pulldown", size), &content, |b, content| {
            b.iter(|| {
                let parser = MdParser::new_ext(black_box(content), markdown_options());
                black_box(parser.count())
            })
        });
    }

    group.finish();
}

fn bench_inline_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("inline");

    let inline = "This has *emphasis*, **strong**, `code`, [link](https://example.com), \
                  <https://auto.link>, and ~~strike~~ with _under*scores*_.\n"
        .repeat(50);

    group.throughput(Throughput::Bytes(inline.len() as u64));

    group.bench_function("cairn", |b| {
        b.iter(|| {
            let count = Parser::new(Profile::Gfm)
                .parse(black_box(&inline))
                .into_events()
                .count();
            black_box(count)
        })
    });

    group.bench_function("pulldown", |b| {
        b.iter(|| {
            let parser = MdParser::new_ext(black_box(&inline), markdown_options());
            black_box(parser.count())
        })
    });

    group.finish();
}

fn bench_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("round_trip");
    group.throughput(Throughput::Bytes(SAMPLE.len() as u64));

    group.bench_function("cairn_to_markdown", |b| {
        b.iter(|| {
            let doc = Parser::new(Profile::Gfm).parse(black_box(SAMPLE));
            black_box(to_markdown(doc).len())
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_parse,
    bench_scaling,
    bench_inline_parsing,
    bench_round_trip
);
criterion_main!(benches);
