use cairn_core::{to_markdown, Event as CairnEvent, Parser, Profile, Tag as CairnTag};
use pulldown_cmark::{Event, Options, Parser as MdParser, Tag};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Counts {
    headings: u32,
    paragraphs: u32,
    lists: u32,
    list_items: u32,
    tables: u32,
    code_blocks: u32,
    quotes: u32,
}

impl Counts {
    fn total(self) -> u32 {
        self.headings
            + self.paragraphs
            + self.lists
            + self.list_items
            + self.tables
            + self.code_blocks
            + self.quotes
    }

    fn diff(self, other: Counts) -> u32 {
        (self.headings as i32 - other.headings as i32).unsigned_abs()
            + (self.paragraphs as i32 - other.paragraphs as i32).unsigned_abs()
            + (self.lists as i32 - other.lists as i32).unsigned_abs()
            + (self.list_items as i32 - other.list_items as i32).unsigned_abs()
            + (self.tables as i32 - other.tables as i32).unsigned_abs()
            + (self.code_blocks as i32 - other.code_blocks as i32).unsigned_abs()
            + (self.quotes as i32 - other.quotes as i32).unsigned_abs()
    }
}

#[derive(Debug)]
struct Case<'a> {
    name: &'a str,
    input: &'a str,
    expected: Counts,
    realistic: MutationList,
}

/// Counts from Cairn's event stream. Paragraphs of tight list items are
/// not emitted, which matches pulldown-cmark.
fn count_cairn(input: &str) -> Counts {
    let mut counts = Counts::default();
    for event in Parser::new(Profile::Gfm).parse(input) {
        if let CairnEvent::Start(tag) = event {
            match tag {
                CairnTag::Heading { .. } => counts.headings += 1,
                CairnTag::Paragraph => counts.paragraphs += 1,
                CairnTag::List { .. } => counts.lists += 1,
                CairnTag::Item => counts.list_items += 1,
                CairnTag::Table(_) => counts.tables += 1,
                CairnTag::CodeBlock(_) => counts.code_blocks += 1,
                CairnTag::BlockQuote => counts.quotes += 1,
                _ => {}
            }
        }
    }
    counts
}

fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
}

fn count_markdown(input: &str) -> Counts {
    let mut counts = Counts::default();
    for event in MdParser::new_ext(input, markdown_options()) {
        if let Event::Start(tag) = event {
            match tag {
                Tag::Heading { .. } => counts.headings += 1,
                Tag::Paragraph => counts.paragraphs += 1,
                Tag::List(_) => counts.lists += 1,
                Tag::Item => counts.list_items += 1,
                Tag::Table(_) => counts.tables += 1,
                Tag::CodeBlock(_) => counts.code_blocks += 1,
                Tag::BlockQuote => counts.quotes += 1,
                _ => {}
            }
        }
    }
    counts
}

/// Every `Start` has a matching `End`, never closing below zero.
fn cairn_events_balanced(input: &str) -> bool {
    let mut depth = 0i64;
    for event in Parser::new(Profile::Gfm).parse(input) {
        match event {
            CairnEvent::Start(_) => depth += 1,
            CairnEvent::End(_) => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

fn accuracy(counts: Counts, expected: Counts) -> f64 {
    let total = expected.total();
    if total == 0 {
        return 1.0;
    }
    let diff = counts.diff(expected);
    let score = (total as f64 - diff as f64) / total as f64;
    score.max(0.0)
}

type MutationList = &'static [&'static str];

struct Lcg {
    state: u64,
}

const SEED: u64 = 0x5eed;
const MAX_VARIANT_LEN: usize = 32_000;
const MAX_MUTATION_STEPS: usize = 3;
const VARIANT_COUNT: usize = 8;

const REALISTIC_BASE: MutationList = &[
    "drop_code_fence_end",
    "drop_table_bar",
    "drop_blank_line",
    "truncate_tail_small",
    "strip_list_dash",
];

const REALISTIC_NESTED: MutationList = &[
    "drop_blank_line",
    "truncate_tail_small",
    "strip_list_dash",
    "drop_quote_marker",
];

const REALISTIC_MISSING_CODE: MutationList = &[
    "drop_code_fence_end",
    "drop_blank_line",
    "truncate_tail_small",
];

const STRESS_MUTATIONS: MutationList = &[
    "drop_code_fence_end",
    "drop_table_bar",
    "drop_blank_line",
    "truncate_tail",
    "strip_list_dash",
    "drop_quote_marker",
    "indent_noise",
    "deep_quotes",
    "delimiter_storm",
];

impl Lcg {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.state >> 32) as u32
    }

    fn choose(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        (self.next_u32() as usize) % max
    }
}

fn apply_mutations(mut input: String, mutations: &[&str], rng: &mut Lcg) -> String {
    let steps = std::cmp::min(MAX_MUTATION_STEPS, mutations.len());
    for _ in 0..steps {
        let pick = rng.choose(mutations.len());
        match mutations[pick] {
            "drop_code_fence_end" => {
                if let Some(pos) = input.rfind("```\n") {
                    input.replace_range(pos..pos + 4, "");
                }
            }
            "drop_table_bar" => {
                if let Some(pos) = input.find("|---|---|") {
                    input.replace_range(pos..pos + 9, "---");
                } else if let Some(pos) = input.find("|---|") {
                    input.replace_range(pos..pos + 5, "---");
                }
            }
            "drop_blank_line" => {
                if let Some(pos) = input.find("\n\n") {
                    input.replace_range(pos..pos + 2, "\n");
                }
            }
            "truncate_tail" => {
                let len = input.len();
                if len > 8 {
                    let cut = rng.choose(len / 4).max(1);
                    input.truncate(len - cut);
                }
            }
            "truncate_tail_small" => {
                let len = input.len();
                if len > 16 {
                    let cut = rng.choose(len / 20).max(1);
                    input.truncate(len - cut);
                }
            }
            "strip_list_dash" => {
                if let Some(pos) = input.find("- ") {
                    input.replace_range(pos..pos + 2, "");
                }
            }
            "drop_quote_marker" => {
                if let Some(pos) = input.rfind("\n> ") {
                    input.replace_range(pos + 1..pos + 3, "");
                }
            }
            "indent_noise" => {
                input = input.replace("\n- ", "\n  - ");
            }
            "deep_quotes" => {
                input.insert_str(0, &"> ".repeat(300));
            }
            "delimiter_storm" => {
                input.push_str(&"*_~[".repeat(400));
                input.push('\n');
            }
            _ => {}
        }
        if input.len() > MAX_VARIANT_LEN {
            input.truncate(MAX_VARIANT_LEN);
            break;
        }
    }
    input
}

fn generate_variants(input: &str, seed: u64, mutations: MutationList) -> Vec<String> {
    let mut rng = Lcg::new(seed);
    let mut variants = Vec::new();
    for _ in 0..VARIANT_COUNT {
        let mutated = apply_mutations(input.to_string(), mutations, &mut rng);
        variants.push(mutated);
    }
    variants
}

fn report_case(case: &Case) -> Counts {
    let cairn_counts = count_cairn(case.input);
    let markdown_counts = count_markdown(case.input);
    let cairn_acc = accuracy(cairn_counts, case.expected);
    let markdown_acc = accuracy(markdown_counts, case.expected);

    for (format, acc, counts) in [
        ("cairn", cairn_acc, cairn_counts),
        ("pulldown", markdown_acc, markdown_counts),
    ] {
        println!(
            "{}\t{}\t{:.2}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            case.name,
            format,
            acc,
            counts.headings,
            counts.paragraphs,
            counts.lists,
            counts.list_items,
            counts.tables,
            counts.code_blocks,
            counts.quotes
        );
    }
    cairn_counts
}

#[derive(Clone, Copy)]
struct ReportStats {
    avg: f64,
    min: f64,
    max: f64,
    /// Variants where Cairn and pulldown-cmark produced identical counts.
    agree: u32,
    variants: usize,
}

fn report_noisy(case: &Case, mutations: MutationList, label: &str) -> (ReportStats, ReportStats) {
    let variants = generate_variants(case.input, SEED, mutations);

    let mut cairn_sum = 0.0;
    let mut markdown_sum = 0.0;
    let mut cairn_min: f64 = 1.0;
    let mut markdown_min: f64 = 1.0;
    let mut cairn_max: f64 = 0.0;
    let mut markdown_max: f64 = 0.0;
    let mut agree = 0u32;

    for variant in &variants {
        assert!(
            cairn_events_balanced(variant),
            "unbalanced events for {}_{}: {variant:?}",
            case.name,
            label
        );

        let cairn_counts = count_cairn(variant);
        let markdown_counts = count_markdown(variant);
        if cairn_counts == markdown_counts {
            agree += 1;
        }

        let acc = accuracy(cairn_counts, case.expected);
        cairn_sum += acc;
        cairn_min = cairn_min.min(acc);
        cairn_max = cairn_max.max(acc);

        let acc = accuracy(markdown_counts, case.expected);
        markdown_sum += acc;
        markdown_min = markdown_min.min(acc);
        markdown_max = markdown_max.max(acc);
    }

    let cairn_avg = cairn_sum / variants.len() as f64;
    let markdown_avg = markdown_sum / variants.len() as f64;

    println!(
        "{}_{}\tcairn\t{:.2}\tmin={:.2}\tmax={:.2}\tagree={}/{}",
        case.name,
        label,
        cairn_avg,
        cairn_min,
        cairn_max,
        agree,
        variants.len()
    );
    println!(
        "{}_{}\tpulldown\t{:.2}\tmin={:.2}\tmax={:.2}",
        case.name, label, markdown_avg, markdown_min, markdown_max
    );

    let cairn_stats = ReportStats {
        avg: cairn_avg,
        min: cairn_min,
        max: cairn_max,
        agree,
        variants: variants.len(),
    };
    let markdown_stats = ReportStats {
        avg: markdown_avg,
        min: markdown_min,
        max: markdown_max,
        agree,
        variants: variants.len(),
    };

    (cairn_stats, markdown_stats)
}

const BASIC: &str = r#"# Title

Paragraph text.

- One
- Two

```rust
fn main() {}
```

| A | B |
|---|---|
| 1 | 2 |
"#;

const NESTED: &str = r#"> Quote with a list:
>
> 1. first
> 2. second
>    - inner
>
> Closing line.
"#;

const LOOSE: &str = r#"## Steps

1. Prepare

2. Run

   Watch the output.

3. Done
"#;

const MISSING_CODE: &str = r#"Intro

```
unterminated code
- not a list
"#;

fn cases() -> Vec<Case<'static>> {
    vec![
        Case {
            name: "basic",
            input: BASIC,
            expected: Counts {
                headings: 1,
                paragraphs: 1,
                lists: 1,
                list_items: 2,
                tables: 1,
                code_blocks: 1,
                quotes: 0,
            },
            realistic: REALISTIC_BASE,
        },
        Case {
            name: "nested",
            input: NESTED,
            expected: Counts {
                headings: 0,
                paragraphs: 2,
                lists: 2,
                list_items: 3,
                tables: 0,
                code_blocks: 0,
                quotes: 1,
            },
            realistic: REALISTIC_NESTED,
        },
        Case {
            name: "loose_list",
            input: LOOSE,
            expected: Counts {
                headings: 1,
                paragraphs: 4,
                lists: 1,
                list_items: 3,
                tables: 0,
                code_blocks: 0,
                quotes: 0,
            },
            realistic: REALISTIC_BASE,
        },
        Case {
            name: "missing_code_fence",
            input: MISSING_CODE,
            expected: Counts {
                headings: 0,
                paragraphs: 1,
                lists: 0,
                list_items: 0,
                tables: 0,
                code_blocks: 1,
                quotes: 0,
            },
            realistic: REALISTIC_MISSING_CODE,
        },
    ]
}

#[test]
fn robustness_report() {
    let csv_enabled = std::env::var("ROBUSTNESS_CSV").ok().as_deref() == Some("1");
    let csv_path = std::env::var("ROBUSTNESS_CSV_PATH").ok();
    let mut csv_rows = vec!["suite,case,mode,format,avg,min,max,agree,variants".to_string()];

    println!("\nRobustness Report (block counts vs pulldown-cmark)");
    println!("case\tformat\taccuracy\theadings\tparagraphs\tlists\titems\ttables\tcode\tquotes");

    let mut realistic_sum = (0.0, 0.0);
    let mut stress_sum = (0.0, 0.0);
    let mut agree = 0u32;
    let mut variants = 0usize;
    let cases = cases();

    for case in &cases {
        let counts = report_case(case);
        assert_eq!(counts, case.expected, "clean parse of {}", case.name);

        for (mode, mutations, sum) in [
            ("realistic", case.realistic, &mut realistic_sum),
            ("stress", STRESS_MUTATIONS, &mut stress_sum),
        ] {
            let (cairn_stats, markdown_stats) = report_noisy(case, mutations, mode);
            sum.0 += cairn_stats.avg;
            sum.1 += markdown_stats.avg;
            agree += cairn_stats.agree;
            variants += cairn_stats.variants;
            if csv_enabled {
                for (format, stats) in [("cairn", cairn_stats), ("pulldown", markdown_stats)] {
                    csv_rows.push(format!(
                        "suite,{},{},{},{:.4},{:.4},{:.4},{},{}",
                        case.name,
                        mode,
                        format,
                        stats.avg,
                        stats.min,
                        stats.max,
                        stats.agree,
                        stats.variants
                    ));
                }
            }
        }
        let _ = io::stdout().flush();
    }

    let n = cases.len() as f64;
    println!(
        "Realistic Summary\tcairn_avg={:.2}\tpulldown_avg={:.2}",
        realistic_sum.0 / n,
        realistic_sum.1 / n
    );
    println!(
        "Stress Summary\tcairn_avg={:.2}\tpulldown_avg={:.2}",
        stress_sum.0 / n,
        stress_sum.1 / n
    );
    println!(
        "Agreement\t{}/{}\trate={:.2}",
        agree,
        variants,
        agree as f64 / variants as f64
    );

    if csv_enabled {
        let path = match csv_path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(env!("CARGO_MANIFEST_DIR"))
                .join("..")
                .join("..")
                .join("robustness_report.csv"),
        };
        if let Ok(mut file) = fs::File::create(&path) {
            for row in csv_rows {
                let _ = writeln!(file, "{}", row);
            }
            println!("CSV\t{}", path.display());
        } else {
            println!("CSV");
            for row in csv_rows {
                println!("{}", row);
            }
        }
    }
    println!();
}

/// Whether writing the events out as Markdown and parsing that again gives
/// the same events.
fn round_trips(input: &str) -> bool {
    let parser = Parser::new(Profile::Gfm);
    let first: Vec<CairnEvent> = parser.parse(input).into_events().collect();
    let markdown = to_markdown(first.clone());
    let second: Vec<CairnEvent> = parser.parse(&markdown).into_events().collect();
    first == second
}

#[test]
fn round_trip_report() {
    println!("\nRound Trip Report (events after to_markdown and reparse)");
    println!("case\tmode\tsame\tvariants");
    for case in &cases() {
        assert!(round_trips(case.input), "clean round trip of {}", case.name);
        for (mode, mutations) in [("realistic", case.realistic), ("stress", STRESS_MUTATIONS)] {
            let variants = generate_variants(case.input, SEED, mutations);
            let same = variants.iter().filter(|v| round_trips(v)).count();
            println!("{}\t{}\t{}\t{}", case.name, mode, same, variants.len());
        }
    }
    println!();
}
