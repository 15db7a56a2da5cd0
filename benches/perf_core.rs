use criterion::{black_box, criterion_group, criterion_main, Criterion};
use reporecon::llm::recover;
use reporecon::reduce::{reduce, DEFAULT_MAX_LENGTH};

fn synthetic_readme(sections: usize) -> String {
    let mut out = String::from(
        "# Synthetic\n\n[![CI](https://img.shields.io/badge/ci-passing-green.svg)](https://ci.example.com)\n\n",
    );
    out.push_str("A synthetic project used to measure README reduction on large inputs.\n\n");
    for i in 0..sections {
        let heading = match i % 4 {
            0 => "Architecture",
            1 => "Contributing",
            2 => "Usage",
            _ => "Changelog",
        };
        out.push_str(&format!("## {} {}\n\n", heading, i));
        out.push_str("<details><summary>More</summary>\n\n");
        out.push_str("Some **bold** text with a [link](https://example.com/page) and `code`.\n\n");
        out.push_str("</details>\n\n```rust\nfn main() {\n    println!(\"hi\");\n}\n```\n\n");
        out.push_str(&"lorem ipsum dolor sit amet ".repeat(20));
        out.push_str("\n\n\n\n");
    }
    out
}

fn truncated_reply(issues: usize) -> String {
    let mut out = String::from(
        "Sure, here is the analysis you asked for:\n```json\n{\"summary\": \"A service with workers.\", \"mermaid_code\": \"sequenceDiagram\\n    A->>B: call\", \"detected_issues\": [",
    );
    for i in 0..issues {
        out.push_str(&format!("\"Issue number {} with \\\"quotes\\\"\", ", i));
    }
    out.push_str("\"Cut off mid");
    out
}

fn bench_reduce(c: &mut Criterion) {
    let small = synthetic_readme(10);
    let large = synthetic_readme(400);

    c.bench_function("reduce_small_readme", |b| {
        b.iter(|| black_box(reduce(black_box(&small), DEFAULT_MAX_LENGTH)))
    });

    c.bench_function("reduce_large_readme", |b| {
        b.iter(|| black_box(reduce(black_box(&large), DEFAULT_MAX_LENGTH)))
    });
}

fn bench_recover(c: &mut Criterion) {
    let clean = r#"{"summary": "s", "mermaid_code": "m", "detected_issues": [], "fix_recommendations": []}"#;
    let truncated = truncated_reply(200);

    c.bench_function("recover_clean_reply", |b| {
        b.iter(|| black_box(recover(black_box(clean)).ok()))
    });

    c.bench_function("recover_truncated_reply", |b| {
        b.iter(|| black_box(recover(black_box(&truncated)).ok()))
    });
}

criterion_group!(perf_core, bench_reduce, bench_recover);
criterion_main!(perf_core);
