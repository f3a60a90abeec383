//! Criterion benchmarks for the cel-lite engine.
//!
//! Measures the costs a host sees on an authentication hot path: one-time
//! compilation, repeated evaluation of a compiled program, and the
//! overhead of the explain trace.
//!
//! Run:
//!   cargo bench
//!   cargo bench -- eval       # one group
//!   cargo bench -- explain    # one group

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cel_lite::{cel, compile, Context};

// ── Data builders ─────────────────────────────────────────────────────────────

/// A realistic SAML assertion context: multi-valued attributes keyed by
/// short and URN-style names.
fn assertion_context() -> Context {
    let affiliations: Vec<cel_lite::Value> = ["member", "student", "alum", "library-walk-in"]
        .iter()
        .map(|s| cel!(*s))
        .collect();
    Context::new().bind(
        "saml",
        cel!({
            "issuer": "https://idp.example.edu",
            "attributes": {
                "mail": ["  First.Last@Example.EDU  "],
                "urn:mace:dir:attribute-def:mail": ["first.last@example.edu"],
                "eduPersonAffiliation": affiliations,
                "displayName": "First Last"
            }
        }),
    )
}

/// A context with many top-level keys, for identifier-lookup pressure.
fn wide_context(n: usize) -> Context {
    (0..n)
        .map(|i| (format!("attr{}", i), cel!(i)))
        .collect()
}

const MAPPING_EXPR: &str =
    "has(saml.attributes.mail) ? lower(trim(first(saml.attributes.mail))) : 'n/a'";

const POLICY_EXPR: &str = "startsWith(saml.issuer, 'https://') \
     && containsAny(saml.attributes.eduPersonAffiliation, ['student', 'staff']) \
     && size(saml.attributes.mail) > 0";

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    group.bench_function("mapping_expr", |b| {
        b.iter(|| compile(black_box(MAPPING_EXPR)).unwrap())
    });
    group.bench_function("policy_expr", |b| {
        b.iter(|| compile(black_box(POLICY_EXPR)).unwrap())
    });
    group.finish();
}

fn bench_eval(c: &mut Criterion) {
    let mut group = c.benchmark_group("eval");
    let context = assertion_context();

    let mapping = compile(MAPPING_EXPR).unwrap();
    group.bench_function("attribute_mapping", |b| {
        b.iter(|| mapping.eval(black_box(&context)).unwrap())
    });

    let policy = compile(POLICY_EXPR).unwrap();
    group.bench_function("policy_precondition", |b| {
        b.iter(|| policy.eval(black_box(&context)).unwrap())
    });

    let membership = compile("'student' in saml.attributes.eduPersonAffiliation").unwrap();
    group.bench_function("group_membership", |b| {
        b.iter(|| membership.eval(black_box(&context)).unwrap())
    });

    let wide = wide_context(200);
    let lookup = compile("attr100 + attr199").unwrap();
    group.bench_function("wide_context_lookup", |b| {
        b.iter(|| lookup.eval(black_box(&wide)).unwrap())
    });

    let regex = compile("regexReplace(first(saml.attributes.mail), '\\\\s+', '')").unwrap();
    group.bench_function("regex_replace", |b| {
        b.iter(|| regex.eval(black_box(&context)).unwrap())
    });

    group.finish();
}

fn bench_explain(c: &mut Criterion) {
    let mut group = c.benchmark_group("explain");
    let context = assertion_context();

    let mapping = compile(MAPPING_EXPR).unwrap();
    group.bench_function("attribute_mapping", |b| {
        b.iter(|| {
            let explanation = mapping.explain(black_box(&context));
            explanation.result.unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_compile, bench_eval, bench_explain);
criterion_main!(benches);
