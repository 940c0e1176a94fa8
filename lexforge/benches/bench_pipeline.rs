//! Scanner generator benchmarks.
//!
//! 1. Full pipeline per table encoding
//! 2. NFA construction
//! 3. Subset construction
//! 4. Hopcroft minimization
//! 5. Table compression
//! 6. Scaling with synthetic keyword sets

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

use lexforge::automata::compress::compress;
use lexforge::automata::minimize::minimize_dfa;
use lexforge::automata::nfa::build_nfa;
use lexforge::automata::partition::CharClasses;
use lexforge::automata::regex::RegExp;
use lexforge::automata::subset::subset_construction;
use lexforge::pipeline::prepare;
use lexforge::rules::Rule;
use lexforge::{generate_scanner, Config, ScannerSpec, TableEncoding};

/// Identifiers, numbers, strings, comments and a handful of keywords.
fn language_spec() -> ScannerSpec {
    let mut spec = ScannerSpec::new();
    spec.macros.insert("LETTER", RegExp::class(&[('a', 'z'), ('A', 'Z'), ('_', '_')]));
    spec.macros.insert("DIGIT", RegExp::class(&[('0', '9')]));
    spec.macros.insert(
        "ID",
        RegExp::concat(
            RegExp::macro_use("LETTER"),
            RegExp::star(RegExp::alt(RegExp::macro_use("LETTER"), RegExp::macro_use("DIGIT"))),
        ),
    );
    let mut line = 1;
    for kw in ["if", "else", "while", "for", "return", "fn", "let", "match"] {
        spec.rules.push(Rule::new(line, RegExp::literal(kw), format!("return Token::{kw};")));
        line += 1;
    }
    let rest = [
        (RegExp::macro_use("ID"), "return Token::Ident;"),
        (RegExp::plus(RegExp::macro_use("DIGIT")), "return Token::Int;"),
        (
            RegExp::concat(
                RegExp::ch('"'),
                RegExp::concat(RegExp::star(RegExp::not_class(&[('"', '"'), ('\n', '\n')])), RegExp::ch('"')),
            ),
            "return Token::Str;",
        ),
        (
            RegExp::concat(RegExp::literal("/*"), RegExp::up_to(RegExp::literal("*/"))),
            "/* comment */",
        ),
        (RegExp::plus(RegExp::class(&[(' ', ' '), ('\t', '\t'), ('\n', '\n')])), "/* skip */"),
    ];
    for (re, code) in rest {
        spec.rules.push(Rule::new(line, re, code));
        line += 1;
    }
    spec
}

fn synthetic_spec(n: usize) -> ScannerSpec {
    let mut spec = ScannerSpec::new();
    for i in 0..n {
        let kw = format!("kw{i}x");
        spec.rules.push(Rule::new(i as u32 + 1, RegExp::literal(&kw), format!("return {i};")));
    }
    spec.rules.push(Rule::new(
        n as u32 + 1,
        RegExp::plus(RegExp::class(&[('a', 'z'), ('0', '9')])),
        "return ID;",
    ));
    spec
}

fn config() -> Config {
    Config { max_char: 0xFF, ..Config::default() }
}

fn bench_full_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/full");
    group.warm_up_time(Duration::from_secs(3));
    group.measurement_time(Duration::from_secs(5));
    group.sample_size(100);

    let spec = language_spec();
    for encoding in [TableEncoding::Dense, TableEncoding::Packed, TableEncoding::InlineBranches] {
        let config = Config { encoding, ..config() };
        group.bench_with_input(BenchmarkId::from_parameter(format!("{encoding:?}")), &config, |b, config| {
            b.iter(|| generate_scanner(&mut spec.clone(), config));
        });
    }

    group.finish();
}

fn bench_phases(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/phases");
    group.warm_up_time(Duration::from_secs(3));
    group.measurement_time(Duration::from_secs(5));
    group.sample_size(200);

    let config = config();
    let mut spec = language_spec();
    if prepare(&mut spec, &config).is_err() {
        return;
    }
    let classes = CharClasses::from_spec(&spec.rules, &spec.macros, config.max_char);
    let build = || build_nfa(&spec.rules, &spec.macros, &spec.states, &classes, false, config.max_states);
    let Ok(nfa) = build() else { return };
    let Ok(dfa) = subset_construction(&nfa, config.max_states) else { return };
    let min = minimize_dfa(&dfa, false);

    group.bench_function("build_nfa", |b| b.iter(|| build()));
    group.bench_function("subset_construction", |b| b.iter(|| subset_construction(&nfa, config.max_states)));
    group.bench_function("minimize", |b| b.iter(|| minimize_dfa(&dfa, false)));
    group.bench_function("compress", |b| {
        b.iter(|| compress(&min, &spec.eof_actions, spec.states.len(), TableEncoding::Packed, false))
    });

    group.finish();
}

fn bench_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/scaling");
    group.warm_up_time(Duration::from_secs(3));
    group.measurement_time(Duration::from_secs(5));
    group.sample_size(50);

    for n in [10, 50, 200] {
        let spec = synthetic_spec(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &spec, |b, spec| {
            b.iter(|| generate_scanner(&mut spec.clone(), &config()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_full_pipeline, bench_phases, bench_scaling);
criterion_main!(benches);
