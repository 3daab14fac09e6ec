//! Criterion benchmarks for the hot replay paths.
//!
//! Benchmarks:
//! 1. Pure matcher evaluation
//! 2. Book bar processing with a populated working set
//! 3. Full bracket lifecycle replay
//! 4. Risk sizing over a long return series

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use barsim_core::config::RiskConfig;
use barsim_core::domain::{build_bracket, Bar, Order, OrderKind, OrderSide};
use barsim_core::execution::{match_order, CostModel, PaperBook};
use barsim_core::risk::RiskEngine;
use chrono::{Duration, TimeZone, Utc};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            let open = close - 0.3;
            Bar::new(
                start + Duration::days(i as i64),
                "SPY",
                open,
                close + 1.5,
                (close - 1.5).max(0.01),
                close,
                1_000_000.0,
            )
        })
        .collect()
}

fn bench_matcher(c: &mut Criterion) {
    let bar = make_bars(1).pop().unwrap();
    let cost = CostModel::new(5.0, 1.0);
    let order = Order::new(
        "SPY",
        OrderSide::Buy,
        100.0,
        OrderKind::Limit { limit_price: 99.5 },
    );

    c.bench_function("matcher/limit", |b| {
        b.iter(|| match_order(black_box(&order), black_box(&bar), black_box(&cost)))
    });
}

fn bench_book_on_bar(c: &mut Criterion) {
    let mut group = c.benchmark_group("book/on_bar");
    for orders in [10usize, 100, 500] {
        group.bench_with_input(BenchmarkId::from_parameter(orders), &orders, |b, &n| {
            let bars = make_bars(50);
            b.iter(|| {
                let mut book = PaperBook::new(CostModel::new(5.0, 1.0));
                for i in 0..n {
                    // Far-away resting limits: the working set stays populated.
                    let _ = book.submit(Order::new(
                        "SPY",
                        OrderSide::Buy,
                        1.0,
                        OrderKind::Limit {
                            limit_price: 10.0 + i as f64 * 0.01,
                        },
                    ));
                }
                for bar in &bars {
                    black_box(book.on_bar(bar));
                }
            })
        });
    }
    group.finish();
}

fn bench_bracket_replay(c: &mut Criterion) {
    let bars = make_bars(250);
    c.bench_function("book/bracket_replay", |b| {
        b.iter(|| {
            let mut book = PaperBook::new(CostModel::new(5.0, 1.0));
            let bracket = build_bracket(
                "SPY",
                OrderSide::Buy,
                10.0,
                100.0,
                Some(112.0),
                None,
                Some(4.0),
                None,
            )
            .unwrap();
            book.submit_bracket(bracket).unwrap();
            for bar in &bars {
                black_box(book.on_bar(bar));
            }
            book.fills().len()
        })
    });
}

fn bench_risk_sizing(c: &mut Criterion) {
    let engine = RiskEngine::new(RiskConfig {
        vol_target_pct: Some(15.0),
        vol_lookback: 20,
        ..RiskConfig::default()
    });
    let returns: Vec<f64> = (0..2_520).map(|i| (i as f64 * 0.37).sin() * 0.01).collect();
    let signal = vec![1.0; returns.len()];

    c.bench_function("risk/size_positions", |b| {
        b.iter(|| engine.size_positions(black_box(&returns), black_box(&signal)))
    });
}

criterion_group!(
    benches,
    bench_matcher,
    bench_book_on_bar,
    bench_bracket_replay,
    bench_risk_sizing
);
criterion_main!(benches);
