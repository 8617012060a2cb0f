use clob_engine::order::Side;
use clob_engine::orderbook::OrderBook;
use criterion::{criterion_group, criterion_main, Criterion};

fn setup_order_book(depth: u64, orders_per_level: u64) -> OrderBook {
    let mut ob = OrderBook::new();
    for price in 1..=depth {
        for _ in 0..orders_per_level {
            ob.add_order(Side::Sell, price, 1);
            ob.add_order(Side::Buy, price, 1);
        }
    }
    ob
}

/// Sell-only depth at prices `depth+1..=2*depth`, so a resting buy at
/// price 1 (used below) never crosses: this measures `add_order`
/// insertion cost in isolation, not a drain of a pre-crossed book.
fn setup_one_sided_sell_depth(depth: u64, orders_per_level: u64) -> OrderBook {
    let mut ob = OrderBook::new();
    for price in (depth + 1)..=(2 * depth) {
        for _ in 0..orders_per_level {
            ob.add_order(Side::Sell, price, 1);
        }
    }
    ob
}

fn bench_match_order(c: &mut Criterion) {
    let depth = 100;
    let orders_per_level = 10;

    c.bench_function("add resting order, no match", |b| {
        let mut ob = setup_one_sided_sell_depth(depth, orders_per_level);
        b.iter(|| {
            ob.add_order(Side::Buy, 1, 1);
            ob.match_orders();
        })
    });

    c.bench_function("add crossing order, match against full depth", |b| {
        b.iter(|| {
            let mut ob = setup_order_book(depth, orders_per_level);
            ob.add_order(Side::Sell, depth / 2, depth * orders_per_level);
            ob.match_orders();
        })
    });
}

criterion_group!(benches, bench_match_order);
criterion_main!(benches);
