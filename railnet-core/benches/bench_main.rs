//! Route search on square grid networks.
//!
//! Run with: cargo bench -p railnet_core

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use railnet_core::prelude::*;

/// `size` x `size` stations, neighbours joined by bidirectional edges with
/// travel times between 1 and 7.
fn grid_network(size: usize) -> (Network, Vec<Vec<NodeId>>) {
    let mut network = Network::new("bench");
    let grid: Vec<Vec<NodeId>> = (0..size)
        .map(|row| {
            (0..size)
                .map(|col| {
                    network
                        .add_node(Node::station(&format!("{row}:{col}")))
                        .unwrap()
                })
                .collect()
        })
        .collect();

    for row in 0..size {
        for col in 0..size {
            let time = ((row * 7 + col * 3) % 7 + 1) as Time;
            let here = grid[row][col];
            if col + 1 < size {
                let east = grid[row][col + 1];
                network
                    .connect_nodes(here, east, Direction::Bidirectional, time)
                    .unwrap();
            }
            if row + 1 < size {
                let south = grid[row + 1][col];
                network
                    .connect_nodes(here, south, Direction::Bidirectional, time)
                    .unwrap();
            }
        }
    }
    (network, grid)
}

fn one_way(checkpoints: Vec<NodeId>, ordered: bool) -> Line {
    let toggles = LineToggles {
        looping: false,
        ordered_points: ordered,
        ..LineToggles::default()
    };
    Line::new(TrainId::new(), checkpoints).with_toggles(toggles)
}

fn bench_corner_to_corner(c: &mut Criterion) {
    let mut group = c.benchmark_group("corner_to_corner");
    for size in [10, 30, 60] {
        let (network, grid) = grid_network(size);
        let line = one_way(vec![grid[0][0], grid[size - 1][size - 1]], true);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(Router::new(&network, &line).plan().unwrap()));
        });
    }
    group.finish();
}

fn bench_unordered_tour(c: &mut Criterion) {
    let size = 30;
    let (network, grid) = grid_network(size);
    let last = size - 1;
    let line = one_way(
        vec![
            grid[0][0],
            grid[last][last],
            grid[0][last],
            grid[last / 2][last / 2],
            grid[last][0],
        ],
        false,
    );
    c.bench_function("unordered_tour_30", |b| {
        b.iter(|| black_box(Router::new(&network, &line).plan().unwrap()));
    });
}

fn bench_plan_all(c: &mut Criterion) {
    c.bench_function("plan_all_8_lines_30", |b| {
        b.iter_batched(
            || {
                let size = 30;
                let (mut network, grid) = grid_network(size);
                for i in 0..8 {
                    let line = one_way(vec![grid[i][0], grid[size - 1 - i][size - 1]], true);
                    network.insert_line(line);
                }
                let mut registry = Registry::new();
                registry.insert_network(network);
                registry
            },
            |registry| black_box(registry.plan_all()),
            criterion::BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    benches,
    bench_corner_to_corner,
    bench_unordered_tour,
    bench_plan_all
);
criterion_main!(benches);
