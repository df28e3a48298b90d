use vg2sg::parser::GFAParser;
use vg2sg::{PathMapper, VariationGraph};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

const BASES: &[u8] = b"ACGT";

/// A chain of `bubbles` SNP bubbles as GFA lines, with `paths` paths
/// each picking an allele per bubble.
fn bubble_chain(bubbles: usize, paths: usize) -> Vec<Vec<u8>> {
    let mut lines = Vec::new();
    let anchor = |i: usize| 3 * i + 1;
    let allele = |i: usize, a: usize| 3 * i + 2 + a;
    for i in 0..bubbles {
        let seq: String = (0..12).map(|j| BASES[(i + j) % 4] as char).collect();
        lines.push(format!("S\t{}\t{}", anchor(i), seq));
        lines.push(format!("S\t{}\t{}", allele(i, 0), BASES[i % 4] as char));
        lines.push(format!("S\t{}\t{}", allele(i, 1), BASES[(i + 1) % 4] as char));
        for a in 0..2 {
            lines.push(format!("L\t{}\t+\t{}\t+\t0M", anchor(i), allele(i, a)));
            lines.push(format!("L\t{}\t+\t{}\t+\t0M", allele(i, a), anchor(i + 1)));
        }
    }
    lines.push(format!("S\t{}\tGATTACA", anchor(bubbles)));
    for p in 0..paths {
        let steps: Vec<String> = (0..bubbles)
            .flat_map(|i| {
                let a = ((i * 7 + p * 13) / 5 + p) % 2;
                vec![format!("{}+", anchor(i)), format!("{}+", allele(i, a))]
            })
            .chain(std::iter::once(format!("{}+", anchor(bubbles))))
            .collect();
        lines.push(format!("P\tpath{}\t{}\t*", p, steps.join(",")));
    }
    lines.into_iter().map(String::into_bytes).collect()
}

fn load(lines: &[Vec<u8>]) -> VariationGraph {
    GFAParser::new()
        .parse_lines(lines.iter().map(|l| l.as_slice()))
        .unwrap()
}

fn convert(vg: &VariationGraph) -> usize {
    let mut pm = PathMapper::new(vg);
    pm.add_graph_paths(None, false).unwrap();
    pm.side_graph().num_joins()
}

fn parse_bench(c: &mut Criterion) {
    for &bubbles in &[1_000, 10_000] {
        let lines = bubble_chain(bubbles, 4);
        c.bench_with_input(BenchmarkId::new("parse_gfa", bubbles), &lines, |b, l| {
            b.iter(|| load(l));
        });
    }
}

fn convert_bench(c: &mut Criterion) {
    for &bubbles in &[1_000, 10_000] {
        let vg = load(&bubble_chain(bubbles, 4));
        c.bench_with_input(BenchmarkId::new("convert", bubbles), &vg, |b, vg| {
            b.iter(|| convert(vg));
        });
        c.bench_with_input(BenchmarkId::new("convert_span", bubbles), &vg, |b, vg| {
            b.iter(|| {
                let mut pm = PathMapper::new(vg);
                pm.add_graph_paths(None, false).unwrap();
                pm.add_spanning_paths().unwrap();
                pm.verify_paths().unwrap();
            });
        });
    }
}

criterion_group!(benches, parse_bench, convert_bench);
criterion_main!(benches);
