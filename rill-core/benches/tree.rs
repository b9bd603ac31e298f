//! Benchmarks for the persistent sequence tree.
//!
//! Run with: `cargo bench -p rill-core --bench tree`

use divan::{
  Bencher,
  black_box,
};
use rill_core::tree::ConstTree;

fn main() {
  divan::main();
}

#[divan::bench(args = [256, 4096])]
fn push_back(bencher: Bencher, lines: usize) {
  bencher.bench(|| {
    let mut tree = ConstTree::new();
    for i in 0..black_box(lines) {
      tree = tree.push_back(i);
    }
    tree.len()
  });
}

#[divan::bench(args = [256, 4096])]
fn replace_middle(bencher: Bencher, lines: usize) {
  let tree: ConstTree<usize> = (0..lines).collect();
  bencher.bench(|| black_box(&tree).replace(lines / 2, 0).len());
}

#[divan::bench(args = [256, 4096])]
fn snapshot(bencher: Bencher, lines: usize) {
  let tree: ConstTree<usize> = (0..lines).collect();
  bencher.bench(|| black_box(&tree).clone().len());
}
