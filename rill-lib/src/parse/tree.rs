//! Parse tree nodes: ranges, styles, children, structural hashes.

use std::hash::{
  Hash,
  Hasher,
};

use rill_core::{
  position::{
    LineColumn,
    Range,
  },
  style::StyleSet,
};

/// Steps down the tree: the Nth child at each level. Empty means the root.
pub type Route = Vec<usize>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseTree {
  range:         Range,
  styles:        StyleSet,
  children:      Vec<ParseTree>,
  depth:         usize,
  children_hash: u64,
  node_hash:     u64,
}

fn hash_of(value: impl Hash) -> u64 {
  let mut hasher = std::collections::hash_map::DefaultHasher::new();
  value.hash(&mut hasher);
  hasher.finish()
}

fn position_hash_mix(index: usize, child_hash: u64) -> u64 {
  hash_of((index, child_hash))
}

impl ParseTree {
  pub fn new(range: Range) -> Self {
    let mut tree = Self {
      range,
      ..Self::default()
    };
    tree.refresh_node_hash();
    tree
  }

  pub fn range(&self) -> Range {
    self.range
  }

  pub fn set_range(&mut self, range: Range) {
    self.range = range;
    self.refresh_node_hash();
  }

  pub fn styles(&self) -> StyleSet {
    self.styles
  }

  pub fn set_styles(&mut self, styles: StyleSet) {
    self.styles = styles;
    self.refresh_node_hash();
  }

  pub fn children(&self) -> &[ParseTree] {
    &self.children
  }

  /// `1 + max(child depth)`; a leaf has depth 0.
  pub fn depth(&self) -> usize {
    self.depth
  }

  pub fn node_hash(&self) -> u64 {
    self.node_hash
  }

  pub fn children_hash(&self) -> u64 {
    self.children_hash
  }

  pub fn push_child(&mut self, child: ParseTree) {
    debug_assert!(
      self
        .children
        .last()
        .map_or(true, |last| last.range.end <= child.range.begin),
      "children must be sorted and non-overlapping"
    );
    self.depth = self.depth.max(child.depth + 1);
    self.children_hash ^= position_hash_mix(self.children.len(), child.node_hash);
    self.children.push(child);
    self.refresh_node_hash();
  }

  /// Restyles the child at `index`, maintaining the hashes.
  pub fn restyle_child(&mut self, index: usize, styles: StyleSet) {
    let old_hash = self.children[index].node_hash;
    self.children[index].set_styles(styles);
    self.children_hash ^= position_hash_mix(index, old_hash);
    self.children_hash ^= position_hash_mix(index, self.children[index].node_hash);
    self.refresh_node_hash();
  }

  fn refresh_node_hash(&mut self) {
    let styles: Vec<u8> = self.styles.iter().map(|style| style as u8).collect();
    self.node_hash = hash_of((
      self.range.begin.line,
      self.range.begin.column,
      self.range.end.line,
      self.range.end.column,
      styles,
      self.children_hash,
    ));
  }

  /// A copy containing only children that span at least two lines,
  /// recursively. Useful for outline views.
  pub fn simplify(&self) -> ParseTree {
    let mut output = ParseTree::new(self.range);
    output.set_styles(self.styles);
    for child in &self.children {
      if child.range.end.line > child.range.begin.line {
        output.push_child(child.simplify());
      }
    }
    output
  }

  /// Linearly rescales line numbers from `input_lines` to `output_lines`,
  /// dropping children that collapse to nothing.
  pub fn zoom_out(&self, input_lines: usize, output_lines: usize) -> ParseTree {
    fn scale(line: usize, input: usize, output: usize) -> usize {
      if input == 0 {
        return 0;
      }
      line * output / input
    }

    let range = Range::new(
      LineColumn::new(
        scale(self.range.begin.line, input_lines, output_lines),
        0,
      ),
      LineColumn::new(scale(self.range.end.line, input_lines, output_lines), 0),
    );
    let mut output = ParseTree::new(range);
    output.set_styles(self.styles);
    for child in &self.children {
      let zoomed = child.zoom_out(input_lines, output_lines);
      if !zoomed.range.is_empty() {
        output.push_child(zoomed);
      }
    }
    output
  }
}

/// Finds the route down the tree, always selecting the first child that
/// ends after `position`. The selected child may start after the position.
pub fn route_to_position(root: &ParseTree, position: LineColumn) -> Route {
  let mut route = Vec::new();
  let mut tree = root;
  loop {
    match tree
      .children()
      .iter()
      .position(|child| child.range().end > position)
    {
      None => return route,
      Some(index) => {
        route.push(index);
        tree = &tree.children()[index];
      },
    }
  }
}

/// Every node along `route`, root first.
pub fn map_route<'a>(root: &'a ParseTree, route: &Route) -> Vec<&'a ParseTree> {
  let mut nodes = vec![root];
  let mut tree = root;
  for index in route {
    tree = &tree.children()[*index];
    nodes.push(tree);
  }
  nodes
}

pub fn follow_route<'a>(root: &'a ParseTree, route: &Route) -> &'a ParseTree {
  *map_route(root, route).last().expect("route includes root")
}

#[cfg(test)]
mod test {
  use rill_core::style::Style;

  use super::*;

  fn range(b: (usize, usize), e: (usize, usize)) -> Range {
    Range::new(b.into(), e.into())
  }

  fn leaf(b: (usize, usize), e: (usize, usize)) -> ParseTree {
    ParseTree::new(range(b, e))
  }

  #[test]
  fn depth_tracks_children() {
    let mut root = ParseTree::new(range((0, 0), (10, 0)));
    assert_eq!(root.depth(), 0);
    let mut middle = leaf((1, 0), (5, 0));
    middle.push_child(leaf((2, 0), (3, 0)));
    root.push_child(middle);
    assert_eq!(root.depth(), 2);
    root.push_child(leaf((6, 0), (7, 0)));
    assert_eq!(root.depth(), 2);
  }

  #[test]
  fn node_hash_depends_on_children_order() {
    let a = leaf((0, 0), (0, 5));
    let b = leaf((0, 5), (0, 9));

    let mut forward = ParseTree::new(range((0, 0), (1, 0)));
    forward.push_child(a.clone());
    forward.push_child(b.clone());

    let mut only_second = ParseTree::new(range((0, 0), (1, 0)));
    only_second.push_child(b);

    assert_ne!(forward.node_hash(), only_second.node_hash());
  }

  #[test]
  fn identical_trees_hash_identically() {
    let build = || {
      let mut tree = ParseTree::new(range((0, 0), (2, 0)));
      let mut child = leaf((0, 1), (0, 4));
      child.set_styles(StyleSet::of(Style::Blue));
      tree.push_child(child);
      tree
    };
    assert_eq!(build().node_hash(), build().node_hash());
  }

  #[test]
  fn restyle_child_updates_hashes_consistently() {
    let mut direct = ParseTree::new(range((0, 0), (1, 0)));
    let mut styled = leaf((0, 0), (0, 2));
    styled.set_styles(StyleSet::of(Style::Red));
    direct.push_child(styled);

    let mut restyled = ParseTree::new(range((0, 0), (1, 0)));
    restyled.push_child(leaf((0, 0), (0, 2)));
    restyled.restyle_child(0, StyleSet::of(Style::Red));

    assert_eq!(direct.node_hash(), restyled.node_hash());
  }

  #[test]
  fn simplify_keeps_multiline_children() {
    let mut root = ParseTree::new(range((0, 0), (10, 0)));
    root.push_child(leaf((0, 1), (0, 5)));
    root.push_child(leaf((1, 0), (4, 2)));
    let simplified = root.simplify();
    assert_eq!(simplified.children().len(), 1);
    assert_eq!(simplified.children()[0].range(), range((1, 0), (4, 2)));
  }

  #[test]
  fn zoom_out_rescales_and_drops_empty() {
    let mut root = ParseTree::new(range((0, 0), (100, 0)));
    root.push_child(leaf((10, 0), (60, 0)));
    root.push_child(leaf((98, 0), (99, 0)));
    let zoomed = root.zoom_out(100, 10);
    assert_eq!(zoomed.range(), range((0, 0), (10, 0)));
    assert_eq!(zoomed.children().len(), 1);
    assert_eq!(zoomed.children()[0].range(), range((1, 0), (6, 0)));
  }

  #[test]
  fn route_selects_first_child_ending_after_position() {
    let mut root = ParseTree::new(range((0, 0), (5, 0)));
    let mut child = leaf((1, 0), (3, 0));
    child.push_child(leaf((1, 2), (2, 0)));
    root.push_child(child);
    root.push_child(leaf((3, 0), (4, 0)));

    let route = route_to_position(&root, LineColumn::new(1, 3));
    assert_eq!(route, vec![0, 0]);
    assert_eq!(
      follow_route(&root, &route).range(),
      range((1, 2), (2, 0))
    );

    let route = route_to_position(&root, LineColumn::new(3, 1));
    assert_eq!(route, vec![1]);
  }
}
