//! The screen-tiling tree.
//!
//! Widgets form a recursive structure of horizontal and vertical splits
//! whose leaves name buffers. One leaf is *active* at any time: the path
//! of `active` indices from the root selects it.

use crate::Tendril;

pub type BufferName = Tendril;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Widget {
  Leaf {
    buffer: BufferName,
  },
  HSplit {
    children: Vec<Widget>,
    active:   usize,
  },
  VSplit {
    children: Vec<Widget>,
    active:   usize,
  },
}

impl Widget {
  pub fn leaf(buffer: impl Into<BufferName>) -> Self {
    Self::Leaf {
      buffer: buffer.into(),
    }
  }

  pub fn count_leaves(&self) -> usize {
    match self {
      Widget::Leaf { .. } => 1,
      Widget::HSplit { children, .. } | Widget::VSplit { children, .. } => {
        children.iter().map(Widget::count_leaves).sum()
      },
    }
  }

  /// Minimum rows this widget needs: a leaf needs one content row plus a
  /// status row; horizontal splits stack, vertical splits share.
  pub fn min_lines(&self) -> usize {
    match self {
      Widget::Leaf { .. } => 2,
      Widget::HSplit { children, .. } => children.iter().map(Widget::min_lines).sum(),
      Widget::VSplit { children, .. } => {
        children.iter().map(Widget::min_lines).max().unwrap_or(0)
      },
    }
  }

  pub fn active_leaf(&self) -> &BufferName {
    match self {
      Widget::Leaf { buffer } => buffer,
      Widget::HSplit { children, active } | Widget::VSplit { children, active } => {
        children[*active].active_leaf()
      },
    }
  }

  /// Replaces the buffer shown by the active leaf.
  pub fn set_active_leaf_buffer(&mut self, name: BufferName) {
    match self {
      Widget::Leaf { buffer } => *buffer = name,
      Widget::HSplit { children, active } | Widget::VSplit { children, active } => {
        children[*active].set_active_leaf_buffer(name);
      },
    }
  }

  fn leaves(&self) -> Vec<&BufferName> {
    match self {
      Widget::Leaf { buffer } => vec![buffer],
      Widget::HSplit { children, .. } | Widget::VSplit { children, .. } => {
        children.iter().flat_map(Widget::leaves).collect()
      },
    }
  }

  fn active_leaf_index(&self) -> usize {
    match self {
      Widget::Leaf { .. } => 0,
      Widget::HSplit { children, active } | Widget::VSplit { children, active } => {
        let preceding: usize = children[..*active]
          .iter()
          .map(Widget::count_leaves)
          .sum();
        preceding + children[*active].active_leaf_index()
      },
    }
  }

  fn set_active_leaf_index(&mut self, index: usize) {
    match self {
      Widget::Leaf { .. } => {},
      Widget::HSplit { children, active } | Widget::VSplit { children, active } => {
        let mut remaining = index;
        for (child_index, child) in children.iter_mut().enumerate() {
          let leaves = child.count_leaves();
          if remaining < leaves {
            *active = child_index;
            child.set_active_leaf_index(remaining);
            return;
          }
          remaining -= leaves;
        }
      },
    }
  }

  /// Moves the active leaf `amount` steps forward in leaf order,
  /// wrapping.
  pub fn advance(&mut self, amount: usize) {
    let leaves = self.count_leaves();
    if leaves == 0 {
      return;
    }
    let index = (self.active_leaf_index() + amount) % leaves;
    self.set_active_leaf_index(index);
  }

  /// Splits the active leaf in two side-by-side views of its buffer.
  pub fn split_active(&mut self, vertical: bool) {
    match self {
      Widget::Leaf { buffer } => {
        let children = vec![
          Widget::leaf(buffer.clone()),
          Widget::leaf(buffer.clone()),
        ];
        *self = if vertical {
          Widget::VSplit { children, active: 1 }
        } else {
          Widget::HSplit { children, active: 1 }
        };
      },
      Widget::HSplit { children, active } | Widget::VSplit { children, active } => {
        children[*active].split_active(vertical);
      },
    }
  }

  /// Closes the active leaf; collapses single-child splits. Returns false
  /// when this is the last leaf.
  pub fn close_active(&mut self) -> bool {
    match self {
      Widget::Leaf { .. } => false,
      Widget::HSplit { children, active } | Widget::VSplit { children, active } => {
        if !children[*active].close_active() {
          children.remove(*active);
          if *active >= children.len() {
            *active = children.len().saturating_sub(1);
          }
        }
        if children.len() == 1 {
          let only = children.pop().expect("checked length");
          *self = only;
        }
        true
      },
    }
  }

  pub fn buffers_shown(&self) -> Vec<BufferName> {
    self.leaves().into_iter().cloned().collect()
  }
}

#[cfg(test)]
mod test {
  use super::*;

  fn sample() -> Widget {
    Widget::HSplit {
      children: vec![
        Widget::leaf("one"),
        Widget::VSplit {
          children: vec![Widget::leaf("two"), Widget::leaf("three")],
          active:   1,
        },
      ],
      active:   1,
    }
  }

  #[test]
  fn counting_and_active_leaf() {
    let widget = sample();
    assert_eq!(widget.count_leaves(), 3);
    assert_eq!(widget.active_leaf(), "three");
  }

  #[test]
  fn min_lines_stacks_hsplits() {
    let widget = sample();
    // HSplit of a leaf (2) and a VSplit of leaves (max 2) = 4.
    assert_eq!(widget.min_lines(), 4);
  }

  #[test]
  fn advance_wraps_in_leaf_order() {
    let mut widget = sample();
    widget.advance(1);
    assert_eq!(widget.active_leaf(), "one");
    widget.advance(2);
    assert_eq!(widget.active_leaf(), "three");
    widget.advance(5);
    assert_eq!(widget.active_leaf(), "two");
  }

  #[test]
  fn split_and_close_round_trip() {
    let mut widget = Widget::leaf("main");
    widget.split_active(false);
    assert_eq!(widget.count_leaves(), 2);
    assert_eq!(widget.active_leaf(), "main");

    assert!(widget.close_active());
    assert_eq!(widget.count_leaves(), 1);
    assert!(matches!(widget, Widget::Leaf { .. }));

    assert!(!widget.close_active());
  }

  #[test]
  fn set_active_leaf_buffer_targets_active_only() {
    let mut widget = sample();
    widget.set_active_leaf_buffer("other".into());
    assert_eq!(widget.active_leaf(), "other");
    assert_eq!(
      widget.buffers_shown(),
      vec![
        BufferName::from("one"),
        BufferName::from("two"),
        BufferName::from("other"),
      ]
    );
  }
}
