// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layout driver.
//!
//! Layout walks only the subtrees marked by [`Tree::reflow`]. Constraints flow
//! down through [`Container::on_layout_constrain`]; sizes flow up through
//! [`Widget::preferred_size`](crate::Widget::preferred_size) and
//! [`Container::on_layout_end`]. When a node's size changes and its parent is
//! not already being laid out, the parent is marked and entered again, so a
//! single call always reaches a fixed point.

use kurbo::Size;
use tracing::{debug, trace};

use crate::geometry::clamp_size;
use crate::surface::Surface;
use crate::traverse::Cursor;
use crate::tree::{Behavior, Tree};
use crate::types::{LayoutState, NodeId, NodeKind};
use crate::widget::{Container, LayoutCx, MeasureCx};

impl Tree {
    /// Lay out the subtree at `root` against `surface`.
    ///
    /// A root without a parent is offered the display resolution. When the
    /// surface reports a change, the whole subtree is reflowed and repainted.
    /// Container roots take their constraints as their size. On return every
    /// node in the subtree is [`LayoutState::Clean`].
    pub fn layout(&mut self, root: NodeId, surface: &mut dyn Surface) {
        if !self.is_alive(root) {
            return;
        }
        let attached = self.is_attached(root);
        if surface.changed() {
            let resolution = surface.resolution();
            debug!(?resolution, "surface changed, resetting");
            self.reset(root);
            self.set_constraints(root, resolution);
        } else if !attached {
            self.set_constraints(root, surface.resolution());
        }

        if self.node(root).kind == NodeKind::Widget {
            let size = if attached {
                self.measure(root, surface)
            } else {
                self.node(root).constraints
            };
            self.set_size(root, size);
            self.clear_layout(root);
            return;
        }
        if !self.node(root).layout.needs_work() {
            return;
        }
        debug!(?root, "layout");

        let mut cursor = Cursor::new(root);
        while let Some(visit) = cursor.next(self) {
            let node = visit.node;
            if visit.is_pre() {
                if node != root
                    && let Some(parent) = self.node(node).parent
                    && self.node(parent).layout.is_self_dirty()
                {
                    let constraints = self
                        .with_container(parent, surface, |c, cx| c.on_layout_constrain(cx, node))
                        .unwrap_or(Size::ZERO);
                    self.set_constraints(node, constraints);
                }
                match self.node(node).layout {
                    LayoutState::Clean => {
                        cursor.skip();
                        continue;
                    }
                    LayoutState::SelfDirty if self.node(node).kind == NodeKind::Container => {
                        self.with_container(node, surface, |c, cx| c.on_layout_begin(cx));
                    }
                    _ => {}
                }
            }
            if visit.is_post() {
                let dirty = self.node(node).layout.is_self_dirty();
                self.clear_layout(node);
                if !dirty || !self.finish_layout(root, node, surface) || node == root {
                    continue;
                }
                if let Some(parent) = self.node(node).parent
                    && !self.node(parent).layout.is_self_dirty()
                {
                    trace!(?node, ?parent, "size changed, laying out parent again");
                    self.reflow(parent);
                    cursor.revisit(self, parent);
                }
            }
        }
    }

    /// Size a node whose children are done; returns `true` if the size changed.
    fn finish_layout(&mut self, root: NodeId, node: NodeId, surface: &mut dyn Surface) -> bool {
        match self.node(node).kind {
            NodeKind::Widget => {
                let size = self.measure(node, surface);
                self.set_size(node, size)
            }
            NodeKind::Container => {
                let size = self
                    .with_container(node, surface, |c, cx| c.on_layout_end(cx))
                    .unwrap_or(Size::ZERO);
                let constraints = self.node(node).constraints;
                if node == root {
                    self.set_size(node, constraints);
                    false
                } else {
                    self.set_size(node, clamp_size(size, constraints))
                }
            }
        }
    }

    fn measure(&self, id: NodeId, surface: &mut dyn Surface) -> Size {
        let n = self.node(id);
        let mut cx = MeasureCx {
            constraints: n.constraints,
            surface,
        };
        match n.behavior.as_ref() {
            Some(Behavior::Widget(w)) => clamp_size(w.preferred_size(&mut cx), n.constraints),
            _ => Size::ZERO,
        }
    }

    /// Run a container hook with the container moved out of the tree.
    ///
    /// Returns `None` if `id` is not a container.
    fn with_container<R>(
        &mut self,
        id: NodeId,
        surface: &mut dyn Surface,
        f: impl FnOnce(&mut dyn Container, &mut LayoutCx<'_>) -> R,
    ) -> Option<R> {
        match self.node_mut(id).behavior.take() {
            Some(Behavior::Container(mut container)) => {
                let result = {
                    let mut cx = LayoutCx {
                        tree: &mut *self,
                        node: id,
                        surface,
                    };
                    f(container.as_mut(), &mut cx)
                };
                self.node_mut(id).behavior = Some(Behavior::Container(container));
                Some(result)
            }
            other => {
                self.node_mut(id).behavior = other;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::NullSurface;
    use crate::testing::{Block, RecordingSurface};
    use crate::types::PaintState;
    use crate::widget::Group;
    use alloc::vec::Vec;
    use kurbo::{Point, Rect};

    /// Stacks children top to bottom.
    #[derive(Default)]
    struct Column {
        begins: usize,
        ends: usize,
    }

    impl Container for Column {
        fn on_layout_begin(&mut self, _cx: &mut LayoutCx<'_>) {
            self.begins += 1;
        }

        fn on_layout_end(&mut self, cx: &mut LayoutCx<'_>) -> Size {
            self.ends += 1;
            let children: Vec<_> = cx.children().collect();
            let mut y = 0.0;
            let mut width: f64 = 0.0;
            for child in children {
                cx.set_child_position(child, Point::new(0.0, y));
                let area = cx.child_area(child);
                y += area.height();
                width = width.max(area.width());
            }
            Size::new(width, y)
        }
    }

    /// Offers each child half of its own width.
    struct Halves;

    impl Container for Halves {
        fn on_layout_constrain(&mut self, cx: &mut LayoutCx<'_>, _child: NodeId) -> Size {
            let c = cx.constraints();
            Size::new(c.width / 2.0, c.height)
        }
    }

    fn all_clean(tree: &Tree, root: NodeId) -> bool {
        tree.descendants(root)
            .all(|id| tree.layout_state(id) == Some(LayoutState::Clean))
    }

    #[test]
    fn root_fills_the_display_and_children_take_preferred_sizes() {
        let mut tree = Tree::new();
        let root = tree.insert_container(None, Group);
        let block = tree.insert_widget(Some(root), Block::sized(30.0, 20.0));
        let wide = tree.insert_widget(Some(root), Block::sized(1000.0, 10.0));

        tree.layout(root, &mut NullSurface);
        assert_eq!(
            tree.area(root),
            Some(Rect::new(0.0, 0.0, 512.0, 512.0)),
            "display"
        );
        assert_eq!(
            tree.area(block),
            Some(Rect::new(0.0, 0.0, 30.0, 20.0)),
            "preferred"
        );
        assert_eq!(
            tree.area(wide),
            Some(Rect::new(0.0, 0.0, 512.0, 10.0)),
            "clamped"
        );
        assert!(all_clean(&tree, root), "nothing left to do");
    }

    #[test]
    fn constraints_come_from_the_parent() {
        let mut tree = Tree::new();
        let root = tree.insert_container(None, Halves);
        let wide = tree.insert_widget(Some(root), Block::sized(1000.0, 10.0));
        tree.layout(root, &mut NullSurface);
        assert_eq!(
            tree.constraints(wide),
            Some(Size::new(256.0, 512.0)),
            "half width"
        );
        assert_eq!(
            tree.area(wide),
            Some(Rect::new(0.0, 0.0, 256.0, 10.0)),
            "clamped"
        );
    }

    #[test]
    fn size_changes_propagate_to_a_fixed_point() {
        let mut tree = Tree::new();
        let root = tree.insert_container(None, Group);
        let outer = tree.insert_container(Some(root), Column::default());
        let first = tree.insert_widget(Some(outer), Block::sized(10.0, 10.0));
        let inner = tree.insert_container(Some(outer), Column::default());
        let last = tree.insert_widget(Some(outer), Block::sized(10.0, 5.0));
        let grow = tree.insert_widget(Some(inner), Block::sized(10.0, 10.0));

        tree.layout(root, &mut NullSurface);
        assert_eq!(
            tree.area(inner),
            Some(Rect::new(0.0, 10.0, 10.0, 20.0)),
            "stacked"
        );
        assert_eq!(
            tree.area(last),
            Some(Rect::new(0.0, 20.0, 10.0, 25.0)),
            "after inner"
        );
        assert_eq!(
            tree.area(outer),
            Some(Rect::new(0.0, 0.0, 10.0, 25.0)),
            "covers all"
        );
        let ends_before = tree.container::<Column>(outer).map(|c| c.ends);

        tree.widget_mut::<Block>(grow).expect("block").size = Size::new(40.0, 30.0);
        tree.reflow(grow);
        tree.layout(root, &mut NullSurface);

        assert_eq!(
            tree.area(grow),
            Some(Rect::new(0.0, 0.0, 40.0, 30.0)),
            "remeasured"
        );
        assert_eq!(
            tree.area(inner),
            Some(Rect::new(0.0, 10.0, 40.0, 40.0)),
            "inner grew"
        );
        assert_eq!(
            tree.area(last),
            Some(Rect::new(0.0, 40.0, 10.0, 45.0)),
            "pushed down"
        );
        assert_eq!(
            tree.area(outer),
            Some(Rect::new(0.0, 0.0, 40.0, 45.0)),
            "outer grew"
        );
        assert_eq!(
            tree.area(first),
            Some(Rect::new(0.0, 0.0, 10.0, 10.0)),
            "untouched"
        );
        assert_eq!(
            tree.container::<Column>(outer).map(|c| c.ends),
            ends_before.map(|n| n + 1),
            "outer ran its end hook once more"
        );
        assert!(
            tree.container::<Column>(outer)
                .is_some_and(|c| c.begins == c.ends),
            "begin and end stay paired"
        );
        assert!(all_clean(&tree, root), "fixed point reached");
    }

    #[test]
    fn clean_tree_is_not_visited() {
        let mut tree = Tree::new();
        let root = tree.insert_container(None, Group);
        let column = tree.insert_container(Some(root), Column::default());
        tree.insert_widget(Some(column), Block::sized(1.0, 1.0));
        tree.layout(root, &mut NullSurface);
        tree.layout(root, &mut NullSurface);
        assert_eq!(
            tree.container::<Column>(column).map(|c| c.ends),
            Some(1),
            "second pass had nothing to do"
        );
    }

    #[test]
    fn empty_container_runs_begin_and_end() {
        let mut tree = Tree::new();
        let root = tree.insert_container(None, Group);
        let empty = tree.insert_container(Some(root), Column::default());
        tree.layout(root, &mut NullSurface);
        let counts = tree.container::<Column>(empty).map(|c| (c.begins, c.ends));
        assert_eq!(
            counts,
            Some((1, 1)),
            "a childless container is still laid out"
        );
        assert_eq!(tree.area(empty), Some(Rect::ZERO), "nothing to cover");
    }

    #[test]
    fn unattached_widget_root_fills_its_constraints() {
        let mut tree = Tree::new();
        let root = tree.insert_widget(None, Block::sized(5.0, 5.0));
        tree.layout(root, &mut NullSurface);
        assert_eq!(
            tree.area(root),
            Some(Rect::new(0.0, 0.0, 512.0, 512.0)),
            "display"
        );
        assert_eq!(tree.layout_state(root), Some(LayoutState::Clean), "clean");
    }

    #[test]
    fn attached_subtree_root_keeps_its_constraints() {
        let mut tree = Tree::new();
        let root = tree.insert_container(None, Group);
        let leaf = tree.insert_widget(Some(root), Block::sized(5.0, 5.0));
        tree.layout(root, &mut NullSurface);
        tree.widget_mut::<Block>(leaf).expect("block").size = Size::new(7.0, 6.0);
        tree.layout(leaf, &mut NullSurface);
        assert_eq!(
            tree.area(leaf),
            Some(Rect::new(0.0, 0.0, 7.0, 6.0)),
            "preferred size"
        );
    }

    #[test]
    fn surface_change_resets_the_tree() {
        let mut surface = RecordingSurface::new(Size::new(64.0, 32.0));
        let mut tree = Tree::new();
        let root = tree.insert_container(None, Group);
        let leaf = tree.insert_widget(Some(root), Block::sized(8.0, 8.0));
        tree.layout(root, &mut surface);
        tree.paint_partial(root, &mut surface);
        assert_eq!(
            tree.area(root),
            Some(Rect::new(0.0, 0.0, 64.0, 32.0)),
            "first size"
        );

        surface.resolution = Size::new(32.0, 64.0);
        surface.changed = true;
        tree.layout(root, &mut surface);
        assert!(!surface.changed, "change observed once");
        assert_eq!(
            tree.area(root),
            Some(Rect::new(0.0, 0.0, 32.0, 64.0)),
            "rotated"
        );
        assert_eq!(
            tree.area(leaf),
            Some(Rect::new(0.0, 0.0, 8.0, 8.0)),
            "child kept"
        );
        assert_eq!(
            tree.paint_state(root),
            Some(PaintState::SelfDirty { repositioned: true }),
            "whole display repaints"
        );
        assert!(all_clean(&tree, root), "layout done");
    }
}
