// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint drivers.
//!
//! [`Tree::paint_partial`] redraws only what the dirty flags mark. Every dirty
//! region is cut into windows the surface's buffer can hold (see
//! [`Surface::split`]), and each window is painted by the smallest subtree that
//! covers it: the dirty node itself when its clip contains the window, or the
//! whole tree when the surface rounded the window past the node.

use alloc::vec::Vec;

use kurbo::Rect;
use tracing::{debug, trace};

use crate::canvas::Canvas;
use crate::geometry::{contains_rect, display_rect, is_empty};
use crate::position::PositionRebuilder;
use crate::surface::Surface;
use crate::traverse::Cursor;
use crate::tree::{Behavior, Tree};
use crate::types::{NodeId, NodeKind, PaintState};

/// Display windows painted by one pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Damage {
    /// Windows in the order they were painted, in display coordinates.
    pub windows: Vec<Rect>,
}

impl Damage {
    /// Returns `true` if nothing was painted.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Returns the union of all painted windows.
    pub fn union_rect(&self) -> Option<Rect> {
        let mut it = self.windows.iter().copied();
        let first = it.next()?;
        Some(it.fold(first, |acc, r| acc.union(r)))
    }
}

/// Take the next buffer window off `remaining`, checking that the surface made progress.
fn next_window(surface: &dyn Surface, remaining: &mut Rect) -> Rect {
    let before = *remaining;
    let window = surface.split(remaining);
    assert!(!is_empty(window), "surface split made no progress");
    assert!(
        is_empty(*remaining) || remaining.area() < before.area(),
        "surface split did not shrink the remaining area"
    );
    window
}

impl Tree {
    /// Repaint the dirty parts of the subtree at `root`.
    ///
    /// On return every node in the subtree is [`PaintState::Clean`], and the
    /// surface has been flushed if anything was drawn.
    ///
    /// # Panics
    ///
    /// Panics if [`Surface::split`] returns an empty window or does not shrink
    /// the remaining area.
    pub fn paint_partial(&mut self, root: NodeId, surface: &mut dyn Surface) -> Damage {
        let mut damage = Damage::default();
        if !self.is_alive(root) {
            return damage;
        }
        debug!(?root, "paint");
        let display = display_rect(surface.resolution());
        let base = PositionRebuilder::at_parent_of(self, root);
        let mut stack = base.clone();
        let mut cursor = Cursor::new(root);

        while let Some(visit) = cursor.next(self) {
            let node = visit.node;
            if visit.is_pre() {
                stack.push(self, node);
                let visible = stack.clip().intersect(display);
                let (kind, state) = {
                    let n = self.node(node);
                    (n.kind, n.paint)
                };
                let descend = if is_empty(visible) {
                    // Nothing of this subtree can show; drop its flags.
                    self.clear_paint_subtree(node);
                    false
                } else if state.is_self_dirty() {
                    let mut remaining = if node == root && state.is_repositioned() {
                        display
                    } else {
                        visible
                    };
                    while !is_empty(remaining) {
                        let window = next_window(surface, &mut remaining);
                        self.paint_into(root, node, surface, window, &stack, &base);
                        damage.windows.push(window);
                    }
                    self.clear_paint_subtree(node);
                    false
                } else if kind == NodeKind::Container && state == PaintState::ChildDirtyDiverged {
                    let mut remaining = visible;
                    let window = next_window(surface, &mut remaining);
                    if is_empty(remaining) {
                        trace!(?node, ?window, "coalescing diverged container");
                        self.paint_into(root, node, surface, window, &stack, &base);
                        damage.windows.push(window);
                        self.clear_paint_subtree(node);
                        false
                    } else {
                        true
                    }
                } else {
                    kind == NodeKind::Container && state == PaintState::ChildDirty
                };
                if !descend {
                    stack.pop(self, node);
                    cursor.skip();
                    continue;
                }
            }
            if visit.is_post() {
                self.clear_paint(node);
                stack.pop(self, node);
            }
        }

        if !damage.is_empty() {
            debug!(windows = damage.windows.len(), "flush");
            surface.flush();
        }
        damage
    }

    /// Paint everything in the subtree at `root` that intersects `window`.
    ///
    /// Dirty state is left untouched. Uses the same buffer windows as
    /// [`Tree::paint_partial`].
    pub fn paint_full(&mut self, root: NodeId, surface: &mut dyn Surface, window: Rect) -> Damage {
        let mut damage = Damage::default();
        if !self.is_alive(root) {
            return damage;
        }
        let base = PositionRebuilder::at_parent_of(self, root);
        let mut remaining = window.intersect(display_rect(surface.resolution()));
        while !is_empty(remaining) {
            let window = next_window(surface, &mut remaining);
            self.paint_window(root, surface, window, base.clone());
            damage.windows.push(window);
        }
        if !damage.is_empty() {
            surface.flush();
        }
        damage
    }

    /// Paint one window on behalf of the dirty node `current`.
    ///
    /// `stack` has `current` pushed; `base` is the state above `root`.
    fn paint_into(
        &mut self,
        root: NodeId,
        current: NodeId,
        surface: &mut dyn Surface,
        window: Rect,
        stack: &PositionRebuilder,
        base: &PositionRebuilder,
    ) {
        if !contains_rect(stack.clip(), window) {
            self.paint_window(root, surface, window, base.clone());
            return;
        }
        let baseline = if current == root {
            base.clone()
        } else {
            let mut baseline = stack.clone();
            baseline.pop(self, current);
            baseline
        };
        self.paint_window(current, surface, window, baseline);
    }

    /// Paint every widget under `start` that intersects `window`.
    ///
    /// `stack` holds the state of `start`'s parent.
    fn paint_window(
        &mut self,
        start: NodeId,
        surface: &mut dyn Surface,
        window: Rect,
        mut stack: PositionRebuilder,
    ) {
        trace!(?start, ?window, "paint window");
        surface.begin(window);
        let mut cursor = Cursor::new(start);
        while let Some(visit) = cursor.next(self) {
            let node = visit.node;
            if visit.is_pre() {
                stack.push(self, node);
                let visible = stack.clip().intersect(window);
                if is_empty(visible) {
                    stack.pop(self, node);
                    cursor.skip();
                    continue;
                }
                if let Some(Behavior::Widget(widget)) = self.node(node).behavior.as_ref() {
                    let mut canvas = Canvas::new(surface, stack.translation(), visible);
                    widget.paint(&mut canvas);
                }
            }
            if visit.is_post() {
                stack.pop(self, node);
            }
        }
        surface.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Block, RecordingSurface};
    use crate::widget::Group;
    use kurbo::{Point, Size};

    struct Scene {
        tree: Tree,
        surface: RecordingSurface,
        root: NodeId,
        panel: NodeId,
        a: NodeId,
        b: NodeId,
    }

    /// 100×100 display: a 10×10 block at (10,10) inside a panel, and a 20×20
    /// block at `b_at` directly under the root. The first frame is already painted.
    fn scene(b_at: Point) -> Scene {
        let mut surface = RecordingSurface::new(Size::new(100.0, 100.0));
        let mut tree = Tree::new();
        let root = tree.insert_container(None, Group);
        let panel = tree.insert_container(Some(root), Group);
        let a = tree.insert_widget(Some(panel), Block::sized(10.0, 10.0));
        let b = tree.insert_widget(Some(root), Block::sized(20.0, 20.0));
        tree.set_position(a, Point::new(10.0, 10.0));
        tree.set_position(b, b_at);
        tree.layout(root, &mut surface);

        let first = tree.paint_partial(root, &mut surface);
        assert_eq!(
            first.windows,
            [Rect::new(0.0, 0.0, 100.0, 100.0)],
            "first frame covers the display"
        );
        surface.clear();
        Scene {
            tree,
            surface,
            root,
            panel,
            a,
            b,
        }
    }

    fn all_clean(tree: &Tree, root: NodeId) -> bool {
        tree.descendants(root)
            .all(|id| tree.paint_state(id) == Some(PaintState::Clean))
    }

    #[test]
    fn first_frame_paints_everything_and_cleans() {
        let mut surface = RecordingSurface::new(Size::new(100.0, 100.0));
        let mut tree = Tree::new();
        let root = tree.insert_container(None, Group);
        let a = tree.insert_widget(Some(root), Block::sized(10.0, 10.0));
        tree.set_position(a, Point::new(10.0, 10.0));
        tree.layout(root, &mut surface);
        let damage = tree.paint_partial(root, &mut surface);
        assert_eq!(
            damage.union_rect(),
            Some(Rect::new(0.0, 0.0, 100.0, 100.0)),
            "display"
        );
        assert_eq!(
            surface.draws,
            [Rect::new(10.0, 10.0, 20.0, 20.0)],
            "block drawn"
        );
        assert_eq!(surface.flushes, 1, "flushed once");
        assert!(all_clean(&tree, root), "flags cleared");
    }

    #[test]
    fn repaint_touches_only_the_dirty_widget() {
        let Scene {
            mut tree,
            mut surface,
            root,
            b,
            ..
        } = scene(Point::new(50.0, 50.0));
        tree.repaint(b);
        let damage = tree.paint_partial(root, &mut surface);
        assert_eq!(
            damage.windows,
            [Rect::new(50.0, 50.0, 70.0, 70.0)],
            "b's clip only"
        );
        assert_eq!(
            surface.draws,
            [Rect::new(50.0, 50.0, 70.0, 70.0)],
            "only b drawn"
        );
        assert_eq!(
            surface.begins,
            damage.windows,
            "one buffer window per damage rect"
        );
        assert!(all_clean(&tree, root), "flags cleared");
    }

    #[test]
    fn second_frame_without_changes_draws_nothing() {
        let Scene {
            mut tree,
            mut surface,
            root,
            a,
            ..
        } = scene(Point::new(50.0, 50.0));
        tree.repaint(a);
        tree.paint_partial(root, &mut surface);
        surface.clear();

        let damage = tree.paint_partial(root, &mut surface);
        assert!(damage.is_empty(), "no damage");
        assert!(surface.draws.is_empty(), "no draws");
        assert_eq!(surface.flushes, 0, "no flush");
    }

    #[test]
    fn empty_container_inserted_after_a_frame_is_cleaned() {
        let Scene {
            mut tree,
            mut surface,
            root,
            panel,
            ..
        } = scene(Point::new(50.0, 50.0));
        let empty = tree.insert_container(Some(panel), Group);
        assert_eq!(
            tree.paint_state(root),
            Some(PaintState::ChildDirty),
            "root flagged"
        );
        tree.layout(root, &mut surface);
        tree.paint_partial(root, &mut surface);
        assert_eq!(
            tree.paint_state(empty),
            Some(PaintState::Clean),
            "new container"
        );
        assert!(all_clean(&tree, root), "nothing left dirty");
    }

    #[test]
    fn diverged_container_paints_as_a_unit_when_one_window_fits() {
        let Scene {
            mut tree,
            mut surface,
            root,
            a,
            b,
            ..
        } = scene(Point::new(50.0, 50.0));
        tree.repaint(a);
        tree.repaint(b);
        assert_eq!(
            tree.paint_state(root),
            Some(PaintState::ChildDirtyDiverged),
            "two dirty paths"
        );
        let damage = tree.paint_partial(root, &mut surface);
        assert_eq!(
            damage.windows,
            [Rect::new(0.0, 0.0, 100.0, 100.0)],
            "one window"
        );
        assert_eq!(
            surface.draws,
            [
                Rect::new(10.0, 10.0, 20.0, 20.0),
                Rect::new(50.0, 50.0, 70.0, 70.0)
            ],
            "both drawn once"
        );
        assert!(all_clean(&tree, root), "flags cleared");
    }

    #[test]
    fn diverged_container_descends_when_the_buffer_is_small() {
        let Scene {
            mut tree,
            mut surface,
            root,
            a,
            b,
            ..
        } = scene(Point::new(50.0, 50.0));
        surface.capacity = Some(1000);
        tree.repaint(a);
        tree.repaint(b);
        let damage = tree.paint_partial(root, &mut surface);
        assert_eq!(
            damage.windows,
            [
                Rect::new(10.0, 10.0, 20.0, 20.0),
                Rect::new(50.0, 50.0, 70.0, 70.0)
            ],
            "each dirty widget painted separately"
        );
        assert_eq!(surface.draws, damage.windows, "draws match");
        assert!(all_clean(&tree, root), "flags cleared");
    }

    #[test]
    fn split_loop_terminates_with_a_small_buffer() {
        let Scene {
            mut tree,
            mut surface,
            root,
            ..
        } = scene(Point::new(50.0, 50.0));
        surface.capacity = Some(1000);
        tree.repaint_all(root);
        let damage = tree.paint_partial(root, &mut surface);
        assert_eq!(damage.windows.len(), 10, "ten rows per window");
        assert_eq!(
            damage.union_rect(),
            Some(Rect::new(0.0, 0.0, 100.0, 100.0)),
            "windows cover the display"
        );
        assert_eq!(
            surface.draws,
            [
                Rect::new(10.0, 10.0, 20.0, 20.0),
                Rect::new(50.0, 50.0, 70.0, 60.0),
                Rect::new(50.0, 60.0, 70.0, 70.0),
            ],
            "widgets drawn in every window they cross"
        );
        assert_eq!(surface.flushes, 1, "flushed once per pass");
        assert!(all_clean(&tree, root), "flags cleared");
    }

    #[test]
    fn rounded_windows_repaint_neighbours_from_the_root() {
        let Scene {
            mut tree,
            mut surface,
            root,
            a,
            ..
        } = scene(Point::new(50.0, 12.0));
        surface.full_rows = true;
        tree.repaint(a);
        let damage = tree.paint_partial(root, &mut surface);
        assert_eq!(
            damage.windows,
            [Rect::new(0.0, 8.0, 100.0, 24.0)],
            "window rounded to whole pages"
        );
        assert_eq!(
            surface.draws,
            [
                Rect::new(10.0, 10.0, 20.0, 20.0),
                Rect::new(50.0, 12.0, 70.0, 24.0)
            ],
            "the neighbour inside the window is drawn again"
        );
    }

    #[test]
    fn moved_widget_repaints_its_parent() {
        let Scene {
            mut tree,
            mut surface,
            root,
            panel,
            a,
            ..
        } = scene(Point::new(50.0, 50.0));
        tree.set_position(a, Point::new(0.0, 0.0));
        let damage = tree.paint_partial(root, &mut surface);
        assert_eq!(
            damage.windows,
            [Rect::new(0.0, 0.0, 20.0, 20.0)],
            "old and new footprint lie in the panel"
        );
        assert_eq!(
            surface.draws,
            [Rect::new(0.0, 0.0, 10.0, 10.0)],
            "new position"
        );
        assert_eq!(
            tree.paint_state(panel),
            Some(PaintState::Clean),
            "panel cleared"
        );
    }

    #[test]
    fn off_screen_changes_are_dropped() {
        let Scene {
            mut tree,
            mut surface,
            root,
            b,
            ..
        } = scene(Point::new(200.0, 200.0));
        tree.repaint(b);
        let damage = tree.paint_partial(root, &mut surface);
        assert!(damage.is_empty(), "nothing visible");
        assert!(surface.draws.is_empty(), "no draws");
        assert_eq!(
            tree.paint_state(b),
            Some(PaintState::Clean),
            "flag cleared anyway"
        );
        assert!(all_clean(&tree, root), "flags cleared");
    }

    #[test]
    fn full_paint_ignores_flags() {
        let Scene {
            mut tree,
            mut surface,
            root,
            a,
            ..
        } = scene(Point::new(50.0, 50.0));
        tree.repaint(a);
        let damage = tree.paint_full(root, &mut surface, Rect::new(0.0, 0.0, 60.0, 60.0));
        assert_eq!(
            damage.windows,
            [Rect::new(0.0, 0.0, 60.0, 60.0)],
            "requested window"
        );
        assert_eq!(
            surface.draws,
            [
                Rect::new(10.0, 10.0, 20.0, 20.0),
                Rect::new(50.0, 50.0, 60.0, 60.0)
            ],
            "everything in the window"
        );
        assert!(
            tree.paint_state(a).is_some_and(PaintState::is_self_dirty),
            "dirty state untouched"
        );
    }

    #[test]
    fn subtree_roots_paint_at_their_absolute_position() {
        let Scene {
            mut tree,
            mut surface,
            panel,
            a,
            ..
        } = scene(Point::new(50.0, 50.0));
        tree.set_position(panel, Point::new(30.0, 30.0));
        tree.repaint(a);
        surface.clear();
        tree.paint_partial(panel, &mut surface);
        assert_eq!(
            surface.draws,
            [Rect::new(40.0, 40.0, 50.0, 50.0)],
            "offset by the panel"
        );
    }
}
