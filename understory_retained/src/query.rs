// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural and spatial queries.

use kurbo::{Point, Rect};

use crate::geometry::overlaps;
use crate::tree::{Behavior, Tree};
use crate::types::NodeId;

impl Tree {
    /// Returns `true` if `ancestor` is `node` or lies on its parent chain.
    pub fn is_transitive_parent(&self, ancestor: NodeId, node: NodeId) -> bool {
        if !self.is_alive(ancestor) || !self.is_alive(node) {
            return false;
        }
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Deepest node under `point` (display coordinates), later siblings first.
    ///
    /// Uses the clips cached by the last paint pass; call after
    /// [`Tree::paint_partial`] or [`Tree::paint_full`].
    pub fn hit_test(&self, root: NodeId, point: Point) -> Option<NodeId> {
        let mut hit = None;
        let mut it = self.traverse(root);
        while let Some(visit) = it.next() {
            if !visit.is_pre() {
                continue;
            }
            if !self.node(visit.node).clip.contains(point) {
                it.skip_children();
                continue;
            }
            // Later siblings paint over earlier ones, so the last match wins.
            hit = Some(visit.node);
        }
        hit
    }

    /// Returns `true` if `id` overlaps any of its siblings.
    ///
    /// Only the parts of both areas inside the parent's bounds count.
    ///
    /// When both nodes are widgets, the overlap must also be confirmed by
    /// [`Widget::collides`](crate::Widget::collides) on each side.
    pub fn collides(&self, id: NodeId) -> bool {
        let Some(parent) = self.parent_of(id) else {
            return false;
        };
        let bounds = Rect::from_origin_size(Point::ORIGIN, self.node(parent).area.size());
        let area = self.node(id).area;
        if !overlaps(bounds, area) {
            return false;
        }
        self.children(parent)
            .filter(|&sibling| sibling != id)
            .any(|sibling| {
                let other = self.node(sibling).area;
                if !overlaps(bounds, other) {
                    return false;
                }
                let shared = area.intersect(other);
                if !overlaps(area, other) {
                    return false;
                }
                self.widget_collides(id, shared - area.origin().to_vec2())
                    && self.widget_collides(sibling, shared - other.origin().to_vec2())
            })
    }

    fn widget_collides(&self, id: NodeId, local: Rect) -> bool {
        match self.node(id).behavior.as_ref() {
            Some(Behavior::Widget(w)) => w.collides(local),
            _ => true,
        }
    }
}
