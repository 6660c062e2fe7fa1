// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Crate-internal mutation gateway.
//!
//! Clearing dirty state, writing clip caches, and forcing wholesale repaints can
//! break the propagation invariants if done out of order, so these operations are
//! only reachable by the layout, paint, and query drivers in this crate. Widget
//! code sees read accessors and the documented hooks.

use kurbo::Rect;

use crate::traverse::Cursor;
use crate::tree::Tree;
use crate::types::{LayoutState, NodeId, NodeKind, PaintState};

impl Tree {
    pub(crate) fn clear_layout(&mut self, id: NodeId) {
        self.node_mut(id).layout = LayoutState::Clean;
    }

    pub(crate) fn clear_paint(&mut self, id: NodeId) {
        self.node_mut(id).paint = PaintState::Clean;
    }

    /// Clear the paint state of `id` and every dirty descendant.
    ///
    /// Clean nodes have no dirty descendants, so their subtrees are skipped.
    pub(crate) fn clear_paint_subtree(&mut self, id: NodeId) {
        let mut cursor = Cursor::new(id);
        while let Some(visit) = cursor.next(self) {
            if !visit.is_pre() {
                continue;
            }
            if self.node(visit.node).paint.needs_work() {
                self.clear_paint(visit.node);
            } else {
                cursor.skip();
            }
        }
    }

    pub(crate) fn set_clip_cache(&mut self, id: NodeId, clip: Rect) {
        self.node_mut(id).clip = clip;
    }

    /// Repaint the node; containers also repaint everything their children ever covered.
    pub(crate) fn repaint_all(&mut self, id: NodeId) {
        self.repaint(id);
        let n = self.node_mut(id);
        if n.kind == NodeKind::Container {
            n.paint = PaintState::SelfDirty { repositioned: true };
        }
    }

    /// Mark a subtree for full relayout and repaint, as after a display change.
    pub(crate) fn reset(&mut self, id: NodeId) {
        self.reflow(id);
        self.repaint_all(id);
    }
}
