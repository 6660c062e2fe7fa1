// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Absolute position and clip tracking.
//!
//! Areas are stored relative to the parent. Traversals that need absolute
//! coordinates carry a [`PositionRebuilder`] and push/pop it as they enter and
//! leave nodes; [`Tree::absolute`] computes the same values for a single node by
//! walking its ancestors.

use kurbo::{Rect, Vec2};
use smallvec::SmallVec;

use crate::tree::Tree;
use crate::types::NodeId;

/// Incrementally maintained absolute translation and clip.
///
/// After [`push`](Self::push)ing every node from the root down to some node,
/// [`translation`](Self::translation) is that node's absolute origin and
/// [`clip`](Self::clip) the intersection of its absolute area with all ancestor
/// areas. Each push also stores the clip in the node's cache, which
/// [`pop`](Self::pop) reads back for the parent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PositionRebuilder {
    translation: Vec2,
    clip: Option<Rect>,
}

impl PositionRebuilder {
    /// An empty rebuilder; the first push starts at the display origin.
    pub fn new() -> Self {
        Self::default()
    }

    /// A rebuilder holding the state of `id`'s parent, ready to push `id`.
    ///
    /// For a root this is the same as [`PositionRebuilder::new`].
    pub fn at_parent_of(tree: &mut Tree, id: NodeId) -> Self {
        let path: SmallVec<[NodeId; 8]> = tree.ancestors(id).collect();
        let mut rebuilder = Self::new();
        for &ancestor in path.iter().rev() {
            rebuilder.push(tree, ancestor);
        }
        rebuilder
    }

    /// Enter `id`.
    pub fn push(&mut self, tree: &mut Tree, id: NodeId) {
        let area = tree.node(id).area;
        let absolute = area + self.translation;
        let clip = match self.clip {
            Some(outer) => outer.intersect(absolute),
            None => absolute,
        };
        self.clip = Some(clip);
        self.translation += area.origin().to_vec2();
        tree.set_clip_cache(id, clip);
    }

    /// Leave `id`, restoring the state of its parent.
    ///
    /// Popping a root (or a node pushed without its parent) leaves the state
    /// untouched.
    pub fn pop(&mut self, tree: &Tree, id: NodeId) {
        let n = tree.node(id);
        if let Some(parent) = n.parent {
            self.translation -= n.area.origin().to_vec2();
            self.clip = Some(tree.node(parent).clip);
        }
    }

    /// Absolute clip of the last pushed node, or [`Rect::ZERO`] before any push.
    pub fn clip(&self) -> Rect {
        self.clip.unwrap_or(Rect::ZERO)
    }

    /// Absolute origin of the last pushed node.
    pub fn translation(&self) -> Vec2 {
        self.translation
    }
}

/// Absolute placement of one node, computed by [`Tree::absolute`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AbsolutePosition {
    /// The node's area intersected with every ancestor's, in display coordinates.
    pub clip: Rect,
    /// The node's origin in display coordinates.
    pub translation: Vec2,
}

impl Tree {
    /// Compute the absolute clip and origin of `id` by walking its ancestors.
    ///
    /// Agrees with what a [`PositionRebuilder`] reports after pushing the path
    /// from the root to `id`.
    pub fn absolute(&self, id: NodeId) -> Option<AbsolutePosition> {
        let area = self.area(id)?;
        let mut clip = area;
        let mut translation = area.origin().to_vec2();
        for ancestor in self.ancestors(id) {
            let outer = self.node(ancestor).area;
            let offset = outer.origin().to_vec2();
            clip = outer.intersect(clip + offset);
            translation += offset;
        }
        Some(AbsolutePosition { clip, translation })
    }
}
