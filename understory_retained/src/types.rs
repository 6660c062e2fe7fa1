// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the node tree: identifiers, kinds, dirty states, and traversal visits.

/// Identifier for a node in the tree (generational).
///
/// A removed node's identifier never becomes live again: reusing its slot bumps
/// the generation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Whether a node may own children or paints itself.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum NodeKind {
    /// Owns an ordered list of children and negotiates their layout.
    Container,
    /// Leaf node with a preferred size and a paint routine.
    Widget,
}

/// Layout lifecycle of a node.
///
/// Every ancestor of a [`SelfDirty`](LayoutState::SelfDirty) node is either
/// dirty itself or [`ChildDirty`](LayoutState::ChildDirty) until the next
/// layout pass clears it.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum LayoutState {
    /// Nothing to do in this subtree.
    #[default]
    Clean,
    /// The node itself must be measured again.
    SelfDirty,
    /// Some descendant must be measured again.
    ChildDirty,
}

impl LayoutState {
    /// Returns `true` for [`LayoutState::SelfDirty`].
    pub const fn is_self_dirty(self) -> bool {
        matches!(self, Self::SelfDirty)
    }

    /// Returns `true` unless the state is [`LayoutState::Clean`].
    pub const fn needs_work(self) -> bool {
        !matches!(self, Self::Clean)
    }
}

/// Paint lifecycle of a node.
///
/// A self-dirty node repaints its whole subtree, so it subsumes the child states.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum PaintState {
    /// Nothing to repaint in this subtree.
    #[default]
    Clean,
    /// The node and its subtree must be repainted.
    SelfDirty {
        /// A child moved or resized; for a root this widens the repaint to the
        /// whole display.
        repositioned: bool,
    },
    /// Exactly one dirty path passes through this node.
    ChildDirty,
    /// More than one dirty path passes through this node.
    ChildDirtyDiverged,
}

impl PaintState {
    /// Returns `true` for [`PaintState::SelfDirty`].
    pub const fn is_self_dirty(self) -> bool {
        matches!(self, Self::SelfDirty { .. })
    }

    /// Returns `true` if the node is self-dirty because a child was repositioned.
    pub const fn is_repositioned(self) -> bool {
        matches!(self, Self::SelfDirty { repositioned: true })
    }

    /// Returns `true` if some descendant, but not the node itself, is dirty.
    pub const fn has_dirty_child(self) -> bool {
        matches!(self, Self::ChildDirty | Self::ChildDirtyDiverged)
    }

    /// Returns `true` unless the state is [`PaintState::Clean`].
    pub const fn needs_work(self) -> bool {
        !matches!(self, Self::Clean)
    }
}

bitflags::bitflags! {
    /// Ownership flags of a node.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct LifetimeFlags: u8 {
        /// Destroyed together with its parent instead of being detached from it.
        const SHARES_PARENT_LIFETIME = 0b0000_0001;
        /// Lifetime is tracked through a [`NodeRef`](crate::NodeRef).
        const MANAGED                = 0b0000_0010;
        /// The [`NodeRef`](crate::NodeRef) was released; destroyed once detached.
        const UNREFERENCED           = 0b0000_0100;
    }
}

/// Position of a traversal relative to a node.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Phase {
    /// Entering a node whose children follow.
    Pre,
    /// Leaving a node whose children have all been visited.
    Post,
    /// Visiting a node without children; entering and leaving at once.
    Leaf,
}

/// A node together with the traversal phase it is visited in.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Visit {
    /// The visited node.
    pub node: NodeId,
    /// Whether the node is being entered, left, or both.
    pub phase: Phase,
}

impl Visit {
    /// Returns `true` when entering the node (also for leaves).
    pub const fn is_pre(self) -> bool {
        !matches!(self.phase, Phase::Post)
    }

    /// Returns `true` when leaving the node (also for leaves).
    pub const fn is_post(self) -> bool {
        !matches!(self.phase, Phase::Pre)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_visits_are_pre_and_post() {
        let id = NodeId::new(0, 1);
        let leaf = Visit {
            node: id,
            phase: Phase::Leaf,
        };
        assert!(
            leaf.is_pre() && leaf.is_post(),
            "leaf collapses both phases"
        );
        let pre = Visit {
            node: id,
            phase: Phase::Pre,
        };
        assert!(pre.is_pre() && !pre.is_post(), "pre is not post");
        let post = Visit {
            node: id,
            phase: Phase::Post,
        };
        assert!(!post.is_pre() && post.is_post(), "post is not pre");
    }

    #[test]
    fn paint_state_predicates() {
        let moved = PaintState::SelfDirty { repositioned: true };
        assert!(
            moved.is_self_dirty() && moved.is_repositioned(),
            "moved node"
        );
        assert!(!moved.has_dirty_child(), "self-dirty subsumes children");
        assert!(PaintState::ChildDirtyDiverged.has_dirty_child(), "diverged");
        assert!(!PaintState::Clean.needs_work(), "clean");
        assert!(LayoutState::ChildDirty.needs_work(), "child dirty");
        assert!(
            !LayoutState::ChildDirty.is_self_dirty(),
            "only the child is dirty"
        );
    }
}
