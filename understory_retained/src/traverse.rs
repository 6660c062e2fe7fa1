// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Depth-first traversals over a subtree.
//!
//! All traversals are bounded to the subtree of their start node and visit
//! siblings in list order. [`Cursor`] does not borrow the tree, so drivers can
//! mutate nodes between steps; the borrowing iterators wrap it for read-only
//! walks.

use crate::tree::Tree;
use crate::types::{NodeId, NodeKind, Phase, Visit};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum CursorState {
    Start,
    Running,
    Revisit,
    Done,
}

/// A pre+post depth-first cursor that can skip or repeat subtrees.
///
/// Containers with children are visited twice ([`Phase::Pre`] and
/// [`Phase::Post`]); widgets and empty containers once ([`Phase::Leaf`]).
///
/// The cursor only holds node ids. Structural edits in the part of the tree that
/// has not been visited yet are picked up; removing the current node is not
/// supported.
#[derive(Clone, Debug)]
pub struct Cursor {
    root: NodeId,
    current: Option<Visit>,
    state: CursorState,
}

impl Cursor {
    /// A cursor whose first visit is `root`.
    pub fn new(root: NodeId) -> Self {
        Self {
            root,
            current: None,
            state: CursorState::Start,
        }
    }

    /// Advance and return the next visit, or `None` once the subtree is exhausted.
    pub fn next(&mut self, tree: &Tree) -> Option<Visit> {
        let next = match self.state {
            CursorState::Start => tree.is_alive(self.root).then(|| Visit {
                node: self.root,
                phase: tree.pre_or_leaf(self.root),
            }),
            CursorState::Running => self.current.and_then(|v| tree.step(self.root, v)),
            CursorState::Revisit => self.current,
            CursorState::Done => None,
        };
        self.state = if next.is_some() {
            CursorState::Running
        } else {
            CursorState::Done
        };
        self.current = next;
        next
    }

    /// Do not descend into the current node; continue with its next sibling.
    pub fn skip(&mut self) {
        if let Some(v) = &mut self.current {
            v.phase = Phase::Post;
        }
    }

    /// Make the next visit the pre-visit of `node`, then continue into its children.
    ///
    /// `node` must be inside the cursor's subtree.
    pub fn revisit(&mut self, tree: &Tree, node: NodeId) {
        self.current = Some(Visit {
            node,
            phase: tree.pre_or_leaf(node),
        });
        self.state = CursorState::Revisit;
    }
}

impl Tree {
    pub(crate) fn pre_or_leaf(&self, id: NodeId) -> Phase {
        let n = self.node(id);
        if n.kind == NodeKind::Container && n.first_child.is_some() {
            Phase::Pre
        } else {
            Phase::Leaf
        }
    }

    fn step(&self, root: NodeId, visit: Visit) -> Option<Visit> {
        let n = self.node(visit.node);
        if visit.phase == Phase::Pre
            && let Some(first) = n.first_child
        {
            return Some(Visit {
                node: first,
                phase: self.pre_or_leaf(first),
            });
        }
        if visit.node == root {
            return None;
        }
        if let Some(next) = n.next_sibling {
            return Some(Visit {
                node: next,
                phase: self.pre_or_leaf(next),
            });
        }
        n.parent.map(|parent| Visit {
            node: parent,
            phase: Phase::Post,
        })
    }

    /// Pre+post traversal of the subtree at `root`.
    pub fn traverse(&self, root: NodeId) -> Traverse<'_> {
        Traverse {
            tree: self,
            cursor: Cursor::new(root),
        }
    }

    /// Pre-order traversal of the subtree at `root`; post-visits are not reported.
    pub fn pre_order(&self, root: NodeId) -> PreOrder<'_> {
        PreOrder {
            tree: self,
            cursor: Cursor::new(root),
        }
    }

    /// Every node of the subtree at `root` in pre-order, `root` included.
    pub fn descendants(&self, root: NodeId) -> Descendants<'_> {
        Descendants {
            inner: self.pre_order(root),
        }
    }

    /// The parent chain of `id`, nearest first, `id` excluded.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent_of(id),
        }
    }
}

/// Pre+post iterator created by [`Tree::traverse`].
#[derive(Clone, Debug)]
pub struct Traverse<'a> {
    tree: &'a Tree,
    cursor: Cursor,
}

impl Traverse<'_> {
    /// Do not descend into the node last returned.
    pub fn skip_children(&mut self) {
        self.cursor.skip();
    }
}

impl Iterator for Traverse<'_> {
    type Item = Visit;

    fn next(&mut self) -> Option<Visit> {
        self.cursor.next(self.tree)
    }
}

/// Pre-order iterator created by [`Tree::pre_order`].
#[derive(Clone, Debug)]
pub struct PreOrder<'a> {
    tree: &'a Tree,
    cursor: Cursor,
}

impl PreOrder<'_> {
    /// Do not descend into the node last returned.
    pub fn skip_children(&mut self) {
        self.cursor.skip();
    }
}

impl Iterator for PreOrder<'_> {
    type Item = Visit;

    fn next(&mut self) -> Option<Visit> {
        loop {
            let visit = self.cursor.next(self.tree)?;
            if visit.is_pre() {
                return Some(visit);
            }
        }
    }
}

/// Node iterator created by [`Tree::descendants`].
#[derive(Clone, Debug)]
pub struct Descendants<'a> {
    inner: PreOrder<'a>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        self.inner.next().map(|v| v.node)
    }
}

/// Ancestor iterator created by [`Tree::ancestors`].
#[derive(Clone, Debug)]
pub struct Ancestors<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.node(current).parent;
        Some(current)
    }
}
