// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Indented tree dump for debugging.

use core::fmt;

use crate::tree::Tree;
use crate::types::{NodeId, Phase};

/// Displays a subtree one node per line, created by [`Tree::pretty`].
///
/// Each line shows the node's label (or its type name) and its area relative
/// to the parent, indented two spaces per level.
#[derive(Clone, Copy, Debug)]
pub struct Pretty<'a> {
    tree: &'a Tree,
    root: NodeId,
}

impl Tree {
    /// Format the subtree at `root` for debugging.
    pub fn pretty(&self, root: NodeId) -> Pretty<'_> {
        Pretty { tree: self, root }
    }
}

/// Last path segment of a type name, without generic arguments.
fn short_name(path: &str) -> &str {
    let base = path.split('<').next().unwrap_or(path);
    base.rsplit("::").next().unwrap_or(base)
}

impl fmt::Display for Pretty<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut depth = 0_usize;
        for visit in self.tree.traverse(self.root) {
            if visit.phase == Phase::Post {
                depth = depth.saturating_sub(1);
                continue;
            }
            let node = visit.node;
            let area = self.tree.node(node).area;
            let name = self
                .tree
                .label(node)
                .unwrap_or_else(|| short_name(self.tree.type_name(node)));
            writeln!(
                f,
                "{:indent$}{name} @ ({}, {}) {}x{}",
                "",
                area.x0,
                area.y0,
                area.width(),
                area.height(),
                indent = depth * 2
            )?;
            if visit.phase == Phase::Pre {
                depth += 1;
            }
        }
        Ok(())
    }
}
