// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core tree implementation: storage, structure, geometry, and dirty propagation.

use alloc::{boxed::Box, string::String, vec::Vec};
use core::any::Any;

use hashbrown::HashMap;
use kurbo::{Point, Rect, Size};
use tracing::trace;

use crate::component::{ComponentFilter, ComponentId, ComponentStore, MountEvent};
use crate::geometry::UNBOUNDED;
use crate::types::{LayoutState, LifetimeFlags, NodeId, NodeKind, PaintState};
use crate::widget::{Container, Widget};

/// A retained tree of containers and widgets.
///
/// Nodes are addressed by generational [`NodeId`]s. Containers own an ordered
/// list of children; widgets are leaves. Geometry setters record what changed
/// as [`LayoutState`] and [`PaintState`] on the node and its ancestors, and the
/// next [`Tree::layout`] and [`Tree::paint_partial`] only visit the marked
/// subtrees.
///
/// ## Example
///
/// ```rust
/// use kurbo::{Rect, Size};
/// use understory_retained::{Group, NullSurface, Tree, Widget};
///
/// struct Dot;
/// impl Widget for Dot {}
///
/// let mut tree = Tree::new();
/// let root = tree.insert_container(None, Group);
/// let dot = tree.insert_widget(Some(root), Dot);
///
/// let mut surface = NullSurface;
/// tree.layout(root, &mut surface);
/// tree.paint_partial(root, &mut surface);
///
/// assert_eq!(tree.area(root), Some(Rect::new(0.0, 0.0, 512.0, 512.0)));
/// assert_eq!(tree.area(dot), Some(Rect::ZERO));
/// ```
pub struct Tree {
    /// slots
    nodes: Vec<Option<Node>>,
    /// last generation per slot (persists across frees)
    generations: Vec<u32>,
    free_list: Vec<usize>,
    pub(crate) components: ComponentStore,
    labels: HashMap<NodeId, String>,
}

impl core::fmt::Debug for Tree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        f.debug_struct("Tree")
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &self.free_list.len())
            .field("components", &self.components)
            .finish_non_exhaustive()
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

/// Hook object of a node, matching its [`NodeKind`].
pub(crate) enum Behavior {
    Container(Box<dyn Container>),
    Widget(Box<dyn Widget>),
}

impl core::fmt::Debug for Behavior {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Container(c) => f.debug_tuple("Container").field(&c.name()).finish(),
            Self::Widget(w) => f.debug_tuple("Widget").field(&w.name()).finish(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Node {
    generation: u32,
    pub(crate) kind: NodeKind,
    pub(crate) layout: LayoutState,
    pub(crate) paint: PaintState,
    pub(crate) lifetime: LifetimeFlags,
    pub(crate) constraints: Size,
    /// Position and size relative to the parent.
    pub(crate) area: Rect,
    /// Absolute clip as of the last traversal that pushed this node.
    pub(crate) clip: Rect,
    pub(crate) parent: Option<NodeId>,
    pub(crate) prev_sibling: Option<NodeId>,
    pub(crate) next_sibling: Option<NodeId>,
    pub(crate) first_child: Option<NodeId>,
    pub(crate) last_child: Option<NodeId>,
    pub(crate) first_component: Option<ComponentId>,
    pub(crate) component_filter: ComponentFilter,
    /// `None` only while one of its hooks runs.
    pub(crate) behavior: Option<Behavior>,
}

impl Node {
    fn new(generation: u32, behavior: Behavior) -> Self {
        let (kind, paint) = match behavior {
            Behavior::Container(_) => (NodeKind::Container, PaintState::ChildDirtyDiverged),
            Behavior::Widget(_) => (NodeKind::Widget, PaintState::Clean),
        };
        Self {
            generation,
            kind,
            layout: LayoutState::SelfDirty,
            paint,
            lifetime: LifetimeFlags::empty(),
            constraints: UNBOUNDED,
            area: Rect::ZERO,
            clip: Rect::ZERO,
            parent: None,
            prev_sibling: None,
            next_sibling: None,
            first_child: None,
            last_child: None,
            first_component: None,
            component_filter: ComponentFilter::default(),
            behavior: Some(behavior),
        }
    }
}

impl Tree {
    /// Create a new empty tree.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a tree with room for `nodes` nodes before reallocating.
    pub fn with_capacity(nodes: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(nodes),
            generations: Vec::with_capacity(nodes),
            free_list: Vec::new(),
            components: ComponentStore::default(),
            labels: HashMap::new(),
        }
    }

    /// Insert a container, appended to `parent`'s children (or as a root if `None`).
    pub fn insert_container<C: Container>(
        &mut self,
        parent: Option<NodeId>,
        container: C,
    ) -> NodeId {
        self.insert(parent, Behavior::Container(Box::new(container)))
    }

    /// Insert a widget, appended to `parent`'s children (or as a root if `None`).
    pub fn insert_widget<W: Widget>(&mut self, parent: Option<NodeId>, widget: W) -> NodeId {
        self.insert(parent, Behavior::Widget(Box::new(widget)))
    }

    fn insert(&mut self, parent: Option<NodeId>, behavior: Behavior) -> NodeId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(Node::new(generation, behavior));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(Node::new(generation, behavior)));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            ((self.nodes.len() - 1) as u32, generation)
        };
        let id = NodeId::new(idx, generation);
        if let Some(p) = parent {
            self.push_back(p, id);
        }
        id
    }

    /// Attach `child` to `parent`, before `before` (or last if `None`).
    ///
    /// The child's constraints and area are reset, its mount hooks run, and the
    /// parent is reflowed. Attaching a node that already has a parent, a dead
    /// node, or an ancestor of `parent` is a contract violation.
    pub fn attach(&mut self, parent: NodeId, child: NodeId, before: Option<NodeId>) {
        debug_assert!(
            self.is_alive(parent) && self.is_alive(child),
            "attach requires live nodes"
        );
        debug_assert!(
            self.node(parent).kind == NodeKind::Container,
            "only containers own children"
        );
        debug_assert!(child != parent, "a node cannot be attached to itself");
        debug_assert!(
            self.node(child).parent.is_none(),
            "node is already attached"
        );
        debug_assert!(
            !self.is_transitive_parent(child, parent),
            "attaching a node below itself would create a cycle"
        );
        debug_assert!(
            before.is_none_or(|b| self.parent_of(b) == Some(parent)),
            "insertion point is not a child of the parent"
        );

        self.node_mut(parent).clip = Rect::ZERO;
        self.notify_mount(child, MountEvent::Mounted { parent });
        self.link(parent, child, before);
        {
            let n = self.node_mut(child);
            n.constraints = UNBOUNDED;
            n.area = Rect::ZERO;
        }
        self.reflow(parent);
        if self.node(child).paint.needs_work() {
            self.flag_ancestors_paint_dirty(child);
        }
        if let Some(Behavior::Container(c)) = &mut self.node_mut(parent).behavior {
            c.on_child_attached(child);
        }
    }

    /// Attach `child` as the first child of `parent`.
    pub fn push_front(&mut self, parent: NodeId, child: NodeId) {
        let before = self.front(parent);
        self.attach(parent, child, before);
    }

    /// Attach `child` as the last child of `parent`.
    pub fn push_back(&mut self, parent: NodeId, child: NodeId) {
        self.attach(parent, child, None);
    }

    /// Detach `child` from its parent and return its former next sibling.
    ///
    /// The node stays alive as a root; a node whose [`NodeRef`](crate::NodeRef)
    /// was released is destroyed instead. Returns `None` for roots and stale ids.
    pub fn detach(&mut self, child: NodeId) -> Option<NodeId> {
        let (_, next) = self.unlink_from_parent(child)?;
        if self
            .node(child)
            .lifetime
            .contains(LifetimeFlags::UNREFERENCED)
        {
            trace!(node = ?child, "collecting unreferenced node");
            self.destroy(child);
        }
        next
    }

    /// Detach every child of `parent`.
    pub fn clear(&mut self, parent: NodeId) {
        while let Some(child) = self.front(parent) {
            self.detach(child);
        }
    }

    /// Move `id` under `parent`, before `before` (or last if `None`).
    ///
    /// Equivalent to a detach followed by an attach. A node whose
    /// [`NodeRef`](crate::NodeRef) was released must not be moved.
    pub fn move_node(&mut self, id: NodeId, parent: NodeId, before: Option<NodeId>) {
        if !self.is_alive(id) {
            return;
        }
        debug_assert!(
            !self
                .node(id)
                .lifetime
                .contains(LifetimeFlags::UNREFERENCED),
            "cannot move a node awaiting destruction"
        );
        self.unlink_from_parent(id);
        self.attach(parent, id, before);
    }

    /// Remove a node.
    ///
    /// Children sharing its lifetime are removed with it; all other children are
    /// detached and survive as roots. The id becomes stale immediately.
    pub fn remove(&mut self, id: NodeId) {
        if !self.is_alive(id) {
            return;
        }
        self.unlink_from_parent(id);
        self.destroy(id);
    }

    /// Opt `id` in or out of being removed together with its parent.
    pub fn set_shares_parent_lifetime(&mut self, id: NodeId, shares: bool) {
        if let Some(n) = self.node_opt_mut(id) {
            n.lifetime
                .set(LifetimeFlags::SHARES_PARENT_LIFETIME, shares);
        }
    }

    /// Set the area (relative to the parent). Returns `true` if it changed.
    ///
    /// A change marks the parent for repaint, since both the old and the new
    /// footprint must be redrawn; a root marks itself.
    pub fn set_area(&mut self, id: NodeId, area: Rect) -> bool {
        if let Some(n) = self.node_opt_mut(id)
            && n.area != area
        {
            n.area = area;
            self.repaint_repositioned(id);
            true
        } else {
            false
        }
    }

    /// Set the position (relative to the parent), keeping the size.
    pub fn set_position(&mut self, id: NodeId, position: Point) -> bool {
        match self.area(id) {
            Some(area) => self.set_area(id, area.with_origin(position)),
            None => false,
        }
    }

    /// Set the size, keeping the position.
    pub fn set_size(&mut self, id: NodeId, size: Size) -> bool {
        match self.area(id) {
            Some(area) => self.set_area(id, area.with_size(size)),
            None => false,
        }
    }

    /// Set the maximum size offered to the node. A change reflows it.
    pub fn set_constraints(&mut self, id: NodeId, constraints: Size) -> bool {
        if let Some(n) = self.node_opt_mut(id)
            && n.constraints != constraints
        {
            n.constraints = constraints;
            self.reflow(id);
            true
        } else {
            false
        }
    }

    /// Mark `id` for measurement in the next [`Tree::layout`].
    ///
    /// Ancestors are marked [`LayoutState::ChildDirty`] up to the first one that
    /// already needs work.
    pub fn reflow(&mut self, id: NodeId) {
        let Some(n) = self.node_opt_mut(id) else {
            return;
        };
        if n.layout.is_self_dirty() {
            return;
        }
        let mut current = n.parent;
        while let Some(a) = current {
            let n = self.node_mut(a);
            if n.layout.needs_work() {
                break;
            }
            n.layout = LayoutState::ChildDirty;
            current = n.parent;
        }
        self.node_mut(id).layout = LayoutState::SelfDirty;
    }

    /// Mark `id` for repaint in the next [`Tree::paint_partial`].
    pub fn repaint(&mut self, id: NodeId) {
        let Some(n) = self.node_opt_mut(id) else {
            return;
        };
        match (n.kind, n.paint) {
            (NodeKind::Widget, PaintState::SelfDirty { .. }) => return,
            (_, state) => {
                n.paint = PaintState::SelfDirty {
                    repositioned: state.is_repositioned(),
                };
            }
        }
        self.flag_ancestors_paint_dirty(id);
    }

    /// Propagate "a descendant is paint-dirty" from `id` upward.
    ///
    /// Stops at a self-dirty ancestor, and at the first ancestor that already had
    /// a dirty child (which becomes diverged).
    pub(crate) fn flag_ancestors_paint_dirty(&mut self, id: NodeId) {
        let mut current = self.node(id).parent;
        while let Some(a) = current {
            let n = self.node_mut(a);
            match n.paint {
                PaintState::SelfDirty { .. } | PaintState::ChildDirtyDiverged => return,
                PaintState::ChildDirty => {
                    n.paint = PaintState::ChildDirtyDiverged;
                    return;
                }
                PaintState::Clean => n.paint = PaintState::ChildDirty,
            }
            current = n.parent;
        }
    }

    /// A node moved or resized: its parent (or itself, for a root) repaints wholesale.
    pub(crate) fn repaint_repositioned(&mut self, id: NodeId) {
        let target = self.node(id).parent.unwrap_or(id);
        match self.node(target).paint {
            PaintState::SelfDirty { repositioned: true } => {}
            PaintState::SelfDirty { repositioned: false } => {
                self.node_mut(target).paint = PaintState::SelfDirty { repositioned: true };
            }
            _ => {
                self.flag_ancestors_paint_dirty(target);
                self.node_mut(target).paint = PaintState::SelfDirty { repositioned: true };
            }
        }
        trace!(node = ?target, "repositioned");
    }

    /// Attach a debug label, shown by [`Tree::pretty`] instead of the type name.
    pub fn set_label(&mut self, id: NodeId, label: impl Into<String>) {
        if self.is_alive(id) {
            self.labels.insert(id, label.into());
        }
    }

    /// Returns the debug label of a live node, if any.
    pub fn label(&self, id: NodeId) -> Option<&str> {
        self.labels.get(&id).map(String::as_str)
    }

    // --- accessors ---

    /// Returns true if `id` refers to a live node.
    ///
    /// A `NodeId` is considered live if its slot exists and its generation matches
    /// the current generation stored in that slot.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .map(|n| n.generation == id.1)
            .unwrap_or(false)
    }

    /// Returns the kind of a live node.
    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.node_opt(id).map(|n| n.kind)
    }

    /// Returns the parent of a node if live, or `None` for roots or stale ids.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.node_opt(id).and_then(|n| n.parent)
    }

    /// Returns `true` if the node has a parent.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.parent_of(id).is_some()
    }

    /// First child of a container.
    pub fn front(&self, id: NodeId) -> Option<NodeId> {
        self.node_opt(id).and_then(|n| n.first_child)
    }

    /// Last child of a container.
    pub fn back(&self, id: NodeId) -> Option<NodeId> {
        self.node_opt(id).and_then(|n| n.last_child)
    }

    /// Next sibling in the parent's child list.
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node_opt(id).and_then(|n| n.next_sibling)
    }

    /// Previous sibling in the parent's child list.
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node_opt(id).and_then(|n| n.prev_sibling)
    }

    /// Iterate the children of a node in order; empty for widgets and stale ids.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.front(id),
        }
    }

    /// Area relative to the parent.
    pub fn area(&self, id: NodeId) -> Option<Rect> {
        self.node_opt(id).map(|n| n.area)
    }

    /// Maximum size offered by the parent.
    pub fn constraints(&self, id: NodeId) -> Option<Size> {
        self.node_opt(id).map(|n| n.constraints)
    }

    /// Absolute clip cached by the last traversal that visited the node.
    ///
    /// Only meaningful after a paint pass; see [`Tree::absolute`] for a value
    /// computed on demand.
    pub fn clip(&self, id: NodeId) -> Option<Rect> {
        self.node_opt(id).map(|n| n.clip)
    }

    /// Layout state of a live node.
    pub fn layout_state(&self, id: NodeId) -> Option<LayoutState> {
        self.node_opt(id).map(|n| n.layout)
    }

    /// Paint state of a live node.
    pub fn paint_state(&self, id: NodeId) -> Option<PaintState> {
        self.node_opt(id).map(|n| n.paint)
    }

    /// Ownership flags of a live node.
    pub fn lifetime(&self, id: NodeId) -> Option<LifetimeFlags> {
        self.node_opt(id).map(|n| n.lifetime)
    }

    /// Borrow a widget as its concrete type.
    pub fn widget<W: Widget>(&self, id: NodeId) -> Option<&W> {
        match self.node_opt(id)?.behavior.as_ref()? {
            Behavior::Widget(w) => (w.as_ref() as &dyn Any).downcast_ref(),
            Behavior::Container(_) => None,
        }
    }

    /// Mutably borrow a widget as its concrete type.
    ///
    /// Call [`Tree::repaint`] or [`Tree::reflow`] after changing what it draws or
    /// how large it wants to be.
    pub fn widget_mut<W: Widget>(&mut self, id: NodeId) -> Option<&mut W> {
        match self.node_opt_mut(id)?.behavior.as_mut()? {
            Behavior::Widget(w) => (w.as_mut() as &mut dyn Any).downcast_mut(),
            Behavior::Container(_) => None,
        }
    }

    /// Borrow a container as its concrete type.
    pub fn container<C: Container>(&self, id: NodeId) -> Option<&C> {
        match self.node_opt(id)?.behavior.as_ref()? {
            Behavior::Container(c) => (c.as_ref() as &dyn Any).downcast_ref(),
            Behavior::Widget(_) => None,
        }
    }

    /// Mutably borrow a container as its concrete type.
    pub fn container_mut<C: Container>(&mut self, id: NodeId) -> Option<&mut C> {
        match self.node_opt_mut(id)?.behavior.as_mut()? {
            Behavior::Container(c) => (c.as_mut() as &mut dyn Any).downcast_mut(),
            Behavior::Widget(_) => None,
        }
    }

    /// Name of the node's hook type, for diagnostics.
    pub(crate) fn type_name(&self, id: NodeId) -> &'static str {
        match self.node(id).behavior.as_ref() {
            Some(Behavior::Container(c)) => c.name(),
            Some(Behavior::Widget(w)) => w.name(),
            None => "<busy>",
        }
    }

    // --- internals ---

    /// Access a node; panics if `id` is stale.
    pub(crate) fn node(&self, id: NodeId) -> &Node {
        self.nodes[id.idx()].as_ref().expect("dangling NodeId")
    }

    /// Access a node mutably; panics if `id` is stale.
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.idx()].as_mut().expect("dangling NodeId")
    }

    pub(crate) fn node_opt(&self, id: NodeId) -> Option<&Node> {
        let n = self.nodes.get(id.idx())?.as_ref()?;
        if n.generation != id.1 {
            return None;
        }
        Some(n)
    }

    pub(crate) fn node_opt_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let n = self.nodes.get_mut(id.idx())?.as_mut()?;
        if n.generation != id.1 {
            return None;
        }
        Some(n)
    }

    fn link(&mut self, parent: NodeId, child: NodeId, before: Option<NodeId>) {
        let prev = match before {
            Some(b) => self.node(b).prev_sibling,
            None => self.node(parent).last_child,
        };
        {
            let n = self.node_mut(child);
            n.parent = Some(parent);
            n.prev_sibling = prev;
            n.next_sibling = before;
        }
        match prev {
            Some(p) => self.node_mut(p).next_sibling = Some(child),
            None => self.node_mut(parent).first_child = Some(child),
        }
        match before {
            Some(b) => self.node_mut(b).prev_sibling = Some(child),
            None => self.node_mut(parent).last_child = Some(child),
        }
    }

    /// Unlink from the sibling list only; returns the former next sibling.
    fn unlink(&mut self, child: NodeId, parent: NodeId) -> Option<NodeId> {
        let (prev, next) = {
            let n = self.node_mut(child);
            n.parent = None;
            (n.prev_sibling.take(), n.next_sibling.take())
        };
        match prev {
            Some(p) => self.node_mut(p).next_sibling = next,
            None => self.node_mut(parent).first_child = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev_sibling = prev,
            None => self.node_mut(parent).last_child = prev,
        }
        next
    }

    /// Detach with notifications but without collecting unreferenced nodes.
    fn unlink_from_parent(&mut self, child: NodeId) -> Option<(NodeId, Option<NodeId>)> {
        let parent = self.node_opt(child)?.parent?;
        self.reflow(parent);
        // The vacated footprint has to be redrawn even if the parent keeps its size.
        self.repaint(parent);
        let next = self.unlink_notified(child, parent);
        Some((parent, next))
    }

    /// Unlink `child` and run the detach notifications, leaving `parent`'s state alone.
    fn unlink_notified(&mut self, child: NodeId, parent: NodeId) -> Option<NodeId> {
        if let Some(Behavior::Container(c)) = &mut self.node_mut(parent).behavior {
            c.on_child_detached(child);
        }
        let next = self.unlink(child, parent);
        self.notify_mount(child, MountEvent::Dismounted { parent });
        next
    }

    /// Free a detached node, its components, and its lifetime-sharing children.
    ///
    /// Drop hooks run first, while the node is still intact.
    fn destroy(&mut self, id: NodeId) {
        debug_assert!(
            self.node(id).parent.is_none(),
            "destroying an attached node"
        );
        self.notify_drop(id);
        while let Some(child) = self.node(id).first_child {
            if self
                .node(child)
                .lifetime
                .contains(LifetimeFlags::SHARES_PARENT_LIFETIME)
            {
                self.unlink_notified(child, id);
                self.destroy(child);
            } else {
                self.detach(child);
            }
        }
        if let Some(head) = self.node(id).first_component {
            self.components.release_chain(head);
        }
        self.labels.remove(&id);
        self.nodes[id.idx()] = None;
        self.free_list.push(id.idx());
    }
}

/// Iterator over the children of a node, created by [`Tree::children`].
#[derive(Clone, Debug)]
pub struct Children<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.node(current).next_sibling;
        Some(current)
    }
}
