// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Components: small behavior objects chained off a node.
//!
//! Each node heads a chain of components sorted by [`ComponentType`], holding
//! one entry per distinct type (the *stranger* chain). Further components of a
//! type already present join that entry's *sibling* ring instead, so lookups
//! cost one step per distinct type. A one-word bloom filter on the node rejects
//! most misses without touching the chain.
//!
//! Components are stored in an arena owned by the [`Tree`] and addressed by
//! [`ComponentId`]. They live exactly as long as their owner.

use alloc::{boxed::Box, vec::Vec};
use core::any::Any;
use core::cmp::Ordering;

use smallvec::SmallVec;

use crate::tree::Tree;
use crate::types::{LifetimeFlags, NodeId};

/// Numeric identifier of a component family.
///
/// Identifiers below [`ComponentType::USER`] are reserved for the families
/// defined by this crate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentType(pub u16);

impl ComponentType {
    /// [`MountHook`].
    pub const MOUNT: Self = Self(1);
    /// [`Managed`].
    pub const MANAGED: Self = Self(2);
    /// [`AnimationHook`](crate::AnimationHook).
    pub const ANIMATION: Self = Self(3);
    /// [`InputHook`](crate::InputHook).
    pub const INPUT: Self = Self(4);
    /// [`DropHook`].
    pub const DROP: Self = Self(5);
    /// First identifier available to other crates.
    pub const USER: Self = Self(0x100);
}

/// A value that can be attached to a node with [`Tree::attach_component`].
pub trait Component: Any {
    /// Family of this component; all values of one Rust type share it.
    const TYPE: ComponentType;
}

/// Identifier of an attached component (generational).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ComponentId(pub(crate) u32, pub(crate) u32);

impl ComponentId {
    const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Two-hash bloom filter over the component types attached to one node.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct ComponentFilter(u32);

impl ComponentFilter {
    const BITS: u16 = 32;

    fn hash(ty: ComponentType) -> u32 {
        let id = ty.0;
        let first = id % Self::BITS;
        let second = ((id & 0xFF) ^ (id >> 8)) % Self::BITS;
        (1_u32 << first) | (1_u32 << second)
    }

    pub(crate) fn insert(&mut self, ty: ComponentType) {
        self.0 |= Self::hash(ty);
    }

    /// `false` means the type is certainly absent.
    pub(crate) fn may_contain(self, ty: ComponentType) -> bool {
        let hash = Self::hash(ty);
        self.0 & hash == hash
    }
}

struct Entry {
    generation: u32,
    ty: ComponentType,
    owner: NodeId,
    next_stranger: Option<ComponentId>,
    next_sibling: Option<ComponentId>,
    /// `None` only while a hook stored in it runs.
    payload: Option<Box<dyn Any>>,
}

#[derive(Default)]
pub(crate) struct ComponentStore {
    entries: Vec<Option<Entry>>,
    generations: Vec<u32>,
    free_list: Vec<usize>,
}

impl core::fmt::Debug for ComponentStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let alive = self.entries.iter().filter(|e| e.is_some()).count();
        f.debug_struct("ComponentStore")
            .field("alive", &alive)
            .field("free_list", &self.free_list.len())
            .finish_non_exhaustive()
    }
}

impl ComponentStore {
    fn alloc(&mut self, ty: ComponentType, owner: NodeId, payload: Box<dyn Any>) -> ComponentId {
        let make = |generation| Entry {
            generation,
            ty,
            owner,
            next_stranger: None,
            next_sibling: None,
            payload: Some(payload),
        };
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.entries[idx] = Some(make(generation));
            (idx, generation)
        } else {
            self.entries.push(Some(make(1)));
            self.generations.push(1);
            (self.entries.len() - 1, 1)
        };
        #[allow(
            clippy::cast_possible_truncation,
            reason = "ComponentId uses 32-bit indices, like NodeId."
        )]
        ComponentId(idx as u32, generation)
    }

    fn get(&self, id: ComponentId) -> Option<&Entry> {
        self.entries
            .get(id.idx())?
            .as_ref()
            .filter(|e| e.generation == id.1)
    }

    fn get_mut(&mut self, id: ComponentId) -> Option<&mut Entry> {
        self.entries
            .get_mut(id.idx())?
            .as_mut()
            .filter(|e| e.generation == id.1)
    }

    fn entry(&self, id: ComponentId) -> &Entry {
        self.get(id).expect("dangling ComponentId")
    }

    fn entry_mut(&mut self, id: ComponentId) -> &mut Entry {
        self.get_mut(id).expect("dangling ComponentId")
    }

    /// Link `new` into the sibling ring of `head`.
    fn link_sibling(&mut self, head: ComponentId, new: ComponentId) {
        let after = self.entry(head).next_sibling.unwrap_or(head);
        self.entry_mut(new).next_sibling = Some(after);
        self.entry_mut(head).next_sibling = Some(new);
    }

    /// Free every component reachable from a node's chain head.
    pub(crate) fn release_chain(&mut self, head: ComponentId) {
        let mut stranger = Some(head);
        while let Some(first) = stranger {
            stranger = self.entry(first).next_stranger;
            let mut sibling = Some(first);
            while let Some(id) = sibling {
                sibling = self.entry(id).next_sibling.filter(|&next| next != first);
                self.entries[id.idx()] = None;
                self.free_list.push(id.idx());
            }
        }
    }

    pub(crate) fn payload(&self, id: ComponentId) -> Option<&dyn Any> {
        self.get(id)?.payload.as_deref()
    }

    pub(crate) fn payload_mut(&mut self, id: ComponentId) -> Option<&mut dyn Any> {
        self.get_mut(id)?.payload.as_deref_mut()
    }
}

impl Tree {
    /// Attach `component` to `owner` and return its id.
    ///
    /// The component is sorted into the owner's chain by type; a second
    /// component of an existing type joins that type's sibling ring.
    /// Panics if `owner` is stale.
    pub fn attach_component<C: Component>(&mut self, owner: NodeId, component: C) -> ComponentId {
        let ty = C::TYPE;
        let head = {
            let n = self.node_mut(owner);
            n.component_filter.insert(ty);
            n.first_component
        };
        let id = self.components.alloc(ty, owner, Box::new(component));

        let Some(head) = head else {
            self.node_mut(owner).first_component = Some(id);
            return id;
        };
        if ty < self.components.entry(head).ty {
            self.components.entry_mut(id).next_stranger = Some(head);
            self.node_mut(owner).first_component = Some(id);
            return id;
        }
        let mut prev = head;
        loop {
            let (prev_ty, next_stranger) = {
                let entry = self.components.entry(prev);
                (entry.ty, entry.next_stranger)
            };
            if prev_ty == ty {
                self.components.link_sibling(prev, id);
                return id;
            }
            match next_stranger {
                Some(next) if self.components.entry(next).ty <= ty => prev = next,
                next => {
                    self.components.entry_mut(id).next_stranger = next;
                    self.components.entry_mut(prev).next_stranger = Some(id);
                    return id;
                }
            }
        }
    }

    /// Find the first component of type `ty` on `owner`.
    ///
    /// The bloom filter answers most misses; otherwise the sorted chain is walked
    /// until a greater type shows up.
    pub fn find_component(&self, owner: NodeId, ty: ComponentType) -> Option<ComponentId> {
        let n = self.node_opt(owner)?;
        if !n.component_filter.may_contain(ty) {
            return None;
        }
        let mut current = n.first_component;
        while let Some(id) = current {
            let entry = self.components.entry(id);
            match entry.ty.cmp(&ty) {
                Ordering::Less => current = entry.next_stranger,
                Ordering::Equal => return Some(id),
                Ordering::Greater => return None,
            }
        }
        None
    }

    /// Returns `false` if the bloom filter rules out a component of type `ty` on `owner`.
    pub fn may_have_component(&self, owner: NodeId, ty: ComponentType) -> bool {
        self.node_opt(owner)
            .is_some_and(|n| n.component_filter.may_contain(ty))
    }

    /// Borrow the first component of type `C` on `owner`.
    pub fn component<C: Component>(&self, owner: NodeId) -> Option<&C> {
        let id = self.find_component(owner, C::TYPE)?;
        self.components.payload(id)?.downcast_ref()
    }

    /// Mutably borrow the first component of type `C` on `owner`.
    pub fn component_mut<C: Component>(&mut self, owner: NodeId) -> Option<&mut C> {
        let id = self.find_component(owner, C::TYPE)?;
        self.components.payload_mut(id)?.downcast_mut()
    }

    /// Every component of type `C` on `owner`.
    pub fn each_component<C: Component>(&self, owner: NodeId) -> impl Iterator<Item = &C> + '_ {
        self.find_component(owner, C::TYPE)
            .into_iter()
            .flat_map(|head| self.component_siblings(head))
            .filter_map(|id| self.components.payload(id)?.downcast_ref())
    }

    /// One component per distinct type on `owner`, in ascending type order.
    pub fn components(&self, owner: NodeId) -> Strangers<'_> {
        Strangers {
            tree: self,
            next: self.node_opt(owner).and_then(|n| n.first_component),
        }
    }

    /// All components sharing the type and owner of `id`, starting with `id`.
    pub fn component_siblings(&self, id: ComponentId) -> Siblings<'_> {
        Siblings {
            tree: self,
            start: id,
            next: self.components.get(id).map(|_| id),
        }
    }

    /// Type of a live component.
    pub fn component_type(&self, id: ComponentId) -> Option<ComponentType> {
        self.components.get(id).map(|e| e.ty)
    }

    /// Owner of a live component.
    pub fn component_owner(&self, id: ComponentId) -> Option<NodeId> {
        self.components.get(id).map(|e| e.owner)
    }

    /// Run `f` on a component while granting it mutable access to the tree.
    ///
    /// The component is moved out of its slot for the duration of the call and
    /// put back afterwards, unless `f` removed its owner.
    pub(crate) fn with_component<C: Component, R>(
        &mut self,
        id: ComponentId,
        f: impl FnOnce(&mut C, &mut Self) -> R,
    ) -> Option<R> {
        let mut payload = self.components.get_mut(id)?.payload.take()?;
        let result = payload.downcast_mut::<C>().map(|c| f(c, self));
        if let Some(entry) = self.components.get_mut(id) {
            entry.payload = Some(payload);
        }
        result
    }

    /// Ids of all components of type `ty` on `owner`.
    pub(crate) fn collect_components(
        &self,
        owner: NodeId,
        ty: ComponentType,
    ) -> SmallVec<[ComponentId; 4]> {
        self.find_component(owner, ty)
            .map(|head| self.component_siblings(head).collect())
            .unwrap_or_default()
    }

    pub(crate) fn notify_mount(&mut self, child: NodeId, event: MountEvent) {
        for id in self.collect_components(child, ComponentType::MOUNT) {
            if let Some(hook) = self
                .components
                .payload_mut(id)
                .and_then(|p| p.downcast_mut::<MountHook>())
            {
                (hook.callback)(child, event);
            }
        }
    }

    /// Run the owner's drop hooks; the node and its components are still intact.
    pub(crate) fn notify_drop(&mut self, id: NodeId) {
        for hook in self.collect_components(id, ComponentType::DROP) {
            if let Some(hook) = self
                .components
                .payload_mut(hook)
                .and_then(|p| p.downcast_mut::<DropHook>())
            {
                (hook.callback)(id);
            }
        }
    }

    /// Take a counted reference to `id`, making its lifetime managed.
    ///
    /// While any [`NodeRef`] is outstanding the node behaves normally. Once the
    /// last one is passed to [`Tree::release`] the node is destroyed, either
    /// immediately if it has no parent or when it is next detached.
    pub fn manage(&mut self, id: NodeId) -> Option<NodeRef> {
        if !self.is_alive(id) {
            return None;
        }
        debug_assert!(
            !self
                .node(id)
                .lifetime
                .contains(LifetimeFlags::UNREFERENCED),
            "node was already released"
        );
        if let Some(managed) = self.component_mut::<Managed>(id) {
            managed.refs += 1;
        } else {
            self.node_mut(id).lifetime.insert(LifetimeFlags::MANAGED);
            self.attach_component(id, Managed { refs: 1 });
        }
        Some(NodeRef(id))
    }

    /// Drop a reference taken with [`Tree::manage`].
    pub fn release(&mut self, reference: NodeRef) {
        let id = reference.0;
        let Some(managed) = self.component_mut::<Managed>(id) else {
            return;
        };
        managed.refs = managed.refs.saturating_sub(1);
        if managed.refs > 0 {
            return;
        }
        self.node_mut(id)
            .lifetime
            .insert(LifetimeFlags::UNREFERENCED);
        if !self.is_attached(id) {
            self.remove(id);
        }
    }
}

/// Iterator over a node's stranger chain, created by [`Tree::components`].
#[derive(Clone, Debug)]
pub struct Strangers<'a> {
    tree: &'a Tree,
    next: Option<ComponentId>,
}

impl Iterator for Strangers<'_> {
    type Item = ComponentId;

    fn next(&mut self) -> Option<ComponentId> {
        let current = self.next?;
        self.next = self.tree.components.entry(current).next_stranger;
        Some(current)
    }
}

/// Iterator over a sibling ring, created by [`Tree::component_siblings`].
#[derive(Clone, Debug)]
pub struct Siblings<'a> {
    tree: &'a Tree,
    start: ComponentId,
    next: Option<ComponentId>,
}

impl Iterator for Siblings<'_> {
    type Item = ComponentId;

    fn next(&mut self) -> Option<ComponentId> {
        let current = self.next?;
        self.next = self
            .tree
            .components
            .entry(current)
            .next_sibling
            .filter(|&next| next != self.start);
        Some(current)
    }
}

/// Notification passed to a [`MountHook`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MountEvent {
    /// The owner is about to be linked under `parent`.
    Mounted {
        /// New parent.
        parent: NodeId,
    },
    /// The owner was unlinked from `parent`.
    Dismounted {
        /// Former parent.
        parent: NodeId,
    },
}

/// Called with the owner whenever it is attached to or detached from a parent.
pub struct MountHook {
    callback: Box<dyn FnMut(NodeId, MountEvent)>,
}

impl MountHook {
    /// Wrap a callback.
    pub fn new(callback: impl FnMut(NodeId, MountEvent) + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }
}

impl core::fmt::Debug for MountHook {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MountHook").finish_non_exhaustive()
    }
}

impl Component for MountHook {
    const TYPE: ComponentType = ComponentType::MOUNT;
}

/// Called with the owner right before it is destroyed.
pub struct DropHook {
    callback: Box<dyn FnMut(NodeId)>,
}

impl DropHook {
    /// Wrap a callback.
    pub fn new(callback: impl FnMut(NodeId) + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }
}

impl core::fmt::Debug for DropHook {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DropHook").finish_non_exhaustive()
    }
}

impl Component for DropHook {
    const TYPE: ComponentType = ComponentType::DROP;
}

/// Reference count of a node whose lifetime is managed through [`NodeRef`]s.
#[derive(Debug)]
pub struct Managed {
    refs: usize,
}

impl Managed {
    /// Number of outstanding [`NodeRef`]s.
    pub fn refs(&self) -> usize {
        self.refs
    }
}

impl Component for Managed {
    const TYPE: ComponentType = ComponentType::MANAGED;
}

/// A counted reference to a managed node, created by [`Tree::manage`].
///
/// References must be handed back to [`Tree::release`]; dropping one leaks a
/// count and keeps the node alive.
#[must_use = "pass the reference to Tree::release, or the node is never collected"]
#[derive(Debug, PartialEq, Eq)]
pub struct NodeRef(NodeId);

impl NodeRef {
    /// The referenced node.
    pub fn id(&self) -> NodeId {
        self.0
    }
}
