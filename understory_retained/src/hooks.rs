// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Animation and input hooks, and the drivers that call them.

use alloc::boxed::Box;
use core::time::Duration;

use smallvec::SmallVec;
use tracing::trace;

use crate::component::{Component, ComponentId, ComponentType};
use crate::tree::Tree;
use crate::types::NodeId;

/// Upper bound on the delay [`Tree::animate`] reports.
pub const MAX_ANIMATION_DELAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Input delivered to [`InputHook`]s by [`Tree::dispatch_input`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum InputEvent {
    /// The node was activated.
    Select,
    /// The node gained focus.
    Focus,
    /// The node lost focus.
    Unfocus,
}

/// Advances an animation on its owner.
///
/// Receives the tree, the owner, and the time elapsed since the previous call,
/// and returns how long the animation can wait before it needs to run again.
pub struct AnimationHook {
    callback: Box<dyn FnMut(&mut Tree, NodeId, Duration) -> Duration>,
}

impl AnimationHook {
    /// Wrap a callback.
    pub fn new(callback: impl FnMut(&mut Tree, NodeId, Duration) -> Duration + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }
}

impl core::fmt::Debug for AnimationHook {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AnimationHook").finish_non_exhaustive()
    }
}

impl Component for AnimationHook {
    const TYPE: ComponentType = ComponentType::ANIMATION;
}

/// Handles input on its owner; returns `true` to stop propagation to the parent.
pub struct InputHook {
    callback: Box<dyn FnMut(&mut Tree, NodeId, InputEvent) -> bool>,
}

impl InputHook {
    /// Wrap a callback.
    pub fn new(callback: impl FnMut(&mut Tree, NodeId, InputEvent) -> bool + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }
}

impl core::fmt::Debug for InputHook {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InputHook").finish_non_exhaustive()
    }
}

impl Component for InputHook {
    const TYPE: ComponentType = ComponentType::INPUT;
}

impl Tree {
    /// Run every [`AnimationHook`] in the subtree at `root`.
    ///
    /// Returns the shortest delay any hook asked for, capped at
    /// [`MAX_ANIMATION_DELAY`]; the caller should call again after at most that
    /// long. Hooks typically mutate their widget and call [`Tree::repaint`].
    pub fn animate(&mut self, root: NodeId, elapsed: Duration) -> Duration {
        let hooks: SmallVec<[ComponentId; 8]> = self
            .descendants(root)
            .flat_map(|node| self.collect_components(node, ComponentType::ANIMATION))
            .collect();
        trace!(hooks = hooks.len(), ?elapsed, "animate");
        let mut next = MAX_ANIMATION_DELAY;
        for id in hooks {
            let Some(owner) = self.component_owner(id) else {
                continue;
            };
            if let Some(delay) = self.with_component(id, |hook: &mut AnimationHook, tree| {
                (hook.callback)(tree, owner, elapsed)
            }) {
                next = next.min(delay);
            }
        }
        next
    }

    /// Deliver `event` to `target`, bubbling to its ancestors until a hook consumes it.
    ///
    /// Returns `true` if some [`InputHook`] consumed the event.
    pub fn dispatch_input(&mut self, target: NodeId, event: InputEvent) -> bool {
        let mut current = self.is_alive(target).then_some(target);
        while let Some(node) = current {
            for id in self.collect_components(node, ComponentType::INPUT) {
                let consumed = self
                    .with_component(id, |hook: &mut InputHook, tree| {
                        (hook.callback)(tree, node, event)
                    })
                    .unwrap_or(false);
                if consumed {
                    trace!(?node, ?event, "input consumed");
                    return true;
                }
            }
            current = self.parent_of(node);
        }
        false
    }
}
