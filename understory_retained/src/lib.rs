// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Retained: a retained-mode node tree for small displays.
//!
//! Understory Retained keeps a tree of containers and widgets, remembers which
//! parts changed, and redraws only those parts, cut into windows a small frame
//! buffer can hold.
//!
//! - Containers own ordered children and decide their constraints and positions.
//!   Widgets are leaves that measure and draw themselves.
//! - Geometry setters and [`Tree::reflow`] / [`Tree::repaint`] record dirty state
//!   on the node and flag its ancestors, so drivers only walk marked subtrees.
//! - Nodes carry components: small typed objects kept in a per-node chain sorted
//!   by [`ComponentType`], with a one-word bloom filter in front of lookups.
//!
//! ## Frame loop
//!
//! A frame is [`Tree::animate`] (optional), [`Tree::layout`], then
//! [`Tree::paint_partial`]:
//!
//! - Layout runs [`Container::on_layout_begin`], offers each child constraints
//!   through [`Container::on_layout_constrain`], measures widgets with
//!   [`Widget::preferred_size`], and closes each container with
//!   [`Container::on_layout_end`]. Size changes reflow the parent until nothing
//!   moves any more.
//! - Partial repaint visits dirty subtrees with a [`PositionRebuilder`] tracking
//!   absolute clips, asks the [`Surface`] to [`split`](Surface::split) each
//!   dirty region into buffer windows, and paints every window through a
//!   [`Canvas`]. Siblings dirty along two paths are coalesced into one window
//!   when the buffer allows.
//!
//! ## Coordinates
//!
//! Areas are Kurbo [`Rect`](kurbo::Rect)s relative to the parent; roots are
//! placed in display coordinates. A node with an empty area, or one fully outside
//! its ancestors, is simply not drawn. Clips cached by the last paint pass back
//! [`Tree::hit_test`].
//!
//! ## Ownership
//!
//! Detaching keeps a node alive as a root. Children that opted in with
//! [`Tree::set_shares_parent_lifetime`] are removed with their parent.
//! [`Tree::manage`] hands out counted [`NodeRef`]s; releasing the last one
//! collects the node once it has no parent.
//!
//! ## Logging
//!
//! Drivers emit [`tracing`] events: `debug` per frame, `trace` per window and
//! per repeated layout.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod access;
mod canvas;
mod component;
mod geometry;
mod hooks;
mod layout;
mod paint;
mod position;
mod pretty;
mod query;
mod surface;
mod traverse;
mod tree;
mod types;
mod widget;

#[cfg(test)]
mod testing;

pub use canvas::{Canvas, CanvasScope};
pub use component::{
    Component, ComponentId, ComponentType, DropHook, Managed, MountEvent, MountHook, NodeRef,
    Siblings, Strangers,
};
pub use geometry::{UNBOUNDED, clamp_size, contains_rect, display_rect, is_empty, overlaps};
pub use hooks::{AnimationHook, InputEvent, InputHook, MAX_ANIMATION_DELAY};
pub use paint::Damage;
pub use position::{AbsolutePosition, PositionRebuilder};
pub use pretty::Pretty;
pub use surface::{
    Color, NullSurface, Paint, Surface, TracingSurface, bit_at, split_columns, split_rows,
};
pub use traverse::{Ancestors, Cursor, Descendants, PreOrder, Traverse};
pub use tree::{Children, Tree};
pub use types::{LayoutState, LifetimeFlags, NodeId, NodeKind, PaintState, Phase, Visit};
pub use widget::{Container, Group, LayoutCx, MeasureCx, Widget};
