// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hook traits for leaves and containers, and the contexts passed to them.

use core::any::Any;

use kurbo::{Point, Rect, Size};

use crate::canvas::Canvas;
use crate::geometry::clamp_size;
use crate::surface::Surface;
use crate::tree::{Children, Tree};
use crate::types::NodeId;

/// A leaf node: measures itself and draws.
///
/// Every method has a default, so a unit struct with `impl Widget for Dot {}`
/// is a valid, invisible, zero-sized widget.
pub trait Widget: Any {
    /// The size this widget would like, within `cx.constraints()`.
    ///
    /// The tree clamps the answer to the constraints, so widgets may ignore them.
    fn preferred_size(&self, cx: &mut MeasureCx<'_>) -> Size {
        let _ = cx;
        Size::ZERO
    }

    /// Draw the widget. The canvas origin is the widget's top-left corner.
    fn paint(&self, canvas: &mut Canvas<'_>) {
        let _ = canvas;
    }

    /// Whether the widget actually covers any of `area` (local coordinates).
    ///
    /// Used by [`Tree::collides`]; non-rectangular widgets can refine it.
    fn collides(&self, area: Rect) -> bool {
        let _ = area;
        true
    }

    /// Name shown in diagnostics.
    fn name(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

/// A node with children: positions and sizes them during layout.
///
/// Layout of a container runs in three steps. [`on_layout_begin`] is called on
/// entry, [`on_layout_constrain`] once per child before the child is measured,
/// and [`on_layout_end`] after all children have their sizes. Children are
/// positioned with [`LayoutCx::set_child_position`].
///
/// [`on_layout_begin`]: Container::on_layout_begin
/// [`on_layout_constrain`]: Container::on_layout_constrain
/// [`on_layout_end`]: Container::on_layout_end
pub trait Container: Any {
    /// `child` was linked into this container.
    fn on_child_attached(&mut self, child: NodeId) {
        let _ = child;
    }

    /// `child` is about to be unlinked from this container.
    fn on_child_detached(&mut self, child: NodeId) {
        let _ = child;
    }

    /// Layout of this container starts.
    fn on_layout_begin(&mut self, cx: &mut LayoutCx<'_>) {
        let _ = cx;
    }

    /// Returns the constraints offered to `child`.
    fn on_layout_constrain(&mut self, cx: &mut LayoutCx<'_>, child: NodeId) -> Size {
        let _ = child;
        cx.constraints()
    }

    /// Layout of this container ends; returns its size.
    ///
    /// The default covers the extent of all children.
    fn on_layout_end(&mut self, cx: &mut LayoutCx<'_>) -> Size {
        cx.children_extent()
    }

    /// Name shown in diagnostics.
    fn name(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

/// A container that leaves its children where they are.
///
/// Children keep whatever position they were given; the group grows to cover
/// them.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Group;

impl Container for Group {}

/// Context passed to [`Container`] layout hooks.
pub struct LayoutCx<'a> {
    pub(crate) tree: &'a mut Tree,
    pub(crate) node: NodeId,
    pub(crate) surface: &'a mut dyn Surface,
}

impl core::fmt::Debug for LayoutCx<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LayoutCx")
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}

impl LayoutCx<'_> {
    /// The container being laid out.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Constraints offered to the container.
    pub fn constraints(&self) -> Size {
        self.tree.node(self.node).constraints
    }

    /// Current area of the container, relative to its parent.
    pub fn area(&self) -> Rect {
        self.tree.node(self.node).area
    }

    /// The container's children, in order.
    pub fn children(&self) -> Children<'_> {
        self.tree.children(self.node)
    }

    /// Area of a child. Sizes are final once [`Container::on_layout_end`] runs.
    pub fn child_area(&self, child: NodeId) -> Rect {
        self.tree.area(child).unwrap_or(Rect::ZERO)
    }

    /// Move a child; returns `true` if its position changed.
    pub fn set_child_position(&mut self, child: NodeId, position: Point) -> bool {
        debug_assert_eq!(
            self.tree.parent_of(child),
            Some(self.node),
            "only children can be positioned"
        );
        self.tree.set_position(child, position)
    }

    /// Read-only view of the whole tree.
    pub fn tree(&self) -> &Tree {
        &*self.tree
    }

    /// The full display extent.
    pub fn resolution(&self) -> Size {
        self.surface.resolution()
    }

    /// The extent `text` occupies when drawn.
    pub fn string_bounds(&mut self, text: &str) -> Size {
        self.surface.string_bounds(text)
    }

    /// Bottom-right corner of the furthest child, clamped to the constraints.
    pub fn children_extent(&self) -> Size {
        let extent = self
            .children()
            .map(|c| self.child_area(c))
            .fold(Size::ZERO, |acc, area| {
                Size::new(acc.width.max(area.x1), acc.height.max(area.y1))
            });
        clamp_size(extent, self.constraints())
    }
}

/// Context passed to [`Widget::preferred_size`].
pub struct MeasureCx<'a> {
    pub(crate) constraints: Size,
    pub(crate) surface: &'a mut dyn Surface,
}

impl core::fmt::Debug for MeasureCx<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MeasureCx")
            .field("constraints", &self.constraints)
            .finish_non_exhaustive()
    }
}

impl MeasureCx<'_> {
    /// Maximum size the parent offers.
    pub fn constraints(&self) -> Size {
        self.constraints
    }

    /// The full display extent.
    pub fn resolution(&self) -> Size {
        self.surface.resolution()
    }

    /// The extent `text` occupies when drawn.
    pub fn string_bounds(&mut self, text: &str) -> Size {
        self.surface.string_bounds(text)
    }
}
