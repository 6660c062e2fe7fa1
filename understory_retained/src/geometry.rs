// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Helpers over Kurbo's geometry types.
//!
//! Areas are axis-aligned [`Rect`]s relative to the parent node; an area with no
//! width or no height is *empty* and is a normal, checkable value rather than an
//! error. Constraints are plain [`Size`]s.

use kurbo::{Point, Rect, Size};

/// Constraints of a node that has not been offered any space yet.
pub const UNBOUNDED: Size = Size::new(f64::MAX, f64::MAX);

/// Returns `true` if `rect` covers no area.
///
/// Intersections of disjoint rectangles produce such rectangles, so this is the
/// check used everywhere a clip might have vanished.
#[inline]
pub fn is_empty(rect: Rect) -> bool {
    !(rect.width() > 0.0 && rect.height() > 0.0)
}

/// Returns `true` if `inner` lies completely within `outer`.
#[inline]
pub fn contains_rect(outer: Rect, inner: Rect) -> bool {
    inner.x0 >= outer.x0 && inner.y0 >= outer.y0 && inner.x1 <= outer.x1 && inner.y1 <= outer.y1
}

/// Returns `true` if `a` and `b` share some area.
#[inline]
pub fn overlaps(a: Rect, b: Rect) -> bool {
    !is_empty(a.intersect(b))
}

/// Component-wise minimum of `size` and `max`.
#[inline]
pub fn clamp_size(size: Size, max: Size) -> Size {
    Size::new(size.width.min(max.width), size.height.min(max.height))
}

/// The display rectangle of a surface with the given resolution.
#[inline]
pub fn display_rect(resolution: Size) -> Rect {
    Rect::from_origin_size(Point::ORIGIN, resolution)
}

/// Number of whole pixels needed to cover `extent`.
#[inline]
pub(crate) fn pixel_span(extent: f64) -> usize {
    if extent <= 0.0 {
        return 0;
    }
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Display extents are far below usize::MAX; the remainder is rounded up below."
    )]
    let whole = extent as usize;
    if (whole as f64) < extent {
        whole + 1
    } else {
        whole
    }
}
