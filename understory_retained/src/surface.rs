// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The drawing backend boundary: [`Surface`], paint parameters, and buffer-window helpers.

use core::mem;

use kurbo::{Point, Rect, Size, Vec2};
use tracing::trace;

use crate::geometry::{is_empty, pixel_span};

/// An 8-bit RGBA color.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel; 255 is opaque.
    pub a: u8,
}

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);

    /// An opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// A color with explicit alpha.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Packs the color as RGB565, the pixel format of [`Surface::draw_image`].
    pub const fn to_rgb565(self) -> u16 {
        ((self.r as u16 >> 3) << 11) | ((self.g as u16 >> 2) << 5) | (self.b as u16 >> 3)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Properties of a single draw call.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Paint {
    /// Color of the stroke or fill.
    pub color: Color,
    /// Fill the shape instead of stroking its outline.
    pub filled: bool,
}

impl Paint {
    /// Outline in `color`.
    pub const fn stroke(color: Color) -> Self {
        Self {
            color,
            filled: false,
        }
    }

    /// Solid fill in `color`.
    pub const fn fill(color: Color) -> Self {
        Self {
            color,
            filled: true,
        }
    }
}

/// A drawing target implemented by backends.
///
/// Paint passes are bracketed by [`begin`](Surface::begin) and
/// [`end`](Surface::end) once per buffer window; [`flush`](Surface::flush) runs
/// once at the end of a pass that drew anything. Draw calls are issued in the
/// coordinate space set by the most recent [`view`](Surface::view).
pub trait Surface {
    /// Returns `true` once after the resolution or orientation changed.
    fn changed(&mut self) -> bool {
        false
    }

    /// The full display extent.
    fn resolution(&self) -> Size;

    /// Starts drawing into `window`, given in display coordinates.
    fn begin(&mut self, window: Rect) {
        let _ = window;
    }

    /// Finishes the window started by [`begin`](Surface::begin).
    fn end(&mut self) {}

    /// Pushes everything drawn so far to the display.
    fn flush(&mut self) {}

    /// Takes a window the backing buffer can hold off the front of `area`.
    ///
    /// Returns the window and leaves the rest in `area`. The window must be
    /// non-empty and the remainder strictly smaller; it may be larger than the
    /// requested region (for instance rounded to whole pages). The default
    /// takes the whole area at once.
    fn split(&self, area: &mut Rect) -> Rect {
        mem::replace(area, Rect::ZERO)
    }

    /// Sets the translation and display-space clip for subsequent draw calls.
    fn view(&mut self, translation: Vec2, clip: Rect);

    /// Draws a single point.
    fn draw_point(&mut self, position: Point, paint: &Paint);

    /// Draws a line between two points.
    fn draw_line(&mut self, from: Point, to: Point, paint: &Paint);

    /// Draws a rectangle.
    fn draw_rect(&mut self, rect: Rect, paint: &Paint);

    /// Draws a circle around `center`.
    fn draw_circle(&mut self, center: Point, radius: f64, paint: &Paint);

    /// Draws row-major RGB565 pixels into `area`.
    fn draw_image(&mut self, area: Rect, pixels: &[u16]);

    /// Draws a 1-bpp image into `area`, see [`bit_at`].
    fn draw_bit_image(&mut self, area: Rect, bits: &[u8], paint: &Paint);

    /// Draws `text` with its top-left corner at `position`.
    fn draw_text(&mut self, position: Point, text: &str, paint: &Paint);

    /// The extent `text` occupies when drawn.
    fn string_bounds(&mut self, text: &str) -> Size;
}

/// Reads a pixel of a 1-bpp image stored in vertical pages of eight rows.
///
/// Byte `(y / 8) * width + x` holds column `x` of page `y / 8`, with bit `y % 8`
/// as the pixel. Out-of-range reads return `false`.
pub fn bit_at(bits: &[u8], width: usize, x: usize, y: usize) -> bool {
    if x >= width {
        return false;
    }
    bits.get((y >> 3) * width + x)
        .is_some_and(|byte| byte & (1 << (y & 7)) != 0)
}

/// Splits a window of at most `capacity` pixels off the top of `area`, row by row.
///
/// Returns an empty window if not even one row fits; [`Tree::paint_partial`]
/// treats that as a broken backend.
///
/// [`Tree::paint_partial`]: crate::Tree::paint_partial
pub fn split_rows(area: &mut Rect, capacity: usize) -> Rect {
    if is_empty(*area) {
        return mem::replace(area, Rect::ZERO);
    }
    let rows = (capacity / pixel_span(area.width())).min(pixel_span(area.height()));
    if rows == 0 {
        return Rect::ZERO;
    }
    let y1 = (area.y0 + rows as f64).min(area.y1);
    let window = Rect::new(area.x0, area.y0, area.x1, y1);
    area.y0 = y1;
    if is_empty(*area) {
        *area = Rect::ZERO;
    }
    window
}

/// Splits a window of at most `capacity` pixels off the left of `area`, column by column.
///
/// Used by backends whose buffer is laid out in columns, such as rotated panels.
pub fn split_columns(area: &mut Rect, capacity: usize) -> Rect {
    if is_empty(*area) {
        return mem::replace(area, Rect::ZERO);
    }
    let columns = (capacity / pixel_span(area.height())).min(pixel_span(area.width()));
    if columns == 0 {
        return Rect::ZERO;
    }
    let x1 = (area.x0 + columns as f64).min(area.x1);
    let window = Rect::new(area.x0, area.y0, x1, area.y1);
    area.x0 = x1;
    if is_empty(*area) {
        *area = Rect::ZERO;
    }
    window
}

/// A surface that draws nothing.
///
/// Reports a 512×512 display and estimates text at five by eight pixels per
/// byte, which is enough to run layout headless.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSurface;

impl Surface for NullSurface {
    fn resolution(&self) -> Size {
        Size::new(512.0, 512.0)
    }

    fn view(&mut self, _translation: Vec2, _clip: Rect) {}

    fn draw_point(&mut self, _position: Point, _paint: &Paint) {}

    fn draw_line(&mut self, _from: Point, _to: Point, _paint: &Paint) {}

    fn draw_rect(&mut self, _rect: Rect, _paint: &Paint) {}

    fn draw_circle(&mut self, _center: Point, _radius: f64, _paint: &Paint) {}

    fn draw_image(&mut self, _area: Rect, _pixels: &[u16]) {}

    fn draw_bit_image(&mut self, _area: Rect, _bits: &[u8], _paint: &Paint) {}

    fn draw_text(&mut self, _position: Point, _text: &str, _paint: &Paint) {}

    fn string_bounds(&mut self, text: &str) -> Size {
        Size::new(text.len() as f64 * 5.0, 8.0)
    }
}

/// Forwards every call to an inner surface and logs it as a `trace` event.
///
/// Events carry the surface's `name` so several traced surfaces can be told
/// apart. Calls to [`Surface::changed`] that report nothing are not logged
/// unless [`log_unchanged`](Self::log_unchanged) is set.
#[derive(Debug)]
pub struct TracingSurface<S> {
    inner: S,
    name: &'static str,
    log_unchanged: bool,
}

impl<S: Surface> TracingSurface<S> {
    /// Wrap `inner`, tagging events with `name`.
    pub fn new(inner: S, name: &'static str) -> Self {
        Self {
            inner,
            name,
            log_unchanged: false,
        }
    }

    /// Also log [`Surface::changed`] calls that return `false`.
    pub fn log_unchanged(mut self) -> Self {
        self.log_unchanged = true;
        self
    }

    /// The wrapped surface.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// The wrapped surface, mutably.
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Unwrap the inner surface.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Surface> Surface for TracingSurface<S> {
    fn changed(&mut self) -> bool {
        let changed = self.inner.changed();
        if changed || self.log_unchanged {
            trace!(surface = self.name, changed, "changed");
        }
        changed
    }

    fn resolution(&self) -> Size {
        self.inner.resolution()
    }

    fn begin(&mut self, window: Rect) {
        trace!(surface = self.name, ?window, "begin");
        self.inner.begin(window);
    }

    fn end(&mut self) {
        trace!(surface = self.name, "end");
        self.inner.end();
    }

    fn flush(&mut self) {
        trace!(surface = self.name, "flush");
        self.inner.flush();
    }

    fn split(&self, area: &mut Rect) -> Rect {
        let requested = *area;
        let window = self.inner.split(area);
        trace!(surface = self.name, ?requested, ?window, remaining = ?*area, "split");
        window
    }

    fn view(&mut self, translation: Vec2, clip: Rect) {
        trace!(surface = self.name, ?translation, ?clip, "view");
        self.inner.view(translation, clip);
    }

    fn draw_point(&mut self, position: Point, paint: &Paint) {
        trace!(surface = self.name, ?position, ?paint, "draw_point");
        self.inner.draw_point(position, paint);
    }

    fn draw_line(&mut self, from: Point, to: Point, paint: &Paint) {
        trace!(surface = self.name, ?from, ?to, ?paint, "draw_line");
        self.inner.draw_line(from, to, paint);
    }

    fn draw_rect(&mut self, rect: Rect, paint: &Paint) {
        trace!(surface = self.name, ?rect, ?paint, "draw_rect");
        self.inner.draw_rect(rect, paint);
    }

    fn draw_circle(&mut self, center: Point, radius: f64, paint: &Paint) {
        trace!(surface = self.name, ?center, radius, ?paint, "draw_circle");
        self.inner.draw_circle(center, radius, paint);
    }

    fn draw_image(&mut self, area: Rect, pixels: &[u16]) {
        trace!(surface = self.name, ?area, pixels = pixels.len(), "draw_image");
        self.inner.draw_image(area, pixels);
    }

    fn draw_bit_image(&mut self, area: Rect, bits: &[u8], paint: &Paint) {
        trace!(surface = self.name, ?area, bytes = bits.len(), ?paint, "draw_bit_image");
        self.inner.draw_bit_image(area, bits, paint);
    }

    fn draw_text(&mut self, position: Point, text: &str, paint: &Paint) {
        trace!(surface = self.name, ?position, text, ?paint, "draw_text");
        self.inner.draw_text(position, text, paint);
    }

    fn string_bounds(&mut self, text: &str) -> Size {
        self.inner.string_bounds(text)
    }
}
