// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Widget-facing drawing handle with scoped clip and translation.

use core::ops::{Deref, DerefMut};

use kurbo::{Point, Rect, Size, Vec2};

use crate::surface::{Paint, Surface};

/// Drawing handle passed to [`Widget::paint`](crate::Widget::paint).
///
/// Coordinates are local to the widget: the origin is its top-left corner.
/// The clip is in display space and already accounts for every ancestor.
pub struct Canvas<'s> {
    surface: &'s mut dyn Surface,
    translation: Vec2,
    clip: Rect,
}

impl core::fmt::Debug for Canvas<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Canvas")
            .field("translation", &self.translation)
            .field("clip", &self.clip)
            .finish_non_exhaustive()
    }
}

impl<'s> Canvas<'s> {
    /// Creates a canvas and applies its view to `surface`.
    pub fn new(surface: &'s mut dyn Surface, translation: Vec2, clip: Rect) -> Self {
        surface.view(translation, clip);
        Self {
            surface,
            translation,
            clip,
        }
    }

    /// Offset from local coordinates to display coordinates.
    pub fn translation(&self) -> Vec2 {
        self.translation
    }

    /// Visible area in display coordinates.
    pub fn clip(&self) -> Rect {
        self.clip
    }

    /// Visible area in local coordinates.
    pub fn region(&self) -> Rect {
        self.clip - self.translation
    }

    /// Size of the visible area.
    pub fn size(&self) -> Size {
        self.clip.size()
    }

    /// Narrows drawing to `clip` (local coordinates) and shifts the origin by `translation`.
    ///
    /// The previous view is restored when the returned scope is dropped, on every
    /// exit path.
    pub fn push(&mut self, clip: Rect, translation: Vec2) -> CanvasScope<'_, 's> {
        let saved_translation = self.translation;
        let saved_clip = self.clip;
        self.clip = self.clip.intersect(clip + self.translation);
        self.translation += translation;
        self.surface.view(self.translation, self.clip);
        CanvasScope {
            canvas: self,
            saved_translation,
            saved_clip,
        }
    }

    /// The full display extent.
    pub fn resolution(&self) -> Size {
        self.surface.resolution()
    }

    /// The extent `text` occupies when drawn.
    pub fn string_bounds(&mut self, text: &str) -> Size {
        self.surface.string_bounds(text)
    }

    /// Draws a single point.
    pub fn draw_point(&mut self, position: Point, paint: &Paint) {
        self.surface.draw_point(position, paint);
    }

    /// Draws a line.
    pub fn draw_line(&mut self, from: Point, to: Point, paint: &Paint) {
        self.surface.draw_line(from, to, paint);
    }

    /// Draws a rectangle.
    pub fn draw_rect(&mut self, rect: Rect, paint: &Paint) {
        self.surface.draw_rect(rect, paint);
    }

    /// Draws a circle.
    pub fn draw_circle(&mut self, center: Point, radius: f64, paint: &Paint) {
        self.surface.draw_circle(center, radius, paint);
    }

    /// Draws RGB565 pixels.
    pub fn draw_image(&mut self, area: Rect, pixels: &[u16]) {
        self.surface.draw_image(area, pixels);
    }

    /// Draws a 1-bpp paged image.
    pub fn draw_bit_image(&mut self, area: Rect, bits: &[u8], paint: &Paint) {
        self.surface.draw_bit_image(area, bits, paint);
    }

    /// Draws text.
    pub fn draw_text(&mut self, position: Point, text: &str, paint: &Paint) {
        self.surface.draw_text(position, text, paint);
    }
}

/// A narrowed view created by [`Canvas::push`]; restores the previous view on drop.
pub struct CanvasScope<'c, 's> {
    canvas: &'c mut Canvas<'s>,
    saved_translation: Vec2,
    saved_clip: Rect,
}

impl core::fmt::Debug for CanvasScope<'_, '_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CanvasScope")
            .field("canvas", &self.canvas)
            .field("saved_translation", &self.saved_translation)
            .field("saved_clip", &self.saved_clip)
            .finish()
    }
}

impl<'s> Deref for CanvasScope<'_, 's> {
    type Target = Canvas<'s>;

    fn deref(&self) -> &Self::Target {
        self.canvas
    }
}

impl DerefMut for CanvasScope<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.canvas
    }
}

impl Drop for CanvasScope<'_, '_> {
    fn drop(&mut self) {
        self.canvas.translation = self.saved_translation;
        self.canvas.clip = self.saved_clip;
        self.canvas
            .surface
            .view(self.saved_translation, self.saved_clip);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSurface;

    #[test]
    fn scope_restores_view_on_drop() {
        let mut surface = RecordingSurface::new(Size::new(100.0, 100.0));
        {
            let mut canvas = Canvas::new(
                &mut surface,
                Vec2::new(10.0, 10.0),
                Rect::new(10.0, 10.0, 60.0, 60.0),
            );
            assert_eq!(
                canvas.region(),
                Rect::new(0.0, 0.0, 50.0, 50.0),
                "local region"
            );
            {
                let mut inner = canvas.push(Rect::new(5.0, 5.0, 100.0, 20.0), Vec2::new(5.0, 5.0));
                assert_eq!(
                    inner.clip(),
                    Rect::new(15.0, 15.0, 60.0, 30.0),
                    "narrowed clip"
                );
                assert_eq!(inner.translation(), Vec2::new(15.0, 15.0), "shifted origin");
                inner.draw_rect(Rect::new(0.0, 0.0, 100.0, 100.0), &Paint::default());
            }
            assert_eq!(
                canvas.clip(),
                Rect::new(10.0, 10.0, 60.0, 60.0),
                "clip restored"
            );
            assert_eq!(
                canvas.translation(),
                Vec2::new(10.0, 10.0),
                "origin restored"
            );
            canvas.draw_rect(Rect::new(0.0, 0.0, 5.0, 5.0), &Paint::default());
        }
        assert_eq!(
            surface.draws,
            [
                Rect::new(15.0, 15.0, 60.0, 30.0),
                Rect::new(10.0, 10.0, 15.0, 15.0),
            ],
            "draws land inside the active view"
        );
    }

    #[test]
    fn nested_scopes_unwind_in_order() {
        let mut surface = RecordingSurface::new(Size::new(100.0, 100.0));
        let mut canvas = Canvas::new(&mut surface, Vec2::ZERO, Rect::new(0.0, 0.0, 100.0, 100.0));
        {
            let mut outer = canvas.push(Rect::new(0.0, 0.0, 50.0, 50.0), Vec2::new(10.0, 0.0));
            {
                let inner = outer.push(Rect::new(0.0, 0.0, 10.0, 10.0), Vec2::new(0.0, 10.0));
                assert_eq!(inner.clip(), Rect::new(10.0, 0.0, 20.0, 10.0), "inner clip");
            }
            assert_eq!(
                outer.clip(),
                Rect::new(0.0, 0.0, 50.0, 50.0),
                "outer clip back"
            );
            assert_eq!(
                outer.translation(),
                Vec2::new(10.0, 0.0),
                "outer origin back"
            );
        }
        assert_eq!(canvas.translation(), Vec2::ZERO, "root origin back");
    }
}
