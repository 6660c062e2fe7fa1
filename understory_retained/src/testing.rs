// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Test doubles shared by the unit tests.

use alloc::vec::Vec;
use core::mem;

use kurbo::{Point, Rect, Size, Vec2};

use crate::canvas::Canvas;
use crate::geometry::is_empty;
use crate::surface::{Color, Paint, Surface, split_rows};
use crate::widget::{MeasureCx, Widget};

/// A surface that records what would have been drawn.
#[derive(Debug)]
pub(crate) struct RecordingSurface {
    pub(crate) resolution: Size,
    /// Buffer size in pixels; `None` takes every area in one window.
    pub(crate) capacity: Option<usize>,
    /// Widen windows to full display rows in pages of eight, like paged panels.
    pub(crate) full_rows: bool,
    /// Reported once by [`Surface::changed`].
    pub(crate) changed: bool,
    translation: Vec2,
    clip: Rect,
    /// Display-space bounds of every draw call, clipped to the active view.
    pub(crate) draws: Vec<Rect>,
    pub(crate) begins: Vec<Rect>,
    pub(crate) flushes: usize,
}

impl RecordingSurface {
    pub(crate) fn new(resolution: Size) -> Self {
        Self {
            resolution,
            capacity: None,
            full_rows: false,
            changed: false,
            translation: Vec2::ZERO,
            clip: Rect::ZERO,
            draws: Vec::new(),
            begins: Vec::new(),
            flushes: 0,
        }
    }

    /// Forget everything recorded so far.
    pub(crate) fn clear(&mut self) {
        self.draws.clear();
        self.begins.clear();
        self.flushes = 0;
    }

    fn record(&mut self, local: Rect) {
        let bounds = (local + self.translation).intersect(self.clip);
        if !is_empty(bounds) {
            self.draws.push(bounds);
        }
    }
}

impl Surface for RecordingSurface {
    fn changed(&mut self) -> bool {
        mem::take(&mut self.changed)
    }

    fn resolution(&self) -> Size {
        self.resolution
    }

    fn begin(&mut self, window: Rect) {
        self.begins.push(window);
    }

    fn flush(&mut self) {
        self.flushes += 1;
    }

    fn split(&self, area: &mut Rect) -> Rect {
        let window = match self.capacity {
            Some(capacity) => split_rows(area, capacity),
            None => mem::replace(area, Rect::ZERO),
        };
        if !self.full_rows {
            return window;
        }
        Rect::new(
            0.0,
            (window.y0 / 8.0).floor() * 8.0,
            self.resolution.width,
            ((window.y1 / 8.0).ceil() * 8.0).min(self.resolution.height),
        )
    }

    fn view(&mut self, translation: Vec2, clip: Rect) {
        self.translation = translation;
        self.clip = clip;
    }

    fn draw_point(&mut self, position: Point, _paint: &Paint) {
        self.record(Rect::from_origin_size(position, Size::new(1.0, 1.0)));
    }

    fn draw_line(&mut self, from: Point, to: Point, _paint: &Paint) {
        self.record(Rect::from_points(from, to));
    }

    fn draw_rect(&mut self, rect: Rect, _paint: &Paint) {
        self.record(rect);
    }

    fn draw_circle(&mut self, center: Point, radius: f64, _paint: &Paint) {
        self.record(Rect::from_center_size(
            center,
            Size::new(radius * 2.0, radius * 2.0),
        ));
    }

    fn draw_image(&mut self, area: Rect, _pixels: &[u16]) {
        self.record(area);
    }

    fn draw_bit_image(&mut self, area: Rect, _bits: &[u8], _paint: &Paint) {
        self.record(area);
    }

    fn draw_text(&mut self, position: Point, text: &str, _paint: &Paint) {
        let size = self.string_bounds(text);
        self.record(Rect::from_origin_size(position, size));
    }

    fn string_bounds(&mut self, text: &str) -> Size {
        Size::new(text.len() as f64 * 6.0, 8.0)
    }
}

/// A filled rectangle of a fixed preferred size.
#[derive(Clone, Debug, Default)]
pub(crate) struct Block {
    pub(crate) size: Size,
    pub(crate) color: Color,
}

impl Block {
    pub(crate) fn sized(width: f64, height: f64) -> Self {
        Self {
            size: Size::new(width, height),
            color: Color::WHITE,
        }
    }
}

impl Widget for Block {
    fn preferred_size(&self, _cx: &mut MeasureCx<'_>) -> Size {
        self.size
    }

    fn paint(&self, canvas: &mut Canvas<'_>) {
        canvas.draw_rect(
            Rect::from_origin_size(Point::ORIGIN, self.size),
            &Paint::fill(self.color),
        );
    }
}
