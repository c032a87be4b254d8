// glyphkit/src/outline.rs
//
// Copyright © 2026 The Glyphkit Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Glyph outlines.
//!
//! An outline is stored the way the font formats deliver it: a point array,
//! a parallel tag array, and the end index of each contour. Renderers that
//! prefer path commands can pull the outline through an [`OutlineSink`].

use pathfinder_geometry::line_segment::LineSegment2F;
use pathfinder_geometry::vector::Vector2F;

use crate::error::{Error, FontResult};
use crate::fixed::{BBox, Matrix, Pos, Vector};

bitflags! {
    /// Per-point classification bits.
    pub struct PointTags: u8 {
        /// The point lies on the curve. Off-curve points with neither
        /// `ON_CURVE` nor `CUBIC` set are conic (quadratic) controls.
        const ON_CURVE = 0x01;
        /// The point is a cubic Bézier control. Cubic controls always
        /// occur in pairs.
        const CUBIC = 0x02;
        /// The contour containing this point may overlap others.
        const OVERLAP = 0x04;
        /// The hinter moved this point along the x axis.
        const TOUCHED_X = 0x08;
        /// The hinter moved this point along the y axis.
        const TOUCHED_Y = 0x10;
    }
}

/// Receives path rendering commands from [`Outline::decompose`].
pub trait OutlineSink {
    /// Moves the pen to a point.
    fn move_to(&mut self, to: Vector2F);
    /// Draws a line to a point.
    fn line_to(&mut self, to: Vector2F);
    /// Draws a quadratic Bézier curve to a point.
    fn quadratic_curve_to(&mut self, ctrl: Vector2F, to: Vector2F);
    /// Draws a cubic Bézier curve to a point.
    fn cubic_curve_to(&mut self, ctrl: LineSegment2F, to: Vector2F);
    /// Closes the path, returning to the first point in it.
    fn close(&mut self);
}

/// A glyph vector outline.
#[derive(Clone, Default, Debug)]
pub struct Outline {
    /// Point positions, 26.6 device space after scaling (font units under
    /// `NO_SCALE`).
    pub points: Vec<Vector>,
    /// One tag per point.
    pub tags: Vec<PointTags>,
    /// The index of the last point of each contour, strictly increasing.
    pub contours: Vec<u16>,
}

impl Outline {
    pub fn new() -> Outline {
        Outline::default()
    }

    #[inline]
    pub fn n_points(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn n_contours(&self) -> usize {
        self.contours.len()
    }

    /// Empties the outline, keeping its buffers.
    pub fn clear(&mut self) {
        self.points.clear();
        self.tags.clear();
        self.contours.clear();
    }

    /// Verifies that there is room for `extra_points`/`extra_contours` more
    /// entries under the face's declared budgets.
    pub fn check_room(
        &self,
        extra_points: usize,
        extra_contours: usize,
        max_points: usize,
        max_contours: usize,
    ) -> FontResult<()> {
        if self.points.len() + extra_points > max_points {
            return Err(Error::TooManyPoints);
        }
        if self.contours.len() + extra_contours > max_contours {
            return Err(Error::TooManyContours);
        }
        Ok(())
    }

    /// Appends a point with the given tag.
    pub fn push_point(&mut self, point: Vector, tags: PointTags) {
        self.points.push(point);
        self.tags.push(tags);
    }

    /// Closes the current contour at the last pushed point.
    ///
    /// Fails if the contour would be empty.
    pub fn close_contour(&mut self) -> FontResult<()> {
        let end = self.points.len();
        let start = self.contours.last().map(|&e| e as usize + 1).unwrap_or(0);
        if end == start || end == 0 || end - 1 > u16::max_value() as usize {
            return Err(Error::InvalidOutline);
        }
        self.contours.push((end - 1) as u16);
        Ok(())
    }

    /// Translates every point by `(dx, dy)`.
    pub fn translate(&mut self, dx: Pos, dy: Pos) {
        if dx == 0 && dy == 0 {
            return;
        }
        for point in &mut self.points {
            point.x += dx;
            point.y += dy;
        }
    }

    /// Applies a 16.16 matrix to every point.
    pub fn transform(&mut self, matrix: &Matrix) {
        if matrix.is_identity() {
            return;
        }
        for point in &mut self.points {
            *point = matrix.transform_vector(*point);
        }
    }

    /// Computes the control box: the bounding box of all points, control
    /// points included.
    pub fn control_box(&self) -> BBox {
        let mut points = self.points.iter();
        let first = match points.next() {
            Some(&p) => p,
            None => return BBox::default(),
        };
        let mut bbox = BBox {
            x_min: first.x,
            y_min: first.y,
            x_max: first.x,
            y_max: first.y,
        };
        for point in points {
            bbox.x_min = bbox.x_min.min(point.x);
            bbox.y_min = bbox.y_min.min(point.y);
            bbox.x_max = bbox.x_max.max(point.x);
            bbox.y_max = bbox.y_max.max(point.y);
        }
        bbox
    }

    /// Validates the structural invariants: tag array parallel to the point
    /// array, contour ends strictly increasing and in range, and the last
    /// contour covering the last point.
    pub fn check(&self) -> FontResult<()> {
        if self.tags.len() != self.points.len() {
            return Err(Error::InvalidOutline);
        }
        if self.contours.is_empty() {
            return if self.points.is_empty() {
                Ok(())
            } else {
                Err(Error::InvalidOutline)
            };
        }
        let mut previous: i32 = -1;
        for &end in &self.contours {
            let end = i32::from(end);
            if end <= previous || end as usize >= self.points.len() {
                return Err(Error::InvalidOutline);
            }
            previous = end;
        }
        if previous as usize != self.points.len() - 1 {
            return Err(Error::InvalidOutline);
        }
        Ok(())
    }

    /// Sends the outline to a sink as path commands, dividing the 26.6
    /// coordinates by 64 into floating-point units.
    pub fn decompose<S>(&self, sink: &mut S) -> FontResult<()>
    where
        S: OutlineSink,
    {
        let mut start = 0usize;
        for &end in &self.contours {
            let end = end as usize;
            if end >= self.points.len() || end < start {
                return Err(Error::InvalidOutline);
            }
            self.decompose_contour(start, end, sink)?;
            start = end + 1;
        }
        Ok(())
    }

    fn decompose_contour<S>(&self, start: usize, end: usize, sink: &mut S) -> FontResult<()>
    where
        S: OutlineSink,
    {
        let point = |i: usize| to_f32(self.points[i]);
        let on_curve = |i: usize| self.tags[i].contains(PointTags::ON_CURVE);
        let conic = |i: usize| (self.tags[i] & (PointTags::ON_CURVE | PointTags::CUBIC)).is_empty();

        // Pick the starting on-point. A contour may open with a conic
        // control; in that case the start is the midpoint with the closing
        // point (or the closing point itself when on-curve).
        let count = end - start + 1;
        let mut first = point(start);
        let mut offset = 0usize;
        if !on_curve(start) {
            if self.tags[start].contains(PointTags::CUBIC) {
                return Err(Error::InvalidOutline);
            }
            if on_curve(end) {
                first = point(end);
            } else {
                first = point(start).lerp(point(end), 0.5);
            }
            offset = 0; // the conic at `start` is consumed by the loop below
        } else {
            offset = 1;
        }
        sink.move_to(first);

        let mut current = first;
        let mut i = offset;
        while i < count {
            let index = start + i;
            if on_curve(index) {
                current = point(index);
                sink.line_to(current);
                i += 1;
            } else if conic(index) {
                // A run of conic controls with implied on-points between.
                let mut ctrl = point(index);
                i += 1;
                loop {
                    if i >= count {
                        sink.quadratic_curve_to(ctrl, first);
                        current = first;
                        break;
                    }
                    let next = start + i;
                    if on_curve(next) {
                        current = point(next);
                        sink.quadratic_curve_to(ctrl, current);
                        i += 1;
                        break;
                    }
                    if !conic(next) {
                        return Err(Error::InvalidOutline);
                    }
                    let next_ctrl = point(next);
                    current = ctrl.lerp(next_ctrl, 0.5);
                    sink.quadratic_curve_to(ctrl, current);
                    ctrl = next_ctrl;
                    i += 1;
                }
            } else {
                // Cubic controls come in pairs followed by an on-point
                // (or the contour close).
                if i + 1 >= count || !self.tags[index + 1].contains(PointTags::CUBIC) {
                    return Err(Error::InvalidOutline);
                }
                let ctrl = LineSegment2F::new(point(index), point(index + 1));
                if i + 2 < count {
                    current = point(index + 2);
                    sink.cubic_curve_to(ctrl, current);
                    i += 3;
                } else {
                    sink.cubic_curve_to(ctrl, first);
                    current = first;
                    i += 2;
                }
            }
        }
        let _ = current;
        sink.close();
        Ok(())
    }
}

#[inline]
fn to_f32(v: Vector) -> Vector2F {
    Vector2F::new(v.x as f32 / 64.0, v.y as f32 / 64.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        commands: Vec<String>,
    }

    impl OutlineSink for Recorder {
        fn move_to(&mut self, to: Vector2F) {
            self.commands.push(format!("M {} {}", to.x(), to.y()));
        }
        fn line_to(&mut self, to: Vector2F) {
            self.commands.push(format!("L {} {}", to.x(), to.y()));
        }
        fn quadratic_curve_to(&mut self, ctrl: Vector2F, to: Vector2F) {
            self.commands
                .push(format!("Q {} {} {} {}", ctrl.x(), ctrl.y(), to.x(), to.y()));
        }
        fn cubic_curve_to(&mut self, ctrl: LineSegment2F, to: Vector2F) {
            self.commands.push(format!(
                "C {} {} {} {} {} {}",
                ctrl.from_x(),
                ctrl.from_y(),
                ctrl.to_x(),
                ctrl.to_y(),
                to.x(),
                to.y()
            ));
        }
        fn close(&mut self) {
            self.commands.push("Z".to_string());
        }
    }

    fn triangle() -> Outline {
        let mut outline = Outline::new();
        outline.push_point(Vector::new(0, 0), PointTags::ON_CURVE);
        outline.push_point(Vector::new(64, 0), PointTags::ON_CURVE);
        outline.push_point(Vector::new(32, 64), PointTags::ON_CURVE);
        outline.close_contour().unwrap();
        outline
    }

    #[test]
    fn control_box_of_triangle() {
        let bbox = triangle().control_box();
        assert_eq!((bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max), (0, 0, 64, 64));
    }

    #[test]
    fn check_rejects_unsorted_contours() {
        let mut outline = triangle();
        outline.check().unwrap();
        outline.contours = vec![2, 1];
        assert_eq!(outline.check(), Err(Error::InvalidOutline));
    }

    #[test]
    fn close_contour_requires_points() {
        let mut outline = Outline::new();
        assert_eq!(outline.close_contour(), Err(Error::InvalidOutline));
        outline.push_point(Vector::new(1, 1), PointTags::ON_CURVE);
        outline.close_contour().unwrap();
        assert_eq!(outline.close_contour(), Err(Error::InvalidOutline));
    }

    #[test]
    fn decompose_lines() {
        let mut sink = Recorder::default();
        triangle().decompose(&mut sink).unwrap();
        assert_eq!(
            sink.commands,
            vec!["M 0 0", "L 1 0", "L 0.5 1", "Z"]
        );
    }

    #[test]
    fn decompose_conic_run_inserts_midpoints() {
        let mut outline = Outline::new();
        outline.push_point(Vector::new(0, 0), PointTags::ON_CURVE);
        outline.push_point(Vector::new(64, 0), PointTags::empty());
        outline.push_point(Vector::new(64, 64), PointTags::empty());
        outline.close_contour().unwrap();
        let mut sink = Recorder::default();
        outline.decompose(&mut sink).unwrap();
        assert_eq!(
            sink.commands,
            vec!["M 0 0", "Q 1 0 1 0.5", "Q 1 1 0 0", "Z"]
        );
    }

    #[test]
    fn decompose_rejects_lone_cubic_control() {
        let mut outline = Outline::new();
        outline.push_point(Vector::new(0, 0), PointTags::ON_CURVE);
        outline.push_point(Vector::new(64, 0), PointTags::CUBIC);
        outline.push_point(Vector::new(32, 64), PointTags::ON_CURVE);
        outline.close_contour().unwrap();
        let mut sink = Recorder::default();
        assert_eq!(outline.decompose(&mut sink), Err(Error::InvalidOutline));
    }

    #[test]
    fn translate_moves_all_points() {
        let mut outline = triangle();
        outline.translate(64, -64);
        assert_eq!(outline.points[2], Vector::new(96, 0));
    }
}
