// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Quadrilateral geometry — canonical corner ordering, edge lengths, and the
// small amount of polygon arithmetic the detector and rectifier share.

use serde::{Deserialize, Serialize};

/// A 2D coordinate in the pixel space of a specific frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn as_f32_pair(self) -> (f32, f32) {
        (self.x as f32, self.y as f32)
    }
}

/// Euclidean distance between two points.
pub fn edge_length(a: Point, b: Point) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

/// Four document corners.
///
/// Quadrilaterals built through [`order_points`] are in canonical order
/// `[top-left, top-right, bottom-right, bottom-left]` unless the input was
/// degenerate, in which case the input order is kept.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quadrilateral {
    corners: [Point; 4],
}

impl Quadrilateral {
    /// Wrap four corners as given, without reordering.
    pub const fn from_corners(corners: [Point; 4]) -> Self {
        Self { corners }
    }

    pub fn corners(&self) -> [Point; 4] {
        self.corners
    }

    pub fn top_left(&self) -> Point {
        self.corners[0]
    }

    pub fn top_right(&self) -> Point {
        self.corners[1]
    }

    pub fn bottom_right(&self) -> Point {
        self.corners[2]
    }

    pub fn bottom_left(&self) -> Point {
        self.corners[3]
    }

    /// Whether re-ordering would leave the corners where they are.
    pub fn is_canonical(&self) -> bool {
        order_points(self.corners) == *self
    }

    /// Enclosed area via the shoelace formula.
    pub fn area(&self) -> f64 {
        let c = &self.corners;
        let mut twice = 0.0;
        for i in 0..4 {
            let j = (i + 1) % 4;
            twice += c[i].x * c[j].y - c[j].x * c[i].y;
        }
        twice.abs() / 2.0
    }

    /// Scale every corner, e.g. from a downscaled analysis frame back to the
    /// full-resolution frame.
    pub fn scaled(&self, sx: f64, sy: f64) -> Self {
        Self {
            corners: self.corners.map(|p| Point::new(p.x * sx, p.y * sy)),
        }
    }

    /// Output size of the flattened document: the longer of each pair of
    /// opposite edges, so an oblique shot is never cropped.
    pub fn target_size(&self) -> (f64, f64) {
        let width = edge_length(self.bottom_left(), self.bottom_right())
            .max(edge_length(self.top_left(), self.top_right()));
        let height = edge_length(self.top_right(), self.bottom_right())
            .max(edge_length(self.top_left(), self.bottom_left()));
        (width, height)
    }

    /// Corners as `(f32, f32)` pairs for `imageproc` projections.
    pub(crate) fn control_points(&self) -> [(f32, f32); 4] {
        self.corners.map(Point::as_f32_pair)
    }
}

/// Sort four points into `[top-left, top-right, bottom-right, bottom-left]`.
///
/// With `s = x + y` and `d = y - x`: top-left minimises `s`, bottom-right
/// maximises `s`, top-right minimises `d`, bottom-left maximises `d`. The
/// first index wins ties. If the four picks are not distinct points of the
/// input (collinear or otherwise degenerate corners) the input is returned in
/// its original order.
pub fn order_points(points: [Point; 4]) -> Quadrilateral {
    let sum = points.map(|p| p.x + p.y);
    let diff = points.map(|p| p.y - p.x);

    let picks = [
        arg_extreme(&sum, |a, b| a < b),
        arg_extreme(&diff, |a, b| a < b),
        arg_extreme(&sum, |a, b| a > b),
        arg_extreme(&diff, |a, b| a > b),
    ];

    let mut seen = [false; 4];
    for &i in &picks {
        if seen[i] {
            return Quadrilateral::from_corners(points);
        }
        seen[i] = true;
    }

    Quadrilateral::from_corners(picks.map(|i| points[i]))
}

/// Index of the first element that beats every other under `better`.
fn arg_extreme(values: &[f64; 4], better: impl Fn(f64, f64) -> bool) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if better(v, values[best]) {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    const SKEWED: [Point; 4] = [
        Point::new(52.0, 40.0),
        Point::new(455.0, 61.0),
        Point::new(470.0, 590.0),
        Point::new(31.0, 560.0),
    ];

    fn permutations(points: [Point; 4]) -> Vec<[Point; 4]> {
        let mut out = Vec::new();
        for a in 0..4 {
            for b in 0..4 {
                for c in 0..4 {
                    for d in 0..4 {
                        let idx = [a, b, c, d];
                        let mut seen = [false; 4];
                        idx.iter().for_each(|&i| seen[i] = true);
                        if seen.iter().all(|&s| s) {
                            out.push(idx.map(|i| points[i]));
                        }
                    }
                }
            }
        }
        out
    }

    #[test]
    fn every_permutation_orders_to_the_same_quad() {
        let expected = Quadrilateral::from_corners(SKEWED);
        let perms = permutations(SKEWED);
        assert_eq!(perms.len(), 24);
        for perm in perms {
            assert_eq!(order_points(perm), expected, "input {perm:?}");
        }
    }

    #[test]
    fn ordering_satisfies_sum_and_difference_extremes() {
        let quad = order_points([SKEWED[2], SKEWED[0], SKEWED[3], SKEWED[1]]);
        let s = quad.corners().map(|p| p.x + p.y);
        let d = quad.corners().map(|p| p.y - p.x);
        assert!(s.iter().all(|&v| v >= s[0]));
        assert!(s.iter().all(|&v| v <= s[2]));
        assert!(d.iter().all(|&v| v >= d[1]));
        assert!(d.iter().all(|&v| v <= d[3]));
    }

    #[test]
    fn ordering_is_idempotent() {
        let once = order_points([SKEWED[1], SKEWED[3], SKEWED[0], SKEWED[2]]);
        assert!(once.is_canonical());
        assert_eq!(order_points(once.corners()), once);
    }

    #[test]
    fn degenerate_input_passes_through() {
        // A 45-degree diamond: top and left corners tie on x + y and y - x.
        let diamond = [
            Point::new(50.0, 0.0),
            Point::new(100.0, 50.0),
            Point::new(50.0, 100.0),
            Point::new(0.0, 50.0),
        ];
        assert_eq!(order_points(diamond).corners(), diamond);

        let collinear = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0),
            Point::new(3.0, 3.0),
        ];
        assert_eq!(order_points(collinear).corners(), collinear);
    }

    #[test]
    fn edge_length_is_euclidean() {
        assert_eq!(edge_length(Point::new(0.0, 0.0), Point::new(3.0, 4.0)), 5.0);
        assert_eq!(edge_length(Point::new(7.0, 7.0), Point::new(7.0, 7.0)), 0.0);
    }

    #[test]
    fn target_size_takes_longer_opposite_edges() {
        let quad = order_points([
            Point::new(20.0, 0.0),
            Point::new(420.0, 0.0),
            Point::new(440.0, 300.0),
            Point::new(0.0, 300.0),
        ]);
        let (w, h) = quad.target_size();
        assert!((w - 440.0).abs() < 1e-9);
        assert!((h - 300.0f64.hypot(20.0)).abs() < 1e-9);
    }

    #[test]
    fn area_and_scaling() {
        let square = order_points([
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ]);
        assert!((square.area() - 100.0).abs() < 1e-9);
        let doubled = square.scaled(2.0, 3.0);
        assert_eq!(doubled.bottom_right(), Point::new(20.0, 30.0));
        assert!((doubled.area() - 600.0).abs() < 1e-9);
    }
}
