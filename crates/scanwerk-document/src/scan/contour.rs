// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Closed-contour measurements: perimeter, enclosed area, and Douglas-Peucker
// polygon approximation.

use imageproc::point::Point as PixelPoint;

/// Perimeter of a closed contour.
pub(crate) fn closed_perimeter(points: &[PixelPoint<i32>]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let n = points.len();
    (0..n)
        .map(|i| distance(points[i], points[(i + 1) % n]))
        .sum()
}

/// Unsigned enclosed area of a closed contour (shoelace).
pub(crate) fn contour_area(points: &[PixelPoint<i32>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let twice: i64 = (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            i64::from(a.x) * i64::from(b.y) - i64::from(b.x) * i64::from(a.y)
        })
        .sum();
    twice.unsigned_abs() as f64 / 2.0
}

/// Approximate a closed contour with a polygon whose vertices are a subset of
/// the contour points and whose edges stay within `epsilon` of the contour.
///
/// The contour is split at its first point and the point farthest from it;
/// each half is simplified independently so the result never repeats the
/// closing vertex.
pub(crate) fn approximate_closed(points: &[PixelPoint<i32>], epsilon: f64) -> Vec<PixelPoint<i32>> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let anchor = points[0];
    let far = points
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| distance(anchor, **a).total_cmp(&distance(anchor, **b)))
        .map(|(i, _)| i)
        .unwrap_or(0);
    if far == 0 {
        return vec![anchor];
    }

    let mut polygon = simplify_open(&points[..=far], epsilon);
    polygon.pop();

    let return_leg: Vec<PixelPoint<i32>> = points[far..]
        .iter()
        .copied()
        .chain(std::iter::once(anchor))
        .collect();
    let mut second = simplify_open(&return_leg, epsilon);
    second.pop();

    polygon.extend(second);
    polygon
}

/// Douglas-Peucker on an open chain; both endpoints are kept.
fn simplify_open(chain: &[PixelPoint<i32>], epsilon: f64) -> Vec<PixelPoint<i32>> {
    let last = chain.len() - 1;
    if last < 2 {
        return chain.to_vec();
    }

    let (start, end) = (chain[0], chain[last]);
    let (split, max_dist) = chain[1..last]
        .iter()
        .enumerate()
        .map(|(i, &p)| (i + 1, distance_to_line(p, start, end)))
        .fold((0, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });

    if max_dist <= epsilon {
        return vec![start, end];
    }

    let mut left = simplify_open(&chain[..=split], epsilon);
    let right = simplify_open(&chain[split..], epsilon);
    left.pop();
    left.extend(right);
    left
}

fn distance(a: PixelPoint<i32>, b: PixelPoint<i32>) -> f64 {
    f64::from(b.x - a.x).hypot(f64::from(b.y - a.y))
}

/// Perpendicular distance from `p` to the infinite line through `a` and `b`;
/// falls back to point distance when `a == b`.
fn distance_to_line(p: PixelPoint<i32>, a: PixelPoint<i32>, b: PixelPoint<i32>) -> f64 {
    let (dx, dy) = (f64::from(b.x - a.x), f64::from(b.y - a.y));
    let len = dx.hypot(dy);
    if len == 0.0 {
        return distance(p, a);
    }
    (dy * f64::from(p.x - a.x) - dx * f64::from(p.y - a.y)).abs() / len
}
