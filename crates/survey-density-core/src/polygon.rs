//! Small planar predicates for footprints and grid boxes.
//!
//! All tests are closed: touching counts as intersecting, boundary points
//! count as inside.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

const EPS: f64 = 1e-12;

/// Axis-aligned box in the shared frame (or in lon/lat degrees).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroundBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl GroundBox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Smallest box containing every point, `None` for an empty iterator.
    pub fn enclosing<'a>(points: impl IntoIterator<Item = &'a Point2<f64>>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let init = Self::new(first.x, first.y, first.x, first.y);
        Some(iter.fold(init, |b, p| {
            Self::new(
                b.west.min(p.x),
                b.south.min(p.y),
                b.east.max(p.x),
                b.north.max(p.y),
            )
        }))
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    #[inline]
    pub fn contains_point(&self, p: Point2<f64>) -> bool {
        p.x >= self.west && p.x <= self.east && p.y >= self.south && p.y <= self.north
    }

    /// Closed overlap test between two boxes.
    #[inline]
    pub fn overlaps(&self, other: &GroundBox) -> bool {
        self.west <= other.east
            && other.west <= self.east
            && self.south <= other.north
            && other.south <= self.north
    }

    /// Corners in NW, NE, SE, SW order.
    pub fn corners(&self) -> [Point2<f64>; 4] {
        [
            Point2::new(self.west, self.north),
            Point2::new(self.east, self.north),
            Point2::new(self.east, self.south),
            Point2::new(self.west, self.south),
        ]
    }
}

#[inline]
fn cross(o: Point2<f64>, a: Point2<f64>, b: Point2<f64>) -> f64 {
    (a - o).perp(&(b - o))
}

#[inline]
fn orientation(o: Point2<f64>, a: Point2<f64>, b: Point2<f64>) -> i8 {
    let c = cross(o, a, b);
    if c > EPS {
        1
    } else if c < -EPS {
        -1
    } else {
        0
    }
}

#[inline]
fn within_span(a: Point2<f64>, b: Point2<f64>, p: Point2<f64>) -> bool {
    p.x >= a.x.min(b.x) - EPS
        && p.x <= a.x.max(b.x) + EPS
        && p.y >= a.y.min(b.y) - EPS
        && p.y <= a.y.max(b.y) + EPS
}

/// Segments `ab` and `cd` share at least one point.
pub fn segments_touch(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>, d: Point2<f64>) -> bool {
    let o1 = orientation(a, b, c);
    let o2 = orientation(a, b, d);
    let o3 = orientation(c, d, a);
    let o4 = orientation(c, d, b);

    if o1 != o2 && o3 != o4 && o1 != 0 && o2 != 0 && o3 != 0 && o4 != 0 {
        return true;
    }
    (o1 == 0 && within_span(a, b, c))
        || (o2 == 0 && within_span(a, b, d))
        || (o3 == 0 && within_span(c, d, a))
        || (o4 == 0 && within_span(c, d, b))
}

/// Segments `ab` and `cd` cross at a single interior point of both.
pub fn segments_cross(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>, d: Point2<f64>) -> bool {
    let o1 = orientation(a, b, c);
    let o2 = orientation(a, b, d);
    let o3 = orientation(c, d, a);
    let o4 = orientation(c, d, b);
    o1 * o2 < 0 && o3 * o4 < 0
}

/// Shoelace area, positive for counter-clockwise rings.
pub fn signed_area(ring: &[Point2<f64>]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| {
            let p = ring[i];
            let q = ring[(i + 1) % n];
            p.x * q.y - q.x * p.y
        })
        .sum();
    twice / 2.0
}

fn edges(ring: &[Point2<f64>]) -> impl Iterator<Item = (Point2<f64>, Point2<f64>)> + '_ {
    let n = ring.len();
    (0..n).map(move |i| (ring[i], ring[(i + 1) % n]))
}

/// No two non-adjacent edges of the ring touch.
pub fn is_simple(ring: &[Point2<f64>]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    for i in 0..n {
        for j in (i + 1)..n {
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            if adjacent {
                continue;
            }
            let (a, b) = (ring[i], ring[(i + 1) % n]);
            let (c, d) = (ring[j], ring[(j + 1) % n]);
            if segments_touch(a, b, c, d) {
                return false;
            }
        }
    }
    true
}

fn on_boundary(ring: &[Point2<f64>], p: Point2<f64>) -> bool {
    edges(ring).any(|(a, b)| orientation(a, b, p) == 0 && within_span(a, b, p))
}

/// Closed point-in-polygon test (even-odd ray casting plus boundary check).
pub fn contains_point(ring: &[Point2<f64>], p: Point2<f64>) -> bool {
    if on_boundary(ring, p) {
        return true;
    }
    let mut inside = false;
    for (a, b) in edges(ring) {
        if (a.y > p.y) != (b.y > p.y) {
            let x_at = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x_at {
                inside = !inside;
            }
        }
    }
    inside
}

/// The ring and the box share at least one point.
pub fn intersects_box(ring: &[Point2<f64>], bx: &GroundBox) -> bool {
    if ring.iter().any(|&p| bx.contains_point(p)) {
        return true;
    }
    let corners = bx.corners();
    if corners.iter().any(|&c| contains_point(ring, c)) {
        return true;
    }
    edges(ring).any(|(a, b)| edges(&corners).any(|(c, d)| segments_touch(a, b, c, d)))
}

/// The box lies entirely inside the ring (boundary contact allowed).
pub fn contains_box(ring: &[Point2<f64>], bx: &GroundBox) -> bool {
    let corners = bx.corners();
    if !corners.iter().all(|&c| contains_point(ring, c)) {
        return false;
    }
    // A concave ring can still poke into the box between its corners.
    let interior_vertex = ring.iter().any(|p| {
        p.x > bx.west && p.x < bx.east && p.y > bx.south && p.y < bx.north
    });
    if interior_vertex {
        return false;
    }
    !edges(ring).any(|(a, b)| edges(&corners).any(|(c, d)| segments_cross(a, b, c, d)))
}
