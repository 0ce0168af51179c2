//! Ground footprints of captures.

use crate::camera::{CameraModel, ProjectionError};
use crate::capture::Capture;
use crate::polygon::{self, GroundBox};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Image corner, in footprint order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FootprintCorner {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl FootprintCorner {
    /// Recognize survey labels such as `TL`, `top_left` or `TopLeft`.
    pub fn from_label(label: &str) -> Option<Self> {
        let key: String = label
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "tl" | "topleft" | "nw" | "upperleft" => Some(FootprintCorner::TopLeft),
            "tr" | "topright" | "ne" | "upperright" => Some(FootprintCorner::TopRight),
            "br" | "bottomright" | "se" | "lowerright" => Some(FootprintCorner::BottomRight),
            "bl" | "bottomleft" | "sw" | "lowerleft" => Some(FootprintCorner::BottomLeft),
            _ => None,
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Why a footprint cannot be used for coverage tests.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DegenerateFootprint {
    #[error("footprint corner could not be projected: {0}")]
    Projection(#[from] ProjectionError),
    #[error("footprint has non-finite corners")]
    NonFinite,
    #[error("footprint is self-intersecting")]
    SelfIntersecting,
    #[error("footprint area {area:.3e} is below {min_area:.3e}")]
    TooSmall { area: f64, min_area: f64 },
    #[error("expected 4 surveyed corners, found {found}")]
    CornerCount { found: usize },
}

/// Four ground points in TL, TR, BR, BL order.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub corners: [Point2<f64>; 4],
}

impl Footprint {
    pub fn new(corners: [Point2<f64>; 4]) -> Self {
        Self { corners }
    }

    #[inline]
    pub fn corner(&self, which: FootprintCorner) -> Point2<f64> {
        self.corners[which.index()]
    }

    pub fn area(&self) -> f64 {
        polygon::signed_area(&self.corners).abs()
    }

    pub fn bounds(&self) -> GroundBox {
        let [a, b, c, d] = self.corners;
        GroundBox::new(
            a.x.min(b.x).min(c.x).min(d.x),
            a.y.min(b.y).min(c.y).min(d.y),
            a.x.max(b.x).max(c.x).max(d.x),
            a.y.max(b.y).max(c.y).max(d.y),
        )
    }

    /// Check that the quadrilateral is finite, simple and not collapsed.
    pub fn validate(self, min_area: f64) -> Result<ValidFootprint, DegenerateFootprint> {
        if self
            .corners
            .iter()
            .any(|p| !p.x.is_finite() || !p.y.is_finite())
        {
            return Err(DegenerateFootprint::NonFinite);
        }
        if !polygon::is_simple(&self.corners) {
            return Err(DegenerateFootprint::SelfIntersecting);
        }
        let area = self.area();
        if area <= min_area {
            return Err(DegenerateFootprint::TooSmall { area, min_area });
        }
        Ok(ValidFootprint(self))
    }

    /// Order four surveyed corners.
    ///
    /// Recognized labels fix the order directly. Otherwise the corners are
    /// sorted clockwise around their centroid starting from due west, which
    /// gives TL, TR, BR, BL for a north-up image.
    pub fn from_labelled_corners(
        corners: &[(String, Point2<f64>)],
    ) -> Result<Self, DegenerateFootprint> {
        if corners.len() != 4 {
            return Err(DegenerateFootprint::CornerCount {
                found: corners.len(),
            });
        }

        let mut slots: [Option<Point2<f64>>; 4] = [None; 4];
        for (label, p) in corners {
            match FootprintCorner::from_label(label) {
                Some(which) if slots[which.index()].is_none() => slots[which.index()] = Some(*p),
                _ => {
                    slots = [None; 4];
                    break;
                }
            }
        }
        if let [Some(tl), Some(tr), Some(br), Some(bl)] = slots {
            return Ok(Self::new([tl, tr, br, bl]));
        }

        let centroid = Point2::from(
            corners
                .iter()
                .fold(Vector2::<f64>::zeros(), |acc, (_, p)| acc + p.coords)
                / 4.0,
        );
        let mut ring: Vec<Point2<f64>> = corners.iter().map(|(_, p)| *p).collect();
        ring.sort_by(|a, b| {
            let ka = clockwise_key(*a - centroid);
            let kb = clockwise_key(*b - centroid);
            ka.total_cmp(&kb)
        });
        Ok(Self::new([ring[0], ring[1], ring[2], ring[3]]))
    }
}

/// Clockwise angle from due west, in `[0, 2π)`.
fn clockwise_key(v: Vector2<f64>) -> f64 {
    let angle = PI - v.y.atan2(v.x);
    angle.rem_euclid(2.0 * PI)
}

/// Footprint that passed [`Footprint::validate`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ValidFootprint(Footprint);

impl ValidFootprint {
    #[inline]
    pub fn footprint(&self) -> &Footprint {
        &self.0
    }

    #[inline]
    pub fn ring(&self) -> &[Point2<f64>] {
        &self.0.corners
    }

    pub fn intersects_box(&self, bx: &GroundBox) -> bool {
        polygon::intersects_box(self.ring(), bx)
    }

    pub fn contains_box(&self, bx: &GroundBox) -> bool {
        polygon::contains_box(self.ring(), bx)
    }
}

/// Project the four image corners of `capture` and shift them by the
/// capture's platform offset.
pub fn build_footprint(
    model: &CameraModel,
    capture: &Capture,
    drone_offset: Vector2<f64>,
) -> Result<Footprint, ProjectionError> {
    let size = capture.size();
    let pose = capture.pose();
    let mut corners = [Point2::origin(); 4];
    for (slot, pixel) in corners.iter_mut().zip(size.centered_corners()) {
        *slot = Point2::from(drone_offset + model.project(pixel, size, pose)?);
    }
    Ok(Footprint::new(corners))
}
