//! Single-band 16-bit rasters of a density grid.
//!
//! Pixel `(col, row)` is grid cell `(row, col)`, so row 0 is the northern
//! edge. Georeferencing travels in an ESRI world file next to each TIFF.

use crate::error::EmitError;
use density_grid::{DensityGrid, GridAxes, OwnerLegend};
use image::{ImageBuffer, ImageFormat, Luma};
use log::warn;
use serde::Serialize;
use std::fmt::Write as _;
use std::io::Cursor;

/// Affine pixel-to-ground transform in ESRI world file form.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct WorldFile {
    pub pixel_width: f64,
    /// Negative: rows advance southward.
    pub pixel_height: f64,
    /// Ground x of the center of the north-west pixel.
    pub origin_x: f64,
    /// Ground y of the center of the north-west pixel.
    pub origin_y: f64,
}

impl WorldFile {
    pub fn for_axes(axes: &GridAxes) -> Self {
        let extent = axes.extent();
        let (side_x, side_y) = axes.nominal_cell();
        let pixel_width = if extent.width() > 0.0 {
            extent.width() / axes.num_cols() as f64
        } else {
            side_x
        };
        let pixel_height = if extent.height() > 0.0 {
            extent.height() / axes.num_rows() as f64
        } else {
            side_y
        };
        Self {
            pixel_width,
            pixel_height: -pixel_height,
            origin_x: extent.west + pixel_width / 2.0,
            origin_y: extent.north - pixel_height / 2.0,
        }
    }

    /// The six-line text form, no rotation terms.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for v in [
            self.pixel_width,
            0.0,
            0.0,
            self.pixel_height,
            self.origin_x,
            self.origin_y,
        ] {
            let _ = writeln!(out, "{v:.12}");
        }
        out
    }
}

fn encode_tiff(name: &str, width: u32, height: u32, pixels: Vec<u16>) -> Result<Vec<u8>, EmitError> {
    let img = ImageBuffer::<Luma<u16>, _>::from_raw(width, height, pixels).ok_or_else(|| {
        EmitError::Encode {
            name: name.to_owned(),
            source: image::ImageError::Parameter(image::error::ParameterError::from_kind(
                image::error::ParameterErrorKind::DimensionMismatch,
            )),
        }
    })?;
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, ImageFormat::Tiff)
        .map_err(|source| EmitError::Encode {
            name: name.to_owned(),
            source,
        })?;
    Ok(bytes.into_inner())
}

/// Per-cell density as a 16-bit TIFF. Counts above `u16::MAX` saturate.
pub fn density_tiff(grid: &DensityGrid) -> Result<Vec<u8>, EmitError> {
    let mut saturated = 0usize;
    let pixels: Vec<u16> = grid
        .cells()
        .iter()
        .map(|c| {
            u16::try_from(c.density).unwrap_or_else(|_| {
                saturated += 1;
                u16::MAX
            })
        })
        .collect();
    if saturated > 0 {
        warn!("{saturated} cells exceed the 16-bit density range and were clamped");
    }
    encode_tiff("density raster", grid.cols() as u32, grid.rows() as u32, pixels)
}

/// Legend index of each cell's owner as a 16-bit TIFF, `0` for unassigned.
pub fn ownership_tiff(grid: &DensityGrid, legend: &OwnerLegend) -> Result<Vec<u8>, EmitError> {
    if legend.len() > usize::from(u16::MAX) {
        return Err(EmitError::TooManyOwners {
            owners: legend.len(),
        });
    }
    let pixels: Vec<u16> = grid
        .cells()
        .iter()
        .map(|c| legend.index_of(&c.owner) as u16)
        .collect();
    encode_tiff("ownership raster", grid.cols() as u32, grid.rows() as u32, pixels)
}
