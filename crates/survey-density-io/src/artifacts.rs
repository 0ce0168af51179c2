//! Output artifact set and its all-or-nothing commit.
//!
//! Every artifact is rendered in memory first. [`ArtifactSet::commit`]
//! writes each one to a hidden staging file in the output directory and
//! only renames them into place once all of them are on disk. Any failure
//! removes whatever was staged or already renamed.

use crate::error::EmitError;
use crate::raster::{density_tiff, ownership_tiff, WorldFile};
use density_grid::{DensityGrid, OwnerLegend};
use log::{debug, warn};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

pub const DENSITY_RASTER: &str = "density.tif";
pub const DENSITY_WORLD_FILE: &str = "density.tfw";
pub const OWNERSHIP_RASTER: &str = "ownership.tif";
pub const OWNERSHIP_WORLD_FILE: &str = "ownership.tfw";
pub const LEGEND: &str = "legend.txt";
pub const ASSIGNMENTS: &str = "assignments.csv";
pub const REPORT: &str = "report.json";

/// `index: capture_id` per line, ascending index.
pub fn legend_text(legend: &OwnerLegend) -> String {
    let mut out = String::new();
    for (index, id) in legend.iter() {
        let _ = writeln!(out, "{index}: {id}");
    }
    out
}

/// One `row,col,capture_id` record per owned cell in row-major order, no
/// header line.
pub fn assignment_text(grid: &DensityGrid) -> String {
    let mut out = String::new();
    for cell in grid.cells() {
        if let Some(id) = cell.owner.capture() {
            let _ = writeln!(out, "{},{},{}", cell.row, cell.col, id);
        }
    }
    out
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Named in-memory artifacts waiting to be written together.
#[derive(Clone, Debug, Default)]
pub struct ArtifactSet {
    artifacts: Vec<Artifact>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rasters, world files, legend and assignments of one grid.
    pub fn for_grid(grid: &DensityGrid) -> Result<Self, EmitError> {
        let legend = grid.owner_legend();
        let world = WorldFile::for_axes(grid.axes()).to_text();

        let mut set = Self::new();
        set.push(DENSITY_RASTER, density_tiff(grid)?);
        set.push(DENSITY_WORLD_FILE, world.clone().into_bytes());
        set.push(OWNERSHIP_RASTER, ownership_tiff(grid, &legend)?);
        set.push(OWNERSHIP_WORLD_FILE, world.into_bytes());
        set.push(LEGEND, legend_text(&legend).into_bytes());
        set.push(ASSIGNMENTS, assignment_text(grid).into_bytes());
        Ok(set)
    }

    pub fn push(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.artifacts.push(Artifact {
            name: name.into(),
            bytes,
        });
    }

    /// Add `value` as pretty JSON.
    pub fn push_json<T: Serialize>(&mut self, name: &str, value: &T) -> Result<(), EmitError> {
        let json = serde_json::to_vec_pretty(value).map_err(|source| EmitError::Serialize {
            name: name.to_owned(),
            source,
        })?;
        self.push(name, json);
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.artifacts.iter().map(|a| a.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.name == name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Write every artifact into `dir`, or none of them.
    pub fn commit(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, EmitError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| EmitError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut staged = Vec::with_capacity(self.artifacts.len());
        for artifact in &self.artifacts {
            let tmp = dir.join(format!(".{}.partial", artifact.name));
            if let Err(source) = fs::write(&tmp, &artifact.bytes) {
                staged.push(tmp.clone());
                discard(&staged);
                return Err(EmitError::Io { path: tmp, source });
            }
            staged.push(tmp);
        }

        let mut written = Vec::with_capacity(staged.len());
        for (i, (tmp, artifact)) in staged.iter().zip(&self.artifacts).enumerate() {
            let target = dir.join(&artifact.name);
            if let Err(source) = fs::rename(tmp, &target) {
                discard(&staged[i..]);
                discard(&written);
                return Err(EmitError::Io {
                    path: target,
                    source,
                });
            }
            debug!("wrote {}", target.display());
            written.push(target);
        }
        Ok(written)
    }
}

fn discard(paths: &[PathBuf]) {
    for path in paths {
        if let Err(err) = fs::remove_file(path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!("could not remove {}: {err}", path.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_writes_every_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("run");
        let mut set = ArtifactSet::new();
        set.push(LEGEND, b"1: DJI_0001\n".to_vec());
        set.push_json(REPORT, &serde_json::json!({ "ok": true })).unwrap();

        let written = set.commit(&out).unwrap();
        assert_eq!(written, vec![out.join(LEGEND), out.join(REPORT)]);
        assert_eq!(fs::read_to_string(out.join(LEGEND)).unwrap(), "1: DJI_0001\n");
        let leftovers: Vec<_> = fs::read_dir(&out)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".partial"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn failed_commit_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        // A directory squatting on the final name makes the rename fail.
        fs::create_dir(dir.path().join(ASSIGNMENTS)).unwrap();
        fs::write(dir.path().join(ASSIGNMENTS).join("keep"), "x").unwrap();

        let mut set = ArtifactSet::new();
        set.push(LEGEND, b"legend".to_vec());
        set.push(ASSIGNMENTS, b"0,1,DJI_0003\n".to_vec());
        set.push(REPORT, b"{}".to_vec());

        assert!(matches!(set.commit(dir.path()), Err(EmitError::Io { .. })));
        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec![ASSIGNMENTS.to_owned()]);
    }
}
