//! Module Grid Reconstruction
//!
//! Recovers the dark/light module matrix from an opaque QR raster so it can
//! be repainted. The raster must be the bare symbol (no quiet zone) with
//! crisp, unantialiased module edges of at least one pixel.

use image::{Pixel, RgbaImage};
use thiserror::Error;
use tracing::debug;

/// Canonical QR side lengths handled by the restyler (versions 1 to 15).
pub const QR_MODULE_COUNTS: [usize; 15] = [21, 25, 29, 33, 37, 41, 45, 49, 53, 57, 61, 65, 69, 73, 77];

/// Luminance below this is a dark pixel.
pub const DARK_THRESHOLD: u8 = 128;

const FINDER_MODULES: usize = 7;

/// Row and column holding the timing patterns.
const TIMING_INDEX: usize = 6;

/// Largest distance between a raw estimate and the count it snaps to.
/// Canonical counts are four apart, so only estimates beyond the table
/// exceed it.
pub const MAX_SNAP_DISTANCE: f64 = 2.0;

/// Canonical counts tried around a raw estimate, nearest first.
const CANDIDATES: usize = 3;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReconstructionError {
    #[error("Raster is empty")]
    EmptyRaster,

    #[error("Raster must be square, got {width}x{height}")]
    NotSquare { width: u32, height: u32 },

    #[error("Raster of {size}px is too small for {modules} modules")]
    Undersampled { size: u32, modules: usize },

    #[error("Raster contains no dark modules")]
    Blank,

    #[error("Finder patterns not found in {modules}x{modules} grid")]
    MissingFinder { modules: usize },

    #[error("Timing patterns do not alternate in {modules}x{modules} grid")]
    TimingMismatch { modules: usize },

    #[error("Estimated {estimate:.1} modules is outside the supported versions")]
    OutOfRange { estimate: f64 },
}

/// Immutable square matrix of modules, `true` = dark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleGrid {
    size: usize,
    modules: Vec<bool>,
}

impl ModuleGrid {
    /// Build from row-major modules. `None` if the length is not `size * size`.
    pub fn from_modules(size: usize, modules: Vec<bool>) -> Option<Self> {
        if size == 0 || modules.len() != size * size {
            return None;
        }
        Some(Self { size, modules })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Dark test; out of range reads as light.
    pub fn is_dark(&self, row: usize, col: usize) -> bool {
        row < self.size && col < self.size && self.modules[row * self.size + col]
    }

    /// Iterate `(row, col)` of dark modules in row-major order.
    pub fn dark_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let size = self.size;
        self.modules
            .iter()
            .enumerate()
            .filter(|(_, dark)| **dark)
            .map(move |(i, _)| (i / size, i % size))
    }

    /// All three 7x7 finder patterns are present.
    pub fn has_finder_patterns(&self) -> bool {
        if self.size < FINDER_MODULES * 2 + 1 {
            return false;
        }
        let far = self.size - FINDER_MODULES;
        self.finder_at(0, 0) && self.finder_at(0, far) && self.finder_at(far, 0)
    }

    /// Row 6 and column 6 alternate dark/light between the finders,
    /// dark on even indices.
    pub fn has_timing_patterns(&self) -> bool {
        if self.size < FINDER_MODULES * 2 + 3 {
            return false;
        }
        (FINDER_MODULES + 1..=self.size - FINDER_MODULES - 2).all(|i| {
            let expected = i % 2 == 0;
            self.is_dark(TIMING_INDEX, i) == expected && self.is_dark(i, TIMING_INDEX) == expected
        })
    }

    fn finder_at(&self, top: usize, left: usize) -> bool {
        (0..FINDER_MODULES).all(|r| {
            (0..FINDER_MODULES).all(|c| {
                let ring = r.min(c).min(FINDER_MODULES - 1 - r).min(FINDER_MODULES - 1 - c);
                // ring 0 dark, ring 1 light, rings 2+ dark
                let expected = ring != 1;
                self.is_dark(top + r, left + c) == expected
            })
        })
    }
}

pub(crate) fn is_dark_pixel(pixel: &image::Rgba<u8>) -> bool {
    pixel.to_luma().0[0] < DARK_THRESHOLD
}

/// Count dark/light changes between consecutive pixels of the first row.
pub fn count_row_transitions(raster: &RgbaImage) -> usize {
    if raster.height() == 0 {
        return 0;
    }
    let mut transitions = 0;
    let mut last_dark = None;
    for x in 0..raster.width() {
        let dark = is_dark_pixel(raster.get_pixel(x, 0));
        if let Some(prev) = last_dark {
            if prev != dark {
                transitions += 1;
            }
        }
        last_dark = Some(dark);
    }
    transitions
}

/// Raw module estimate from edge count: every module contributes at most
/// one rising and one falling edge.
pub fn estimate_from_transitions(transitions: usize) -> f64 {
    (transitions as f64 / 2.0).round()
}

/// Raw module estimate from the top finder patterns, each seven modules wide.
/// `None` unless the first row starts and ends dark.
pub fn estimate_from_finders(raster: &RgbaImage) -> Option<f64> {
    let width = raster.width();
    if width == 0 || raster.height() == 0 {
        return None;
    }
    let dark_at = |x: u32| is_dark_pixel(raster.get_pixel(x, 0));

    let left = (0..width).take_while(|x| dark_at(*x)).count();
    let right = (0..width).rev().take_while(|x| dark_at(*x)).count();
    if left == 0 || right == 0 || left as u32 == width {
        return None;
    }

    let run = (left + right) as f64 / 2.0;
    Some(FINDER_MODULES as f64 * width as f64 / run)
}

/// Canonical counts ordered by distance to `estimate`; ties go to the
/// smaller count.
fn ranked_counts(estimate: f64) -> Vec<usize> {
    let mut counts = QR_MODULE_COUNTS.to_vec();
    counts.sort_by(|a, b| {
        let da = (*a as f64 - estimate).abs();
        let db = (*b as f64 - estimate).abs();
        da.total_cmp(&db).then(a.cmp(b))
    });
    counts
}

/// Nearest canonical count; an exact tie goes to the smaller count.
pub fn snap_module_count(estimate: f64) -> usize {
    ranked_counts(estimate)[0]
}

/// Raw module estimate of a square raster, before snapping.
pub fn estimate_module_count(raster: &RgbaImage) -> f64 {
    match estimate_from_finders(raster) {
        Some(e) => e,
        None => estimate_from_transitions(count_row_transitions(raster)),
    }
}

/// Detect the module count of a square raster.
pub fn detect_module_count(raster: &RgbaImage) -> usize {
    snap_module_count(estimate_module_count(raster))
}

fn sample(raster: &RgbaImage, count: usize) -> ModuleGrid {
    let size = raster.width();
    let module_size = size as f64 / count as f64;
    let mut modules = Vec::with_capacity(count * count);
    for row in 0..count {
        for col in 0..count {
            let x = (col as f64 * module_size + module_size / 2.0).floor() as u32;
            let y = (row as f64 * module_size + module_size / 2.0).floor() as u32;
            let pixel = raster.get_pixel(x.min(size - 1), y.min(size - 1));
            modules.push(is_dark_pixel(pixel));
        }
    }
    ModuleGrid { size: count, modules }
}

fn verify(grid: ModuleGrid) -> Result<ModuleGrid, ReconstructionError> {
    let modules = grid.size;
    if !grid.has_finder_patterns() {
        return Err(ReconstructionError::MissingFinder { modules });
    }
    if !grid.has_timing_patterns() {
        return Err(ReconstructionError::TimingMismatch { modules });
    }
    Ok(grid)
}

/// Reconstruct the module grid by sampling each cell centre.
///
/// The snapped count and its nearest neighbours are tried in turn, skipping
/// any the raster is too small to hold; the first whose finder and timing
/// patterns check out wins. When none does, the first rejection is returned.
pub fn reconstruct(raster: &RgbaImage) -> Result<ModuleGrid, ReconstructionError> {
    let (width, height) = raster.dimensions();
    if width == 0 || height == 0 {
        return Err(ReconstructionError::EmptyRaster);
    }
    if width != height {
        return Err(ReconstructionError::NotSquare { width, height });
    }
    if !raster.pixels().any(is_dark_pixel) {
        return Err(ReconstructionError::Blank);
    }

    let size = width;
    let estimate = estimate_module_count(raster);
    let mut candidates = ranked_counts(estimate);
    candidates.truncate(CANDIDATES);
    let snapped = candidates[0];
    let smallest = candidates.iter().copied().min().unwrap_or(snapped);
    if (size as usize) < smallest {
        return Err(ReconstructionError::Undersampled { size, modules: snapped });
    }
    if (estimate - snapped as f64).abs() > MAX_SNAP_DISTANCE {
        return Err(ReconstructionError::OutOfRange { estimate });
    }

    let mut first_error = None;
    for &count in &candidates {
        if (size as usize) < count {
            continue;
        }
        match verify(sample(raster, count)) {
            Ok(grid) => {
                debug!(size, estimate, count, "detected module grid");
                return Ok(grid);
            }
            Err(e) => {
                debug!(count, error = %e, "module count rejected");
                first_error.get_or_insert(e);
            }
        }
    }
    Err(first_error.unwrap_or(ReconstructionError::Undersampled { size, modules: snapped }))
}
