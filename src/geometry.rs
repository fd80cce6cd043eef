//! Volume geometry on both sides of the conversion.
//!
//! Encoding derives the shared pixel measures and plane orientation from a
//! [`Volume`]. Decoding recovers direction cosines, origin and slice spacing
//! from the per-frame plane positions of a document.

use tracing::warn;

use crate::error::{ParametricMapError, Result};
use crate::functional_groups::{
    FunctionalGroup, PixelMeasures, PlaneOrientation, PlanePosition,
};
use crate::volume::{Direction, Volume};

/// Absolute tolerance, in mm, between declared and computed slice spacing.
pub const SLICE_SPACING_TOLERANCE: f64 = 1e-5;

/// Positions closer than this are considered the same point.
const POSITION_EPSILON: f64 = 1e-6;

/// How far the slice direction may deviate from the plane normal before
/// a warning is emitted (cosine of the angle).
const PARALLEL_COSINE: f64 = 1.0 - 1e-3;

/// Format a value as a DICOM decimal string in scientific notation.
///
/// Nine significant digits round-trip any `f32` exactly and always fit the
/// 16 character limit of DS.
pub fn format_scientific(value: f64) -> String {
    format!("{value:.8e}")
}

#[derive(Debug, Clone, PartialEq)]
pub struct SharedGeometry {
    /// Row spacing (y) followed by column spacing (x).
    pub pixel_spacing: [String; 2],
    /// Used for both SpacingBetweenSlices and SliceThickness.
    pub slice_spacing: String,
    pub orientation: [String; 6],
}

impl SharedGeometry {
    pub fn pixel_measures(&self) -> FunctionalGroup {
        FunctionalGroup::PixelMeasures(PixelMeasures {
            pixel_spacing: self.pixel_spacing.clone(),
            spacing_between_slices: Some(self.slice_spacing.clone()),
            slice_thickness: Some(self.slice_spacing.clone()),
        })
    }

    pub fn plane_orientation(&self) -> FunctionalGroup {
        FunctionalGroup::PlaneOrientation(PlaneOrientation {
            image_orientation: self.orientation.clone(),
        })
    }
}

pub fn compute_shared_geometry(volume: &Volume) -> SharedGeometry {
    let (x, y, z) = volume.spacing;
    let row = volume.axis_direction(0);
    let col = volume.axis_direction(1);

    SharedGeometry {
        pixel_spacing: [format_scientific(y), format_scientific(x)],
        slice_spacing: format_scientific(z),
        orientation: [row[0], row[1], row[2], col[0], col[1], col[2]].map(format_scientific),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGeometry {
    pub direction: Direction,
    pub origin: [f64; 3],
    /// `None` when a single frame leaves the spacing undeclared.
    pub slice_spacing: Option<f64>,
    /// Distance between the outermost frames along the slice direction.
    pub extent: f64,
}

/// Recover the volume geometry from the plane orientation and the frame
/// positions, given in frame order.
pub fn resolve_geometry_from_document(
    orientation: &PlaneOrientation,
    positions: &[PlanePosition],
) -> Result<ResolvedGeometry> {
    let (row, col) = orientation.cosines()?;
    let row = normalize(row).ok_or_else(|| {
        ParametricMapError::GeometryInconsistent("row direction has zero length".into())
    })?;
    let col = normalize(col).ok_or_else(|| {
        ParametricMapError::GeometryInconsistent("column direction has zero length".into())
    })?;
    let normal = normalize(cross(row, col)).ok_or_else(|| {
        ParametricMapError::GeometryInconsistent("row and column directions are parallel".into())
    })?;

    let points = positions
        .iter()
        .map(PlanePosition::position)
        .collect::<Result<Vec<_>>>()?;
    let (first, last) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => {
            return Err(ParametricMapError::GeometryInconsistent(
                "no frame positions".into(),
            ));
        }
    };

    if points.len() == 1 {
        return Ok(ResolvedGeometry {
            direction: from_columns(row, col, normal),
            origin: first,
            slice_spacing: None,
            extent: 0.0,
        });
    }

    if points.iter().all(|p| distance(*p, first) <= POSITION_EPSILON) {
        return Err(ParametricMapError::GeometryInconsistent(format!(
            "{} frames share a single position",
            points.len()
        )));
    }

    let slice_dir = normalize(sub(last, first)).ok_or_else(|| {
        ParametricMapError::GeometryInconsistent(
            "first and last frames share a position".into(),
        )
    })?;
    if dot(slice_dir, normal).abs() < PARALLEL_COSINE {
        warn!(
            "Slice direction {:?} is not normal to the image plane {:?}",
            slice_dir, normal
        );
    }

    let mut min = (f64::INFINITY, first);
    let mut max = f64::NEG_INFINITY;
    for point in &points {
        let projection = dot(*point, slice_dir);
        if projection < min.0 {
            min = (projection, *point);
        }
        max = max.max(projection);
    }
    let extent = max - min.0;

    Ok(ResolvedGeometry {
        direction: from_columns(row, col, slice_dir),
        origin: min.1,
        slice_spacing: Some(extent / (points.len() - 1) as f64),
        extent,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpacingReconciliation {
    pub value: f64,
    /// Declared and computed spacing disagree beyond the tolerance.
    pub mismatch: bool,
}

/// Pick the slice spacing of the reconstructed volume.
///
/// A zero or missing declared spacing is replaced by the computed one.
/// Otherwise the declared spacing is kept, with a warning when it differs
/// from the computed one by more than `tolerance`.
pub fn reconcile_declared_spacing(
    declared: Option<f64>,
    computed: Option<f64>,
    tolerance: f64,
) -> SpacingReconciliation {
    match (declared.filter(|d| *d != 0.0), computed) {
        (None, Some(computed)) => SpacingReconciliation {
            value: computed,
            mismatch: false,
        },
        (None, None) => {
            warn!("Slice spacing is neither declared nor computable, assuming 1.0");
            SpacingReconciliation {
                value: 1.0,
                mismatch: false,
            }
        }
        (Some(declared), Some(computed)) if (declared - computed).abs() > tolerance => {
            warn!(
                "Declared slice spacing is significantly different from the computed one. Declared = {} Computed = {}",
                declared, computed
            );
            SpacingReconciliation {
                value: declared,
                mismatch: true,
            }
        }
        (Some(declared), _) => SpacingReconciliation {
            value: declared,
            mismatch: false,
        },
    }
}

fn from_columns(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> Direction {
    [[a[0], b[0], c[0]], [a[1], b[1], c[1]], [a[2], b[2], c[2]]]
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    dot(sub(a, b), sub(a, b)).sqrt()
}

fn normalize(v: [f64; 3]) -> Option<[f64; 3]> {
    let norm = dot(v, v).sqrt();
    (norm.is_finite() && norm > POSITION_EPSILON).then(|| [v[0] / norm, v[1] / norm, v[2] / norm])
}
