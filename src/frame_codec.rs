use ndarray::ArrayViewMut2;

use crate::document::Frame;
use crate::enums::FramePositioning;
use crate::error::{ParametricMapError, Result};
use crate::functional_groups::{FrameContent, FunctionalGroup, GroupSet, PlanePosition};
use crate::geometry::format_scientific;
use crate::volume::Volume;

/// Copy slice `frame_index` of the volume into a frame with its plane
/// position and frame content groups.
pub fn encode_frame(
    volume: &Volume,
    frame_index: usize,
    positioning: FramePositioning,
) -> Result<Frame> {
    let slice = volume.slice(frame_index).ok_or_else(|| {
        ParametricMapError::MalformedDocument(format!(
            "frame {frame_index} is outside a volume of depth {}",
            volume.depth()
        ))
    })?;
    let (height, width) = slice.dim();
    let frame_size = height.checked_mul(width).ok_or_else(|| {
        ParametricMapError::AllocationFailure(format!("{width}x{height} frame overflows"))
    })?;

    let mut pixels = Vec::new();
    pixels.try_reserve_exact(frame_size).map_err(|e| {
        ParametricMapError::AllocationFailure(format!("frame {frame_index}: {e}"))
    })?;
    // Row-major regardless of the memory layout of the volume.
    pixels.extend(slice.iter().copied());

    let position = match positioning {
        FramePositioning::Patient => volume.slice_position(frame_index).map(format_scientific),
        FramePositioning::IndexPlaceholder => {
            ["0".to_string(), "0".to_string(), frame_index.to_string()]
        }
    };
    let dimension_index = u32::try_from(frame_index + 1).map_err(|_| {
        ParametricMapError::AllocationFailure(format!("frame index {frame_index} overflows"))
    })?;

    let mut groups = GroupSet::new();
    groups.insert(FunctionalGroup::PlanePosition(PlanePosition {
        image_position: position,
    }));
    groups.insert(FunctionalGroup::FrameContent(FrameContent {
        dimension_index_values: vec![dimension_index],
    }));

    Ok(Frame { pixels, groups })
}

/// Write a frame buffer into a volume slice, row-major.
pub fn decode_frame(pixels: &[f32], frame_index: usize, volume: &mut Volume) -> Result<()> {
    let slice = volume.slice_mut(frame_index).ok_or_else(|| {
        ParametricMapError::MalformedDocument(format!("frame {frame_index} has no slice to fill"))
    })?;
    write_slice(pixels, frame_index, slice)
}

pub(crate) fn write_slice(
    pixels: &[f32],
    frame_index: usize,
    mut slice: ArrayViewMut2<'_, f32>,
) -> Result<()> {
    if pixels.len() != slice.len() {
        return Err(ParametricMapError::MalformedDocument(format!(
            "frame {frame_index} holds {} pixels, slice needs {}",
            pixels.len(),
            slice.len()
        )));
    }
    for (voxel, value) in slice.iter_mut().zip(pixels) {
        *voxel = *value;
    }
    Ok(())
}
