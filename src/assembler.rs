use chrono::{Local, NaiveDateTime};
use ndarray::{Array3, Axis};
use rayon::prelude::*;
use tracing::{debug, info};
use web_time::Instant;

use crate::document::{Document, DocumentHeader, generate_uid};
use crate::enums::{FramePositioning, GroupKind};
use crate::error::{ParametricMapError, Result};
use crate::frame_codec::{encode_frame, write_slice};
use crate::functional_groups::{FunctionalGroup, PlanePosition};
use crate::geometry::{
    SLICE_SPACING_TOLERANCE, compute_shared_geometry, reconcile_declared_spacing,
    resolve_geometry_from_document,
};
use crate::metadata::MetaDescription;
use crate::synthesizer::{
    build_content_identification, build_equipment, build_frame_anatomy, build_frame_type,
    build_real_world_value_mapping, compute_mapped_range,
};
use crate::volume::Volume;

pub const DEFAULT_MODALITY: &str = "MR";
pub const CONTENT_QUALIFICATION: &str = "RESEARCH";

/// Knobs for [`assemble_with_options`].
#[derive(Debug, Clone, Default)]
pub struct AssembleOptions {
    pub positioning: FramePositioning,
    /// Overrides the modality of the metadata description.
    pub modality: Option<String>,
    /// Content and series date/time. Defaults to the time of assembly.
    pub content_date_time: Option<NaiveDateTime>,
    pub study_instance_uid: Option<String>,
    pub frame_of_reference_uid: Option<String>,
    /// Used when the metadata description names no body part.
    pub body_part_examined: Option<String>,
}

/// Build a parametric map document from a volume.
pub fn assemble(volume: &Volume, meta: &MetaDescription) -> Result<Document> {
    assemble_with_options(volume, meta, &AssembleOptions::default())
}

pub fn assemble_with_options(
    volume: &Volume,
    meta: &MetaDescription,
    options: &AssembleOptions,
) -> Result<Document> {
    let start = Instant::now();
    let (depth, height, width) = volume.dim();
    if depth == 0 || height == 0 || width == 0 {
        return Err(ParametricMapError::GeometryInconsistent(format!(
            "cannot encode an empty {width}x{height}x{depth} volume"
        )));
    }
    info!("Input image size: {}x{}x{}", width, height, depth);

    let (min, max) = compute_mapped_range(volume);

    let geometry = compute_shared_geometry(volume);
    debug!("Directions: {:?}", volume.direction);

    let rwvm = build_real_world_value_mapping(meta, min as f64, max as f64)?;
    let frame_type = build_frame_type(meta);

    let mut document = Document::new(build_header(meta, options, &frame_type), height, width);
    document.add_for_all_frames(geometry.pixel_measures())?;
    document.add_for_all_frames(geometry.plane_orientation())?;
    document.add_for_all_frames(FunctionalGroup::FrameAnatomy(build_frame_anatomy(meta)))?;
    document.add_for_all_frames(FunctionalGroup::IdentityPixelValueTransformation)?;
    document.add_for_all_frames(FunctionalGroup::FrameType(frame_type))?;
    document.add_for_all_frames(FunctionalGroup::RealWorldValueMapping(rwvm))?;

    let frames = (0..depth)
        .into_par_iter()
        .map(|index| encode_frame(volume, index, options.positioning))
        .collect::<Result<Vec<_>>>()?;
    for frame in frames {
        document.add_frame(frame)?;
    }

    debug!("Assembled {} frames in {:?}", depth, start.elapsed());
    Ok(document)
}

fn build_header(meta: &MetaDescription, options: &AssembleOptions, frame_type: &str) -> DocumentHeader {
    let now = options
        .content_date_time
        .unwrap_or_else(|| Local::now().naive_local());
    let date = now.format("%Y%m%d").to_string();
    let time = now.format("%H%M%S").to_string();

    DocumentHeader {
        sop_instance_uid: generate_uid(),
        series_instance_uid: generate_uid(),
        study_instance_uid: options
            .study_instance_uid
            .clone()
            .unwrap_or_else(generate_uid),
        frame_of_reference_uid: options
            .frame_of_reference_uid
            .clone()
            .unwrap_or_else(generate_uid),
        modality: options
            .modality
            .clone()
            .or_else(|| meta.modality.clone())
            .unwrap_or_else(|| DEFAULT_MODALITY.to_string()),
        series_number: meta.series_number.clone(),
        series_description: meta.series_description.clone(),
        body_part_examined: meta
            .body_part_examined
            .clone()
            .filter(|b| !b.is_empty())
            .or_else(|| options.body_part_examined.clone())
            .filter(|b| !b.is_empty()),
        series_date: date.clone(),
        series_time: time.clone(),
        content_date: date,
        content_time: time,
        image_type: frame_type.to_string(),
        content_qualification: CONTENT_QUALIFICATION.to_string(),
        equipment: build_equipment(),
        content: build_content_identification(meta),
        dimension_organization: Default::default(),
    }
}

/// Rebuild the volume carried by a parametric map document.
pub fn disassemble(document: &Document) -> Result<Volume> {
    let start = Instant::now();
    let frame_count = document.number_of_frames();
    let (rows, columns) = (document.rows, document.columns);
    if frame_count == 0 || rows == 0 || columns == 0 {
        return Err(ParametricMapError::MalformedDocument(format!(
            "document has {frame_count} frames of {columns}x{rows}"
        )));
    }

    let order = frame_order(document)?;
    let positions = order
        .iter()
        .map(|&frame| match document.group(frame, GroupKind::PlanePosition) {
            Some(FunctionalGroup::PlanePosition(position)) => Ok(position.clone()),
            _ => Err(ParametricMapError::missing_for_frame(GroupKind::PlanePosition, frame)),
        })
        .collect::<Result<Vec<PlanePosition>>>()?;

    let orientation = match document.group(order[0], GroupKind::PlaneOrientation) {
        Some(FunctionalGroup::PlaneOrientation(orientation)) => orientation,
        _ => return Err(ParametricMapError::missing_shared(GroupKind::PlaneOrientation)),
    };
    let geometry = resolve_geometry_from_document(orientation, &positions)?;

    let measures = match document.group(order[0], GroupKind::PixelMeasures) {
        Some(FunctionalGroup::PixelMeasures(measures)) => measures,
        _ => return Err(ParametricMapError::missing_shared(GroupKind::PixelMeasures)),
    };
    let (row_spacing, column_spacing) = measures.pixel_spacing_values()?;
    let slice_spacing = reconcile_declared_spacing(
        measures.declared_slice_spacing()?,
        geometry.slice_spacing,
        SLICE_SPACING_TOLERANCE,
    );

    let mut data = allocate(frame_count, rows, columns)?;
    let frames = document.frames();
    data.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .try_for_each(|(slot, slice)| write_slice(&frames[order[slot]].pixels, slot, slice))?;

    info!("Output image size: {}x{}x{}", columns, rows, frame_count);
    debug!("Disassembled {} frames in {:?}", frame_count, start.elapsed());
    Ok(Volume {
        data,
        spacing: (column_spacing, row_spacing, slice_spacing.value),
        direction: geometry.direction,
        origin: geometry.origin,
    })
}

/// Storage index of each frame, ordered by dimension index value.
fn frame_order(document: &Document) -> Result<Vec<usize>> {
    let frame_count = document.number_of_frames();
    let mut slots = vec![None; frame_count];

    for frame in 0..frame_count {
        let content = match document.group(frame, GroupKind::FrameContent) {
            Some(FunctionalGroup::FrameContent(content)) => content,
            _ => return Err(ParametricMapError::missing_for_frame(GroupKind::FrameContent, frame)),
        };
        let index = content.dimension_index_values.first().copied().unwrap_or(0) as usize;
        if index == 0 || index > frame_count {
            return Err(ParametricMapError::MalformedDocument(format!(
                "frame {frame} has dimension index {index}, expected 1..={frame_count}"
            )));
        }
        if let Some(other) = slots[index - 1].replace(frame) {
            return Err(ParametricMapError::MalformedDocument(format!(
                "frames {other} and {frame} share dimension index {index}"
            )));
        }
    }

    // Every slot is filled: frame_count indices, all distinct, all in range.
    Ok(slots.into_iter().flatten().collect())
}

fn allocate(depth: usize, rows: usize, columns: usize) -> Result<Array3<f32>> {
    let len = depth
        .checked_mul(rows)
        .and_then(|n| n.checked_mul(columns))
        .ok_or_else(|| {
            ParametricMapError::AllocationFailure(format!(
                "{columns}x{rows}x{depth} volume overflows"
            ))
        })?;
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|e| ParametricMapError::AllocationFailure(e.to_string()))?;
    buffer.resize(len, 0.0_f32);
    Array3::from_shape_vec((depth, rows, columns), buffer)
        .map_err(|e| ParametricMapError::AllocationFailure(e.to_string()))
}
