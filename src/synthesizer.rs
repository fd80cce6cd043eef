//! Descriptive blocks derived from the metadata description and the pixel
//! statistics of the volume.

use crate::document::{ContentIdentification, Equipment};
use crate::enums::Laterality;
use crate::error::{ParametricMapError, Result};
use crate::functional_groups::{FrameAnatomy, RealWorldValueMapping};
use crate::metadata::{CodedConcept, MetaDescription};
use crate::volume::Volume;

pub const DEFAULT_DERIVED_PIXEL_CONTRAST: &str = "NONE";
pub const FRAME_TYPE_PREFIX: [&str; 3] = ["DERIVED", "PRIMARY", "VOLUME"];
pub const DEFAULT_CONTENT_LABEL: &str = "PARAMETRIC_MAP";
pub const DEFAULT_CONTENT_CREATOR: &str = "dicom-paramap";

pub fn default_anatomic_region() -> CodedConcept {
    CodedConcept::new("T-D0050", "SRT", "Tissue")
}

pub fn default_measurement_units() -> CodedConcept {
    CodedConcept::new("1", "UCUM", "no units")
}

/// Concept name of the quantity definition content item.
pub fn quantity_concept_name() -> CodedConcept {
    CodedConcept::new("G-C1C6", "SRT", "Quantity")
}

/// Minimum and maximum pixel value. NaN voxels are ignored; a volume without
/// any finite voxel yields `(0.0, 0.0)`.
pub fn compute_mapped_range(volume: &Volume) -> (f32, f32) {
    let (min, max) = volume
        .data()
        .iter()
        .filter(|v| !v.is_nan())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), &v| {
            (min.min(v), max.max(v))
        });
    if min > max { (0.0, 0.0) } else { (min, max) }
}

fn parse_numeric(value: Option<&str>, name: &str, default: f64) -> Result<f64> {
    let Some(text) = value else {
        return Ok(default);
    };
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParametricMapError::MalformedMetadata(format!("{name} is not numeric: {text:?}")))
}

pub fn build_real_world_value_mapping(
    meta: &MetaDescription,
    min: f64,
    max: f64,
) -> Result<RealWorldValueMapping> {
    let slope = parse_numeric(meta.real_world_value_slope.as_deref(), "RealWorldValueSlope", 1.0)?;
    let intercept = parse_numeric(
        meta.real_world_value_intercept.as_deref(),
        "RealWorldValueIntercept",
        0.0,
    )?;
    let measurement_units = meta
        .measurement_units_code
        .clone()
        .unwrap_or_else(default_measurement_units);

    Ok(RealWorldValueMapping {
        slope,
        intercept,
        first_value_mapped: min,
        last_value_mapped: max,
        lut_explanation: measurement_units.meaning.clone(),
        lut_label: measurement_units.value.clone(),
        measurement_units,
        quantity: meta.quantity_value_code.clone(),
    })
}

pub fn build_frame_anatomy(meta: &MetaDescription) -> FrameAnatomy {
    FrameAnatomy {
        anatomic_region: meta
            .anatomic_region_code
            .clone()
            .unwrap_or_else(default_anatomic_region),
        laterality: Laterality::Unpaired,
    }
}

pub fn derived_pixel_contrast(meta: &MetaDescription) -> &str {
    meta.derived_pixel_contrast
        .as_deref()
        .unwrap_or(DEFAULT_DERIVED_PIXEL_CONTRAST)
}

pub fn build_frame_type(meta: &MetaDescription) -> String {
    let mut fields = FRAME_TYPE_PREFIX.to_vec();
    fields.push(derived_pixel_contrast(meta));
    fields.join("\\")
}

pub fn build_equipment() -> Equipment {
    Equipment {
        manufacturer: "dicom-rs".to_string(),
        manufacturer_model_name: env!("CARGO_PKG_NAME").to_string(),
        device_serial_number: "0".to_string(),
        software_versions: env!("CARGO_PKG_VERSION").to_string(),
    }
}

pub fn build_content_identification(meta: &MetaDescription) -> ContentIdentification {
    ContentIdentification {
        instance_number: meta.instance_number.clone(),
        content_label: meta
            .content_label
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTENT_LABEL.to_string()),
        content_description: meta.content_description.clone(),
        content_creator_name: meta
            .content_creator_name
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTENT_CREATOR.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn mapped_range_covers_all_voxels() {
        let volume = Volume::new(
            array![[[1.5, -2.0], [f32::NAN, 0.0]], [[7.25, 3.0], [-0.5, 2.0]]],
            (1.0, 1.0, 1.0),
        );
        assert_eq!(compute_mapped_range(&volume), (-2.0, 7.25));
    }

    #[test]
    fn mapped_range_of_nan_volume_is_zero() {
        let volume = Volume::new(array![[[f32::NAN]]], (1.0, 1.0, 1.0));
        assert_eq!(compute_mapped_range(&volume), (0.0, 0.0));
    }

    #[test]
    fn real_world_value_mapping_from_metadata() {
        let mut meta = MetaDescription::new("1", "1");
        meta.real_world_value_slope = Some("0.001".into());
        meta.real_world_value_intercept = Some("-5".into());
        meta.measurement_units_code = Some(CodedConcept::new("mm2/s", "UCUM", "mm2/s"));
        meta.quantity_value_code = Some(CodedConcept::new(
            "113041",
            "DCM",
            "Apparent Diffusion Coefficient",
        ));

        let rwvm = build_real_world_value_mapping(&meta, -1.0, 250.0).unwrap();
        assert_eq!(rwvm.slope, 0.001);
        assert_eq!(rwvm.intercept, -5.0);
        assert_eq!((rwvm.first_value_mapped, rwvm.last_value_mapped), (-1.0, 250.0));
        assert_eq!(rwvm.lut_label, "mm2/s");
        assert_eq!(rwvm.lut_explanation, "mm2/s");
        assert_eq!(rwvm.quantity.unwrap().value, "113041");
    }

    #[test]
    fn missing_units_fall_back_to_unitless() {
        let rwvm = build_real_world_value_mapping(&MetaDescription::new("1", "1"), 0.0, 1.0).unwrap();
        assert_eq!(rwvm.slope, 1.0);
        assert_eq!(rwvm.intercept, 0.0);
        assert_eq!(rwvm.measurement_units, default_measurement_units());
        assert_eq!(rwvm.lut_label, "1");
        assert_eq!(rwvm.lut_explanation, "no units");
        assert!(rwvm.quantity.is_none());
    }

    #[test]
    fn non_numeric_slope_is_malformed() {
        let mut meta = MetaDescription::new("1", "1");
        meta.real_world_value_slope = Some("steep".into());
        let err = build_real_world_value_mapping(&meta, 0.0, 1.0).unwrap_err();
        assert!(matches!(err, ParametricMapError::MalformedMetadata(_)));
    }

    #[test]
    fn frame_anatomy_defaults_to_tissue() {
        let anatomy = build_frame_anatomy(&MetaDescription::new("1", "1"));
        assert_eq!(
            anatomy.anatomic_region,
            CodedConcept::new("T-D0050", "SRT", "Tissue")
        );
        assert_eq!(anatomy.laterality, Laterality::Unpaired);

        let mut meta = MetaDescription::new("1", "1");
        meta.anatomic_region_code = Some(CodedConcept::new("T-9200B", "SRT", "Prostate"));
        assert_eq!(
            build_frame_anatomy(&meta).anatomic_region.meaning,
            "Prostate"
        );
    }

    #[test]
    fn frame_type_ends_with_pixel_contrast() {
        let mut meta = MetaDescription::new("1", "1");
        assert_eq!(build_frame_type(&meta), "DERIVED\\PRIMARY\\VOLUME\\NONE");

        meta.derived_pixel_contrast = Some("ADC".into());
        let frame_type = build_frame_type(&meta);
        assert_eq!(frame_type.split('\\').count(), 4);
        assert_eq!(frame_type.rsplit('\\').next(), Some("ADC"));
    }

    #[test]
    fn content_identification_defaults() {
        let content = build_content_identification(&MetaDescription::new("10", "3"));
        assert_eq!(content.instance_number, "3");
        assert_eq!(content.content_label, DEFAULT_CONTENT_LABEL);
        assert_eq!(content.content_creator_name, DEFAULT_CONTENT_CREATOR);
        assert!(content.content_description.is_none());
    }
}
