//! Functional groups of a multi-frame parametric map.
//!
//! Each group kind has a natural [`Cardinality`]. A [`GroupSet`] holds at
//! most one group of each kind, so inserting a group of a kind already
//! present replaces it.

use crate::enums::{Cardinality, GroupKind, Laterality};
use crate::error::{ParametricMapError, Result};
use crate::metadata::CodedConcept;

#[derive(Debug, Clone, PartialEq)]
pub struct PixelMeasures {
    /// Row spacing and column spacing, as DS strings.
    pub pixel_spacing: [String; 2],
    pub spacing_between_slices: Option<String>,
    pub slice_thickness: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaneOrientation {
    /// Row direction cosines followed by column direction cosines.
    pub image_orientation: [String; 6],
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanePosition {
    pub image_position: [String; 3],
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameContent {
    /// 1-based dimension index values, one per dimension.
    pub dimension_index_values: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameAnatomy {
    pub anatomic_region: CodedConcept,
    pub laterality: Laterality,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RealWorldValueMapping {
    pub slope: f64,
    pub intercept: f64,
    pub first_value_mapped: f64,
    pub last_value_mapped: f64,
    pub lut_explanation: String,
    pub lut_label: String,
    pub measurement_units: CodedConcept,
    pub quantity: Option<CodedConcept>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionalGroup {
    PixelMeasures(PixelMeasures),
    PlaneOrientation(PlaneOrientation),
    PlanePosition(PlanePosition),
    FrameContent(FrameContent),
    FrameAnatomy(FrameAnatomy),
    FrameType(String),
    /// Rescale slope 1, intercept 0, rescale type `US`.
    IdentityPixelValueTransformation,
    RealWorldValueMapping(RealWorldValueMapping),
}

impl FunctionalGroup {
    pub fn kind(&self) -> GroupKind {
        match self {
            FunctionalGroup::PixelMeasures(_) => GroupKind::PixelMeasures,
            FunctionalGroup::PlaneOrientation(_) => GroupKind::PlaneOrientation,
            FunctionalGroup::PlanePosition(_) => GroupKind::PlanePosition,
            FunctionalGroup::FrameContent(_) => GroupKind::FrameContent,
            FunctionalGroup::FrameAnatomy(_) => GroupKind::FrameAnatomy,
            FunctionalGroup::FrameType(_) => GroupKind::FrameType,
            FunctionalGroup::IdentityPixelValueTransformation => {
                GroupKind::IdentityPixelValueTransformation
            }
            FunctionalGroup::RealWorldValueMapping(_) => GroupKind::RealWorldValueMapping,
        }
    }

    pub fn cardinality(&self) -> Cardinality {
        self.kind().cardinality()
    }
}

/// Equality ignores insertion order.
#[derive(Debug, Clone, Default)]
pub struct GroupSet {
    groups: Vec<FunctionalGroup>,
}

impl PartialEq for GroupSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|g| other.get(g.kind()) == Some(g))
    }
}

impl GroupSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a group, returning the one of the same kind it replaced.
    pub fn insert(&mut self, group: FunctionalGroup) -> Option<FunctionalGroup> {
        let kind = group.kind();
        match self.groups.iter_mut().find(|g| g.kind() == kind) {
            Some(slot) => Some(std::mem::replace(slot, group)),
            None => {
                self.groups.push(group);
                None
            }
        }
    }

    pub fn get(&self, kind: GroupKind) -> Option<&FunctionalGroup> {
        self.groups.iter().find(|g| g.kind() == kind)
    }

    pub fn contains(&self, kind: GroupKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FunctionalGroup> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn pixel_measures(&self) -> Option<&PixelMeasures> {
        match self.get(GroupKind::PixelMeasures)? {
            FunctionalGroup::PixelMeasures(g) => Some(g),
            _ => None,
        }
    }

    pub fn plane_orientation(&self) -> Option<&PlaneOrientation> {
        match self.get(GroupKind::PlaneOrientation)? {
            FunctionalGroup::PlaneOrientation(g) => Some(g),
            _ => None,
        }
    }

    pub fn plane_position(&self) -> Option<&PlanePosition> {
        match self.get(GroupKind::PlanePosition)? {
            FunctionalGroup::PlanePosition(g) => Some(g),
            _ => None,
        }
    }

    pub fn frame_content(&self) -> Option<&FrameContent> {
        match self.get(GroupKind::FrameContent)? {
            FunctionalGroup::FrameContent(g) => Some(g),
            _ => None,
        }
    }

    pub fn frame_anatomy(&self) -> Option<&FrameAnatomy> {
        match self.get(GroupKind::FrameAnatomy)? {
            FunctionalGroup::FrameAnatomy(g) => Some(g),
            _ => None,
        }
    }

    pub fn frame_type(&self) -> Option<&str> {
        match self.get(GroupKind::FrameType)? {
            FunctionalGroup::FrameType(g) => Some(g),
            _ => None,
        }
    }

    pub fn real_world_value_mapping(&self) -> Option<&RealWorldValueMapping> {
        match self.get(GroupKind::RealWorldValueMapping)? {
            FunctionalGroup::RealWorldValueMapping(g) => Some(g),
            _ => None,
        }
    }
}

impl FromIterator<FunctionalGroup> for GroupSet {
    fn from_iter<T: IntoIterator<Item = FunctionalGroup>>(iter: T) -> Self {
        let mut set = GroupSet::new();
        for group in iter {
            set.insert(group);
        }
        set
    }
}

pub(crate) fn parse_ds(value: &str, what: &str) -> Result<f64> {
    value.trim().parse::<f64>().map_err(|_| {
        ParametricMapError::MalformedDocument(format!("{what} is not a decimal string: {value:?}"))
    })
}

impl PixelMeasures {
    /// `(row spacing, column spacing)`.
    pub fn pixel_spacing_values(&self) -> Result<(f64, f64)> {
        Ok((
            parse_ds(&self.pixel_spacing[0], "PixelSpacing")?,
            parse_ds(&self.pixel_spacing[1], "PixelSpacing")?,
        ))
    }

    /// Declared slice spacing, preferring SpacingBetweenSlices over
    /// SliceThickness.
    pub fn declared_slice_spacing(&self) -> Result<Option<f64>> {
        self.spacing_between_slices
            .as_deref()
            .or(self.slice_thickness.as_deref())
            .map(|v| parse_ds(v, "SpacingBetweenSlices"))
            .transpose()
    }
}

impl PlaneOrientation {
    pub fn cosines(&self) -> Result<([f64; 3], [f64; 3])> {
        let mut values = [0.0; 6];
        for (value, text) in values.iter_mut().zip(&self.image_orientation) {
            *value = parse_ds(text, "ImageOrientationPatient")?;
        }
        Ok((
            [values[0], values[1], values[2]],
            [values[3], values[4], values[5]],
        ))
    }
}

impl PlanePosition {
    pub fn position(&self) -> Result<[f64; 3]> {
        let mut values = [0.0; 3];
        for (value, text) in values.iter_mut().zip(&self.image_position) {
            *value = parse_ds(text, "ImagePositionPatient")?;
        }
        Ok(values)
    }
}
