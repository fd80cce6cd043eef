use uuid::Uuid;

use crate::enums::{Cardinality, GroupKind};
use crate::error::{ParametricMapError, Result};
use crate::functional_groups::{FunctionalGroup, GroupSet};

pub const PARAMETRIC_MAP_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.30";
pub const DIMENSION_DESCRIPTION: &str = "Frame position";

/// Generate a UID under the `2.25` root from a random UUID.
pub fn generate_uid() -> String {
    format!("2.25.{}", Uuid::new_v4().as_u128())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Equipment {
    pub manufacturer: String,
    pub manufacturer_model_name: String,
    pub device_serial_number: String,
    pub software_versions: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentIdentification {
    pub instance_number: String,
    pub content_label: String,
    pub content_description: Option<String>,
    pub content_creator_name: String,
}

/// Frames are indexed along a single dimension, the plane position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionOrganization {
    pub uid: String,
    pub description_label: String,
}

impl Default for DimensionOrganization {
    fn default() -> Self {
        Self {
            uid: generate_uid(),
            description_label: DIMENSION_DESCRIPTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentHeader {
    pub sop_instance_uid: String,
    pub series_instance_uid: String,
    pub study_instance_uid: String,
    pub frame_of_reference_uid: String,
    pub modality: String,
    pub series_number: String,
    pub series_description: Option<String>,
    pub body_part_examined: Option<String>,
    pub series_date: String,
    pub series_time: String,
    pub content_date: String,
    pub content_time: String,
    pub image_type: String,
    pub content_qualification: String,
    pub equipment: Equipment,
    pub content: ContentIdentification,
    pub dimension_organization: DimensionOrganization,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub pixels: Vec<f32>,
    pub groups: GroupSet,
}

/// A multi-frame parametric map: shared functional groups plus frames in
/// storage order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub header: DocumentHeader,
    pub rows: usize,
    pub columns: usize,
    shared: GroupSet,
    frames: Vec<Frame>,
}

impl Document {
    pub fn new(header: DocumentHeader, rows: usize, columns: usize) -> Self {
        Self {
            header,
            rows,
            columns,
            shared: GroupSet::new(),
            frames: Vec::new(),
        }
    }

    pub fn number_of_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn frame_size(&self) -> usize {
        self.rows * self.columns
    }

    pub fn shared(&self) -> &GroupSet {
        &self.shared
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Add a group that applies to every frame.
    pub fn add_for_all_frames(&mut self, group: FunctionalGroup) -> Result<()> {
        if group.cardinality() == Cardinality::PerFrame {
            return Err(ParametricMapError::MalformedDocument(format!(
                "{} cannot be shared by all frames",
                group.kind()
            )));
        }
        self.shared.insert(group);
        Ok(())
    }

    /// Store a shared group as found in an existing document, whatever its
    /// usual cardinality.
    pub(crate) fn insert_shared(&mut self, group: FunctionalGroup) {
        self.shared.insert(group);
    }

    pub fn add_frame(&mut self, frame: Frame) -> Result<()> {
        if frame.pixels.len() != self.frame_size() {
            return Err(ParametricMapError::MalformedDocument(format!(
                "frame {} has {} pixels, expected {}x{}",
                self.frames.len(),
                frame.pixels.len(),
                self.rows,
                self.columns
            )));
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Look up a group for a frame, per-frame groups taking precedence over
    /// shared ones.
    pub fn group(&self, frame: usize, kind: GroupKind) -> Option<&FunctionalGroup> {
        self.frames
            .get(frame)
            .and_then(|f| f.groups.get(kind))
            .or_else(|| self.shared.get(kind))
    }
}
