use thiserror::Error;

use crate::enums::GroupKind;

pub type Result<T, E = ParametricMapError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ParametricMapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM read error: {0}")]
    DicomRead(#[from] dicom::object::ReadError),

    #[error("DICOM write error: {0}")]
    DicomWrite(#[from] dicom::object::WriteError),

    #[error("Could not build file meta table: {0}")]
    MetaTable(#[from] dicom::object::meta::Error),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Missing {group} functional group{}", .frame.map(|f| format!(" for frame {f}")).unwrap_or_default())]
    MissingFunctionalGroup {
        group: GroupKind,
        frame: Option<usize>,
    },

    #[error("Inconsistent geometry: {0}")]
    GeometryInconsistent(String),

    #[error("Malformed metadata: {0}")]
    MalformedMetadata(String),

    #[error("Malformed volume file: {0}")]
    MalformedVolumeFile(String),

    #[error("Allocation failure: {0}")]
    AllocationFailure(String),
}

impl ParametricMapError {
    pub(crate) fn missing_shared(group: GroupKind) -> Self {
        Self::MissingFunctionalGroup { group, frame: None }
    }

    pub(crate) fn missing_for_frame(group: GroupKind, frame: usize) -> Self {
        Self::MissingFunctionalGroup {
            group,
            frame: Some(frame),
        }
    }
}
