use std::fmt;

/// Whether a functional group is stored once for all frames or once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Shared,
    PerFrame,
}

/// The functional group kinds a parametric map carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKind {
    PixelMeasures,
    PlaneOrientation,
    PlanePosition,
    FrameContent,
    FrameAnatomy,
    FrameType,
    IdentityPixelValueTransformation,
    RealWorldValueMapping,
}

impl GroupKind {
    pub const ALL: [GroupKind; 8] = [
        GroupKind::PixelMeasures,
        GroupKind::PlaneOrientation,
        GroupKind::PlanePosition,
        GroupKind::FrameContent,
        GroupKind::FrameAnatomy,
        GroupKind::FrameType,
        GroupKind::IdentityPixelValueTransformation,
        GroupKind::RealWorldValueMapping,
    ];

    pub fn cardinality(self) -> Cardinality {
        match self {
            GroupKind::PlanePosition | GroupKind::FrameContent => Cardinality::PerFrame,
            _ => Cardinality::Shared,
        }
    }

    /// DICOM keyword of the sequence holding this group inside a functional
    /// groups item.
    pub fn keyword(self) -> &'static str {
        match self {
            GroupKind::PixelMeasures => "PixelMeasuresSequence",
            GroupKind::PlaneOrientation => "PlaneOrientationSequence",
            GroupKind::PlanePosition => "PlanePositionSequence",
            GroupKind::FrameContent => "FrameContentSequence",
            GroupKind::FrameAnatomy => "FrameAnatomySequence",
            GroupKind::FrameType => "ParametricMapFrameTypeSequence",
            GroupKind::IdentityPixelValueTransformation => "PixelValueTransformationSequence",
            GroupKind::RealWorldValueMapping => "RealWorldValueMappingSequence",
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// How the per-frame plane position is filled in when encoding.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FramePositioning {
    /// Physical position of the first voxel of the frame, derived from the
    /// volume origin, slice spacing and slice direction.
    #[default]
    Patient,
    /// `(0, 0, frame_index)`, leaving the physical placement to the shared
    /// geometry.
    IndexPlaceholder,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Laterality {
    Right,
    Left,
    #[default]
    Unpaired,
    Both,
}

impl Laterality {
    pub fn code(self) -> &'static str {
        match self {
            Laterality::Right => "R",
            Laterality::Left => "L",
            Laterality::Unpaired => "U",
            Laterality::Both => "B",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "R" => Some(Laterality::Right),
            "L" => Some(Laterality::Left),
            "U" => Some(Laterality::Unpaired),
            "B" => Some(Laterality::Both),
            _ => None,
        }
    }
}
