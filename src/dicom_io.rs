//! Encoding of a [`Document`] as a DICOM Parametric Map dataset, and back.

use std::path::Path;

use dicom::core::value::{C, DataSetSequence, Value};
use dicom::core::{DataElement, Length, PrimitiveValue, Tag, VR};
use dicom::dictionary_std::StandardDataDictionary;
use dicom::object::mem::InMemElement;
use dicom::object::{
    DefaultDicomObject, FileDicomObject, FileMetaTableBuilder, InMemDicomObject, open_file,
};
use dicom::transfer_syntax::entries::EXPLICIT_VR_LITTLE_ENDIAN;
use tracing::info;

use crate::assembler::AssembleOptions;
use crate::document::{
    ContentIdentification, DimensionOrganization, Document, DocumentHeader, Equipment, Frame,
    PARAMETRIC_MAP_STORAGE,
};
use crate::enums::{GroupKind, Laterality};
use crate::error::{ParametricMapError, Result};
use crate::functional_groups::{
    FrameAnatomy, FrameContent, FunctionalGroup, GroupSet, PixelMeasures, PlaneOrientation,
    PlanePosition, RealWorldValueMapping,
};
use crate::metadata::CodedConcept;
use crate::synthesizer::quantity_concept_name;
use crate::tags;

type Element = InMemElement<StandardDataDictionary>;

/// Patient and study attributes carried over from a source dataset, written
/// empty when there is none.
const PATIENT_STUDY_ATTRIBUTES: [(Tag, VR); 10] = [
    (tags::PATIENT_NAME, VR::PN),
    (tags::PATIENT_ID, VR::LO),
    (tags::PATIENT_BIRTH_DATE, VR::DA),
    (tags::PATIENT_SEX, VR::CS),
    (tags::STUDY_DATE, VR::DA),
    (tags::STUDY_TIME, VR::TM),
    (tags::STUDY_ID, VR::SH),
    (tags::ACCESSION_NUMBER, VR::SH),
    (tags::REFERRING_PHYSICIAN_NAME, VR::PN),
    (tags::STUDY_DESCRIPTION, VR::LO),
];

fn group_tag(kind: GroupKind) -> Tag {
    match kind {
        GroupKind::PixelMeasures => tags::PIXEL_MEASURES_SEQUENCE,
        GroupKind::PlaneOrientation => tags::PLANE_ORIENTATION_SEQUENCE,
        GroupKind::PlanePosition => tags::PLANE_POSITION_SEQUENCE,
        GroupKind::FrameContent => tags::FRAME_CONTENT_SEQUENCE,
        GroupKind::FrameAnatomy => tags::FRAME_ANATOMY_SEQUENCE,
        GroupKind::FrameType => tags::PARAMETRIC_MAP_FRAME_TYPE_SEQUENCE,
        GroupKind::IdentityPixelValueTransformation => tags::PIXEL_VALUE_TRANSFORMATION_SEQUENCE,
        GroupKind::RealWorldValueMapping => tags::REAL_WORLD_VALUE_MAPPING_SEQUENCE,
    }
}

fn text(tag: Tag, vr: VR, value: &str) -> Element {
    DataElement::new(tag, vr, PrimitiveValue::from(value))
}

fn multi_text<S: AsRef<str>>(tag: Tag, vr: VR, values: &[S]) -> Element {
    DataElement::new(
        tag,
        vr,
        PrimitiveValue::Strs(values.iter().map(|v| v.as_ref().to_string()).collect()),
    )
}

fn sequence(tag: Tag, items: Vec<InMemDicomObject>) -> Element {
    DataElement::new(
        tag,
        VR::SQ,
        Value::Sequence(DataSetSequence::new(items, Length::UNDEFINED)),
    )
}

fn code_item(code: &CodedConcept) -> InMemDicomObject {
    InMemDicomObject::from_element_iter([
        text(tags::CODE_VALUE, VR::SH, &code.value),
        text(tags::CODING_SCHEME_DESIGNATOR, VR::SH, &code.scheme),
        text(tags::CODE_MEANING, VR::LO, &code.meaning),
    ])
}

fn encode_group(group: &FunctionalGroup) -> Element {
    let elements = match group {
        FunctionalGroup::PixelMeasures(measures) => {
            let mut elements = vec![multi_text(tags::PIXEL_SPACING, VR::DS, &measures.pixel_spacing)];
            if let Some(spacing) = &measures.spacing_between_slices {
                elements.push(text(tags::SPACING_BETWEEN_SLICES, VR::DS, spacing));
            }
            if let Some(thickness) = &measures.slice_thickness {
                elements.push(text(tags::SLICE_THICKNESS, VR::DS, thickness));
            }
            elements
        }
        FunctionalGroup::PlaneOrientation(orientation) => vec![multi_text(
            tags::IMAGE_ORIENTATION_PATIENT,
            VR::DS,
            &orientation.image_orientation,
        )],
        FunctionalGroup::PlanePosition(position) => vec![multi_text(
            tags::IMAGE_POSITION_PATIENT,
            VR::DS,
            &position.image_position,
        )],
        FunctionalGroup::FrameContent(content) => vec![DataElement::new(
            tags::DIMENSION_INDEX_VALUES,
            VR::UL,
            PrimitiveValue::U32(content.dimension_index_values.iter().copied().collect()),
        )],
        FunctionalGroup::FrameAnatomy(anatomy) => vec![
            sequence(
                tags::ANATOMIC_REGION_SEQUENCE,
                vec![code_item(&anatomy.anatomic_region)],
            ),
            text(tags::FRAME_LATERALITY, VR::CS, anatomy.laterality.code()),
        ],
        FunctionalGroup::FrameType(frame_type) => {
            let values: Vec<&str> = frame_type.split('\\').collect();
            vec![multi_text(tags::FRAME_TYPE, VR::CS, &values)]
        }
        FunctionalGroup::IdentityPixelValueTransformation => vec![
            text(tags::RESCALE_INTERCEPT, VR::DS, "0"),
            text(tags::RESCALE_SLOPE, VR::DS, "1"),
            text(tags::RESCALE_TYPE, VR::LO, "US"),
        ],
        FunctionalGroup::RealWorldValueMapping(rwvm) => {
            let mut elements = vec![
                text(tags::LUT_EXPLANATION, VR::LO, &rwvm.lut_explanation),
                text(tags::LUT_LABEL, VR::SH, &rwvm.lut_label),
                sequence(
                    tags::MEASUREMENT_UNITS_CODE_SEQUENCE,
                    vec![code_item(&rwvm.measurement_units)],
                ),
                DataElement::new(
                    tags::DOUBLE_FLOAT_REAL_WORLD_VALUE_FIRST_VALUE_MAPPED,
                    VR::FD,
                    PrimitiveValue::from(rwvm.first_value_mapped),
                ),
                DataElement::new(
                    tags::DOUBLE_FLOAT_REAL_WORLD_VALUE_LAST_VALUE_MAPPED,
                    VR::FD,
                    PrimitiveValue::from(rwvm.last_value_mapped),
                ),
                DataElement::new(
                    tags::REAL_WORLD_VALUE_INTERCEPT,
                    VR::FD,
                    PrimitiveValue::from(rwvm.intercept),
                ),
                DataElement::new(
                    tags::REAL_WORLD_VALUE_SLOPE,
                    VR::FD,
                    PrimitiveValue::from(rwvm.slope),
                ),
            ];
            if let Some(quantity) = &rwvm.quantity {
                let item = InMemDicomObject::from_element_iter([
                    text(tags::VALUE_TYPE, VR::CS, "CODE"),
                    sequence(
                        tags::CONCEPT_NAME_CODE_SEQUENCE,
                        vec![code_item(&quantity_concept_name())],
                    ),
                    sequence(tags::CONCEPT_CODE_SEQUENCE, vec![code_item(quantity)]),
                ]);
                elements.push(sequence(tags::QUANTITY_DEFINITION_SEQUENCE, vec![item]));
            }
            elements
        }
    };

    sequence(
        group_tag(group.kind()),
        vec![InMemDicomObject::from_element_iter(elements)],
    )
}

fn encode_groups(groups: &GroupSet) -> InMemDicomObject {
    InMemDicomObject::from_element_iter(groups.iter().map(encode_group))
}

fn dimension_elements(dimension: &DimensionOrganization) -> [Element; 2] {
    let index = InMemDicomObject::from_element_iter([
        text(tags::DIMENSION_ORGANIZATION_UID, VR::UI, &dimension.uid),
        DataElement::new(
            tags::DIMENSION_INDEX_POINTER,
            VR::AT,
            PrimitiveValue::Tags([tags::IMAGE_POSITION_PATIENT].into_iter().collect()),
        ),
        DataElement::new(
            tags::FUNCTIONAL_GROUP_POINTER,
            VR::AT,
            PrimitiveValue::Tags([tags::PLANE_POSITION_SEQUENCE].into_iter().collect()),
        ),
        text(
            tags::DIMENSION_DESCRIPTION_LABEL,
            VR::LO,
            &dimension.description_label,
        ),
    ]);
    [
        sequence(
            tags::DIMENSION_ORGANIZATION_SEQUENCE,
            vec![InMemDicomObject::from_element_iter([text(
                tags::DIMENSION_ORGANIZATION_UID,
                VR::UI,
                &dimension.uid,
            )])],
        ),
        sequence(tags::DIMENSION_INDEX_SEQUENCE, vec![index]),
    ]
}

fn header_elements(header: &DocumentHeader) -> Vec<Element> {
    let image_type: Vec<&str> = header.image_type.split('\\').collect();
    let mut elements = vec![
        text(tags::SOP_CLASS_UID, VR::UI, PARAMETRIC_MAP_STORAGE),
        text(tags::SOP_INSTANCE_UID, VR::UI, &header.sop_instance_uid),
        text(tags::STUDY_INSTANCE_UID, VR::UI, &header.study_instance_uid),
        text(tags::SERIES_INSTANCE_UID, VR::UI, &header.series_instance_uid),
        text(tags::FRAME_OF_REFERENCE_UID, VR::UI, &header.frame_of_reference_uid),
        text(tags::MODALITY, VR::CS, &header.modality),
        text(tags::SERIES_NUMBER, VR::IS, &header.series_number),
        text(tags::INSTANCE_NUMBER, VR::IS, &header.content.instance_number),
        text(tags::SERIES_DATE, VR::DA, &header.series_date),
        text(tags::SERIES_TIME, VR::TM, &header.series_time),
        text(tags::CONTENT_DATE, VR::DA, &header.content_date),
        text(tags::CONTENT_TIME, VR::TM, &header.content_time),
        multi_text(tags::IMAGE_TYPE, VR::CS, &image_type),
        text(tags::CONTENT_QUALIFICATION, VR::CS, &header.content_qualification),
        text(tags::MANUFACTURER, VR::LO, &header.equipment.manufacturer),
        text(
            tags::MANUFACTURER_MODEL_NAME,
            VR::LO,
            &header.equipment.manufacturer_model_name,
        ),
        text(
            tags::DEVICE_SERIAL_NUMBER,
            VR::LO,
            &header.equipment.device_serial_number,
        ),
        text(tags::SOFTWARE_VERSIONS, VR::LO, &header.equipment.software_versions),
        text(tags::CONTENT_LABEL, VR::CS, &header.content.content_label),
        text(
            tags::CONTENT_CREATOR_NAME,
            VR::PN,
            &header.content.content_creator_name,
        ),
        text(tags::PIXEL_PRESENTATION, VR::CS, "MONOCHROME"),
        text(tags::VOLUMETRIC_PROPERTIES, VR::CS, "VOLUME"),
        text(tags::VOLUME_BASED_CALCULATION_TECHNIQUE, VR::CS, "NONE"),
    ];
    if let Some(description) = &header.series_description {
        elements.push(text(tags::SERIES_DESCRIPTION, VR::LO, description));
    }
    if let Some(body_part) = &header.body_part_examined {
        elements.push(text(tags::BODY_PART_EXAMINED, VR::CS, body_part));
    }
    if let Some(description) = &header.content.content_description {
        elements.push(text(tags::CONTENT_DESCRIPTION, VR::LO, description));
    }
    elements
}

/// Encode a document as a Parametric Map file object, explicit VR little
/// endian. Patient and study attributes are copied from `source` when given.
pub fn to_dicom_object(
    document: &Document,
    source: Option<&InMemDicomObject>,
) -> Result<DefaultDicomObject> {
    let rows = u16::try_from(document.rows)
        .map_err(|_| ParametricMapError::MalformedDocument(format!("{} rows", document.rows)))?;
    let columns = u16::try_from(document.columns).map_err(|_| {
        ParametricMapError::MalformedDocument(format!("{} columns", document.columns))
    })?;

    let meta = FileMetaTableBuilder::new()
        .transfer_syntax(EXPLICIT_VR_LITTLE_ENDIAN.uid())
        .media_storage_sop_class_uid(PARAMETRIC_MAP_STORAGE)
        .media_storage_sop_instance_uid(document.header.sop_instance_uid.as_str())
        .build()?;
    let mut obj = FileDicomObject::new_empty_with_dict_and_meta(StandardDataDictionary, meta);

    for element in header_elements(&document.header) {
        obj.put(element);
    }
    for (tag, vr) in PATIENT_STUDY_ATTRIBUTES {
        match source.and_then(|s| s.element(tag).ok()) {
            Some(element) => obj.put(element.clone()),
            None => obj.put(DataElement::new(tag, vr, PrimitiveValue::Empty)),
        };
    }
    for element in dimension_elements(&document.header.dimension_organization) {
        obj.put(element);
    }

    obj.put(DataElement::new(tags::ROWS, VR::US, PrimitiveValue::from(rows)));
    obj.put(DataElement::new(tags::COLUMNS, VR::US, PrimitiveValue::from(columns)));
    obj.put(text(
        tags::NUMBER_OF_FRAMES,
        VR::IS,
        &document.number_of_frames().to_string(),
    ));
    obj.put(DataElement::new(tags::SAMPLES_PER_PIXEL, VR::US, PrimitiveValue::from(1_u16)));
    obj.put(text(tags::PHOTOMETRIC_INTERPRETATION, VR::CS, "MONOCHROME2"));
    obj.put(DataElement::new(tags::BITS_ALLOCATED, VR::US, PrimitiveValue::from(32_u16)));

    obj.put(sequence(
        tags::SHARED_FUNCTIONAL_GROUPS_SEQUENCE,
        vec![encode_groups(document.shared())],
    ));
    obj.put(sequence(
        tags::PER_FRAME_FUNCTIONAL_GROUPS_SEQUENCE,
        document.frames().iter().map(|f| encode_groups(&f.groups)).collect(),
    ));

    let total = document.frame_size() * document.number_of_frames();
    let mut pixels = Vec::new();
    pixels
        .try_reserve_exact(total)
        .map_err(|e| ParametricMapError::AllocationFailure(e.to_string()))?;
    for frame in document.frames() {
        pixels.extend_from_slice(&frame.pixels);
    }
    obj.put(DataElement::new(
        tags::FLOAT_PIXEL_DATA,
        VR::OF,
        PrimitiveValue::F32(C::from_vec(pixels)),
    ));

    Ok(obj)
}

fn string(obj: &InMemDicomObject, tag: Tag) -> Option<String> {
    let value = obj.element(tag).ok()?.to_str().ok()?;
    let value = value.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    (!value.is_empty()).then(|| value.to_string())
}

fn strings(obj: &InMemDicomObject, tag: Tag) -> Option<Vec<String>> {
    string(obj, tag).map(|s| s.split('\\').map(|v| v.trim().to_string()).collect())
}

fn float(obj: &InMemDicomObject, tag: Tag) -> Option<f64> {
    obj.element(tag).ok()?.to_float64().ok()
}

fn first_item(obj: &InMemDicomObject, tag: Tag) -> Option<&InMemDicomObject> {
    obj.element(tag).ok()?.items()?.first()
}

fn malformed(what: impl Into<String>) -> ParametricMapError {
    ParametricMapError::MalformedDocument(what.into())
}

fn fixed<const N: usize>(obj: &InMemDicomObject, tag: Tag, name: &str) -> Result<[String; N]> {
    let values = strings(obj, tag).ok_or_else(|| malformed(format!("{name} is missing")))?;
    <[String; N]>::try_from(values)
        .map_err(|v| malformed(format!("{name} has {} values, expected {N}", v.len())))
}

fn decode_code(item: &InMemDicomObject) -> Result<CodedConcept> {
    let field = |tag, name: &str| string(item, tag).ok_or_else(|| malformed(format!("code item without {name}")));
    Ok(CodedConcept {
        value: field(tags::CODE_VALUE, "CodeValue")?,
        scheme: field(tags::CODING_SCHEME_DESIGNATOR, "CodingSchemeDesignator")?,
        meaning: field(tags::CODE_MEANING, "CodeMeaning")?,
    })
}

fn decode_group(kind: GroupKind, item: &InMemDicomObject) -> Result<FunctionalGroup> {
    let group = match kind {
        GroupKind::PixelMeasures => FunctionalGroup::PixelMeasures(PixelMeasures {
            pixel_spacing: fixed(item, tags::PIXEL_SPACING, "PixelSpacing")?,
            spacing_between_slices: string(item, tags::SPACING_BETWEEN_SLICES),
            slice_thickness: string(item, tags::SLICE_THICKNESS),
        }),
        GroupKind::PlaneOrientation => FunctionalGroup::PlaneOrientation(PlaneOrientation {
            image_orientation: fixed(item, tags::IMAGE_ORIENTATION_PATIENT, "ImageOrientationPatient")?,
        }),
        GroupKind::PlanePosition => FunctionalGroup::PlanePosition(PlanePosition {
            image_position: fixed(item, tags::IMAGE_POSITION_PATIENT, "ImagePositionPatient")?,
        }),
        GroupKind::FrameContent => {
            let values = item
                .element(tags::DIMENSION_INDEX_VALUES)
                .map_err(|_| malformed("FrameContentSequence without DimensionIndexValues"))?
                .value()
                .to_multi_int::<u32>()
                .map_err(|e| malformed(format!("DimensionIndexValues: {e}")))?;
            FunctionalGroup::FrameContent(FrameContent {
                dimension_index_values: values,
            })
        }
        GroupKind::FrameAnatomy => FunctionalGroup::FrameAnatomy(FrameAnatomy {
            anatomic_region: first_item(item, tags::ANATOMIC_REGION_SEQUENCE)
                .ok_or_else(|| malformed("FrameAnatomySequence without AnatomicRegionSequence"))
                .and_then(decode_code)?,
            laterality: string(item, tags::FRAME_LATERALITY)
                .and_then(|code| Laterality::from_code(&code))
                .unwrap_or_default(),
        }),
        GroupKind::FrameType => FunctionalGroup::FrameType(
            string(item, tags::FRAME_TYPE).ok_or_else(|| malformed("FrameType is missing"))?,
        ),
        GroupKind::IdentityPixelValueTransformation => {
            FunctionalGroup::IdentityPixelValueTransformation
        }
        GroupKind::RealWorldValueMapping => {
            let required = |candidates: &[Tag], name: &str| {
                candidates
                    .iter()
                    .find_map(|tag| float(item, *tag))
                    .ok_or_else(|| malformed(format!("RealWorldValueMapping without {name}")))
            };
            let quantity = match first_item(item, tags::QUANTITY_DEFINITION_SEQUENCE)
                .and_then(|q| first_item(q, tags::CONCEPT_CODE_SEQUENCE))
            {
                Some(code) => Some(decode_code(code)?),
                None => None,
            };
            FunctionalGroup::RealWorldValueMapping(RealWorldValueMapping {
                slope: required(&[tags::REAL_WORLD_VALUE_SLOPE], "RealWorldValueSlope")?,
                intercept: required(&[tags::REAL_WORLD_VALUE_INTERCEPT], "RealWorldValueIntercept")?,
                first_value_mapped: required(
                    &[
                        tags::DOUBLE_FLOAT_REAL_WORLD_VALUE_FIRST_VALUE_MAPPED,
                        tags::REAL_WORLD_VALUE_FIRST_VALUE_MAPPED,
                    ],
                    "first value mapped",
                )?,
                last_value_mapped: required(
                    &[
                        tags::DOUBLE_FLOAT_REAL_WORLD_VALUE_LAST_VALUE_MAPPED,
                        tags::REAL_WORLD_VALUE_LAST_VALUE_MAPPED,
                    ],
                    "last value mapped",
                )?,
                lut_explanation: string(item, tags::LUT_EXPLANATION).unwrap_or_default(),
                lut_label: string(item, tags::LUT_LABEL).unwrap_or_default(),
                measurement_units: first_item(item, tags::MEASUREMENT_UNITS_CODE_SEQUENCE)
                    .ok_or_else(|| malformed("RealWorldValueMapping without MeasurementUnitsCodeSequence"))
                    .and_then(decode_code)?,
                quantity,
            })
        }
    };
    Ok(group)
}

fn decode_groups(item: &InMemDicomObject) -> Result<GroupSet> {
    let mut groups = GroupSet::new();
    for kind in GroupKind::ALL {
        if let Some(inner) = first_item(item, group_tag(kind)) {
            groups.insert(decode_group(kind, inner)?);
        }
    }
    Ok(groups)
}

fn decode_header(obj: &InMemDicomObject) -> DocumentHeader {
    let get = |tag| string(obj, tag).unwrap_or_default();
    let dimension_uid = first_item(obj, tags::DIMENSION_ORGANIZATION_SEQUENCE)
        .and_then(|item| string(item, tags::DIMENSION_ORGANIZATION_UID));
    let dimension_label = first_item(obj, tags::DIMENSION_INDEX_SEQUENCE)
        .and_then(|item| string(item, tags::DIMENSION_DESCRIPTION_LABEL));
    let default_dimension = DimensionOrganization::default();

    DocumentHeader {
        sop_instance_uid: get(tags::SOP_INSTANCE_UID),
        series_instance_uid: get(tags::SERIES_INSTANCE_UID),
        study_instance_uid: get(tags::STUDY_INSTANCE_UID),
        frame_of_reference_uid: get(tags::FRAME_OF_REFERENCE_UID),
        modality: get(tags::MODALITY),
        series_number: get(tags::SERIES_NUMBER),
        series_description: string(obj, tags::SERIES_DESCRIPTION),
        body_part_examined: string(obj, tags::BODY_PART_EXAMINED),
        series_date: get(tags::SERIES_DATE),
        series_time: get(tags::SERIES_TIME),
        content_date: get(tags::CONTENT_DATE),
        content_time: get(tags::CONTENT_TIME),
        image_type: get(tags::IMAGE_TYPE),
        content_qualification: get(tags::CONTENT_QUALIFICATION),
        equipment: Equipment {
            manufacturer: get(tags::MANUFACTURER),
            manufacturer_model_name: get(tags::MANUFACTURER_MODEL_NAME),
            device_serial_number: get(tags::DEVICE_SERIAL_NUMBER),
            software_versions: get(tags::SOFTWARE_VERSIONS),
        },
        content: ContentIdentification {
            instance_number: get(tags::INSTANCE_NUMBER),
            content_label: get(tags::CONTENT_LABEL),
            content_description: string(obj, tags::CONTENT_DESCRIPTION),
            content_creator_name: get(tags::CONTENT_CREATOR_NAME),
        },
        dimension_organization: DimensionOrganization {
            uid: dimension_uid.unwrap_or(default_dimension.uid),
            description_label: dimension_label.unwrap_or(default_dimension.description_label),
        },
    }
}

fn float_pixels(obj: &InMemDicomObject) -> Result<Vec<f32>> {
    let (element, double) = match obj.element(tags::FLOAT_PIXEL_DATA) {
        Ok(element) => (element, false),
        Err(_) => (
            obj.element(tags::DOUBLE_FLOAT_PIXEL_DATA)
                .map_err(|_| malformed("no floating point pixel data"))?,
            true,
        ),
    };

    match element.value() {
        Value::Primitive(PrimitiveValue::F32(values)) => Ok(values.to_vec()),
        Value::Primitive(PrimitiveValue::F64(values)) => {
            Ok(values.iter().map(|v| *v as f32).collect())
        }
        // Raw little endian bytes.
        Value::Primitive(PrimitiveValue::U8(bytes)) => {
            let width = if double { 8 } else { 4 };
            if bytes.len() % width != 0 {
                return Err(malformed(format!(
                    "pixel data length {} is not a multiple of {width}",
                    bytes.len()
                )));
            }
            if double {
                Ok(bytemuck::pod_collect_to_vec::<u8, f64>(&bytes[..])
                    .into_iter()
                    .map(|v| v as f32)
                    .collect())
            } else {
                Ok(bytemuck::pod_collect_to_vec::<u8, f32>(&bytes[..]))
            }
        }
        _ => Err(malformed("unsupported pixel data encoding")),
    }
}

/// Decode a Parametric Map dataset into a document.
pub fn from_dicom_object(obj: &InMemDicomObject) -> Result<Document> {
    match string(obj, tags::SOP_CLASS_UID) {
        Some(uid) if uid == PARAMETRIC_MAP_STORAGE => {}
        other => {
            return Err(malformed(format!(
                "SOP class {} is not Parametric Map Storage",
                other.as_deref().unwrap_or("<missing>")
            )));
        }
    }

    let dimension = |tag, name: &str| {
        obj.element(tag)
            .ok()
            .and_then(|e| e.to_int::<u32>().ok())
            .map(|v| v as usize)
            .ok_or_else(|| malformed(format!("{name} is missing")))
    };
    let rows = dimension(tags::ROWS, "Rows")?;
    let columns = dimension(tags::COLUMNS, "Columns")?;

    let per_frame = obj
        .element(tags::PER_FRAME_FUNCTIONAL_GROUPS_SEQUENCE)
        .ok()
        .and_then(|e| e.items());
    let frame_count = match (dimension(tags::NUMBER_OF_FRAMES, "NumberOfFrames"), per_frame) {
        (Ok(count), Some(items)) if count != items.len() => {
            return Err(malformed(format!(
                "NumberOfFrames is {count} but {} per-frame items are present",
                items.len()
            )));
        }
        (Ok(count), _) => count,
        (Err(_), Some(items)) => items.len(),
        (Err(e), None) => return Err(e),
    };

    let pixels = float_pixels(obj)?;
    let frame_size = rows * columns;
    if frame_size == 0 || pixels.len() != frame_size * frame_count {
        return Err(malformed(format!(
            "{} pixel values do not fill {frame_count} frames of {columns}x{rows}",
            pixels.len()
        )));
    }

    let mut document = Document::new(decode_header(obj), rows, columns);
    if let Some(shared) = first_item(obj, tags::SHARED_FUNCTIONAL_GROUPS_SEQUENCE) {
        for group in decode_groups(shared)?.iter() {
            document.insert_shared(group.clone());
        }
    }
    for (index, frame_pixels) in pixels.chunks_exact(frame_size).enumerate() {
        let groups = match per_frame.and_then(|items| items.get(index)) {
            Some(item) => decode_groups(item)?,
            None => GroupSet::new(),
        };
        document.add_frame(Frame {
            pixels: frame_pixels.to_vec(),
            groups,
        })?;
    }

    info!(
        "Read parametric map: {}x{} with {} frames",
        columns, rows, frame_count
    );
    Ok(document)
}

/// Assembly options taking study, frame of reference and body part from a
/// source dataset.
pub fn source_options(source: &InMemDicomObject) -> AssembleOptions {
    AssembleOptions {
        study_instance_uid: string(source, tags::STUDY_INSTANCE_UID),
        frame_of_reference_uid: string(source, tags::FRAME_OF_REFERENCE_UID),
        body_part_examined: string(source, tags::BODY_PART_EXAMINED),
        ..Default::default()
    }
}

pub fn open_source_dataset(path: impl AsRef<Path>) -> Result<DefaultDicomObject> {
    Ok(open_file(path.as_ref())?)
}

pub fn open_document(path: impl AsRef<Path>) -> Result<Document> {
    let obj = open_file(path.as_ref())?;
    from_dicom_object(&obj)
}

pub fn save_document(
    document: &Document,
    path: impl AsRef<Path>,
    source: Option<&InMemDicomObject>,
) -> Result<()> {
    let obj = to_dicom_object(document, source)?;
    obj.write_to_file(path.as_ref())?;
    info!("Wrote parametric map to {}", path.as_ref().display());
    Ok(())
}
