//! Attribute tags used by the parametric map encoding.

pub use dicom_dictionary_std::tags::{
    ACCESSION_NUMBER, ANATOMIC_REGION_SEQUENCE, BITS_ALLOCATED, BODY_PART_EXAMINED, CODE_MEANING,
    CODE_VALUE, CODING_SCHEME_DESIGNATOR, COLUMNS, CONCEPT_CODE_SEQUENCE,
    CONCEPT_NAME_CODE_SEQUENCE, CONTENT_CREATOR_NAME, CONTENT_DATE, CONTENT_DESCRIPTION,
    CONTENT_LABEL, CONTENT_QUALIFICATION, CONTENT_TIME, DEVICE_SERIAL_NUMBER,
    DIMENSION_DESCRIPTION_LABEL, DIMENSION_INDEX_POINTER, DIMENSION_INDEX_SEQUENCE,
    DIMENSION_INDEX_VALUES, DIMENSION_ORGANIZATION_SEQUENCE, DIMENSION_ORGANIZATION_UID,
    DOUBLE_FLOAT_PIXEL_DATA, DOUBLE_FLOAT_REAL_WORLD_VALUE_FIRST_VALUE_MAPPED,
    DOUBLE_FLOAT_REAL_WORLD_VALUE_LAST_VALUE_MAPPED, FLOAT_PIXEL_DATA, FRAME_ANATOMY_SEQUENCE,
    FRAME_CONTENT_SEQUENCE, FRAME_LATERALITY, FRAME_OF_REFERENCE_UID, FRAME_TYPE,
    FUNCTIONAL_GROUP_POINTER, IMAGE_ORIENTATION_PATIENT, IMAGE_POSITION_PATIENT, IMAGE_TYPE,
    INSTANCE_NUMBER, LUT_EXPLANATION, LUT_LABEL, MANUFACTURER, MANUFACTURER_MODEL_NAME,
    MEASUREMENT_UNITS_CODE_SEQUENCE, MODALITY, NUMBER_OF_FRAMES, PARAMETRIC_MAP_FRAME_TYPE_SEQUENCE,
    PATIENT_BIRTH_DATE, PATIENT_ID, PATIENT_NAME, PATIENT_SEX, PER_FRAME_FUNCTIONAL_GROUPS_SEQUENCE,
    PHOTOMETRIC_INTERPRETATION, PIXEL_MEASURES_SEQUENCE, PIXEL_PRESENTATION, PIXEL_SPACING,
    PIXEL_VALUE_TRANSFORMATION_SEQUENCE, PLANE_ORIENTATION_SEQUENCE, PLANE_POSITION_SEQUENCE,
    QUANTITY_DEFINITION_SEQUENCE, REAL_WORLD_VALUE_FIRST_VALUE_MAPPED, REAL_WORLD_VALUE_INTERCEPT,
    REAL_WORLD_VALUE_LAST_VALUE_MAPPED, REAL_WORLD_VALUE_MAPPING_SEQUENCE, REAL_WORLD_VALUE_SLOPE,
    REFERRING_PHYSICIAN_NAME, RESCALE_INTERCEPT, RESCALE_SLOPE, RESCALE_TYPE, ROWS,
    SAMPLES_PER_PIXEL, SERIES_DATE, SERIES_DESCRIPTION, SERIES_INSTANCE_UID, SERIES_NUMBER,
    SERIES_TIME, SHARED_FUNCTIONAL_GROUPS_SEQUENCE, SLICE_THICKNESS, SOFTWARE_VERSIONS,
    SOP_CLASS_UID, SOP_INSTANCE_UID, SPACING_BETWEEN_SLICES, STUDY_DATE, STUDY_DESCRIPTION,
    STUDY_ID, STUDY_INSTANCE_UID, STUDY_TIME, VALUE_TYPE, VOLUMETRIC_PROPERTIES,
    VOLUME_BASED_CALCULATION_TECHNIQUE,
};
