use dicom_paramap::{
    AssembleOptions, CodedConcept, MetaDescription, ParametricMapError, Volume, assemble,
    assemble_with_options, dicom_io, disassemble, enums::FramePositioning, nrrd,
};
use ndarray::Array3;

fn oblique_volume() -> Volume {
    let (s, c) = 0.3_f64.sin_cos();
    // Rotation about the z axis, slices along +z.
    let direction = [[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]];
    let data = Array3::from_shape_fn((5, 6, 7), |(k, j, i)| {
        ((k * 42 + j * 7 + i) as f32).sqrt() * 1.0e-3 - 0.01
    });
    Volume::new(data, (0.8, 1.2, 3.0)).with_geometry(direction, [-101.5, 33.25, -12.0])
}

fn adc_meta() -> MetaDescription {
    MetaDescription::from_json(
        r#"{
            "SeriesNumber": 300,
            "InstanceNumber": "1",
            "SeriesDescription": "ADC map",
            "BodyPartExamined": "PROSTATE",
            "DerivedPixelContrast": "ADC",
            "MeasurementUnitsCode": {
                "CodeValue": "mm2/s",
                "CodingSchemeDesignator": "UCUM",
                "CodeMeaning": "mm2/s"
            },
            "QuantityValueCode": {
                "CodeValue": "113041",
                "CodingSchemeDesignator": "DCM",
                "CodeMeaning": "Apparent Diffusion Coefficient"
            }
        }"#,
    )
    .unwrap()
}

fn assert_geometry_close(actual: &Volume, expected: &Volume) {
    let close = |a: f64, b: f64| (a - b).abs() < 1e-5;
    assert!(close(actual.spacing.0, expected.spacing.0));
    assert!(close(actual.spacing.1, expected.spacing.1));
    assert!(close(actual.spacing.2, expected.spacing.2));
    for row in 0..3 {
        assert!(close(actual.origin[row], expected.origin[row]));
        for col in 0..3 {
            assert!(
                close(actual.direction[row][col], expected.direction[row][col]),
                "direction[{row}][{col}]: {} != {}",
                actual.direction[row][col],
                expected.direction[row][col]
            );
        }
    }
}

#[test]
fn volume_survives_a_dicom_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("adc.dcm");
    let volume = oblique_volume();

    let document = assemble(&volume, &adc_meta()).unwrap();
    dicom_io::save_document(&document, &path, None).unwrap();
    let read = dicom_io::open_document(&path).unwrap();
    let decoded = disassemble(&read).unwrap();

    assert_eq!(decoded.data, volume.data);
    assert_geometry_close(&decoded, &volume);

    let rwvm = read.shared().real_world_value_mapping().unwrap();
    let min = volume.data.iter().copied().fold(f32::INFINITY, f32::min);
    let max = volume.data.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    assert_eq!(rwvm.first_value_mapped, min as f64);
    assert_eq!(rwvm.last_value_mapped, max as f64);
    assert_eq!(
        rwvm.quantity,
        Some(CodedConcept::new(
            "113041",
            "DCM",
            "Apparent Diffusion Coefficient"
        ))
    );
    assert_eq!(read.header.series_number, "300");
    assert_eq!(read.header.body_part_examined.as_deref(), Some("PROSTATE"));
    assert_eq!(
        read.shared().frame_type(),
        Some("DERIVED\\PRIMARY\\VOLUME\\ADC")
    );
}

#[test]
fn frames_keep_their_dimension_index_through_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pm.dcm");
    let document = assemble(&oblique_volume(), &adc_meta()).unwrap();
    dicom_io::save_document(&document, &path, None).unwrap();

    let read = dicom_io::open_document(&path).unwrap();
    assert_eq!(read.number_of_frames(), 5);
    for (index, frame) in read.frames().iter().enumerate() {
        assert_eq!(
            frame.groups.frame_content().unwrap().dimension_index_values,
            vec![index as u32 + 1]
        );
        assert!(frame.groups.plane_position().is_some());
    }
}

#[test]
fn source_dataset_provides_study_identity() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.dcm");
    let second = dir.path().join("second.dcm");
    let volume = oblique_volume();

    let document = assemble(&volume, &adc_meta()).unwrap();
    dicom_io::save_document(&document, &first, None).unwrap();

    let source = dicom_io::open_source_dataset(&first).unwrap();
    let options = dicom_io::source_options(&source);
    let derived = assemble_with_options(&volume, &MetaDescription::new("301", "1"), &options)
        .unwrap();
    dicom_io::save_document(&derived, &second, Some(&*source)).unwrap();

    let read = dicom_io::open_document(&second).unwrap();
    assert_eq!(read.header.study_instance_uid, document.header.study_instance_uid);
    assert_eq!(
        read.header.frame_of_reference_uid,
        document.header.frame_of_reference_uid
    );
    assert_ne!(read.header.series_instance_uid, document.header.series_instance_uid);
    assert_eq!(read.header.body_part_examined.as_deref(), Some("PROSTATE"));
}

#[test]
fn index_positions_lose_the_patient_geometry() {
    let volume = oblique_volume();
    let options = AssembleOptions {
        positioning: FramePositioning::IndexPlaceholder,
        ..Default::default()
    };
    let document = assemble_with_options(&volume, &adc_meta(), &options).unwrap();
    let decoded = disassemble(&document).unwrap();

    assert_eq!(decoded.data, volume.data);
    assert_eq!(decoded.origin, [0.0, 0.0, 0.0]);
}

#[test]
fn nrrd_to_parametric_map_and_back() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.nrrd");
    let map = dir.path().join("map.dcm");
    let output = dir.path().join("pmap.nrrd");
    let volume = oblique_volume();

    nrrd::write_volume(&volume, &input).unwrap();
    let document = assemble(&nrrd::read_volume(&input).unwrap(), &adc_meta()).unwrap();
    dicom_io::save_document(&document, &map, None).unwrap();
    let decoded = disassemble(&dicom_io::open_document(&map).unwrap()).unwrap();
    nrrd::write_volume(&decoded, &output).unwrap();

    let result = nrrd::read_volume(&output).unwrap();
    assert_eq!(result.data, volume.data);
    assert_geometry_close(&result, &volume);
}

#[test]
fn non_parametric_map_files_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("not-dicom.dcm");
    std::fs::write(&path, b"definitely not DICOM").unwrap();

    assert!(matches!(
        dicom_io::open_document(&path),
        Err(ParametricMapError::DicomRead(_))
    ));
}
