//! The JSON metadata description that accompanies a volume when encoding
//! a parametric map.
//!
//! Keys follow the DICOM keywords, e.g.
//!
//! ```json
//! {
//!   "SeriesNumber": "300",
//!   "InstanceNumber": "1",
//!   "SeriesDescription": "ADC map",
//!   "DerivedPixelContrast": "ADC",
//!   "RealWorldValueSlope": "1",
//!   "MeasurementUnitsCode": {
//!     "CodeValue": "um2/s",
//!     "CodingSchemeDesignator": "UCUM",
//!     "CodeMeaning": "um2/s"
//!   }
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use crate::error::{ParametricMapError, Result};

/// A (code value, coding scheme designator, code meaning) triple.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CodedConcept {
    #[serde(rename = "CodeValue")]
    pub value: String,
    #[serde(rename = "CodingSchemeDesignator")]
    pub scheme: String,
    #[serde(rename = "CodeMeaning")]
    pub meaning: String,
}

impl CodedConcept {
    pub fn new(value: &str, scheme: &str, meaning: &str) -> Self {
        Self {
            value: value.to_string(),
            scheme: scheme.to_string(),
            meaning: meaning.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetaDescription {
    #[serde(deserialize_with = "string_or_number")]
    pub series_number: String,
    #[serde(deserialize_with = "string_or_number")]
    pub instance_number: String,
    #[serde(default)]
    pub series_description: Option<String>,
    #[serde(default)]
    pub body_part_examined: Option<String>,
    #[serde(default)]
    pub anatomic_region_code: Option<CodedConcept>,
    #[serde(default)]
    pub derived_pixel_contrast: Option<String>,
    #[serde(default)]
    pub measurement_units_code: Option<CodedConcept>,
    #[serde(default)]
    pub quantity_value_code: Option<CodedConcept>,
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub real_world_value_slope: Option<String>,
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub real_world_value_intercept: Option<String>,
    #[serde(default)]
    pub content_label: Option<String>,
    #[serde(default)]
    pub content_description: Option<String>,
    #[serde(default)]
    pub content_creator_name: Option<String>,
    #[serde(default)]
    pub modality: Option<String>,
}

impl MetaDescription {
    pub fn new(series_number: &str, instance_number: &str) -> Self {
        Self {
            series_number: series_number.to_string(),
            instance_number: instance_number.to_string(),
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let meta: MetaDescription = serde_json::from_str(json)
            .map_err(|e| ParametricMapError::MalformedMetadata(e.to_string()))?;
        meta.validate()?;
        Ok(meta)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("SeriesNumber", &self.series_number),
            ("InstanceNumber", &self.instance_number),
        ] {
            if value.trim().parse::<i64>().is_err() {
                return Err(ParametricMapError::MalformedMetadata(format!(
                    "{name} must be an integer, got {value:?}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    StringOrNumber::deserialize(deserializer).map(String::from)
}

fn optional_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Option::<StringOrNumber>::deserialize(deserializer).map(|v| v.map(String::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_description() {
        let meta = MetaDescription::from_json(
            r#"{
                "SeriesNumber": "300",
                "InstanceNumber": 1,
                "SeriesDescription": "ADC map",
                "BodyPartExamined": "PROSTATE",
                "AnatomicRegionCode": {
                    "CodeValue": "T-9200B",
                    "CodingSchemeDesignator": "SRT",
                    "CodeMeaning": "Prostate"
                },
                "DerivedPixelContrast": "ADC",
                "MeasurementUnitsCode": {
                    "CodeValue": "um2/s",
                    "CodingSchemeDesignator": "UCUM",
                    "CodeMeaning": "um2/s"
                },
                "QuantityValueCode": {
                    "CodeValue": "113041",
                    "CodingSchemeDesignator": "DCM",
                    "CodeMeaning": "Apparent Diffusion Coefficient"
                },
                "RealWorldValueSlope": 1.5,
                "RealWorldValueIntercept": "0"
            }"#,
        )
        .unwrap();

        assert_eq!(meta.series_number, "300");
        assert_eq!(meta.instance_number, "1");
        assert_eq!(meta.derived_pixel_contrast.as_deref(), Some("ADC"));
        assert_eq!(
            meta.anatomic_region_code,
            Some(CodedConcept::new("T-9200B", "SRT", "Prostate"))
        );
        assert_eq!(meta.real_world_value_slope.as_deref(), Some("1.5"));
        assert_eq!(meta.real_world_value_intercept.as_deref(), Some("0"));
    }

    #[test]
    fn missing_required_field_is_malformed() {
        let err = MetaDescription::from_json(r#"{"SeriesNumber": "1"}"#).unwrap_err();
        assert!(matches!(err, ParametricMapError::MalformedMetadata(_)));
    }

    #[test]
    fn non_integer_series_number_is_malformed() {
        let err = MetaDescription::from_json(r#"{"SeriesNumber": "abc", "InstanceNumber": "1"}"#)
            .unwrap_err();
        assert!(matches!(err, ParametricMapError::MalformedMetadata(_)));
    }
}
