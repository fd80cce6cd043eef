//! # DICOM Parametric Map library
//!
//! This crate converts regularly sampled scalar volumes (for example
//! quantitative MR maps such as ADC or T1) into DICOM Parametric Map objects
//! and back.
//!
//! This library is part of the dicom-rs ecosystem and uses its object model
//! to read and write the encoded documents.
//! A volume is encoded as one frame per slice. Geometry common to all frames
//! (pixel spacing, orientation) is stored once in the shared functional
//! groups, while every frame carries its own plane position and dimension
//! index. When decoding, frames are placed by their dimension index and the
//! volume geometry is recomputed from the plane positions. If the environment
//! supports it frames are encoded and decoded in parallel using rayon.
//!
//! Documents are assumed to have the following attributes:
//!  - Float pixel data (`FloatPixelData` or `DoubleFloatPixelData`)
//!  - A single stack of parallel frames
//!  - One real world value mapping shared by all frames
//!
//! # Examples
//!
//! ## Encoding a volume
//!
//! Read a NRRD volume and a JSON metadata description, then write the
//! Parametric Map.
//!
//! ```no_run
//! # use dicom_paramap::{assemble, dicom_io, nrrd, MetaDescription};
//! let volume = nrrd::read_volume("adc.nrrd").expect("should have read the volume");
//! let meta = MetaDescription::from_file("meta.json").expect("should have read metadata");
//! let document = assemble(&volume, &meta).expect("should have assembled the document");
//! dicom_io::save_document(&document, "adc.dcm", None).expect("should have written the file");
//! ```
//!
//! ## Decoding a Parametric Map
//!
//! ```no_run
//! # use dicom_paramap::{disassemble, dicom_io, nrrd};
//! let document = dicom_io::open_document("adc.dcm").expect("should have read the document");
//! let volume = disassemble(&document).expect("should have decoded the volume");
//! nrrd::write_volume(&volume, "pmap.nrrd").expect("should have written the volume");
//! ```

pub mod assembler;
pub mod dicom_io;
pub mod document;
pub mod enums;
pub mod error;
pub mod frame_codec;
pub mod functional_groups;
pub mod geometry;
pub mod metadata;
pub mod nrrd;
pub mod synthesizer;
pub mod tags;
pub mod volume;

pub use assembler::{AssembleOptions, assemble, assemble_with_options, disassemble};
pub use document::{Document, Frame};
pub use error::{ParametricMapError, Result};
pub use metadata::{CodedConcept, MetaDescription};
pub use volume::Volume;
