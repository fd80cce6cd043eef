//! Reading and writing volumes as NRRD files (raw or gzip encoding).
//!
//! Only three dimensional scalar volumes are handled. Geometry is carried in
//! `space directions` and `space origin`; volumes in `right-anterior-superior`
//! space are converted to LPS on read. Written files are always `float`,
//! little endian, LPS, and gzip compressed unless asked otherwise.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use ndarray::Array3;
use tracing::{debug, info};
use web_time::Instant;

use crate::error::{ParametricMapError, Result};
use crate::volume::{Direction, Volume};

const MAGIC: &str = "NRRD000";

/// Payload encoding of a NRRD file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Raw,
    #[default]
    Gzip,
}

impl Encoding {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "raw" => Some(Encoding::Raw),
            "gzip" | "gz" => Some(Encoding::Gzip),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Encoding::Raw => "raw",
            Encoding::Gzip => "gzip",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarType {
    UChar,
    Short,
    UShort,
    Int,
    Float,
    Double,
}

impl ScalarType {
    fn parse(name: &str) -> Option<Self> {
        let ty = match name {
            "uchar" | "unsigned char" | "uint8" | "uint8_t" => ScalarType::UChar,
            "short" | "short int" | "signed short" | "signed short int" | "int16" | "int16_t" => {
                ScalarType::Short
            }
            "ushort" | "unsigned short" | "unsigned short int" | "uint16" | "uint16_t" => {
                ScalarType::UShort
            }
            "int" | "signed int" | "int32" | "int32_t" => ScalarType::Int,
            "float" => ScalarType::Float,
            "double" => ScalarType::Double,
            _ => return None,
        };
        Some(ty)
    }

    fn size(self) -> usize {
        match self {
            ScalarType::UChar => 1,
            ScalarType::Short | ScalarType::UShort => 2,
            ScalarType::Int | ScalarType::Float => 4,
            ScalarType::Double => 8,
        }
    }

    fn decode(self, bytes: &[u8], big_endian: bool) -> f32 {
        macro_rules! read {
            ($ty:ty) => {{
                let raw = bytes.try_into().unwrap_or_default();
                if big_endian {
                    <$ty>::from_be_bytes(raw)
                } else {
                    <$ty>::from_le_bytes(raw)
                }
            }};
        }
        match self {
            ScalarType::UChar => bytes[0] as f32,
            ScalarType::Short => read!(i16) as f32,
            ScalarType::UShort => read!(u16) as f32,
            ScalarType::Int => read!(i32) as f32,
            ScalarType::Float => read!(f32),
            ScalarType::Double => read!(f64) as f32,
        }
    }
}

fn malformed(message: impl Into<String>) -> ParametricMapError {
    ParametricMapError::MalformedVolumeFile(message.into())
}

/// Parsed header fields, keyed by lower-case field name.
struct Header {
    fields: HashMap<String, String>,
}

impl Header {
    fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines();
        match lines.next() {
            Some(magic) if magic.starts_with(MAGIC) => {}
            _ => return Err(malformed("missing NRRD magic line")),
        }

        let mut fields = HashMap::new();
        for line in lines {
            let line = line.trim_end_matches('\r');
            // Comments and key/value pairs (`key:=value`) carry nothing we use.
            if line.starts_with('#') || line.contains(":=") {
                continue;
            }
            let (key, value) = line
                .split_once(": ")
                .ok_or_else(|| malformed(format!("unexpected header line {line:?}")))?;
            fields.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }
        Ok(Self { fields })
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| malformed(format!("missing `{key}` field")))
    }
}

fn parse_vector(text: &str) -> Result<[f64; 3]> {
    let inner = text
        .trim()
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .ok_or_else(|| malformed(format!("vector {text:?} is not parenthesised")))?;
    let values = inner
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| malformed(format!("vector {text:?}: {e}")))?;
    <[f64; 3]>::try_from(values).map_err(|_| malformed(format!("vector {text:?} is not 3D")))
}

fn parse_vectors(text: &str) -> Result<Vec<[f64; 3]>> {
    text.split_whitespace().map(parse_vector).collect()
}

fn norm(v: [f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

/// Spacing and direction from the header; `spacings` is used only when no
/// `space directions` are present.
fn parse_geometry(header: &Header) -> Result<((f64, f64, f64), Direction, [f64; 3])> {
    let ras = match header.get("space") {
        None | Some("left-posterior-superior") | Some("LPS") => false,
        Some("right-anterior-superior") | Some("RAS") => true,
        Some(other) => return Err(malformed(format!("unsupported space {other:?}"))),
    };
    // RAS to LPS flips the first two patient axes.
    let to_lps = |v: [f64; 3]| if ras { [-v[0], -v[1], v[2]] } else { v };

    let mut spacing = [1.0; 3];
    let mut direction = crate::volume::IDENTITY_DIRECTION;
    if let Some(directions) = header.get("space directions") {
        let vectors = parse_vectors(directions)?;
        if vectors.len() != 3 {
            return Err(malformed(format!(
                "expected 3 space directions, found {}",
                vectors.len()
            )));
        }
        for (axis, vector) in vectors.into_iter().enumerate() {
            let length = norm(vector);
            if length == 0.0 {
                return Err(malformed(format!("space direction {axis} is zero")));
            }
            let unit = to_lps(vector);
            spacing[axis] = length;
            for (row, component) in unit.iter().enumerate() {
                direction[row][axis] = component / length;
            }
        }
    } else if let Some(spacings) = header.get("spacings") {
        let values = spacings
            .split_whitespace()
            .map(str::parse::<f64>)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| malformed(format!("spacings: {e}")))?;
        spacing = <[f64; 3]>::try_from(values)
            .map_err(|_| malformed("expected 3 spacings"))?;
    }

    let origin = match header.get("space origin") {
        Some(origin) => to_lps(parse_vector(origin)?),
        None => [0.0; 3],
    };
    Ok(((spacing[0], spacing[1], spacing[2]), direction, origin))
}

fn decode_volume(header: &Header, payload: &[u8]) -> Result<Volume> {
    let dimension = header.require("dimension")?;
    if dimension != "3" {
        return Err(malformed(format!("dimension {dimension} is not 3")));
    }
    let encoding = header.require("encoding")?;
    let encoding = Encoding::parse(encoding)
        .ok_or_else(|| malformed(format!("unsupported encoding {encoding:?}")))?;
    let scalar = header.require("type")?;
    let scalar =
        ScalarType::parse(scalar).ok_or_else(|| malformed(format!("unsupported type {scalar:?}")))?;
    let big_endian = match header.get("endian") {
        Some("big") => true,
        Some("little") | None => false,
        Some(other) => return Err(malformed(format!("unknown endian {other:?}"))),
    };

    let sizes = header
        .require("sizes")?
        .split_whitespace()
        .map(str::parse::<usize>)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| malformed(format!("sizes: {e}")))?;
    let [width, height, depth] =
        <[usize; 3]>::try_from(sizes).map_err(|_| malformed("expected 3 sizes"))?;
    let count = width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(depth))
        .ok_or_else(|| ParametricMapError::AllocationFailure("volume size overflows".into()))?;

    let skip = match header.get("byte skip") {
        Some(skip) => skip
            .parse::<usize>()
            .map_err(|_| malformed(format!("unsupported byte skip {skip:?}")))?,
        None => 0,
    };
    let overflow = || ParametricMapError::AllocationFailure("payload size overflows".into());
    let expected = count.checked_mul(scalar.size()).ok_or_else(overflow)?;
    let end = skip.checked_add(expected).ok_or_else(overflow)?;

    let payload = match encoding {
        Encoding::Raw => Cow::Borrowed(payload),
        Encoding::Gzip => Cow::Owned(gunzip(payload)?),
    };
    let data = payload
        .get(skip..end)
        .ok_or_else(|| {
            malformed(format!(
                "payload holds {} bytes, {expected} needed after skipping {skip}",
                payload.len()
            ))
        })?;

    let mut values = Vec::new();
    values
        .try_reserve_exact(count)
        .map_err(|e| ParametricMapError::AllocationFailure(e.to_string()))?;
    values.extend(
        data.chunks_exact(scalar.size())
            .map(|chunk| scalar.decode(chunk, big_endian)),
    );

    let (spacing, direction, origin) = parse_geometry(header)?;
    // NRRD stores the first axis fastest, so (depth, height, width) is the
    // standard layout.
    let data = Array3::from_shape_vec((depth, height, width), values)
        .map_err(|e| malformed(e.to_string()))?;
    Ok(Volume::new(data, spacing).with_geometry(direction, origin))
}

fn gunzip(compressed: &[u8]) -> Result<Vec<u8>> {
    let mut payload = Vec::new();
    MultiGzDecoder::new(compressed)
        .read_to_end(&mut payload)
        .map_err(|e| malformed(format!("gzip payload: {e}")))?;
    Ok(payload)
}

/// Split a file at the first empty line into header text and payload.
/// Lines may end in `\n` or `\r\n`.
fn split_header(bytes: &[u8]) -> Result<(&str, &[u8])> {
    let mut line_start = 0;
    let mut header_end = bytes.len();
    let mut payload_start = bytes.len();
    while let Some(offset) = bytes[line_start..].iter().position(|&b| b == b'\n') {
        let line_end = line_start + offset;
        let line = &bytes[line_start..line_end];
        if line.is_empty() || line == b"\r" {
            header_end = line_start;
            payload_start = line_end + 1;
            break;
        }
        line_start = line_end + 1;
    }

    let text = std::str::from_utf8(&bytes[..header_end])
        .map_err(|_| malformed("header is not valid text"))?;
    Ok((text, &bytes[payload_start..]))
}

/// Read a volume from an attached (`.nrrd`) or detached (`.nhdr`) NRRD file.
pub fn read_volume(path: impl AsRef<Path>) -> Result<Volume> {
    let path = path.as_ref();
    let start = Instant::now();
    let bytes = fs::read(path)?;

    let (text, payload) = split_header(&bytes)?;
    let header = Header::parse(text)?;

    let volume = match header.get("data file").or_else(|| header.get("datafile")) {
        Some(file) => {
            let detached = path.parent().unwrap_or(Path::new(".")).join(file);
            decode_volume(&header, &fs::read(detached)?)?
        }
        None => decode_volume(&header, payload)?,
    };

    let (depth, height, width) = volume.dim();
    info!(
        "Read volume {}x{}x{} from {}",
        width,
        height,
        depth,
        path.display()
    );
    debug!("Reading volume took {:?}", start.elapsed());
    Ok(volume)
}

fn format_vector(v: [f64; 3]) -> String {
    format!("({},{},{})", v[0], v[1], v[2])
}

fn header_text(volume: &Volume, encoding: Encoding) -> String {
    let (depth, height, width) = volume.dim();
    let spacing = [volume.spacing.0, volume.spacing.1, volume.spacing.2];
    let directions = (0..3)
        .map(|axis| {
            let unit = volume.axis_direction(axis);
            format_vector(unit.map(|c| c * spacing[axis]))
        })
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        "NRRD0004\n\
         type: float\n\
         dimension: 3\n\
         space: left-posterior-superior\n\
         sizes: {width} {height} {depth}\n\
         space directions: {directions}\n\
         kinds: domain domain domain\n\
         endian: little\n\
         encoding: {}\n\
         space origin: {}\n\n",
        encoding.name(),
        format_vector(volume.origin)
    )
}

/// Write a volume as a `float`, little endian, gzip compressed NRRD file.
pub fn write_volume(volume: &Volume, path: impl AsRef<Path>) -> Result<()> {
    write_volume_with_encoding(volume, path, Encoding::default())
}

/// Write a volume as a `float`, little endian NRRD file with the given payload encoding.
pub fn write_volume_with_encoding(
    volume: &Volume,
    path: impl AsRef<Path>,
    encoding: Encoding,
) -> Result<()> {
    let path = path.as_ref();
    let start = Instant::now();

    let mut payload = Vec::new();
    payload
        .try_reserve_exact(volume.data.len() * std::mem::size_of::<f32>())
        .map_err(|e| ParametricMapError::AllocationFailure(e.to_string()))?;
    // Logical (slice, row, col) order, whatever the memory layout.
    for value in volume.data.iter() {
        payload.extend_from_slice(&value.to_le_bytes());
    }

    let mut writer = BufWriter::new(fs::File::create(path)?);
    writer.write_all(header_text(volume, encoding).as_bytes())?;
    match encoding {
        Encoding::Raw => writer.write_all(&payload)?,
        Encoding::Gzip => {
            let mut encoder = GzEncoder::new(&mut writer, Compression::default());
            encoder.write_all(&payload)?;
            encoder.finish()?;
        }
    }
    writer.flush()?;

    info!("Wrote {} volume to {}", encoding.name(), path.display());
    debug!("Writing volume took {:?}", start.elapsed());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn oblique_volume() -> Volume {
        let c = std::f64::consts::FRAC_1_SQRT_2;
        Volume::new(
            array![[[1.5, -2.0], [3.25, 4.0]], [[f32::MAX, 0.0], [-1e-7, 8.0]]],
            (0.5, 0.75, 2.0),
        )
        .with_geometry(
            [[c, -c, 0.0], [c, c, 0.0], [0.0, 0.0, 1.0]],
            [-10.0, 20.5, 3.0],
        )
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn written_file_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("volume.nrrd");
        let volume = oblique_volume();

        write_volume(&volume, &path).unwrap();
        let read = read_volume(&path).unwrap();

        assert_eq!(read.data, volume.data);
        assert!(close(read.spacing.0, 0.5));
        assert!(close(read.spacing.1, 0.75));
        assert!(close(read.spacing.2, 2.0));
        for row in 0..3 {
            for col in 0..3 {
                assert!(close(read.direction[row][col], volume.direction[row][col]));
            }
        }
        assert_eq!(read.origin, volume.origin);
    }

    #[test]
    fn header_describes_lps_float_volume() {
        let text = header_text(&oblique_volume(), Encoding::Gzip);
        assert!(text.starts_with("NRRD0004\n"));
        assert!(text.contains("encoding: gzip\n"));
        assert!(text.contains("type: float\n"));
        assert!(text.contains("sizes: 2 2 2\n"));
        assert!(text.contains("space: left-posterior-superior\n"));
        assert!(text.contains("space origin: (-10,20.5,3)\n"));
        assert!(text.ends_with("\n\n"));
    }

    #[test]
    fn reads_big_endian_shorts_in_ras_space() {
        let header = Header::parse(
            "NRRD0005\n\
             # comment\n\
             type: short\n\
             dimension: 3\n\
             space: right-anterior-superior\n\
             sizes: 2 1 1\n\
             space directions: (2,0,0) (0,3,0) (0,0,4)\n\
             endian: big\n\
             encoding: raw\n\
             space origin: (1,2,3)\n\
             units:=mm",
        )
        .unwrap();
        let payload = [0xFF, 0xFE, 0x00, 0x07];
        let volume = decode_volume(&header, &payload).unwrap();

        assert_eq!(volume.dim(), (1, 1, 2));
        assert_eq!(volume.data[[0, 0, 0]], -2.0);
        assert_eq!(volume.data[[0, 0, 1]], 7.0);
        assert_eq!(volume.spacing, (2.0, 3.0, 4.0));
        assert_eq!(volume.direction[0][0], -1.0);
        assert_eq!(volume.direction[1][1], -1.0);
        assert_eq!(volume.direction[2][2], 1.0);
        assert_eq!(volume.origin, [-1.0, -2.0, 3.0]);
    }

    #[test]
    fn spacings_field_is_used_without_directions() {
        let header = Header::parse(
            "NRRD0004\ntype: uchar\ndimension: 3\nsizes: 1 1 1\nspacings: 0.5 0.5 1.5\nencoding: raw",
        )
        .unwrap();
        let volume = decode_volume(&header, &[200]).unwrap();
        assert_eq!(volume.data[[0, 0, 0]], 200.0);
        assert_eq!(volume.spacing, (0.5, 0.5, 1.5));
    }

    #[test]
    fn gzip_and_raw_payloads_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let volume = oblique_volume();

        let compressed = dir.path().join("compressed.nrrd");
        write_volume(&volume, &compressed).unwrap();
        let bytes = fs::read(&compressed).unwrap();
        let (text, payload) = split_header(&bytes).unwrap();
        assert!(text.contains("encoding: gzip"));
        assert_eq!(&payload[..2], &[0x1f, 0x8b]);
        assert_eq!(read_volume(&compressed).unwrap().data, volume.data);

        let raw = dir.path().join("raw.nrrd");
        write_volume_with_encoding(&volume, &raw, Encoding::Raw).unwrap();
        let bytes = fs::read(&raw).unwrap();
        assert_eq!(split_header(&bytes).unwrap().1.len(), 8 * 4);
        assert_eq!(read_volume(&raw).unwrap().data, volume.data);
    }

    #[test]
    fn gz_encoding_name_is_accepted() {
        let header = Header::parse(
            "NRRD0004\ntype: float\ndimension: 3\nsizes: 1 1 1\nencoding: gz",
        )
        .unwrap();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(&2.5_f32.to_le_bytes()).unwrap();
        let payload = encoder.finish().unwrap();

        let volume = decode_volume(&header, &payload).unwrap();
        assert_eq!(volume.data[[0, 0, 0]], 2.5);
    }

    #[test]
    fn rejects_unsupported_files() {
        let bzip2 = Header::parse(
            "NRRD0004\ntype: float\ndimension: 3\nsizes: 1 1 1\nencoding: bzip2",
        )
        .unwrap();
        assert!(matches!(
            decode_volume(&bzip2, &[0; 4]),
            Err(ParametricMapError::MalformedVolumeFile(_))
        ));

        let corrupt_gzip = Header::parse(
            "NRRD0004\ntype: float\ndimension: 3\nsizes: 1 1 1\nencoding: gzip",
        )
        .unwrap();
        assert!(matches!(
            decode_volume(&corrupt_gzip, &[0; 4]),
            Err(ParametricMapError::MalformedVolumeFile(_))
        ));

        let short_payload = Header::parse(
            "NRRD0004\ntype: float\ndimension: 3\nsizes: 2 1 1\nencoding: raw",
        )
        .unwrap();
        assert!(decode_volume(&short_payload, &[0; 4]).is_err());

        assert!(Header::parse("P6\n2 2\n").is_err());
    }

    #[test]
    fn oversized_payload_is_an_allocation_failure() {
        let header = Header::parse(
            "NRRD0004\ntype: float\ndimension: 3\nsizes: 4611686018427387904 1 1\nencoding: raw",
        )
        .unwrap();
        assert!(matches!(
            decode_volume(&header, &[0; 4]),
            Err(ParametricMapError::AllocationFailure(_))
        ));

        let skipped = Header::parse(&format!(
            "NRRD0004\ntype: uchar\ndimension: 3\nsizes: 2 1 1\nencoding: raw\nbyte skip: {}",
            usize::MAX
        ))
        .unwrap();
        assert!(matches!(
            decode_volume(&skipped, &[0; 4]),
            Err(ParametricMapError::AllocationFailure(_))
        ));
    }

    #[test]
    fn crlf_header_ends_at_first_blank_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crlf.nrrd");
        let mut bytes = b"NRRD0004\r\ntype: float\r\ndimension: 3\r\nsizes: 1 1 1\r\n\
encoding: raw\r\nendian: little\r\n\r\n"
            .to_vec();
        let value = f32::from_le_bytes([0x0a, 0x0a, 0, 0]);
        bytes.extend_from_slice(&value.to_le_bytes());
        fs::write(&path, bytes).unwrap();

        let volume = read_volume(&path).unwrap();
        assert_eq!(volume.dim(), (1, 1, 1));
        assert_eq!(volume.data[[0, 0, 0]].to_bits(), value.to_bits());
    }

    #[test]
    fn detached_header_reads_data_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("volume.nhdr"),
            "NRRD0004\ntype: float\ndimension: 3\nsizes: 1 1 2\nencoding: raw\nendian: little\ndata file: volume.raw\n",
        )
        .unwrap();
        let payload: Vec<u8> = [1.0_f32, 2.0].iter().flat_map(|v| v.to_le_bytes()).collect();
        fs::write(dir.path().join("volume.raw"), payload).unwrap();

        let volume = read_volume(dir.path().join("volume.nhdr")).unwrap();
        assert_eq!(volume.dim(), (2, 1, 1));
        assert_eq!(volume.data[[1, 0, 0]], 2.0);
    }
}
