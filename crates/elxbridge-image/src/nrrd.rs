//! NRRD reading and writing.
//!
//! Only attached-data files are handled. The reader accepts `raw`, `ascii`
//! and `gzip` encodings in either byte order; the writer emits little-endian
//! `raw` or `gzip` data with a `NRRD0004` header.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use flate2::bufread::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::debug;

use crate::error::{ImageError, ImageResult};
use crate::geometry::Geometry;
use crate::image::Image;
use crate::pixel::PixelType;

const MAGIC: &str = "NRRD000";

/// Axis kinds that mark a non-spatial (component) axis.
const COMPONENT_KINDS: &[&str] = &[
    "vector",
    "covariant-vector",
    "normal",
    "list",
    "point",
    "2-vector",
    "3-vector",
    "4-vector",
    "3-color",
    "4-color",
    "rgb-color",
    "rgba-color",
    "hsv-color",
    "xyz-color",
    "complex",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Raw,
    Ascii,
    Gzip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endian {
    Little,
    Big,
}

#[derive(Debug, Default)]
struct Header {
    pixel_type: Option<PixelType>,
    dimension: Option<usize>,
    sizes: Vec<usize>,
    space_directions: Option<Vec<Option<Vec<f64>>>>,
    spacings: Option<Vec<f64>>,
    space_origin: Option<Vec<f64>>,
    kinds: Option<Vec<String>>,
    endian: Option<Endian>,
    encoding: Option<Encoding>,
}

/// Reads an NRRD file. The returned image remembers `path` as its source.
pub fn read(path: impl AsRef<Path>) -> ImageResult<Image> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| ImageError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let image = parse(&bytes)?;
    debug!(path = %path.display(), shape = %image.shape(), "read nrrd");
    Ok(image.with_source_path(path))
}

/// Parses an in-memory NRRD file.
pub fn parse(bytes: &[u8]) -> ImageResult<Image> {
    let (header, data) = split_header(bytes)?;

    let pixel_type = header
        .pixel_type
        .ok_or_else(|| ImageError::invalid_header("missing 'type' field"))?;
    let dimension = header
        .dimension
        .ok_or_else(|| ImageError::invalid_header("missing 'dimension' field"))?;
    if header.sizes.len() != dimension {
        return Err(ImageError::invalid_header(format!(
            "'sizes' has {} entries, dimension is {}",
            header.sizes.len(),
            dimension
        )));
    }

    let component_axis = has_component_axis(&header, dimension);
    let (components, dims) = if component_axis {
        (header.sizes[0], header.sizes[1..].to_vec())
    } else {
        (1, header.sizes.clone())
    };
    if dims.is_empty() {
        return Err(ImageError::invalid_header("image has no spatial axes"));
    }

    let geometry = build_geometry(&header, component_axis, dims.len())?;
    let count = dims
        .iter()
        .try_fold(components, |acc, &d| acc.checked_mul(d))
        .filter(|count| count.checked_mul(pixel_type.size()).is_some())
        .ok_or_else(|| ImageError::invalid_header("image size overflows"))?;
    let endian = header.endian.unwrap_or(Endian::Little);
    let samples = match header.encoding.unwrap_or(Encoding::Raw) {
        Encoding::Raw => decode_raw(pixel_type, endian, data, count)?,
        Encoding::Ascii => decode_ascii(data, count)?,
        Encoding::Gzip => decode_raw(pixel_type, endian, &inflate(data)?, count)?,
    };

    Image::from_data(pixel_type, &dims, components, samples)?.with_geometry(geometry)
}

/// Writes an image as a little-endian raw NRRD file.
pub fn write(path: impl AsRef<Path>, image: &Image) -> ImageResult<()> {
    let path = path.as_ref();
    fs::write(path, to_bytes(image)).map_err(|source| ImageError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), shape = %image.shape(), "wrote nrrd");
    Ok(())
}

/// Writes an image as a little-endian gzip-compressed NRRD file.
pub fn write_gzip(path: impl AsRef<Path>, image: &Image) -> ImageResult<()> {
    let path = path.as_ref();
    to_gzip_bytes(image)
        .and_then(|bytes| fs::write(path, bytes))
        .map_err(|source| ImageError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(path = %path.display(), shape = %image.shape(), "wrote gzip nrrd");
    Ok(())
}

/// Encodes an image as a little-endian raw NRRD file.
pub fn to_bytes(image: &Image) -> Vec<u8> {
    let mut bytes = encode_header(image, "raw").into_bytes();
    bytes.extend_from_slice(&encode_raw(image.pixel_type(), image.data()));
    bytes
}

/// Encodes an image as a little-endian NRRD file with a gzip payload.
pub fn to_gzip_bytes(image: &Image) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(&encode_raw(image.pixel_type(), image.data()))?;
    let payload = encoder.finish()?;
    let mut bytes = encode_header(image, "gzip").into_bytes();
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

fn encode_header(image: &Image, encoding: &str) -> String {
    let geometry = image.geometry();
    let n = image.dimension();
    let vector = image.components() > 1;

    let mut sizes = Vec::with_capacity(n + 1);
    let mut directions = Vec::with_capacity(n + 1);
    let mut kinds = Vec::with_capacity(n + 1);
    if vector {
        sizes.push(image.components().to_string());
        directions.push("none".to_string());
        kinds.push("vector");
    }
    for axis in 0..n {
        sizes.push(image.size(axis).to_string());
        let column: Vec<f64> = (0..n)
            .map(|row| geometry.direction_at(row, axis) * geometry.spacing()[axis])
            .collect();
        directions.push(format_vector(&column));
        kinds.push("domain");
    }

    let mut header = String::new();
    header.push_str("NRRD0004\n");
    header.push_str("# Complete NRRD file format specification at:\n");
    header.push_str("# http://teem.sourceforge.net/nrrd/format.html\n");
    header.push_str(&format!("type: {}\n", image.pixel_type().nrrd_name()));
    header.push_str(&format!("dimension: {}\n", sizes.len()));
    header.push_str(&format!("space dimension: {}\n", n));
    header.push_str(&format!("sizes: {}\n", sizes.join(" ")));
    header.push_str(&format!("space directions: {}\n", directions.join(" ")));
    header.push_str(&format!("kinds: {}\n", kinds.join(" ")));
    if image.pixel_type().size() > 1 {
        header.push_str("endian: little\n");
    }
    header.push_str(&format!("encoding: {}\n", encoding));
    header.push_str(&format!("space origin: {}\n", format_vector(geometry.origin())));
    header.push('\n');
    header
}

fn split_header(bytes: &[u8]) -> ImageResult<(Header, &[u8])> {
    let mut header = Header::default();
    let mut pos = 0;
    let mut first = true;

    loop {
        let end = bytes[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|i| pos + i)
            .ok_or_else(|| ImageError::invalid_header("header is not terminated by a blank line"))?;
        let raw = &bytes[pos..end];
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = std::str::from_utf8(raw)
            .map_err(|_| ImageError::invalid_header("header is not valid text"))?;
        pos = end + 1;

        if first {
            if !line.starts_with(MAGIC) {
                return Err(ImageError::invalid_header(format!(
                    "missing NRRD magic, found '{}'",
                    line.chars().take(16).collect::<String>()
                )));
            }
            first = false;
            continue;
        }
        if line.is_empty() {
            break;
        }
        if line.starts_with('#') || line.contains(":=") {
            continue;
        }
        let (key, value) = line
            .split_once(": ")
            .ok_or_else(|| ImageError::invalid_header(format!("malformed field '{}'", line)))?;
        apply_field(&mut header, &key.to_ascii_lowercase(), value.trim())?;
    }

    Ok((header, &bytes[pos..]))
}

fn apply_field(header: &mut Header, key: &str, value: &str) -> ImageResult<()> {
    match key {
        "type" => {
            header.pixel_type = Some(PixelType::from_nrrd_name(value).ok_or_else(|| {
                ImageError::UnsupportedPixelType {
                    name: value.to_string(),
                }
            })?)
        }
        "dimension" => header.dimension = Some(parse_number(key, value)?),
        "sizes" => {
            header.sizes = value
                .split_whitespace()
                .map(|v| parse_number(key, v))
                .collect::<ImageResult<_>>()?
        }
        "space directions" => header.space_directions = Some(parse_vectors(value)?),
        "spacings" => {
            header.spacings = Some(
                value
                    .split_whitespace()
                    .map(|v| parse_float(key, v))
                    .collect::<ImageResult<_>>()?,
            )
        }
        "space origin" => {
            header.space_origin = parse_vectors(value)?.into_iter().next().flatten()
        }
        "kinds" => {
            header.kinds = Some(
                value
                    .split_whitespace()
                    .map(|k| k.to_ascii_lowercase())
                    .collect(),
            )
        }
        "endian" => {
            header.endian = Some(match value {
                "little" => Endian::Little,
                "big" => Endian::Big,
                other => {
                    return Err(ImageError::invalid_header(format!(
                        "unknown endian '{}'",
                        other
                    )))
                }
            })
        }
        "encoding" => {
            header.encoding = Some(match value {
                "raw" => Encoding::Raw,
                "ascii" | "text" | "txt" => Encoding::Ascii,
                "gzip" | "gz" => Encoding::Gzip,
                other => {
                    return Err(ImageError::UnsupportedEncoding {
                        encoding: other.to_string(),
                    })
                }
            })
        }
        "data file" | "datafile" => {
            return Err(ImageError::invalid_header(
                "detached data files are not supported",
            ))
        }
        _ => {}
    }
    Ok(())
}

fn has_component_axis(header: &Header, dimension: usize) -> bool {
    if dimension < 2 {
        return false;
    }
    if let Some(kinds) = &header.kinds {
        if let Some(kind) = kinds.first() {
            return COMPONENT_KINDS.contains(&kind.as_str());
        }
    }
    matches!(&header.space_directions, Some(dirs) if dirs.first() == Some(&None))
}

fn build_geometry(header: &Header, component_axis: bool, n: usize) -> ImageResult<Geometry> {
    let skip = usize::from(component_axis);
    let mut spacing = vec![1.0; n];
    let mut direction = vec![0.0; n * n];
    for i in 0..n {
        direction[i * n + i] = 1.0;
    }

    if let Some(dirs) = &header.space_directions {
        let spatial: Vec<&Vec<f64>> = dirs.iter().skip(skip).flatten().collect();
        if spatial.len() != n {
            return Err(ImageError::invalid_header(format!(
                "'space directions' has {} spatial vectors, expected {}",
                spatial.len(),
                n
            )));
        }
        for (axis, vector) in spatial.iter().enumerate() {
            let column: Vec<f64> = (0..n).map(|row| vector.get(row).copied().unwrap_or(0.0)).collect();
            let norm = column.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm == 0.0 || !norm.is_finite() {
                return Err(ImageError::invalid_header(format!(
                    "degenerate space direction for axis {}",
                    axis
                )));
            }
            spacing[axis] = norm;
            for (row, value) in column.iter().enumerate() {
                direction[row * n + axis] = value / norm;
            }
        }
    } else if let Some(spacings) = &header.spacings {
        for (axis, value) in spacings.iter().skip(skip).take(n).enumerate() {
            if value.is_finite() && *value != 0.0 {
                spacing[axis] = *value;
            }
        }
    }

    let origin = match &header.space_origin {
        Some(values) => (0..n).map(|i| values.get(i).copied().unwrap_or(0.0)).collect(),
        None => vec![0.0; n],
    };

    Geometry::new(spacing, origin, direction)
}

/// Parses a list of `(a,b,c)` vectors and `none` entries.
fn parse_vectors(value: &str) -> ImageResult<Vec<Option<Vec<f64>>>> {
    let mut vectors = Vec::new();
    let mut rest = value.trim();
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("none") {
            vectors.push(None);
            rest = after.trim_start();
            continue;
        }
        let inner = rest
            .strip_prefix('(')
            .and_then(|r| r.split_once(')'))
            .ok_or_else(|| ImageError::invalid_header(format!("malformed vector list '{}'", value)))?;
        let vector = inner
            .0
            .split(',')
            .map(|v| parse_float("vector", v.trim()))
            .collect::<ImageResult<Vec<f64>>>()?;
        vectors.push(Some(vector));
        rest = inner.1.trim_start();
    }
    Ok(vectors)
}

fn parse_number(key: &str, value: &str) -> ImageResult<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| ImageError::invalid_header(format!("invalid '{}' value '{}'", key, value)))
}

fn parse_float(key: &str, value: &str) -> ImageResult<f64> {
    match value.to_ascii_lowercase().as_str() {
        "nan" => Ok(f64::NAN),
        v => v
            .parse()
            .map_err(|_| ImageError::invalid_header(format!("invalid '{}' value '{}'", key, value))),
    }
}

fn format_vector(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{}", v)).collect();
    format!("({})", parts.join(","))
}

fn decode_raw(
    pixel_type: PixelType,
    endian: Endian,
    data: &[u8],
    count: usize,
) -> ImageResult<Vec<f64>> {
    let size = pixel_type.size();
    let available = data.len() / size;
    if available < count {
        return Err(ImageError::DataLength {
            expected: count,
            actual: available,
        });
    }
    let data = &data[..count * size];
    Ok(match endian {
        Endian::Little => decode_samples::<LittleEndian>(pixel_type, data),
        Endian::Big => decode_samples::<BigEndian>(pixel_type, data),
    })
}

fn inflate(data: &[u8]) -> ImageResult<Vec<u8>> {
    let mut out = Vec::new();
    MultiGzDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| ImageError::invalid_header(format!("corrupt gzip payload: {}", e)))?;
    Ok(out)
}

fn decode_samples<B: ByteOrder>(pixel_type: PixelType, data: &[u8]) -> Vec<f64> {
    let chunks = data.chunks_exact(pixel_type.size());
    match pixel_type {
        PixelType::U8 => chunks.map(|c| c[0] as f64).collect(),
        PixelType::I8 => chunks.map(|c| c[0] as i8 as f64).collect(),
        PixelType::U16 => chunks.map(|c| B::read_u16(c) as f64).collect(),
        PixelType::I16 => chunks.map(|c| B::read_i16(c) as f64).collect(),
        PixelType::U32 => chunks.map(|c| B::read_u32(c) as f64).collect(),
        PixelType::I32 => chunks.map(|c| B::read_i32(c) as f64).collect(),
        PixelType::F32 => chunks.map(|c| B::read_f32(c) as f64).collect(),
        PixelType::F64 => chunks.map(B::read_f64).collect(),
    }
}

fn decode_ascii(data: &[u8], count: usize) -> ImageResult<Vec<f64>> {
    let text = String::from_utf8_lossy(data);
    let samples = text
        .split_whitespace()
        .take(count)
        .map(|v| parse_float("data", v))
        .collect::<ImageResult<Vec<f64>>>()?;
    if samples.len() != count {
        return Err(ImageError::DataLength {
            expected: count,
            actual: samples.len(),
        });
    }
    Ok(samples)
}

fn encode_raw(pixel_type: PixelType, samples: &[f64]) -> Vec<u8> {
    let size = pixel_type.size();
    let mut out = vec![0u8; samples.len() * size];
    for (chunk, &value) in out.chunks_exact_mut(size).zip(samples) {
        let value = pixel_type.saturate(value);
        match pixel_type {
            PixelType::U8 => chunk[0] = value as u8,
            PixelType::I8 => chunk[0] = value as i8 as u8,
            PixelType::U16 => LittleEndian::write_u16(chunk, value as u16),
            PixelType::I16 => LittleEndian::write_i16(chunk, value as i16),
            PixelType::U32 => LittleEndian::write_u32(chunk, value as u32),
            PixelType::I32 => LittleEndian::write_i32(chunk, value as i32),
            PixelType::F32 => LittleEndian::write_f32(chunk, value as f32),
            PixelType::F64 => LittleEndian::write_f64(chunk, value),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_write_then_read_vector_image() {
        let geometry = Geometry::new(
            vec![0.5, 2.0],
            vec![-3.0, 4.5],
            vec![0.0, -1.0, 1.0, 0.0],
        )
        .unwrap();
        let data: Vec<f64> = (0..12).map(|v| v as f64 * 0.25).collect();
        let image = Image::from_data(PixelType::F32, &[3, 2], 2, data)
            .unwrap()
            .with_geometry(geometry)
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("field.nrrd");
        write(&path, &image).unwrap();
        let loaded = read(&path).unwrap();

        assert_eq!(loaded.dims(), &[3, 2]);
        assert_eq!(loaded.components(), 2);
        assert_eq!(loaded.data(), image.data());
        assert!(loaded.geometry().approx_eq(image.geometry()));
        assert_eq!(loaded.source_path(), Some(path.as_path()));
    }

    #[test]
    fn test_header_layout() {
        let image = Image::new(PixelType::I16, &[4, 3, 2], 1).unwrap();
        let bytes = to_bytes(&image);
        let text = String::from_utf8_lossy(&bytes[..bytes.len() - 48]);
        let header: Vec<&str> = text.split("\n\n").next().unwrap().lines().collect();
        assert_eq!(
            header,
            vec![
                "NRRD0004",
                "# Complete NRRD file format specification at:",
                "# http://teem.sourceforge.net/nrrd/format.html",
                "type: int16",
                "dimension: 3",
                "space dimension: 3",
                "sizes: 4 3 2",
                "space directions: (1,0,0) (0,1,0) (0,0,1)",
                "kinds: domain domain domain",
                "endian: little",
                "encoding: raw",
                "space origin: (0,0,0)",
            ]
        );
    }

    #[test]
    fn test_parse_big_endian_short() {
        let mut bytes = b"NRRD0004\ntype: short\ndimension: 2\nsizes: 2 1\nendian: big\nencoding: raw\nspacings: 0.5 3\n\n".to_vec();
        bytes.extend_from_slice(&[0x01, 0x00, 0xff, 0xfe]);
        let image = parse(&bytes).unwrap();
        assert_eq!(image.pixel_type(), PixelType::I16);
        assert_eq!(image.data(), &[256.0, -2.0]);
        assert_eq!(image.geometry().spacing(), &[0.5, 3.0]);
    }

    #[test]
    fn test_parse_ascii_with_comments_and_crlf() {
        let text = "NRRD0004\r\n# comment\r\ntype: uchar\r\ndimension: 2\r\nsizes: 2 2\r\nencoding: ascii\r\nspace origin: (1, 2)\r\n\r\n1 2\n3 4\n";
        let image = parse(text.as_bytes()).unwrap();
        assert_eq!(image.data(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(image.geometry().origin(), &[1.0, 2.0]);
    }

    #[test]
    fn test_component_axis_from_directions() {
        let mut bytes = b"NRRD0004\ntype: float\ndimension: 3\nsizes: 2 1 1\nspace directions: none (2,0) (0,2)\nendian: little\nencoding: raw\n\n".to_vec();
        bytes.extend_from_slice(&1.5f32.to_le_bytes());
        bytes.extend_from_slice(&(-0.5f32).to_le_bytes());
        let image = parse(&bytes).unwrap();
        assert_eq!(image.components(), 2);
        assert_eq!(image.dims(), &[1, 1]);
        assert_eq!(image.data(), &[1.5, -0.5]);
        assert_eq!(image.geometry().spacing(), &[2.0, 2.0]);
    }

    #[test]
    fn test_gzip_round_trip() {
        let geometry = Geometry::new(vec![0.5, 1.5], vec![2.0, -1.0], vec![1.0, 0.0, 0.0, 1.0]).unwrap();
        let data: Vec<f64> = (0..20).map(|v| v as f64 - 7.0).collect();
        let image = Image::from_data(PixelType::I16, &[5, 4], 1, data)
            .unwrap()
            .with_geometry(geometry)
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compressed.nrrd");
        write_gzip(&path, &image).unwrap();
        let bytes = fs::read(&path).unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("encoding: gzip\n"));

        let loaded = read(&path).unwrap();
        assert_eq!(loaded.dims(), &[5, 4]);
        assert_eq!(loaded.data(), image.data());
        assert!(loaded.geometry().approx_eq(image.geometry()));
    }

    #[test]
    fn test_parse_gzip_big_endian() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&[0x00, 0x02, 0xff, 0xff]).unwrap();
        let mut bytes = b"NRRD0004\ntype: ushort\ndimension: 1\nsizes: 2\nendian: big\nencoding: gz\n\n".to_vec();
        bytes.extend_from_slice(&encoder.finish().unwrap());
        assert_eq!(parse(&bytes).unwrap().data(), &[2.0, 65535.0]);

        let corrupt = b"NRRD0004\ntype: float\ndimension: 1\nsizes: 1\nencoding: gzip\n\nnot gzip";
        assert_eq!(parse(corrupt).unwrap_err().code(), "IMAGE_003");
    }

    #[test]
    fn test_oversized_sizes_are_rejected() {
        let huge = b"NRRD0004\ntype: float\ndimension: 2\nsizes: 18446744073709551615 2\nencoding: raw\n\n";
        let err = parse(huge).unwrap_err();
        assert_eq!(err.code(), "IMAGE_003");
        assert!(err.to_string().contains("image size overflows"));

        let vector = b"NRRD0004\ntype: double\ndimension: 3\nsizes: 3 4294967296 4294967296\nkinds: vector domain domain\n\n";
        assert_eq!(parse(vector).unwrap_err().code(), "IMAGE_003");
    }

    #[test]
    fn test_rejects_unsupported_input() {
        let bzip = b"NRRD0004\ntype: float\ndimension: 1\nsizes: 1\nencoding: bzip2\n\n";
        assert_eq!(parse(bzip).unwrap_err().code(), "IMAGE_004");

        let detached = b"NRRD0004\ntype: float\ndimension: 1\nsizes: 1\ndata file: x.raw\n\n";
        assert_eq!(parse(detached).unwrap_err().code(), "IMAGE_003");

        let short = b"NRRD0004\ntype: float\ndimension: 1\nsizes: 4\nencoding: raw\n\n\0\0";
        assert_eq!(parse(short).unwrap_err().code(), "IMAGE_006");

        assert_eq!(parse(b"P5\n2 2\n").unwrap_err().code(), "IMAGE_003");
    }

    #[test]
    fn test_integer_samples_saturate_on_write() {
        let image = Image::from_data(PixelType::U8, &[3], 1, vec![-4.0, 12.6, 900.0]).unwrap();
        let loaded = parse(&to_bytes(&image)).unwrap();
        assert_eq!(loaded.data(), &[0.0, 13.0, 255.0]);
    }
}
