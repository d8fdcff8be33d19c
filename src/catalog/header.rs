//! Mapsforge binary map header codec
//!
//! Only the file header is decoded: it carries everything the catalog and the
//! store loader need (bounding box, start position, zoom intervals) without
//! touching tile data. All integers are big-endian; strings are UTF-8 with a
//! VBE-U length prefix.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::constants::{
    MAP_FILE_MAGIC, MAX_HEADER_SIZE, MAX_MAP_FILE_VERSION, MIN_HEADER_SIZE, MIN_MAP_FILE_VERSION,
};
use crate::core::geo::{LatLng, LatLngBounds};

const FLAG_DEBUG: u8 = 0x80;
const FLAG_START_POSITION: u8 = 0x40;
const FLAG_START_ZOOM: u8 = 0x20;
const FLAG_LANGUAGE: u8 = 0x10;
const FLAG_COMMENT: u8 = 0x08;
const FLAG_CREATED_BY: u8 = 0x04;

/// Storage encoding of a map file on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compression {
    None,
    Gzip,
}

#[derive(Debug, thiserror::Error)]
pub enum HeaderError {
    #[error("not a mapsforge map file (bad magic bytes)")]
    BadMagic,

    #[error("header is truncated")]
    Truncated,

    #[error("unsupported map file version {0}")]
    UnsupportedVersion(u32),

    #[error("implausible header size {0}")]
    HeaderSize(u32),

    #[error("invalid bounding box {0:?}")]
    InvalidBoundingBox(LatLngBounds),

    #[error("invalid start position {0:?}")]
    InvalidStartPosition(LatLng),

    #[error("invalid tile size {0}")]
    InvalidTileSize(u16),

    #[error("header declares no zoom intervals")]
    NoZoomIntervals,

    #[error("string field is not valid UTF-8")]
    InvalidString,

    #[error("header records {recorded} bytes but file is {actual} bytes")]
    SizeMismatch { recorded: u64, actual: u64 },

    #[error("compressed map files are not supported in this build")]
    CompressionUnsupported,

    #[error("read failed: {0}")]
    Io(#[from] io::Error),
}

/// One entry of the zoom interval table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoomInterval {
    pub base_zoom: u8,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub start_address: u64,
    pub sub_file_size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapFileHeader {
    pub file_version: u32,
    /// Total file size as recorded by the writer
    pub file_size: u64,
    /// Creation timestamp in milliseconds since the epoch
    pub created_at_ms: u64,
    pub bounding_box: LatLngBounds,
    pub tile_size: u16,
    pub projection: String,
    pub debug: bool,
    pub start_position: Option<LatLng>,
    pub start_zoom_level: Option<u8>,
    pub language_preference: Option<String>,
    pub comment: Option<String>,
    pub created_by: Option<String>,
    pub poi_tags: Vec<String>,
    pub way_tags: Vec<String>,
    pub zoom_intervals: Vec<ZoomInterval>,
}

impl MapFileHeader {
    /// A version 5 header covering `bounding_box` with a single zoom interval
    pub fn new(bounding_box: LatLngBounds) -> Self {
        Self {
            file_version: MAX_MAP_FILE_VERSION,
            file_size: 0,
            created_at_ms: 0,
            bounding_box,
            tile_size: 256,
            projection: "Mercator".to_string(),
            debug: false,
            start_position: None,
            start_zoom_level: None,
            language_preference: None,
            comment: None,
            created_by: None,
            poi_tags: Vec::new(),
            way_tags: Vec::new(),
            zoom_intervals: vec![ZoomInterval {
                base_zoom: 14,
                min_zoom: 0,
                max_zoom: 21,
                start_address: 0,
                sub_file_size: 0,
            }],
        }
    }

    pub fn with_start_position(mut self, position: LatLng) -> Self {
        self.start_position = Some(position);
        self
    }

    pub fn with_start_zoom_level(mut self, zoom: u8) -> Self {
        self.start_zoom_level = Some(zoom);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_created_by(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = Some(created_by.into());
        self
    }

    pub fn with_zoom_intervals(mut self, intervals: Vec<ZoomInterval>) -> Self {
        self.zoom_intervals = intervals;
        self
    }

    /// Lowest and highest zoom level any interval serves
    pub fn zoom_range(&self) -> Option<(u8, u8)> {
        let min = self.zoom_intervals.iter().map(|i| i.min_zoom).min()?;
        let max = self.zoom_intervals.iter().map(|i| i.max_zoom).max()?;
        Some((min, max))
    }

    /// Reads and validates a header from the start of `reader`
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, HeaderError> {
        let mut magic = [0u8; 20];
        read_exact_or_truncated(reader, &mut magic)?;
        if &magic != MAP_FILE_MAGIC {
            return Err(HeaderError::BadMagic);
        }

        let mut size_bytes = [0u8; 4];
        read_exact_or_truncated(reader, &mut size_bytes)?;
        let header_size = u32::from_be_bytes(size_bytes);
        if !(MIN_HEADER_SIZE..=MAX_HEADER_SIZE).contains(&header_size) {
            return Err(HeaderError::HeaderSize(header_size));
        }

        let mut body = vec![0u8; header_size as usize];
        read_exact_or_truncated(reader, &mut body)?;
        let header = Self::decode_body(&body)?;
        header.validate()?;
        Ok(header)
    }

    fn decode_body(body: &[u8]) -> Result<Self, HeaderError> {
        let mut cursor = Cursor::new(body);

        let file_version = cursor.u32()?;
        if !(MIN_MAP_FILE_VERSION..=MAX_MAP_FILE_VERSION).contains(&file_version) {
            return Err(HeaderError::UnsupportedVersion(file_version));
        }
        let file_size = cursor.u64()?;
        let created_at_ms = cursor.u64()?;

        let south_west = LatLng::from_microdegrees(cursor.i32()?, cursor.i32()?);
        let north_east = LatLng::from_microdegrees(cursor.i32()?, cursor.i32()?);
        let bounding_box = LatLngBounds::new(south_west, north_east);

        let tile_size = cursor.u16()?;
        let projection = cursor.string()?;
        let flags = cursor.u8()?;

        let start_position = if flags & FLAG_START_POSITION != 0 {
            Some(LatLng::from_microdegrees(cursor.i32()?, cursor.i32()?))
        } else {
            None
        };
        let start_zoom_level = if flags & FLAG_START_ZOOM != 0 {
            Some(cursor.u8()?)
        } else {
            None
        };
        let language_preference = cursor.optional_string(flags & FLAG_LANGUAGE != 0)?;
        let comment = cursor.optional_string(flags & FLAG_COMMENT != 0)?;
        let created_by = cursor.optional_string(flags & FLAG_CREATED_BY != 0)?;

        let poi_tags = cursor.tag_list()?;
        let way_tags = cursor.tag_list()?;

        let interval_count = cursor.u8()?;
        let mut zoom_intervals = Vec::with_capacity(interval_count as usize);
        for _ in 0..interval_count {
            zoom_intervals.push(ZoomInterval {
                base_zoom: cursor.u8()?,
                min_zoom: cursor.u8()?,
                max_zoom: cursor.u8()?,
                start_address: cursor.u64()?,
                sub_file_size: cursor.u64()?,
            });
        }

        Ok(Self {
            file_version,
            file_size,
            created_at_ms,
            bounding_box,
            tile_size,
            projection,
            debug: flags & FLAG_DEBUG != 0,
            start_position,
            start_zoom_level,
            language_preference,
            comment,
            created_by,
            poi_tags,
            way_tags,
            zoom_intervals,
        })
    }

    fn validate(&self) -> Result<(), HeaderError> {
        if !self.bounding_box.is_valid() {
            return Err(HeaderError::InvalidBoundingBox(self.bounding_box));
        }
        if let Some(position) = self.start_position {
            if !position.is_valid() {
                return Err(HeaderError::InvalidStartPosition(position));
            }
        }
        if self.tile_size == 0 {
            return Err(HeaderError::InvalidTileSize(self.tile_size));
        }
        if self.zoom_intervals.is_empty() {
            return Err(HeaderError::NoZoomIntervals);
        }
        Ok(())
    }

    /// Serializes the header, magic bytes included
    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(128);
        body.extend_from_slice(&self.file_version.to_be_bytes());
        body.extend_from_slice(&self.file_size.to_be_bytes());
        body.extend_from_slice(&self.created_at_ms.to_be_bytes());

        let (min_lat, min_lng) = self.bounding_box.south_west.to_microdegrees();
        let (max_lat, max_lng) = self.bounding_box.north_east.to_microdegrees();
        for value in [min_lat, min_lng, max_lat, max_lng] {
            body.extend_from_slice(&value.to_be_bytes());
        }

        body.extend_from_slice(&self.tile_size.to_be_bytes());
        write_string(&mut body, &self.projection);

        let mut flags = 0u8;
        if self.debug {
            flags |= FLAG_DEBUG;
        }
        if self.start_position.is_some() {
            flags |= FLAG_START_POSITION;
        }
        if self.start_zoom_level.is_some() {
            flags |= FLAG_START_ZOOM;
        }
        if self.language_preference.is_some() {
            flags |= FLAG_LANGUAGE;
        }
        if self.comment.is_some() {
            flags |= FLAG_COMMENT;
        }
        if self.created_by.is_some() {
            flags |= FLAG_CREATED_BY;
        }
        body.push(flags);

        if let Some(position) = self.start_position {
            let (lat, lng) = position.to_microdegrees();
            body.extend_from_slice(&lat.to_be_bytes());
            body.extend_from_slice(&lng.to_be_bytes());
        }
        if let Some(zoom) = self.start_zoom_level {
            body.push(zoom);
        }
        for text in [&self.language_preference, &self.comment, &self.created_by]
            .into_iter()
            .flatten()
        {
            write_string(&mut body, text);
        }

        for tags in [&self.poi_tags, &self.way_tags] {
            body.extend_from_slice(&(tags.len() as u16).to_be_bytes());
            for tag in tags {
                write_string(&mut body, tag);
            }
        }

        body.push(self.zoom_intervals.len() as u8);
        for interval in &self.zoom_intervals {
            body.push(interval.base_zoom);
            body.push(interval.min_zoom);
            body.push(interval.max_zoom);
            body.extend_from_slice(&interval.start_address.to_be_bytes());
            body.extend_from_slice(&interval.sub_file_size.to_be_bytes());
        }

        let mut out = Vec::with_capacity(MAP_FILE_MAGIC.len() + 4 + body.len());
        out.extend_from_slice(MAP_FILE_MAGIC);
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(&body);
        out
    }

    /// Encodes a header-only file whose recorded size matches its length
    pub fn to_standalone_file(&self) -> Vec<u8> {
        let mut header = self.clone();
        header.file_size = header.encode().len() as u64;
        header.encode()
    }
}

/// Reads the header of the file at `path`, decompressing if needed.
///
/// With `expected_len` set, a plain file whose recorded size differs from it is
/// rejected. Compressed files skip the check since the header describes the
/// decompressed stream.
pub fn inspect_file(
    path: &Path,
    compression: Compression,
    expected_len: Option<u64>,
) -> Result<MapFileHeader, HeaderError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    match compression {
        Compression::None => {
            let header = MapFileHeader::read_from(&mut reader)?;
            if let Some(actual) = expected_len {
                if header.file_size != actual {
                    return Err(HeaderError::SizeMismatch {
                        recorded: header.file_size,
                        actual,
                    });
                }
            }
            Ok(header)
        }
        Compression::Gzip => read_gzip_header(reader),
    }
}

#[cfg(feature = "gzip")]
fn read_gzip_header<R: Read>(reader: R) -> Result<MapFileHeader, HeaderError> {
    let mut decoder = flate2::read::GzDecoder::new(reader);
    MapFileHeader::read_from(&mut decoder)
}

#[cfg(not(feature = "gzip"))]
fn read_gzip_header<R: Read>(_reader: R) -> Result<MapFileHeader, HeaderError> {
    Err(HeaderError::CompressionUnsupported)
}

fn read_exact_or_truncated<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), HeaderError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => HeaderError::Truncated,
        // gzip streams that end early or carry garbage surface as InvalidInput/InvalidData
        io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => HeaderError::Truncated,
        _ => HeaderError::Io(e),
    })
}

fn write_vbe_u(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

fn write_string(out: &mut Vec<u8>, text: &str) {
    write_vbe_u(out, text.len() as u64);
    out.extend_from_slice(text.as_bytes());
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], HeaderError> {
        let end = self.pos.checked_add(len).ok_or(HeaderError::Truncated)?;
        let slice = self.buf.get(self.pos..end).ok_or(HeaderError::Truncated)?;
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], HeaderError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, HeaderError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, HeaderError> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32, HeaderError> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    fn i32(&mut self) -> Result<i32, HeaderError> {
        Ok(i32::from_be_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64, HeaderError> {
        Ok(u64::from_be_bytes(self.array()?))
    }

    fn vbe_u(&mut self) -> Result<u64, HeaderError> {
        let mut value = 0u64;
        for shift in (0..64).step_by(7) {
            let byte = self.u8()?;
            value |= ((byte & 0x7f) as u64) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(HeaderError::Truncated)
    }

    fn string(&mut self) -> Result<String, HeaderError> {
        let len = usize::try_from(self.vbe_u()?).map_err(|_| HeaderError::Truncated)?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| HeaderError::InvalidString)
    }

    fn optional_string(&mut self, present: bool) -> Result<Option<String>, HeaderError> {
        if present {
            self.string().map(Some)
        } else {
            Ok(None)
        }
    }

    fn tag_list(&mut self) -> Result<Vec<String>, HeaderError> {
        let count = self.u16()?;
        (0..count).map(|_| self.string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn berlin() -> MapFileHeader {
        MapFileHeader::new(LatLngBounds::from_coords(52.3, 13.0, 52.7, 13.7))
    }

    #[test]
    fn test_decode_restores_optional_fields() {
        let mut header = berlin()
            .with_start_position(LatLng::new(52.516, 13.377))
            .with_start_zoom_level(14)
            .with_comment("Berlin extract")
            .with_created_by("osmosis-mapfile-writer");
        header.poi_tags = vec!["amenity=cafe".into()];
        header.way_tags = vec!["highway=primary".into(), "building=yes".into()];

        let bytes = header.encode();
        let decoded = MapFileHeader::read_from(&mut bytes.as_slice()).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut bytes = berlin().encode();
        bytes[0] = b'X';
        assert!(matches!(
            MapFileHeader::read_from(&mut bytes.as_slice()),
            Err(HeaderError::BadMagic)
        ));
    }

    #[test]
    fn test_placeholder_text_file_rejected() {
        let bytes = b"Mapsforge map file for berlin".to_vec();
        assert!(matches!(
            MapFileHeader::read_from(&mut bytes.as_slice()),
            Err(HeaderError::BadMagic)
        ));
    }

    #[test]
    fn test_truncated_header_rejected() {
        let bytes = berlin().encode();
        let cut = &bytes[..bytes.len() - 5];
        assert!(matches!(
            MapFileHeader::read_from(&mut &cut[..]),
            Err(HeaderError::Truncated)
        ));
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let mut header = berlin();
        header.file_version = 2;
        let bytes = header.encode();
        assert!(matches!(
            MapFileHeader::read_from(&mut bytes.as_slice()),
            Err(HeaderError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn test_inverted_bounding_box_rejected() {
        let header = MapFileHeader::new(LatLngBounds::from_coords(52.7, 13.0, 52.3, 13.7));
        let bytes = header.encode();
        assert!(matches!(
            MapFileHeader::read_from(&mut bytes.as_slice()),
            Err(HeaderError::InvalidBoundingBox(_))
        ));
    }

    #[test]
    fn test_long_strings_use_multi_byte_length() {
        let header = berlin().with_comment("x".repeat(300));
        let bytes = header.encode();
        let decoded = MapFileHeader::read_from(&mut bytes.as_slice()).unwrap();
        assert_eq!(decoded.comment.unwrap().len(), 300);
    }

    #[test]
    fn test_standalone_file_records_its_own_length() {
        let bytes = berlin().to_standalone_file();
        let decoded = MapFileHeader::read_from(&mut bytes.as_slice()).unwrap();
        assert_eq!(decoded.file_size, bytes.len() as u64);
    }

    #[test]
    fn test_inspect_detects_size_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("berlin.map");
        let mut bytes = berlin().to_standalone_file();
        bytes.extend_from_slice(&[0u8; 16]);
        std::fs::write(&path, &bytes).unwrap();

        let err = inspect_file(&path, Compression::None, Some(bytes.len() as u64)).unwrap_err();
        assert!(matches!(err, HeaderError::SizeMismatch { .. }));
        assert!(inspect_file(&path, Compression::None, None).is_ok());
    }

    #[cfg(feature = "gzip")]
    #[test]
    fn test_inspect_reads_gzip_stream() {
        use flate2::{write::GzEncoder, Compression as Level};
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("berlin.map.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Level::default());
        encoder.write_all(&berlin().to_standalone_file()).unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let header = inspect_file(&path, Compression::Gzip, Some(1)).unwrap();
        assert_eq!(header.bounding_box, berlin().bounding_box);
    }

    #[test]
    fn test_zoom_range_spans_all_intervals() {
        let interval = |min_zoom, max_zoom| ZoomInterval {
            base_zoom: min_zoom,
            min_zoom,
            max_zoom,
            start_address: 0,
            sub_file_size: 0,
        };
        let header =
            berlin().with_zoom_intervals(vec![interval(5, 7), interval(8, 11), interval(12, 21)]);
        assert_eq!(header.zoom_range(), Some((5, 21)));
    }
}
