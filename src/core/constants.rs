//! Format constants and engine-wide defaults for offline map handling.
//! Keeping them in a single place makes it easier to tweak magic numbers.

/// Microdegrees per degree, the fixed-point unit of map file coordinates.
pub const MICRODEGREES: f64 = 1_000_000.0;

/// Largest latitude representable in Web Mercator.
pub const MAX_LATITUDE: f64 = 85.051_128_779_8;

/// Magic bytes every Mapsforge binary map file starts with.
pub const MAP_FILE_MAGIC: &[u8; 20] = b"mapsforge binary OSM";

/// Oldest and newest map file versions the header reader accepts.
pub const MIN_MAP_FILE_VERSION: u32 = 3;
pub const MAX_MAP_FILE_VERSION: u32 = 5;

/// Bounds on the declared header size, guarding against garbage lengths.
pub const MIN_HEADER_SIZE: u32 = 70;
pub const MAX_HEADER_SIZE: u32 = 1_000_000;

/// Plain map file extension.
pub const MAP_EXTENSION: &str = ".map";

/// Gzip-compressed map file extension.
pub const COMPRESSED_MAP_EXTENSION: &str = ".map.gz";

/// Theme file name inside the maps directory.
pub const DEFAULT_THEME_FILE: &str = "default.xml";

/// Zoom level used when a map file does not record a start zoom.
pub const DEFAULT_ZOOM_LEVEL: u8 = 12;

/// Suffix for files an acquirer is still writing.
pub const STAGING_SUFFIX: &str = ".partial";
