//! Tag indexes and packet property ids of the ISF wire format.

// Structure tags.
pub const TAG_INK_SPACE_RECT: u64 = 0;
pub const TAG_GUID_TABLE: u64 = 1;
pub const TAG_DRAW_ATTRS_TABLE: u64 = 2;
pub const TAG_DRAW_ATTRS_BLOCK: u64 = 3;
pub const TAG_STROKE_DESC_TABLE: u64 = 4;
pub const TAG_STROKE_DESC_BLOCK: u64 = 5;
pub const TAG_BUTTONS: u64 = 6;
pub const TAG_NO_X: u64 = 7;
pub const TAG_NO_Y: u64 = 8;
pub const TAG_DIDX: u64 = 9;
pub const TAG_STROKE: u64 = 10;
pub const TAG_STROKE_PROPERTY_LIST: u64 = 11;
pub const TAG_POINT_PROPERTY: u64 = 12;
pub const TAG_SIDX: u64 = 13;
pub const TAG_COMPRESSION_HEADER: u64 = 14;

// Transformation tags.
pub const TAG_TRANSFORM_TABLE: u64 = 15;
pub const TAG_TRANSFORM: u64 = 16;
pub const TAG_TRANSFORM_ISOTROPIC_SCALE: u64 = 17;
pub const TAG_TRANSFORM_ANISOTROPIC_SCALE: u64 = 18;
pub const TAG_TRANSFORM_ROTATE: u64 = 19;
pub const TAG_TRANSFORM_TRANSLATE: u64 = 20;
pub const TAG_TRANSFORM_SCALE_AND_TRANSLATE: u64 = 21;
pub const TAG_TRANSFORM_QUAD: u64 = 22;
pub const TAG_TIDX: u64 = 23;

// Metric tags.
pub const TAG_METRIC_TABLE: u64 = 24;
pub const TAG_METRIC_BLOCK: u64 = 25;
pub const TAG_MIDX: u64 = 26;

pub const TAG_MANTISSA: u64 = 27;
pub const TAG_PERSISTENT_FORMAT: u64 = 28;
pub const TAG_HIMETRIC_SIZE: u64 = 29;
pub const TAG_STROKE_IDS: u64 = 30;

/// First tag index available to the custom GUIDs registered by the
/// stream's GUID table.
pub const FIRST_CUSTOM_TAG: u64 = 100;

/// Printable name of a tag index, for tracing.
pub fn tag_name(tag: u64) -> &'static str {
    match tag {
        TAG_INK_SPACE_RECT => "TAG_INK_SPACE_RECT",
        TAG_GUID_TABLE => "TAG_GUID_TABLE",
        TAG_DRAW_ATTRS_TABLE => "TAG_DRAW_ATTRS_TABLE",
        TAG_DRAW_ATTRS_BLOCK => "TAG_DRAW_ATTRS_BLOCK",
        TAG_STROKE_DESC_TABLE => "TAG_STROKE_DESC_TABLE",
        TAG_STROKE_DESC_BLOCK => "TAG_STROKE_DESC_BLOCK",
        TAG_BUTTONS => "TAG_BUTTONS",
        TAG_NO_X => "TAG_NO_X",
        TAG_NO_Y => "TAG_NO_Y",
        TAG_DIDX => "TAG_DIDX",
        TAG_STROKE => "TAG_STROKE",
        TAG_STROKE_PROPERTY_LIST => "TAG_STROKE_PROPERTY_LIST",
        TAG_POINT_PROPERTY => "TAG_POINT_PROPERTY",
        TAG_SIDX => "TAG_SIDX",
        TAG_COMPRESSION_HEADER => "TAG_COMPRESSION_HEADER",
        TAG_TRANSFORM_TABLE => "TAG_TRANSFORM_TABLE",
        TAG_TRANSFORM => "TAG_TRANSFORM",
        TAG_TRANSFORM_ISOTROPIC_SCALE => "TAG_TRANSFORM_ISOTROPIC_SCALE",
        TAG_TRANSFORM_ANISOTROPIC_SCALE => "TAG_TRANSFORM_ANISOTROPIC_SCALE",
        TAG_TRANSFORM_ROTATE => "TAG_TRANSFORM_ROTATE",
        TAG_TRANSFORM_TRANSLATE => "TAG_TRANSFORM_TRANSLATE",
        TAG_TRANSFORM_SCALE_AND_TRANSLATE => "TAG_TRANSFORM_SCALE_AND_TRANSLATE",
        TAG_TRANSFORM_QUAD => "TAG_TRANSFORM_QUAD",
        TAG_TIDX => "TAG_TIDX",
        TAG_METRIC_TABLE => "TAG_METRIC_TABLE",
        TAG_METRIC_BLOCK => "TAG_METRIC_BLOCK",
        TAG_MIDX => "TAG_MIDX",
        TAG_MANTISSA => "TAG_MANTISSA",
        TAG_PERSISTENT_FORMAT => "TAG_PERSISTENT_FORMAT",
        TAG_HIMETRIC_SIZE => "TAG_HIMETRIC_SIZE",
        TAG_STROKE_IDS => "TAG_STROKE_IDS",
        _ => "unknown tag",
    }
}

/// Packet property ids used inside metric blocks. The Metrics structure
/// describes how values of these channels are to be interpreted.
pub mod metric_property {
    pub const X: u64 = 50;
    pub const Y: u64 = 51;
    pub const Z: u64 = 52;
    pub const PACKET_STATUS: u64 = 53;
    pub const TIMER_TICK: u64 = 54;
    pub const SERIAL_NUMBER: u64 = 55;
    pub const NORMAL_PRESSURE: u64 = 56;
    pub const TANGENT_PRESSURE: u64 = 57;
    pub const BUTTON_PRESSURE: u64 = 58;
    pub const X_TILT_ORIENTATION: u64 = 59;
    pub const Y_TILT_ORIENTATION: u64 = 60;
    pub const AZIMUTH_ORIENTATION: u64 = 61;
    pub const ALTITUDE_ORIENTATION: u64 = 62;
    pub const TWIST_ORIENTATION: u64 = 63;
    pub const PITCH_ROTATION: u64 = 64;
    pub const ROLL_ROTATION: u64 = 65;
    pub const YAW_ROTATION: u64 = 66;
}

/// Property ids used inside drawing attribute blocks.
pub mod attr_property {
    pub const COLORREF: u64 = 59;
    pub const PEN_WIDTH: u64 = 60;
    pub const PEN_HEIGHT: u64 = 61;
    pub const PEN_TIP: u64 = 62;
    pub const DRAWING_FLAGS: u64 = 63;
    pub const TRANSPARENCY: u64 = 71;
    pub const ROP: u64 = 77;
}
