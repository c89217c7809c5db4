#![allow(dead_code)]

//! Codec for Ink Serialized Format (ISF) streams.
//!
//! ISF is the compact binary representation of freehand pen input used by
//! Tablet PC applications: strokes made of integer points, per-stroke drawing
//! attributes, coordinate-space metrics and affine transforms, all packed
//! into a tag-driven stream that mixes multi-byte integers with bit-level
//! coordinate compression.
//!
//! The two entry points are [`decode`], which materialises a [`Drawing`]
//! from raw ISF bytes, and [`encode`], which serialises a [`Drawing`] back.

use std::error;
use std::fmt;

pub mod compress;
pub mod datasource;
pub mod model;
pub mod multibyte;
pub mod tags;

mod parser;
mod writer;

pub use model::{
    AttributeSet, AttributeSetId, Color, Drawing, Guid, InkRect, Metric, MetricUnit, Metrics,
    MetricsId, Point, Rect, Size, Stroke, StrokeInfo, StrokeInfoId, Transform, TransformId,
};

/// The only ISF stream version this library understands.
pub const SUPPORTED_ISF_VERSION: u64 = 0;

/// The only value ever observed in a `PERSISTENT_FORMAT` payload,
/// multibyte-encoded on the wire as `0x80 0x80 0x04`.
pub const PERSISTENT_FORMAT_VERSION: u64 = 65536;

/// Conversion factor from HiMetric units to pixels.
pub const HIMETRIC_TO_PIXEL: f32 = 26.457_245;

/// Upper bound on the declared point count of a single stroke.
///
/// The count is read from the wire before any allocation happens, so a
/// hostile stream could otherwise request an arbitrarily large buffer.
pub const MAX_STROKE_POINTS: u64 = 10_000_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IsfError {
    /// The bit source ran out of data mid-read.
    EndOfStream,

    /// The stream version is not the single supported value.
    BadVersion { version: u64 },

    /// The declared stream size does not match the remaining byte count.
    BadStreamSize { declared: u64, remaining: u64 },

    /// Wrong or duplicated tags: a singleton tag appeared twice, or a custom
    /// tag referenced a GUID that was never registered.
    InvalidStream { context: &'static str },

    /// A tag payload was empty or inconsistent with its inner content.
    InvalidPayload { context: &'static str },

    /// A sub-record was malformed: unknown transform tag, bad metric record.
    InvalidBlock { context: &'static str },

    /// A documented but unimplemented corner of the format was encountered.
    Unsupported { feature: &'static str },

    /// A contract violation inside the codec itself.
    Internal { context: &'static str },
}

impl error::Error for IsfError {}
impl fmt::Display for IsfError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::EndOfStream => {
                write!(f, "unexpected end of stream")
            }
            Self::BadVersion { version } => {
                write!(f, "unsupported ISF version {}", version)
            }
            Self::BadStreamSize {
                declared,
                remaining,
            } => {
                write!(
                    f,
                    "declared stream size {} does not match the {} remaining bytes",
                    declared, remaining
                )
            }
            Self::InvalidStream { context } => {
                write!(f, "invalid stream: {}", context)
            }
            Self::InvalidPayload { context } => {
                write!(f, "invalid payload: {}", context)
            }
            Self::InvalidBlock { context } => {
                write!(f, "invalid block: {}", context)
            }
            Self::Unsupported { feature } => {
                write!(f, "unsupported stream feature: {}", feature)
            }
            Self::Internal { context } => {
                write!(f, "internal codec error: {}", context)
            }
        }
    }
}

/// Decode a raw ISF byte stream into a [`Drawing`].
///
/// This never fails outright: parse errors are recorded on the returned
/// drawing ([`Drawing::error`]) together with whatever content was
/// successfully read before the error, which may be useful for diagnostics
/// but is not guaranteed to be renderable. Empty input yields a null
/// drawing with no error.
pub fn decode(data: &[u8]) -> Drawing {
    parser::parse_stream(data)
}

/// Encode a [`Drawing`] as a raw ISF byte stream.
///
/// A null or empty drawing encodes to an empty byte vector. Unlike
/// [`decode`], failures short-circuit and the partial output is discarded.
pub fn encode(drawing: &Drawing) -> Result<Vec<u8>, IsfError> {
    writer::write_stream(drawing)
}
