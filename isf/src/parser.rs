//! Tag-driven stream parser.
//!
//! Decoding walks a small state machine: read the stream version, check the
//! declared stream size against the bytes that remain, then consume tags
//! until the data runs out or a tag handler fails. The first error ends the
//! walk; everything parsed before it stays on the drawing.

use log::{debug, warn};

use crate::compress;
use crate::datasource::DataSource;
use crate::model::{
    AttributeSet, Drawing, Guid, InkRect, Metric, MetricUnit, Metrics, Point, Rect, Size, Stroke,
    StrokeInfo, Transform, IS_RECTANGLE,
};
use crate::multibyte::{decode_float, decode_int, decode_uint};
use crate::tags::*;
use crate::{
    IsfError, HIMETRIC_TO_PIXEL, MAX_STROKE_POINTS, PERSISTENT_FORMAT_VERSION,
    SUPPORTED_ISF_VERSION,
};

// Custom GUIDs observed to carry string-valued payloads.
const STRING_GUIDS: [[u8; 16]; 2] = [
    [
        0x96, 0xE9, 0xB2, 0x29, 0xB6, 0x57, 0xDA, 0x4F, 0xBF, 0xFD, 0xF5, 0x4D, 0xBA, 0x4C, 0x35,
        0xF9,
    ],
    [
        0x7C, 0x8E, 0x44, 0x8A, 0x39, 0x0F, 0xD9, 0x4C, 0xBB, 0x52, 0x71, 0xFD, 0xA3, 0x22, 0x16,
        0x74,
    ],
];

#[derive(Debug, PartialEq)]
enum ParserState {
    Start,
    StreamSize,
    Tag,
    Finish,
}

/// Parser working state.
///
/// The four "current" registers select which shared table entry the next
/// stroke binds to; they belong to the parse, not to the drawing, which
/// only records the final per-stroke bindings.
struct TagParser {
    current_attributes: Option<crate::model::AttributeSetId>,
    current_metrics: Option<crate::model::MetricsId>,
    current_transform: Option<crate::model::TransformId>,
    current_stroke_info: Option<crate::model::StrokeInfoId>,

    // Maximum pen size seen so far, in HiMetric units; converted to pixels
    // once the tag walk is over.
    max_pen_himetric: Size,

    // Union of the stroke bounding rectangles.
    bounds: Option<Rect>,
}

/// Decode a raw ISF byte stream into a drawing.
pub(crate) fn parse_stream(data: &[u8]) -> Drawing {
    let mut drawing = Drawing::new();

    if data.is_empty() {
        return drawing;
    }

    let mut source = DataSource::from_bytes(data.to_vec());
    let mut parser = TagParser {
        current_attributes: None,
        current_metrics: None,
        current_transform: None,
        current_stroke_info: None,
        max_pen_himetric: Size::default(),
        bounds: None,
    };

    let mut state = ParserState::Start;

    while state != ParserState::Finish {
        match state {
            ParserState::Start => match decode_uint(&mut source) {
                Ok(version) if version == SUPPORTED_ISF_VERSION => {
                    state = ParserState::StreamSize;
                }
                Ok(version) => {
                    debug!("unsupported stream version {}", version);
                    drawing.set_error(IsfError::BadVersion { version });
                    state = ParserState::Finish;
                }
                Err(error) => {
                    drawing.set_error(error);
                    state = ParserState::Finish;
                }
            },

            ParserState::StreamSize => match decode_uint(&mut source) {
                Ok(declared) => {
                    let remaining = (source.size() - source.pos()) as u64;
                    if declared != remaining {
                        debug!(
                            "declared stream size {} but {} bytes remain",
                            declared, remaining
                        );
                        drawing.set_error(IsfError::BadStreamSize {
                            declared,
                            remaining,
                        });
                        state = ParserState::Finish;
                    } else {
                        debug!("reading ISF stream of {} bytes", declared);
                        drawing.set_null(false);
                        state = ParserState::Tag;
                    }
                }
                Err(error) => {
                    drawing.set_error(error);
                    state = ParserState::Finish;
                }
            },

            ParserState::Tag => {
                if source.at_end(false) {
                    state = ParserState::Finish;
                    continue;
                }

                let result = decode_uint(&mut source)
                    .and_then(|tag| parser.dispatch_tag(&mut source, &mut drawing, tag));

                if let Err(error) = result {
                    warn!("parse error, stopping: {}", error);
                    drawing.set_error(error);
                    state = ParserState::Finish;
                }
            }

            ParserState::Finish => {}
        }
    }

    if drawing.error().is_none() {
        // The maximum pen size was accumulated in HiMetric units; convert
        // it and widen the bounding rectangle so thick border strokes stay
        // inside it.
        let max_pen = Size::new(
            parser.max_pen_himetric.width / HIMETRIC_TO_PIXEL,
            parser.max_pen_himetric.height / HIMETRIC_TO_PIXEL,
        );
        drawing.set_max_pen_size(max_pen);

        if let Some(bounds) = parser.bounds {
            drawing.set_bounding_rect(bounds.adjusted(
                -max_pen.width,
                -max_pen.height,
                max_pen.width,
                max_pen.height,
            ));
        }
    }

    drawing
}

impl TagParser {
    fn dispatch_tag(
        &mut self,
        source: &mut DataSource,
        drawing: &mut Drawing,
        tag: u64,
    ) -> Result<(), IsfError> {
        debug!("got tag: {} at byte offset {}", tag_name(tag), source.pos());

        match tag {
            TAG_INK_SPACE_RECT => self.parse_ink_space_rect(source, drawing),
            TAG_GUID_TABLE => self.parse_guid_table(source, drawing),
            TAG_DRAW_ATTRS_TABLE => self.parse_attribute_table(source, drawing),
            TAG_DRAW_ATTRS_BLOCK => self.parse_attribute_block(source, drawing),
            TAG_STROKE_DESC_TABLE => self.parse_stroke_desc_table(source, drawing),
            TAG_STROKE_DESC_BLOCK => self.parse_stroke_desc_block(source, drawing),
            TAG_NO_X => {
                drawing.set_has_x_data(false);
                Ok(())
            }
            TAG_NO_Y => {
                drawing.set_has_y_data(false);
                Ok(())
            }
            TAG_DIDX => {
                let value = decode_uint(source)?;
                if (value as usize) < drawing.attribute_sets().len() {
                    self.current_attributes = Some(crate::model::AttributeSetId(value as usize));
                } else {
                    warn!("attribute set index {} out of range", value);
                }
                Ok(())
            }
            TAG_STROKE => self.parse_stroke(source, drawing),
            TAG_SIDX => {
                let value = decode_uint(source)?;
                if (value as usize) < drawing.stroke_infos().len() {
                    self.current_stroke_info = Some(crate::model::StrokeInfoId(value as usize));
                } else {
                    warn!("stroke descriptor index {} out of range", value);
                }
                Ok(())
            }
            TAG_TRANSFORM_TABLE => self.parse_transform_table(source, drawing),
            TAG_TRANSFORM
            | TAG_TRANSFORM_ISOTROPIC_SCALE
            | TAG_TRANSFORM_ANISOTROPIC_SCALE
            | TAG_TRANSFORM_ROTATE
            | TAG_TRANSFORM_TRANSLATE
            | TAG_TRANSFORM_SCALE_AND_TRANSLATE
            | TAG_TRANSFORM_QUAD => self.parse_transformation(source, drawing, tag),
            TAG_TIDX => {
                let value = decode_uint(source)?;
                if (value as usize) < drawing.transforms().len() {
                    self.current_transform = Some(crate::model::TransformId(value as usize));
                } else {
                    warn!("transform index {} out of range", value);
                }
                Ok(())
            }
            TAG_METRIC_TABLE => self.parse_metric_table(source, drawing),
            TAG_METRIC_BLOCK => self.parse_metric_block(source, drawing),
            TAG_MIDX => {
                let value = decode_uint(source)?;
                if (value as usize) < drawing.metrics_tables().len() {
                    self.current_metrics = Some(crate::model::MetricsId(value as usize));
                } else {
                    warn!("metrics index {} out of range", value);
                }
                Ok(())
            }
            TAG_PERSISTENT_FORMAT => self.parse_persistent_format(source),
            TAG_HIMETRIC_SIZE => self.parse_himetric_size(source, drawing),
            tag if tag >= FIRST_CUSTOM_TAG => self.parse_custom_tag(source, drawing, tag),
            _ => {
                // TAG_BUTTONS, TAG_STROKE_PROPERTY_LIST, TAG_POINT_PROPERTY,
                // TAG_COMPRESSION_HEADER, TAG_MANTISSA, TAG_STROKE_IDS and
                // anything unassigned: length-prefixed and ignored.
                self.skip_payload(source, tag)
            }
        }
    }

    /// Read a length-prefixed payload and discard it.
    fn skip_payload(&mut self, source: &mut DataSource, tag: u64) -> Result<(), IsfError> {
        let payload_size = decode_uint(source)?;
        debug!(
            "skipping {} bytes of payload for {}",
            payload_size,
            tag_name(tag)
        );
        source.skip_bytes(payload_size as usize)
    }

    /// The ink canvas dimensions: four bare multi-byte signed integers.
    fn parse_ink_space_rect(
        &mut self,
        source: &mut DataSource,
        drawing: &mut Drawing,
    ) -> Result<(), IsfError> {
        if drawing.canvas().is_some() {
            return Err(IsfError::InvalidStream {
                context: "duplicated TAG_INK_SPACE_RECT",
            });
        }

        let canvas = InkRect {
            left: decode_int(source)?,
            top: decode_int(source)?,
            right: decode_int(source)?,
            bottom: decode_int(source)?,
        };
        debug!("drawing canvas: {:?}", canvas);
        drawing.set_canvas(canvas);

        Ok(())
    }

    /// The table of custom GUIDs: 16-byte entries mapped to tag ids from
    /// 100 upwards.
    fn parse_guid_table(
        &mut self,
        source: &mut DataSource,
        drawing: &mut Drawing,
    ) -> Result<(), IsfError> {
        if !drawing.guids().is_empty() {
            return Err(IsfError::InvalidStream {
                context: "duplicated TAG_GUID_TABLE",
            });
        }

        let table_size = decode_uint(source)?;
        let num_guids = table_size / 16;

        for index in 0..num_guids {
            let bytes = source.get_bytes(16)?;
            let mut guid = [0u8; 16];
            guid.copy_from_slice(&bytes);

            drawing.register_guid(Guid(guid));
            debug!(
                "guid table entry {} -> {}",
                index + FIRST_CUSTOM_TAG,
                Guid(guid)
            );
        }

        // A table size that is not a multiple of 16 leaves stray bytes.
        let leftover = (table_size % 16) as usize;
        if leftover != 0 {
            warn!("guid table has {} trailing bytes, skipping", leftover);
            source.skip_bytes(leftover)?;
        }

        debug!("new maximum GUID index: {}", drawing.max_guid());

        Ok(())
    }

    /// A table of attribute blocks.
    fn parse_attribute_table(
        &mut self,
        source: &mut DataSource,
        drawing: &mut Drawing,
    ) -> Result<(), IsfError> {
        let payload_size = decode_uint(source)?;
        if payload_size == 0 {
            return Err(IsfError::InvalidPayload {
                context: "empty TAG_DRAW_ATTRS_TABLE",
            });
        }

        let payload_end = source.pos().saturating_add(payload_size as usize);
        while source.pos() < payload_end && !source.at_end(false) {
            self.parse_attribute_block(source, drawing)?;
        }

        Ok(())
    }

    /// One block of drawing attributes: a length-prefixed run of
    /// `(property, value)` pairs.
    fn parse_attribute_block(
        &mut self,
        source: &mut DataSource,
        drawing: &mut Drawing,
    ) -> Result<(), IsfError> {
        let payload_size = decode_uint(source)?;
        if payload_size == 0 {
            return Err(IsfError::InvalidPayload {
                context: "empty TAG_DRAW_ATTRS_BLOCK",
            });
        }

        let mut set = AttributeSet::default();

        let payload_end = source.pos().saturating_add(payload_size as usize);
        while source.pos() < payload_end && !source.at_end(false) {
            let property = decode_uint(source)?;
            let value = decode_uint(source)?;

            match property {
                attr_property::COLORREF => {
                    // Stored as 0x00BBGGRR; transparency travels separately.
                    set.color.r = (value & 0xFF) as u8;
                    set.color.g = ((value >> 8) & 0xFF) as u8;
                    set.color.b = ((value >> 16) & 0xFF) as u8;
                    debug!("pen color #{:02X}{:02X}{:02X}", set.color.r, set.color.g, set.color.b);
                }
                attr_property::PEN_WIDTH => {
                    // In round pens the width is the only dimension present.
                    let pixels = value as f32 / HIMETRIC_TO_PIXEL;
                    set.pen_size.width = pixels;
                    set.pen_size.height = pixels;
                    debug!("pen width {} ({} pixels)", value, pixels);
                }
                attr_property::PEN_HEIGHT => {
                    set.pen_size.height = value as f32 / HIMETRIC_TO_PIXEL;
                    debug!("pen height {}", value);
                }
                attr_property::PEN_TIP => {
                    debug!("pen tip is rectangular: {}", value != 0);
                    if value != 0 {
                        set.flags |= IS_RECTANGLE;
                    }
                }
                attr_property::DRAWING_FLAGS => {
                    set.flags = (set.flags & 0xFF00) | (value as u16 & 0x00FF);
                    debug!("drawing flags {:#06X}", set.flags);
                }
                attr_property::TRANSPARENCY => {
                    set.color.a = value as u8;
                    debug!("pen transparency {}", value);
                }
                attr_property::ROP => {
                    // Opaque raster-operation data, three bytes.
                    source.skip_bytes(3)?;
                }
                _ => {
                    if drawing.max_guid() > 0
                        && property >= FIRST_CUSTOM_TAG
                        && property <= drawing.max_guid()
                    {
                        debug!("custom attribute property {} ignored", property);
                    } else {
                        debug!("unknown attribute property {} ignored", property);
                    }
                }
            }
        }

        self.max_pen_himetric.width = self
            .max_pen_himetric
            .width
            .max(set.pen_size.width * HIMETRIC_TO_PIXEL);
        self.max_pen_himetric.height = self
            .max_pen_himetric
            .height
            .max(set.pen_size.height * HIMETRIC_TO_PIXEL);

        let id = drawing.add_attribute_set(set);
        // The first block becomes current right away, so strokes before any
        // DIDX use it rather than the defaults.
        if self.current_attributes.is_none() {
            self.current_attributes = Some(id);
        }
        debug!("added drawing attribute block #{}", id.index());

        Ok(())
    }

    /// A table of stroke descriptor blocks.
    fn parse_stroke_desc_table(
        &mut self,
        source: &mut DataSource,
        drawing: &mut Drawing,
    ) -> Result<(), IsfError> {
        let payload_size = decode_uint(source)?;
        if payload_size == 0 {
            return Err(IsfError::InvalidPayload {
                context: "empty TAG_STROKE_DESC_TABLE",
            });
        }

        let payload_end = source.pos().saturating_add(payload_size as usize);
        while source.pos() < payload_end && !source.at_end(false) {
            self.parse_stroke_desc_block(source, drawing)?;
        }

        Ok(())
    }

    /// One stroke descriptor: which packet channels subsequent strokes
    /// carry.
    fn parse_stroke_desc_block(
        &mut self,
        source: &mut DataSource,
        drawing: &mut Drawing,
    ) -> Result<(), IsfError> {
        let payload_size = decode_uint(source)?;
        if payload_size == 0 {
            return Err(IsfError::InvalidPayload {
                context: "empty TAG_STROKE_DESC_BLOCK",
            });
        }

        let mut info = StrokeInfo::default();

        let payload_end = source.pos().saturating_add(payload_size as usize);
        while source.pos() < payload_end && !source.at_end(false) {
            let sub_tag = decode_uint(source)?;

            match sub_tag {
                TAG_NO_X => {
                    debug!("strokes contain no X coordinates");
                    info.has_x = false;
                }
                TAG_NO_Y => {
                    debug!("strokes contain no Y coordinates");
                    info.has_y = false;
                }
                TAG_BUTTONS | TAG_STROKE_PROPERTY_LIST => {
                    debug!("descriptor sub-tag {} ignored", tag_name(sub_tag));
                }
                word => {
                    // A packet property word implies the presence of extra
                    // channels beyond X and Y.
                    debug!("descriptor packet property word {}", word);
                    info.has_pressure = true;
                    info.packet_properties.push(word);
                }
            }
        }

        let id = drawing.add_stroke_info(info);
        if self.current_stroke_info.is_none() {
            self.current_stroke_info = Some(id);
        }
        debug!("added stroke descriptor block #{}", id.index());

        Ok(())
    }

    /// A stroke payload: the point count, then one compressed run per
    /// declared channel.
    fn parse_stroke(
        &mut self,
        source: &mut DataSource,
        drawing: &mut Drawing,
    ) -> Result<(), IsfError> {
        let payload_size = decode_uint(source)?;
        if payload_size == 0 {
            return Err(IsfError::InvalidPayload {
                context: "empty TAG_STROKE",
            });
        }

        let initial_pos = source.pos();

        let num_points = decode_uint(source)?;
        if num_points > MAX_STROKE_POINTS {
            return Err(IsfError::InvalidPayload {
                context: "stroke declares an excessive point count",
            });
        }

        debug!(
            "stroke payload of {} bytes, {} points",
            payload_size, num_points
        );

        let info = self
            .current_stroke_info
            .and_then(|id| drawing.stroke_info(id))
            .cloned();

        // A drawing-scope NO_X/NO_Y applies until a descriptor overrides it.
        let has_x = info.as_ref().map_or(drawing.has_x_data(), |i| i.has_x);
        let has_y = info.as_ref().map_or(drawing.has_y_data(), |i| i.has_y);
        let has_pressure = info.as_ref().map_or(false, |i| i.has_pressure);

        let truncated = |error: IsfError| match error {
            IsfError::EndOfStream => IsfError::InvalidPayload {
                context: "stroke coordinate run shorter than the point count",
            },
            other => other,
        };

        let xs = if has_x {
            compress::inflate_packets(source, num_points).map_err(truncated)?
        } else {
            vec![0; num_points as usize]
        };

        let ys = if has_y {
            compress::inflate_packets(source, num_points).map_err(truncated)?
        } else {
            vec![0; num_points as usize]
        };

        let pressures = if has_pressure {
            Some(compress::inflate_packets(source, num_points).map_err(truncated)?)
        } else {
            None
        };

        if xs.len() as u64 != num_points || ys.len() as u64 != num_points {
            return Err(IsfError::InvalidPayload {
                context: "coordinate runs do not match the point count",
            });
        }

        let mut stroke = Stroke::new();
        for index in 0..num_points as usize {
            let mut point = Point::new(xs[index], ys[index]);
            if let Some(pressures) = &pressures {
                point.pressure = Some(pressures[index]);
            }
            stroke.add_point(point);
        }

        stroke.set_attributes(self.current_attributes);
        stroke.set_metrics(self.current_metrics);
        stroke.set_transform(self.current_transform);
        stroke.set_info(self.current_stroke_info);

        let pen_width = drawing.effective_pen_width(&stroke);
        let transform = self
            .current_transform
            .and_then(|id| drawing.transform(id))
            .copied();
        stroke.finalize(pen_width, transform.as_ref());

        if !stroke.points().is_empty() {
            let rect = stroke.bounding_rect();
            self.bounds = Some(match self.bounds {
                Some(bounds) => bounds.united(&rect),
                None => rect,
            });
        }

        drawing.push_stroke(stroke);
        debug!("added stroke #{}", drawing.strokes().len() - 1);

        // Trailing packet data of channels this parser does not know.
        let consumed = source.pos() - initial_pos;
        if consumed < payload_size as usize {
            let remaining = payload_size as usize - consumed;
            warn!("skipping {} trailing bytes of stroke payload", remaining);
            source.skip_bytes(remaining)?;
        }

        Ok(())
    }

    /// A table of transformation blocks, each introduced by its own tag.
    fn parse_transform_table(
        &mut self,
        source: &mut DataSource,
        drawing: &mut Drawing,
    ) -> Result<(), IsfError> {
        let payload_size = decode_uint(source)?;
        if payload_size == 0 {
            return Err(IsfError::InvalidPayload {
                context: "empty TAG_TRANSFORM_TABLE",
            });
        }

        let payload_end = source.pos().saturating_add(payload_size as usize);
        while source.pos() < payload_end && !source.at_end(false) {
            let tag = decode_uint(source)?;
            self.parse_transformation(source, drawing, tag)?;
        }

        Ok(())
    }

    /// One transformation matrix. Scale components arrive in HiMetric
    /// units; rotation angles arrive as degrees times one hundred.
    fn parse_transformation(
        &mut self,
        source: &mut DataSource,
        drawing: &mut Drawing,
        tag: u64,
    ) -> Result<(), IsfError> {
        let transform = match tag {
            TAG_TRANSFORM => {
                let m11 = decode_float(source)? / HIMETRIC_TO_PIXEL;
                let m12 = decode_float(source)?;
                let m21 = decode_float(source)?;
                let m22 = decode_float(source)? / HIMETRIC_TO_PIXEL;
                let dx = decode_float(source)?;
                let dy = decode_float(source)?;
                Transform {
                    m11,
                    m12,
                    m21,
                    m22,
                    dx,
                    dy,
                }
            }
            TAG_TRANSFORM_ISOTROPIC_SCALE => {
                let scale = decode_float(source)? / HIMETRIC_TO_PIXEL;
                Transform::scaling(scale, scale)
            }
            TAG_TRANSFORM_ANISOTROPIC_SCALE => {
                let sx = decode_float(source)? / HIMETRIC_TO_PIXEL;
                let sy = decode_float(source)? / HIMETRIC_TO_PIXEL;
                Transform::scaling(sx, sy)
            }
            TAG_TRANSFORM_ROTATE => {
                let degrees = decode_float(source)? / 100.0;
                Transform::rotation(degrees)
            }
            TAG_TRANSFORM_TRANSLATE => {
                let dx = decode_float(source)?;
                let dy = decode_float(source)?;
                Transform::translation(dx, dy)
            }
            TAG_TRANSFORM_SCALE_AND_TRANSLATE => {
                let sx = decode_float(source)? / HIMETRIC_TO_PIXEL;
                let sy = decode_float(source)? / HIMETRIC_TO_PIXEL;
                let dx = decode_float(source)?;
                let dy = decode_float(source)?;
                Transform {
                    m11: sx,
                    m22: sy,
                    dx,
                    dy,
                    ..Transform::default()
                }
            }
            TAG_TRANSFORM_QUAD => {
                return Err(IsfError::InvalidBlock {
                    context: "quad transformations are not supported",
                });
            }
            _ => {
                return Err(IsfError::InvalidBlock {
                    context: "unknown transformation tag",
                });
            }
        };

        let id = drawing.add_transform(transform);
        if self.current_transform.is_none() {
            self.current_transform = Some(id);
        }
        debug!("added transform block #{}: {:?}", id.index(), transform);

        Ok(())
    }

    /// A table of metric blocks.
    fn parse_metric_table(
        &mut self,
        source: &mut DataSource,
        drawing: &mut Drawing,
    ) -> Result<(), IsfError> {
        let payload_size = decode_uint(source)?;
        if payload_size == 0 {
            return Err(IsfError::InvalidPayload {
                context: "empty TAG_METRIC_TABLE",
            });
        }

        let payload_end = source.pos().saturating_add(payload_size as usize);
        while source.pos() < payload_end && !source.at_end(false) {
            self.parse_metric_block(source, drawing)?;
        }

        Ok(())
    }

    /// One metrics table: `(metric_id, length, min, max, units, resolution)`
    /// records overriding the compiled-in defaults.
    fn parse_metric_block(
        &mut self,
        source: &mut DataSource,
        drawing: &mut Drawing,
    ) -> Result<(), IsfError> {
        let payload_size = decode_uint(source)?;
        if payload_size == 0 {
            return Err(IsfError::InvalidPayload {
                context: "empty TAG_METRIC_BLOCK",
            });
        }

        let mut metrics = Metrics::default();

        let payload_end = source.pos().saturating_add(payload_size as usize);
        while source.pos() < payload_end && !source.at_end(false) {
            let property = decode_uint(source)?;
            let record_size = decode_uint(source)?;

            // Two multi-byte signed integers, one byte and one float:
            // at least seven bytes.
            if record_size < 7 {
                debug!(
                    "metric id {} has an invalid record size {}",
                    property, record_size
                );
                source.skip_bytes(record_size as usize)?;
                continue;
            }

            let record_start = source.pos();

            let metric = Metric {
                min: decode_int(source)?,
                max: decode_int(source)?,
                units: MetricUnit::new(source.get_byte()? as i8),
                resolution: decode_float(source)?,
            };

            let consumed = source.pos() - record_start;
            if consumed < record_size as usize {
                source.skip_bytes(record_size as usize - consumed)?;
            }

            if metrics.items.contains_key(&property) {
                debug!(
                    "metric id {}: min {} max {} units {:?} resolution {}",
                    property, metric.min, metric.max, metric.units, metric.resolution
                );
                metrics.items.insert(property, metric);
            } else {
                debug!("unknown metric id {} skipped", property);
            }
        }

        let id = drawing.add_metrics(metrics);
        if self.current_metrics.is_none() {
            self.current_metrics = Some(id);
        }
        debug!("added metrics block #{}", id.index());

        Ok(())
    }

    /// The Persistent Format marker; its payload holds one multi-byte
    /// integer that must equal 65536.
    fn parse_persistent_format(&mut self, source: &mut DataSource) -> Result<(), IsfError> {
        let payload_size = decode_uint(source)?;
        if payload_size == 0 {
            return Err(IsfError::InvalidPayload {
                context: "empty TAG_PERSISTENT_FORMAT",
            });
        }

        let initial_pos = source.pos();
        let version = decode_uint(source)?;

        let consumed = source.pos() - initial_pos;
        if consumed < payload_size as usize {
            warn!("persistent format payload has trailing bytes");
            source.skip_bytes(payload_size as usize - consumed)?;
        }

        if version != PERSISTENT_FORMAT_VERSION {
            debug!("invalid persistent format version {}", version);
            return Err(IsfError::BadVersion { version });
        }

        Ok(())
    }

    /// The declared drawing dimensions in HiMetric units.
    fn parse_himetric_size(
        &mut self,
        source: &mut DataSource,
        drawing: &mut Drawing,
    ) -> Result<(), IsfError> {
        let payload_size = decode_uint(source)?;
        if payload_size == 0 {
            return Err(IsfError::InvalidPayload {
                context: "empty TAG_HIMETRIC_SIZE",
            });
        }

        if drawing.himetric_size().is_some() {
            return Err(IsfError::InvalidStream {
                context: "duplicated TAG_HIMETRIC_SIZE",
            });
        }

        let width = decode_int(source)?;
        let height = decode_int(source)?;
        debug!("drawing dimensions {}x{} himetric", width, height);
        drawing.set_himetric_size(width, height);

        Ok(())
    }

    /// A custom tag registered through the GUID table. The payload is
    /// decoded but semantically opaque; the handful of GUIDs known to carry
    /// strings are surfaced in the trace.
    fn parse_custom_tag(
        &mut self,
        source: &mut DataSource,
        drawing: &mut Drawing,
        tag: u64,
    ) -> Result<(), IsfError> {
        let index = (tag - FIRST_CUSTOM_TAG) as usize;

        let guid = match drawing.guids().get(index) {
            Some(guid) => *guid,
            None => {
                debug!("custom tag {} was not registered", tag);
                return Err(IsfError::InvalidStream {
                    context: "custom tag without a registered GUID",
                });
            }
        };

        // The stored length excludes the algorithm header byte.
        let payload_size = decode_uint(source)?;
        let payload = source.get_bytes((payload_size as usize).saturating_add(1))?;
        let mut property_source = DataSource::from_bytes(payload);

        match compress::inflate_properties(&mut property_source, payload_size) {
            Ok(values) => {
                if STRING_GUIDS.contains(&guid.0) {
                    // The first item is always 0x08, meaning unknown.
                    let text: String = values
                        .iter()
                        .skip(1)
                        .map(|&item| item as u8 as char)
                        .collect();
                    debug!("custom tag {} string value: {:?}", guid, text);
                } else {
                    debug!("custom tag {} carries {} values", guid, values.len());
                }
            }
            Err(error) => {
                // The payload was consumed from the main stream either way;
                // an undecodable opaque property is not fatal.
                warn!("could not decode custom tag {}: {}", guid, error);
            }
        }

        Ok(())
    }
}
