//! Tag-driven stream writer, the mirror of the parser.
//!
//! The body is assembled tag by tag into byte buffers, then the stream
//! size and version are prepended. Properties whose value equals the
//! default are omitted from attribute blocks, and the per-stroke index
//! tags (`MIDX`, `DIDX`, `TIDX`, `SIDX`) are only emitted when the
//! binding actually changes between strokes.

use log::debug;

use crate::compress;
use crate::model::{
    AttributeSet, AttributeSetId, Drawing, Metrics, MetricsId, Stroke, Transform, TransformId,
    IS_RECTANGLE,
};
use crate::multibyte::{encode_float, encode_int, encode_uint};
use crate::tags::*;
use crate::{IsfError, HIMETRIC_TO_PIXEL, PERSISTENT_FORMAT_VERSION, SUPPORTED_ISF_VERSION};

/// Serialise a drawing as a raw ISF byte stream.
pub(crate) fn write_stream(drawing: &Drawing) -> Result<Vec<u8>, IsfError> {
    if drawing.strokes().is_empty() {
        // A null drawing has no wire form.
        return Ok(Vec::new());
    }

    let mut body = Vec::new();

    add_persistent_format(&mut body);
    add_himetric_size(&mut body, drawing);
    add_attribute_table(&mut body, drawing);
    add_metric_table(&mut body, drawing);
    add_transform_table(&mut body, drawing);

    let descriptors = add_stroke_descriptors(&mut body, drawing);
    add_strokes(&mut body, drawing, &descriptors)?;

    let mut stream = Vec::with_capacity(body.len() + 8);
    encode_uint(&mut stream, SUPPORTED_ISF_VERSION);
    encode_uint(&mut stream, body.len() as u64);
    stream.extend_from_slice(&body);

    Ok(stream)
}

fn add_tag_with_payload(body: &mut Vec<u8>, tag: u64, payload: &[u8]) {
    encode_uint(body, tag);
    encode_uint(body, payload.len() as u64);
    body.extend_from_slice(payload);
}

fn add_persistent_format(body: &mut Vec<u8>) {
    let mut payload = Vec::new();
    encode_uint(&mut payload, PERSISTENT_FORMAT_VERSION);
    add_tag_with_payload(body, TAG_PERSISTENT_FORMAT, &payload);
}

fn add_himetric_size(body: &mut Vec<u8>, drawing: &Drawing) {
    let (width, height) = drawing.himetric_size().unwrap_or_else(|| {
        // Derive from the bounding rectangle when nothing was declared.
        let rect = drawing.bounding_rect();
        (
            (rect.width() * HIMETRIC_TO_PIXEL).round() as i64,
            (rect.height() * HIMETRIC_TO_PIXEL).round() as i64,
        )
    });

    let mut payload = Vec::new();
    encode_int(&mut payload, width);
    encode_int(&mut payload, height);
    add_tag_with_payload(body, TAG_HIMETRIC_SIZE, &payload);

    debug!("added drawing dimensions {}x{} himetric", width, height);
}

fn attribute_block_payload(set: &AttributeSet) -> Vec<u8> {
    let defaults = AttributeSet::default();
    let mut payload = Vec::new();

    if (set.color.r, set.color.g, set.color.b)
        != (defaults.color.r, defaults.color.g, defaults.color.b)
    {
        // Stored in BGR order: 0x00BBGGRR.
        let value = (u64::from(set.color.b) << 16)
            | (u64::from(set.color.g) << 8)
            | u64::from(set.color.r);
        encode_uint(&mut payload, attr_property::COLORREF);
        encode_uint(&mut payload, value);
    }

    if set.color.a != 255 {
        encode_uint(&mut payload, attr_property::TRANSPARENCY);
        encode_uint(&mut payload, u64::from(set.color.a));
    }

    if set.pen_size != defaults.pen_size {
        let width = (set.pen_size.width * HIMETRIC_TO_PIXEL).round() as u64;
        encode_uint(&mut payload, attr_property::PEN_WIDTH);
        encode_uint(&mut payload, width);

        if set.pen_size.height != set.pen_size.width {
            let height = (set.pen_size.height * HIMETRIC_TO_PIXEL).round() as u64;
            encode_uint(&mut payload, attr_property::PEN_HEIGHT);
            encode_uint(&mut payload, height);
        }
    }

    if set.flags & IS_RECTANGLE != 0 {
        encode_uint(&mut payload, attr_property::PEN_TIP);
        encode_uint(&mut payload, 1);
    }

    let low_flags = set.flags & 0x00FF;
    if low_flags != 0 {
        encode_uint(&mut payload, attr_property::DRAWING_FLAGS);
        encode_uint(&mut payload, u64::from(low_flags));
    }

    // An all-default set still needs a non-empty payload.
    if payload.is_empty() {
        encode_uint(&mut payload, attr_property::DRAWING_FLAGS);
        encode_uint(&mut payload, 0);
    }

    payload
}

fn add_attribute_table(body: &mut Vec<u8>, drawing: &Drawing) {
    let sets = drawing.attribute_sets();
    if sets.is_empty() {
        return;
    }

    if sets.len() > 1 {
        // Blocks inside a table are bare length-prefixed payloads; only
        // the table as a whole carries a tag.
        let mut table = Vec::new();
        for set in sets {
            let payload = attribute_block_payload(set);
            encode_uint(&mut table, payload.len() as u64);
            table.extend_from_slice(&payload);
        }
        add_tag_with_payload(body, TAG_DRAW_ATTRS_TABLE, &table);
    } else {
        add_tag_with_payload(body, TAG_DRAW_ATTRS_BLOCK, &attribute_block_payload(&sets[0]));
    }

    debug!("added {} drawing attribute blocks", sets.len());
}

fn metric_block_payload(metrics: &Metrics) -> Vec<u8> {
    let mut payload = Vec::new();

    for (&property, metric) in &metrics.items {
        let mut record = Vec::new();
        encode_int(&mut record, metric.min);
        encode_int(&mut record, metric.max);
        record.push(metric.units.wire_value() as u8);
        encode_float(&mut record, metric.resolution);

        encode_uint(&mut payload, property);
        encode_uint(&mut payload, record.len() as u64);
        payload.extend_from_slice(&record);
    }

    payload
}

fn add_metric_table(body: &mut Vec<u8>, drawing: &Drawing) {
    let tables = drawing.metrics_tables();

    // Purely default metrics are left implicit.
    let defaults = Metrics::default();
    if tables.is_empty() || tables.iter().all(|table| *table == defaults) {
        return;
    }

    if tables.len() > 1 {
        let mut table_payload = Vec::new();
        for metrics in tables {
            let payload = metric_block_payload(metrics);
            encode_uint(&mut table_payload, payload.len() as u64);
            table_payload.extend_from_slice(&payload);
        }
        add_tag_with_payload(body, TAG_METRIC_TABLE, &table_payload);
    } else {
        add_tag_with_payload(body, TAG_METRIC_BLOCK, &metric_block_payload(&tables[0]));
    }

    debug!("added {} metric blocks", tables.len());
}

/// Pick the most specific transformation tag for a matrix and encode its
/// payload.
fn transform_payload(transform: &Transform) -> (u64, Vec<u8>) {
    let mut payload = Vec::new();

    if transform.is_rotating() {
        let pure_rotation = transform.m11 == transform.m22
            && transform.m12 == -transform.m21
            && (transform.m11 * transform.m11 + transform.m12 * transform.m12 - 1.0).abs() < 1e-4
            && !transform.is_translating();

        if pure_rotation {
            let degrees = transform.m12.atan2(transform.m11).to_degrees();
            encode_float(&mut payload, degrees * 100.0);
            return (TAG_TRANSFORM_ROTATE, payload);
        }

        encode_float(&mut payload, transform.m11 * HIMETRIC_TO_PIXEL);
        encode_float(&mut payload, transform.m12);
        encode_float(&mut payload, transform.m21);
        encode_float(&mut payload, transform.m22 * HIMETRIC_TO_PIXEL);
        encode_float(&mut payload, transform.dx);
        encode_float(&mut payload, transform.dy);
        return (TAG_TRANSFORM, payload);
    }

    if transform.is_scaling() && transform.is_translating() {
        encode_float(&mut payload, transform.m11 * HIMETRIC_TO_PIXEL);
        encode_float(&mut payload, transform.m22 * HIMETRIC_TO_PIXEL);
        encode_float(&mut payload, transform.dx);
        encode_float(&mut payload, transform.dy);
        return (TAG_TRANSFORM_SCALE_AND_TRANSLATE, payload);
    }

    if transform.is_translating() {
        encode_float(&mut payload, transform.dx);
        encode_float(&mut payload, transform.dy);
        return (TAG_TRANSFORM_TRANSLATE, payload);
    }

    if transform.m11 == transform.m22 {
        encode_float(&mut payload, transform.m11 * HIMETRIC_TO_PIXEL);
        return (TAG_TRANSFORM_ISOTROPIC_SCALE, payload);
    }

    encode_float(&mut payload, transform.m11 * HIMETRIC_TO_PIXEL);
    encode_float(&mut payload, transform.m22 * HIMETRIC_TO_PIXEL);
    (TAG_TRANSFORM_ANISOTROPIC_SCALE, payload)
}

fn add_transform_table(body: &mut Vec<u8>, drawing: &Drawing) {
    let transforms = drawing.transforms();
    if transforms.is_empty() {
        return;
    }

    if transforms.len() > 1 {
        let mut table = Vec::new();
        for transform in transforms {
            let (tag, payload) = transform_payload(transform);
            encode_uint(&mut table, tag);
            table.extend_from_slice(&payload);
        }
        add_tag_with_payload(body, TAG_TRANSFORM_TABLE, &table);
    } else {
        let (tag, payload) = transform_payload(&transforms[0]);
        encode_uint(body, tag);
        body.extend_from_slice(&payload);
    }

    debug!("added {} transformations", transforms.len());
}

/// The channel set a stroke actually needs on the wire.
#[derive(Debug, Clone, PartialEq)]
struct EffectiveDescriptor {
    has_x: bool,
    has_y: bool,
    has_pressure: bool,
}

fn effective_descriptor(drawing: &Drawing, stroke: &Stroke) -> EffectiveDescriptor {
    match stroke.info().and_then(|id| drawing.stroke_info(id)) {
        Some(info) => EffectiveDescriptor {
            has_x: info.has_x,
            has_y: info.has_y,
            has_pressure: info.has_pressure,
        },
        None => EffectiveDescriptor {
            has_x: true,
            has_y: true,
            has_pressure: stroke.has_pressure(),
        },
    }
}

fn descriptor_block_payload(descriptor: &EffectiveDescriptor) -> Vec<u8> {
    let mut payload = Vec::new();

    if !descriptor.has_x {
        encode_uint(&mut payload, TAG_NO_X);
    }
    if !descriptor.has_y {
        encode_uint(&mut payload, TAG_NO_Y);
    }
    if descriptor.has_pressure {
        // The pressure channel is announced through its packet property id.
        encode_uint(&mut payload, metric_property::NORMAL_PRESSURE);
    }

    // A default descriptor inside a table still needs a non-empty payload.
    if payload.is_empty() {
        encode_uint(&mut payload, TAG_STROKE_PROPERTY_LIST);
    }

    payload
}

/// Emit the stroke descriptor blocks and return the per-stroke descriptor
/// index, or an empty mapping when every stroke uses the default channel
/// set.
fn add_stroke_descriptors(body: &mut Vec<u8>, drawing: &Drawing) -> Vec<usize> {
    let default = EffectiveDescriptor {
        has_x: true,
        has_y: true,
        has_pressure: false,
    };

    let mut descriptors: Vec<EffectiveDescriptor> = Vec::new();
    let mut stroke_indices = Vec::with_capacity(drawing.strokes().len());

    for stroke in drawing.strokes() {
        let descriptor = effective_descriptor(drawing, stroke);
        let index = descriptors
            .iter()
            .position(|existing| *existing == descriptor)
            .unwrap_or_else(|| {
                descriptors.push(descriptor.clone());
                descriptors.len() - 1
            });
        stroke_indices.push(index);
    }

    if descriptors.iter().all(|descriptor| *descriptor == default) {
        return Vec::new();
    }

    if descriptors.len() > 1 {
        let mut table = Vec::new();
        for descriptor in &descriptors {
            let payload = descriptor_block_payload(descriptor);
            encode_uint(&mut table, payload.len() as u64);
            table.extend_from_slice(&payload);
        }
        add_tag_with_payload(body, TAG_STROKE_DESC_TABLE, &table);
    } else {
        add_tag_with_payload(
            body,
            TAG_STROKE_DESC_BLOCK,
            &descriptor_block_payload(&descriptors[0]),
        );
    }

    debug!("added {} stroke descriptor blocks", descriptors.len());

    stroke_indices
}

fn add_strokes(
    body: &mut Vec<u8>,
    drawing: &Drawing,
    descriptor_indices: &[usize],
) -> Result<(), IsfError> {
    let descriptor_count = descriptor_indices
        .iter()
        .max()
        .map_or(0, |&highest| highest + 1);

    let mut current_metrics: Option<MetricsId> = None;
    let mut current_attributes: Option<AttributeSetId> = None;
    let mut current_transform: Option<TransformId> = None;
    // The parser makes the first descriptor block current by itself.
    let mut current_descriptor: usize = 0;

    for (index, stroke) in drawing.strokes().iter().enumerate() {
        if drawing.metrics_tables().len() > 1 {
            if let Some(id) = stroke.metrics() {
                if current_metrics != Some(id) {
                    current_metrics = Some(id);
                    encode_uint(body, TAG_MIDX);
                    encode_uint(body, id.index() as u64);
                }
            }
        }

        if drawing.attribute_sets().len() > 1 {
            if let Some(id) = stroke.attributes() {
                if current_attributes != Some(id) {
                    current_attributes = Some(id);
                    encode_uint(body, TAG_DIDX);
                    encode_uint(body, id.index() as u64);
                }
            }
        }

        if drawing.transforms().len() > 1 {
            if let Some(id) = stroke.transform() {
                if current_transform != Some(id) {
                    current_transform = Some(id);
                    encode_uint(body, TAG_TIDX);
                    encode_uint(body, id.index() as u64);
                }
            }
        }

        if descriptor_count > 1 {
            let descriptor = descriptor_indices[index];
            if current_descriptor != descriptor {
                current_descriptor = descriptor;
                encode_uint(body, TAG_SIDX);
                encode_uint(body, descriptor as u64);
            }
        }

        let descriptor = effective_descriptor(drawing, stroke);

        let mut payload = Vec::new();
        encode_uint(&mut payload, stroke.points().len() as u64);

        if descriptor.has_x {
            let xs: Vec<i64> = stroke.points().iter().map(|point| point.x).collect();
            payload.extend_from_slice(&compress::deflate_packets(&xs)?);
        }
        if descriptor.has_y {
            let ys: Vec<i64> = stroke.points().iter().map(|point| point.y).collect();
            payload.extend_from_slice(&compress::deflate_packets(&ys)?);
        }
        if descriptor.has_pressure {
            let pressures: Vec<i64> = stroke
                .points()
                .iter()
                .map(|point| point.pressure.unwrap_or(0))
                .collect();
            payload.extend_from_slice(&compress::deflate_packets(&pressures)?);
        }

        add_tag_with_payload(body, TAG_STROKE, &payload);
        debug!("added stroke #{}", index);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::model::*;
    use crate::{decode, encode};

    #[test]
    fn test_empty_drawing_encodes_to_nothing() {
        let drawing = Drawing::new();
        assert_eq!(encode(&drawing).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_single_stroke_round_trip() {
        let mut drawing = Drawing::new();
        let attrs = drawing.add_attribute_set(AttributeSet {
            pen_size: Size::new(4.0, 4.0),
            ..AttributeSet::default()
        });

        let mut stroke = Stroke::from_points(vec![Point::new(100, 200)]);
        stroke.set_attributes(Some(attrs));
        drawing.add_stroke(stroke);

        let bytes = encode(&drawing).unwrap();
        let decoded = decode(&bytes);

        assert_eq!(decoded.error(), None);
        assert!(!decoded.is_null());
        assert_eq!(decoded.strokes().len(), 1);

        let stroke = &decoded.strokes()[0];
        assert_eq!(stroke.points(), &[Point::new(100, 200)]);

        let attrs = decoded
            .attribute_set(stroke.attributes().unwrap())
            .unwrap();
        assert_eq!(attrs.color, Color::BLACK);
        assert!((attrs.pen_size.width - 4.0).abs() < 0.05);
        assert!((attrs.pen_size.height - 4.0).abs() < 0.05);
    }

    #[test]
    fn test_pressure_round_trip() {
        let mut drawing = Drawing::new();
        drawing.add_stroke(Stroke::from_points(vec![
            Point::with_pressure(0, 0, 128),
            Point::with_pressure(10, 10, 512),
            Point::with_pressure(20, 15, 1023),
        ]));

        let bytes = encode(&drawing).unwrap();
        let decoded = decode(&bytes);

        assert_eq!(decoded.error(), None);
        let stroke = &decoded.strokes()[0];
        assert!(stroke.has_pressure());
        assert_eq!(stroke.points()[1].pressure, Some(512));
    }

    #[test]
    fn test_transform_round_trip() {
        let mut drawing = Drawing::new();
        let transform = drawing.add_transform(Transform::scaling(2.0, 2.0));

        let mut stroke = Stroke::from_points(vec![Point::new(5, 5), Point::new(6, 8)]);
        stroke.set_transform(Some(transform));
        drawing.add_stroke(stroke);

        let bytes = encode(&drawing).unwrap();
        let decoded = decode(&bytes);

        assert_eq!(decoded.error(), None);
        let id = decoded.strokes()[0].transform().unwrap();
        let round_tripped = decoded.transform(id).unwrap();
        assert!((round_tripped.m11 - 2.0).abs() < 1e-4);
        assert!((round_tripped.m22 - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_rotation_round_trip() {
        let mut drawing = Drawing::new();
        let transform = drawing.add_transform(Transform::rotation(90.0));

        let mut stroke = Stroke::from_points(vec![Point::new(1, 0)]);
        stroke.set_transform(Some(transform));
        drawing.add_stroke(stroke);

        let bytes = encode(&drawing).unwrap();
        let decoded = decode(&bytes);

        assert_eq!(decoded.error(), None);
        let id = decoded.strokes()[0].transform().unwrap();
        let round_tripped = decoded.transform(id).unwrap();
        assert!((round_tripped.m12 - 1.0).abs() < 1e-4);
        assert!(round_tripped.m11.abs() < 1e-4);
    }
}
