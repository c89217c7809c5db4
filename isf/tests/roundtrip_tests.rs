use isf::{decode, encode, IsfError};
use isf::{AttributeSet, Color, Drawing, Point, Size, Stroke};

#[test]
fn test_empty_drawing_round_trip() {
    let drawing = Drawing::new();

    let bytes = encode(&drawing).expect("encoding an empty drawing succeeds");
    let decoded = decode(&bytes);

    assert!(decoded.is_null());
    assert_eq!(decoded.error(), None);
}

#[test]
fn test_single_point_stroke() {
    let mut drawing = Drawing::new();
    let attrs = drawing.add_attribute_set(AttributeSet {
        color: Color::BLACK,
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
    assert_eq!(stroke.points().len(), 1);
    assert_eq!(stroke.points()[0].x, 100);
    assert_eq!(stroke.points()[0].y, 200);

    let attrs = decoded.attribute_set(stroke.attributes().unwrap()).unwrap();
    assert_eq!(attrs.color, Color { r: 0, g: 0, b: 0, a: 255 });
    // Pen sizes round-trip through integer HiMetric units.
    assert!((attrs.pen_size.width - 4.0).abs() < 0.05);
    assert!((attrs.pen_size.height - 4.0).abs() < 0.05);
}

#[test]
fn test_multi_stroke_shared_attributes() {
    let mut drawing = Drawing::new();
    let attrs = drawing.add_attribute_set(AttributeSet {
        color: Color::rgb(255, 0, 0),
        pen_size: Size::new(2.0, 2.0),
        ..AttributeSet::default()
    });

    let mut first = Stroke::from_points(vec![Point::new(0, 0), Point::new(10, 10)]);
    first.set_attributes(Some(attrs));
    drawing.add_stroke(first);

    let mut second = Stroke::from_points(vec![Point::new(20, 20), Point::new(30, 5)]);
    second.set_attributes(Some(attrs));
    drawing.add_stroke(second);

    let bytes = encode(&drawing).unwrap();
    let decoded = decode(&bytes);

    assert_eq!(decoded.error(), None);
    assert_eq!(decoded.strokes().len(), 2);

    // One shared attribute block on the wire, both strokes bound to it.
    assert_eq!(decoded.attribute_sets().len(), 1);
    let first_id = decoded.strokes()[0].attributes().unwrap();
    let second_id = decoded.strokes()[1].attributes().unwrap();
    assert_eq!(first_id, second_id);

    let set = decoded.attribute_set(first_id).unwrap();
    assert_eq!(set.color, Color::rgb(255, 0, 0));
}

#[test]
fn test_bad_version() {
    let decoded = decode(&[0x0B, 0x00, 0x00]);

    assert!(decoded.is_null());
    assert_eq!(decoded.error(), Some(IsfError::BadVersion { version: 11 }));
}

#[test]
fn test_bad_stream_size() {
    let decoded = decode(&[0x00, 0x01, 0xAA, 0xBB, 0xCC]);

    assert!(decoded.is_null());
    assert_eq!(
        decoded.error(),
        Some(IsfError::BadStreamSize {
            declared: 1,
            remaining: 3
        })
    );
}

#[test]
fn test_truncated_stream_sets_error() {
    // Valid preamble, then a stroke tag whose payload is missing.
    let decoded = decode(&[0x00, 0x01, 0x0A]);
    assert!(decoded.error().is_some());
}

#[test]
fn test_flags_round_trip() {
    let mut drawing = Drawing::new();
    let attrs = drawing.add_attribute_set(AttributeSet {
        flags: isf::model::FIT_TO_CURVE | isf::model::IS_RECTANGLE,
        ..AttributeSet::default()
    });

    let mut stroke = Stroke::from_points(vec![Point::new(1, 1), Point::new(2, 2)]);
    stroke.set_attributes(Some(attrs));
    drawing.add_stroke(stroke);

    let bytes = encode(&drawing).unwrap();
    let decoded = decode(&bytes);

    assert_eq!(decoded.error(), None);
    let set = &decoded.attribute_sets()[0];
    assert_ne!(set.flags & isf::model::FIT_TO_CURVE, 0);
    assert_ne!(set.flags & isf::model::IS_RECTANGLE, 0);
}

#[test]
fn test_multiple_attribute_sets_switch() {
    let mut drawing = Drawing::new();
    let thin = drawing.add_attribute_set(AttributeSet {
        pen_size: Size::new(2.0, 2.0),
        ..AttributeSet::default()
    });
    let thick = drawing.add_attribute_set(AttributeSet {
        pen_size: Size::new(8.0, 8.0),
        color: Color::rgb(0, 0, 255),
        ..AttributeSet::default()
    });

    for (id, x) in [(thin, 0), (thick, 100), (thin, 200)] {
        let mut stroke = Stroke::from_points(vec![Point::new(x, 0), Point::new(x + 10, 10)]);
        stroke.set_attributes(Some(id));
        drawing.add_stroke(stroke);
    }

    let bytes = encode(&drawing).unwrap();
    let decoded = decode(&bytes);

    assert_eq!(decoded.error(), None);
    assert_eq!(decoded.attribute_sets().len(), 2);
    assert_eq!(decoded.strokes().len(), 3);

    let bindings: Vec<usize> = decoded
        .strokes()
        .iter()
        .map(|stroke| stroke.attributes().unwrap().index())
        .collect();
    assert_eq!(bindings, vec![0, 1, 0]);

    let thick_set = &decoded.attribute_sets()[1];
    assert_eq!(thick_set.color, Color::rgb(0, 0, 255));
    assert!((thick_set.pen_size.width - 8.0).abs() < 0.05);
}

#[test]
fn test_transparency_round_trip() {
    let mut drawing = Drawing::new();
    let attrs = drawing.add_attribute_set(AttributeSet {
        color: Color {
            r: 0,
            g: 128,
            b: 0,
            a: 100,
        },
        ..AttributeSet::default()
    });

    let mut stroke = Stroke::from_points(vec![Point::new(3, 4), Point::new(5, 6)]);
    stroke.set_attributes(Some(attrs));
    drawing.add_stroke(stroke);

    let decoded = decode(&encode(&drawing).unwrap());
    assert_eq!(decoded.error(), None);
    let color = decoded.attribute_sets()[0].color;
    assert_eq!(color.g, 128);
    assert_eq!(color.a, 100);
}

#[test]
fn test_long_smooth_stroke_round_trip() {
    // A plausibly smooth pen trajectory exercises the adaptive-huffman
    // path with realistic second differences.
    let mut points = Vec::new();
    for step in 0i64..200 {
        let x = 100 + step * 3 + (step % 7);
        let y = 400 - step * 2 + (step % 5);
        points.push(Point::new(x, y));
    }

    let mut drawing = Drawing::new();
    drawing.add_stroke(Stroke::from_points(points.clone()));

    let decoded = decode(&encode(&drawing).unwrap());
    assert_eq!(decoded.error(), None);
    assert_eq!(decoded.strokes()[0].points(), points.as_slice());
}

#[test]
fn test_bounding_rect_contains_all_points() {
    let mut drawing = Drawing::new();
    drawing.add_stroke(Stroke::from_points(vec![
        Point::new(-50, 12),
        Point::new(300, -40),
        Point::new(125, 500),
    ]));

    let decoded = decode(&encode(&drawing).unwrap());
    assert_eq!(decoded.error(), None);

    let rect = decoded.bounding_rect();
    for stroke in decoded.strokes() {
        for point in stroke.points() {
            assert!(rect.contains(point.x as f32, point.y as f32));
        }
    }
}
