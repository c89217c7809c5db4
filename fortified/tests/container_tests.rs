use fortified::{decode_gif, decode_png, encode_gif, encode_png, FortifiedError};
use isf::{Drawing, Point, Stroke};

fn sample_drawing() -> Drawing {
    let mut drawing = Drawing::new();
    drawing.add_stroke(Stroke::from_points(vec![
        Point::new(10, 10),
        Point::new(40, 35),
        Point::new(80, 42),
    ]));
    drawing
}

#[test]
fn test_png_fortification_round_trip() {
    let drawing = sample_drawing();

    let image = encode_png(&drawing).unwrap();
    let decoded = decode_png(&image).unwrap();

    assert!(!decoded.is_null());
    assert_eq!(decoded.error(), None);
    assert_eq!(decoded.strokes().len(), 1);
    assert_eq!(decoded.strokes()[0].points(), drawing.strokes()[0].points());
}

#[test]
fn test_gif_fortification_round_trip() {
    let drawing = sample_drawing();

    let image = encode_gif(&drawing).unwrap();
    let decoded = decode_gif(&image).unwrap();

    assert!(!decoded.is_null());
    assert_eq!(decoded.error(), None);
    assert_eq!(decoded.strokes()[0].points(), drawing.strokes()[0].points());
}

#[test]
fn test_foreign_png_is_rejected() {
    assert!(matches!(
        decode_png(&[0u8; 32]),
        Err(FortifiedError::InvalidSignature { .. })
    ));
}

#[test]
fn test_gif_without_payload_is_rejected() {
    // A structurally valid GIF with no ink extension.
    let image = fortified::embed_isf_in_gif(&[]);
    let stripped: Vec<u8> = {
        // Remove the application extension entirely: signature, screen
        // descriptor and palette are the first 19 bytes; the extension
        // follows until the image separator.
        let separator = image.iter().position(|&byte| byte == 0x2C).unwrap();
        let mut out = image[..19].to_vec();
        out.extend_from_slice(&image[separator..]);
        out
    };

    assert!(matches!(
        decode_gif(&stripped),
        Err(FortifiedError::PayloadMissing)
    ));
}
