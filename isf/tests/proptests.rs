use proptest::prelude::*;

use isf::compress;
use isf::datasource::DataSource;
use isf::multibyte;
use isf::{decode, encode, Drawing, Point, Stroke};

proptest! {
    #[test]
    fn multibyte_uint_round_trip(value in any::<u64>()) {
        let mut sink = Vec::new();
        multibyte::encode_uint(&mut sink, value);

        let mut source = DataSource::from_bytes(sink.clone());
        prop_assert_eq!(multibyte::decode_uint(&mut source).unwrap(), value);
        prop_assert_eq!(sink.len(), multibyte::multi_byte_size_uint(value));
    }

    #[test]
    fn multibyte_int_round_trip(value in (i64::MIN + 1)..=i64::MAX) {
        let mut sink = Vec::new();
        multibyte::encode_int(&mut sink, value);

        let mut source = DataSource::from_bytes(sink.clone());
        prop_assert_eq!(multibyte::decode_int(&mut source).unwrap(), value);
        prop_assert_eq!(sink.len(), multibyte::multi_byte_size_int(value));
    }

    #[test]
    fn bit_write_read_round_trip(amount in 1u8..=64, raw in any::<u64>()) {
        let value = if amount == 64 { raw } else { raw & ((1u64 << amount) - 1) };

        let mut sink = DataSource::new();
        sink.append_bits(value, amount);

        let mut source = DataSource::from_bytes(sink.into_bytes());
        prop_assert_eq!(source.get_bits(amount).unwrap(), value);
    }

    #[test]
    fn delta_transform_round_trip(values in prop::collection::vec(any::<i64>(), 0..64)) {
        let mut data = values.clone();
        compress::delta_transform(&mut data);
        compress::inverse_delta_transform(&mut data);
        prop_assert_eq!(data, values);
    }

    #[test]
    fn gorilla_round_trip(values in prop::collection::vec(-1_000_000i64..1_000_000, 1..64)) {
        let block_size = compress::gorilla_block_size(&values);

        let mut sink = DataSource::new();
        compress::deflate_gorilla(&mut sink, block_size, &values);

        let mut source = DataSource::from_bytes(sink.into_bytes());
        let decoded = compress::inflate_gorilla(&mut source, values.len() as u64, block_size).unwrap();
        prop_assert_eq!(decoded, values);
    }

    #[test]
    fn packet_round_trip(values in prop::collection::vec(-100_000i64..100_000, 1..64)) {
        let bytes = compress::deflate_packets(&values).unwrap();

        let mut source = DataSource::from_bytes(bytes);
        let decoded = compress::inflate_packets(&mut source, values.len() as u64).unwrap();
        prop_assert_eq!(decoded, values);
    }

    #[test]
    fn stroke_round_trip(
        points in prop::collection::vec((-10_000i64..10_000, -10_000i64..10_000), 1..40)
    ) {
        let points: Vec<Point> = points.into_iter().map(|(x, y)| Point::new(x, y)).collect();

        let mut drawing = Drawing::new();
        drawing.add_stroke(Stroke::from_points(points.clone()));

        let decoded = decode(&encode(&drawing).unwrap());
        prop_assert_eq!(decoded.error(), None);
        prop_assert_eq!(decoded.strokes()[0].points(), points.as_slice());
    }

    /// Arbitrary input must never panic: it either parses or ends up as a
    /// drawing with an error set.
    #[test]
    fn decode_never_panics(data in prop::collection::vec(any::<u8>(), 0..4096)) {
        let drawing = decode(&data);
        let _ = drawing.error();
    }

    /// Inputs that start with a plausible preamble get further into the tag
    /// machinery; they must not panic either.
    #[test]
    fn decode_with_valid_preamble_never_panics(body in prop::collection::vec(any::<u8>(), 0..1024)) {
        let mut data = vec![0x00];
        multibyte::encode_uint(&mut data, body.len() as u64);
        data.extend_from_slice(&body);

        let drawing = decode(&data);
        let _ = drawing.error();
    }
}
