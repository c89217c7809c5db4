//! Coordinate and property compression.
//!
//! Stroke payloads store each coordinate channel as a compressed run headed
//! by a single algorithm byte:
//!
//! ```text
//! | Algorithm             |  7 6 5 4 3 2 1 0 (bit assignment) |
//!   Bit packing (Gorilla)    0 0 T D D D D D
//!   Adaptive Huffman         1 0 T D D D D D
//!   Reserved                 1 1 x x x x x x
//! ```
//!
//! `T` is the transformation flag and `D` carries the Gorilla block size or
//! the Huffman table index; a `D` field of zero means a block size of 32.
//! Property payloads of custom tags use the same header position with a
//! different algorithm set (bit packing of bytes, words and longs, plus
//! Lempel-Ziv); only the byte packing variant has ever been observed in
//! real streams.

use log::warn;

use crate::datasource::DataSource;
use crate::IsfError;

const ALGORITHM_MASK: u8 = 0xC0;
const ALGORITHM_GORILLA: u8 = 0x00;
const ALGORITHM_HUFFMAN: u8 = 0x80;
const TRANSFORM_FLAG: u8 = 0x20;
const BLOCK_SIZE_MASK: u8 = 0x1F;

// Property data algorithm selectors, top three bits of the header byte.
const PROPERTY_BYTE_PACKING: u8 = 0x00;
const PROPERTY_WORD_PACKING: u8 = 0x20;
const PROPERTY_LONG_PACKING: u8 = 0x40;
const PROPERTY_LEMPEL_ZIV: u8 = 0xA0;

const HUFFMAN_BASES_NUM: usize = 8;
const HUFFMAN_BASE_SIZE: usize = 11;

/// Offset bit counts of the eight Huffman tables. The sentinel -1 marks the
/// end of each table.
const BIT_AMOUNTS: [[i8; HUFFMAN_BASE_SIZE]; HUFFMAN_BASES_NUM] = [
    [0, 1, 2, 4, 6, 8, 12, 16, 24, 32, -1],
    [0, 1, 1, 2, 4, 8, 12, 16, 24, 32, -1],
    [0, 1, 1, 1, 2, 4, 8, 14, 22, 32, -1],
    [0, 2, 2, 3, 5, 8, 12, 16, 24, 32, -1],
    [0, 3, 4, 5, 8, 12, 16, 24, 32, -1, -1],
    [0, 4, 6, 8, 12, 16, 24, 32, -1, -1, -1],
    [0, 6, 8, 12, 16, 24, 32, -1, -1, -1, -1],
    [0, 7, 8, 12, 16, 24, 32, -1, -1, -1, -1],
];

/// Bit counts and padding used by the property byte-packing algorithm,
/// indexed by the 5-bit data field of the header byte.
const BIT_LOOKUP: [(u8, u8); 48] = [
    (8, 0), // index 0
    (1, 0),
    (1, 1),
    (1, 2),
    (1, 3),
    (1, 4),
    (1, 5),
    (1, 6),
    (1, 7),
    (2, 0),
    (2, 1), // index 10
    (2, 2),
    (2, 3),
    (3, 0),
    (3, 1),
    (3, 2),
    (4, 0),
    (4, 1),
    (5, 0),
    (5, 1),
    (6, 0), // index 20
    (6, 1),
    (7, 0),
    (7, 1),
    (8, 0),
    (9, 0),
    (10, 0),
    (11, 0),
    (12, 0),
    (13, 0),
    (14, 0), // index 30
    (15, 0),
    (16, 0),
    (17, 0),
    (18, 0),
    (19, 0),
    (20, 0),
    (21, 0),
    (22, 0),
    (23, 0),
    (24, 0), // index 40
    (25, 0),
    (26, 0),
    (27, 0),
    (28, 0),
    (29, 0),
    (30, 0),
    (31, 0), // index 47
];

/// Perform the second-order delta transformation in place:
/// `d[i] = a[i] - 2*a[i-1] + a[i-2]`, with zero history.
pub fn delta_transform(data: &mut [i64]) {
    let mut previous = 0i64;
    let mut before_previous = 0i64;

    for value in data.iter_mut() {
        let original = *value;
        *value = original
            .wrapping_sub(previous.wrapping_mul(2))
            .wrapping_add(before_previous);
        before_previous = previous;
        previous = original;
    }
}

/// Undo [`delta_transform`] in place on just-inflated data.
pub fn inverse_delta_transform(data: &mut [i64]) {
    let mut current = 0i64;
    let mut previous = 0i64;

    for value in data.iter_mut() {
        let delta = current
            .wrapping_mul(2)
            .wrapping_sub(previous)
            .wrapping_add(*value);
        previous = current;
        current = delta;
        *value = delta;
    }
}

/// Smallest block size able to store every value of `data`, sign bit
/// included.
pub fn gorilla_block_size(data: &[i64]) -> u8 {
    let mut block_size = 0u8;

    for &value in data {
        // Negative values measure as their one's complement so the sign bit
        // can be accounted for separately.
        let magnitude = if value < 0 { !value } else { value } as u64;

        while block_size < 63 && (magnitude >> block_size) != 0 {
            block_size += 1;
        }
    }

    block_size + 1
}

/// Decompress `length` sign-extended values of `block_size` bits each.
pub fn inflate_gorilla(
    source: &mut DataSource,
    length: u64,
    block_size: u8,
) -> Result<Vec<i64>, IsfError> {
    debug_assert!(block_size >= 1 && block_size <= 64);

    let mut decoded = Vec::with_capacity(length as usize);

    for _ in 0..length {
        let raw = source.get_bits(block_size)?;
        // Bit block_size-1 is the sign; extend it arithmetically.
        let shift = 64 - u32::from(block_size);
        let value = ((raw << shift) as i64) >> shift;
        decoded.push(value);
    }

    Ok(decoded)
}

/// Compress `data` with `block_size` bits per value.
pub fn deflate_gorilla(sink: &mut DataSource, block_size: u8, data: &[i64]) {
    let mask = if block_size == 64 {
        u64::MAX
    } else {
        (1u64 << block_size) - 1
    };

    for &value in data {
        sink.append_bits((value as u64) & mask, block_size);
    }
}

/// A Huffman table: per-run-length offset bit counts and the offset bases
/// derived from them by prefix summing.
struct HuffmanTable {
    bit_amounts: Vec<u8>,
    bases: Vec<i64>,
}

fn huffman_table(index: u8) -> HuffmanTable {
    let mut bit_amounts = Vec::with_capacity(HUFFMAN_BASE_SIZE);
    let mut bases = Vec::with_capacity(HUFFMAN_BASE_SIZE);

    let mut base = 1i64;
    bases.push(0);

    for &amount in BIT_AMOUNTS[index as usize].iter() {
        if amount == -1 {
            break;
        }

        bit_amounts.push(amount as u8);

        if amount == 0 {
            continue;
        }

        bases.push(base);
        base += 1i64 << (amount - 1);
    }

    HuffmanTable { bit_amounts, bases }
}

/// Decompress `length` values with the table selected by `index`, then
/// undo the delta-delta preconditioning the encoder always applies.
pub fn inflate_huffman(
    source: &mut DataSource,
    length: u64,
    index: u8,
) -> Result<Vec<i64>, IsfError> {
    if index as usize >= HUFFMAN_BASES_NUM {
        return Err(IsfError::InvalidBlock {
            context: "adaptive-huffman table index out of range",
        });
    }

    let table = huffman_table(index);
    let mut decoded = Vec::with_capacity(length as usize);

    let mut count: usize = 0;
    while (decoded.len() as u64) < length {
        if source.get_bit()? {
            count += 1;
            continue;
        }

        let value = if count == 0 {
            0
        } else if count < table.bit_amounts.len() {
            let offset = source.get_bits(table.bit_amounts[count])?;
            let sign = offset & 0x1 != 0;
            let magnitude = (offset >> 1) as i64;
            let value = table.bases[count] + magnitude;
            if sign {
                -value
            } else {
                value
            }
        } else if count == table.bit_amounts.len() {
            return Err(IsfError::Unsupported {
                feature: "64-bit adaptive-huffman values",
            });
        } else {
            warn!("huffman run of {} ones exceeds the table, emitting zero", count);
            0
        };

        decoded.push(value);
        count = 0;
    }

    inverse_delta_transform(&mut decoded);

    Ok(decoded)
}

/// Number of bits value `v` takes under `table`, or `None` when it does not
/// fit any run-length slot.
fn huffman_cost(table: &HuffmanTable, value: i64) -> Option<u64> {
    if value == 0 {
        return Some(1);
    }

    let magnitude = value.unsigned_abs() as i64;
    for k in 1..table.bit_amounts.len() {
        let span = 1i64 << (table.bit_amounts[k] - 1);
        if magnitude >= table.bases[k] && magnitude - table.bases[k] < span {
            return Some(k as u64 + 1 + u64::from(table.bit_amounts[k]));
        }
    }

    None
}

/// Select the table index producing the smallest encoding for the given
/// delta-delta transformed data.
pub fn huffman_index(data: &[i64]) -> Result<u8, IsfError> {
    let mut best: Option<(u8, u64)> = None;

    for index in 0..HUFFMAN_BASES_NUM as u8 {
        let table = huffman_table(index);

        let mut total = 0u64;
        let mut fits = true;
        for &value in data {
            match huffman_cost(&table, value) {
                Some(cost) => total += cost,
                None => {
                    fits = false;
                    break;
                }
            }
        }

        if fits && best.map_or(true, |(_, size)| total < size) {
            best = Some((index, total));
        }
    }

    match best {
        Some((index, _)) => Ok(index),
        None => Err(IsfError::Unsupported {
            feature: "values outside the adaptive-huffman range",
        }),
    }
}

/// Compress delta-delta transformed data with the table selected by
/// `index`.
pub fn deflate_huffman(sink: &mut DataSource, index: u8, data: &[i64]) -> Result<(), IsfError> {
    let table = huffman_table(index);

    for &value in data {
        if value == 0 {
            sink.append_bits(0, 1);
            continue;
        }

        let magnitude = value.unsigned_abs() as i64;
        let mut encoded = false;

        for k in 1..table.bit_amounts.len() {
            let amount = table.bit_amounts[k];
            let span = 1i64 << (amount - 1);
            if magnitude < table.bases[k] || magnitude - table.bases[k] >= span {
                continue;
            }

            let offset = (magnitude - table.bases[k]) as u64;
            let word = (offset << 1) | u64::from(value < 0);

            // The run of k ones, the terminating zero, then the offset.
            sink.append_bits((1u64 << k) - 1, k as u8);
            sink.append_bits(0, 1);
            sink.append_bits(word, amount);

            encoded = true;
            break;
        }

        if !encoded {
            return Err(IsfError::Unsupported {
                feature: "values outside the adaptive-huffman range",
            });
        }
    }

    Ok(())
}

/// Decompress a coordinate run: read the algorithm header byte, dispatch,
/// decode `length` values and realign to the next byte boundary.
pub fn inflate_packets(source: &mut DataSource, length: u64) -> Result<Vec<i64>, IsfError> {
    let header = source.get_byte()?;
    let needs_transform = header & TRANSFORM_FLAG != 0;
    let data_field = header & BLOCK_SIZE_MASK;

    let decoded = match header & ALGORITHM_MASK {
        ALGORITHM_GORILLA => {
            if needs_transform {
                return Err(IsfError::InvalidBlock {
                    context: "transformed bit-packed coordinate data",
                });
            }
            // A stored block size of zero means 32.
            let block_size = if data_field == 0 { 32 } else { data_field };
            inflate_gorilla(source, length, block_size)?
        }
        ALGORITHM_HUFFMAN => {
            if data_field > 7 {
                return Err(IsfError::InvalidBlock {
                    context: "adaptive-huffman table index out of range",
                });
            }
            inflate_huffman(source, length, data_field)?
        }
        _ => {
            return Err(IsfError::Unsupported {
                feature: "reserved coordinate compression algorithm",
            });
        }
    };

    source.skip_to_next_byte();

    Ok(decoded)
}

/// Compress a coordinate run, header byte included. Multi-value runs use
/// adaptive Huffman with delta-delta preconditioning; single values are bit
/// packed.
pub fn deflate_packets(data: &[i64]) -> Result<Vec<u8>, IsfError> {
    let mut sink = DataSource::new();

    if data.len() == 1 {
        let block_size = gorilla_block_size(data);
        if block_size > 32 {
            return Err(IsfError::Unsupported {
                feature: "bit packing of values wider than 32 bits",
            });
        }

        // A block size of 32 is stored as zero.
        sink.append_byte(ALGORITHM_GORILLA | (block_size & BLOCK_SIZE_MASK));
        deflate_gorilla(&mut sink, block_size, data);
    } else {
        let mut transformed = data.to_vec();
        delta_transform(&mut transformed);

        let index = huffman_index(&transformed)?;
        sink.append_byte(ALGORITHM_HUFFMAN | index);
        deflate_huffman(&mut sink, index, &transformed)?;
    }

    Ok(sink.into_bytes())
}

/// Decompress a custom-tag property payload of `byte_length` data bytes
/// following the algorithm header byte.
///
/// Only the byte-packing variant has ever been observed; words, longs and
/// Lempel-Ziv are rejected.
pub fn inflate_properties(
    source: &mut DataSource,
    byte_length: u64,
) -> Result<Vec<i64>, IsfError> {
    let header = source.get_byte()?;

    match header & ALGORITHM_MASK {
        0x00 if header & PROPERTY_WORD_PACKING == 0 => {
            let mut index = header & BLOCK_SIZE_MASK;
            if index > 24 {
                warn!("property packing index {} is too high, clamping to 24", index);
                index = 24;
            }

            let (bits, _pads) = BIT_LOOKUP[index as usize];
            let count = byte_length * 8 / u64::from(bits);

            let mut decoded = Vec::with_capacity(count as usize);
            for _ in 0..count {
                decoded.push(source.get_bits(bits)? as i64);
            }

            source.skip_to_next_byte();
            Ok(decoded)
        }
        0x00 => Err(IsfError::Unsupported {
            feature: "bit packing of 16-bit property data",
        }),
        PROPERTY_LONG_PACKING => Err(IsfError::Unsupported {
            feature: "bit packing of 32-bit property data",
        }),
        _ if header & 0xE0 == PROPERTY_LEMPEL_ZIV => Err(IsfError::Unsupported {
            feature: "lempel-ziv property compression",
        }),
        _ => Err(IsfError::Unsupported {
            feature: "reserved property compression algorithm",
        }),
    }
}

/// Compress a custom-tag property payload with byte packing, header
/// included.
pub fn deflate_properties(data: &[i64]) -> Vec<u8> {
    // Index 0 selects plain 8-bit packing.
    let mut sink = DataSource::new();
    sink.append_byte(PROPERTY_BYTE_PACKING);
    for &value in data {
        sink.append_byte(value as u8);
    }
    sink.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_round_trip() {
        let original: Vec<i64> = vec![10, 12, 15, 15, 14, 10, 3, -4, -9];
        let mut data = original.clone();

        delta_transform(&mut data);
        // Smooth sequences precondition to small second differences.
        assert_eq!(data[0], 10);
        assert_eq!(data[1], -8);

        inverse_delta_transform(&mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn test_gorilla_block_size() {
        assert_eq!(gorilla_block_size(&[0]), 1);
        assert_eq!(gorilla_block_size(&[1]), 2);
        assert_eq!(gorilla_block_size(&[-1]), 1);
        assert_eq!(gorilla_block_size(&[-2, 3]), 3);
        assert_eq!(gorilla_block_size(&[255]), 9);
    }

    #[test]
    fn test_gorilla_negative_payload() {
        // Three 4-bit values pack into exactly two bytes.
        let mut sink = DataSource::new();
        deflate_gorilla(&mut sink, 4, &[-1, -2, 3]);
        let bytes = sink.into_bytes();
        assert_eq!(bytes, vec![0xFE, 0x30]);

        let mut source = DataSource::from_bytes(bytes);
        let decoded = inflate_gorilla(&mut source, 3, 4).unwrap();
        assert_eq!(decoded, vec![-1, -2, 3]);
    }

    #[test]
    fn test_gorilla_full_width() {
        let values = vec![i64::MIN, i64::MAX, -1, 0];
        let mut sink = DataSource::new();
        deflate_gorilla(&mut sink, 64, &values);

        let mut source = DataSource::from_bytes(sink.into_bytes());
        assert_eq!(inflate_gorilla(&mut source, 4, 64).unwrap(), values);
    }

    #[test]
    fn test_huffman_bases_prefix_sums() {
        // Spot-check the derived bases against known values of the first
        // and last tables.
        let table = huffman_table(0);
        assert_eq!(
            table.bases,
            vec![0, 1, 2, 4, 12, 44, 172, 2220, 34988, 8423596]
        );

        let table = huffman_table(7);
        assert_eq!(table.bases, vec![0, 1, 65, 193, 2241, 35009, 8423617]);
    }

    #[test]
    fn test_huffman_round_trip() {
        let original: Vec<i64> = vec![0, 1, -1, 7, -130, 4000, -34988, 100000, 0, 3];

        for index in 0..HUFFMAN_BASES_NUM as u8 {
            let mut transformed = original.clone();
            delta_transform(&mut transformed);

            let mut sink = DataSource::new();
            deflate_huffman(&mut sink, index, &transformed).unwrap();

            let mut source = DataSource::from_bytes(sink.into_bytes());
            let decoded = inflate_huffman(&mut source, original.len() as u64, index).unwrap();
            assert_eq!(decoded, original, "table index {}", index);
        }
    }

    #[test]
    fn test_packet_round_trip_multi() {
        let original: Vec<i64> = vec![100, 104, 110, 118, 125, 128, 128, 120, 90];
        let bytes = deflate_packets(&original).unwrap();

        let mut source = DataSource::from_bytes(bytes);
        let decoded = inflate_packets(&mut source, original.len() as u64).unwrap();
        assert_eq!(decoded, original);
        assert!(source.at_end(true));
    }

    #[test]
    fn test_packet_round_trip_single() {
        for &value in &[0i64, 7, -7, 1023, -65000] {
            let bytes = deflate_packets(&[value]).unwrap();
            // Single values are bit packed.
            assert_eq!(bytes[0] & ALGORITHM_MASK, ALGORITHM_GORILLA);

            let mut source = DataSource::from_bytes(bytes);
            assert_eq!(inflate_packets(&mut source, 1).unwrap(), vec![value]);
        }
    }

    #[test]
    fn test_packet_block_size_zero_means_32() {
        let mut sink = DataSource::new();
        sink.append_byte(ALGORITHM_GORILLA);
        deflate_gorilla(&mut sink, 32, &[-70000, 70000]);

        let mut source = DataSource::from_bytes(sink.into_bytes());
        assert_eq!(
            inflate_packets(&mut source, 2).unwrap(),
            vec![-70000, 70000]
        );
    }

    #[test]
    fn test_packet_reserved_algorithm_rejected() {
        let mut source = DataSource::from_bytes(vec![0xC0, 0x00]);
        assert!(matches!(
            inflate_packets(&mut source, 1),
            Err(IsfError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_property_byte_packing_round_trip() {
        let original: Vec<i64> = vec![3, 0, 27, 253, 255, 255];
        let bytes = deflate_properties(&original);

        let mut source = DataSource::from_bytes(bytes);
        let decoded = inflate_properties(&mut source, original.len() as u64).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_property_lempel_ziv_rejected() {
        let mut source = DataSource::from_bytes(vec![0xA0, 0x00]);
        assert!(matches!(
            inflate_properties(&mut source, 1),
            Err(IsfError::Unsupported { .. })
        ));
    }
}
