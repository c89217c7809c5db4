#![allow(dead_code)]

//! Fortified-container handling for ISF payloads.
//!
//! A "fortified" GIF or PNG is an ordinary image that smuggles the raw ISF
//! body of a drawing along: inside an application extension block for GIF,
//! inside a private ancillary chunk for PNG. Applications that understand
//! ink recover the full-fidelity drawing; everything else still displays
//! the image.
//!
//! This crate only locates or embeds the payload. The carrier image this
//! implementation writes is a minimal valid one-pixel image; rendering the
//! ink into the carrier is a display concern and lives elsewhere.

use log::{debug, warn};
use std::error;
use std::fmt;

use isf::Drawing;

// <CR><LF> escape protection, as every PNG starts.
const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

// Private ancillary, safe-to-copy chunk carrying the ISF body.
const PNG_INK_CHUNK: [u8; 4] = *b"inKs";

const GIF_SIGNATURE_87: [u8; 6] = *b"GIF87a";
const GIF_SIGNATURE_89: [u8; 6] = *b"GIF89a";

const GIF_EXTENSION_INTRODUCER: u8 = 0x21;
const GIF_APPLICATION_EXTENSION: u8 = 0xFF;
const GIF_IMAGE_SEPARATOR: u8 = 0x2C;
const GIF_TRAILER: u8 = 0x3B;

// Application identifier plus authentication code of the ink extension,
// eleven bytes as the GIF89a specification requires.
const GIF_INK_IDENTIFIER: [u8; 11] = *b"ISFDATAMARK";

#[derive(Debug)]
pub enum FortifiedError {
    InvalidSignature { offset: u64 },
    TruncatedImage { offset: u64 },
    ChunkCorrupt { chunk: [u8; 4], offset: u64 },
    PayloadMissing,
    Encode(isf::IsfError),
}

impl error::Error for FortifiedError {}
impl fmt::Display for FortifiedError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidSignature { offset } => {
                write!(f, "invalid image signature at offset {}", offset)
            }
            Self::TruncatedImage { offset } => {
                write!(f, "image data ends unexpectedly at offset {}", offset)
            }
            Self::ChunkCorrupt { chunk, offset } => {
                write!(
                    f,
                    "chunk {:?} at offset {} failed its checksum",
                    String::from_utf8_lossy(chunk),
                    offset
                )
            }
            Self::PayloadMissing => {
                write!(f, "the image carries no ISF payload")
            }
            Self::Encode(error) => {
                write!(f, "could not encode the drawing: {}", error)
            }
        }
    }
}

impl From<isf::IsfError> for FortifiedError {
    fn from(error: isf::IsfError) -> FortifiedError {
        FortifiedError::Encode(error)
    }
}

/// Decode the drawing fortified into a PNG image.
pub fn decode_png(data: &[u8]) -> Result<Drawing, FortifiedError> {
    let payload = extract_isf_from_png(data)?;
    Ok(isf::decode(&payload))
}

/// Decode the drawing fortified into a GIF image.
pub fn decode_gif(data: &[u8]) -> Result<Drawing, FortifiedError> {
    let payload = extract_isf_from_gif(data)?;
    Ok(isf::decode(&payload))
}

/// Encode a drawing and wrap it into a fortified PNG.
pub fn encode_png(drawing: &Drawing) -> Result<Vec<u8>, FortifiedError> {
    let payload = isf::encode(drawing)?;
    Ok(embed_isf_in_png(&payload))
}

/// Encode a drawing and wrap it into a fortified GIF.
pub fn encode_gif(drawing: &Drawing) -> Result<Vec<u8>, FortifiedError> {
    let payload = isf::encode(drawing)?;
    Ok(embed_isf_in_gif(&payload))
}

/// Walk the chunk sequence of a PNG image and return the ISF payload of
/// its ink chunk.
pub fn extract_isf_from_png(data: &[u8]) -> Result<Vec<u8>, FortifiedError> {
    if data.len() < PNG_SIGNATURE.len() || data[..8] != PNG_SIGNATURE {
        return Err(FortifiedError::InvalidSignature { offset: 0 });
    }

    let mut offset = PNG_SIGNATURE.len();

    // Chunks are framed as length, type, data, CRC.
    while offset + 8 <= data.len() {
        let length = u32::from_be_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ]) as usize;

        let mut chunk_type = [0u8; 4];
        chunk_type.copy_from_slice(&data[offset + 4..offset + 8]);

        let data_start = offset + 8;
        let data_end = match data_start.checked_add(length) {
            Some(end) if end + 4 <= data.len() => end,
            _ => {
                return Err(FortifiedError::TruncatedImage {
                    offset: offset as u64,
                });
            }
        };

        if chunk_type == PNG_INK_CHUNK {
            let mut hasher = crc32fast::Hasher::new();
            hasher.update(&chunk_type);
            hasher.update(&data[data_start..data_end]);

            let stored = u32::from_be_bytes([
                data[data_end],
                data[data_end + 1],
                data[data_end + 2],
                data[data_end + 3],
            ]);

            if hasher.finalize() != stored {
                return Err(FortifiedError::ChunkCorrupt {
                    chunk: chunk_type,
                    offset: offset as u64,
                });
            }

            debug!("found {} bytes of ISF data in PNG chunk", length);
            return Ok(data[data_start..data_end].to_vec());
        }

        if &chunk_type == b"IEND" {
            break;
        }

        offset = data_end + 4;
    }

    Err(FortifiedError::PayloadMissing)
}

fn png_chunk(out: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(chunk_type);
    out.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    out.extend_from_slice(&hasher.finalize().to_be_bytes());
}

/// Build a minimal valid PNG carrying `payload` in its ink chunk.
pub fn embed_isf_in_png(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 96);
    out.extend_from_slice(&PNG_SIGNATURE);

    // IHDR for a 1x1 8-bit grayscale image.
    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&1u32.to_be_bytes());
    ihdr.extend_from_slice(&1u32.to_be_bytes());
    ihdr.extend_from_slice(&[8, 0, 0, 0, 0]);
    png_chunk(&mut out, b"IHDR", &ihdr);

    // One scanline: filter byte plus a single black pixel.
    let idat = miniz_oxide::deflate::compress_to_vec_zlib(&[0x00, 0x00], 6);
    png_chunk(&mut out, b"IDAT", &idat);

    png_chunk(&mut out, &PNG_INK_CHUNK, payload);
    png_chunk(&mut out, b"IEND", &[]);

    out
}

/// Read the length byte of a GIF data sub-block run and collect the run.
fn gif_sub_blocks(data: &[u8], offset: &mut usize) -> Result<Vec<u8>, FortifiedError> {
    let mut collected = Vec::new();

    loop {
        let size = *data.get(*offset).ok_or(FortifiedError::TruncatedImage {
            offset: *offset as u64,
        })? as usize;
        *offset += 1;

        if size == 0 {
            return Ok(collected);
        }

        let end = *offset + size;
        if end > data.len() {
            return Err(FortifiedError::TruncatedImage {
                offset: *offset as u64,
            });
        }

        collected.extend_from_slice(&data[*offset..end]);
        *offset = end;
    }
}

/// Walk the block sequence of a GIF image and return the ISF payload of
/// its ink application extension.
pub fn extract_isf_from_gif(data: &[u8]) -> Result<Vec<u8>, FortifiedError> {
    if data.len() < 13 || (data[..6] != GIF_SIGNATURE_87 && data[..6] != GIF_SIGNATURE_89) {
        return Err(FortifiedError::InvalidSignature { offset: 0 });
    }

    // Logical screen descriptor: size, packed fields, background, aspect.
    let packed = data[10];
    let mut offset = 13;

    // Skip the global color table when present.
    if packed & 0x80 != 0 {
        let entries = 2usize << (packed & 0x07);
        offset += entries * 3;
    }

    while offset < data.len() {
        match data[offset] {
            GIF_EXTENSION_INTRODUCER => {
                let label = *data.get(offset + 1).ok_or(FortifiedError::TruncatedImage {
                    offset: offset as u64,
                })?;
                offset += 2;

                if label == GIF_APPLICATION_EXTENSION {
                    let header = gif_sub_blocks(data, &mut offset)?;

                    // The first sub-block holds the identifier, the rest is
                    // payload. Collected as one run they are contiguous.
                    if header.len() >= GIF_INK_IDENTIFIER.len()
                        && header[..GIF_INK_IDENTIFIER.len()] == GIF_INK_IDENTIFIER
                    {
                        let payload = header[GIF_INK_IDENTIFIER.len()..].to_vec();
                        debug!("found {} bytes of ISF data in GIF extension", payload.len());
                        return Ok(payload);
                    }

                    debug!("skipping foreign application extension");
                } else {
                    // Comment, graphic control or plain text extension.
                    gif_sub_blocks(data, &mut offset)?;
                }
            }
            GIF_IMAGE_SEPARATOR => {
                if offset + 10 > data.len() {
                    return Err(FortifiedError::TruncatedImage {
                        offset: offset as u64,
                    });
                }

                let packed = data[offset + 9];
                offset += 10;

                // Local color table, then the LZW minimum code size byte,
                // then the image data sub-blocks.
                if packed & 0x80 != 0 {
                    let entries = 2usize << (packed & 0x07);
                    offset += entries * 3;
                }
                offset += 1;
                gif_sub_blocks(data, &mut offset)?;
            }
            GIF_TRAILER => break,
            other => {
                warn!("unexpected GIF block {:#04X} at offset {}", other, offset);
                return Err(FortifiedError::TruncatedImage {
                    offset: offset as u64,
                });
            }
        }
    }

    Err(FortifiedError::PayloadMissing)
}

/// Build a minimal valid GIF89a carrying `payload` in an application
/// extension.
pub fn embed_isf_in_gif(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 64);

    out.extend_from_slice(&GIF_SIGNATURE_89);

    // Logical screen descriptor: 1x1, global color table of two entries.
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&[0x80, 0x00, 0x00]);

    // Black and white palette.
    out.extend_from_slice(&[0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF]);

    // Ink application extension: identifier block, then the payload split
    // into sub-blocks of at most 255 bytes.
    out.push(GIF_EXTENSION_INTRODUCER);
    out.push(GIF_APPLICATION_EXTENSION);
    out.push(GIF_INK_IDENTIFIER.len() as u8);
    out.extend_from_slice(&GIF_INK_IDENTIFIER);
    for block in payload.chunks(255) {
        out.push(block.len() as u8);
        out.extend_from_slice(block);
    }
    out.push(0x00);

    // A one-pixel image so the file stays displayable.
    out.push(GIF_IMAGE_SEPARATOR);
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.push(0x00);
    out.extend_from_slice(&[0x02, 0x02, 0x44, 0x01, 0x00]);

    out.push(GIF_TRAILER);

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_payload_round_trip() {
        let payload = vec![0x00, 0x03, 0x1C, 0x01, 0x00];
        let image = embed_isf_in_png(&payload);

        assert_eq!(&image[..8], &PNG_SIGNATURE);
        assert_eq!(extract_isf_from_png(&image).unwrap(), payload);
    }

    #[test]
    fn test_gif_payload_round_trip() {
        let payload: Vec<u8> = (0..600).map(|value| value as u8).collect();
        let image = embed_isf_in_gif(&payload);

        assert_eq!(&image[..6], b"GIF89a");
        assert_eq!(extract_isf_from_gif(&image).unwrap(), payload);
    }

    #[test]
    fn test_png_signature_rejected() {
        assert!(matches!(
            extract_isf_from_png(b"not a png at all"),
            Err(FortifiedError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn test_gif_signature_rejected() {
        assert!(matches!(
            extract_isf_from_gif(b"JFIF baloney here"),
            Err(FortifiedError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn test_png_without_ink_chunk() {
        let image = {
            let mut out = Vec::new();
            out.extend_from_slice(&PNG_SIGNATURE);
            let mut ihdr = Vec::new();
            ihdr.extend_from_slice(&1u32.to_be_bytes());
            ihdr.extend_from_slice(&1u32.to_be_bytes());
            ihdr.extend_from_slice(&[8, 0, 0, 0, 0]);
            png_chunk(&mut out, b"IHDR", &ihdr);
            png_chunk(&mut out, b"IEND", &[]);
            out
        };

        assert!(matches!(
            extract_isf_from_png(&image),
            Err(FortifiedError::PayloadMissing)
        ));
    }

    #[test]
    fn test_png_crc_mismatch() {
        let payload = vec![1, 2, 3, 4];
        let mut image = embed_isf_in_png(&payload);

        // Flip a payload byte of the ink chunk without updating its CRC.
        let position = image
            .windows(4)
            .position(|window| window == PNG_INK_CHUNK)
            .unwrap();
        image[position + 4] ^= 0xFF;

        assert!(matches!(
            extract_isf_from_png(&image),
            Err(FortifiedError::ChunkCorrupt { .. })
        ));
    }
}
