//! IEv1: the binary encoding of a single edit operation.
//!
//! Layout (all integers little-endian):
//!
//! | offset | size | field |
//! |--------|------|-------------------------------|
//! | 0      | 2    | version (= 1)                 |
//! | 2      | 2    | op_type (1..4)                |
//! | 4      | 4    | payload_len                   |
//! | 8      | 4    | crc32 of payload              |
//! | 12     | n    | payload                       |
//!
//! Payload per op_type: ROTATE one byte of quarter turns (1, 2, 3 for
//! 90/180/270 degrees), FLIP one byte with bit 0 = horizontal and bit 1 =
//! vertical, RESIZE `u32 width` then `u32 height` with zero meaning
//! "absent", COMPRESS one quality byte.
//!
//! The checksum is the standard reflected CRC-32 (polynomial 0xEDB88320,
//! init and final xor 0xFFFFFFFF) over the payload only. Decoding verifies
//! structure and checksum; callers still run [`Operation::validate`] on the
//! result, so malformed framing and out-of-range parameters surface as two
//! distinct error classes.

use pixed_core::models::{OpType, Operation};
use thiserror::Error;

pub const VERSION: u16 = 1;
pub const HEADER_LEN: usize = 12;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("message truncated: need at least {need} bytes, got {got}")]
    Truncated { need: usize, got: usize },

    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u16),

    #[error("unknown op_type {0}")]
    UnknownOpType(u16),

    #[error("payload length {declared} does not fit op_type {op_type} (expected {expected})")]
    PayloadLength {
        op_type: u16,
        declared: u32,
        expected: u32,
    },

    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

impl From<ProtocolError> for pixed_core::AppError {
    fn from(err: ProtocolError) -> Self {
        pixed_core::AppError::Protocol(err.to_string())
    }
}

fn payload_len_for(op_type: OpType) -> u32 {
    match op_type {
        OpType::Rotate | OpType::Flip | OpType::Compress => 1,
        OpType::Resize => 8,
    }
}

fn encode_payload(op: &Operation) -> Vec<u8> {
    match *op {
        Operation::Rotate { degrees } => vec![(degrees / 90) as u8],
        Operation::Flip { horizontal, vertical } => {
            vec![u8::from(horizontal) | (u8::from(vertical) << 1)]
        }
        Operation::Resize { width, height } => {
            let mut buf = Vec::with_capacity(8);
            buf.extend_from_slice(&width.unwrap_or(0).to_le_bytes());
            buf.extend_from_slice(&height.unwrap_or(0).to_le_bytes());
            buf
        }
        Operation::Compress { quality } => vec![quality],
    }
}

fn decode_payload(op_type: OpType, payload: &[u8]) -> Result<Operation, ProtocolError> {
    match op_type {
        OpType::Rotate => match payload[0] {
            turns @ 1..=3 => Ok(Operation::Rotate {
                degrees: turns as u16 * 90,
            }),
            other => Err(ProtocolError::MalformedPayload(format!(
                "rotate quarter-turn byte must be 1..3, got {other}"
            ))),
        },
        OpType::Flip => {
            let bits = payload[0];
            if bits & !0b11 != 0 {
                return Err(ProtocolError::MalformedPayload(format!(
                    "flip byte has unknown bits set: {bits:#04x}"
                )));
            }
            Ok(Operation::Flip {
                horizontal: bits & 0b01 != 0,
                vertical: bits & 0b10 != 0,
            })
        }
        OpType::Resize => {
            let width = u32::from_le_bytes(payload[0..4].try_into().expect("length checked"));
            let height = u32::from_le_bytes(payload[4..8].try_into().expect("length checked"));
            Ok(Operation::Resize {
                width: (width != 0).then_some(width),
                height: (height != 0).then_some(height),
            })
        }
        OpType::Compress => Ok(Operation::Compress { quality: payload[0] }),
    }
}

/// Encode one operation into a self-describing, checksummed byte sequence.
pub fn encode(op: &Operation) -> Vec<u8> {
    let payload = encode_payload(op);
    let crc = crc32fast::hash(&payload);

    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.extend_from_slice(&VERSION.to_le_bytes());
    buf.extend_from_slice(&op.op_type().as_u16().to_le_bytes());
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(&crc.to_le_bytes());
    buf.extend_from_slice(&payload);
    buf
}

/// Decode one operation, verifying version, op_type, declared length, and
/// payload checksum. Any mismatch fails; a structurally valid message can
/// still carry parameters that [`Operation::validate`] rejects.
pub fn decode(buf: &[u8]) -> Result<Operation, ProtocolError> {
    if buf.len() < HEADER_LEN {
        return Err(ProtocolError::Truncated {
            need: HEADER_LEN,
            got: buf.len(),
        });
    }

    let version = u16::from_le_bytes(buf[0..2].try_into().expect("length checked"));
    if version != VERSION {
        return Err(ProtocolError::UnsupportedVersion(version));
    }

    let raw_op = u16::from_le_bytes(buf[2..4].try_into().expect("length checked"));
    let op_type = OpType::from_u16(raw_op).ok_or(ProtocolError::UnknownOpType(raw_op))?;

    let declared = u32::from_le_bytes(buf[4..8].try_into().expect("length checked"));
    let expected = payload_len_for(op_type);
    if declared != expected {
        return Err(ProtocolError::PayloadLength {
            op_type: raw_op,
            declared,
            expected,
        });
    }
    let end = HEADER_LEN + declared as usize;
    if buf.len() < end {
        return Err(ProtocolError::Truncated {
            need: end,
            got: buf.len(),
        });
    }

    let stored = u32::from_le_bytes(buf[8..12].try_into().expect("length checked"));
    let payload = &buf[HEADER_LEN..end];
    let computed = crc32fast::hash(payload);
    if stored != computed {
        return Err(ProtocolError::ChecksumMismatch { stored, computed });
    }

    decode_payload(op_type, payload)
}
