//! The four edit operations and their validation rules.
//!
//! Operations are value types: equality is `(type, params)`, they hold no
//! I/O handles. Application lives in `pixed-processing`; compact wire/
//! persistence encoding lives in `pixed-proto`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::AppError;

/// Wire/persistence tag for an operation variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum OpType {
    Rotate = 1,
    Flip = 2,
    Resize = 3,
    Compress = 4,
}

impl OpType {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn as_i16(self) -> i16 {
        self as i16
    }

    pub fn from_u16(raw: u16) -> Option<Self> {
        match raw {
            1 => Some(OpType::Rotate),
            2 => Some(OpType::Flip),
            3 => Some(OpType::Resize),
            4 => Some(OpType::Compress),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OpType::Rotate => "rotate",
            OpType::Flip => "flip",
            OpType::Resize => "resize",
            OpType::Compress => "compress",
        }
    }
}

/// Why an operation failed [`Operation::validate`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InvalidOperation {
    #[error("rotate degrees must be 90, 180 or 270 (got {0})")]
    RotateDegrees(u16),
    #[error("resize requires at least one of width, height")]
    ResizeNoBounds,
    #[error("resize {axis} must be between {min} and {max} pixels (got {value})")]
    ResizeOutOfRange {
        axis: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },
    #[error("compress quality must be between 10 and 100 (got {0})")]
    CompressQuality(u8),
}

impl From<InvalidOperation> for AppError {
    fn from(err: InvalidOperation) -> Self {
        AppError::Validation(err.to_string())
    }
}

pub const RESIZE_MIN_PX: u32 = 200;
pub const RESIZE_MAX_PX: u32 = 4000;
pub const COMPRESS_MIN_QUALITY: u8 = 10;
pub const COMPRESS_MAX_QUALITY: u8 = 100;

/// One edit applied to a source image to produce a revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    Rotate { degrees: u16 },
    Flip { horizontal: bool, vertical: bool },
    Resize { width: Option<u32>, height: Option<u32> },
    Compress { quality: u8 },
}

impl Operation {
    pub fn op_type(&self) -> OpType {
        match self {
            Operation::Rotate { .. } => OpType::Rotate,
            Operation::Flip { .. } => OpType::Flip,
            Operation::Resize { .. } => OpType::Resize,
            Operation::Compress { .. } => OpType::Compress,
        }
    }

    pub fn name(&self) -> &'static str {
        self.op_type().name()
    }

    /// Pure predicate over the parameter constraints. A both-false flip is
    /// accepted; it is a no-op at the codec level.
    pub fn validate(&self) -> Result<(), InvalidOperation> {
        match *self {
            Operation::Rotate { degrees } => match degrees {
                90 | 180 | 270 => Ok(()),
                other => Err(InvalidOperation::RotateDegrees(other)),
            },
            Operation::Flip { .. } => Ok(()),
            Operation::Resize { width, height } => {
                if width.is_none() && height.is_none() {
                    return Err(InvalidOperation::ResizeNoBounds);
                }
                for (axis, bound) in [("width", width), ("height", height)] {
                    if let Some(value) = bound {
                        if !(RESIZE_MIN_PX..=RESIZE_MAX_PX).contains(&value) {
                            return Err(InvalidOperation::ResizeOutOfRange {
                                axis,
                                value,
                                min: RESIZE_MIN_PX,
                                max: RESIZE_MAX_PX,
                            });
                        }
                    }
                }
                Ok(())
            }
            Operation::Compress { quality } => {
                if (COMPRESS_MIN_QUALITY..=COMPRESS_MAX_QUALITY).contains(&quality) {
                    Ok(())
                } else {
                    Err(InvalidOperation::CompressQuality(quality))
                }
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Structured parameters persisted in the revision row (`op_params`)
    /// and echoed in REST responses. The variant tag travels separately as
    /// [`OpType`].
    pub fn to_params(&self) -> Value {
        match *self {
            Operation::Rotate { degrees } => json!({ "degrees": degrees }),
            Operation::Flip { horizontal, vertical } => {
                json!({ "horizontal": horizontal, "vertical": vertical })
            }
            Operation::Resize { width, height } => json!({ "width": width, "height": height }),
            Operation::Compress { quality } => json!({ "quality": quality }),
        }
    }

    /// Rebuild an operation from a persisted `(op_type, op_params)` pair.
    pub fn from_parts(op_type: OpType, params: &Value) -> Result<Self, AppError> {
        let op = match op_type {
            OpType::Rotate => Operation::Rotate {
                degrees: field_u64(params, "degrees")? as u16,
            },
            OpType::Flip => Operation::Flip {
                horizontal: field_bool(params, "horizontal")?,
                vertical: field_bool(params, "vertical")?,
            },
            OpType::Resize => Operation::Resize {
                width: opt_field_u64(params, "width")?.map(|v| v as u32),
                height: opt_field_u64(params, "height")?.map(|v| v as u32),
            },
            OpType::Compress => Operation::Compress {
                quality: field_u64(params, "quality")? as u8,
            },
        };
        Ok(op)
    }
}

fn field_u64(params: &Value, key: &str) -> Result<u64, AppError> {
    params
        .get(key)
        .and_then(Value::as_u64)
        .ok_or_else(|| AppError::Corrupted(format!("op_params missing numeric field {key}")))
}

fn opt_field_u64(params: &Value, key: &str) -> Result<Option<u64>, AppError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(Some)
            .ok_or_else(|| AppError::Corrupted(format!("op_params field {key} is not numeric"))),
    }
}

fn field_bool(params: &Value, key: &str) -> Result<bool, AppError> {
    params
        .get(key)
        .and_then(Value::as_bool)
        .ok_or_else(|| AppError::Corrupted(format!("op_params missing boolean field {key}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotate_validation() {
        for degrees in [90, 180, 270] {
            assert!(Operation::Rotate { degrees }.is_valid());
        }
        for degrees in [0, 45, 91, 360] {
            assert!(!Operation::Rotate { degrees }.is_valid());
        }
    }

    #[test]
    fn test_flip_validation_accepts_all_combinations() {
        for horizontal in [false, true] {
            for vertical in [false, true] {
                assert!(Operation::Flip { horizontal, vertical }.is_valid());
            }
        }
    }

    #[test]
    fn test_resize_validation() {
        assert!(Operation::Resize { width: Some(800), height: None }.is_valid());
        assert!(Operation::Resize { width: None, height: Some(200) }.is_valid());
        assert!(Operation::Resize { width: Some(4000), height: Some(4000) }.is_valid());

        assert_eq!(
            Operation::Resize { width: None, height: None }.validate(),
            Err(InvalidOperation::ResizeNoBounds)
        );
        // Below 200 rejected.
        assert!(!Operation::Resize { width: Some(100), height: None }.is_valid());
        assert!(!Operation::Resize { width: Some(199), height: None }.is_valid());
        assert!(!Operation::Resize { width: None, height: Some(4001) }.is_valid());
    }

    #[test]
    fn test_compress_validation() {
        assert!(Operation::Compress { quality: 10 }.is_valid());
        assert!(Operation::Compress { quality: 100 }.is_valid());
        assert!(!Operation::Compress { quality: 5 }.is_valid());
        assert!(!Operation::Compress { quality: 150 }.is_valid());
    }

    #[test]
    fn test_params_round_trip() {
        let ops = [
            Operation::Rotate { degrees: 270 },
            Operation::Flip { horizontal: true, vertical: false },
            Operation::Resize { width: Some(800), height: None },
            Operation::Compress { quality: 42 },
        ];
        for op in ops {
            let rebuilt = Operation::from_parts(op.op_type(), &op.to_params()).unwrap();
            assert_eq!(rebuilt, op);
        }
    }

    #[test]
    fn test_equality_is_by_type_and_params() {
        assert_eq!(
            Operation::Rotate { degrees: 90 },
            Operation::Rotate { degrees: 90 }
        );
        assert_ne!(
            Operation::Rotate { degrees: 90 },
            Operation::Rotate { degrees: 180 }
        );
    }
}
