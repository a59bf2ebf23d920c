//! Pixel types.

use std::fmt;
use std::str::FromStr;

use crate::error::ImageError;

/// Scalar component type of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
    F64,
}

impl PixelType {
    /// Size of one component in bytes.
    pub fn size(&self) -> usize {
        match self {
            PixelType::U8 | PixelType::I8 => 1,
            PixelType::U16 | PixelType::I16 => 2,
            PixelType::U32 | PixelType::I32 | PixelType::F32 => 4,
            PixelType::F64 => 8,
        }
    }

    /// Whether the type stores integers.
    pub fn is_integer(&self) -> bool {
        !matches!(self, PixelType::F32 | PixelType::F64)
    }

    /// Canonical NRRD `type:` name.
    pub fn nrrd_name(&self) -> &'static str {
        match self {
            PixelType::U8 => "uint8",
            PixelType::I8 => "int8",
            PixelType::U16 => "uint16",
            PixelType::I16 => "int16",
            PixelType::U32 => "uint32",
            PixelType::I32 => "int32",
            PixelType::F32 => "float",
            PixelType::F64 => "double",
        }
    }

    /// Name used by elastix for `ResultImagePixelType`.
    pub fn elastix_name(&self) -> &'static str {
        match self {
            PixelType::U8 => "unsigned char",
            PixelType::I8 => "char",
            PixelType::U16 => "unsigned short",
            PixelType::I16 => "short",
            PixelType::U32 => "unsigned int",
            PixelType::I32 => "int",
            PixelType::F32 => "float",
            PixelType::F64 => "double",
        }
    }

    /// Parses an NRRD `type:` value, accepting the usual C type aliases.
    pub fn from_nrrd_name(name: &str) -> Option<Self> {
        let pixel = match name.trim() {
            "uchar" | "unsigned char" | "uint8" | "uint8_t" => PixelType::U8,
            "signed char" | "int8" | "int8_t" => PixelType::I8,
            "ushort" | "unsigned short" | "unsigned short int" | "uint16" | "uint16_t" => {
                PixelType::U16
            }
            "short" | "short int" | "signed short" | "signed short int" | "int16" | "int16_t" => {
                PixelType::I16
            }
            "uint" | "unsigned int" | "uint32" | "uint32_t" => PixelType::U32,
            "int" | "signed int" | "int32" | "int32_t" => PixelType::I32,
            "float" => PixelType::F32,
            "double" => PixelType::F64,
            _ => return None,
        };
        Some(pixel)
    }

    /// Clamps and rounds a value into the representable range of this type.
    pub fn saturate(&self, value: f64) -> f64 {
        let (lo, hi) = match self {
            PixelType::U8 => (u8::MIN as f64, u8::MAX as f64),
            PixelType::I8 => (i8::MIN as f64, i8::MAX as f64),
            PixelType::U16 => (u16::MIN as f64, u16::MAX as f64),
            PixelType::I16 => (i16::MIN as f64, i16::MAX as f64),
            PixelType::U32 => (u32::MIN as f64, u32::MAX as f64),
            PixelType::I32 => (i32::MIN as f64, i32::MAX as f64),
            PixelType::F32 => (f32::MIN as f64, f32::MAX as f64),
            PixelType::F64 => return value,
        };
        let value = if self.is_integer() { value.round() } else { value };
        value.clamp(lo, hi)
    }
}

impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.elastix_name())
    }
}

impl FromStr for PixelType {
    type Err = ImageError;

    /// Accepts NRRD names and elastix names (`"short"`, `"unsigned char"`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim() == "char" {
            return Ok(PixelType::I8);
        }
        PixelType::from_nrrd_name(s).ok_or_else(|| ImageError::UnsupportedPixelType {
            name: s.to_string(),
        })
    }
}
