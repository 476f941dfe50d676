//! The integer codec: eight signed/unsigned, 8/16/32/64-bit variants.

use crate::endian::{effective, Endian};
use crate::error::{Error, Result};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
}

impl IntWidth {
    pub fn size(self) -> usize {
        match self {
            IntWidth::U8 | IntWidth::I8 => 1,
            IntWidth::U16 | IntWidth::I16 => 2,
            IntWidth::U32 | IntWidth::I32 => 4,
            IntWidth::U64 | IntWidth::I64 => 8,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(self, IntWidth::I8 | IntWidth::I16 | IntWidth::I32 | IntWidth::I64)
    }

    pub fn min(self) -> i128 {
        match self {
            IntWidth::U8 | IntWidth::U16 | IntWidth::U32 | IntWidth::U64 => 0,
            IntWidth::I8 => i8::MIN as i128,
            IntWidth::I16 => i16::MIN as i128,
            IntWidth::I32 => i32::MIN as i128,
            IntWidth::I64 => i64::MIN as i128,
        }
    }

    pub fn max(self) -> i128 {
        match self {
            IntWidth::U8 => u8::MAX as i128,
            IntWidth::U16 => u16::MAX as i128,
            IntWidth::U32 => u32::MAX as i128,
            IntWidth::U64 => u64::MAX as i128,
            IntWidth::I8 => i8::MAX as i128,
            IntWidth::I16 => i16::MAX as i128,
            IntWidth::I32 => i32::MAX as i128,
            IntWidth::I64 => i64::MAX as i128,
        }
    }

    pub(crate) fn from_byte_width(bytes: usize) -> Option<IntWidth> {
        match bytes {
            1 => Some(IntWidth::U8),
            2 => Some(IntWidth::U16),
            4 => Some(IntWidth::U32),
            8 => Some(IntWidth::U64),
            _ => None,
        }
    }
}

/// A single fixed-width integer descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntDesc {
    pub width: IntWidth,
    pub endian: Option<Endian>,
}

impl IntDesc {
    pub fn new(width: IntWidth) -> Self {
        Self { width, endian: None }
    }

    pub fn u8() -> Self {
        Self::new(IntWidth::U8)
    }
    pub fn u16() -> Self {
        Self::new(IntWidth::U16)
    }
    pub fn u32() -> Self {
        Self::new(IntWidth::U32)
    }
    pub fn u64() -> Self {
        Self::new(IntWidth::U64)
    }
    pub fn i8() -> Self {
        Self::new(IntWidth::I8)
    }
    pub fn i16() -> Self {
        Self::new(IntWidth::I16)
    }
    pub fn i32() -> Self {
        Self::new(IntWidth::I32)
    }
    pub fn i64() -> Self {
        Self::new(IntWidth::I64)
    }

    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = Some(endian);
        self
    }

    pub fn without_endian(mut self) -> Self {
        self.endian = None;
        self
    }

    pub fn size(&self) -> usize {
        self.width.size()
    }

    pub fn default_value(&self) -> Value {
        Value::Int(0)
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        let v = value.as_int()?;
        if v < self.width.min() || v > self.width.max() {
            return Err(Error::ConstraintViolation);
        }
        Ok(())
    }

    pub fn pack_raw(&self, value: &Value, endian: Option<Endian>) -> Result<Vec<u8>> {
        self.pack_int_raw(value.as_int()?, endian)
    }

    pub fn pack_int_raw(&self, value: i128, endian: Option<Endian>) -> Result<Vec<u8>> {
        let size = self.width.size();
        let bits = (value as i64) as u64;
        if size == 1 {
            return Ok(vec![bits as u8]);
        }
        let eff = effective(self.endian, endian);
        let full = match eff {
            Endian::Little => bits.to_le_bytes(),
            Endian::Big => bits.to_be_bytes(),
        };
        Ok(match eff {
            Endian::Little => full[..size].to_vec(),
            Endian::Big => full[8 - size..].to_vec(),
        })
    }

    pub fn unpack_one<'a>(&self, buf: &'a [u8], endian: Option<Endian>) -> Result<(Value, &'a [u8])> {
        let size = self.width.size();
        if buf.len() < size {
            return Err(Error::MissingBytes { need: size - buf.len() });
        }
        let (head, tail) = buf.split_at(size);
        let eff = effective(self.endian, endian);
        let raw: u64 = if size == 1 {
            head[0] as u64
        } else {
            let mut full = [0u8; 8];
            match eff {
                Endian::Little => full[..size].copy_from_slice(head),
                Endian::Big => full[8 - size..].copy_from_slice(head),
            }
            match eff {
                Endian::Little => u64::from_le_bytes(full),
                Endian::Big => u64::from_be_bytes(full),
            }
        };
        let value = if self.width.is_signed() {
            sign_extend(raw, size)
        } else {
            raw as i128
        };
        Ok((Value::Int(value), tail))
    }
}

/// Sign-extend the low `size` bytes of `raw` to an `i128`.
pub(crate) fn sign_extend(raw: u64, size: usize) -> i128 {
    let bits = size * 8;
    if bits >= 64 {
        return raw as i64 as i128;
    }
    let mask = 1u64 << (bits - 1);
    if raw & mask != 0 {
        (raw as i128) - (1i128 << bits)
    } else {
        raw as i128
    }
}

/// The raw unsigned bit pattern of `value` truncated to `size` bytes.
pub(crate) fn to_unsigned_bits(value: i128, size: usize) -> u64 {
    let bits = (value as i64) as u64;
    if size >= 8 {
        bits
    } else {
        bits & ((1u64 << (size * 8)) - 1)
    }
}
