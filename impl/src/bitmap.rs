//! Bitmap: a set of named single-bit flags over an integer codec.

use std::convert::TryFrom;

use crate::endian::Endian;
use crate::error::{Error, Result};
use crate::int::IntDesc;
use crate::value::Value;
use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq)]
pub struct BitmapDesc {
    pub underlying: IntDesc,
    pub flags: IndexMap<String, u32>,
    pub permissive: bool,
}

/// Parses a bit position out of a synthetic `bit_<n>` name.
fn parse_bit_n(name: &str) -> Option<u32> {
    name.strip_prefix("bit_")?.parse().ok()
}

impl BitmapDesc {
    pub fn builder(underlying: IntDesc) -> BitmapBuilder {
        BitmapBuilder::new(underlying)
    }

    pub fn size(&self) -> usize {
        self.underlying.size()
    }

    pub fn with_endian(&self, endian: Endian) -> Self {
        Self {
            underlying: self.underlying.with_endian(endian),
            ..self.clone()
        }
    }

    pub fn without_endian(&self) -> Self {
        Self {
            underlying: self.underlying.without_endian(),
            ..self.clone()
        }
    }

    pub fn default_value(&self) -> Value {
        Value::List(Vec::new())
    }

    /// Accept and emit synthetic `bit_<n>` names for positions this bitmap
    /// never declared.
    pub fn permissive(&self) -> Self {
        Self {
            permissive: true,
            ..self.clone()
        }
    }

    /// Resolve one name to a bit position: a declared flag name, a
    /// `bit_<n>` synthetic name, or a bare integer index. The result
    /// always satisfies `0 <= bit < size*8` (§4.3); out-of-range positions
    /// are surfaced as `ConstraintViolation`, never left to overflow a
    /// later shift.
    fn bit_of(&self, name: &Value) -> Result<u32> {
        let bit = match name {
            Value::Int(i) => u32::try_from(*i).map_err(|_| Error::ConstraintViolation)?,
            Value::Symbol(s) => {
                if let Some(bit) = self.flags.get(s.as_str()) {
                    *bit
                } else if let Some(bit) = parse_bit_n(s) {
                    bit
                } else {
                    return Err(Error::UnknownKey(s.clone()));
                }
            }
            _ => return Err(Error::ConstraintViolation),
        };
        if bit >= (self.underlying.size() * 8) as u32 {
            return Err(Error::ConstraintViolation);
        }
        Ok(bit)
    }

    fn resolve(&self, value: &Value) -> Result<i128> {
        let names = value.as_list()?;
        let mut bits: u64 = 0;
        for name in names {
            bits |= 1u64 << self.bit_of(name)?;
        }
        Ok(bits as i128)
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        let v = self.resolve(value)?;
        self.underlying.validate(&Value::Int(v))
    }

    pub fn pack_raw(&self, value: &Value, endian: Option<Endian>) -> Result<Vec<u8>> {
        let v = self.resolve(value)?;
        self.underlying.pack_int_raw(v, endian)
    }

    pub fn unpack_one<'a>(&self, buf: &'a [u8], endian: Option<Endian>) -> Result<(Value, &'a [u8])> {
        let (raw, tail) = self.underlying.unpack_one(buf, endian)?;
        let bits = crate::int::to_unsigned_bits(raw.as_int()?, self.underlying.size());
        let by_bit: IndexMap<u32, &String> = self.flags.iter().map(|(n, b)| (*b, n)).collect();
        let mut set = Vec::new();
        for bit in 0..(self.underlying.size() * 8) as u32 {
            if bits & (1u64 << bit) == 0 {
                continue;
            }
            match by_bit.get(&bit) {
                Some(name) => set.push(Value::Symbol((*name).clone())),
                None if self.permissive => set.push(Value::Symbol(format!("bit_{}", bit))),
                None => return Err(Error::ConstraintViolation),
            }
        }
        Ok((Value::List(set), tail))
    }
}

pub struct BitmapBuilder {
    underlying: IntDesc,
    flags: IndexMap<String, u32>,
}

impl BitmapBuilder {
    pub fn new(underlying: IntDesc) -> Self {
        Self {
            underlying,
            flags: IndexMap::new(),
        }
    }

    /// Declare `name` as the flag occupying bit `bit` (0 = least significant).
    pub fn flag(mut self, name: &str, bit: u32) -> Self {
        self.flags.insert(name.to_string(), bit);
        self
    }

    pub fn build(self) -> Result<BitmapDesc> {
        let width_bits = (self.underlying.size() * 8) as u32;
        for (name, bit) in &self.flags {
            if *bit >= width_bits {
                return Err(Error::BuildError(format!(
                    "bitmap flag `{}` at bit {} does not fit in the underlying integer type",
                    name, bit
                )));
            }
        }
        Ok(BitmapDesc {
            underlying: self.underlying,
            flags: self.flags,
            permissive: false,
        })
    }
}
