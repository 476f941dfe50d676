//! Bitfield: packed sub-integer fields over an integer codec.

use crate::endian::Endian;
use crate::error::{Error, Result};
use crate::int::IntDesc;
use crate::value::Value;
use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitfieldField {
    pub offset: u32,
    pub width: u32,
    pub signed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BitfieldDesc {
    pub underlying: IntDesc,
    pub fields: IndexMap<String, BitfieldField>,
}

impl BitfieldDesc {
    pub fn builder(underlying: IntDesc) -> BitfieldBuilder {
        BitfieldBuilder::new(underlying)
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
        let mut map = IndexMap::new();
        for name in self.fields.keys() {
            map.insert(name.clone(), Value::Int(0));
        }
        Value::Map(map)
    }

    fn field_range(&self, field: &BitfieldField) -> (i128, i128) {
        if field.signed {
            let half = 1i128 << (field.width - 1);
            (-half, half - 1)
        } else {
            (0, (1i128 << field.width) - 1)
        }
    }

    fn resolve(&self, value: &Value) -> Result<i128> {
        let map = value.as_map()?;
        let mut bits: u64 = 0;
        for (name, field) in &self.fields {
            let v = map
                .get(name)
                .ok_or_else(|| Error::UnknownField(name.clone()))?
                .as_int()?;
            let (lo, hi) = self.field_range(field);
            if v < lo || v > hi {
                return Err(Error::ConstraintViolation);
            }
            let mask = mask_for(field.width);
            bits |= (to_bits(v, field.width) & mask) << field.offset;
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
        let mut map = IndexMap::new();
        for (name, field) in &self.fields {
            let mask = mask_for(field.width);
            let raw_field = (bits >> field.offset) & mask;
            let v = if field.signed {
                sign_extend_bits(raw_field, field.width)
            } else {
                raw_field as i128
            };
            map.insert(name.clone(), Value::Int(v));
        }
        Ok((Value::Map(map), tail))
    }
}

fn mask_for(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

fn to_bits(value: i128, width: u32) -> u64 {
    (value as i64 as u64) & mask_for(width)
}

/// Sign-extend the low `width` bits of `bits` to an `i128`.
pub(crate) fn sign_extend_bits(bits: u64, width: u32) -> i128 {
    if width == 0 {
        return 0;
    }
    let sign_bit = 1u64 << (width - 1);
    if bits & sign_bit != 0 {
        (bits as i128) - (1i128 << width)
    } else {
        bits as i128
    }
}

pub struct BitfieldBuilder {
    underlying: IntDesc,
    fields: IndexMap<String, BitfieldField>,
    cursor: u32,
    style: Option<BuilderStyle>,
}

#[derive(PartialEq)]
enum BuilderStyle {
    Sequential,
    Explicit,
}

impl BitfieldBuilder {
    pub fn new(underlying: IntDesc) -> Self {
        Self {
            underlying,
            fields: IndexMap::new(),
            cursor: 0,
            style: None,
        }
    }

    /// Append an unsigned field of `width` bits directly after the previous
    /// one. Cannot be mixed with [`field_at`](Self::field_at).
    pub fn field(self, name: &str, width: u32) -> Self {
        self.field_signed(name, width, false)
    }

    pub fn field_signed(mut self, name: &str, width: u32, signed: bool) -> Self {
        assert!(
            self.style != Some(BuilderStyle::Explicit),
            "cannot mix sequential and explicit bitfield authoring styles"
        );
        self.style = Some(BuilderStyle::Sequential);
        let offset = self.cursor;
        self.fields.insert(
            name.to_string(),
            BitfieldField { offset, width, signed },
        );
        self.cursor += width;
        self
    }

    /// Place a field at an explicit bit offset. Cannot be mixed with
    /// [`field`](Self::field)/[`field_signed`](Self::field_signed).
    pub fn field_at(mut self, name: &str, offset: u32, width: u32, signed: bool) -> Self {
        assert!(
            self.style != Some(BuilderStyle::Sequential),
            "cannot mix sequential and explicit bitfield authoring styles"
        );
        self.style = Some(BuilderStyle::Explicit);
        self.fields.insert(
            name.to_string(),
            BitfieldField { offset, width, signed },
        );
        self
    }

    pub fn build(self) -> Result<BitfieldDesc> {
        let total_bits = (self.underlying.size() * 8) as u32;
        for (name, field) in &self.fields {
            if field.width == 0 || field.offset + field.width > total_bits {
                return Err(Error::BuildError(format!(
                    "bitfield field `{}` (offset {}, width {}) does not fit in the underlying integer type",
                    name, field.offset, field.width
                )));
            }
        }
        let mut spans: Vec<(&str, u32, u32)> =
            self.fields.iter().map(|(n, f)| (n.as_str(), f.offset, f.offset + f.width)).collect();
        spans.sort_by_key(|(_, offset, _)| *offset);
        for pair in spans.windows(2) {
            let (prev_name, _, prev_end) = pair[0];
            let (name, offset, _) = pair[1];
            if offset < prev_end {
                return Err(Error::BuildError(format!(
                    "bitfield field `{}` overlaps field `{}`",
                    name, prev_name
                )));
            }
        }
        Ok(BitfieldDesc {
            underlying: self.underlying,
            fields: self.fields,
        })
    }
}
