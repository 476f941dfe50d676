//! [`Descriptor`]: the closed sum of every layout kind this crate knows how
//! to pack and unpack, and the engine-level dispatch over it.

use crate::array::ArrayDesc;
use crate::bitfield::BitfieldDesc;
use crate::bitmap::BitmapDesc;
use crate::enum_::EnumDesc;
use crate::error::{Error, Result};
use crate::int::IntDesc;
use crate::pad::PadDesc;
use crate::string::StringDesc;
use crate::struct_::StructDesc;
use crate::terminated::TerminatedDesc;
use crate::union_::UnionDesc;
use crate::value::Value;
use crate::Endian;

/// Any one binary layout this crate can describe.
#[derive(Debug, Clone, PartialEq)]
pub enum Descriptor {
    Int(IntDesc),
    Enum(EnumDesc),
    Bitmap(BitmapDesc),
    Bitfield(BitfieldDesc),
    String(StringDesc),
    Pad(PadDesc),
    Terminated(TerminatedDesc),
    Array(ArrayDesc),
    Struct(StructDesc),
    Union(UnionDesc),
}

impl Descriptor {
    /// The packed size in bytes, if this descriptor (and everything it
    /// contains) has one fixed regardless of the value being packed.
    pub fn size(&self) -> Option<usize> {
        match self {
            Descriptor::Int(d) => Some(d.size()),
            Descriptor::Enum(d) => Some(d.size()),
            Descriptor::Bitmap(d) => Some(d.size()),
            Descriptor::Bitfield(d) => Some(d.size()),
            Descriptor::String(d) => d.size(),
            Descriptor::Pad(d) => Some(d.size),
            Descriptor::Terminated(_) => None,
            Descriptor::Array(d) => d.size(),
            Descriptor::Struct(d) => d.size(),
            Descriptor::Union(d) => d.size(),
        }
    }

    pub fn default_value(&self) -> Value {
        match self {
            Descriptor::Int(d) => d.default_value(),
            Descriptor::Enum(d) => d.default_value(),
            Descriptor::Bitmap(d) => d.default_value(),
            Descriptor::Bitfield(d) => d.default_value(),
            Descriptor::String(d) => d.default_value(),
            Descriptor::Pad(d) => d.default_value(),
            Descriptor::Terminated(d) => d.default_value(),
            Descriptor::Array(d) => d.default_value(),
            Descriptor::Struct(d) => d.default_value(),
            Descriptor::Union(d) => d.default_value(),
        }
    }

    /// Bind (or rebind) the endian every contained integer codec packs and
    /// unpacks with, unless that codec already fixes its own. Idempotent:
    /// calling this twice with the same endian yields an equal descriptor.
    pub fn with_endian(&self, endian: Endian) -> Self {
        match self {
            Descriptor::Int(d) => Descriptor::Int(d.with_endian(endian)),
            Descriptor::Enum(d) => Descriptor::Enum(d.with_endian(endian)),
            Descriptor::Bitmap(d) => Descriptor::Bitmap(d.with_endian(endian)),
            Descriptor::Bitfield(d) => Descriptor::Bitfield(d.with_endian(endian)),
            Descriptor::String(d) => Descriptor::String(d.clone()),
            Descriptor::Pad(d) => Descriptor::Pad(*d),
            Descriptor::Terminated(d) => Descriptor::Terminated(d.with_endian(endian)),
            Descriptor::Array(d) => Descriptor::Array(ArrayDesc {
                element: std::rc::Rc::new(d.element.with_endian(endian)),
                mode: d.mode.clone(),
            }),
            Descriptor::Struct(d) => Descriptor::Struct(d.with_endian(endian)),
            Descriptor::Union(d) => Descriptor::Union(d.with_endian(endian)),
        }
    }

    pub fn without_endian(&self) -> Self {
        match self {
            Descriptor::Int(d) => Descriptor::Int(d.without_endian()),
            Descriptor::Enum(d) => Descriptor::Enum(d.without_endian()),
            Descriptor::Bitmap(d) => Descriptor::Bitmap(d.without_endian()),
            Descriptor::Bitfield(d) => Descriptor::Bitfield(d.without_endian()),
            Descriptor::String(d) => Descriptor::String(d.clone()),
            Descriptor::Pad(d) => Descriptor::Pad(*d),
            Descriptor::Terminated(d) => Descriptor::Terminated(d.without_endian()),
            Descriptor::Array(d) => Descriptor::Array(ArrayDesc {
                element: std::rc::Rc::new(d.element.without_endian()),
                mode: d.mode.clone(),
            }),
            Descriptor::Struct(d) => Descriptor::Struct(d.without_endian()),
            Descriptor::Union(d) => Descriptor::Union(d.without_endian()),
        }
    }

    /// Check `value` against this descriptor's full shape and range
    /// constraints, recursively, without emitting any bytes. Called exactly
    /// once, at the top of [`pack`](Self::pack); nested descriptors are
    /// never re-validated once their parent's `pack` has validated the
    /// whole tree.
    pub fn validate(&self, value: &Value) -> Result<()> {
        match self {
            Descriptor::Int(d) => d.validate(value),
            Descriptor::Enum(d) => d.validate(value),
            Descriptor::Bitmap(d) => d.validate(value),
            Descriptor::Bitfield(d) => d.validate(value),
            Descriptor::String(d) => d.validate(value),
            Descriptor::Pad(d) => d.validate(value),
            Descriptor::Terminated(d) => d.validate(value),
            Descriptor::Array(d) => d.validate(value),
            Descriptor::Struct(d) => d.validate(value),
            Descriptor::Union(d) => d.validate(value),
        }
    }

    /// Emit `value`'s bytes assuming it has already been validated. Used for
    /// every nested/recursive pack call; never re-validates.
    pub fn pack_raw(&self, value: &Value, endian: Option<Endian>) -> Result<Vec<u8>> {
        match self {
            Descriptor::Int(d) => d.pack_raw(value, endian),
            Descriptor::Enum(d) => d.pack_raw(value, endian),
            Descriptor::Bitmap(d) => d.pack_raw(value, endian),
            Descriptor::Bitfield(d) => d.pack_raw(value, endian),
            Descriptor::String(d) => d.pack_raw(value),
            Descriptor::Pad(d) => d.pack_raw(value),
            Descriptor::Terminated(d) => d.pack_raw(value, endian),
            Descriptor::Array(d) => d.pack_raw(value, endian),
            Descriptor::Struct(d) => d.pack_raw(value, endian),
            Descriptor::Union(d) => d.pack_raw(value, endian),
        }
    }

    pub fn unpack_one<'a>(&self, buf: &'a [u8], endian: Option<Endian>) -> Result<(Value, &'a [u8])> {
        match self {
            Descriptor::Int(d) => d.unpack_one(buf, endian),
            Descriptor::Enum(d) => d.unpack_one(buf, endian),
            Descriptor::Bitmap(d) => d.unpack_one(buf, endian),
            Descriptor::Bitfield(d) => d.unpack_one(buf, endian),
            Descriptor::String(d) => d.unpack_one(buf),
            Descriptor::Pad(d) => d.unpack_one(buf),
            Descriptor::Terminated(d) => d.unpack_one(buf, endian),
            Descriptor::Array(d) => d.unpack_one(buf, endian),
            Descriptor::Struct(d) => d.unpack_one(buf, endian),
            Descriptor::Union(d) => d.unpack_one(buf, endian),
        }
    }

    /// Validate, then pack `value`, using the process default endian for any
    /// codec that fixes neither its own nor is told one explicitly.
    pub fn pack(&self, value: &Value) -> Result<Vec<u8>> {
        self.pack_with_endian(value, None)
    }

    pub fn pack_with_endian(&self, value: &Value, endian: Option<Endian>) -> Result<Vec<u8>> {
        self.validate(value)?;
        self.pack_raw(value, endian)
    }

    /// Unpack one value from the front of `buf`, discarding whatever bytes
    /// remain. An alias for `unpack_one(buf, endian).0`.
    pub fn unpack(&self, buf: &[u8]) -> Result<Value> {
        self.unpack_with_endian(buf, None)
    }

    pub fn unpack_with_endian(&self, buf: &[u8], endian: Option<Endian>) -> Result<Value> {
        let (value, _tail) = self.unpack_one(buf, endian)?;
        Ok(value)
    }

    /// Unpack one value from the front of `buf`, returning whatever bytes
    /// remain.
    pub fn unpack_from<'a>(&self, buf: &'a [u8]) -> Result<(Value, &'a [u8])> {
        self.unpack_one(buf, None)
    }

    /// Repeatedly unpack values from `buf` until it is empty.
    ///
    /// A descriptor whose unpack leaves a non-empty remainder that it can
    /// never finish consuming (e.g. trailing bytes short of one more
    /// element) surfaces that element's own error rather than succeeding
    /// with a partial list.
    pub fn unpack_all(&self, buf: &[u8], endian: Option<Endian>) -> Result<Vec<Value>> {
        let mut out = Vec::new();
        let mut rest = buf;
        while !rest.is_empty() {
            let (value, tail) = self.unpack_one(rest, endian)?;
            if tail.len() == rest.len() {
                // Nothing consumed; looping would never terminate.
                return Err(Error::MissingBytes { need: 1 });
            }
            out.push(value);
            rest = tail;
        }
        Ok(out)
    }

    /// `true` iff [`size`](Self::size) is known a priori (the same value
    /// for every input).
    pub fn is_fixed_size(&self) -> bool {
        self.size().is_some()
    }

    /// `true` iff this descriptor consumes all remaining input when
    /// unpacked at the tail of a buffer (no internal terminator or size
    /// predicate of its own).
    pub fn is_greedy(&self) -> bool {
        match self {
            Descriptor::Int(_)
            | Descriptor::Enum(_)
            | Descriptor::Bitmap(_)
            | Descriptor::Bitfield(_)
            | Descriptor::Pad(_)
            | Descriptor::Terminated(_) => false,
            Descriptor::String(d) => d.size().is_none(),
            Descriptor::Array(d) => d.is_greedy(),
            Descriptor::Struct(d) => d.is_greedy(),
            Descriptor::Union(d) => d.is_greedy(),
        }
    }

    /// Read this descriptor's value from `io`; only valid for fixed-size
    /// descriptors, since otherwise there is no way to know how many bytes
    /// to read without consuming the whole stream.
    pub fn read<R: std::io::Read>(&self, reader: &mut R, endian: Option<Endian>) -> Result<Value> {
        let size = self
            .size()
            .ok_or(Error::UnsupportedOperation("read is only supported for fixed-size descriptors"))?;
        let mut bytes = vec![0u8; size];
        reader.read_exact(&mut bytes)?;
        self.unpack_with_endian(&bytes, endian)
    }

    /// Identical to [`read`](Self::read) but positional: seeks to `offset`
    /// first. Only valid for fixed-size descriptors.
    pub fn pread<R: std::io::Read + std::io::Seek>(
        &self,
        reader: &mut R,
        offset: u64,
        endian: Option<Endian>,
    ) -> Result<Value> {
        let size = self
            .size()
            .ok_or(Error::UnsupportedOperation("pread is only supported for fixed-size descriptors"))?;
        reader.seek(std::io::SeekFrom::Start(offset))?;
        let mut bytes = vec![0u8; size];
        reader.read_exact(&mut bytes)?;
        self.unpack_with_endian(&bytes, endian)
    }
}
