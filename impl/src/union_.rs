//! Union: several named members overlaid on the same byte buffer.
//!
//! [`UnionDesc`] is the stateless descriptor that satisfies the engine's
//! generic pack/unpack contract (so a union can nest inside a struct or
//! array like any other descriptor: packing takes exactly one active
//! member, unpacking eagerly decodes every member against the shared
//! bytes). [`UnionInstance`] is a stateful accessor on top of it, for
//! callers that want to read and write members one at a time without
//! repacking the whole union on every touch.

use std::rc::Rc;

use indexmap::IndexMap;
use log::{debug, trace};

use crate::descriptor::Descriptor;
use crate::endian::Endian;
use crate::error::{Error, Result};
use crate::value::Value;

/// Computes a union's total packed size from the bytes of whichever member
/// was just packed (or is being read).
pub type UnionSizePredicate = Rc<dyn Fn(&[u8]) -> Result<usize>>;

#[derive(Clone)]
pub struct UnionDesc {
    pub members: IndexMap<String, Rc<Descriptor>>,
    pub size_predicate: Option<UnionSizePredicate>,
}

impl std::fmt::Debug for UnionDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnionDesc")
            .field("members", &self.members)
            .field("size_predicate", &self.size_predicate.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl PartialEq for UnionDesc {
    fn eq(&self, other: &Self) -> bool {
        let members_eq = self.members.len() == other.members.len()
            && self.members.iter().all(|(k, v)| other.members.get(k) == Some(v));
        let pred_eq = match (&self.size_predicate, &other.size_predicate) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        members_eq && pred_eq
    }
}

impl UnionDesc {
    pub fn builder() -> UnionBuilder {
        UnionBuilder::new()
    }

    pub fn size(&self) -> Option<usize> {
        if self.size_predicate.is_some() {
            return None;
        }
        self.members.values().map(|d| d.size()).collect::<Option<Vec<_>>>()?.into_iter().max()
    }

    pub fn with_endian(&self, endian: Endian) -> Self {
        Self {
            members: self
                .members
                .iter()
                .map(|(k, v)| (k.clone(), Rc::new(v.with_endian(endian))))
                .collect(),
            size_predicate: self.size_predicate.clone(),
        }
    }

    pub fn without_endian(&self) -> Self {
        Self {
            members: self
                .members
                .iter()
                .map(|(k, v)| (k.clone(), Rc::new(v.without_endian())))
                .collect(),
            size_predicate: self.size_predicate.clone(),
        }
    }

    pub fn default_value(&self) -> Value {
        let mut map = IndexMap::new();
        if let Some((name, d)) = self.members.get_index(0) {
            map.insert(name.clone(), d.default_value());
        }
        Value::Map(map)
    }

    fn active_member(&self, value: &Value) -> Result<(&str, &Rc<Descriptor>, &Value)> {
        let map = value.as_map()?;
        if map.len() > 1 {
            return Err(Error::ConflictingMembers);
        }
        let (name, v) = map.iter().next().ok_or(Error::ConstraintViolation)?;
        let desc = self.members.get(name).ok_or_else(|| Error::UnknownMember(name.clone()))?;
        Ok((name, desc, v))
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        let (_, desc, v) = self.active_member(value)?;
        desc.validate(v)
    }

    /// `true` iff this union has no size predicate and at least one member
    /// lacking a fixed size: nothing pins down a total size, so packing
    /// emits the active member's bytes verbatim and unpacking consumes the
    /// whole remaining input.
    pub fn is_greedy(&self) -> bool {
        self.size_predicate.is_none() && self.size().is_none()
    }

    fn resolve_total_size(&self, packed: &[u8], pad_bytes: Option<&[u8]>) -> Result<(usize, Vec<u8>)> {
        match &self.size_predicate {
            None => {
                // Either every member is fixed-size (use the max), or at
                // least one is greedy and nothing else bounds the union -
                // the active member's own bytes are the whole of it.
                let total = self.size().unwrap_or(packed.len());
                Ok((total, packed.to_vec()))
            }
            Some(predicate) => {
                let mut buf = packed.to_vec();
                loop {
                    match predicate(&buf) {
                        Ok(n) => return Ok((n, buf)),
                        Err(Error::MissingBytes { need }) => {
                            debug!("union size predicate needs {} more byte(s), extending with pad", need);
                            extend_with_pad(&mut buf, need, pad_bytes);
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }
    }

    pub fn pack_raw(&self, value: &Value, endian: Option<Endian>) -> Result<Vec<u8>> {
        self.pack_with_pad(value, endian, None)
    }

    pub fn pack_with_pad(&self, value: &Value, endian: Option<Endian>, pad_bytes: Option<&[u8]>) -> Result<Vec<u8>> {
        let (_, desc, v) = self.active_member(value)?;
        let member_bytes = desc.pack_raw(v, endian)?;
        let (total, mut buf) = self.resolve_total_size(&member_bytes, pad_bytes)?;
        if buf.len() > total {
            return Err(Error::ConstraintViolation);
        }
        extend_with_pad(&mut buf, total - buf.len(), pad_bytes);
        Ok(buf)
    }

    pub fn unpack_one<'a>(&self, buf: &'a [u8], endian: Option<Endian>) -> Result<(Value, &'a [u8])> {
        let total = match &self.size_predicate {
            None => self.size().unwrap_or(buf.len()),
            Some(predicate) => predicate(buf)?,
        };
        if buf.len() < total {
            return Err(Error::MissingBytes { need: total - buf.len() });
        }
        let (slice, tail) = buf.split_at(total);
        let mut map = IndexMap::new();
        for (name, desc) in &self.members {
            let (v, _) = desc.unpack_one(slice, endian)?;
            map.insert(name.clone(), v);
        }
        Ok((Value::Map(map), tail))
    }
}

fn extend_with_pad(buf: &mut Vec<u8>, need: usize, pad_bytes: Option<&[u8]>) {
    match pad_bytes {
        Some(pad) if !pad.is_empty() => {
            for i in 0..need {
                buf.push(pad[i % pad.len()]);
            }
        }
        _ => buf.resize(buf.len() + need, 0),
    }
}

pub struct UnionBuilder {
    members: IndexMap<String, Rc<Descriptor>>,
    /// Anonymous members (§4.6: "lift their subkeys into the union's member
    /// namespace exactly as structs do"). Each must itself be a `Union`;
    /// its members are folded into `members` at build time, since a member
    /// lifted this way has exactly the same byte semantics as if it had
    /// been declared directly on the outer union.
    anonymous: Vec<Rc<Descriptor>>,
    size_predicate: Option<UnionSizePredicate>,
}

impl UnionBuilder {
    pub fn new() -> Self {
        Self {
            members: IndexMap::new(),
            anonymous: Vec::new(),
            size_predicate: None,
        }
    }

    pub fn member(mut self, name: &str, descriptor: Descriptor) -> Self {
        self.members.insert(name.to_string(), Rc::new(descriptor));
        self
    }

    /// Declare an anonymous member: `descriptor` must be a `Union`, and its
    /// own members become alternatives directly on this union (ISO
    /// C11-style lifting). An anonymous `Struct` member is not supported:
    /// a union pack call supplies exactly one active member's value, which
    /// cannot satisfy every field an anonymous struct would need at once.
    pub fn unnamed(mut self, descriptor: Descriptor) -> Self {
        self.anonymous.push(Rc::new(descriptor));
        self
    }

    pub fn size_by<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&[u8]) -> Result<usize> + 'static,
    {
        self.size_predicate = Some(Rc::new(predicate));
        self
    }

    pub fn build(mut self) -> Result<UnionDesc> {
        for anon in &self.anonymous {
            let inner = match anon.as_ref() {
                Descriptor::Union(u) => u,
                _ => {
                    return Err(Error::BuildError(
                        "an unnamed union member must itself be a Union".into(),
                    ))
                }
            };
            for (name, desc) in &inner.members {
                if self.members.contains_key(name) {
                    return Err(Error::BuildError(format!(
                        "duplicate member name `{}` (lifted from an unnamed member)",
                        name
                    )));
                }
                self.members.insert(name.clone(), desc.clone());
            }
        }
        if self.members.is_empty() {
            return Err(Error::BuildError("union must declare at least one member".into()));
        }
        for (name, desc) in &self.members {
            if matches!(desc.as_ref(), Descriptor::Pad(_)) {
                return Err(Error::BuildError(format!(
                    "union member `{}` cannot be a Pad slot",
                    name
                )));
            }
        }
        // A variable-size member with no size_by is accepted: the union
        // itself becomes greedy (see UnionDesc::is_greedy), consuming the
        // whole remaining input on unpack.
        Ok(UnionDesc {
            members: self.members,
            size_predicate: self.size_predicate,
        })
    }
}

impl Default for UnionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A stateful read/write accessor over one [`UnionDesc`] instance's bytes:
/// decoded members are cached until overwritten, writes are buffered until
/// [`flush`](Self::flush), and [`freeze`](Self::freeze) makes the instance
/// read-only.
pub struct UnionInstance {
    desc: Rc<UnionDesc>,
    buf: Vec<u8>,
    active: Option<String>,
    cache: Option<Value>,
    dirty: bool,
    frozen: bool,
    endian: Option<Endian>,
}

impl UnionInstance {
    pub fn new(desc: Rc<UnionDesc>, endian: Option<Endian>) -> Result<Self> {
        let size = desc.size().ok_or(Error::UnsupportedOperation(
            "a live union accessor needs a fixed total size",
        ))?;
        Ok(Self {
            desc,
            buf: vec![0u8; size],
            active: None,
            cache: None,
            dirty: false,
            frozen: false,
            endian,
        })
    }

    pub fn from_bytes(desc: Rc<UnionDesc>, bytes: Vec<u8>, endian: Option<Endian>) -> Result<Self> {
        let size = desc.size().ok_or(Error::UnsupportedOperation(
            "a live union accessor needs a fixed total size",
        ))?;
        if bytes.len() != size {
            return Err(Error::ConstraintViolation);
        }
        Ok(Self {
            desc,
            buf: bytes,
            active: None,
            cache: None,
            dirty: false,
            frozen: false,
            endian,
        })
    }

    pub fn get(&mut self, member: &str) -> Result<&Value> {
        if self.active.as_deref() != Some(member) || self.dirty {
            trace!("union cache miss for `{}`, decoding from backing bytes", member);
            self.flush()?;
            let desc = self
                .desc
                .members
                .get(member)
                .ok_or_else(|| Error::UnknownMember(member.to_string()))?;
            let (v, _) = desc.unpack_one(&self.buf, self.endian)?;
            self.cache = Some(v);
            self.active = Some(member.to_string());
            self.dirty = false;
        } else {
            trace!("union cache hit for `{}`", member);
        }
        Ok(self.cache.as_ref().unwrap())
    }

    pub fn set(&mut self, member: &str, value: Value) -> Result<()> {
        if self.frozen {
            return Err(Error::UnsupportedOperation("union is frozen"));
        }
        let desc = self
            .desc
            .members
            .get(member)
            .ok_or_else(|| Error::UnknownMember(member.to_string()))?;
        desc.validate(&value)?;
        self.active = Some(member.to_string());
        self.cache = Some(value);
        self.dirty = true;
        Ok(())
    }

    /// Write a pending [`set`](Self::set) into the backing buffer.
    pub fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if self.frozen {
            return Err(Error::UnsupportedOperation("union is frozen"));
        }
        let member = self.active.clone().expect("dirty implies an active member");
        let desc = self.desc.members.get(&member).expect("active member always exists");
        let value = self.cache.clone().expect("dirty implies a cached value");
        trace!("flushing union member `{}` into backing bytes", member);
        let packed = desc.pack_raw(&value, self.endian)?;
        // Only the member's own bytes are overwritten; the rest of `buf` is
        // left as-is, preserving the tail a smaller member doesn't reach
        // (a larger member read afterward depends on that tail surviving).
        self.buf[..packed.len()].copy_from_slice(&packed);
        self.dirty = false;
        Ok(())
    }

    pub fn freeze(&mut self) -> Result<()> {
        self.flush()?;
        self.frozen = true;
        Ok(())
    }

    pub fn raw(&mut self) -> Result<&[u8]> {
        self.flush()?;
        Ok(&self.buf)
    }

    pub fn into_raw(mut self) -> Result<Vec<u8>> {
        self.flush()?;
        Ok(self.buf)
    }
}
