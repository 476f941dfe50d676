//! Struct: an ordered sequence of named, unnamed, and padding slots, with
//! an optional trailing variable-length slot.

use std::rc::Rc;

use indexmap::IndexMap;
use log::debug;

use crate::descriptor::Descriptor;
use crate::endian::Endian;
use crate::error::{Error, Result};
use crate::value::Value;

/// Computes the byte length of a struct's trailing slot from the fields
/// decoded (or about to be packed) ahead of it.
pub type SizePredicate = Rc<dyn Fn(&IndexMap<String, Value>) -> Result<usize>>;

#[derive(Debug, Clone)]
pub enum StructSlot {
    /// A field exposed under `name` in the struct's `Value::Map`.
    Named(String, Rc<Descriptor>),
    /// An ISO C11-style anonymous member: `descriptor` is a `Struct` or
    /// `Union` whose own field/member names are lifted straight into this
    /// struct's namespace (no nesting in the unpacked map).
    Unnamed(Rc<Descriptor>),
    /// `n` bytes of filler, contributing no key to the map.
    Pad(Rc<Descriptor>),
}

impl StructSlot {
    fn descriptor(&self) -> &Descriptor {
        match self {
            StructSlot::Named(_, d) => d,
            StructSlot::Unnamed(d) => d,
            StructSlot::Pad(d) => d,
        }
    }
}

/// The field/member names an anonymous `Struct` or `Union` member lifts
/// into its enclosing namespace.
fn lifted_names(descriptor: &Descriptor) -> Result<Vec<String>> {
    match descriptor {
        Descriptor::Struct(s) => Ok(s.field_names()),
        Descriptor::Union(u) => Ok(u.members.keys().cloned().collect()),
        _ => Err(Error::BuildError(
            "an unnamed struct slot must be a Struct or Union (ISO C11 anonymous member)".into(),
        )),
    }
}

fn field_value<'a>(map: &'a IndexMap<String, Value>, name: &str) -> Result<&'a Value> {
    map.get(name).ok_or_else(|| Error::UnknownField(name.to_string()))
}

/// Pull out the sub-map an anonymous member's inner descriptor expects,
/// by copying its lifted keys out of the enclosing struct's own map.
fn lifted_submap(map: &IndexMap<String, Value>, names: &[String]) -> Result<IndexMap<String, Value>> {
    let mut sub = IndexMap::new();
    for name in names {
        sub.insert(name.clone(), field_value(map, name)?.clone());
    }
    Ok(sub)
}

fn pack_slot(slot: &StructSlot, map: &IndexMap<String, Value>, endian: Option<Endian>) -> Result<Vec<u8>> {
    match slot {
        StructSlot::Named(name, d) => d.pack_raw(field_value(map, name)?, endian),
        StructSlot::Unnamed(d) => {
            let names = lifted_names(d)?;
            d.pack_raw(&Value::Map(lifted_submap(map, &names)?), endian)
        }
        StructSlot::Pad(d) => d.pack_raw(&d.default_value(), endian),
    }
}

/// Unpack one slot, returning the `(name, value)` entries it contributes to
/// the parent map (zero for `Pad`, one for `Named`, possibly several for an
/// anonymous `Unnamed` member) alongside the unconsumed tail.
fn unpack_slot<'a>(
    slot: &StructSlot,
    buf: &'a [u8],
    endian: Option<Endian>,
) -> Result<(Vec<(String, Value)>, &'a [u8])> {
    match slot {
        StructSlot::Named(name, d) => {
            let (v, tail) = d.unpack_one(buf, endian)?;
            Ok((vec![(name.clone(), v)], tail))
        }
        StructSlot::Unnamed(d) => {
            let (v, tail) = d.unpack_one(buf, endian)?;
            let entries = v.as_map()?.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            Ok((entries, tail))
        }
        StructSlot::Pad(d) => {
            let (_, tail) = d.unpack_one(buf, endian)?;
            Ok((Vec::new(), tail))
        }
    }
}

#[derive(Clone)]
pub struct StructDesc {
    pub slots: Vec<StructSlot>,
    pub size_predicate: Option<SizePredicate>,
}

impl std::fmt::Debug for StructDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructDesc")
            .field("slots", &self.slots)
            .field("size_predicate", &self.size_predicate.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl PartialEq for StructDesc {
    fn eq(&self, other: &Self) -> bool {
        let slots_eq = self.slots.len() == other.slots.len()
            && self.slots.iter().zip(&other.slots).all(|(a, b)| match (a, b) {
                (StructSlot::Named(na, da), StructSlot::Named(nb, db)) => na == nb && da == db,
                (StructSlot::Unnamed(da), StructSlot::Unnamed(db)) => da == db,
                (StructSlot::Pad(da), StructSlot::Pad(db)) => da == db,
                _ => false,
            });
        let pred_eq = match (&self.size_predicate, &other.size_predicate) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        slots_eq && pred_eq
    }
}

impl StructDesc {
    pub fn builder() -> StructBuilder {
        StructBuilder::new()
    }

    /// The packed size in bytes, if every slot (including any trailing one)
    /// has a fixed size.
    pub fn size(&self) -> Option<usize> {
        if self.size_predicate.is_some() {
            return None;
        }
        let mut total = 0;
        for slot in &self.slots {
            total += slot.descriptor().size()?;
        }
        Some(total)
    }

    /// `true` iff the struct has no size predicate and its trailing slot is
    /// itself variable-size: unpacking then consumes all remaining input.
    pub fn is_greedy(&self) -> bool {
        if self.size_predicate.is_some() {
            return false;
        }
        matches!(self.slots.last(), Some(slot) if slot.descriptor().size().is_none())
    }

    /// The field/member names visible on this struct's unpacked map: its own
    /// named slots, plus every name an anonymous (`Unnamed`) member lifts.
    pub fn field_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for slot in &self.slots {
            match slot {
                StructSlot::Named(n, _) => names.push(n.clone()),
                StructSlot::Unnamed(d) => names.extend(lifted_names(d).unwrap_or_default()),
                StructSlot::Pad(_) => {}
            }
        }
        names
    }

    /// The fixed byte offset of the named (or lifted) field, if every slot
    /// ahead of it has a fixed size. `None` if the name is unknown or a
    /// variable-size (greedy or predicate-sized) slot precedes it.
    pub fn offsetof(&self, name: &str) -> Option<usize> {
        let mut offset = 0;
        for slot in &self.slots {
            if let StructSlot::Named(n, _) = slot {
                if n == name {
                    return Some(offset);
                }
            }
            if let StructSlot::Unnamed(d) = slot {
                match d.as_ref() {
                    Descriptor::Struct(inner) => {
                        if let Some(sub_offset) = inner.offsetof(name) {
                            return Some(offset + sub_offset);
                        }
                    }
                    Descriptor::Union(u) => {
                        if u.members.contains_key(name) {
                            return Some(offset);
                        }
                    }
                    _ => {}
                }
            }
            offset += slot.descriptor().size()?;
        }
        None
    }

    pub fn with_endian(&self, endian: Endian) -> Self {
        Self {
            slots: self
                .slots
                .iter()
                .map(|s| match s {
                    StructSlot::Named(n, d) => StructSlot::Named(n.clone(), Rc::new(d.with_endian(endian))),
                    StructSlot::Unnamed(d) => StructSlot::Unnamed(Rc::new(d.with_endian(endian))),
                    StructSlot::Pad(d) => StructSlot::Pad(d.clone()),
                })
                .collect(),
            size_predicate: self.size_predicate.clone(),
        }
    }

    pub fn without_endian(&self) -> Self {
        Self {
            slots: self
                .slots
                .iter()
                .map(|s| match s {
                    StructSlot::Named(n, d) => StructSlot::Named(n.clone(), Rc::new(d.without_endian())),
                    StructSlot::Unnamed(d) => StructSlot::Unnamed(Rc::new(d.without_endian())),
                    StructSlot::Pad(d) => StructSlot::Pad(d.clone()),
                })
                .collect(),
            size_predicate: self.size_predicate.clone(),
        }
    }

    pub fn default_value(&self) -> Value {
        let mut map = IndexMap::new();
        for slot in &self.slots {
            match slot {
                StructSlot::Named(name, d) => {
                    map.insert(name.clone(), d.default_value());
                }
                StructSlot::Unnamed(d) => {
                    if let Descriptor::Struct(inner) = d.as_ref() {
                        if let Value::Map(sub) = inner.default_value() {
                            map.extend(sub);
                        }
                    } else if let Descriptor::Union(_) = d.as_ref() {
                        if let Value::Map(sub) = d.default_value() {
                            map.extend(sub);
                        }
                    }
                }
                StructSlot::Pad(_) => {}
            }
        }
        Value::Map(map)
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        let map = value.as_map()?;
        for slot in &self.slots {
            match slot {
                StructSlot::Named(name, d) => d.validate(field_value(map, name)?)?,
                StructSlot::Unnamed(d) => {
                    let names = lifted_names(d)?;
                    d.validate(&Value::Map(lifted_submap(map, &names)?))?;
                }
                StructSlot::Pad(_) => {}
            }
        }
        Ok(())
    }

    pub fn pack_raw(&self, value: &Value, endian: Option<Endian>) -> Result<Vec<u8>> {
        let map = value.as_map()?;
        let mut out = Vec::new();
        let (head, tail_slot) = match self.slots.split_last() {
            Some((last, head)) => (head, Some(last)),
            None => (&self.slots[..], None),
        };
        for slot in head {
            out.extend(pack_slot(slot, map, endian)?);
        }
        if let Some(slot) = tail_slot {
            let mut packed = pack_slot(slot, map, endian)?;
            if let Some(predicate) = &self.size_predicate {
                // The predicate yields the struct's total byte length; what's
                // left over for the tail slot is that minus the head we've
                // already emitted.
                let total = predicate(map)?;
                let tail_expect = total
                    .checked_sub(out.len())
                    .ok_or(Error::ConstraintViolation)?;
                packed.resize(tail_expect, 0);
            }
            out.extend(packed);
        }
        Ok(out)
    }

    pub fn unpack_one<'a>(&self, buf: &'a [u8], endian: Option<Endian>) -> Result<(Value, &'a [u8])> {
        let mut rest = buf;
        let mut map = IndexMap::new();
        let (head, tail_slot) = match self.slots.split_last() {
            Some((last, head)) => (head, Some(last)),
            None => (&self.slots[..], None),
        };
        for slot in head {
            let (entries, tail) = unpack_slot(slot, rest, endian)?;
            rest = tail;
            map.extend(entries);
        }
        if let Some(slot) = tail_slot {
            let descriptor = slot.descriptor();
            let head_len = buf.len() - rest.len();
            let (entries, tail) = if descriptor.size().is_some() {
                unpack_slot(slot, rest, endian)?
            } else if let Some(predicate) = &self.size_predicate {
                let total = predicate(&map)?;
                let need = total.checked_sub(head_len).ok_or(Error::ConstraintViolation)?;
                debug!("struct trailing slot sized by predicate to {} byte(s)", need);
                if rest.len() < need {
                    return Err(Error::MissingBytes { need: need - rest.len() });
                }
                let (slice, outer_tail) = rest.split_at(need);
                let (entries, inner_tail) = unpack_slot(slot, slice, endian)?;
                if !inner_tail.is_empty() {
                    return Err(Error::ConstraintViolation);
                }
                (entries, outer_tail)
            } else {
                unpack_slot(slot, rest, endian)?
            };
            rest = tail;
            map.extend(entries);
        }
        Ok((Value::Map(map), rest))
    }
}

pub struct StructBuilder {
    slots: Vec<StructSlot>,
    size_predicate: Option<SizePredicate>,
}

impl StructBuilder {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            size_predicate: None,
        }
    }

    pub fn field(mut self, name: &str, descriptor: Descriptor) -> Self {
        self.slots.push(StructSlot::Named(name.to_string(), Rc::new(descriptor)));
        self
    }

    pub fn unnamed(mut self, descriptor: Descriptor) -> Self {
        self.slots.push(StructSlot::Unnamed(Rc::new(descriptor)));
        self
    }

    pub fn pad(mut self, size: usize) -> Self {
        self.slots.push(StructSlot::Pad(Rc::new(Descriptor::Pad(crate::pad::PadDesc::new(size)))));
        self
    }

    /// Size the trailing slot at unpack time using `predicate`, evaluated
    /// against the fields decoded (or about to be packed) ahead of it.
    pub fn size_by<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&IndexMap<String, Value>) -> Result<usize> + 'static,
    {
        self.size_predicate = Some(Rc::new(predicate));
        self
    }

    pub fn build(self) -> Result<StructDesc> {
        if self.size_predicate.is_some() {
            if let Some(last) = self.slots.last() {
                if last.descriptor().size().is_some() {
                    return Err(Error::BuildError(
                        "size_by is only meaningful for a trailing variable-length slot".into(),
                    ));
                }
            }
        }
        for (i, slot) in self.slots.iter().enumerate() {
            let is_last = i + 1 == self.slots.len();
            if !is_last && slot.descriptor().size().is_none() {
                return Err(Error::BuildError(
                    "only the last slot of a struct may have a variable size".into(),
                ));
            }
        }
        // Invariant 1: field names across named slots and every lifted
        // unnamed-member name must be unique.
        let mut seen = std::collections::HashSet::new();
        for slot in &self.slots {
            match slot {
                StructSlot::Named(name, _) => {
                    if !seen.insert(name.clone()) {
                        return Err(Error::BuildError(format!("duplicate field name `{}`", name)));
                    }
                }
                StructSlot::Unnamed(d) => {
                    for name in lifted_names(d)? {
                        if !seen.insert(name.clone()) {
                            return Err(Error::BuildError(format!(
                                "duplicate field name `{}` (lifted from an unnamed member)",
                                name
                            )));
                        }
                    }
                }
                StructSlot::Pad(_) => {}
            }
        }
        Ok(StructDesc {
            slots: self.slots,
            size_predicate: self.size_predicate,
        })
    }
}

impl Default for StructBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::int::IntDesc;
    use crate::string::StringDesc;

    fn header() -> StructDesc {
        StructDesc::builder()
            .field("version", Descriptor::Int(IntDesc::u8()))
            .field("len", Descriptor::Int(IntDesc::u8()))
            .build()
            .unwrap()
    }

    #[test]
    fn offsetof_reports_the_cumulative_fixed_offset() {
        let s = header();
        assert_eq!(s.offsetof("version"), Some(0));
        assert_eq!(s.offsetof("len"), Some(1));
        assert_eq!(s.offsetof("nonexistent"), None);

        let with_tail = StructDesc::builder()
            .field("a", Descriptor::Int(IntDesc::u8()))
            .field("body", Descriptor::String(StringDesc::greedy()))
            .build()
            .unwrap();
        assert_eq!(with_tail.offsetof("a"), Some(0));
        assert_eq!(with_tail.offsetof("body"), Some(1));
    }

    #[test]
    fn fixed_struct_round_trip() {
        let s = header();
        let mut map = IndexMap::new();
        map.insert("version".to_string(), Value::Int(1));
        map.insert("len".to_string(), Value::Int(5));
        let packed = s.pack_raw(&Value::Map(map.clone()), None).unwrap();
        assert_eq!(packed, vec![1, 5]);
        let (v, tail) = s.unpack_one(&packed, None).unwrap();
        assert_eq!(v, Value::Map(map));
        assert!(tail.is_empty());
    }

    #[test]
    fn pad_slot_is_absent_from_map_but_occupies_bytes() {
        let s = StructDesc::builder()
            .field("a", Descriptor::Int(IntDesc::u8()))
            .pad(1)
            .build()
            .unwrap();
        let mut map = IndexMap::new();
        map.insert("a".to_string(), Value::Int(9));
        let packed = s.pack_raw(&Value::Map(map), None).unwrap();
        assert_eq!(packed, vec![9, 0]);
        let (v, _) = s.unpack_one(&packed, None).unwrap();
        assert_eq!(v.as_map().unwrap().len(), 1);
    }

    #[test]
    fn deferred_sizing_uses_predicate_over_prior_field() {
        // predicate = offsetof(body) + len, i.e. the struct's total size.
        let s = StructDesc::builder()
            .field("len", Descriptor::Int(IntDesc::u8()))
            .field("body", Descriptor::String(StringDesc::greedy()))
            .size_by(|fields| Ok(1 + fields["len"].as_int()? as usize))
            .build()
            .unwrap();
        let mut map = IndexMap::new();
        map.insert("len".to_string(), Value::Int(3));
        map.insert("body".to_string(), Value::str("abc"));
        let packed = s.pack_raw(&Value::Map(map), None).unwrap();
        assert_eq!(packed, vec![3, b'a', b'b', b'c']);

        let rest = b"trailer".to_vec();
        let mut buf = packed.clone();
        buf.extend_from_slice(&rest);
        let (v, tail) = s.unpack_one(&buf, None).unwrap();
        let out = v.as_map().unwrap();
        assert_eq!(out["body"].as_bytes().unwrap(), b"abc");
        assert_eq!(tail, rest.as_slice());
    }

    #[test]
    fn predicate_longer_than_packed_tail_is_zero_padded() {
        let s = StructDesc::builder()
            .field("len", Descriptor::Int(IntDesc::u8()))
            .field("body", Descriptor::String(StringDesc::greedy()))
            .size_by(|fields| Ok(1 + fields["len"].as_int()? as usize))
            .build()
            .unwrap();
        let mut map = IndexMap::new();
        map.insert("len".to_string(), Value::Int(6));
        map.insert("body".to_string(), Value::str("ab"));
        let packed = s.pack_raw(&Value::Map(map), None).unwrap();
        assert_eq!(packed, vec![6, b'a', b'b', 0, 0, 0, 0]);
    }

    #[test]
    fn predicate_shorter_than_packed_tail_truncates() {
        let s = StructDesc::builder()
            .field("len", Descriptor::Int(IntDesc::u8()))
            .field("body", Descriptor::String(StringDesc::greedy()))
            .size_by(|fields| Ok(1 + fields["len"].as_int()? as usize))
            .build()
            .unwrap();
        let mut map = IndexMap::new();
        map.insert("len".to_string(), Value::Int(2));
        map.insert("body".to_string(), Value::str("abcdef"));
        let packed = s.pack_raw(&Value::Map(map), None).unwrap();
        assert_eq!(packed, vec![2, b'a', b'b']);
    }

    #[test]
    fn tlv_packet_pack_and_unpack_match_the_literal_scenario() {
        let kind = crate::enum_::EnumDesc::builder(IntDesc::u8())
            .sym("invalid")
            .sym("hello")
            .sym("read")
            .sym("write")
            .sym("goodbye")
            .build()
            .unwrap();
        let s = StructDesc::builder()
            .field("type", Descriptor::Enum(kind))
            .field("len", Descriptor::Int(IntDesc::u32().with_endian(crate::Endian::Big)))
            .field("value", Descriptor::String(StringDesc::greedy()))
            .size_by(|fields| Ok(5 + fields["len"].as_int()? as usize))
            .build()
            .unwrap();
        let mut map = IndexMap::new();
        map.insert("type".to_string(), Value::symbol("hello"));
        map.insert("len".to_string(), Value::Int(4));
        map.insert("value".to_string(), Value::str("v1.0"));
        let packed = s.pack_raw(&Value::Map(map.clone()), None).unwrap();
        assert_eq!(packed, vec![0x01, 0x00, 0x00, 0x00, 0x04, b'v', b'1', b'.', b'0']);
        let (v, tail) = s.unpack_one(&packed, None).unwrap();
        assert_eq!(v, Value::Map(map));
        assert!(tail.is_empty());
    }

    #[test]
    fn non_trailing_variable_size_slot_rejected_at_build() {
        let built = StructDesc::builder()
            .field("body", Descriptor::String(StringDesc::greedy()))
            .field("version", Descriptor::Int(IntDesc::u8()))
            .build();
        assert!(built.is_err());
    }

    fn point() -> Descriptor {
        Descriptor::Struct(
            StructDesc::builder()
                .field("x", Descriptor::Int(IntDesc::u8()))
                .field("y", Descriptor::Int(IntDesc::u8()))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn anonymous_struct_member_lifts_its_fields_into_the_parent_map() {
        let s = StructDesc::builder()
            .field("tag", Descriptor::Int(IntDesc::u8()))
            .unnamed(point())
            .build()
            .unwrap();
        let mut map = IndexMap::new();
        map.insert("tag".to_string(), Value::Int(1));
        map.insert("x".to_string(), Value::Int(2));
        map.insert("y".to_string(), Value::Int(3));
        let packed = s.pack_raw(&Value::Map(map.clone()), None).unwrap();
        assert_eq!(packed, vec![1, 2, 3]);
        let (v, tail) = s.unpack_one(&packed, None).unwrap();
        assert_eq!(v, Value::Map(map));
        assert!(tail.is_empty());
    }

    #[test]
    fn anonymous_union_member_lifts_its_members_as_alternatives() {
        let number = Descriptor::Union(
            crate::union_::UnionDesc::builder()
                .member("as_u16", Descriptor::Int(IntDesc::u16().with_endian(crate::Endian::Little)))
                .member(
                    "as_bytes",
                    Descriptor::Array(crate::array::ArrayDesc::fixed(Descriptor::Int(IntDesc::u8()), 2).unwrap()),
                )
                .build()
                .unwrap(),
        );
        let s = StructDesc::builder()
            .field("tag", Descriptor::Int(IntDesc::u8()))
            .unnamed(number)
            .build()
            .unwrap();
        let mut map = IndexMap::new();
        map.insert("tag".to_string(), Value::Int(9));
        map.insert("as_u16".to_string(), Value::Int(0x0102));
        let packed = s.pack_raw(&Value::Map(map), None).unwrap();
        assert_eq!(packed, vec![9, 0x02, 0x01]);
        let (v, _) = s.unpack_one(&packed, None).unwrap();
        let out = v.as_map().unwrap();
        assert_eq!(out["as_u16"], Value::Int(0x0102));
        assert_eq!(
            out["as_bytes"],
            Value::List(vec![Value::Int(0x02), Value::Int(0x01)])
        );
    }

    #[test]
    fn offsetof_reaches_into_an_anonymous_struct_member() {
        let s = StructDesc::builder()
            .field("tag", Descriptor::Int(IntDesc::u8()))
            .unnamed(point())
            .build()
            .unwrap();
        assert_eq!(s.offsetof("tag"), Some(0));
        assert_eq!(s.offsetof("x"), Some(1));
        assert_eq!(s.offsetof("y"), Some(2));
    }

    #[test]
    fn duplicate_name_between_named_and_lifted_field_rejected_at_build() {
        let built = StructDesc::builder()
            .field("x", Descriptor::Int(IntDesc::u8()))
            .unnamed(point())
            .build();
        assert!(built.is_err());
    }

    #[test]
    fn unnamed_slot_must_be_struct_or_union() {
        let built = StructDesc::builder().unnamed(Descriptor::Int(IntDesc::u8())).build();
        assert!(built.is_err());
    }
}
