//! Array: a homogeneous run of elements, bounded by a fixed count, by the
//! end of the input, or by a sentinel element value.

use std::rc::Rc;

use crate::descriptor::Descriptor;
use crate::endian::Endian;
use crate::error::{Error, Result};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum ArrayMode {
    /// Exactly `n` elements.
    Fixed(usize),
    /// As many elements as the remaining input (or given list) holds.
    Greedy,
    /// Elements up to, but not including, the first one equal to the given
    /// sentinel value. The sentinel itself is packed/consumed but not
    /// reported in the unpacked list.
    Terminated(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayDesc {
    pub element: Rc<Descriptor>,
    pub mode: ArrayMode,
}

/// A variable-size [`Descriptor::Union`] has no way to know, mid-sequence,
/// where one element ends and the next begins.
fn reject_variable_union(element: &Descriptor) -> Result<()> {
    if let Descriptor::Union(u) = element {
        if u.size().is_none() {
            return Err(Error::BuildError(
                "an array element may not be a variable-size union".into(),
            ));
        }
    }
    Ok(())
}

impl ArrayDesc {
    pub fn fixed(element: Descriptor, count: usize) -> Result<Self> {
        reject_variable_union(&element)?;
        Ok(Self {
            element: Rc::new(element),
            mode: ArrayMode::Fixed(count),
        })
    }

    pub fn greedy(element: Descriptor) -> Result<Self> {
        reject_variable_union(&element)?;
        Ok(Self {
            element: Rc::new(element),
            mode: ArrayMode::Greedy,
        })
    }

    pub fn terminated(element: Descriptor, sentinel: Value) -> Result<Self> {
        reject_variable_union(&element)?;
        Ok(Self {
            element: Rc::new(element),
            mode: ArrayMode::Terminated(sentinel),
        })
    }

    /// The packed size in bytes, if every element has a fixed size and the
    /// array itself has a fixed element count.
    pub fn size(&self) -> Option<usize> {
        match &self.mode {
            ArrayMode::Fixed(n) => self.element.size().map(|s| s * n),
            ArrayMode::Greedy => None,
            ArrayMode::Terminated(_) => None,
        }
    }

    pub fn default_value(&self) -> Value {
        match &self.mode {
            ArrayMode::Fixed(n) => Value::List(vec![self.element.default_value(); *n]),
            ArrayMode::Greedy | ArrayMode::Terminated(_) => Value::List(Vec::new()),
        }
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        let list = value.as_list()?;
        if let ArrayMode::Fixed(n) = &self.mode {
            // Short lists are right-padded with the element's default at
            // pack time; only an overlong list is a shape violation.
            if list.len() > *n {
                return Err(Error::ConstraintViolation);
            }
        }
        for elem in list {
            self.element.validate(elem)?;
        }
        Ok(())
    }

    pub fn pack_raw(&self, value: &Value, endian: Option<Endian>) -> Result<Vec<u8>> {
        let list = value.as_list()?;
        let mut out = Vec::new();
        for elem in list {
            out.extend(self.element.pack_raw(elem, endian)?);
        }
        if let ArrayMode::Fixed(n) = &self.mode {
            for _ in list.len()..*n {
                out.extend(self.element.pack_raw(&self.element.default_value(), endian)?);
            }
        }
        if let ArrayMode::Terminated(sentinel) = &self.mode {
            out.extend(self.element.pack_raw(sentinel, endian)?);
        }
        Ok(out)
    }

    /// `true` iff this array consumes all remaining input when unpacked
    /// (greedy mode, with no terminator or fixed count of its own).
    pub fn is_greedy(&self) -> bool {
        matches!(self.mode, ArrayMode::Greedy)
    }

    pub fn unpack_one<'a>(&self, buf: &'a [u8], endian: Option<Endian>) -> Result<(Value, &'a [u8])> {
        let mut rest = buf;
        let mut out = Vec::new();
        match &self.mode {
            ArrayMode::Fixed(n) => {
                for _ in 0..*n {
                    let (v, tail) = self.element.unpack_one(rest, endian)?;
                    out.push(v);
                    rest = tail;
                }
            }
            ArrayMode::Greedy => {
                while !rest.is_empty() {
                    let (v, tail) = self.element.unpack_one(rest, endian)?;
                    out.push(v);
                    rest = tail;
                }
            }
            ArrayMode::Terminated(sentinel) => loop {
                if rest.is_empty() {
                    return Err(Error::TerminatorNotFound);
                }
                let (v, tail) = self.element.unpack_one(rest, endian)?;
                rest = tail;
                if &v == sentinel {
                    break;
                }
                out.push(v);
            },
        }
        Ok((Value::List(out), rest))
    }
}
