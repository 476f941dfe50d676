//! Terminated: an inner descriptor closed off by a fixed terminator,
//! located by scanning rather than by a declared length (e.g. C strings).

use std::rc::Rc;

use crate::descriptor::Descriptor;
use crate::endian::Endian;
use crate::error::{Error, Result};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct TerminatedDesc {
    pub inner: Rc<Descriptor>,
    pub terminator: Vec<u8>,
}

impl TerminatedDesc {
    pub fn new(inner: Descriptor, terminator: Vec<u8>) -> Self {
        Self {
            inner: Rc::new(inner),
            terminator,
        }
    }

    /// The classic C string: a greedy, non-trimming byte string terminated
    /// by a single NUL.
    pub fn nul() -> Self {
        Self::new(
            Descriptor::String(crate::string::StringDesc::greedy().trim_null(false)),
            vec![0],
        )
    }

    pub fn with_endian(&self, endian: Endian) -> Self {
        Self {
            inner: Rc::new(self.inner.with_endian(endian)),
            terminator: self.terminator.clone(),
        }
    }

    pub fn without_endian(&self) -> Self {
        Self {
            inner: Rc::new(self.inner.without_endian()),
            terminator: self.terminator.clone(),
        }
    }

    pub fn default_value(&self) -> Value {
        self.inner.default_value()
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        self.inner.validate(value)?;
        let body = self.inner.pack_raw(value, None)?;
        if find_subsequence(&body, &self.terminator).is_some() {
            return Err(Error::ConstraintViolation);
        }
        Ok(())
    }

    pub fn pack_raw(&self, value: &Value, endian: Option<Endian>) -> Result<Vec<u8>> {
        let mut out = self.inner.pack_raw(value, endian)?;
        out.extend_from_slice(&self.terminator);
        Ok(out)
    }

    pub fn unpack_one<'a>(&self, buf: &'a [u8], endian: Option<Endian>) -> Result<(Value, &'a [u8])> {
        match find_subsequence(buf, &self.terminator) {
            Some(pos) => {
                let body = &buf[..pos];
                let tail = &buf[pos + self.terminator.len()..];
                let (value, inner_tail) = self.inner.unpack_one(body, endian)?;
                if !inner_tail.is_empty() {
                    return Err(Error::ConstraintViolation);
                }
                Ok((value, tail))
            }
            None => Err(Error::TerminatorNotFound),
        }
    }
}

/// The first index at which `needle` occurs in `haystack`, or `None`.
pub(crate) fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
