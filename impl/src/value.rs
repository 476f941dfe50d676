//! The dynamic value tree exchanged at the pack/unpack boundary.
//!
//! Struct and union slots are addressed by name through a map (§9 of the
//! layout spec this crate implements: "expose the generic map shape for
//! compose-heavy use"). `Value` is that map's leaf/composite currency.

use crate::error::{Error, Result};
use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Any integer descriptor's unpacked form, wide enough for a full
    /// unsigned 64-bit value as well as any signed 64-bit value.
    Int(i128),
    /// Strings and opaque byte sequences.
    Bytes(Vec<u8>),
    /// An enum symbol, or a bitmap's set-bit name.
    Symbol(String),
    /// Array elements, or a bitmap's set of names.
    List(Vec<Value>),
    /// Struct/union field values, keyed by declared (or lifted) name.
    Map(IndexMap<String, Value>),
    /// Pad's non-value.
    Unit,
}

impl Value {
    pub fn as_int(&self) -> Result<i128> {
        match self {
            Value::Int(i) => Ok(*i),
            _ => Err(Error::ConstraintViolation),
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8]> {
        match self {
            Value::Bytes(b) => Ok(b),
            _ => Err(Error::ConstraintViolation),
        }
    }

    pub fn as_symbol(&self) -> Result<&str> {
        match self {
            Value::Symbol(s) => Ok(s),
            _ => Err(Error::ConstraintViolation),
        }
    }

    pub fn as_list(&self) -> Result<&[Value]> {
        match self {
            Value::List(l) => Ok(l),
            _ => Err(Error::ConstraintViolation),
        }
    }

    pub fn as_map(&self) -> Result<&IndexMap<String, Value>> {
        match self {
            Value::Map(m) => Ok(m),
            _ => Err(Error::ConstraintViolation),
        }
    }

    pub fn str(s: &str) -> Value {
        Value::Bytes(s.as_bytes().to_vec())
    }

    pub fn symbol(s: &str) -> Value {
        Value::Symbol(s.to_string())
    }

    /// Render `Bytes` as a UTF-8 string, lossily, for display purposes only.
    pub fn as_str_lossy(&self) -> Result<std::borrow::Cow<'_, str>> {
        Ok(String::from_utf8_lossy(self.as_bytes()?))
    }
}

macro_rules! from_int {
    ($($t:ty),+ $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(v as i128)
                }
            }
        )+
    };
}

from_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, usize);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Int(v as i128)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::str(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Bytes(v.into_bytes())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(v: IndexMap<String, Value>) -> Self {
        Value::Map(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_conversions() {
        assert_eq!(Value::from(7u8), Value::Int(7));
        assert_eq!(Value::from(-7i8), Value::Int(-7));
        assert_eq!(Value::from(true), Value::Int(1));
    }

    #[test]
    fn string_and_bytes() {
        assert_eq!(Value::from("v1.0"), Value::Bytes(b"v1.0".to_vec()));
        assert_eq!(Value::str("hi").as_bytes().unwrap(), b"hi");
    }

    #[test]
    fn shape_mismatch_is_constraint_violation() {
        assert!(Value::Int(1).as_map().is_err());
        assert!(Value::Int(1).as_list().is_err());
    }
}
