//! Fixed- and variable-length byte strings.

use crate::error::{Error, Result};
use crate::value::Value;

/// How a string's extent is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringLength {
    /// Exactly `n` bytes, packed or unpacked.
    Fixed(usize),
    /// Consumes (or produces) whatever bytes are given, unbounded.
    Greedy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringDesc {
    pub length: StringLength,
    /// Strip trailing NUL bytes on unpack; pad with NUL on pack.
    pub trim_null: bool,
}

impl StringDesc {
    pub fn fixed(n: usize) -> Self {
        Self {
            length: StringLength::Fixed(n),
            trim_null: true,
        }
    }

    pub fn greedy() -> Self {
        Self {
            length: StringLength::Greedy,
            trim_null: false,
        }
    }

    pub fn trim_null(mut self, trim: bool) -> Self {
        self.trim_null = trim;
        self
    }

    pub fn size(&self) -> Option<usize> {
        match self.length {
            StringLength::Fixed(n) => Some(n),
            StringLength::Greedy => None,
        }
    }

    pub fn default_value(&self) -> Value {
        match self.length {
            StringLength::Fixed(n) => Value::Bytes(vec![0u8; n]),
            StringLength::Greedy => Value::Bytes(Vec::new()),
        }
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        let bytes = value.as_bytes()?;
        if let StringLength::Fixed(n) = self.length {
            if bytes.len() > n {
                return Err(Error::ConstraintViolation);
            }
        }
        Ok(())
    }

    pub fn pack_raw(&self, value: &Value) -> Result<Vec<u8>> {
        let bytes = value.as_bytes()?;
        match self.length {
            StringLength::Fixed(n) => {
                if bytes.len() > n {
                    return Err(Error::ConstraintViolation);
                }
                let mut out = bytes.to_vec();
                out.resize(n, 0);
                Ok(out)
            }
            StringLength::Greedy => Ok(bytes.to_vec()),
        }
    }

    pub fn unpack_one<'a>(&self, buf: &'a [u8]) -> Result<(Value, &'a [u8])> {
        match self.length {
            StringLength::Fixed(n) => {
                if buf.len() < n {
                    return Err(Error::MissingBytes { need: n - buf.len() });
                }
                let (head, tail) = buf.split_at(n);
                Ok((Value::Bytes(self.trim_trailing_nulls(head)), tail))
            }
            // Greedy consumption takes all remaining input regardless of
            // where a NUL falls; only the trimming of the *value* differs
            // from the fixed case (truncate at the first NUL, not the
            // last non-NUL).
            StringLength::Greedy => Ok((Value::Bytes(self.trim_first_null(buf)), &buf[buf.len()..])),
        }
    }

    fn trim_trailing_nulls(&self, bytes: &[u8]) -> Vec<u8> {
        if self.trim_null {
            let end = bytes.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
            bytes[..end].to_vec()
        } else {
            bytes.to_vec()
        }
    }

    fn trim_first_null(&self, bytes: &[u8]) -> Vec<u8> {
        if self.trim_null {
            let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
            bytes[..end].to_vec()
        } else {
            bytes.to_vec()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_pads_and_trims_null() {
        let d = StringDesc::fixed(8);
        let packed = d.pack_raw(&Value::str("hi")).unwrap();
        assert_eq!(packed, b"hi\0\0\0\0\0\0");
        let (v, tail) = d.unpack_one(&packed).unwrap();
        assert_eq!(v.as_bytes().unwrap(), b"hi");
        assert!(tail.is_empty());
    }

    #[test]
    fn fixed_rejects_overlong_value() {
        let d = StringDesc::fixed(2);
        assert!(d.pack_raw(&Value::str("too long")).is_err());
    }

    #[test]
    fn fixed_without_trim_keeps_embedded_nulls() {
        let d = StringDesc::fixed(4).trim_null(false);
        let (v, _) = d.unpack_one(b"a\0b\0").unwrap();
        assert_eq!(v.as_bytes().unwrap(), b"a\0b\0");
    }

    #[test]
    fn greedy_consumes_everything() {
        let d = StringDesc::greedy();
        let (v, tail) = d.unpack_one(b"rest of buffer").unwrap();
        assert_eq!(v.as_bytes().unwrap(), b"rest of buffer");
        assert!(tail.is_empty());
    }

    #[test]
    fn greedy_with_trim_truncates_at_the_first_null_but_still_consumes_everything() {
        let d = StringDesc::greedy().trim_null(true);
        let (v, tail) = d.unpack_one(b"ab\0cd\0").unwrap();
        assert_eq!(v.as_bytes().unwrap(), b"ab");
        assert!(tail.is_empty());
    }

    #[test]
    fn fixed_unpack_reports_missing_bytes() {
        let d = StringDesc::fixed(8);
        assert!(d.unpack_one(b"short").is_err());
    }
}
