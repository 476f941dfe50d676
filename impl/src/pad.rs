//! Pad: `n` filler bytes that carry no value.

use crate::error::{Error, Result};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PadDesc {
    pub size: usize,
    pub fill: u8,
}

impl PadDesc {
    pub fn new(size: usize) -> Self {
        Self { size, fill: 0 }
    }

    pub fn fill(mut self, byte: u8) -> Self {
        self.fill = byte;
        self
    }

    pub fn default_value(&self) -> Value {
        Value::Unit
    }

    pub fn validate(&self, _value: &Value) -> Result<()> {
        Ok(())
    }

    pub fn pack_raw(&self, _value: &Value) -> Result<Vec<u8>> {
        Ok(vec![self.fill; self.size])
    }

    pub fn unpack_one<'a>(&self, buf: &'a [u8]) -> Result<(Value, &'a [u8])> {
        if buf.len() < self.size {
            return Err(Error::MissingBytes { need: self.size - buf.len() });
        }
        Ok((Value::Unit, &buf[self.size..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_filler_bytes() {
        let p = PadDesc::new(3).fill(0xAA);
        assert_eq!(p.pack_raw(&Value::Unit).unwrap(), vec![0xAA, 0xAA, 0xAA]);
    }

    #[test]
    fn unpack_skips_and_yields_unit() {
        let p = PadDesc::new(2);
        let (v, tail) = p.unpack_one(&[0, 0, 9]).unwrap();
        assert_eq!(v, Value::Unit);
        assert_eq!(tail, &[9]);
    }

    #[test]
    fn unpack_reports_missing_bytes() {
        let p = PadDesc::new(4);
        assert!(p.unpack_one(&[0, 0]).is_err());
    }
}
