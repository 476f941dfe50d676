//! Enum: a symbol <-> integer map over an integer codec.

use crate::endian::Endian;
use crate::error::{Error, Result};
use crate::int::IntDesc;
use crate::value::Value;
use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDesc {
    pub underlying: IntDesc,
    pub symbols: IndexMap<String, i128>,
    pub default_symbol: String,
    pub permissive: bool,
}

impl EnumDesc {
    pub fn builder(underlying: IntDesc) -> EnumBuilder {
        EnumBuilder::new(underlying)
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
        Value::Symbol(self.default_symbol.clone())
    }

    pub fn permissive(&self) -> Self {
        Self {
            permissive: true,
            ..self.clone()
        }
    }

    fn resolve(&self, value: &Value) -> Result<i128> {
        match value {
            Value::Int(i) => Ok(*i),
            Value::Symbol(name) => {
                if let Some(v) = self.symbols.get(name) {
                    Ok(*v)
                } else if self.permissive {
                    parse_unknown(name, self.underlying.size()).ok_or(Error::ConstraintViolation)
                } else {
                    Err(Error::ConstraintViolation)
                }
            }
            _ => Err(Error::ConstraintViolation),
        }
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
        let int_val = raw.as_int()?;
        if let Some((name, _)) = self.symbols.iter().find(|(_, v)| **v == int_val) {
            Ok((Value::Symbol(name.clone()), tail))
        } else if self.permissive {
            let width = self.underlying.size() * 2;
            let bits = crate::int::to_unsigned_bits(int_val, self.underlying.size());
            Ok((Value::Symbol(format!("unknown_{:0width$x}", bits, width = width)), tail))
        } else {
            Err(Error::ConstraintViolation)
        }
    }
}

fn parse_unknown(name: &str, size: usize) -> Option<i128> {
    let hex = name.strip_prefix("unknown_")?;
    if hex.len() != size * 2 {
        return None;
    }
    i128::from_str_radix(hex, 16).ok()
}

pub struct EnumBuilder {
    underlying: IntDesc,
    symbols: IndexMap<String, i128>,
    next: i128,
    default_symbol: Option<String>,
}

impl EnumBuilder {
    pub fn new(underlying: IntDesc) -> Self {
        Self {
            underlying,
            symbols: IndexMap::new(),
            next: 0,
            default_symbol: None,
        }
    }

    /// Append `name` with the next sequential value (`last + 1`, or `0` for
    /// the first symbol).
    pub fn sym(mut self, name: &str) -> Self {
        self.symbols.insert(name.to_string(), self.next);
        self.next += 1;
        self
    }

    /// Append `name` bound to exactly `value`; subsequent un-valued names
    /// resume at `value + 1`.
    pub fn sym_value(mut self, name: &str, value: i128) -> Self {
        self.symbols.insert(name.to_string(), value);
        self.next = value + 1;
        self
    }

    pub fn default_symbol(mut self, name: &str) -> Self {
        self.default_symbol = Some(name.to_string());
        self
    }

    pub fn build(self) -> Result<EnumDesc> {
        if self.symbols.is_empty() {
            return Err(Error::BuildError("enum must declare at least one symbol".into()));
        }
        for (name, v) in &self.symbols {
            if *v < self.underlying.width.min() || *v > self.underlying.width.max() {
                return Err(Error::BuildError(format!(
                    "enum symbol `{}` = {} does not fit in the underlying integer type",
                    name, v
                )));
            }
        }
        let default_symbol = match self.default_symbol {
            Some(n) if self.symbols.contains_key(&n) => n,
            Some(n) => {
                return Err(Error::BuildError(format!("default symbol `{}` was never declared", n)))
            }
            None => self.symbols.keys().next().unwrap().clone(),
        };
        Ok(EnumDesc {
            underlying: self.underlying,
            symbols: self.symbols,
            default_symbol,
            permissive: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tlv_type() -> EnumDesc {
        EnumDesc::builder(IntDesc::u8())
            .sym("invalid")
            .sym("hello")
            .sym("read")
            .sym("write")
            .sym("goodbye")
            .build()
            .unwrap()
    }

    #[test]
    fn sequential_builder_assigns_indices() {
        let e = tlv_type();
        assert_eq!(e.symbols["hello"], 1);
        assert_eq!(e.symbols["goodbye"], 4);
    }

    #[test]
    fn valued_builder_resumes_after_gap() {
        let e = EnumDesc::builder(IntDesc::u8())
            .sym("a")
            .sym_value("b", 10)
            .sym("c")
            .build()
            .unwrap();
        assert_eq!(e.symbols["a"], 0);
        assert_eq!(e.symbols["b"], 10);
        assert_eq!(e.symbols["c"], 11);
    }

    #[test]
    fn pack_and_unpack_symbol() {
        let e = tlv_type();
        let packed = e.pack_raw(&Value::Symbol("hello".into()), None).unwrap();
        assert_eq!(packed, vec![1]);
        let (v, _) = e.unpack_one(&packed, None).unwrap();
        assert_eq!(v, Value::Symbol("hello".into()));
    }

    #[test]
    fn strict_unpack_rejects_unmapped_value() {
        let e = tlv_type();
        assert!(e.unpack_one(&[0xFF], None).is_err());
    }

    #[test]
    fn permissive_unpack_synthesizes_unknown_symbol() {
        let e = tlv_type().permissive();
        let (v, _) = e.unpack_one(&[0xFF], None).unwrap();
        assert_eq!(v, Value::Symbol("unknown_ff".into()));
    }

    #[test]
    fn permissive_pack_accepts_its_own_synthetic_symbol() {
        let e = tlv_type().permissive();
        let packed = e.pack_raw(&Value::Symbol("unknown_ff".into()), None).unwrap();
        assert_eq!(packed, vec![0xFF]);
    }

    #[test]
    fn build_rejects_out_of_range_value() {
        assert!(EnumDesc::builder(IntDesc::u8()).sym_value("x", 300).build().is_err());
    }
}
