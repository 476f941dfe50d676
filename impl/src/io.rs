//! Writer convenience method, mirroring the byte-slice API for callers
//! working against a stream instead of an in-memory buffer.
//!
//! [`read`](Descriptor::read)/[`pread`](Descriptor::pread) live in
//! `descriptor.rs` next to the rest of the engine surface, since they share
//! its `size`-based `UnsupportedOperation` gate.

use std::io::Write;

use crate::descriptor::Descriptor;
use crate::error::Result;
use crate::value::Value;

impl Descriptor {
    /// Pack `value` and write it to `writer` in full.
    pub fn write_to<W: Write>(&self, writer: &mut W, value: &Value) -> Result<()> {
        let bytes = self.pack(value)?;
        writer.write_all(&bytes)?;
        Ok(())
    }
}
